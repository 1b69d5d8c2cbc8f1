//! Phase/time validator: decides whether "now" falls inside an action's admissible
//! timelock window.

use crate::codec::Phase;
use crate::error::AppError;
use crate::model::EscrowRecord;

/// Checks that `now + slack_seconds` lies in `[timelocks[start], timelocks[end])`.
/// `end` is optional: omitting it checks only the lower bound (used by cancel and
/// rescue, whose windows are open-ended).
pub fn validate_window(
    escrow: &EscrowRecord,
    now: i64,
    start: Phase,
    end: Option<Phase>,
    slack_seconds: i64,
) -> Result<(), AppError> {
    let adjusted_now = now + slack_seconds;
    let opens_at = escrow.timelocks.at(start);
    if adjusted_now < opens_at {
        return Err(AppError::NotYetOpen { opens_at });
    }
    if let Some(end) = end {
        let closes_at = escrow.timelocks.at(end);
        if adjusted_now >= closes_at {
            return Err(AppError::WindowClosed { closed_at: closes_at });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PhaseOffsets, Timelocks};
    use crate::model::{EscrowSide, EscrowStatus, Token};
    use ethers::types::U256;

    fn escrow_with_timelocks(timelocks: Timelocks) -> EscrowRecord {
        EscrowRecord {
            id: uuid::Uuid::new_v4(),
            order_hash: [0u8; 32],
            hashlock: [0u8; 32],
            maker: "maker".to_string(),
            taker: "taker".to_string(),
            token: Token::Native,
            amount: U256::from(1),
            safety_deposit: U256::zero(),
            timelocks,
            wallet_address: "wallet".to_string(),
            status: EscrowStatus::Created,
            funding_tx_ids: Default::default(),
            secret: None,
            settlement_tx_ids: Vec::new(),
            escrow_side: EscrowSide::Destination,
        }
    }

    fn seed_timelocks() -> Timelocks {
        Timelocks::from_offsets(PhaseOffsets([10, 120, 121, 122, 10, 100, 101]), 1_000)
    }

    #[test]
    fn rejects_before_the_window_opens() {
        let escrow = escrow_with_timelocks(seed_timelocks());
        let result = validate_window(&escrow, 1_005, Phase::DstWithdrawal, Some(Phase::DstCancellation), 0);
        assert!(matches!(result, Err(AppError::NotYetOpen { opens_at: 1_010 })));
    }

    #[test]
    fn accepts_inside_the_window() {
        let escrow = escrow_with_timelocks(seed_timelocks());
        let result = validate_window(&escrow, 1_050, Phase::DstWithdrawal, Some(Phase::DstCancellation), 0);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_once_the_window_closes() {
        let escrow = escrow_with_timelocks(seed_timelocks());
        let result = validate_window(&escrow, 1_101, Phase::DstWithdrawal, Some(Phase::DstCancellation), 0);
        assert!(matches!(result, Err(AppError::WindowClosed { closed_at: 1_101 })));
    }

    #[test]
    fn slack_shifts_now_forward() {
        let escrow = escrow_with_timelocks(seed_timelocks());
        // now=1_005 is premature, but 11s of slack pushes the effective clock past 1_010.
        let result = validate_window(&escrow, 1_005, Phase::DstWithdrawal, Some(Phase::DstCancellation), 11);
        assert!(result.is_ok());
    }

    #[test]
    fn open_ended_window_has_no_upper_bound() {
        let escrow = escrow_with_timelocks(seed_timelocks());
        let result = validate_window(&escrow, 10_000_000, Phase::DstCancellation, None, 0);
        assert!(result.is_ok());
    }
}
