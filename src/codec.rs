//! keccak-256 hashing and the packed-timelock codec.
//!
//! The packed word is bit-compatible with the EVM side's `TimelocksLib`: seven 32-bit
//! phase offsets in the low 224 bits, followed by a 32-bit deploy timestamp in the top
//! 32 bits. This coordinator's decoder ignores that embedded timestamp, always using its
//! own freshly captured `deployed_at` instead, but the encoder still writes it so the
//! word stays meaningful to a decoder that doesn't.

use ethers::types::U256;
use sha3::{Digest, Keccak256};

pub const PHASE_COUNT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    SrcWithdrawal = 0,
    SrcPublicWithdrawal = 1,
    SrcCancellation = 2,
    SrcPublicCancellation = 3,
    DstWithdrawal = 4,
    DstPublicWithdrawal = 5,
    DstCancellation = 6,
}

impl Phase {
    pub const ALL: [Phase; PHASE_COUNT] = [
        Phase::SrcWithdrawal,
        Phase::SrcPublicWithdrawal,
        Phase::SrcCancellation,
        Phase::SrcPublicCancellation,
        Phase::DstWithdrawal,
        Phase::DstPublicWithdrawal,
        Phase::DstCancellation,
    ];

    fn index(self) -> usize {
        self as u8 as usize
    }

    fn bit_offset(self) -> u32 {
        self.index() as u32 * 32
    }
}

/// keccak-256 (Ethereum's variant, not FIPS SHA3-256) of an arbitrary byte string.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Case-insensitive comparison of a revealed secret against a hashlock.
pub fn hashlock_matches(secret: &[u8; 32], hashlock: &[u8; 32]) -> bool {
    keccak256(secret) == *hashlock
}

/// The seven phase offsets, seconds relative to `deployed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseOffsets(pub [u32; PHASE_COUNT]);

impl PhaseOffsets {
    pub fn get(&self, phase: Phase) -> u32 {
        self.0[phase.index()]
    }

    /// A packed word is well-formed only if its offsets are non-decreasing in phase index.
    pub fn is_non_decreasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] <= w[1])
    }
}

/// Packs seven phase offsets plus a deploy timestamp into the 256-bit wire word.
pub fn pack(offsets: PhaseOffsets, deployed_at: u32) -> U256 {
    let mut word = U256::from(deployed_at) << 224;
    for phase in Phase::ALL {
        word |= U256::from(offsets.get(phase)) << phase.bit_offset();
    }
    word
}

/// Unpacks the seven phase offsets from the low 224 bits, ignoring whatever timestamp
/// was embedded in the top 32 bits.
pub fn unpack(word: U256) -> PhaseOffsets {
    let mask = U256::from(u32::MAX);
    let mut offsets = [0u32; PHASE_COUNT];
    for phase in Phase::ALL {
        offsets[phase.index()] = ((word >> phase.bit_offset()) & mask).low_u32();
    }
    PhaseOffsets(offsets)
}

/// The timestamp an encoder embedded in the top 32 bits, exposed for callers that choose
/// to honor it (this coordinator's own decode path does not).
pub fn unpack_embedded_deployed_at(word: U256) -> u32 {
    (word >> 224).low_u32()
}

/// Absolute Unix timestamps for all seven phases, derived from offsets and an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timelocks {
    pub deployed_at: i64,
    pub absolute: [i64; PHASE_COUNT],
}

impl Timelocks {
    pub fn from_offsets(offsets: PhaseOffsets, deployed_at: i64) -> Self {
        let mut absolute = [0i64; PHASE_COUNT];
        for phase in Phase::ALL {
            absolute[phase.index()] = deployed_at + offsets.get(phase) as i64;
        }
        Self { deployed_at, absolute }
    }

    pub fn at(&self, phase: Phase) -> i64 {
        self.absolute[phase.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_matches_known_vector() {
        // keccak256("") per the Ethereum (non-FIPS) variant.
        let digest = keccak256(b"");
        assert_eq!(
            hex::encode(digest),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a47"
        );
    }

    #[test]
    fn pack_unpack_round_trips_offsets() {
        let offsets = PhaseOffsets([10, 120, 121, 122, 130, 140, 150]);
        assert!(offsets.is_non_decreasing());
        let packed = pack(offsets, 1_700_000_000);
        let unpacked = unpack(packed);
        assert_eq!(unpacked, offsets);
    }

    #[test]
    fn unpack_ignores_embedded_timestamp() {
        let offsets = PhaseOffsets([1, 2, 3, 4, 5, 6, 7]);
        let packed_a = pack(offsets, 111);
        let packed_b = pack(offsets, 222);
        assert_eq!(unpack(packed_a), unpack(packed_b));
        assert_eq!(unpack_embedded_deployed_at(packed_a), 111);
        assert_eq!(unpack_embedded_deployed_at(packed_b), 222);
    }

    #[test]
    fn timelocks_derive_absolute_timestamps() {
        let offsets = PhaseOffsets([10, 120, 121, 122, 10, 100, 101]);
        let timelocks = Timelocks::from_offsets(offsets, 1_000);
        assert_eq!(timelocks.at(Phase::DstWithdrawal), 1_010);
        assert_eq!(timelocks.at(Phase::DstCancellation), 1_101);
    }
}
