use std::sync::Arc;

use escrow_coordinator::config::Config;
use escrow_coordinator::escrow::Context;
use escrow_coordinator::ledger::xrpl::{XrplConfig, XrplLedgerClient};
use escrow_coordinator::routes;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to load configuration");
        std::process::exit(1);
    });

    let listen_port = config.listen_port;
    let ledger = Arc::new(XrplLedgerClient::new(XrplConfig {
        rpc_endpoint: config.network_endpoint.clone(),
        faucet_endpoint: config.faucet_enabled.then(|| config.faucet_endpoint.clone()).flatten(),
    }));
    let ctx = Arc::new(Context::new(ledger, config));

    let app = routes::router(ctx);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", listen_port))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, port = listen_port, "failed to bind listener");
            std::process::exit(1);
        });
    tracing::info!(port = listen_port, "escrow coordinator listening");
    axum::serve(listener, app).await.unwrap();
}
