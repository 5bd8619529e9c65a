//! Router service entry point.

use std::env;
use std::sync::Arc;

use tracing::info;

use routerd::{parse_cli_args, serve, IndexerClient, LedgerSubmitter, RouterService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = parse_cli_args();
    info!(
        indexer = %config.indexer_endpoint,
        ledger = %config.ledger_endpoint,
        anchor = %config.anchor_asset,
        "starting router service"
    );

    let directory = IndexerClient::new(config.indexer_endpoint.clone());
    let executor = LedgerSubmitter::new(config.ledger_endpoint.clone(), config.contract.clone());
    let service = Arc::new(RouterService::new(
        directory,
        executor,
        config.anchor_asset.clone(),
    ));

    serve(service, config.port).await
}
