//! Service configuration.
//!
//! Flags mirror the deployment's wiring: where the pool read model lives,
//! where contract calls are submitted, and which asset bridges two-hop
//! routes. `RUST_LOG` controls log filtering as usual.

use std::env;

use lib_types::AssetId;

/// Router service configuration
#[derive(Debug, Clone)]
pub struct RouterdConfig {
    /// HTTP listen port
    pub port: u16,
    /// Pool read-model endpoint
    pub indexer_endpoint: String,
    /// Ledger node endpoint for contract-call submission
    pub ledger_endpoint: String,
    /// Contract identifier the submissions target
    pub contract: String,
    /// Bridge asset for two-hop routes
    pub anchor_asset: AssetId,
}

impl Default for RouterdConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            indexer_endpoint: "http://localhost:8081".to_string(),
            ledger_endpoint: "http://localhost:4000".to_string(),
            contract: "dex-router".to_string(),
            anchor_asset: AssetId::new("USD"),
        }
    }
}

/// Parse command-line arguments.
pub fn parse_cli_args() -> RouterdConfig {
    parse_args(env::args().skip(1))
}

fn parse_args(args: impl Iterator<Item = String>) -> RouterdConfig {
    let mut config = RouterdConfig::default();
    let args: Vec<String> = args.collect();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    if let Ok(port) = args[i + 1].parse() {
                        config.port = port;
                    }
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--indexer" => {
                if i + 1 < args.len() {
                    config.indexer_endpoint = args[i + 1].clone();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--ledger-node" => {
                if i + 1 < args.len() {
                    config.ledger_endpoint = args[i + 1].clone();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--contract" => {
                if i + 1 < args.len() {
                    config.contract = args[i + 1].clone();
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--anchor" => {
                if i + 1 < args.len() {
                    config.anchor_asset = AssetId::new(&args[i + 1]);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    config
}
