pub mod toml_config;

pub use toml_config::{AppConfig, MonitoringConfig, NetworkConfig, PoolConfig, ServerConfig};

#[cfg(feature = "cli")]
use crate::utils::error::ConfigResult;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "retreat-amm")]
#[command(about = "Bootstrap a RETREAT/XRP liquidity pool on the XRP Ledger test network")]
pub struct CliConfig {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override network.ws_url
    #[arg(long)]
    pub ws_url: Option<String>,

    /// Override network.faucet_url
    #[arg(long)]
    pub faucet_url: Option<String>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the transactions that would be submitted without connecting
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入設定檔並套用命令列覆蓋
    pub fn load_app_config(&self) -> ConfigResult<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(ws_url) = &self.ws_url {
            config.network.ws_url = ws_url.clone();
        }
        if let Some(faucet_url) = &self.faucet_url {
            config.network.faucet_url = faucet_url.clone();
        }
        if self.verbose {
            config.monitoring.verbose = true;
        }

        Ok(config)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_network() {
        let cli = CliConfig::parse_from([
            "retreat-amm",
            "--ws-url",
            "ws://localhost:6006",
            "--verbose",
        ]);
        let config = cli.load_app_config().unwrap();
        assert_eq!(config.network.ws_url, "ws://localhost:6006");
        assert!(config.monitoring.verbose);
        assert_eq!(config.pool, PoolConfig::default());
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let cli = CliConfig::parse_from(["retreat-amm", "--config", "/nonexistent/retreat.toml"]);
        assert!(cli.load_app_config().is_err());
    }
}
