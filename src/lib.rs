pub mod adapters;
#[cfg(feature = "server")]
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FaucetClient, WsClientFactory, WsLedgerClient};
pub use config::{AppConfig, NetworkConfig, PoolConfig};
pub use core::bootstrap::PoolBootstrap;
pub use domain::model::BootstrapOutcome;
pub use utils::error::{BootstrapError, LedgerError, Result};
