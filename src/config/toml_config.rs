use crate::domain::currency::{xrp_to_drops, CurrencyCode};
use crate::utils::error::{ConfigError, ConfigResult};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

pub const DEVNET_WS_URL: &str = "wss://s.devnet.rippletest.net:51233";
pub const DEVNET_FAUCET_URL: &str = "https://faucet.devnet.rippletest.net/accounts";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub pool: PoolConfig,
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub ws_url: String,
    pub faucet_url: String,
    /// 等待交易驗證時的輪詢間隔
    pub poll_interval_ms: u64,
    pub request_timeout_seconds: u64,
    /// faucet 注資後等待帳戶出現在帳本上的最大輪詢次數
    pub funding_poll_attempts: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ws_url: DEVNET_WS_URL.to_string(),
            faucet_url: DEVNET_FAUCET_URL.to_string(),
            poll_interval_ms: 1000,
            request_timeout_seconds: 30,
            funding_poll_attempts: 20,
        }
    }
}

/// 單次流程的不可變參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub token_name: String,
    /// 注入池子的代幣數量
    pub token_amount: Decimal,
    /// 注入池子的 XRP 數量
    pub xrp_amount: Decimal,
    /// 交易費，單位 1/100000 (100 = 0.1%)
    pub trading_fee: u16,
    pub last_ledger_buffer: u32,
    /// LP 對發行方的信任額度
    pub trust_limit: Decimal,
    /// 發行方轉給 LP 的代幣數量
    pub transfer_amount: Decimal,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            token_name: "RETREAT".to_string(),
            token_amount: Decimal::from(20),
            xrp_amount: Decimal::from(20),
            trading_fee: 100,
            last_ledger_buffer: 10,
            trust_limit: Decimal::from(100),
            transfer_amount: Decimal::from(50),
        }
    }
}

impl PoolConfig {
    pub fn currency_code(&self) -> ConfigResult<CurrencyCode> {
        CurrencyCode::from_token_name(&self.token_name)
    }

    pub fn xrp_drops(&self) -> ConfigResult<String> {
        xrp_to_drops(self.xrp_amount)
    }
}

impl Validate for PoolConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty_string("pool.token_name", &self.token_name)?;
        self.currency_code()?;
        self.xrp_drops()?;
        validation::validate_positive_decimal("pool.token_amount", self.token_amount)?;
        validation::validate_positive_decimal("pool.trust_limit", self.trust_limit)?;
        validation::validate_positive_decimal("pool.transfer_amount", self.transfer_amount)?;
        validation::validate_range("pool.trading_fee", self.trading_fee, 0, 1000)?;
        validation::validate_range("pool.last_ledger_buffer", self.last_ledger_buffer, 1, 1000)?;

        if self.transfer_amount > self.trust_limit {
            return Err(ConfigError::ConfigValidationError {
                field: "pool.transfer_amount".to_string(),
                message: format!(
                    "Transfer amount {} exceeds trust limit {}",
                    self.transfer_amount, self.trust_limit
                ),
            });
        }

        if self.token_amount > self.transfer_amount {
            return Err(ConfigError::ConfigValidationError {
                field: "pool.token_amount".to_string(),
                message: format!(
                    "Pool token amount {} exceeds the {} tokens transferred to the LP",
                    self.token_amount, self.transfer_amount
                ),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// 只有 HTTP 服務會用到，CLI 不檢查
impl Validate for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_socket_addr("server.bind_address", &self.bind_address)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub verbose: bool,
    pub json_logs: bool,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ConfigError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${XRPL_WS_URL})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> ConfigResult<()> {
        validation::validate_url("network.ws_url", &self.network.ws_url, &["ws", "wss"])?;
        validation::validate_url(
            "network.faucet_url",
            &self.network.faucet_url,
            &["http", "https"],
        )?;
        validation::validate_range("network.poll_interval_ms", self.network.poll_interval_ms, 10, 60_000)?;
        validation::validate_range(
            "network.request_timeout_seconds",
            self.network.request_timeout_seconds,
            1,
            600,
        )?;
        validation::validate_range(
            "network.funding_poll_attempts",
            self.network.funding_poll_attempts,
            1,
            600,
        )?;
        self.pool.validate()
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.validate_config()
    }
}
