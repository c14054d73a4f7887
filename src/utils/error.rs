use crate::domain::model::{AccountRole, BootstrapStep};
use rust_decimal::Decimal;
use thiserror::Error;

/// 帳本客戶端 (WebSocket / faucet) 的傳輸與協定錯誤
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ledger request '{command}' failed: {error}{}", rpc_detail(.message))]
    Rpc {
        command: String,
        error: String,
        message: Option<String>,
    },

    #[error("Not connected to the ledger")]
    NotConnected,

    #[error("Ledger connection closed")]
    ConnectionClosed,

    #[error("Ledger request '{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Unexpected ledger response: {0}")]
    UnexpectedResponse(String),

    #[error("Faucet returned status {status}: {body}")]
    Faucet { status: u16, body: String },

    #[error("Failed to sign transaction: {0}")]
    Signing(String),

    #[error("Transaction {hash} expired: validated ledger passed LastLedgerSequence {last_ledger_sequence}")]
    Expired {
        hash: String,
        last_ledger_sequence: u32,
    },
}

impl From<tokio_tungstenite::tungstenite::Error> for LedgerError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        LedgerError::WebSocket(Box::new(err))
    }
}

fn rpc_detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" ({})", m))
        .unwrap_or_default()
}

impl LedgerError {
    /// rippled 的錯誤代碼 (例如 `actNotFound`)
    pub fn rpc_error(&self) -> Option<&str> {
        match self {
            LedgerError::Rpc { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// 設定載入與驗證錯誤
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 流程各步驟的錯誤分類，每個變體都能回報失敗的步驟
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Invalid bootstrap configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Failed to connect to ledger: {source}")]
    Connection { source: LedgerError },

    #[error("Failed to fund {role} account: {source}")]
    Funding {
        role: AccountRole,
        source: LedgerError,
    },

    #[error("Issuer configuration (AccountSet {hash}) was not confirmed: {code}")]
    Configuration { code: String, hash: String },

    #[error("Trust line (TrustSet {hash}) was not confirmed: {code}")]
    TrustLine { code: String, hash: String },

    #[error("Token transfer (Payment {hash}) was not confirmed: {code}")]
    Transfer { code: String, hash: String },

    #[error("Insufficient balance: LP needs at least {required} XRP but holds {available} XRP (short by {shortfall} XRP)")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("Pool creation (AMMCreate {hash}) failed with result {code}")]
    TransactionFailed { code: String, hash: String },

    #[error("Network error during {step}: {source}")]
    Network {
        step: BootstrapStep,
        source: LedgerError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Ledger,
    Funds,
}

impl BootstrapError {
    pub fn step(&self) -> BootstrapStep {
        match self {
            BootstrapError::InvalidConfig(_) => BootstrapStep::Prepare,
            BootstrapError::Connection { .. } => BootstrapStep::Connect,
            BootstrapError::Funding { .. } => BootstrapStep::FundAccounts,
            BootstrapError::Configuration { .. } => BootstrapStep::ConfigureIssuer,
            BootstrapError::TrustLine { .. } => BootstrapStep::EstablishTrustLine,
            BootstrapError::Transfer { .. } => BootstrapStep::TransferTokens,
            BootstrapError::InsufficientBalance { .. } => BootstrapStep::VerifyBalance,
            BootstrapError::TransactionFailed { .. } => BootstrapStep::CreatePool,
            BootstrapError::Network { step, .. } => *step,
        }
    }

    /// 帳本回傳的交易結果代碼 (例如 `tecUNFUNDED_AMM`)
    pub fn result_code(&self) -> Option<&str> {
        match self {
            BootstrapError::Configuration { code, .. }
            | BootstrapError::TrustLine { code, .. }
            | BootstrapError::Transfer { code, .. }
            | BootstrapError::TransactionFailed { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BootstrapError::InvalidConfig(_) => ErrorCategory::Configuration,
            BootstrapError::Connection { .. }
            | BootstrapError::Funding { .. }
            | BootstrapError::Network { .. } => ErrorCategory::Network,
            BootstrapError::InsufficientBalance { .. } => ErrorCategory::Funds,
            _ => ErrorCategory::Ledger,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the [pool] and [network] sections of the configuration file",
            ErrorCategory::Network => "Check that the ledger endpoint and faucet are reachable, then run again",
            ErrorCategory::Funds => "Lower pool.xrp_amount or fund the liquidity provider account",
            ErrorCategory::Ledger => "Inspect the transaction result code on a ledger explorer; earlier steps are already final",
        }
    }

    /// 建構交易被帳本拒絕時對應步驟的錯誤
    pub(crate) fn rejected(step: BootstrapStep, code: String, hash: String) -> Self {
        match step {
            BootstrapStep::ConfigureIssuer => BootstrapError::Configuration { code, hash },
            BootstrapStep::EstablishTrustLine => BootstrapError::TrustLine { code, hash },
            BootstrapStep::TransferTokens => BootstrapError::Transfer { code, hash },
            _ => BootstrapError::TransactionFailed { code, hash },
        }
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
