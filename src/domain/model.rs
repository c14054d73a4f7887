use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 發行帳戶的 `lsfDefaultRipple` 帳戶旗標
pub const LSF_DEFAULT_RIPPLE: u32 = 0x0080_0000;

/// `AccountSet.SetFlag` 對應的 `asfDefaultRipple`
pub const ASF_DEFAULT_RIPPLE: u32 = 8;

pub const SUCCESS_RESULT: &str = "tesSUCCESS";

/// 交易在 LastLedgerSequence 之前未被驗證
pub const EXPIRED_RESULT: &str = "tefMAX_LEDGER";

/// 由 faucet 取得的帳戶：地址與簽章用 seed
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub seed: String,
}

impl Wallet {
    pub fn new(address: impl Into<String>, seed: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            seed: seed.into(),
        }
    }
}

// seed 不輸出到日誌
impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("seed", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountRole {
    Issuer,
    LiquidityProvider,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRole::Issuer => write!(f, "issuer"),
            AccountRole::LiquidityProvider => write!(f, "liquidity provider"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: String,
    pub flags: u32,
    pub sequence: u32,
    pub balance_drops: u64,
}

impl AccountInfo {
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}

/// 非 XRP 代幣金額
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAmount {
    pub currency: String,
    pub issuer: String,
    pub value: String,
}

/// 帳本上的金額：XRP 以 drops 字串表示，代幣以物件表示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Drops(String),
    Issued(IssuedAmount),
}

/// `amm_info` 查詢用的資產描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl Asset {
    pub fn xrp() -> Self {
        Self {
            currency: "XRP".to_string(),
            issuer: None,
        }
    }

    pub fn issued(currency: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            issuer: Some(issuer.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountSet {
    pub account: String,
    pub set_flag: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustSet {
    pub account: String,
    pub limit_amount: IssuedAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Payment {
    pub account: String,
    pub destination: String,
    pub amount: IssuedAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AmmCreate {
    pub account: String,
    pub amount: IssuedAmount,
    /// XRP drops
    pub amount2: String,
    pub trading_fee: u16,
}

/// 本流程提交的四種交易，序列化後欄位與帳本 JSON 格式一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "TransactionType")]
pub enum Transaction {
    AccountSet(AccountSet),
    TrustSet(TrustSet),
    Payment(Payment),
    #[serde(rename = "AMMCreate")]
    AmmCreate(AmmCreate),
}

impl Transaction {
    pub fn account(&self) -> &str {
        match self {
            Transaction::AccountSet(tx) => &tx.account,
            Transaction::TrustSet(tx) => &tx.account,
            Transaction::Payment(tx) => &tx.account,
            Transaction::AmmCreate(tx) => &tx.account,
        }
    }

    pub fn transaction_type(&self) -> &'static str {
        match self {
            Transaction::AccountSet(_) => "AccountSet",
            Transaction::TrustSet(_) => "TrustSet",
            Transaction::Payment(_) => "Payment",
            Transaction::AmmCreate(_) => "AMMCreate",
        }
    }
}

/// autofill 之後帶有手續費、序號與有效期限的交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreparedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub fee: String,
    pub sequence: u32,
    pub last_ledger_sequence: u32,
    #[serde(rename = "NetworkID", default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<u32>,
}

impl PreparedTransaction {
    /// 延長有效期限，容許簽章與提交前的網路延遲
    pub fn extend_validity(&mut self, buffer: u32) {
        self.last_ledger_sequence = self.last_ledger_sequence.saturating_add(buffer);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx_blob: String,
    pub hash: String,
    pub last_ledger_sequence: u32,
}

/// submit-and-wait 的最終結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub hash: String,
    pub result_code: String,
    pub validated: bool,
    pub ledger_index: Option<u32>,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        self.validated && self.result_code == SUCCESS_RESULT
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub account: String,
    pub amount: Amount,
    pub amount2: Amount,
    pub lp_token: Option<IssuedAmount>,
    pub trading_fee: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapOutcome {
    pub pool_transaction_hash: String,
    pub issuer_address: String,
    pub lp_address: String,
    pub token_currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolInfo>,
    pub completed_at: DateTime<Utc>,
}

/// 流程步驟，嚴格依此順序執行
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapStep {
    Prepare,
    Connect,
    FundAccounts,
    ConfigureIssuer,
    EstablishTrustLine,
    TransferTokens,
    VerifyBalance,
    CreatePool,
}

impl BootstrapStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapStep::Prepare => "prepare",
            BootstrapStep::Connect => "connect",
            BootstrapStep::FundAccounts => "fund_accounts",
            BootstrapStep::ConfigureIssuer => "configure_issuer",
            BootstrapStep::EstablishTrustLine => "establish_trust_line",
            BootstrapStep::TransferTokens => "transfer_tokens",
            BootstrapStep::VerifyBalance => "verify_balance",
            BootstrapStep::CreatePool => "create_pool",
        }
    }

    /// 步驟成功後到達的狀態
    pub fn completed_stage(&self) -> Option<BootstrapStage> {
        match self {
            BootstrapStep::Prepare => None,
            BootstrapStep::Connect => Some(BootstrapStage::Connected),
            BootstrapStep::FundAccounts => Some(BootstrapStage::AccountsFunded),
            BootstrapStep::ConfigureIssuer => Some(BootstrapStage::IssuerConfigured),
            BootstrapStep::EstablishTrustLine => Some(BootstrapStage::TrustLineEstablished),
            BootstrapStep::TransferTokens => Some(BootstrapStage::TokensTransferred),
            BootstrapStep::VerifyBalance => Some(BootstrapStage::BalanceVerified),
            BootstrapStep::CreatePool => Some(BootstrapStage::PoolCreated),
        }
    }
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapStage {
    Connected,
    AccountsFunded,
    IssuerConfigured,
    TrustLineEstablished,
    TokensTransferred,
    BalanceVerified,
    PoolCreated,
    Failed,
    Disconnected,
}
