use crate::domain::model::{
    AccountInfo, Asset, PoolInfo, PreparedTransaction, SignedTransaction, Transaction,
    TransactionOutcome, Wallet,
};
use crate::utils::error::LedgerResult;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// 帳本客戶端能力。簽章、序列化與提交都交給實作方 (遠端節點或測試替身)
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn connect(&self) -> LedgerResult<()>;

    async fn disconnect(&self) -> LedgerResult<()>;

    /// 向測試網 faucet 申請一個已注資的新帳戶
    async fn fund_account(&self) -> LedgerResult<Wallet>;

    async fn account_info(&self, address: &str) -> LedgerResult<AccountInfo>;

    /// XRP 餘額 (單位 XRP，非 drops)
    async fn xrp_balance(&self, address: &str) -> LedgerResult<Decimal>;

    /// 填入 Fee、Sequence、LastLedgerSequence
    async fn autofill(&self, transaction: Transaction) -> LedgerResult<PreparedTransaction>;

    async fn sign(
        &self,
        transaction: &PreparedTransaction,
        wallet: &Wallet,
    ) -> LedgerResult<SignedTransaction>;

    /// 提交並等待交易被驗證 (或過期)
    async fn submit_and_wait(&self, signed: &SignedTransaction)
        -> LedgerResult<TransactionOutcome>;

    async fn amm_info(&self, asset: &Asset, asset2: &Asset) -> LedgerResult<PoolInfo>;
}

/// 每次執行建立一個獨立的客戶端，連線不在執行之間共用
pub trait LedgerClientFactory: Send + Sync {
    type Client: LedgerClient + 'static;

    fn create(&self) -> LedgerResult<Self::Client>;
}
