use crate::config::PoolConfig;
use crate::core::{
    AccountRole, AccountSet, AmmCreate, Asset, BootstrapOutcome, BootstrapStage, BootstrapStep,
    IssuedAmount, LedgerClient, Payment, PoolInfo, PreparedTransaction, Result, Transaction,
    TransactionOutcome, TrustSet, Wallet,
};
use crate::domain::currency::{format_token_value, CurrencyCode};
use crate::domain::model::{ASF_DEFAULT_RIPPLE, EXPIRED_RESULT, LSF_DEFAULT_RIPPLE};
use crate::utils::error::{BootstrapError, LedgerError};
use crate::utils::validation::Validate;
use chrono::Utc;

/// 由設定推導出的交易參數，連線前先算好
#[derive(Debug, Clone)]
struct PoolPlan {
    currency: CurrencyCode,
    token_amount: String,
    xrp_drops: String,
    trust_limit: String,
    transfer_amount: String,
}

impl PoolPlan {
    fn from_config(config: &PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            currency: config.currency_code()?,
            token_amount: format_token_value(config.token_amount),
            xrp_drops: config.xrp_drops()?,
            trust_limit: format_token_value(config.trust_limit),
            transfer_amount: format_token_value(config.transfer_amount),
        })
    }

    fn issued(&self, issuer: &str, value: &str) -> IssuedAmount {
        IssuedAmount {
            currency: self.currency.as_str().to_string(),
            issuer: issuer.to_string(),
            value: value.to_string(),
        }
    }

    fn account_set(&self, issuer: &str) -> Transaction {
        Transaction::AccountSet(AccountSet {
            account: issuer.to_string(),
            set_flag: ASF_DEFAULT_RIPPLE,
        })
    }

    fn trust_set(&self, issuer: &str, lp: &str) -> Transaction {
        Transaction::TrustSet(TrustSet {
            account: lp.to_string(),
            limit_amount: self.issued(issuer, &self.trust_limit),
        })
    }

    fn payment(&self, issuer: &str, lp: &str) -> Transaction {
        Transaction::Payment(Payment {
            account: issuer.to_string(),
            destination: lp.to_string(),
            amount: self.issued(issuer, &self.transfer_amount),
        })
    }

    fn amm_create(&self, issuer: &str, lp: &str, trading_fee: u16) -> Transaction {
        Transaction::AmmCreate(AmmCreate {
            account: lp.to_string(),
            amount: self.issued(issuer, &self.token_amount),
            amount2: self.xrp_drops.clone(),
            trading_fee,
        })
    }
}

/// 列出流程會依序送出的交易 (不連線)，供 dry run 顯示
pub fn planned_transactions(config: &PoolConfig, issuer: &str, lp: &str) -> Result<Vec<Transaction>> {
    let plan = PoolPlan::from_config(config)?;
    Ok(vec![
        plan.account_set(issuer),
        plan.trust_set(issuer, lp),
        plan.payment(issuer, lp),
        plan.amm_create(issuer, lp, config.trading_fee),
    ])
}

/// 建立發行帳戶、信任線、代幣轉帳與 AMM 池的單次流程。
///
/// 每一步都依賴前一步已確認的帳本狀態，因此嚴格依序執行；任何一步失敗即中止，
/// 已確認的交易不會回滾。連線在成功或失敗時都只關閉一次。
pub struct PoolBootstrap<C: LedgerClient> {
    client: C,
    config: PoolConfig,
}

impl<C: LedgerClient> PoolBootstrap<C> {
    pub fn new(client: C, config: PoolConfig) -> Self {
        Self { client, config }
    }

    pub async fn run(&self) -> Result<BootstrapOutcome> {
        let plan = PoolPlan::from_config(&self.config)?;

        tracing::info!("🔗 Connecting to ledger...");
        self.client
            .connect()
            .await
            .map_err(|source| BootstrapError::Connection { source })?;
        tracing::info!("🔗 Connected");

        let result = self.execute(&plan).await;

        if let Err(e) = &result {
            tracing::error!(
                stage = ?BootstrapStage::Failed,
                step = %e.step(),
                result_code = e.result_code().unwrap_or("-"),
                "❌ Bootstrap failed: {}",
                e
            );
        }

        if let Err(e) = self.client.disconnect().await {
            tracing::warn!("⚠️ Error while disconnecting from ledger: {}", e);
        }
        tracing::info!(stage = ?BootstrapStage::Disconnected, "🔌 Disconnected from ledger");

        result
    }

    async fn execute(&self, plan: &PoolPlan) -> Result<BootstrapOutcome> {
        advance(BootstrapStep::Connect);

        let (issuer, lp) = self.fund_accounts().await?;
        advance(BootstrapStep::FundAccounts);

        self.configure_issuer(plan, &issuer).await?;
        advance(BootstrapStep::ConfigureIssuer);

        self.establish_trust_line(plan, &issuer, &lp).await?;
        advance(BootstrapStep::EstablishTrustLine);

        self.transfer_tokens(plan, &issuer, &lp).await?;
        advance(BootstrapStep::TransferTokens);

        self.verify_balance(&lp).await?;
        advance(BootstrapStep::VerifyBalance);

        let created = self.create_pool(plan, &issuer, &lp).await?;
        advance(BootstrapStep::CreatePool);

        let pool = self.fetch_pool_info(plan, &issuer).await;

        Ok(BootstrapOutcome {
            pool_transaction_hash: created.hash,
            issuer_address: issuer.address,
            lp_address: lp.address,
            token_currency: plan.currency.as_str().to_string(),
            pool,
            completed_at: Utc::now(),
        })
    }

    async fn fund_accounts(&self) -> Result<(Wallet, Wallet)> {
        tracing::info!("💧 Creating accounts...");

        let issuer = self.fund(AccountRole::Issuer).await?;
        tracing::info!("🔑 Issuer: {}", issuer.address);

        let lp = self.fund(AccountRole::LiquidityProvider).await?;
        tracing::info!("👛 LP Provider: {}", lp.address);

        Ok((issuer, lp))
    }

    async fn fund(&self, role: AccountRole) -> Result<Wallet> {
        self.client
            .fund_account()
            .await
            .map_err(|source| BootstrapError::Funding { role, source })
    }

    /// 發行方未開啟 Default Ripple 時才送出 AccountSet
    async fn configure_issuer(&self, plan: &PoolPlan, issuer: &Wallet) -> Result<()> {
        let step = BootstrapStep::ConfigureIssuer;
        tracing::info!("⚙️ Configuring issuer account...");

        let info = self
            .client
            .account_info(&issuer.address)
            .await
            .map_err(|source| network(step, source))?;

        if info.has_flag(LSF_DEFAULT_RIPPLE) {
            tracing::info!("✅ Default Ripple already enabled, nothing to submit");
            return Ok(());
        }

        tracing::info!("🔄 Enabling Default Ripple...");
        let prepared = self.prepare(step, plan.account_set(&issuer.address)).await?;
        self.submit(step, prepared, issuer).await?;

        tracing::info!("✅ Configuration completed");
        Ok(())
    }

    async fn establish_trust_line(&self, plan: &PoolPlan, issuer: &Wallet, lp: &Wallet) -> Result<()> {
        let step = BootstrapStep::EstablishTrustLine;
        tracing::info!("🤝 Creating TrustLine (limit {})...", plan.trust_limit);

        let tx = plan.trust_set(&issuer.address, &lp.address);
        let prepared = self.prepare(step, tx).await?;
        self.submit(step, prepared, lp).await?;

        tracing::info!("✅ TrustLine established");
        Ok(())
    }

    async fn transfer_tokens(&self, plan: &PoolPlan, issuer: &Wallet, lp: &Wallet) -> Result<()> {
        let step = BootstrapStep::TransferTokens;
        tracing::info!(
            "💸 Sending {} {} tokens...",
            plan.transfer_amount,
            self.config.token_name
        );

        let tx = plan.payment(&issuer.address, &lp.address);
        let prepared = self.prepare(step, tx).await?;
        self.submit(step, prepared, issuer).await?;

        tracing::info!("✅ Tokens sent");
        Ok(())
    }

    /// 餘額不足時不送出 AMMCreate
    async fn verify_balance(&self, lp: &Wallet) -> Result<()> {
        let step = BootstrapStep::VerifyBalance;
        let required = self.config.xrp_amount;

        let available = self
            .client
            .xrp_balance(&lp.address)
            .await
            .map_err(|source| network(step, source))?;
        tracing::info!("💰 LP XRP Balance: {}", available);

        if available < required {
            return Err(BootstrapError::InsufficientBalance {
                required,
                available,
                shortfall: required - available,
            });
        }

        Ok(())
    }

    async fn create_pool(&self, plan: &PoolPlan, issuer: &Wallet, lp: &Wallet) -> Result<TransactionOutcome> {
        let step = BootstrapStep::CreatePool;
        tracing::info!("🌀 Creating liquidity pool...");

        let tx = plan.amm_create(&issuer.address, &lp.address, self.config.trading_fee);
        let mut prepared = self.prepare(step, tx).await?;
        prepared.extend_validity(self.config.last_ledger_buffer);

        tracing::info!("📦 Submitting AMM transaction...");
        let outcome = self.submit(step, prepared, lp).await?;

        tracing::info!("✅ Pool created: {}", outcome.hash);
        Ok(outcome)
    }

    /// 查詢新池子的狀態；失敗只記錄警告，不影響結果
    async fn fetch_pool_info(&self, plan: &PoolPlan, issuer: &Wallet) -> Option<PoolInfo> {
        tracing::info!("🔍 Checking pool status...");
        let asset = Asset::issued(plan.currency.as_str(), issuer.address.clone());

        match self.client.amm_info(&asset, &Asset::xrp()).await {
            Ok(info) => {
                tracing::info!(
                    "📊 Pool details: account={}, trading_fee={}",
                    info.account,
                    info.trading_fee
                );
                Some(info)
            }
            Err(e) => {
                tracing::warn!("⚠️ Could not fetch pool info: {}", e);
                None
            }
        }
    }

    async fn prepare(&self, step: BootstrapStep, tx: Transaction) -> Result<PreparedTransaction> {
        tracing::debug!("Autofilling {} for {}", tx.transaction_type(), tx.account());
        self.client
            .autofill(tx)
            .await
            .map_err(|source| network(step, source))
    }

    async fn submit(
        &self,
        step: BootstrapStep,
        prepared: PreparedTransaction,
        signer: &Wallet,
    ) -> Result<TransactionOutcome> {
        let signed = self
            .client
            .sign(&prepared, signer)
            .await
            .map_err(|source| network(step, source))?;

        tracing::debug!(
            "Submitting {} {} (LastLedgerSequence {})",
            prepared.transaction.transaction_type(),
            signed.hash,
            prepared.last_ledger_sequence
        );

        let outcome = match self.client.submit_and_wait(&signed).await {
            Ok(outcome) => outcome,
            Err(LedgerError::Expired { hash, .. }) => {
                return Err(BootstrapError::rejected(step, EXPIRED_RESULT.to_string(), hash));
            }
            Err(source) => return Err(network(step, source)),
        };

        if !outcome.is_success() {
            return Err(BootstrapError::rejected(step, outcome.result_code, outcome.hash));
        }

        Ok(outcome)
    }
}

fn network(step: BootstrapStep, source: LedgerError) -> BootstrapError {
    BootstrapError::Network { step, source }
}

fn advance(step: BootstrapStep) {
    if let Some(stage) = step.completed_stage() {
        tracing::debug!(stage = ?stage, "Stage reached");
    }
}
