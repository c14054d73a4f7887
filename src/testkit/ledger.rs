use crate::domain::currency::drops_to_xrp;
use crate::domain::model::{
    AccountInfo, Amount, Asset, IssuedAmount, PoolInfo, PreparedTransaction, SignedTransaction,
    Transaction, TransactionOutcome, Wallet, SUCCESS_RESULT,
};
use crate::domain::ports::{LedgerClient, LedgerClientFactory};
use crate::utils::error::{LedgerError, LedgerResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 記錄下來的客戶端呼叫，依發生順序排列
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Connect,
    Disconnect,
    FundAccount,
    AccountInfo(String),
    XrpBalance(String),
    Autofill(String),
    Sign { transaction_type: String, signer: String },
    Submit(String),
    AmmInfo,
}

/// 注入的失敗點
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Connect,
    /// 第 N 次 (從 1 開始) faucet 請求失敗
    Funding { attempt: usize },
    AccountInfo,
    Balance,
    Submit { transaction_type: &'static str },
    /// 交易未在 LastLedgerSequence 之前驗證
    Expire { transaction_type: &'static str },
    AmmInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTransaction {
    pub transaction: Transaction,
    pub signer: String,
    pub hash: String,
    pub fee: String,
    pub sequence: u32,
    pub last_ledger_sequence: u32,
}

#[derive(Debug)]
struct FakeState {
    calls: Vec<LedgerCall>,
    submitted: Vec<SubmittedTransaction>,
    signed: HashMap<String, (PreparedTransaction, String)>,
    connects: usize,
    disconnects: usize,
    fundings: usize,
    wallets: Vec<Wallet>,
    issuer_flags: u32,
    lp_balance: Decimal,
    result_codes: HashMap<String, String>,
    failure: Option<Failure>,
    sequences: HashMap<String, u32>,
}

/// 可腳本化的帳本替身。clone 後共用同一份狀態，測試可在執行後檢查呼叫紀錄
#[derive(Debug, Clone)]
pub struct FakeLedger {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedger {
    pub const ISSUER_ADDRESS: &'static str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
    pub const LP_ADDRESS: &'static str = "rLUEXYuLiQptky37CqLcm9USQpPiz5rkpD";
    pub const CURRENT_LEDGER_INDEX: u32 = 1000;
    pub const AUTOFILL_LAST_LEDGER_SEQUENCE: u32 = Self::CURRENT_LEDGER_INDEX + 20;
    pub const OWNER_RESERVE_DROPS: &'static str = "200000";
    pub const BASE_FEE_DROPS: &'static str = "12";

    pub fn new() -> Self {
        let wallets = vec![
            Wallet::new(Self::ISSUER_ADDRESS, "snoPBrXtMeMyMHUVTgbuqAfg1SUTb"),
            Wallet::new(Self::LP_ADDRESS, "sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r"),
        ];

        Self {
            state: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                submitted: Vec::new(),
                signed: HashMap::new(),
                connects: 0,
                disconnects: 0,
                fundings: 0,
                wallets,
                issuer_flags: 0,
                lp_balance: Decimal::from(100),
                result_codes: HashMap::new(),
                failure: None,
                sequences: HashMap::new(),
            })),
        }
    }

    pub fn with_issuer_flags(self, flags: u32) -> Self {
        self.lock().issuer_flags = flags;
        self
    }

    pub fn with_lp_balance(self, balance: Decimal) -> Self {
        self.lock().lp_balance = balance;
        self
    }

    /// 指定某種交易的驗證結果代碼 (預設 tesSUCCESS)
    pub fn with_result_code(self, transaction_type: &str, code: &str) -> Self {
        self.lock()
            .result_codes
            .insert(transaction_type.to_string(), code.to_string());
        self
    }

    pub fn with_failure(self, failure: Failure) -> Self {
        self.lock().failure = Some(failure);
        self
    }

    pub fn issuer(&self) -> Wallet {
        self.lock().wallets[0].clone()
    }

    pub fn liquidity_provider(&self) -> Wallet {
        self.lock().wallets[1].clone()
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.lock().calls.clone()
    }

    pub fn submitted(&self) -> Vec<SubmittedTransaction> {
        self.lock().submitted.clone()
    }

    pub fn submitted_types(&self) -> Vec<String> {
        self.lock()
            .submitted
            .iter()
            .map(|s| s.transaction.transaction_type().to_string())
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    pub fn disconnect_count(&self) -> usize {
        self.lock().disconnects
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake ledger state poisoned")
    }

    fn injected(command: &str) -> LedgerError {
        LedgerError::Rpc {
            command: command.to_string(),
            error: "injected".to_string(),
            message: Some("failure injected by FakeLedger".to_string()),
        }
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn connect(&self) -> LedgerResult<()> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::Connect);
        if state.failure == Some(Failure::Connect) {
            return Err(LedgerError::ConnectionClosed);
        }
        state.connects += 1;
        Ok(())
    }

    async fn disconnect(&self) -> LedgerResult<()> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::Disconnect);
        state.disconnects += 1;
        Ok(())
    }

    async fn fund_account(&self) -> LedgerResult<Wallet> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::FundAccount);
        state.fundings += 1;
        let attempt = state.fundings;

        if state.failure == Some(Failure::Funding { attempt }) {
            return Err(LedgerError::Faucet {
                status: 503,
                body: "faucet unavailable".to_string(),
            });
        }

        if let Some(wallet) = state.wallets.get(attempt - 1).cloned() {
            return Ok(wallet);
        }

        let wallet = Wallet::new(format!("rExtraAccount{}", attempt), "sExtraSeed");
        state.wallets.push(wallet.clone());
        Ok(wallet)
    }

    async fn account_info(&self, address: &str) -> LedgerResult<AccountInfo> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::AccountInfo(address.to_string()));
        if state.failure == Some(Failure::AccountInfo) {
            return Err(Self::injected("account_info"));
        }

        let flags = if address == state.wallets[0].address {
            state.issuer_flags
        } else {
            0
        };
        let sequence = state.sequences.get(address).copied().unwrap_or(1);

        Ok(AccountInfo {
            address: address.to_string(),
            flags,
            sequence,
            balance_drops: 1_000_000_000,
        })
    }

    async fn xrp_balance(&self, address: &str) -> LedgerResult<Decimal> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::XrpBalance(address.to_string()));
        if state.failure == Some(Failure::Balance) {
            return Err(Self::injected("account_info"));
        }

        if address == state.wallets[1].address {
            Ok(state.lp_balance)
        } else {
            Ok(drops_to_xrp(1_000_000_000))
        }
    }

    async fn autofill(&self, transaction: Transaction) -> LedgerResult<PreparedTransaction> {
        let mut state = self.lock();
        state
            .calls
            .push(LedgerCall::Autofill(transaction.transaction_type().to_string()));

        let account = transaction.account().to_string();
        let sequence = {
            let next = state.sequences.entry(account).or_insert(1);
            let current = *next;
            *next += 1;
            current
        };
        let fee = match &transaction {
            Transaction::AmmCreate(_) => Self::OWNER_RESERVE_DROPS,
            _ => Self::BASE_FEE_DROPS,
        };

        Ok(PreparedTransaction {
            transaction,
            fee: fee.to_string(),
            sequence,
            last_ledger_sequence: Self::AUTOFILL_LAST_LEDGER_SEQUENCE,
            network_id: None,
        })
    }

    async fn sign(
        &self,
        transaction: &PreparedTransaction,
        wallet: &Wallet,
    ) -> LedgerResult<SignedTransaction> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::Sign {
            transaction_type: transaction.transaction.transaction_type().to_string(),
            signer: wallet.address.clone(),
        });

        let index = state.signed.len() + 1;
        let tx_blob = format!("FAKEBLOB{:04}", index);
        let hash = format!("{:064X}", index);
        state
            .signed
            .insert(tx_blob.clone(), (transaction.clone(), wallet.address.clone()));

        Ok(SignedTransaction {
            tx_blob,
            hash,
            last_ledger_sequence: transaction.last_ledger_sequence,
        })
    }

    async fn submit_and_wait(&self, signed: &SignedTransaction) -> LedgerResult<TransactionOutcome> {
        let mut state = self.lock();
        let (prepared, signer) = state
            .signed
            .get(&signed.tx_blob)
            .cloned()
            .ok_or_else(|| LedgerError::UnexpectedResponse(format!("unknown blob {}", signed.tx_blob)))?;
        let transaction_type = prepared.transaction.transaction_type();
        state.calls.push(LedgerCall::Submit(transaction_type.to_string()));

        if state.failure == Some(Failure::Submit { transaction_type }) {
            return Err(LedgerError::ConnectionClosed);
        }
        if state.failure == Some(Failure::Expire { transaction_type }) {
            return Err(LedgerError::Expired {
                hash: signed.hash.clone(),
                last_ledger_sequence: signed.last_ledger_sequence,
            });
        }

        state.submitted.push(SubmittedTransaction {
            transaction: prepared.transaction.clone(),
            signer,
            hash: signed.hash.clone(),
            fee: prepared.fee.clone(),
            sequence: prepared.sequence,
            last_ledger_sequence: prepared.last_ledger_sequence,
        });

        let result_code = state
            .result_codes
            .get(transaction_type)
            .cloned()
            .unwrap_or_else(|| SUCCESS_RESULT.to_string());
        let ledger_index = Self::CURRENT_LEDGER_INDEX + state.submitted.len() as u32;

        Ok(TransactionOutcome {
            hash: signed.hash.clone(),
            result_code,
            validated: true,
            ledger_index: Some(ledger_index),
        })
    }

    async fn amm_info(&self, asset: &Asset, asset2: &Asset) -> LedgerResult<PoolInfo> {
        let mut state = self.lock();
        state.calls.push(LedgerCall::AmmInfo);
        if state.failure == Some(Failure::AmmInfo) {
            return Err(LedgerError::Rpc {
                command: "amm_info".to_string(),
                error: "actNotFound".to_string(),
                message: None,
            });
        }

        let amm = state
            .submitted
            .iter()
            .rev()
            .find_map(|s| match &s.transaction {
                Transaction::AmmCreate(tx) => Some(tx.clone()),
                _ => None,
            })
            .ok_or_else(|| LedgerError::Rpc {
                command: "amm_info".to_string(),
                error: "actNotFound".to_string(),
                message: None,
            })?;

        debug_assert_eq!(Some(&amm.amount.issuer), asset.issuer.as_ref());
        debug_assert_eq!(asset2.currency, "XRP");

        Ok(PoolInfo {
            account: "rAMMPoolAccountFake1111111111111111".to_string(),
            amount: Amount::Issued(amm.amount.clone()),
            amount2: Amount::Drops(amm.amount2.clone()),
            lp_token: Some(IssuedAmount {
                currency: "03930D02208264E2E40EC1B0C09E4DB96EE197B1".to_string(),
                issuer: "rAMMPoolAccountFake1111111111111111".to_string(),
                value: "20000".to_string(),
            }),
            trading_fee: amm.trading_fee,
        })
    }
}

impl LedgerClientFactory for FakeLedger {
    type Client = FakeLedger;

    fn create(&self) -> LedgerResult<FakeLedger> {
        Ok(self.clone())
    }
}
