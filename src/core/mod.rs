pub mod bootstrap;

pub use crate::domain::model::{
    AccountInfo, AccountRole, AccountSet, AmmCreate, Asset, BootstrapOutcome, BootstrapStage,
    BootstrapStep, IssuedAmount, Payment, PoolInfo, PreparedTransaction, SignedTransaction,
    Transaction, TransactionOutcome, TrustSet, Wallet,
};
pub use crate::domain::ports::{LedgerClient, LedgerClientFactory};
pub use crate::utils::error::Result;
