//! Test doubles shared by unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! - [`ledger`]: `FakeLedger`, a scripted [`LedgerClient`](crate::domain::ports::LedgerClient)
//!   that records every call, connection open/close and submitted transaction.

pub mod ledger;

pub use ledger::{Failure, FakeLedger, LedgerCall, SubmittedTransaction};
