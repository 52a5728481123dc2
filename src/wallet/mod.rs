//! Wallet ledger domain module
//!
//! Every user has one wallet with two balance buckets: `available` (spendable)
//! and `held` (escrowed). All money movement in the system goes through this
//! module, and every mutation writes an immutable transaction row in the same
//! database transaction as the balance change.

mod model;
mod service;

pub use model::*;
pub use service::WalletService;
