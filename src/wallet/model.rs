//! Wallet ledger models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

/// Provider tag recorded on escrow moves, as opposed to an external
/// payment provider's tag on deposits and withdrawals
pub const INTERNAL_PROVIDER: &str = "INTERNAL";

/// Wallet model: one row per user, two balance buckets in minor units
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Wallet {
    pub user_id: Uuid,
    /// Spendable balance
    pub balance_available: i64,
    /// Balance locked in open escrows
    pub balance_held: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Total funds attributed to the user across both buckets
    pub fn total(&self) -> i64 {
        self.balance_available + self.balance_held
    }
}

/// Ledger entry types
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    /// Money entering available (external credit or escrow payout)
    Deposit,
    /// Money leaving available for the outside world
    Withdrawal,
    /// available -> held, same user
    Hold,
    /// held leaving the payer toward a counterparty
    Release,
    /// held -> available, same user
    Refund,
}

/// Ledger entry status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
    Pending,
}

/// Immutable wallet transaction log entry
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tx_type: TxType,
    /// Always positive; direction comes from `tx_type`
    pub amount: i64,
    pub status: TxStatus,
    /// `INTERNAL` for escrow moves, otherwise the external payment
    /// provider's tag as supplied by the caller
    pub provider: Option<String>,
    /// Related entity (order, dispute) this entry belongs to
    pub reference_id: Option<Uuid>,
    pub meta: Option<Json<TxMeta>>,
    pub created_at: DateTime<Utc>,
}

/// What caused an escrow settlement
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettlementTrigger {
    BuyerConfirmation,
    AutoRelease,
    DisputeResolution,
}

/// Typed context attached to ledger entries.
///
/// Known shapes are tagged; anything else round-trips through the untagged
/// map fallback so old or external rows never fail to decode.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxMeta {
    OrderHold {
        order_id: Uuid,
        listing_id: Uuid,
    },
    OrderSettlement {
        order_id: Uuid,
        trigger: SettlementTrigger,
    },
    DisputeResolution {
        dispute_id: Uuid,
        order_id: Uuid,
        buyer_amount: i64,
        seller_amount: i64,
    },
    #[serde(untagged)]
    Other(serde_json::Map<String, serde_json::Value>),
}

/// Request DTO for depositing into the available balance
#[derive(Debug, Deserialize, Validate)]
pub struct DepositRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
    pub provider: Option<String>,
    pub reference_id: Option<Uuid>,
}

/// Request DTO for withdrawing from the available balance
#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
    pub provider: Option<String>,
    pub reference_id: Option<Uuid>,
}

/// Query parameters for listing wallet transactions
#[derive(Debug, Deserialize, Default)]
pub struct TxFilter {
    pub tx_type: Option<TxType>,
    pub status: Option<TxStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
