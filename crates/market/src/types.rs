//! Marketplace records.

use borderless_wallets::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a listing that can still be bought.
pub const LISTING_ACTIVE: &str = "active";
/// Status of a listing that has been purchased.
pub const LISTING_SOLD: &str = "sold";
/// Status of a request that is still looking for a traveller.
pub const REQUEST_OPEN: &str = "open";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A traveller offering to bring goods.
    Listing,
    /// A buyer asking for goods to be brought.
    Request,
}

/// A listing or a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: String,
    pub kind: RecordKind,
    pub title: String,
    pub description: String,
    pub price: String,
    pub owner: Address,
    /// Free-form, defined by the ledger or by the optimistic update that created the record.
    pub status: String,
    pub delivery_estimate: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Pending,
    Shipped,
    Delivered,
    Completed,
    Disputed,
}

/// Funds held between buyer and seller until delivery is confirmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub id: String,
    pub listing_id: String,
    pub buyer: Address,
    pub seller: Address,
    pub amount: String,
    pub status: EscrowStatus,
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_proof: Option<String>,
}

/// Status of the transaction submitter, and of a single transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        })
    }
}

/// One submission, as shown in the transaction history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// A local identifier until the ledger assigns the transaction hash.
    pub id: String,
    pub status: TxStatus,
    pub description: String,
    /// The contract method that was invoked.
    pub method: String,
    pub amount: Option<String>,
    pub counterparty: Option<Address>,
    pub timestamp: DateTime<Utc>,
    /// Why the transaction failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionRecord {
    /// A freshly started submission.
    pub fn pending(
        description: impl Into<String>,
        method: impl Into<String>,
        amount: Option<String>,
        counterparty: Option<Address>,
    ) -> Self {
        Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            status: TxStatus::Pending,
            description: description.into(),
            method: method.into(),
            amount,
            counterparty,
            timestamp: Utc::now(),
            error: None,
        }
    }
}
