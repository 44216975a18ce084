//! The remote ledger the marketplace contract lives on.

use crate::error::LedgerError;
use async_trait::async_trait;
use borderless_wallets::{SignedPayload, UnsignedPayload};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Identifies a transmitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionHandle {
    /// The transaction hash assigned by the ledger.
    pub hash: String,
}

impl SubmissionHandle {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}

impl fmt::Display for SubmissionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

/// What the ledger knows about a transmitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LedgerStatus {
    /// Not visible to the ledger yet.
    NotFound,
    Pending,
    Success,
    /// Final failure, with the reason when the ledger reports one.
    Failed(Option<String>),
}

impl LedgerStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Success | Self::Failed(_))
    }
}

/// Client for the ledger service.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Transmits a signed transaction.
    async fn submit(&self, payload: &SignedPayload) -> Result<SubmissionHandle, LedgerError>;

    /// Looks up the status of a transmitted transaction.
    async fn get_status(&self, handle: &SubmissionHandle) -> Result<LedgerStatus, LedgerError>;

    /// Runs a read-only contract call and returns its result.
    async fn simulate(&self, query: &UnsignedPayload) -> Result<serde_json::Value, LedgerError>;
}

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for Arc<T> {
    async fn submit(&self, payload: &SignedPayload) -> Result<SubmissionHandle, LedgerError> {
        (**self).submit(payload).await
    }

    async fn get_status(&self, handle: &SubmissionHandle) -> Result<LedgerStatus, LedgerError> {
        (**self).get_status(handle).await
    }

    async fn simulate(&self, query: &UnsignedPayload) -> Result<serde_json::Value, LedgerError> {
        (**self).simulate(query).await
    }
}
