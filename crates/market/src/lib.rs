//! # borderless-market
//!
//! Transaction submission and the local marketplace cache.
//!
//! [`TransactionSubmitter`] takes a [`MarketOperation`] through user approval, signing,
//! transmission and polling until the ledger reports a final status. [`MarketCache`] mirrors the
//! marketplace state held by the ledger and applies confirmed transactions optimistically.
//! [`MarketClient`] wires both together with the wallet session.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod cache;
pub mod client;
pub mod error;
pub mod ledger;
pub mod operation;
pub mod refresh;
pub mod submitter;
pub mod types;

pub use cache::{MarketCache, OptimisticUpdate, QueryTarget, Snapshot};
pub use client::MarketClient;
pub use error::{LedgerError, RefreshError, SubmitError};
pub use ledger::{LedgerClient, LedgerStatus, SubmissionHandle};
pub use operation::{MarketOperation, NewListing, NewRequest};
pub use refresh::RefreshHandle;
pub use submitter::{SubmissionState, SubmitSettings, TransactionSubmitter};
pub use types::{
    DomainRecord, EscrowRecord, EscrowStatus, RecordKind, TransactionRecord, TxStatus,
};
