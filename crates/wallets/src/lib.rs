//! # borderless-wallets
//!
//! Wallet session handling and transaction approval for the Borderless marketplace.
//!
//! The crate has two halves:
//! - [`SessionStore`] keeps the single active wallet session and talks to the
//!   [`WalletConnector`] (a browser extension in the web client).
//! - [`ApprovalGate`] holds the operations waiting for the user's consent and hands their
//!   decisions back to the waiting submissions.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod approval;
pub mod connector;
pub mod error;
pub mod session;
pub mod types;

pub use approval::{ApprovalDecision, ApprovalGate, PendingApproval};
pub use connector::WalletConnector;
pub use error::{ConnectorError, WalletError};
pub use session::{Disconnect, Session, SessionStore};
pub use types::{Address, NetworkContext, SignedPayload, UnsignedPayload};
