use borderless_wallets::WalletError;
use std::time::Duration;

/// Errors reported by the remote ledger service.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The request never reached the ledger or the response was lost.
    #[error("ledger transport error: {0}")]
    Transport(String),
    /// The ledger refused the request.
    #[error("rejected by the ledger: {0}")]
    Rejected(String),
    /// The ledger answered with something we could not interpret.
    #[error("invalid ledger response: {0}")]
    Decode(String),
}

/// Errors of [`TransactionSubmitter::submit`](crate::TransactionSubmitter::submit).
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("no wallet is connected")]
    NotConnected,
    /// The wallet session could not be established.
    #[error(transparent)]
    Session(WalletError),
    #[error("the user rejected the transaction")]
    UserRejected,
    #[error("listing {0} is not known")]
    UnknownListing(String),
    #[error("failed to sign transaction: {0}")]
    SigningFailed(String),
    #[error("failed to transmit transaction: {0}")]
    Transmission(String),
    #[error("transaction {hash} was not final after {timeout:?}")]
    Timeout { hash: String, timeout: Duration },
    #[error("transaction rejected by the ledger: {0}")]
    LedgerRejected(String),
}

impl SubmitError {
    /// Returns `true` if the user cancelled the submission.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected)
    }

    /// Maps an error of the transmission step.
    pub(crate) fn transmission(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(reason) => Self::LedgerRejected(reason),
            LedgerError::Transport(msg) | LedgerError::Decode(msg) => Self::Transmission(msg),
        }
    }
}

impl From<WalletError> for SubmitError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::UserRejected => Self::UserRejected,
            WalletError::SigningFailed(err) => Self::SigningFailed(err.to_string()),
            WalletError::NotConnected => Self::NotConnected,
            err @ (WalletError::Connection(_)
            | WalletError::AlreadyConnecting
            | WalletError::ConnectInterrupted) => Self::Session(err),
        }
    }
}

/// A failed marketplace refresh.
///
/// Cloneable, since every caller joined to the same in-flight refresh receives it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("failed to decode `{method}` result: {message}")]
    Decode { method: &'static str, message: String },
}
