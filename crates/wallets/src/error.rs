/// Failure reported by a wallet capability (browser extension, hardware device, ...).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    #[error("the user denied the request")]
    Denied,
    #[error("no wallet extension is installed")]
    NotInstalled,
    #[error("the wallet did not respond in time")]
    Timeout,
    #[error("{0}")]
    Other(String),
}

impl ConnectorError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("failed to connect wallet: {0}")]
    Connection(ConnectorError),
    #[error("a wallet connection is already in progress")]
    AlreadyConnecting,
    /// The session was disconnected while the wallet was still authorizing.
    #[error("the wallet connection was interrupted by a disconnect")]
    ConnectInterrupted,
    #[error("no wallet is connected")]
    NotConnected,
    #[error("the user rejected the transaction")]
    UserRejected,
    #[error("failed to sign transaction: {0}")]
    SigningFailed(ConnectorError),
}

impl WalletError {
    /// Returns `true` if this error is the user cancelling the operation.
    ///
    /// Cancellation is expected feedback, not a failure.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected)
    }
}
