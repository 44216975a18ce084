use crate::{
    error::ConnectorError,
    types::{Address, NetworkContext, SignedPayload, UnsignedPayload},
};
use async_trait::async_trait;
use std::sync::Arc;

/// A wallet capability the application talks to, usually a browser extension.
///
/// The connector is opaque to the rest of the crate: it can hand out the user's address and sign
/// payloads, and every call may suspend until the user reacts in the wallet's own UI.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Identifier of the wallet, e.g. `freighter`.
    fn name(&self) -> &str;

    /// Asks the wallet to authorize this application and returns the selected account.
    async fn request_access(&self) -> Result<Address, ConnectorError>;

    /// Tells the wallet the application no longer uses the connection.
    async fn disconnect(&self) -> Result<(), ConnectorError>;

    /// Signs `payload` for the given network.
    async fn sign_payload(
        &self,
        payload: &UnsignedPayload,
        network: &NetworkContext,
    ) -> Result<SignedPayload, ConnectorError>;
}

#[async_trait]
impl<T: WalletConnector + ?Sized> WalletConnector for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn request_access(&self) -> Result<Address, ConnectorError> {
        (**self).request_access().await
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        (**self).disconnect().await
    }

    async fn sign_payload(
        &self,
        payload: &UnsignedPayload,
        network: &NetworkContext,
    ) -> Result<SignedPayload, ConnectorError> {
        (**self).sign_payload(payload, network).await
    }
}
