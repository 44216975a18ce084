use async_trait::async_trait;
use borderless_wallets::{
    Address, ConnectorError, NetworkContext, SignedPayload, UnsignedPayload, WalletConnector,
};
use parking_lot::Mutex;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

/// Wallet connector that grants access and signs everything unless told otherwise.
#[derive(Debug)]
pub struct MockConnector {
    address: Address,
    access_error: Mutex<Option<ConnectorError>>,
    access_delay: Mutex<Option<Duration>>,
    sign_error: Mutex<Option<ConnectorError>>,
    signed: Mutex<Vec<UnsignedPayload>>,
    access_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new(crate::user())
    }
}

impl MockConnector {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            access_error: Mutex::new(None),
            access_delay: Mutex::new(None),
            sign_error: Mutex::new(None),
            signed: Mutex::new(Vec::new()),
            access_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }

    /// Fails every access request with `err`.
    pub fn deny_access(&self, err: ConnectorError) {
        *self.access_error.lock() = Some(err);
    }

    /// Delays every access request.
    pub fn delay_access(&self, delay: Duration) {
        *self.access_delay.lock() = Some(delay);
    }

    /// Fails every signature with `err`.
    pub fn fail_signing(&self, err: ConnectorError) {
        *self.sign_error.lock() = Some(err);
    }

    pub fn access_calls(&self) -> usize {
        self.access_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    /// Payloads signed so far, oldest first.
    pub fn signed(&self) -> Vec<UnsignedPayload> {
        self.signed.lock().clone()
    }
}

#[async_trait]
impl WalletConnector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn request_access(&self) -> Result<Address, ConnectorError> {
        self.access_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.access_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let err = self.access_error.lock().clone();
        match err {
            Some(err) => Err(err),
            None => Ok(self.address.clone()),
        }
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_payload(
        &self,
        payload: &UnsignedPayload,
        network: &NetworkContext,
    ) -> Result<SignedPayload, ConnectorError> {
        let n = self.sign_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let err = self.sign_error.lock().clone();
        if let Some(err) = err {
            trace!(%err, "mock signature failed");
            return Err(err);
        }
        self.signed.lock().push(payload.clone());
        Ok(SignedPayload::new(format!("{}:{}:{}:{n}", network.network, payload.method, self.address)))
    }
}
