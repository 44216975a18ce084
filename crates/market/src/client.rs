use crate::{
    cache::{MarketCache, QueryTarget},
    error::SubmitError,
    ledger::LedgerClient,
    operation::{MarketOperation, NewListing, NewRequest},
    refresh::RefreshHandle,
    submitter::{SubmitSettings, TransactionSubmitter},
    types::TransactionRecord,
};
use borderless_config::Config;
use borderless_wallets::{
    Address, ApprovalGate, Disconnect, SessionStore, WalletConnector, WalletError,
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

/// Everything the presentation layer talks to, wired together.
///
/// Connecting starts the periodic marketplace refresh, disconnecting stops it.
#[derive(Debug)]
pub struct MarketClient {
    session: SessionStore,
    gate: ApprovalGate,
    cache: MarketCache,
    submitter: TransactionSubmitter,
    refresh_interval: Duration,
    refresher: Mutex<Option<RefreshHandle>>,
}

impl MarketClient {
    pub fn new(
        config: &Config,
        connector: Arc<dyn WalletConnector>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        let session = SessionStore::new(connector, config.connect_timeout());
        let gate = ApprovalGate::new();
        let cache = MarketCache::new(
            Arc::clone(&ledger),
            QueryTarget { contract_id: config.contract_id.clone(), network: config.network.clone() },
        );
        let submitter = TransactionSubmitter::new(
            session.clone(),
            gate.clone(),
            ledger,
            cache.clone(),
            SubmitSettings::from_config(config),
        );
        Self {
            session,
            gate,
            cache,
            submitter,
            refresh_interval: config.refresh_interval(),
            refresher: Mutex::new(None),
        }
    }

    /// Connects the wallet and starts refreshing the marketplace.
    pub async fn connect(&self) -> Result<Address, WalletError> {
        let address = self.session.connect().await?;
        let mut refresher = self.refresher.lock();
        if refresher.is_none() {
            *refresher = Some(RefreshHandle::spawn(self.cache.clone(), self.refresh_interval));
        }
        Ok(address)
    }

    /// Stops refreshing and disconnects the wallet.
    pub async fn disconnect(&self) -> Disconnect {
        if let Some(refresher) = self.refresher.lock().take() {
            refresher.shutdown();
        }
        self.session.disconnect().await
    }

    /// Returns `true` while the periodic refresh runs.
    pub fn is_refreshing(&self) -> bool {
        self.refresher.lock().as_ref().is_some_and(|r| !r.is_finished())
    }

    pub async fn add_listing(&self, listing: NewListing) -> Result<TransactionRecord, SubmitError> {
        self.submitter.submit(MarketOperation::AddListing(listing)).await
    }

    pub async fn add_request(&self, request: NewRequest) -> Result<TransactionRecord, SubmitError> {
        self.submitter.submit(MarketOperation::AddRequest(request)).await
    }

    pub async fn purchase(
        &self,
        listing_id: impl Into<String>,
        amount: impl Into<String>,
    ) -> Result<TransactionRecord, SubmitError> {
        let op = MarketOperation::Purchase { listing_id: listing_id.into(), amount: amount.into() };
        self.submitter.submit(op).await
    }

    pub async fn confirm_delivery(
        &self,
        escrow_id: impl Into<String>,
    ) -> Result<TransactionRecord, SubmitError> {
        self.submitter.submit(MarketOperation::ConfirmDelivery { escrow_id: escrow_id.into() }).await
    }

    pub async fn add_delivery_proof(
        &self,
        escrow_id: impl Into<String>,
        proof_hash: impl Into<String>,
    ) -> Result<TransactionRecord, SubmitError> {
        let op = MarketOperation::AddDeliveryProof {
            escrow_id: escrow_id.into(),
            proof_hash: proof_hash.into(),
        };
        self.submitter.submit(op).await
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn approvals(&self) -> &ApprovalGate {
        &self.gate
    }

    pub fn cache(&self) -> &MarketCache {
        &self.cache
    }

    pub fn submitter(&self) -> &TransactionSubmitter {
        &self.submitter
    }
}
