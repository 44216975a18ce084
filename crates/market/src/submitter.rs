//! Drives a marketplace operation from approval to ledger finality.
//!
//! A submission moves through approval, signing, transmission and polling. Only one submission is
//! in flight at a time; later calls wait for the current one to finish. After a submission
//! reaches a terminal status the observable status returns to idle once the reset delay has
//! passed, unless another submission started in the meantime.

use crate::{
    cache::MarketCache,
    error::SubmitError,
    ledger::{LedgerClient, LedgerStatus, SubmissionHandle},
    operation::MarketOperation,
    types::{TransactionRecord, TxStatus},
};
use borderless_config::Config;
use borderless_wallets::{ApprovalGate, NetworkContext, SessionStore};
use serde::Serialize;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::{Mutex, watch};

/// Settings of the transaction submitter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitSettings {
    pub contract_id: String,
    pub network: NetworkContext,
    /// Fee attached to every transaction.
    pub fee: u64,
    /// Delay between two status polls.
    pub poll_interval: Duration,
    /// How long to wait for finality before giving up.
    pub transaction_timeout: Duration,
    /// How long a terminal status stays visible.
    pub status_reset_delay: Duration,
}

impl SubmitSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            contract_id: config.contract_id.clone(),
            network: NetworkContext {
                network: config.network.clone(),
                passphrase: config.network_passphrase.clone(),
            },
            fee: config.base_fee,
            poll_interval: config.poll_interval(),
            transaction_timeout: config.transaction_timeout(),
            status_reset_delay: config.status_reset_delay(),
        }
    }
}

/// The observable state of the submitter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionState {
    pub status: TxStatus,
    /// The current or most recent submission.
    pub record: Option<TransactionRecord>,
}

impl SubmissionState {
    /// Hash of the most recent transaction the ledger accepted.
    pub fn last_transaction_hash(&self) -> Option<&str> {
        self.record.as_ref().filter(|r| !r.id.starts_with("local-")).map(|r| r.id.as_str())
    }
}

/// Submits marketplace operations.
#[derive(Clone)]
pub struct TransactionSubmitter {
    inner: Arc<SubmitterInner>,
}

struct SubmitterInner {
    session: SessionStore,
    gate: ApprovalGate,
    ledger: Arc<dyn LedgerClient>,
    cache: MarketCache,
    settings: SubmitSettings,
    state: watch::Sender<SubmissionState>,
    /// Held for the whole lifetime of a submission.
    in_flight: Mutex<()>,
    /// Incremented whenever a submission starts, guards the delayed reset to idle.
    epoch: AtomicU64,
}

impl std::fmt::Debug for TransactionSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSubmitter")
            .field("settings", &self.inner.settings)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

// === impl TransactionSubmitter ===

impl TransactionSubmitter {
    pub fn new(
        session: SessionStore,
        gate: ApprovalGate,
        ledger: Arc<dyn LedgerClient>,
        cache: MarketCache,
        settings: SubmitSettings,
    ) -> Self {
        let (state, _) = watch::channel(SubmissionState::default());
        Self {
            inner: Arc::new(SubmitterInner {
                session,
                gate,
                ledger,
                cache,
                settings,
                state,
                in_flight: Mutex::new(()),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Submits `operation` with its default description.
    pub async fn submit(&self, operation: MarketOperation) -> Result<TransactionRecord, SubmitError> {
        let description = operation.describe();
        self.submit_with_description(operation, description).await
    }

    /// Submits `operation`, showing `description` to the user for approval.
    ///
    /// Resolves once the transaction is final. On success the operation's effect is applied to
    /// the cache and a refresh is scheduled; on failure the cache is not touched. A rejection by
    /// the user leaves no trace in the history.
    ///
    /// Dropping the returned future abandons the submission and stops polling. The state returns
    /// to its default. A transaction that was already transmitted is not recalled and its outcome
    /// is not recorded; its hash is logged.
    pub async fn submit_with_description(
        &self,
        operation: MarketOperation,
        description: impl Into<String>,
    ) -> Result<TransactionRecord, SubmitError> {
        let description = description.into();
        let _serial = self.inner.in_flight.lock().await;
        let inner = &self.inner;

        let owner = inner.session.address().ok_or(SubmitError::NotConnected)?;
        let prepared = operation.prepare(&owner, &inner.settings, &inner.cache)?;
        let mut record = TransactionRecord::pending(
            description.clone(),
            operation.method(),
            prepared.amount.clone(),
            prepared.counterparty.clone(),
        );
        let mut tracker = Tracker::begin(inner, record.clone());
        debug!(target: "market::submit", id = %record.id, method = operation.method(), "submission started");

        if let Err(err) = inner.gate.request_approval(description, prepared.payload.clone()).await {
            debug!(target: "market::submit", id = %record.id, "submission rejected by the user");
            tracker.cancel();
            return Err(err.into());
        }

        let signed = match inner.session.sign(&prepared.payload, &inner.settings.network).await {
            Ok(signed) => signed,
            Err(err) => return Err(tracker.fail(record, err.into())),
        };

        let handle = match inner.ledger.submit(&signed).await {
            Ok(handle) => handle,
            Err(err) => return Err(tracker.fail(record, SubmitError::transmission(err))),
        };
        record.id = handle.hash.clone();
        tracker.transmitted(record.clone());
        debug!(target: "market::submit", hash = %handle, "transaction transmitted");

        if let Err(err) = self.wait_for_finality(&handle).await {
            return Err(tracker.fail(record, err));
        }

        record.status = TxStatus::Success;
        let update = operation.optimistic_update(&owner, &record.id, &prepared);
        inner.cache.record_transaction(record.clone());
        inner.cache.apply_optimistic(update);
        inner.cache.schedule_refresh();
        tracker.succeed(record.clone());
        info!(target: "market::submit", hash = %record.id, "transaction succeeded");
        Ok(record)
    }

    /// Polls the ledger until the transaction is final or the timeout elapses.
    ///
    /// Lookup errors are retried until the deadline.
    async fn wait_for_finality(&self, handle: &SubmissionHandle) -> Result<(), SubmitError> {
        let settings = &self.inner.settings;
        let poll = async {
            loop {
                tokio::time::sleep(settings.poll_interval).await;
                match self.inner.ledger.get_status(handle).await {
                    Ok(LedgerStatus::Success) => return Ok(()),
                    Ok(LedgerStatus::Failed(reason)) => {
                        let reason = reason.unwrap_or_else(|| "transaction failed".to_string());
                        return Err(SubmitError::LedgerRejected(reason));
                    }
                    Ok(status) => {
                        trace!(target: "market::submit", hash = %handle, ?status, "not final yet");
                    }
                    Err(err) => {
                        warn!(target: "market::submit", hash = %handle, %err, "status lookup failed, retrying");
                    }
                }
            }
        };
        tokio::time::timeout(settings.transaction_timeout, poll).await.map_err(|_| {
            SubmitError::Timeout { hash: handle.hash.clone(), timeout: settings.transaction_timeout }
        })?
    }

    pub fn state(&self) -> SubmissionState {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> TxStatus {
        self.inner.state.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.inner.state.subscribe()
    }

    pub fn settings(&self) -> &SubmitSettings {
        &self.inner.settings
    }
}

/// Publishes the progress of one submission.
///
/// Dropped without reaching a terminal status, the submission was abandoned and the state
/// returns to its default.
struct Tracker<'a> {
    inner: &'a Arc<SubmitterInner>,
    epoch: u64,
    done: bool,
    /// Ledger hash, once transmitted.
    hash: Option<String>,
}

impl<'a> Tracker<'a> {
    fn begin(inner: &'a Arc<SubmitterInner>, record: TransactionRecord) -> Self {
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        inner.state.send_replace(SubmissionState { status: TxStatus::Pending, record: Some(record) });
        Self { inner, epoch, done: false, hash: None }
    }

    fn transmitted(&mut self, record: TransactionRecord) {
        self.hash = Some(record.id.clone());
        self.inner.state.send_modify(|state| state.record = Some(record));
    }

    /// The user rejected: back to idle without a record.
    fn cancel(mut self) {
        self.done = true;
        self.inner.state.send_replace(SubmissionState::default());
    }

    fn fail(mut self, mut record: TransactionRecord, err: SubmitError) -> SubmitError {
        warn!(target: "market::submit", id = %record.id, %err, "transaction failed");
        record.status = TxStatus::Failed;
        record.error = Some(err.to_string());
        self.inner.cache.record_transaction(record.clone());
        self.finish(record);
        err
    }

    fn succeed(mut self, record: TransactionRecord) {
        self.finish(record);
    }

    fn finish(&mut self, record: TransactionRecord) {
        self.done = true;
        let status = record.status;
        self.inner.state.send_replace(SubmissionState { status, record: Some(record) });
        self.schedule_reset();
    }

    fn schedule_reset(&self) {
        let inner = Arc::clone(self.inner);
        let epoch = self.epoch;
        tokio::spawn(async move {
            tokio::time::sleep(inner.settings.status_reset_delay).await;
            if inner.epoch.load(Ordering::SeqCst) == epoch {
                inner.state.send_modify(|state| state.status = TxStatus::Idle);
            }
        });
    }
}

impl Drop for Tracker<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        match &self.hash {
            Some(hash) => {
                warn!(target: "market::submit", %hash, "submission abandoned after transmission, outcome unknown");
            }
            None => debug!(target: "market::submit", "submission abandoned"),
        }
        self.inner.state.send_replace(SubmissionState::default());
    }
}
