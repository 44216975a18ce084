use async_trait::async_trait;
use borderless_market::{LedgerClient, LedgerError, LedgerStatus, SubmissionHandle};
use borderless_wallets::{SignedPayload, UnsignedPayload};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::{
    collections::VecDeque,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

/// In-memory ledger.
///
/// Transactions are numbered `tx_1`, `tx_2`, ... in submission order. Status polls are answered
/// from a script, then with the final status, which defaults to success.
#[derive(Debug)]
pub struct MockLedger {
    statuses: Mutex<VecDeque<Result<LedgerStatus, LedgerError>>>,
    final_status: Mutex<LedgerStatus>,
    submit_error: Mutex<Option<LedgerError>>,
    simulate_error: Mutex<Option<LedgerError>>,
    simulate_delay: Mutex<Option<Duration>>,
    listings: Mutex<Value>,
    requests: Mutex<Value>,
    escrows: Mutex<Value>,
    submitted: Mutex<Vec<SignedPayload>>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    simulate_calls: AtomicUsize,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            final_status: Mutex::new(LedgerStatus::Success),
            submit_error: Mutex::new(None),
            simulate_error: Mutex::new(None),
            simulate_delay: Mutex::new(None),
            listings: Mutex::new(json!([])),
            requests: Mutex::new(json!([])),
            escrows: Mutex::new(json!([])),
            submitted: Mutex::new(Vec::new()),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            simulate_calls: AtomicUsize::new(0),
        }
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers the next status polls with `statuses`, in order.
    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = LedgerStatus>) {
        self.statuses.lock().extend(statuses.into_iter().map(Ok));
    }

    /// Fails the next status poll with `err`.
    pub fn script_status_error(&self, err: LedgerError) {
        self.statuses.lock().push_back(Err(err));
    }

    /// Status reported once the script is exhausted.
    pub fn set_final_status(&self, status: LedgerStatus) {
        *self.final_status.lock() = status;
    }

    pub fn fail_submit(&self, err: LedgerError) {
        *self.submit_error.lock() = Some(err);
    }

    pub fn fail_simulate(&self, err: Option<LedgerError>) {
        *self.simulate_error.lock() = err;
    }

    /// Delays every query. The answer reflects the ledger state when the query was made.
    pub fn delay_simulate(&self, delay: Duration) {
        *self.simulate_delay.lock() = Some(delay);
    }

    /// Listings returned by `list_products`.
    pub fn set_listings(&self, listings: Value) {
        *self.listings.lock() = listings;
    }

    /// Requests returned by `list_requests`.
    pub fn set_requests(&self, requests: Value) {
        *self.requests.lock() = requests;
    }

    /// Escrows returned by `list_escrows`.
    pub fn set_escrows(&self, escrows: Value) {
        *self.escrows.lock() = escrows;
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn simulate_calls(&self) -> usize {
        self.simulate_calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<SignedPayload> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn submit(&self, payload: &SignedPayload) -> Result<SubmissionHandle, LedgerError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(err) = self.submit_error.lock().clone() {
            return Err(err);
        }
        self.submitted.lock().push(payload.clone());
        trace!(n, "mock ledger accepted transaction");
        Ok(SubmissionHandle::new(format!("tx_{n}")))
    }

    async fn get_status(&self, handle: &SubmissionHandle) -> Result<LedgerStatus, LedgerError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.statuses.lock().pop_front();
        let status = scripted.unwrap_or_else(|| Ok(self.final_status.lock().clone()));
        trace!(%handle, ?status, "mock ledger status");
        status
    }

    async fn simulate(&self, query: &UnsignedPayload) -> Result<Value, LedgerError> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        let error = self.simulate_error.lock().clone();
        let answer = match error {
            Some(err) => Err(err),
            None => match query.method.as_str() {
                "list_products" => Ok(self.listings.lock().clone()),
                "list_requests" => Ok(self.requests.lock().clone()),
                "list_escrows" => Ok(self.escrows.lock().clone()),
                method => Err(LedgerError::Rejected(format!("unknown method `{method}`"))),
            },
        };
        let delay = *self.simulate_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}

/// A listing or request in the shape the contract returns it.
pub fn record_json(id: &str, title: &str, price: &str, owner: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "price": price,
        "owner": owner,
        "status": "active",
        "delivery_estimate": "",
    })
}

/// An escrow in the shape the contract returns it.
pub fn escrow_json(id: &str, listing_id: &str, buyer: &str, seller: &str, amount: &str) -> Value {
    json!({
        "id": id,
        "listing_id": listing_id,
        "buyer": buyer,
        "seller": seller,
        "amount": amount,
        "status": "pending",
        "transaction_id": id,
    })
}
