//! Local view of the marketplace.
//!
//! The cache holds the listings, requests and escrows last fetched from the ledger, together with
//! the local transaction history. Confirmed transactions are applied optimistically so the user
//! sees their effect before the next refresh; a refresh replaces the ledger-backed collections
//! wholesale, so the authoritative state always wins.

use crate::{
    error::RefreshError,
    ledger::LedgerClient,
    types::{DomainRecord, EscrowRecord, EscrowStatus, LISTING_SOLD, RecordKind, TransactionRecord},
};
use borderless_wallets::{Address, UnsignedPayload};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::BTreeMap, fmt, sync::Arc};
use tokio::sync::watch;

/// Contract methods queried on refresh.
const LIST_LISTINGS: &str = "list_products";
const LIST_REQUESTS: &str = "list_requests";
const LIST_ESCROWS: &str = "list_escrows";

type RefreshFuture = Shared<BoxFuture<'static, Result<(), RefreshError>>>;

/// Everything the cache knows at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub listings: Vec<DomainRecord>,
    pub requests: Vec<DomainRecord>,
    pub escrows: Vec<EscrowRecord>,
    /// Newest first.
    pub history: Vec<TransactionRecord>,
}

/// The local effect of a confirmed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptimisticUpdate {
    /// Inserts the listing at the front, or replaces the one with the same id.
    Listing(DomainRecord),
    /// Inserts the request at the front, or replaces the one with the same id.
    Request(DomainRecord),
    /// Marks the listing sold and records the new escrow.
    Purchase { listing_id: String, escrow: EscrowRecord },
    /// Moves an escrow forward.
    Escrow { escrow_id: String, status: EscrowStatus, delivery_proof: Option<String> },
}

/// Where read-only queries are sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryTarget {
    pub contract_id: String,
    pub network: String,
}

/// Shared marketplace cache.
#[derive(Clone)]
pub struct MarketCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    ledger: Arc<dyn LedgerClient>,
    target: QueryTarget,
    snapshot: RwLock<Snapshot>,
    /// Bumped on every mutation.
    version: watch::Sender<u64>,
    refreshing: Mutex<RefreshSlot>,
}

#[derive(Default)]
struct RefreshSlot {
    /// The refresh currently in flight, joined by concurrent callers.
    current: Option<RefreshFuture>,
    /// Set when a caller needs data newer than the in-flight fetch may have seen.
    rerun: bool,
}

impl fmt::Debug for MarketCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketCache")
            .field("target", &self.inner.target)
            .field("version", &*self.inner.version.borrow())
            .finish_non_exhaustive()
    }
}

// === impl MarketCache ===

impl MarketCache {
    pub fn new(ledger: Arc<dyn LedgerClient>, target: QueryTarget) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(CacheInner {
                ledger,
                target,
                snapshot: RwLock::new(Snapshot::default()),
                version,
                refreshing: Mutex::new(RefreshSlot::default()),
            }),
        }
    }

    /// Listings followed by requests.
    pub fn list(&self) -> Vec<DomainRecord> {
        let snapshot = self.inner.snapshot.read();
        snapshot.listings.iter().chain(&snapshot.requests).cloned().collect()
    }

    pub fn listings(&self) -> Vec<DomainRecord> {
        self.inner.snapshot.read().listings.clone()
    }

    pub fn requests(&self) -> Vec<DomainRecord> {
        self.inner.snapshot.read().requests.clone()
    }

    pub fn escrows(&self) -> Vec<EscrowRecord> {
        self.inner.snapshot.read().escrows.clone()
    }

    /// Local transaction history, newest first.
    pub fn history(&self) -> Vec<TransactionRecord> {
        self.inner.snapshot.read().history.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.read().clone()
    }

    pub fn listing(&self, id: &str) -> Option<DomainRecord> {
        self.inner.snapshot.read().listings.iter().find(|r| r.id == id).cloned()
    }

    pub fn request(&self, id: &str) -> Option<DomainRecord> {
        self.inner.snapshot.read().requests.iter().find(|r| r.id == id).cloned()
    }

    pub fn escrow(&self, id: &str) -> Option<EscrowRecord> {
        self.inner.snapshot.read().escrows.iter().find(|e| e.id == id).cloned()
    }

    /// Escrows in which `address` is the buyer or the seller.
    pub fn escrows_of(&self, address: &Address) -> Vec<EscrowRecord> {
        self.inner
            .snapshot
            .read()
            .escrows
            .iter()
            .filter(|e| e.buyer == *address || e.seller == *address)
            .cloned()
            .collect()
    }

    /// Subscribe to cache changes. The value is a counter bumped on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    /// Applies the effect of a confirmed transaction.
    pub fn apply_optimistic(&self, update: OptimisticUpdate) {
        {
            let mut snapshot = self.inner.snapshot.write();
            match update {
                OptimisticUpdate::Listing(record) => upsert_front(&mut snapshot.listings, record),
                OptimisticUpdate::Request(record) => upsert_front(&mut snapshot.requests, record),
                OptimisticUpdate::Purchase { listing_id, escrow } => {
                    if let Some(listing) = snapshot.listings.iter_mut().find(|l| l.id == listing_id)
                    {
                        listing.status = LISTING_SOLD.to_string();
                    }
                    upsert_front(&mut snapshot.escrows, escrow);
                }
                OptimisticUpdate::Escrow { escrow_id, status, delivery_proof } => {
                    match snapshot.escrows.iter_mut().find(|e| e.id == escrow_id) {
                        Some(escrow) => {
                            escrow.status = status;
                            if delivery_proof.is_some() {
                                escrow.delivery_proof = delivery_proof;
                            }
                        }
                        // picked up by the next refresh
                        None => debug!(target: "market::cache", %escrow_id, "escrow not cached"),
                    }
                }
            }
        }
        trace!(target: "market::cache", "applied optimistic update");
        self.bump();
    }

    /// Prepends a finished submission to the history.
    pub fn record_transaction(&self, record: TransactionRecord) {
        debug!(target: "market::cache", id = %record.id, status = %record.status, "recording transaction");
        self.inner.snapshot.write().history.insert(0, record);
        self.bump();
    }

    /// Re-fetches listings, requests and escrows from the ledger.
    ///
    /// Concurrent calls share a single fetch. On failure the cached state is left as it was.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        self.join_or_start(false).await
    }

    /// Runs a refresh in the background, logging failures.
    ///
    /// The refresh starts after this call: if a fetch is already in flight, its queries may
    /// predate the caller's change, so it is followed by one more fetch.
    pub fn schedule_refresh(&self) {
        let fut = self.join_or_start(true);
        tokio::spawn(async move {
            if let Err(err) = fut.await {
                warn!(target: "market::cache", %err, "scheduled refresh failed");
            }
        });
    }

    fn join_or_start(&self, rerun: bool) -> RefreshFuture {
        let mut slot = self.inner.refreshing.lock();
        if let Some(fut) = slot.current.clone() {
            trace!(target: "market::cache", rerun, "joining in-flight refresh");
            slot.rerun |= rerun;
            return fut;
        }
        let this = self.clone();
        let fut = async move {
            loop {
                let res = this.fetch().await;
                let rerun = {
                    let mut slot = this.inner.refreshing.lock();
                    let rerun = std::mem::take(&mut slot.rerun);
                    if !rerun {
                        slot.current = None;
                    }
                    rerun
                };
                if !rerun {
                    return res;
                }
                trace!(target: "market::cache", "fetching again for a later caller");
            }
        }
        .boxed()
        .shared();
        slot.current = Some(fut.clone());
        fut
    }

    async fn fetch(&self) -> Result<(), RefreshError> {
        trace!(target: "market::cache", "refreshing marketplace");
        let (listings, requests, escrows) = futures::future::try_join3(
            self.query::<WireRecord>(LIST_LISTINGS),
            self.query::<WireRecord>(LIST_REQUESTS),
            self.query::<EscrowRecord>(LIST_ESCROWS),
        )
        .await?;
        {
            let mut snapshot = self.inner.snapshot.write();
            snapshot.listings =
                listings.into_iter().map(|r| r.into_record(RecordKind::Listing)).collect();
            snapshot.requests =
                requests.into_iter().map(|r| r.into_record(RecordKind::Request)).collect();
            snapshot.escrows = escrows;
            debug!(
                target: "market::cache",
                listings = snapshot.listings.len(),
                requests = snapshot.requests.len(),
                escrows = snapshot.escrows.len(),
                "marketplace refreshed"
            );
        }
        self.bump();
        Ok(())
    }

    async fn query<T: DeserializeOwned>(&self, method: &'static str) -> Result<Vec<T>, RefreshError> {
        let query = UnsignedPayload {
            contract_id: self.inner.target.contract_id.clone(),
            method: method.to_string(),
            network: self.inner.target.network.clone(),
            fee: 0,
            parameters: BTreeMap::new(),
        };
        let value = self.inner.ledger.simulate(&query).await?;
        // an empty contract answers with nothing at all
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value)
            .map_err(|err| RefreshError::Decode { method, message: err.to_string() })
    }

    fn bump(&self) {
        self.inner.version.send_modify(|v| *v += 1);
    }
}

fn upsert_front<T: Keyed>(records: &mut Vec<T>, record: T) {
    match records.iter_mut().find(|r| r.key() == record.key()) {
        Some(existing) => *existing = record,
        None => records.insert(0, record),
    }
}

trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for DomainRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for EscrowRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// A listing or request as returned by the contract.
#[derive(Debug, Deserialize)]
struct WireRecord {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    price: String,
    owner: Address,
    #[serde(default)]
    status: String,
    #[serde(default)]
    delivery_estimate: String,
}

impl WireRecord {
    fn into_record(self, kind: RecordKind) -> DomainRecord {
        let Self { id, title, description, price, owner, status, delivery_estimate } = self;
        DomainRecord { id, kind, title, description, price, owner, status, delivery_estimate }
    }
}
