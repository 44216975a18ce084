//! Human approval of transactions before they are signed.
//!
//! Every submission publishes a [`PendingApproval`] and waits until the presentation layer calls
//! [`ApprovalGate::decide`]. Requests are answered strictly in arrival order; each one owns its
//! own response channel, so a second request never takes over the first one's answer.

use crate::{error::WalletError, types::UnsignedPayload};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

mod queue;
use queue::{Entry, RequestQueue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Awaiting,
    Approved,
    Rejected,
}

/// An operation waiting for the user's decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingApproval {
    pub id: Uuid,
    /// Human readable summary of the operation.
    pub description: String,
    /// What will be signed if the user approves.
    pub payload: UnsignedPayload,
    pub decision: ApprovalDecision,
}

/// Single point through which every submission obtains the user's consent.
#[derive(Clone, Debug)]
pub struct ApprovalGate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    queue: Mutex<RequestQueue<PendingApproval, ApprovalDecision>>,
    /// The approval currently shown to the user: the front of the queue.
    current: watch::Sender<Option<PendingApproval>>,
}

impl Default for ApprovalGate {
    fn default() -> Self {
        Self::new()
    }
}

// === impl ApprovalGate ===

impl ApprovalGate {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { inner: Arc::new(GateInner { queue: Mutex::new(RequestQueue::new()), current }) }
    }

    /// Publishes an approval request and waits for the user's decision.
    ///
    /// Fails with [`WalletError::UserRejected`] if the user rejects. Dropping the returned future
    /// withdraws the request.
    pub async fn request_approval(
        &self,
        description: impl Into<String>,
        payload: UnsignedPayload,
    ) -> Result<(), WalletError> {
        let approval = PendingApproval {
            id: Uuid::new_v4(),
            description: description.into(),
            payload,
            decision: ApprovalDecision::Awaiting,
        };
        let id = approval.id;
        let (tx, rx) = oneshot::channel();
        {
            let mut queue = self.inner.queue.lock();
            queue.add_request(id, approval, tx);
            debug!(target: "wallets::approval", %id, queued = queue.len(), "approval requested");
            self.publish(&queue);
        }

        let _withdraw = WithdrawOnDrop { gate: self, id };
        match rx.await {
            Ok(ApprovalDecision::Approved) => Ok(()),
            Ok(_) | Err(_) => Err(WalletError::UserRejected),
        }
    }

    /// Resolves the approval currently shown to the user.
    ///
    /// Returns the resolved approval, or `None` if nothing was pending, in which case this is a
    /// no-op.
    pub fn decide(&self, accepted: bool) -> Option<PendingApproval> {
        let entry = {
            let mut queue = self.inner.queue.lock();
            let entry = queue.pop_request();
            if entry.is_some() {
                self.publish(&queue);
            }
            entry
        };
        match entry {
            Some(entry) => Some(Self::resolve(entry, accepted)),
            None => {
                debug!(target: "wallets::approval", accepted, "no pending approval, ignoring decision");
                None
            }
        }
    }

    /// Resolves the approval with the given id, wherever it is in the queue.
    pub fn decide_for(&self, id: Uuid, accepted: bool) -> Option<PendingApproval> {
        let entry = {
            let mut queue = self.inner.queue.lock();
            let entry = queue.remove_request(&id)?;
            self.publish(&queue);
            entry
        };
        Some(Self::resolve(entry, accepted))
    }

    /// The approval currently shown to the user, if any.
    pub fn pending(&self) -> Option<PendingApproval> {
        self.inner.current.borrow().clone()
    }

    /// Number of approvals waiting, including the one shown.
    pub fn len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.lock().is_empty()
    }

    /// Subscribe to the approval currently shown to the user.
    pub fn subscribe(&self) -> watch::Receiver<Option<PendingApproval>> {
        self.inner.current.subscribe()
    }

    fn resolve(entry: Entry<PendingApproval, ApprovalDecision>, accepted: bool) -> PendingApproval {
        let decision = if accepted { ApprovalDecision::Approved } else { ApprovalDecision::Rejected };
        let Entry { id, mut request, responder } = entry;
        request.decision = decision;
        if responder.send(decision).is_err() {
            // the requester went away in the meantime
            trace!(target: "wallets::approval", %id, "approval resolved without a waiting requester");
        }
        debug!(target: "wallets::approval", %id, ?decision, "approval resolved");
        request
    }

    fn publish(&self, queue: &RequestQueue<PendingApproval, ApprovalDecision>) {
        let next = queue.read_request().cloned();
        self.inner.current.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// Removes an abandoned request from the queue.
struct WithdrawOnDrop<'a> {
    gate: &'a ApprovalGate,
    id: Uuid,
}

impl Drop for WithdrawOnDrop<'_> {
    fn drop(&mut self) {
        let mut queue = self.gate.inner.queue.lock();
        if queue.remove_request(&self.id).is_some() {
            debug!(target: "wallets::approval", id = %self.id, "approval request withdrawn");
            self.gate.publish(&queue);
        }
    }
}
