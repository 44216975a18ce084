use borderless_wallets::{ApprovalGate, PendingApproval};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Answers approval requests in the background until dropped.
#[derive(Debug)]
pub struct AutoDecide {
    task: JoinHandle<()>,
}

impl Drop for AutoDecide {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Answers every approval request on `gate` with `accepted`.
pub fn auto_decide(gate: &ApprovalGate, accepted: bool) -> AutoDecide {
    let gate = gate.clone();
    let mut rx = gate.subscribe();
    let task = tokio::spawn(async move {
        loop {
            let pending = rx.borrow_and_update().clone();
            if let Some(pending) = pending {
                trace!(id = %pending.id, accepted, "auto-deciding approval");
                gate.decide_for(pending.id, accepted);
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    });
    AutoDecide { task }
}

/// Waits until an approval is pending on `gate` and returns it.
///
/// # Panics
///
/// If nothing is requested within five seconds.
pub async fn next_approval(gate: &ApprovalGate) -> PendingApproval {
    let mut rx = gate.subscribe();
    let wait = rx.wait_for(Option::is_some);
    match tokio::time::timeout(Duration::from_secs(5), wait).await {
        Ok(Ok(pending)) => pending.clone().expect("checked by wait_for"),
        _ => panic!("no approval was requested"),
    }
}
