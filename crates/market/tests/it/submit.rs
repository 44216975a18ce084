use crate::utils::{Harness, eventually};
use borderless_market::{
    LedgerError, LedgerStatus, MarketOperation, NewListing, SubmissionState, SubmitError, TxStatus,
};
use borderless_test_utils::{SELLER, auto_decide, next_approval, record_json, seller, user};
use borderless_wallets::ConnectorError;
use serde_json::json;
use std::time::Duration;

fn listing(title: &str) -> MarketOperation {
    MarketOperation::AddListing(NewListing {
        title: title.to_string(),
        price: "100".to_string(),
        ..Default::default()
    })
}

#[tokio::test]
async fn approved_listing_reaches_cache() -> eyre::Result<()> {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);

    let op: MarketOperation = serde_json::from_value(
        json!({ "type": "add_listing", "title": "Route A→B", "price": "100" }),
    )?;
    let record = h.client.submitter().submit_with_description(op, "Add listing").await?;
    assert_eq!(record.id, "tx_1");
    assert_eq!(record.status, TxStatus::Success);
    assert_eq!(record.description, "Add listing");

    // the refresh scheduled on success has not run yet on this single-threaded runtime
    let listings = h.client.cache().listings();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].title, "Route A→B");
    assert_eq!(listings[0].id, "tx_1");
    assert_eq!(listings[0].owner, user());

    let history = h.client.cache().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], record);

    assert_eq!(h.connector.sign_calls(), 1);
    assert_eq!(h.ledger.submit_calls(), 1);
    let state = h.client.submitter().state();
    assert_eq!(state.status, TxStatus::Success);
    assert_eq!(state.last_transaction_hash(), Some("tx_1"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn ledger_failure_leaves_cache_unchanged() {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);
    h.ledger.script_statuses([LedgerStatus::Pending, LedgerStatus::Pending, LedgerStatus::Pending]);
    h.ledger.set_final_status(LedgerStatus::Failed(Some("txFailed".to_string())));

    let err = h.client.submitter().submit(listing("Route A→B")).await.unwrap_err();
    assert!(matches!(err, SubmitError::LedgerRejected(ref reason) if reason == "txFailed"), "{err:?}");
    assert_eq!(h.ledger.status_calls(), 4);

    let snapshot = h.client.cache().snapshot();
    assert!(snapshot.listings.is_empty());
    assert!(snapshot.requests.is_empty());
    assert!(snapshot.escrows.is_empty());
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0].id, "tx_1");
    assert_eq!(snapshot.history[0].status, TxStatus::Failed);
    assert!(snapshot.history[0].error.as_deref().unwrap().contains("txFailed"));

    // no refresh is scheduled after a failure
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.ledger.simulate_calls(), 0);
    assert_eq!(h.client.submitter().status(), TxStatus::Failed);
}

#[tokio::test]
async fn rejection_reaches_no_collaborator() {
    let h = Harness::connected().await;
    let submitter = h.client.submitter().clone();
    let task = tokio::spawn(async move { submitter.submit(listing("Route A→B")).await });

    let pending = next_approval(h.client.approvals()).await;
    assert_eq!(pending.payload.method, "add_product");
    assert_eq!(h.client.submitter().status(), TxStatus::Pending);
    h.client.approvals().decide(false);

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_user_rejection());
    assert_eq!(h.connector.sign_calls(), 0);
    assert_eq!(h.ledger.submit_calls(), 0);
    assert_eq!(h.ledger.status_calls(), 0);
    assert!(h.client.cache().history().is_empty());
    assert!(h.client.cache().listings().is_empty());
    assert_eq!(h.client.submitter().state(), SubmissionState::default());
}

#[tokio::test]
async fn approval_precedes_signing() {
    let h = Harness::connected().await;
    let submitter = h.client.submitter().clone();
    let task = tokio::spawn(async move { submitter.submit(listing("Route A→B")).await });

    let pending = next_approval(h.client.approvals()).await;
    assert_eq!(pending.description, "Add listing: Route A→B");
    assert_eq!(pending.payload.parameter("seller"), Some(user().as_str()));
    assert_eq!(pending.payload.parameter("price"), Some("100"));
    assert_eq!(pending.payload.contract_id, "CMARKETPLACE");
    assert_eq!(h.connector.sign_calls(), 0);

    h.client.approvals().decide(true);
    task.await.unwrap().unwrap();
    assert_eq!(h.connector.sign_calls(), 1);
    assert_eq!(h.connector.signed(), vec![pending.payload]);
    assert!(h.client.approvals().is_empty());
}

#[tokio::test]
async fn submit_requires_connection() {
    let h = Harness::new();
    let err = h.client.submitter().submit(listing("Route A→B")).await.unwrap_err();
    assert!(matches!(err, SubmitError::NotConnected), "{err:?}");
    assert!(h.client.approvals().is_empty());
    assert_eq!(h.client.submitter().status(), TxStatus::Idle);
}

#[tokio::test]
async fn signing_failure_is_recorded() {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);
    h.connector.fail_signing(ConnectorError::Denied);

    let err = h.client.submitter().submit(listing("Route A→B")).await.unwrap_err();
    assert!(matches!(err, SubmitError::SigningFailed(_)), "{err:?}");
    assert_eq!(h.ledger.submit_calls(), 0);

    let history = h.client.cache().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, TxStatus::Failed);
    assert!(history[0].id.starts_with("local-"));
    assert_eq!(h.client.submitter().status(), TxStatus::Failed);
    assert_eq!(h.client.submitter().state().last_transaction_hash(), None);
}

#[tokio::test]
async fn transmission_failure_is_not_retried() {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);
    h.ledger.fail_submit(LedgerError::Transport("connection refused".to_string()));

    let err = h.client.submitter().submit(listing("Route A→B")).await.unwrap_err();
    assert!(matches!(err, SubmitError::Transmission(_)), "{err:?}");
    assert_eq!(h.ledger.submit_calls(), 1);
    assert_eq!(h.ledger.status_calls(), 0);
    assert_eq!(h.client.cache().history()[0].status, TxStatus::Failed);
}

#[tokio::test]
async fn rejected_transmission_reports_reason() {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);
    h.ledger.fail_submit(LedgerError::Rejected("txBadSeq".to_string()));

    let err = h.client.submitter().submit(listing("Route A→B")).await.unwrap_err();
    assert!(matches!(err, SubmitError::LedgerRejected(ref reason) if reason == "txBadSeq"));
}

#[tokio::test]
async fn status_lookup_errors_are_retried() {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);
    h.ledger.script_status_error(LedgerError::Transport("timeout".to_string()));
    h.ledger.script_statuses([LedgerStatus::NotFound, LedgerStatus::Pending]);

    let record = h.client.submitter().submit(listing("Route A→B")).await.unwrap();
    assert_eq!(record.status, TxStatus::Success);
    assert_eq!(h.ledger.status_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn polling_gives_up_after_timeout() {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);
    h.ledger.set_final_status(LedgerStatus::Pending);

    let err = h.client.submitter().submit(listing("Route A→B")).await.unwrap_err();
    match err {
        SubmitError::Timeout { hash, timeout } => {
            assert_eq!(hash, "tx_1");
            assert_eq!(timeout, Duration::from_secs(2));
        }
        err => panic!("unexpected error: {err:?}"),
    }
    assert!(h.ledger.status_calls() > 1);
    assert!(h.client.cache().listings().is_empty());
    assert_eq!(h.client.cache().history()[0].status, TxStatus::Failed);
}

#[tokio::test]
async fn abandoned_submission_returns_to_idle() {
    let h = Harness::connected().await;
    let submitter = h.client.submitter().clone();
    let task = tokio::spawn(async move { submitter.submit(listing("Route A→B")).await });

    next_approval(h.client.approvals()).await;
    assert_eq!(h.client.submitter().status(), TxStatus::Pending);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert_eq!(h.client.submitter().status(), TxStatus::Idle);
    assert!(h.client.approvals().is_empty());
    assert_eq!(h.connector.sign_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoning_during_polling_stops_polls() {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);
    h.ledger.set_final_status(LedgerStatus::Pending);
    let submitter = h.client.submitter().clone();
    let task = tokio::spawn(async move { submitter.submit(listing("Route A→B")).await });

    let ledger = h.ledger.clone();
    eventually(|| ledger.status_calls() >= 2).await;
    let state = h.client.submitter().state();
    assert_eq!(state.status, TxStatus::Pending);
    assert_eq!(state.last_transaction_hash(), Some("tx_1"));

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    let polls = h.ledger.status_calls();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.ledger.status_calls(), polls);

    assert_eq!(h.client.submitter().state(), SubmissionState::default());
    assert!(h.client.cache().history().is_empty());
    assert!(h.client.cache().listings().is_empty());
    assert_eq!(h.ledger.submit_calls(), 1);
}

#[tokio::test]
async fn submissions_are_serialized() {
    let h = Harness::connected().await;
    let gate = h.client.approvals();

    let first = tokio::spawn({
        let submitter = h.client.submitter().clone();
        async move { submitter.submit(listing("first")).await }
    });
    let first_approval = next_approval(gate).await;
    let second = tokio::spawn({
        let submitter = h.client.submitter().clone();
        async move { submitter.submit(listing("second")).await }
    });

    // the second submission waits for the first one before asking for approval
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(gate.len(), 1);
    assert_eq!(gate.pending().unwrap().id, first_approval.id);

    gate.decide(true);
    assert_eq!(first.await.unwrap().unwrap().id, "tx_1");

    let second_approval = next_approval(gate).await;
    assert_eq!(second_approval.description, "Add listing: second");
    gate.decide(true);
    assert_eq!(second.await.unwrap().unwrap().id, "tx_2");

    let ids: Vec<_> = h.client.cache().history().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, ["tx_2", "tx_1"]);
}

#[tokio::test(start_paused = true)]
async fn terminal_status_resets_to_idle() {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);

    h.client.submitter().submit(listing("Route A→B")).await.unwrap();
    assert_eq!(h.client.submitter().status(), TxStatus::Success);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let state = h.client.submitter().state();
    assert_eq!(state.status, TxStatus::Idle);
    assert_eq!(state.last_transaction_hash(), Some("tx_1"));
}

#[tokio::test(start_paused = true)]
async fn stale_reset_does_not_touch_newer_submission() {
    let h = Harness::connected().await;
    let gate = h.client.approvals();
    let submitter = h.client.submitter().clone();

    let first = tokio::spawn({
        let submitter = submitter.clone();
        async move { submitter.submit(listing("first")).await }
    });
    next_approval(gate).await;
    gate.decide(true);
    first.await.unwrap().unwrap();

    let second = tokio::spawn({
        let submitter = submitter.clone();
        async move { submitter.submit(listing("second")).await }
    });
    next_approval(gate).await;

    // the first submission's reset is due, but a newer submission owns the status
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(submitter.status(), TxStatus::Pending);

    gate.decide(false);
    assert!(second.await.unwrap().unwrap_err().is_user_rejection());
    assert_eq!(submitter.status(), TxStatus::Idle);
}

#[tokio::test]
async fn purchase_and_delivery_flow() -> eyre::Result<()> {
    let h = Harness::connected().await;
    h.ledger.set_listings(json!([record_json("l1", "Route A→B", "100", SELLER)]));
    h.client.cache().refresh().await?;
    // keep the optimistic state visible for the rest of the flow
    h.ledger.fail_simulate(Some(LedgerError::Transport("offline".to_string())));
    let _approve = auto_decide(h.client.approvals(), true);

    let record = h.client.purchase("l1", "100").await?;
    assert_eq!(record.method, "add_escrow");
    assert_eq!(record.counterparty, Some(seller()));
    assert_eq!(record.amount.as_deref(), Some("100"));
    assert_eq!(h.connector.signed()[0].parameter("seller"), Some(SELLER));

    assert_eq!(h.client.cache().listing("l1").unwrap().status, "sold");
    let escrow = h.client.cache().escrow(&record.id).unwrap();
    assert_eq!(escrow.buyer, user());
    assert_eq!(escrow.seller, seller());
    assert_eq!(escrow.status, borderless_market::EscrowStatus::Pending);

    h.client.add_delivery_proof(&record.id, "0xproof").await?;
    let escrow = h.client.cache().escrow(&record.id).unwrap();
    assert_eq!(escrow.status, borderless_market::EscrowStatus::Delivered);
    assert_eq!(escrow.delivery_proof.as_deref(), Some("0xproof"));

    let confirmed = h.client.confirm_delivery(&record.id).await?;
    assert_eq!(confirmed.counterparty, Some(seller()));
    assert_eq!(
        h.client.cache().escrow(&record.id).unwrap().status,
        borderless_market::EscrowStatus::Completed
    );
    assert_eq!(h.client.cache().history().len(), 3);
    Ok(())
}

#[tokio::test]
async fn purchase_of_unknown_listing_fails_early() {
    let h = Harness::connected().await;
    let err = h.client.purchase("missing", "100").await.unwrap_err();
    assert!(matches!(err, SubmitError::UnknownListing(ref id) if id == "missing"));
    assert!(h.client.approvals().is_empty());
    assert_eq!(h.connector.sign_calls(), 0);
    assert_eq!(h.client.submitter().status(), TxStatus::Idle);
}

#[tokio::test]
async fn refresh_after_success_replaces_optimistic_record() {
    let h = Harness::connected().await;
    let _approve = auto_decide(h.client.approvals(), true);
    h.ledger.set_listings(json!([record_json("l9", "Authoritative", "90", SELLER)]));

    h.client.submitter().submit(listing("Optimistic")).await.unwrap();
    assert_eq!(h.client.cache().listings()[0].title, "Optimistic");

    let cache = h.client.cache().clone();
    eventually(|| cache.listings().first().is_some_and(|l| l.id == "l9")).await;
    assert_eq!(cache.listings().len(), 1);
    assert_eq!(cache.history().len(), 1);
}
