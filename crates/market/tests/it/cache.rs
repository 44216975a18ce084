use crate::utils::{Harness, eventually};
use borderless_market::{EscrowStatus, LedgerError, RecordKind, RefreshError};
use borderless_test_utils::{SELLER, USER, escrow_json, record_json, seller, user};
use serde_json::json;
use similar_asserts::assert_eq;
use std::time::Duration;

#[tokio::test]
async fn refresh_loads_all_collections() -> eyre::Result<()> {
    let h = Harness::new();
    h.ledger.set_listings(json!([record_json("l1", "Route A→B", "100", SELLER)]));
    h.ledger.set_requests(json!([record_json("r1", "Coffee beans", "40", USER)]));
    h.ledger.set_escrows(json!([escrow_json("e1", "l1", USER, SELLER, "100")]));

    let cache = h.client.cache();
    let mut changes = cache.subscribe();
    cache.refresh().await?;
    assert!(changes.has_changed()?);

    let records = cache.list();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, RecordKind::Listing);
    assert_eq!(records[1].kind, RecordKind::Request);
    assert_eq!(cache.request("r1").unwrap().owner, user());

    let escrow = cache.escrow("e1").unwrap();
    assert_eq!(escrow.status, EscrowStatus::Pending);
    assert_eq!(escrow.seller, seller());
    assert_eq!(cache.escrows_of(&seller()).len(), 1);
    assert!(cache.escrows_of(&borderless_wallets::Address::new("GNOBODY")).is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_refreshes_collapse() {
    let h = Harness::new();
    h.ledger.delay_simulate(Duration::from_millis(10));
    let cache = h.client.cache();

    let (a, b, c) = tokio::join!(cache.refresh(), cache.refresh(), cache.refresh());
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    // one query per collection
    assert_eq!(h.ledger.simulate_calls(), 3);
}

#[tokio::test]
async fn failed_refresh_is_shared_and_keeps_snapshot() {
    let h = Harness::new();
    h.ledger.set_listings(json!([record_json("l1", "Route A→B", "100", SELLER)]));
    let cache = h.client.cache();
    cache.refresh().await.unwrap();
    let before = cache.snapshot();

    h.ledger.fail_simulate(Some(LedgerError::Transport("offline".to_string())));
    h.ledger.delay_simulate(Duration::from_millis(10));
    let (a, b) = tokio::join!(cache.refresh(), cache.refresh());
    let expected = RefreshError::Ledger(LedgerError::Transport("offline".to_string()));
    assert_eq!(a.unwrap_err(), expected);
    assert_eq!(b.unwrap_err(), expected);
    assert_eq!(cache.snapshot(), before);
    assert_eq!(h.ledger.simulate_calls(), 6);

    // the next refresh tries again
    h.ledger.fail_simulate(None);
    h.ledger.set_listings(json!([]));
    cache.refresh().await.unwrap();
    assert!(cache.listings().is_empty());
}

#[tokio::test]
async fn malformed_ledger_data_is_rejected() {
    let h = Harness::new();
    h.ledger.set_escrows(json!([{ "id": "e1" }]));
    let err = h.client.cache().refresh().await.unwrap_err();
    assert!(matches!(err, RefreshError::Decode { method: "list_escrows", .. }), "{err:?}");
}

#[tokio::test(start_paused = true)]
async fn scheduled_refresh_sees_changes_made_during_inflight_fetch() {
    let h = Harness::new();
    h.ledger.delay_simulate(Duration::from_millis(200));
    let cache = h.client.cache().clone();

    let periodic = tokio::spawn({
        let cache = cache.clone();
        async move { cache.refresh().await }
    });
    let ledger = h.ledger.clone();
    eventually(|| ledger.simulate_calls() == 3).await;

    // the ledger settles a transaction after the in-flight queries were answered
    h.ledger.set_listings(json!([record_json("tx_1", "Route A→B", "100", USER)]));
    cache.schedule_refresh();

    periodic.await.unwrap().unwrap();
    assert_eq!(h.ledger.simulate_calls(), 6);
    let listings = cache.listings();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].id, "tx_1");

    // plain refreshes still share the in-flight fetch
    let (a, b) = tokio::join!(cache.refresh(), cache.refresh());
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(h.ledger.simulate_calls(), 9);
}
