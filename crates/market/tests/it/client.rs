use crate::utils::{Harness, eventually};
use borderless_test_utils::{SELLER, record_json, user};
use borderless_wallets::{ConnectorError, WalletError};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn connect_starts_refresh() {
    let h = Harness::new();
    h.ledger.set_listings(json!([record_json("l1", "Route A→B", "100", SELLER)]));
    assert!(!h.client.is_refreshing());

    let address = h.client.connect().await.unwrap();
    assert_eq!(address, user());
    assert!(h.client.is_refreshing());

    let cache = h.client.cache().clone();
    eventually(|| cache.listing("l1").is_some()).await;
}

#[tokio::test]
async fn disconnect_stops_refresh() {
    let h = Harness::new();
    h.client.connect().await.unwrap();
    let ledger = h.ledger.clone();
    eventually(|| ledger.simulate_calls() >= 3).await;

    let outcome = h.client.disconnect().await;
    assert!(outcome.warning.is_none());
    assert!(!h.client.is_refreshing());
    assert!(!h.client.session().is_connected());
    assert_eq!(h.connector.disconnect_calls(), 1);

    let calls = h.ledger.simulate_calls();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.ledger.simulate_calls(), calls);
}

#[tokio::test]
async fn failed_connect_starts_nothing() {
    let h = Harness::new();
    h.connector.deny_access(ConnectorError::NotInstalled);

    let err = h.client.connect().await.unwrap_err();
    assert!(matches!(err, WalletError::Connection(ConnectorError::NotInstalled)), "{err:?}");
    assert!(!h.client.is_refreshing());
    assert!(!h.client.session().is_connected());
    assert_eq!(h.ledger.simulate_calls(), 0);
}
