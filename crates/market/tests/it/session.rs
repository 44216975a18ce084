use crate::utils::Harness;
use borderless_test_utils::user;
use borderless_wallets::WalletError;
use std::time::Duration;

#[tokio::test]
async fn connected_only_between_connect_and_disconnect() {
    let h = Harness::new();
    let session = h.client.session();
    for _ in 0..3 {
        assert!(!session.is_connected());
        assert_eq!(session.connect().await.unwrap(), user());
        assert!(session.is_connected());
        assert_eq!(session.address(), Some(user()));
        let _ = session.disconnect().await;
        assert!(!session.is_connected());
        assert_eq!(session.address(), None);
    }
    assert_eq!(h.connector.access_calls(), 3);
    assert_eq!(h.connector.disconnect_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn overlapping_connect_is_rejected() {
    let h = Harness::new();
    h.connector.delay_access(Duration::from_millis(500));
    let session = h.client.session().clone();

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.connect().await }
    });
    tokio::task::yield_now().await;
    assert!(session.is_connecting());

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, WalletError::AlreadyConnecting), "{err:?}");

    assert_eq!(first.await.unwrap().unwrap(), user());
    assert!(!session.is_connecting());
    assert_eq!(h.connector.access_calls(), 1);
}

#[tokio::test]
async fn wallet_side_disconnect_keeps_last_address() {
    let h = Harness::connected().await;
    let session = h.client.session();

    session.on_connector_disconnected();
    assert!(!session.is_connected());
    assert_eq!(session.address(), None);
    assert_eq!(session.last_address(), Some(user()));

    let op = borderless_market::MarketOperation::ConfirmDelivery { escrow_id: "e1".to_string() };
    let err = h.client.submitter().submit(op).await.unwrap_err();
    assert!(matches!(err, borderless_market::SubmitError::NotConnected), "{err:?}");
}
