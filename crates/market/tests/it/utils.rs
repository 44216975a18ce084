use borderless_market::MarketClient;
use borderless_test_utils::{MockConnector, MockLedger, init_tracing, test_config};
use std::{sync::Arc, time::Duration};

/// A client wired to mock collaborators.
pub struct Harness {
    pub connector: Arc<MockConnector>,
    pub ledger: Arc<MockLedger>,
    pub client: MarketClient,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let connector = Arc::new(MockConnector::default());
        let ledger = Arc::new(MockLedger::new());
        let client = MarketClient::new(&test_config(), connector.clone(), ledger.clone());
        Self { connector, ledger, client }
    }

    /// A harness with a connected session and no background refresh.
    pub async fn connected() -> Self {
        let harness = Self::new();
        harness.client.session().connect().await.unwrap();
        harness
    }
}

/// Polls `cond` until it holds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
