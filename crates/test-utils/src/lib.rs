#![warn(unused_crate_dependencies, unreachable_pub)]

#[macro_use]
extern crate tracing;

mod approval;
pub use approval::{AutoDecide, auto_decide, next_approval};

mod connector;
pub use connector::MockConnector;

mod ledger;
pub use ledger::{MockLedger, escrow_json, record_json};

use borderless_config::Config;
use borderless_wallets::Address;

/// Address returned by [`MockConnector`] unless configured otherwise.
pub const USER: &str = "GUSERAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
/// A second account, the other side of trades.
pub const SELLER: &str = "GSELLERAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

pub fn user() -> Address {
    Address::new(USER)
}

pub fn seller() -> Address {
    Address::new(SELLER)
}

/// Config with short delays, suited for tests.
pub fn test_config() -> Config {
    Config {
        contract_id: "CMARKETPLACE".to_string(),
        poll_interval_ms: 10,
        transaction_timeout: 2,
        connect_timeout: 2,
        refresh_interval: 3_600,
        status_reset_delay_ms: 50,
        ..Default::default()
    }
}

/// Initializes tracing for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
