//! # borderless-config
//!
//! Configuration of the Borderless marketplace client: which ledger network and contract to talk
//! to, and the timing of the transaction and refresh loops.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod error;
pub use error::{ExtractConfigError, InvalidSetting};

// reexport so consumers can merge their own providers
pub use figment;

/// Borderless configuration
///
/// # Defaults
///
/// All configuration values have a default, documented in the [fields](#fields)
/// section below. [`Config::default()`] returns the default values for
/// the default profile while [`Config::with_profile()`] returns the values for the given
/// profile.
///
/// # Provider Details
///
/// `Config` is a Figment [`Provider`] with the following characteristics:
///
///   * **Profile**
///
///     The profile is set to the value of the `profile` field.
///
///   * **Metadata**
///
///     This provider is named `Borderless Config`. It does not specify a
///     [`Source`](figment::Source) and uses default interpolation.
///
///   * **Data**
///
///     The data emitted by this provider are the keys and values corresponding
///     to the fields and values of the structure. The dictionary is emitted to
///     the "default" meta-profile.
///
/// Note that these behaviors differ from those of [`Config::figment()`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The selected profile. **(default: _default_ `default`)**
    ///
    /// **Note:** This field is never serialized nor deserialized. When a
    /// `Config` is merged into a `Figment` as a `Provider`, this profile is
    /// selected on the `Figment`. When a `Config` is extracted, this field is
    /// set to the extracting Figment's selected `Profile`.
    #[serde(skip)]
    pub profile: Profile,
    /// Name of the ledger network, shown to the user in approval requests.
    pub network: String,
    /// Passphrase that binds signatures to the network.
    pub network_passphrase: String,
    /// Endpoint of the ledger's RPC service.
    pub rpc_url: String,
    /// Identifier of the marketplace contract.
    pub contract_id: String,
    /// Fee attached to every operation, in ledger base units.
    pub base_fee: u64,
    /// Delay between two transaction status polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Timeout for transactions in seconds.
    pub transaction_timeout: u64,
    /// How long the wallet may take to authorize a connection, in seconds.
    pub connect_timeout: u64,
    /// Period of the background marketplace refresh, in seconds.
    pub refresh_interval: u64,
    /// How long a terminal transaction status stays visible before the status returns to idle,
    /// in milliseconds.
    pub status_reset_delay_ms: u64,
}

impl Config {
    /// The default profile: "default"
    pub const DEFAULT_PROFILE: Profile = Profile::const_new("default");

    /// File name of config toml file
    pub const FILE_NAME: &'static str = "borderless.toml";

    /// Prefix of the environment variables that override file values.
    pub const ENV_PREFIX: &'static str = "BORDERLESS_";

    /// Returns the current `Config`
    ///
    /// See [`figment`](Self::figment) for more details.
    pub fn load() -> Result<Self, ExtractConfigError> {
        Self::from_provider(Self::figment())
    }

    /// Returns a `Config` with the default values and the given profile selected.
    pub fn with_profile(profile: impl Into<Profile>) -> Self {
        Self { profile: profile.into(), ..Default::default() }
    }

    /// Extract a `Config` from `provider`, returning an error if the extraction fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use borderless_config::Config;
    /// use figment::providers::{Format, Toml};
    ///
    /// // Use the default `Figment`, but allow values from `other.toml`
    /// // to supersede its values.
    /// let figment = Config::figment().merge(Toml::file("other.toml").nested());
    ///
    /// let config = Config::from_provider(figment);
    /// ```
    pub fn from_provider<T: Provider>(provider: T) -> Result<Self, ExtractConfigError> {
        trace!("load config with provider: {:?}", provider.metadata());
        let figment = Figment::from(provider);
        let mut config = figment.extract::<Self>().map_err(ExtractConfigError::from)?;
        config.profile = figment.profile().clone();
        Ok(config)
    }

    /// Returns the default figment
    ///
    /// The default figment reads from the following sources, in ascending
    /// priority order:
    ///
    ///   1. [`Config::default()`] (see [defaults](#defaults))
    ///   2. `borderless.toml` _or_ filename in `BORDERLESS_CONFIG` environment variable
    ///   3. `BORDERLESS_` prefixed environment variables
    ///
    /// The profile selected is the value set in the `BORDERLESS_PROFILE`
    /// environment variable. If it is not set, it defaults to `default`.
    pub fn figment() -> Figment {
        Self::default().into()
    }

    /// Returns the selected profile.
    ///
    /// If the `BORDERLESS_PROFILE` env variable is not set, this returns the `DEFAULT_PROFILE`.
    pub fn selected_profile() -> Profile {
        Profile::from_env_or("BORDERLESS_PROFILE", Self::DEFAULT_PROFILE)
    }

    /// Delay between two status polls of a submitted transaction.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound on waiting for a submitted transaction to reach finality.
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout)
    }

    /// Upper bound on the wallet's authorization prompt.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Period of the background marketplace refresh.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval)
    }

    /// How long a terminal status stays visible.
    pub fn status_reset_delay(&self) -> Duration {
        Duration::from_millis(self.status_reset_delay_ms)
    }
}

impl From<Config> for Figment {
    fn from(c: Config) -> Self {
        let profile = Config::selected_profile();
        let toml_file = Env::var_or("BORDERLESS_CONFIG", Config::FILE_NAME);

        Self::new()
            .merge(c)
            .merge(Toml::file(toml_file).nested())
            .merge(
                Env::prefixed(Config::ENV_PREFIX)
                    .ignore(&["PROFILE", "CONFIG"])
                    .global(),
            )
            .select(profile)
    }
}

impl Provider for Config {
    fn metadata(&self) -> Metadata {
        Metadata::named("Borderless Config")
    }

    #[track_caller]
    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }

    fn profile(&self) -> Option<Profile> {
        Some(self.profile.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Self::DEFAULT_PROFILE,
            network: "testnet".to_string(),
            network_passphrase: "Test SDF Network ; September 2015".to_string(),
            rpc_url: "https://soroban-testnet.stellar.org".to_string(),
            contract_id: String::new(),
            base_fee: 100,
            poll_interval_ms: 1_000,
            transaction_timeout: 60,
            connect_timeout: 120,
            refresh_interval: 30,
            status_reset_delay_ms: 3_000,
        }
    }
}
