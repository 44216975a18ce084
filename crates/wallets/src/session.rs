//! The wallet session: which account the application acts for.

use crate::{
    connector::WalletConnector,
    error::{ConnectorError, WalletError},
    types::{Address, NetworkContext, SignedPayload, UnsignedPayload},
};
use serde::Serialize;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::watch;

/// Current wallet identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    /// The connected account, or the last known one after the wallet dropped the connection.
    pub address: Option<Address>,
    /// Name of the active wallet capability.
    pub connector_name: Option<String>,
}

impl Session {
    /// A session is connected only while both an address and an active connector are known.
    pub fn is_connected(&self) -> bool {
        self.address.is_some() && self.connector_name.is_some()
    }
}

/// Outcome of [`SessionStore::disconnect`].
///
/// The local session is always cleared; `warning` carries a failure to notify the wallet.
#[must_use]
#[derive(Debug, Default)]
pub struct Disconnect {
    pub warning: Option<ConnectorError>,
}

/// Holds the single active [`Session`] and wraps the wallet capability.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    connector: Arc<dyn WalletConnector>,
    session: watch::Sender<Session>,
    /// Set while a `connect` call is outstanding.
    connecting: AtomicBool,
    /// Bumped by every `disconnect`; a `connect` that straddles one discards its result.
    generation: AtomicU64,
    connect_timeout: Duration,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("connector", &self.inner.connector.name())
            .field("session", &*self.inner.session.borrow())
            .field("connecting", &self.is_connecting())
            .finish()
    }
}

// === impl SessionStore ===

impl SessionStore {
    pub fn new(connector: Arc<dyn WalletConnector>, connect_timeout: Duration) -> Self {
        let (session, _) = watch::channel(Session::default());
        Self {
            inner: Arc::new(SessionInner {
                connector,
                session,
                connecting: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                connect_timeout,
            }),
        }
    }

    /// Asks the wallet to authorize the application and stores the returned account.
    ///
    /// A call made while another one is outstanding fails immediately with
    /// [`WalletError::AlreadyConnecting`]. On failure the session is left untouched. If
    /// [`disconnect`](Self::disconnect) is called before the wallet answers, the account is
    /// discarded and the call fails with [`WalletError::ConnectInterrupted`].
    pub async fn connect(&self) -> Result<Address, WalletError> {
        let generation = self.inner.generation.load(Ordering::Acquire);
        let _guard = ConnectGuard::acquire(&self.inner.connecting)?;
        let name = self.inner.connector.name().to_string();
        debug!(target: "wallets::session", connector = %name, "requesting wallet access");

        let address =
            match tokio::time::timeout(self.inner.connect_timeout, self.inner.connector.request_access())
                .await
            {
                Ok(Ok(address)) => address,
                Ok(Err(err)) => {
                    warn!(target: "wallets::session", connector = %name, %err, "wallet connection failed");
                    return Err(WalletError::Connection(err));
                }
                Err(_) => {
                    warn!(target: "wallets::session", connector = %name, "wallet connection timed out");
                    return Err(WalletError::Connection(ConnectorError::Timeout));
                }
            };

        let established = self.inner.session.send_if_modified(|session| {
            if self.inner.generation.load(Ordering::Acquire) != generation {
                return false;
            }
            *session = Session { address: Some(address.clone()), connector_name: Some(name.clone()) };
            true
        });
        if !established {
            debug!(target: "wallets::session", connector = %name, "disconnected while connecting");
            return Err(WalletError::ConnectInterrupted);
        }
        debug!(target: "wallets::session", connector = %name, %address, "wallet connected");
        Ok(address)
    }

    /// Clears the session and notifies the wallet.
    ///
    /// This always succeeds locally, a failed notification is returned as a warning. A
    /// [`connect`](Self::connect) still in flight is cancelled.
    pub async fn disconnect(&self) -> Disconnect {
        let mut previous = Session::default();
        self.inner.session.send_modify(|session| {
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
            previous = std::mem::take(session);
        });
        if previous.connector_name.is_none() {
            return Disconnect::default();
        }

        match self.inner.connector.disconnect().await {
            Ok(()) => {
                debug!(target: "wallets::session", "wallet disconnected");
                Disconnect::default()
            }
            Err(err) => {
                warn!(target: "wallets::session", %err, "failed to notify wallet about disconnect");
                Disconnect { warning: Some(err) }
            }
        }
    }

    /// Called when the wallet itself reports that the connection is gone.
    ///
    /// The account is kept as the last known address, but the session no longer counts as
    /// connected.
    pub fn on_connector_disconnected(&self) {
        self.inner.session.send_if_modified(|session| {
            let modified = session.connector_name.take().is_some();
            if modified {
                debug!(target: "wallets::session", "wallet reported disconnection");
            }
            modified
        });
    }

    /// Signs `payload` with the connected wallet.
    pub async fn sign(
        &self,
        payload: &UnsignedPayload,
        network: &NetworkContext,
    ) -> Result<SignedPayload, WalletError> {
        if !self.is_connected() {
            return Err(WalletError::NotConnected);
        }
        trace!(target: "wallets::session", method = %payload.method, "requesting signature");
        self.inner.connector.sign_payload(payload, network).await.map_err(|err| {
            warn!(target: "wallets::session", %err, "signing failed");
            WalletError::SigningFailed(err)
        })
    }

    /// Returns `true` iff an address and an active connector are both set.
    pub fn is_connected(&self) -> bool {
        self.inner.session.borrow().is_connected()
    }

    /// Returns `true` while a [`connect`](Self::connect) call is outstanding.
    pub fn is_connecting(&self) -> bool {
        self.inner.connecting.load(Ordering::Acquire)
    }

    /// The connected account, `None` unless [`is_connected`](Self::is_connected).
    pub fn address(&self) -> Option<Address> {
        let session = self.inner.session.borrow();
        if session.is_connected() { session.address.clone() } else { None }
    }

    /// The last known account, even if the wallet dropped the connection.
    pub fn last_address(&self) -> Option<Address> {
        self.inner.session.borrow().address.clone()
    }

    /// Returns a snapshot of the session.
    pub fn session(&self) -> Session {
        self.inner.session.borrow().clone()
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.session.subscribe()
    }

    pub fn connector_name(&self) -> &str {
        self.inner.connector.name()
    }
}

/// Resets the connecting flag when the `connect` future completes or is dropped.
struct ConnectGuard<'a>(&'a AtomicBool);

impl<'a> ConnectGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, WalletError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WalletError::AlreadyConnecting)?;
        Ok(Self(flag))
    }
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
