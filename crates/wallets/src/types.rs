use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// An opaque ledger account identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The network a signature is bound to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkContext {
    /// Human readable network name, e.g. `testnet`.
    pub network: String,
    /// Passphrase mixed into the signed data.
    pub passphrase: String,
}

/// An operation that has been built but not signed yet.
///
/// This is what the user reviews before approving a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedPayload {
    /// The contract the operation invokes.
    pub contract_id: String,
    /// The contract method.
    pub method: String,
    /// The network the operation is meant for.
    pub network: String,
    /// Fee attached to the operation, in ledger base units.
    pub fee: u64,
    /// Named arguments of the method call.
    pub parameters: BTreeMap<String, String>,
}

impl UnsignedPayload {
    /// Returns the value of the named parameter, if any.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

/// A signed transaction envelope, ready to be transmitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedPayload(String);

impl SignedPayload {
    pub fn new(envelope: impl Into<String>) -> Self {
        Self(envelope.into())
    }

    /// The encoded envelope.
    pub fn envelope(&self) -> &str {
        &self.0
    }
}
