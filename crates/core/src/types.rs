//! Core types for the pool
//!
//! This module defines the identity and credential types used throughout the system:
//! - [`PoolId`]: Unique identifier for a pool instance
//! - [`ConnectionId`]: Stable identity of one pooled connection
//! - [`Credential`]: Caller identity used to match reusable connections
//! - [`RequestInfo`]: Requested connection configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a pool instance
///
/// Included in every log record the pool emits so that records from
/// several pools in one process can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(Uuid);

impl PoolId {
    /// Create a new random PoolId using UUID v4
    ///
    /// # Examples
    ///
    /// ```
    /// use xapool_core::types::PoolId;
    ///
    /// let a = PoolId::new();
    /// let b = PoolId::new();
    /// assert_ne!(a, b);
    /// ```
    pub fn new() -> Self {
        PoolId(Uuid::new_v4())
    }

    /// Get raw bytes representation
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for PoolId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one pooled connection
///
/// Assigned from a per-pool counter starting at 1, never reused within a pool.
/// Equality is identity: two connections with the same credential and
/// configuration still have distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        ConnectionId(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Secret part of a [`Credential`]
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Password(String);

impl Password {
    /// Wrap a secret
    pub fn new(secret: impl Into<String>) -> Self {
        Password(secret.into())
    }

    /// Expose the secret to a driver
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

impl std::fmt::Display for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

/// Caller identity used to decide whether a pooled connection may be reused
///
/// # Examples
///
/// ```
/// use xapool_core::types::Credential;
///
/// let a = Credential::new("scott", "tiger");
/// let b = Credential::new("scott", "tiger");
/// assert_eq!(a, b);
/// assert!(!format!("{:?}", a).contains("tiger"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    /// User name
    pub user: String,
    /// Password
    pub password: Password,
}

impl Credential {
    /// Create a credential from user name and password
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: Password::new(password),
        }
    }
}

/// Requested connection configuration (isolation level, schema, ...)
///
/// Compared by value; key order does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestInfo(BTreeMap<String, String>);

impl RequestInfo {
    /// Empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a property
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterate properties in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check if no properties are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
