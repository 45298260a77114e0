//! Shared policy and identity types
//!
//! This module defines:
//! - SavePolicy: how a pending transaction is flushed after a write
//! - DefaultMode: what a get returns when nothing is stored and no default applies
//! - Binding / StoreMode: how a contract picks its backing store
//! - StoreIdentity: the join key between a binding, its store and its version record
//! - Uri: an opaque resource locator stored as its string form

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flush behaviour applied after a set or remove
///
/// Operation-level policies override the contract-level policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Fire-and-forget asynchronous flush
    #[default]
    Apply,
    /// Synchronous flush; the outcome is reported to the caller
    Commit,
    /// No flush; the caller flushes through a forwarded call
    None,
}

/// Fallback used by a get when neither a call-time nor a static default exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultMode {
    /// The codec's canonical zero (`false`, `0`, `""`, empty set)
    #[default]
    Empty,
    /// No value. Non-nullable primitives still fall back to `Empty`.
    Null,
}

/// How the backing store is chosen
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Binding {
    /// One store per application
    #[default]
    Default,
    /// One store per logical screen or session, named after the scope
    Scoped(String),
    /// An explicitly named store
    Named(String),
}

impl Binding {
    /// Short name used in config files and logs
    pub fn label(&self) -> &'static str {
        match self {
            Binding::Default => "default",
            Binding::Scoped(_) => "scoped",
            Binding::Named(_) => "named",
        }
    }
}

/// Access mode requested from the store provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    /// Only this process reads and writes the store
    #[default]
    Private,
    /// The store may be shared with other processes; reads reload from the backing file
    MultiProcess,
}

/// Identity of a bound store
///
/// Two contract instances with the same identity share data and version record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreIdentity(String);

impl StoreIdentity {
    /// Create an identity from its string form
    pub fn new(name: impl Into<String>) -> Self {
        StoreIdentity(name.into())
    }

    /// Identity of the application-wide default store
    pub fn default_for(app: &str) -> Self {
        StoreIdentity(format!("{}_preferences", app))
    }

    /// Identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque resource locator
///
/// Parsing never fails; the locator is kept verbatim and only split on
/// demand. Stored through its canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uri(String);

impl Uri {
    /// Wrap a locator string
    pub fn parse(raw: impl Into<String>) -> Self {
        Uri(raw.into())
    }

    /// Scheme before the first `:`, if any
    pub fn scheme(&self) -> Option<&str> {
        let (scheme, _) = self.0.split_once(':')?;
        let valid = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        valid.then_some(scheme)
    }

    /// Canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
