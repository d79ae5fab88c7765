//! Secret string wrappers with redacting diagnostics.
//!
//! Secrets are held in ordinary strings because they have to be emitted
//! verbatim into `Authorization` headers and HMAC computations, but their
//! diagnostic (`Debug`) renderings are always placeholders. Two levels are
//! provided: [`SecretString`] redacts itself in embedded/diagnostic output
//! and exposes the value through `Display` and [`SecretString::reveal`];
//! [`SuperSecretString`] uses a distinct placeholder for values that should
//! stand out even harder in logs (e.g. workflow tokens injected by GitHub).
//!
//! Buffers are wiped on drop.

use std::fmt;

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

const SECRET_PLACEHOLDER: &str = "<SECRET>";
const SUPER_SECRET_PLACEHOLDER: &str = "<SUPER_SECRET>";

/// String whose diagnostic rendering is redacted.
#[derive(Clone, PartialEq, Eq, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Direct access to the underlying value.
    ///
    /// This is the only intended way to read the secret besides `Display`;
    /// call sites are easy to audit for it.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    /// Whether the secret is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SECRET_PLACEHOLDER)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// String whose diagnostic rendering is always the strong placeholder.
#[derive(Clone, PartialEq, Eq, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SuperSecretString(String);

impl SuperSecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Direct access to the underlying value.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SuperSecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SUPER_SECRET_PLACEHOLDER)
    }
}

impl fmt::Display for SuperSecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SuperSecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SuperSecretString {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
