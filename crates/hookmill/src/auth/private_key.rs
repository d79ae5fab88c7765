//! RSA private key holder for GitHub App authentication.
//!
//! A [`PrivateKey`] is constructed from PEM bytes, pre-computes the SHA-1
//! fingerprint of the corresponding public key (the value GitHub shows in
//! the App settings page), and mints the short-lived RS256 JWTs the App
//! authenticates with.
//!
//! The key bytes never appear in diagnostic output: `Debug` renders only
//! the fingerprint, and there is deliberately no `Display` implementation.

use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use crate::error::AuthError;

/// GitHub's maximum JWT validity window, in seconds.
const MAX_JWT_VALIDITY_SECS: u64 = 600;

/// Default JWT validity window, in seconds.
pub const DEFAULT_JWT_VALIDITY_SECS: u64 = 60;

/// Claims carried by a GitHub App JWT.
#[derive(Debug, Serialize)]
struct AppJwtClaims {
    /// Issued-at, seconds since the epoch.
    iat: i64,
    /// Expiry, seconds since the epoch.
    exp: i64,
    /// The numeric GitHub App id.
    iss: u64,
}

/// RSA private key with a pre-computed public key fingerprint.
#[derive(Clone)]
pub struct PrivateKey {
    pem: Zeroizing<Vec<u8>>,
    fingerprint: String,
}

impl PrivateKey {
    /// Load a key from PEM bytes.
    ///
    /// Accepts both PKCS#1 (`BEGIN RSA PRIVATE KEY`) and PKCS#8
    /// (`BEGIN PRIVATE KEY`) encodings.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPrivateKey`] if the bytes are not a
    /// parseable RSA private key.
    pub fn from_pem(pem: &[u8]) -> Result<Self, AuthError> {
        let pem_str =
            std::str::from_utf8(pem).map_err(|e| AuthError::InvalidPrivateKey {
                message: format!("PEM data is not valid UTF-8: {e}"),
            })?;
        let pem_str = pem_str.trim();

        let rsa_key = RsaPrivateKey::from_pkcs1_pem(pem_str)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem_str))
            .map_err(|e| AuthError::InvalidPrivateKey {
                message: format!("failed to parse RSA private key: {e}"),
            })?;

        let fingerprint = public_key_fingerprint(&rsa_key)?;

        Ok(Self {
            pem: Zeroizing::new(pem_str.as_bytes().to_vec()),
            fingerprint,
        })
    }

    /// Load a key from a PEM file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let bytes = std::fs::read(path).map_err(|e| AuthError::InvalidPrivateKey {
            message: format!("failed to read private key file: {e}"),
        })?;
        Self::from_pem(&bytes)
    }

    /// Colon-separated lowercase hex SHA-1 of the public key.
    ///
    /// The digest is computed over the DER-encoded SubjectPublicKeyInfo
    /// of the corresponding public key, matching the fingerprint GitHub
    /// displays for the App.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Compare the fingerprint against another colon-formatted value.
    pub fn matches_fingerprint(&self, other: &str) -> bool {
        self.fingerprint == other
    }

    /// Mint an App JWT valid for [`DEFAULT_JWT_VALIDITY_SECS`] seconds.
    pub fn make_jwt(&self, app_id: u64) -> Result<String, AuthError> {
        self.make_jwt_with_validity(app_id, DEFAULT_JWT_VALIDITY_SECS)
    }

    /// Mint an App JWT with claims `iat = now`, `exp = now + time_offset`,
    /// `iss = app_id`, signed RS256.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::JwtValidityTooLong`] when `time_offset`
    /// exceeds GitHub's 10 minute maximum.
    pub fn make_jwt_with_validity(
        &self,
        app_id: u64,
        time_offset: u64,
    ) -> Result<String, AuthError> {
        if time_offset > MAX_JWT_VALIDITY_SECS {
            return Err(AuthError::JwtValidityTooLong {
                requested: time_offset,
            });
        }

        let now = Utc::now().timestamp();
        let claims = AppJwtClaims {
            iat: now,
            exp: now + time_offset as i64,
            iss: app_id,
        };

        let encoding_key =
            EncodingKey::from_rsa_pem(&self.pem).map_err(|e| AuthError::JwtGenerationFailed {
                message: format!("failed to build encoding key: {e}"),
            })?;

        encode(&Header::new(Algorithm::RS256), &claims, &encoding_key).map_err(|e| {
            AuthError::JwtGenerationFailed {
                message: format!("failed to encode JWT: {e}"),
            }
        })
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("pem", &"<SECRET>")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl PartialEq for PrivateKey {
    /// Keys compare equal when their public key fingerprints match.
    fn eq(&self, other: &Self) -> bool {
        self.matches_fingerprint(other.fingerprint())
    }
}

/// SHA-1 the DER SubjectPublicKeyInfo of the public key and render it as
/// colon-separated hex pairs.
fn public_key_fingerprint(key: &RsaPrivateKey) -> Result<String, AuthError> {
    let public_key = RsaPublicKey::from(key);
    let spki_der = public_key
        .to_public_key_der()
        .map_err(|e| AuthError::InvalidPrivateKey {
            message: format!("failed to encode public key: {e}"),
        })?;

    let digest = Sha1::digest(spki_der.as_bytes());
    let hex_digest = hex::encode(digest);

    let pairs: Vec<&str> = hex_digest
        .as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).expect("hex output is ASCII"))
        .collect();

    Ok(pairs.join(":"))
}

#[cfg(test)]
#[path = "private_key_tests.rs"]
mod tests;
