//! HS256 tokens and key material.
//!
//! Tokens are issued by a key pair: `iss` carries the public key and the signature uses the
//! private key, so verification first reads the issuer unverified, looks the key pair up and
//! then checks the signature with the private key.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::config;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Public key of the issuing company or credential
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Public key of the acting service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svc: Option<String>,
    #[serde(default)]
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn new(issuer: impl Into<String>, subject: Option<String>) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.token_expiry_hours;
        Self {
            iss: issuer.into(),
            sub: subject,
            svc: None,
            iat: now.timestamp(),
            exp: Some((now + Duration::hours(expiry_hours as i64)).timestamp()),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token: {0}")]
    Malformed(String),

    #[error("Token is missing the issuer claim")]
    MissingIssuer,

    #[error("Token signature verification failed: {0}")]
    InvalidSignature(String),

    #[error("Token generation error: {0}")]
    Generation(String),
}

fn validation(verify_signature: bool) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims = HashSet::new();
    validation.validate_aud = false;
    if !verify_signature {
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
    }
    validation
}

/// Claims read without checking the signature; only used to find the signing key pair
pub fn peek(token: &str) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation(false))
        .map_err(|e| TokenError::Malformed(e.to_string()))?;
    if data.claims.iss.is_empty() {
        return Err(TokenError::MissingIssuer);
    }
    Ok(data.claims)
}

pub fn verify(token: &str, private_key: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(token, &DecodingKey::from_secret(private_key.as_bytes()), &validation(true))
        .map(|data| data.claims)
        .map_err(|e| TokenError::InvalidSignature(e.to_string()))
}

pub fn sign(claims: &Claims, private_key: &str) -> Result<String, TokenError> {
    if private_key.is_empty() {
        return Err(TokenError::Generation("empty signing key".to_string()));
    }
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(private_key.as_bytes()),
    )
    .map_err(|e| TokenError::Generation(e.to_string()))
}

pub fn random_hex(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill(&mut buffer[..]);
    hex::encode(buffer)
}

/// `(public, private)`: 32 and 64 hex characters derived from fresh randomness
pub fn generate_key_pair() -> (String, String) {
    let digest = |seed: String| hex::encode(Sha256::digest(seed.as_bytes()));
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let public = digest(format!("{}:{}", random_hex(32), now));
    let private = digest(format!("{}:{}", random_hex(32), now));
    (public[..32].to_string(), private)
}

/// Who performed an operation, carried on commands and events
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "lowercase")]
pub enum Identity {
    #[default]
    Anonymous,
    /// Public key of the issuing company
    Company(String),
    Credential(String),
    Service(String),
    User(String),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Anonymous => write!(f, "anonymous"),
            Identity::Company(key) => write!(f, "company:{}", key),
            Identity::Credential(key) => write!(f, "credential:{}", key),
            Identity::Service(key) => write!(f, "service:{}", key),
            Identity::User(name) => write!(f, "user:{}", name),
        }
    }
}
