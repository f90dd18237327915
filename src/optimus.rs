//! Reversible integer permutation used to obfuscate every externally visible id.
//!
//! `encode(n) = ((n * prime) & MAX_INT) ^ random` and
//! `decode(n) = ((n ^ random) * inverse) & MAX_INT`, where `prime * inverse == 1 (mod 2^31)`.

use once_cell::sync::Lazy;
use serde::Serializer;
use thiserror::Error;

use crate::config::{config, OptimusConfig};

pub const MAX_INT: u64 = 0x7FFF_FFFF;

#[derive(Debug, Error, PartialEq)]
pub enum OptimusError {
    #[error("Id out of range: {0}")]
    OutOfRange(i64),

    #[error("Malformed id: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct Optimus {
    prime: u64,
    inverse: u64,
    random: u64,
}

impl Optimus {
    pub fn new(prime: u64, inverse: u64, random: u64) -> Self {
        Self {
            prime,
            inverse,
            random: random & MAX_INT,
        }
    }

    pub fn from_config(settings: &OptimusConfig) -> Self {
        Self::new(settings.prime, settings.inverse, settings.random)
    }

    pub fn encode(&self, value: i64) -> Result<i64, OptimusError> {
        let n = Self::checked(value)?;
        Ok(((n.wrapping_mul(self.prime) & MAX_INT) ^ self.random) as i64)
    }

    pub fn decode(&self, value: i64) -> Result<i64, OptimusError> {
        let n = Self::checked(value)?;
        Ok(((n ^ self.random).wrapping_mul(self.inverse) & MAX_INT) as i64)
    }

    /// Decodes an id taken from a path segment or query string.
    pub fn decode_str(&self, raw: &str) -> Result<i64, OptimusError> {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| OptimusError::Malformed(raw.to_string()))?;
        self.decode(value)
    }

    fn checked(value: i64) -> Result<u64, OptimusError> {
        if value < 0 || value as u64 > MAX_INT {
            return Err(OptimusError::OutOfRange(value));
        }
        Ok(value as u64)
    }
}

static OPTIMUS: Lazy<Optimus> = Lazy::new(|| Optimus::from_config(&config().optimus));

pub fn optimus() -> &'static Optimus {
    &OPTIMUS
}

/// Serde helpers for entity ids. Ids that cannot be encoded are serialized as null.
pub mod encoded {
    use super::*;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        match optimus().encode(*value) {
            Ok(encoded) => serializer.serialize_i64(encoded),
            Err(_) => serializer.serialize_none(),
        }
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value.map(|v| optimus().encode(v)) {
                Some(Ok(encoded)) => serializer.serialize_i64(encoded),
                _ => serializer.serialize_none(),
            }
        }
    }
}
