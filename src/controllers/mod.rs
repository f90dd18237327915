//! HTTP controllers.
//!
//! A controller turns a request into one command: parameters from the decoded body, then
//! path parameters, then the authenticated scope and identity. The bus runs it and the
//! controller wraps the outcome in the response envelope.

use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;

use crate::command::Command;
use crate::error::ApiError;
use crate::middleware::DecodedJson;

pub mod attributes;
pub mod candidates;
pub mod companies;
pub mod credentials;
pub mod features;
pub mod flags;
pub mod gates;
pub mod hooks;
pub mod main;
pub mod members;
pub mod permissions;
pub mod processes;
pub mod profiles;
pub mod raw;
pub mod reviews;
pub mod role_access;
pub mod scores;
pub mod services;
pub mod settings;
pub mod sources;
pub mod sso;
pub mod tags;
pub mod tasks;
pub mod warnings;

/// Command built from the known keys of the request body
pub(crate) fn from_body<C: Command>(body: DecodedJson) -> Result<C, ApiError> {
    Ok(C::from_body(&body.into_value())?)
}

/// Serialized entity plus its private key, which is only ever shown on creation
pub(crate) fn with_secret<T: Serialize>(entity: &T, field: &str, secret: &str) -> Result<Value, ApiError> {
    let mut data = serde_json::to_value(entity).map_err(|e| {
        tracing::error!("Failed to serialize response data: {}", e);
        ApiError::internal("Failed to serialize response data")
    })?;
    if let Value::Object(map) = &mut data {
        map.insert(field.to_string(), Value::from(secret));
    }
    Ok(data)
}

/// Caller address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer
pub(crate) fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_addresses_win_over_the_peer() {
        let peer: SocketAddr = "10.0.0.9:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_address(&headers, Some(peer)).as_deref(), Some("10.0.0.9"));
        assert_eq!(client_address(&headers, None), None);

        headers.insert("x-real-ip", HeaderValue::from_static("192.0.2.7"));
        assert_eq!(client_address(&headers, Some(peer)).as_deref(), Some("192.0.2.7"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.1, 10.0.0.1"));
        assert_eq!(client_address(&headers, Some(peer)).as_deref(), Some("203.0.113.1"));
    }

    #[test]
    fn secrets_are_added_to_the_data() {
        let data = with_secret(&serde_json::json!({"public": "abc"}), "private", "xyz").unwrap();
        assert_eq!(data["public"], "abc");
        assert_eq!(data["private"], "xyz");
    }
}
