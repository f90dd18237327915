//! Decoding of obfuscated ids arriving from clients.
//!
//! Path parameters named `...Id` and top level body keys named `..._id` carry encoded ids.
//! An id that does not decode answers 404, the same as an id that does not exist.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::error::ApiError;
use crate::optimus::{optimus, Optimus};

/// Path parameters with every `...Id` parameter decoded
#[derive(Debug, Clone, Default)]
pub struct PathIds {
    raw: HashMap<String, String>,
    ids: HashMap<String, i64>,
}

impl PathIds {
    pub fn decode(raw: HashMap<String, String>, codec: &Optimus) -> Result<Self, ApiError> {
        let mut ids = HashMap::new();
        for (name, value) in &raw {
            if name.ends_with("Id") {
                let id = codec.decode_str(value).map_err(|e| {
                    tracing::debug!(parameter = %name, "{}", e);
                    ApiError::not_found("Resource not found")
                })?;
                ids.insert(name.clone(), id);
            }
        }
        Ok(Self { raw, ids })
    }

    /// Decoded value of an `...Id` parameter
    pub fn id(&self, name: &str) -> Result<i64, ApiError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| ApiError::internal(format!("Route has no {} parameter", name)))
    }

    pub fn text(&self, name: &str) -> Result<&str, ApiError> {
        self.raw
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ApiError::internal(format!("Route has no {} parameter", name)))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.raw.get(name).map(String::as_str)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PathIds {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Routes without parameters reject the extraction; they simply have nothing to decode
        let raw = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();
        PathIds::decode(raw, optimus())
    }
}

/// Decode every top level `..._id` key of `body` in place. Nulls are left alone.
pub fn decode_body_ids(body: &mut Map<String, Value>, codec: &Optimus) -> Result<(), ApiError> {
    for (key, value) in body.iter_mut() {
        if !key.ends_with("_id") || value.is_null() {
            continue;
        }
        let decoded = match value {
            Value::Number(n) => n.as_i64().ok_or_else(|| invalid_id(key)).and_then(|n| {
                codec.decode(n).map_err(|_| invalid_id(key))
            })?,
            Value::String(s) => codec.decode_str(s).map_err(|_| invalid_id(key))?,
            _ => return Err(invalid_id(key)),
        };
        *value = Value::from(decoded);
    }
    Ok(())
}

fn invalid_id(key: &str) -> ApiError {
    tracing::debug!(key, "Undecodable id in request body");
    ApiError::not_found("Resource not found")
}

/// JSON body with its `..._id` keys decoded. An empty body reads as an empty object.
#[derive(Debug, Clone, Default)]
pub struct DecodedJson(pub Map<String, Value>);

impl DecodedJson {
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for DecodedJson {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let has_body = req
            .headers()
            .get(axum::http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .map(|v| v != "0")
            .unwrap_or(true);
        if !has_body {
            return Ok(Self::default());
        }

        let Json(body) = Json::<Value>::from_request(req, state).await.map_err(|rejection| {
            let mut fields = BTreeMap::new();
            fields.insert("body".to_string(), rejection.body_text());
            ApiError::validation("Request body must be a JSON object", fields)
        })?;
        let mut map = match body {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                let mut fields = BTreeMap::new();
                fields.insert("body".to_string(), "must be a JSON object".to_string());
                return Err(ApiError::validation("Request body must be a JSON object", fields));
            }
        };
        decode_body_ids(&mut map, optimus())?;
        Ok(Self(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> Optimus {
        Optimus::new(1_580_030_173, 59_260_789, 1_163_945_558)
    }

    #[test]
    fn id_parameters_are_decoded() {
        let codec = codec();
        let encoded = codec.encode(42).unwrap();
        let raw = HashMap::from([
            ("hookId".to_string(), encoded.to_string()),
            ("pubKey".to_string(), "abc".to_string()),
        ]);
        let params = PathIds::decode(raw, &codec).unwrap();
        assert_eq!(params.id("hookId").unwrap(), 42);
        assert_eq!(params.text("pubKey").unwrap(), "abc");
        assert!(params.id("pubKey").is_err());
    }

    #[test]
    fn undecodable_path_ids_are_not_found() {
        let raw = HashMap::from([("featureId".to_string(), "not-a-number".to_string())]);
        let err = PathIds::decode(raw, &codec()).unwrap_err();
        assert_eq!(err.status_code(), 404);

        let raw = HashMap::from([("featureId".to_string(), "-5".to_string())]);
        assert_eq!(PathIds::decode(raw, &codec()).unwrap_err().status_code(), 404);
    }

    #[test]
    fn body_ids_are_decoded_at_the_top_level_only() {
        let codec = codec();
        let encoded = codec.encode(7).unwrap();
        let mut body = json!({
            "source_id": encoded,
            "user_id": encoded.to_string(),
            "parent_id": null,
            "data": {"user_id": 12345},
            "name": "x"
        })
        .as_object()
        .cloned()
        .unwrap();

        decode_body_ids(&mut body, &codec).unwrap();
        assert_eq!(body["source_id"], 7);
        assert_eq!(body["user_id"], 7);
        assert!(body["parent_id"].is_null());
        assert_eq!(body["data"]["user_id"], 12345);
    }

    #[test]
    fn malformed_body_ids_are_not_found() {
        let mut body = json!({"attribute_id": [1]}).as_object().cloned().unwrap();
        assert_eq!(decode_body_ids(&mut body, &codec()).unwrap_err().status_code(), 404);
    }
}
