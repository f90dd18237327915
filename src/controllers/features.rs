use axum::{
    body::Bytes,
    extract::{Query, State},
};
use serde_json::Value;
use std::collections::BTreeMap;

use super::from_body;
use crate::app::AppState;
use crate::command::feature::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne, Upsert, UpsertBulk};
use crate::command::Command;
use crate::error::ApiError;
use crate::filter::types::QueryParams;
use crate::middleware::{decode_body_ids, ApiResponse, ApiResult, DecodedJson, PathIds, ProfileAuth};
use crate::optimus::optimus;

/// GET /1.0/profiles/:userName/features
pub async fn list_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let features = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&features)
}

/// GET /1.0/profiles/:userName/features/:featureId
pub async fn get_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    let feature = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            feature_id: params.id("featureId")?,
        })
        .await?;
    ApiResponse::entity(&feature)
}

/// POST /1.0/profiles/:userName/features
pub async fn create_new(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let feature = state.bus.dispatch(command).await?;
    ApiResponse::created(&feature)
}

/// PATCH /1.0/profiles/:userName/features/:featureId
pub async fn update_one(
    State(state): State<AppState>,
    auth: ProfileAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: UpdateOne = from_body(body)?;
    command.feature_id = params.id("featureId")?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let feature = state.bus.dispatch(command).await?;
    ApiResponse::entity(&feature)
}

/// PUT /1.0/profiles/:userName/features
pub async fn upsert(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: Upsert = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let upserted = state.bus.dispatch(command).await?;
    ApiResponse::upserted(&upserted)
}

/// PUT /1.0/profiles/:userName/features/bulk - body is an array of features
pub async fn upsert_bulk(State(state): State<AppState>, auth: ProfileAuth, body: Bytes) -> ApiResult {
    let mut command = UpsertBulk::default();
    command.set_parameter("features", Value::Array(bulk_items(&body)?))?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let features = state.bus.dispatch(command).await?;
    ApiResponse::created(&features)
}

/// Array items of a bulk body, each with its ids decoded
fn bulk_items(body: &[u8]) -> Result<Vec<Value>, ApiError> {
    let invalid = |message: String| {
        let mut fields = BTreeMap::new();
        fields.insert("features".to_string(), message);
        ApiError::validation("Request body must be an array of features", fields)
    };

    let items: Vec<Value> = serde_json::from_slice(body).map_err(|e| invalid(e.to_string()))?;
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(mut map) => {
                decode_body_ids(&mut map, optimus())?;
                Ok(Value::Object(map))
            }
            other => Err(invalid(format!("{} is not an object", other))),
        })
        .collect()
}

/// DELETE /1.0/profiles/:userName/features/:featureId
pub async fn delete_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            feature_id: params.id("featureId")?,
        })
        .await?;
    Ok(ApiResponse::done())
}

/// DELETE /1.0/profiles/:userName/features
pub async fn delete_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let deleted = state
        .bus
        .dispatch(DeleteAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    Ok(ApiResponse::deleted(deleted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bulk_bodies_are_arrays_of_objects() {
        let source_id = optimus().encode(3).unwrap();
        let body = json!([{"name": "age", "value": 30, "source_id": source_id}]).to_string();
        let items = bulk_items(body.as_bytes()).unwrap();
        assert_eq!(items[0]["source_id"], 3);

        assert_eq!(bulk_items(b"{\"name\": \"age\"}").unwrap_err().status_code(), 400);
        assert_eq!(bulk_items(b"[1, 2]").unwrap_err().status_code(), 400);
    }
}
