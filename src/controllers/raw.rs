use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::raw::{CreateNew, DeleteAll, ListAll, UpdateOne, Upsert};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, DecodedJson, ProfileAuth};

// Raw documents are addressed by (source_id, collection) rather than by id

/// GET /1.0/profiles/:userName/raw
pub async fn list_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let raw = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&raw)
}

/// POST /1.0/profiles/:userName/raw
pub async fn create_new(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let raw = state.bus.dispatch(command).await?;
    ApiResponse::created(&raw)
}

/// PATCH /1.0/profiles/:userName/raw
pub async fn update_one(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: UpdateOne = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let raw = state.bus.dispatch(command).await?;
    ApiResponse::entity(&raw)
}

/// PUT /1.0/profiles/:userName/raw
pub async fn upsert(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: Upsert = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let upserted = state.bus.dispatch(command).await?;
    ApiResponse::upserted(&upserted)
}

/// DELETE /1.0/profiles/:userName/raw
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
