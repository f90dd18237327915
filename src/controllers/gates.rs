use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::gate::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne, Upsert};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, DecodedJson, PathIds, ProfileAuth};

/// GET /1.0/profiles/:userName/gates
pub async fn list_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let gates = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&gates)
}

/// GET /1.0/profiles/:userName/gates/:gateId
pub async fn get_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    let gate = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            gate_id: params.id("gateId")?,
        })
        .await?;
    ApiResponse::entity(&gate)
}

/// POST /1.0/profiles/:userName/gates
pub async fn create_new(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let gate = state.bus.dispatch(command).await?;
    ApiResponse::created(&gate)
}

/// PATCH /1.0/profiles/:userName/gates/:gateId
pub async fn update_one(
    State(state): State<AppState>,
    auth: ProfileAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: UpdateOne = from_body(body)?;
    command.gate_id = params.id("gateId")?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let gate = state.bus.dispatch(command).await?;
    ApiResponse::entity(&gate)
}

/// PUT /1.0/profiles/:userName/gates
pub async fn upsert(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: Upsert = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let upserted = state.bus.dispatch(command).await?;
    ApiResponse::upserted(&upserted)
}

/// DELETE /1.0/profiles/:userName/gates/:gateId
pub async fn delete_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            gate_id: params.id("gateId")?,
        })
        .await?;
    Ok(ApiResponse::done())
}

/// DELETE /1.0/profiles/:userName/gates
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
