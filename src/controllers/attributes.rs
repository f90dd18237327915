use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::attribute::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, DecodedJson, PathIds, ProfileAuth};

/// GET /1.0/profiles/:userName/attributes
pub async fn list_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let attributes = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&attributes)
}

/// GET /1.0/profiles/:userName/attributes/:attributeId
pub async fn get_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    let attribute = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            attribute_id: params.id("attributeId")?,
        })
        .await?;
    ApiResponse::entity(&attribute)
}

/// POST /1.0/profiles/:userName/attributes
pub async fn create_new(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let attribute = state.bus.dispatch(command).await?;
    ApiResponse::created(&attribute)
}

/// PATCH /1.0/profiles/:userName/attributes/:attributeId
pub async fn update_one(
    State(state): State<AppState>,
    auth: ProfileAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: UpdateOne = from_body(body)?;
    command.attribute_id = params.id("attributeId")?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let attribute = state.bus.dispatch(command).await?;
    ApiResponse::entity(&attribute)
}

/// DELETE /1.0/profiles/:userName/attributes/:attributeId
pub async fn delete_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            attribute_id: params.id("attributeId")?,
        })
        .await?;
    Ok(ApiResponse::done())
}

/// DELETE /1.0/profiles/:userName/attributes
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
