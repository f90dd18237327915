use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::flag::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, Upsert};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, DecodedJson, PathIds, ProfileAuth};

pub async fn list_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let flags = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&flags)
}

pub async fn get_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    let flag = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            flag_id: params.id("flagId")?,
        })
        .await?;
    ApiResponse::entity(&flag)
}

pub async fn create_new(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let flag = state.bus.dispatch(command).await?;
    ApiResponse::created(&flag)
}

/// PUT /1.0/profiles/:userName/flags
pub async fn upsert(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: Upsert = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let upserted = state.bus.dispatch(command).await?;
    ApiResponse::upserted(&upserted)
}

pub async fn delete_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            flag_id: params.id("flagId")?,
        })
        .await?;
    Ok(ApiResponse::done())
}

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
