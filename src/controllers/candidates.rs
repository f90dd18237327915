use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::candidate::{CreateNew, DeleteAll, ListAll};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, DecodedJson, ProfileAuth};

pub async fn list_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let candidates = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&candidates)
}

pub async fn create_new(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let candidate = state.bus.dispatch(command).await?;
    ApiResponse::created(&candidate)
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
