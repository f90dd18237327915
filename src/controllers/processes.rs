use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::process::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, DecodedJson, PathIds, ProfileAuth};

pub async fn list_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let processes = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&processes)
}

pub async fn get_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    let process = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            process_id: params.id("processId")?,
        })
        .await?;
    ApiResponse::entity(&process)
}

/// POST /1.0/profiles/:userName/processes - `source_id` is optional
pub async fn create_new(State(state): State<AppState>, auth: ProfileAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let process = state.bus.dispatch(command).await?;
    ApiResponse::created(&process)
}

/// DELETE /1.0/profiles/:userName/processes/:processId, tasks included
pub async fn delete_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            process_id: params.id("processId")?,
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
