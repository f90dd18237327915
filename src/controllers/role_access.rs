use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::role_access::{CreateNew, DeleteOne, ListAll, UpdateOne};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, CompanyAuth, DecodedJson, PathIds};

// Role access rules belong to the identity in the token subject

pub async fn list_all(
    State(state): State<AppState>,
    auth: CompanyAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let rules = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&rules)
}

pub async fn create_new(State(state): State<AppState>, auth: CompanyAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let rule = state.bus.dispatch(command).await?;
    ApiResponse::created(&rule)
}

pub async fn update_one(
    State(state): State<AppState>,
    auth: CompanyAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: UpdateOne = from_body(body)?;
    command.role_access_id = params.id("roleAccessId")?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let rule = state.bus.dispatch(command).await?;
    ApiResponse::entity(&rule)
}

pub async fn delete_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            role_access_id: params.id("roleAccessId")?,
        })
        .await?;
    Ok(ApiResponse::done())
}
