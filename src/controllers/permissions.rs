use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::permission::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, CompanyAuth, DecodedJson, PathIds};

pub async fn list_all(
    State(state): State<AppState>,
    auth: CompanyAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let permissions = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&permissions)
}

/// GET /1.0/companies/:companySlug/permissions/:routeName
pub async fn get_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    let permission = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            route_name: params.text("routeName")?.to_string(),
        })
        .await?;
    ApiResponse::entity(&permission)
}

pub async fn create_new(State(state): State<AppState>, auth: CompanyAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let permission = state.bus.dispatch(command).await?;
    ApiResponse::created(&permission)
}

pub async fn delete_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            route_name: params.text("routeName")?.to_string(),
        })
        .await?;
    Ok(ApiResponse::done())
}

pub async fn delete_all(
    State(state): State<AppState>,
    auth: CompanyAuth,
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
