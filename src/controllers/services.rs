use axum::extract::{Query, State};

use super::{from_body, with_secret};
use crate::app::AppState;
use crate::command::service::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, CompanyAuth, DecodedJson, PathIds};

pub async fn list_all(
    State(state): State<AppState>,
    auth: CompanyAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let services = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&services)
}

pub async fn get_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    let service = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            service_id: params.id("serviceId")?,
        })
        .await?;
    ApiResponse::entity(&service)
}

pub async fn create_new(State(state): State<AppState>, auth: CompanyAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let service = state.bus.dispatch(command).await?;
    ApiResponse::created(&with_secret(&service, "private", &service.private)?)
}

pub async fn update_one(
    State(state): State<AppState>,
    auth: CompanyAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: UpdateOne = from_body(body)?;
    command.service_id = params.id("serviceId")?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let service = state.bus.dispatch(command).await?;
    ApiResponse::entity(&service)
}

pub async fn delete_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            service_id: params.id("serviceId")?,
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
