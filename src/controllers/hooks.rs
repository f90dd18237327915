use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::hook::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, CompanyAuth, DecodedJson, PathIds};

/// GET /1.0/companies/:companySlug/credentials/:pubKey/hooks
pub async fn list_all(
    State(state): State<AppState>,
    auth: CompanyAuth,
    params: PathIds,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let hooks = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
            credential_public_key: params.text("pubKey")?.to_string(),
        })
        .await?;
    ApiResponse::collection(&hooks)
}

/// GET /1.0/companies/:companySlug/credentials/:pubKey/hooks/:hookId
pub async fn get_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    let hook = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            credential_public_key: params.text("pubKey")?.to_string(),
            hook_id: params.id("hookId")?,
        })
        .await?;
    ApiResponse::entity(&hook)
}

/// POST /1.0/companies/:companySlug/credentials/:pubKey/hooks
pub async fn create_new(
    State(state): State<AppState>,
    auth: CompanyAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.credential_public_key = params.text("pubKey")?.to_string();
    command.scope = auth.scope;
    command.identity = auth.identity;

    let hook = state.bus.dispatch(command).await?;
    ApiResponse::created(&hook)
}

/// PATCH /1.0/companies/:companySlug/credentials/:pubKey/hooks/:hookId
pub async fn update_one(
    State(state): State<AppState>,
    auth: CompanyAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: UpdateOne = from_body(body)?;
    command.credential_public_key = params.text("pubKey")?.to_string();
    command.hook_id = params.id("hookId")?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let hook = state.bus.dispatch(command).await?;
    ApiResponse::entity(&hook)
}

/// DELETE /1.0/companies/:companySlug/credentials/:pubKey/hooks/:hookId
pub async fn delete_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            credential_public_key: params.text("pubKey")?.to_string(),
            hook_id: params.id("hookId")?,
        })
        .await?;
    Ok(ApiResponse::done())
}

/// DELETE /1.0/companies/:companySlug/credentials/:pubKey/hooks
pub async fn delete_all(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    let deleted = state
        .bus
        .dispatch(DeleteAll {
            scope: auth.scope,
            identity: auth.identity,
            credential_public_key: params.text("pubKey")?.to_string(),
        })
        .await?;
    Ok(ApiResponse::deleted(deleted))
}
