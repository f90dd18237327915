use axum::extract::{Query, State};

use super::{from_body, with_secret};
use crate::app::AppState;
use crate::command::credential::{CreateNew, DeleteOne, GetOne, ListAll};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, CompanyAuth, DecodedJson, PathIds};

/// GET /1.0/companies/:companySlug/credentials
pub async fn list_all(
    State(state): State<AppState>,
    auth: CompanyAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let credentials = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&credentials)
}

/// GET /1.0/companies/:companySlug/credentials/:pubKey
pub async fn get_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    let credential = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            public_key: params.text("pubKey")?.to_string(),
        })
        .await?;
    ApiResponse::entity(&credential)
}

/// POST /1.0/companies/:companySlug/credentials
pub async fn create_new(State(state): State<AppState>, auth: CompanyAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let credential = state.bus.dispatch(command).await?;
    ApiResponse::created(&with_secret(&credential, "private", &credential.private)?)
}

/// DELETE /1.0/companies/:companySlug/credentials/:pubKey
pub async fn delete_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            public_key: params.text("pubKey")?.to_string(),
        })
        .await?;
    Ok(ApiResponse::done())
}
