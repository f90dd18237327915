use axum::extract::State;

use super::{from_body, with_secret};
use crate::app::AppState;
use crate::command::company::{CreateNew, DeleteOne, GetOne};
use crate::middleware::{ApiResponse, ApiResult, CompanyAuth, DecodedJson, PathIds};

/// GET /1.0/companies/:companySlug
pub async fn get_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    let company = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            slug: params.text("companySlug")?.to_string(),
        })
        .await?;
    ApiResponse::entity(&company)
}

/// POST /1.0/companies - creates a child of the token's company
pub async fn create_new(State(state): State<AppState>, auth: CompanyAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let company = state.bus.dispatch(command).await?;
    ApiResponse::created(&with_secret(&company, "private_key", &company.private_key)?)
}

/// DELETE /1.0/companies/:companySlug
pub async fn delete_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            slug: params.text("companySlug")?.to_string(),
        })
        .await?;
    Ok(ApiResponse::done())
}
