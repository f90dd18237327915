use axum::extract::{Query, State};

use super::from_body;
use crate::app::AppState;
use crate::command::member::{CreateNew, DeleteOne, ListAll, UpdateOne};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, CompanyAuth, DecodedJson, PathIds};

/// GET /1.0/companies/:companySlug/members
pub async fn list_all(
    State(state): State<AppState>,
    auth: CompanyAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let members = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&members)
}

/// POST /1.0/companies/:companySlug/members - `user_id` arrives encoded
pub async fn create_new(State(state): State<AppState>, auth: CompanyAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let member = state.bus.dispatch(command).await?;
    ApiResponse::created(&member)
}

/// PATCH /1.0/companies/:companySlug/members/:memberId
pub async fn update_one(
    State(state): State<AppState>,
    auth: CompanyAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: UpdateOne = from_body(body)?;
    command.member_id = params.id("memberId")?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let member = state.bus.dispatch(command).await?;
    ApiResponse::entity(&member)
}

/// DELETE /1.0/companies/:companySlug/members/:memberId
pub async fn delete_one(State(state): State<AppState>, auth: CompanyAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            member_id: params.id("memberId")?,
        })
        .await?;
    Ok(ApiResponse::done())
}
