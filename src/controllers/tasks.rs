use axum::extract::{Query, State};
use std::collections::BTreeMap;

use super::from_body;
use crate::app::AppState;
use crate::command::task::{CreateNew, DeleteOne, GetOne, ListAll, UpdateOne};
use crate::error::ApiError;
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, DecodedJson, PathIds, ProfileAuth};

/// GET /1.0/profiles/:userName/processes/:processId/tasks?page=&perPage=
pub async fn list_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    params: PathIds,
    Query(mut query): Query<QueryParams>,
) -> ApiResult {
    let page = page_param(&mut query, "page")?;
    let per_page = page_param(&mut query, "perPage")?;
    let tasks = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
            process_id: params.id("processId")?,
            page,
            per_page,
        })
        .await?;
    ApiResponse::page(&tasks)
}

/// Pagination parameter taken out of the filter query; absent is 0
fn page_param(query: &mut QueryParams, name: &str) -> Result<i64, ApiError> {
    let Some(raw) = query.remove(name) else {
        return Ok(0);
    };
    match raw.parse::<i64>() {
        Ok(value) if value >= 0 => Ok(value),
        _ => {
            let mut fields = BTreeMap::new();
            fields.insert(name.to_string(), "must be a positive integer".to_string());
            Err(ApiError::validation(format!("Invalid {}", name), fields))
        }
    }
}

pub async fn get_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    let task = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            process_id: params.id("processId")?,
            task_id: params.id("taskId")?,
        })
        .await?;
    ApiResponse::entity(&task)
}

pub async fn create_new(
    State(state): State<AppState>,
    auth: ProfileAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.process_id = params.id("processId")?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let task = state.bus.dispatch(command).await?;
    ApiResponse::created(&task)
}

/// PATCH /1.0/profiles/:userName/processes/:processId/tasks/:taskId
pub async fn update_one(
    State(state): State<AppState>,
    auth: ProfileAuth,
    params: PathIds,
    body: DecodedJson,
) -> ApiResult {
    let mut command: UpdateOne = from_body(body)?;
    command.process_id = params.id("processId")?;
    command.task_id = params.id("taskId")?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let task = state.bus.dispatch(command).await?;
    ApiResponse::entity(&task)
}

pub async fn delete_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            process_id: params.id("processId")?,
            task_id: params.id("taskId")?,
        })
        .await?;
    Ok(ApiResponse::done())
}
