use axum::extract::State;

use super::from_body;
use crate::app::AppState;
use crate::command::user::{CreateNew, DeleteOne};
use crate::middleware::{ApiResponse, ApiResult, CredentialAuth, DecodedJson, ProfileAuth};

/// POST /1.0/profiles - creates a user of the token's credential
pub async fn create_new(State(state): State<AppState>, auth: CredentialAuth, body: DecodedJson) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.scope = auth.scope;
    command.identity = auth.identity;

    let user = state.bus.dispatch(command).await?;
    ApiResponse::created(&user)
}

/// DELETE /1.0/profiles/:userName - removes the user and all of its profile data
pub async fn delete_one(State(state): State<AppState>, auth: ProfileAuth) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
        })
        .await?;
    Ok(ApiResponse::done())
}
