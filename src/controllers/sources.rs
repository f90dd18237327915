use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use std::net::SocketAddr;

use super::{client_address, from_body};
use crate::app::AppState;
use crate::command::source::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll};
use crate::filter::types::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, DecodedJson, PathIds, ProfileAuth};

/// GET /1.0/profiles/:userName/sources
pub async fn list_all(
    State(state): State<AppState>,
    auth: ProfileAuth,
    Query(query): Query<QueryParams>,
) -> ApiResult {
    let sources = state
        .bus
        .dispatch(ListAll {
            scope: auth.scope,
            identity: auth.identity,
            query,
        })
        .await?;
    ApiResponse::collection(&sources)
}

/// GET /1.0/profiles/:userName/sources/:sourceId
pub async fn get_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    let source = state
        .bus
        .dispatch(GetOne {
            scope: auth.scope,
            identity: auth.identity,
            source_id: params.id("sourceId")?,
        })
        .await?;
    ApiResponse::entity(&source)
}

/// POST /1.0/profiles/:userName/sources - records the caller's address unless given
pub async fn create_new(
    State(state): State<AppState>,
    auth: ProfileAuth,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: DecodedJson,
) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    if command.ipaddr.is_none() {
        command.ipaddr = client_address(&headers, peer.map(|ConnectInfo(addr)| addr));
    }
    command.scope = auth.scope;
    command.identity = auth.identity;

    let source = state.bus.dispatch(command).await?;
    ApiResponse::created(&source)
}

/// DELETE /1.0/profiles/:userName/sources/:sourceId
pub async fn delete_one(State(state): State<AppState>, auth: ProfileAuth, params: PathIds) -> ApiResult {
    state
        .bus
        .dispatch(DeleteOne {
            scope: auth.scope,
            identity: auth.identity,
            source_id: params.id("sourceId")?,
        })
        .await?;
    Ok(ApiResponse::done())
}

/// DELETE /1.0/profiles/:userName/sources
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
