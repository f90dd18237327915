use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use std::net::SocketAddr;

use super::{client_address, from_body};
use crate::app::AppState;
use crate::auth::Identity;
use crate::command::sso::CreateNew;
use crate::middleware::{ApiResponse, ApiResult, DecodedJson};

/// POST /1.0/sso - exchanges a provider access token for a user token
///
/// Body: `{provider, credential, access_token, token_secret?}`. Answers 201 with the signed
/// token as `data`.
pub async fn create_new(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: DecodedJson,
) -> ApiResult {
    let mut command: CreateNew = from_body(body)?;
    command.identity = Identity::Credential(command.credential_public_key.clone());
    command.ipaddr = client_address(&headers, peer.map(|ConnectInfo(addr)| addr));

    let token = state.bus.dispatch(command).await?;
    ApiResponse::created(&token)
}
