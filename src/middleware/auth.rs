//! Token authentication extractors.
//!
//! Tokens name their key pair in `iss`. The issuer is looked up unverified, then the
//! signature is checked with the pair's private key:
//!
//! - company tokens are issued by a company key pair and may name the acting identity
//!   (encoded id) in `sub`;
//! - credential tokens are issued by a credential key pair, may name a user in `sub` and the
//!   acting service's public key in `svc`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::collections::BTreeMap;

use super::ids::PathIds;
use crate::app::AppState;
use crate::auth::{peek, verify, Claims, Identity};
use crate::command::{CompanyScope, CredentialScope, ProfileScope};
use crate::database::manager::DatabaseError;
use crate::database::models::{Company, Credential, User};
use crate::error::ApiError;
use crate::filter::types::Constraint;
use crate::optimus::optimus;
use crate::validation::{assert_slug, assert_username};

/// Extract the bearer token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err(ApiError::unauthorized("Empty token")),
        None => Err(ApiError::unauthorized("Authorization header must use Bearer token format")),
    }
}

fn invalid_subject() -> ApiError {
    let mut fields = BTreeMap::new();
    fields.insert("sub".to_string(), "is invalid".to_string());
    ApiError::validation("Invalid Subject Claim", fields)
}

/// Issuer claims of an unverified token
fn issuer(token: &str) -> Result<Claims, ApiError> {
    peek(token).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        ApiError::unauthorized("Invalid Token")
    })
}

fn issuer_lookup(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::NotFound(_) => ApiError::unauthorized("Invalid Token Issuer"),
        other => other.into(),
    }
}

fn signature(token: &str, private_key: &str) -> Result<Claims, ApiError> {
    verify(token, private_key).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        ApiError::unauthorized("Token Signature Verification Failed")
    })
}

/// Request authenticated by a company token
#[derive(Debug, Clone)]
pub struct CompanyAuth {
    /// Company whose key pair issued the token
    pub company: Company,
    pub scope: CompanyScope,
    pub identity: Identity,
}

impl CompanyAuth {
    /// Move the scope to the `companySlug` path company: the token's company or one of its
    /// children. Anything else is not found.
    async fn target(&mut self, state: &AppState, slug: &str) -> Result<(), ApiError> {
        if slug == self.company.slug {
            return Ok(());
        }
        if assert_slug(slug).is_err() {
            return Err(ApiError::not_found("Company not found"));
        }
        let target = state
            .repos
            .companies
            .find_one_by(vec![Constraint::eq("slug", slug)])
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => ApiError::not_found("Company not found"),
                other => other.into(),
            })?;
        if target.parent_id != self.company.id {
            return Err(ApiError::not_found("Company not found"));
        }
        self.scope.company_id = target.id.unwrap_or_default();
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CompanyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = issuer(&token)?;

        let company = state
            .repos
            .companies
            .find_one_by(vec![Constraint::eq("public_key", claims.iss.as_str())])
            .await
            .map_err(issuer_lookup)?;
        let claims = signature(&token, &company.private_key)?;

        let identity_id = match claims.sub.as_deref() {
            Some(sub) => Some(optimus().decode_str(sub).map_err(|_| invalid_subject())?),
            None => None,
        };

        let mut auth = CompanyAuth {
            scope: CompanyScope {
                company_id: company.id.unwrap_or_default(),
                identity_id,
            },
            identity: Identity::Company(company.public_key.clone()),
            company,
        };

        let params = PathIds::from_request_parts(parts, state).await?;
        if let Some(slug) = params.get("companySlug") {
            auth.target(state, slug).await?;
        }

        tracing::debug!(company = %auth.company.slug, scope = auth.scope.company_id, "Company token accepted");
        Ok(auth)
    }
}

/// Request authenticated by a credential token
#[derive(Debug, Clone)]
pub struct CredentialAuth {
    pub credential: Credential,
    pub scope: CredentialScope,
    pub identity: Identity,
    /// Username the token was issued for
    pub subject: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for CredentialAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = issuer(&token)?;

        let credential = state
            .repos
            .credentials
            .find_one_by(vec![Constraint::eq("public", claims.iss.as_str())])
            .await
            .map_err(issuer_lookup)?;
        let claims = signature(&token, &credential.private)?;

        if let Some(sub) = claims.sub.as_deref() {
            assert_username(sub).map_err(|_| invalid_subject())?;
        }

        let (creator_id, identity) = match claims.svc.as_deref() {
            Some(service_key) => {
                let service = state
                    .repos
                    .services
                    .find_one_by(vec![
                        Constraint::eq("public", service_key),
                        Constraint::eq("company_id", credential.company_id),
                    ])
                    .await
                    .map_err(|e| match e {
                        DatabaseError::NotFound(_) => ApiError::unauthorized("Invalid Service Claim"),
                        other => other.into(),
                    })?;
                (service.id, Identity::Service(service.public))
            }
            None => (None, Identity::Credential(credential.public.clone())),
        };

        tracing::debug!(credential = %credential.public, service = ?creator_id, "Credential token accepted");
        Ok(CredentialAuth {
            scope: CredentialScope {
                company_id: credential.company_id,
                credential_id: credential.id.unwrap_or_default(),
                creator_id,
            },
            identity,
            subject: claims.sub,
            credential,
        })
    }
}

/// Credential token request on the `userName` profile
#[derive(Debug, Clone)]
pub struct ProfileAuth {
    pub user: User,
    pub scope: ProfileScope,
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppState> for ProfileAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = CredentialAuth::from_request_parts(parts, state).await?;
        let params = PathIds::from_request_parts(parts, state).await?;
        let username = params.text("userName")?;

        if assert_username(username).is_err() {
            return Err(ApiError::not_found("User not found"));
        }
        // User tokens only reach their own profile
        if let Some(subject) = &auth.subject {
            if subject != username {
                return Err(ApiError::not_allowed("Token subject does not match the profile"));
            }
        }

        let user = state
            .repos
            .users
            .find_one_by(vec![
                Constraint::eq("credential_id", auth.scope.credential_id),
                Constraint::eq("username", username),
            ])
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => ApiError::not_found("User not found"),
                other => other.into(),
            })?;

        let identity = match auth.subject.clone() {
            Some(subject) if matches!(auth.identity, Identity::Credential(_)) => Identity::User(subject),
            _ => auth.identity,
        };
        Ok(ProfileAuth {
            scope: ProfileScope::new(auth.scope, user.id.unwrap_or_default(), user.username.clone()),
            identity,
            user,
        })
    }
}
