//! Social sign-in providers.
//!
//! Each provider exposes a profile endpoint answering with a JSON document that carries the
//! provider's id for the user. OAuth2 providers take the access token as a bearer token,
//! OAuth1 providers sign the request with the application's consumer key and the user's
//! token secret.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::auth::random_hex;
use crate::config::{config, SsoConfig};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    OAuth2,
    OAuth1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub name: &'static str,
    /// Profile endpoint
    pub url: &'static str,
    /// Key of the profile document holding the provider's user id
    pub id_field: &'static str,
    pub token: TokenKind,
}

pub const PROVIDERS: &[Provider] = &[
    Provider {
        name: "amazon",
        url: "https://api.amazon.com/user/profile",
        id_field: "user_id",
        token: TokenKind::OAuth2,
    },
    Provider {
        name: "facebook",
        url: "https://graph.facebook.com/me?fields=id",
        id_field: "id",
        token: TokenKind::OAuth2,
    },
    Provider {
        name: "google",
        url: "https://www.googleapis.com/oauth2/v1/userinfo",
        id_field: "id",
        token: TokenKind::OAuth2,
    },
    Provider {
        name: "linkedin",
        url: "https://api.linkedin.com/v1/people/~:(id)?format=json",
        id_field: "id",
        token: TokenKind::OAuth2,
    },
    Provider {
        name: "paypal",
        url: "https://api.paypal.com/v1/identity/openidconnect/userinfo/?schema=openid",
        id_field: "user_id",
        token: TokenKind::OAuth2,
    },
    Provider {
        name: "twitter",
        url: "https://api.twitter.com/1.1/account/verify_credentials.json?include_entities=false&skip_status=true",
        id_field: "id_str",
        token: TokenKind::OAuth1,
    },
];

pub fn provider(name: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.name == name)
}

#[derive(Debug, Error)]
pub enum SsoError {
    #[error("Unsupported provider: {0}")]
    UnknownProvider(String),

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Provider refused the token: {0}")]
    Rejected(String),

    #[error("Provider response has no {0} field")]
    MissingProfileId(&'static str),

    #[error("Provider {0} needs a consumer key and secret")]
    ConsumerMissing(&'static str),
}

impl From<SsoError> for ApiError {
    fn from(err: SsoError) -> Self {
        match err {
            SsoError::UnknownProvider(_) => {
                let mut fields = std::collections::BTreeMap::new();
                fields.insert("provider".to_string(), "is not supported".to_string());
                ApiError::validation(err.to_string(), fields)
            }
            SsoError::Transport(_) | SsoError::ConsumerMissing(_) => {
                tracing::warn!("SSO provider unreachable: {}", err);
                ApiError::create("Error while trying to contact provider", err)
            }
            SsoError::Rejected(_) | SsoError::MissingProfileId(_) => {
                tracing::info!("SSO token refused: {}", err);
                ApiError::create("Error while trying to authenticate with provider", err)
            }
        }
    }
}

/// Fetches the profile document a provider serves for an access token
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// `Ok(Value::Null)` when the provider answered with something that is not JSON
    async fn profile(
        &self,
        provider: &Provider,
        access_token: &str,
        token_secret: Option<&str>,
    ) -> Result<Value, SsoError>;
}

/// The provider's id for the user, refusing error documents
pub fn profile_id(provider: &Provider, body: &Value) -> Result<String, SsoError> {
    if body.is_null() || body.get("error").is_some() || body.get("errors").is_some() {
        return Err(SsoError::Rejected(body.to_string()));
    }
    match body.get(provider.id_field) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(SsoError::MissingProfileId(provider.id_field)),
    }
}

pub struct HttpProviderClient {
    client: reqwest::Client,
    consumer: SsoConfig,
}

impl HttpProviderClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config().api.provider_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            consumer: config().sso.clone(),
        })
    }

    /// `Authorization` value for an OAuth1 request signed with PLAINTEXT
    fn oauth1_header(&self, provider: &Provider, access_token: &str, token_secret: &str) -> Result<String, SsoError> {
        let (Some(key), Some(secret)) = (&self.consumer.twitter_consumer_key, &self.consumer.twitter_consumer_secret)
        else {
            return Err(SsoError::ConsumerMissing(provider.name));
        };
        Ok(oauth1_plaintext(key, secret, access_token, token_secret))
    }

    async fn fetch(
        &self,
        provider: &Provider,
        url: &str,
        access_token: &str,
        token_secret: Option<&str>,
    ) -> Result<Value, SsoError> {
        let request = self.client.get(url);
        let request = match provider.token {
            TokenKind::OAuth2 => request.bearer_auth(access_token),
            TokenKind::OAuth1 => {
                let header = self.oauth1_header(provider, access_token, token_secret.unwrap_or_default())?;
                request.header(reqwest::header::AUTHORIZATION, header)
            }
        };

        let response = request.send().await.map_err(|e| SsoError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| SsoError::Transport(e.to_string()))?;
        tracing::debug!(provider = provider.name, status = status.as_u16(), "Provider answered");

        Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
    }
}

fn percent_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

pub(crate) fn oauth1_plaintext(consumer_key: &str, consumer_secret: &str, token: &str, token_secret: &str) -> String {
    let signature = format!("{}&{}", percent_encode(consumer_secret), percent_encode(token_secret));
    let params = [
        ("oauth_consumer_key", consumer_key.to_string()),
        ("oauth_nonce", random_hex(16)),
        ("oauth_signature", signature),
        ("oauth_signature_method", "PLAINTEXT".to_string()),
        ("oauth_timestamp", Utc::now().timestamp().to_string()),
        ("oauth_token", token.to_string()),
        ("oauth_version", "1.0".to_string()),
    ];
    let fields: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, percent_encode(v)))
        .collect();
    format!("OAuth {}", fields.join(", "))
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn profile(
        &self,
        provider: &Provider,
        access_token: &str,
        token_secret: Option<&str>,
    ) -> Result<Value, SsoError> {
        self.fetch(provider, provider.url, access_token, token_secret).await
    }
}
