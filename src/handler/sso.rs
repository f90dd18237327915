use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::user::DEFAULT_ROLE;
use super::{create_failed, not_found, Handled, Handler};
use crate::auth::{random_hex, sign, Claims};
use crate::command::sso::CreateNew;
use crate::database::models::{Credential, Source, User};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::{Constraint, QueryParams};
use crate::sso::{profile_id, provider, ProviderClient, SsoError};
use crate::validation::{assert_identifier, Validation};

/// Signs users in with a social provider token, creating the profile on first sight
pub struct SsoHandler {
    users: Arc<dyn Repository<User>>,
    credentials: Arc<dyn Repository<Credential>>,
    sources: Arc<dyn Repository<Source>>,
    client: Arc<dyn ProviderClient>,
}

impl SsoHandler {
    pub fn new(
        users: Arc<dyn Repository<User>>,
        credentials: Arc<dyn Repository<Credential>>,
        sources: Arc<dyn Repository<Source>>,
        client: Arc<dyn ProviderClient>,
    ) -> Self {
        Self {
            users,
            credentials,
            sources,
            client,
        }
    }

    /// User of `credential` that already signed in with this provider profile
    async fn known_user(&self, credential: &Credential, provider: &str, profile_id: &str) -> Result<Option<User>, ApiError> {
        let sources = self
            .sources
            .find_by(
                vec![
                    Constraint::eq("name", provider),
                    Constraint::json_text("tags", "profile_id", profile_id),
                ],
                &QueryParams::new(),
            )
            .await?;

        for source in sources {
            match self.users.find(source.user_id).await {
                Ok(user) if Some(user.credential_id) == credential.id => return Ok(Some(user)),
                Ok(_) | Err(crate::database::manager::DatabaseError::NotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Handler<CreateNew> for SsoHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<String>, ApiError> {
        Validation::new()
            .check("credential", assert_identifier(&command.credential_public_key))
            .check(
                "access_token",
                if command.access_token.is_empty() {
                    Err("is required".to_string())
                } else {
                    Ok(())
                },
            )
            .finish()?;
        let provider = provider(&command.provider).ok_or_else(|| SsoError::UnknownProvider(command.provider.clone()))?;

        let body = self
            .client
            .profile(provider, &command.access_token, command.token_secret.as_deref())
            .await?;
        let profile_id = profile_id(provider, &body)?;

        let credential = self
            .credentials
            .find_one_by(vec![Constraint::eq("public", command.credential_public_key.as_str())])
            .await
            .map_err(not_found("Credential not found"))?;
        let credential_id = credential.id.unwrap_or_default();

        let mut events = Vec::new();
        let user = match self.known_user(&credential, provider.name, &profile_id).await? {
            Some(user) => user,
            None => {
                let user = User::new(credential_id, random_hex(10), DEFAULT_ROLE);
                let user = self.users.save(user).await.map_err(create_failed("user"))?;
                tracing::info!(provider = provider.name, username = %user.username, "Created user from SSO");
                events.push(
                    Event::about("user", "created", &user, &command.identity)
                        .queued_for(credential.company_id, &user.username),
                );
                user
            }
        };

        let mut tags = Map::new();
        tags.insert("profile_id".to_string(), json!(profile_id));
        tags.insert("access_token".to_string(), json!(command.access_token));
        tags.insert("sso".to_string(), json!(true));
        if let Some(secret) = &command.token_secret {
            tags.insert("token_secret".to_string(), json!(secret));
        }
        let source = Source::new(
            user.id.unwrap_or_default(),
            provider.name,
            Value::Object(tags),
            command.ipaddr.clone(),
        );
        let source = self.sources.save(source).await.map_err(create_failed("source"))?;
        events.push(
            Event::about("source", "created", &source, &command.identity)
                .queued_for(credential.company_id, &user.username),
        );

        events.push(
            Event::new(
                &format!("sso.{}", provider.name),
                "created",
                json!({ "user": user.username }),
                command.identity.clone(),
            )
            .for_company(credential.company_id),
        );

        let token = sign(&Claims::new(credential.public.clone(), Some(user.username.clone())), &credential.private)
            .map_err(|e| ApiError::create("Error while trying to create a user token", e))?;
        Ok(Handled::with_events(token, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{peek, verify, Identity};
    use crate::testing::{seed_credential, FakeProvider, InMemoryRepository};

    struct Fixture {
        handler: SsoHandler,
        users: Arc<InMemoryRepository<User>>,
        sources: Arc<InMemoryRepository<Source>>,
        credential: Credential,
    }

    async fn fixture(provider: FakeProvider) -> Fixture {
        let users = Arc::new(InMemoryRepository::<User>::new());
        let credentials = Arc::new(InMemoryRepository::<Credential>::new());
        let sources = Arc::new(InMemoryRepository::<Source>::new());
        let credential = seed_credential(&credentials, 1).await;
        let handler = SsoHandler::new(users.clone(), credentials, sources.clone(), Arc::new(provider));
        Fixture {
            handler,
            users,
            sources,
            credential,
        }
    }

    fn sign_in(provider: &str, credential: &Credential) -> CreateNew {
        CreateNew {
            identity: Identity::Credential(credential.public.clone()),
            provider: provider.to_string(),
            credential_public_key: credential.public.clone(),
            access_token: "token".to_string(),
            token_secret: None,
            ipaddr: Some("10.0.0.1".to_string()),
        }
    }

    #[tokio::test]
    async fn first_sign_in_creates_the_user() {
        let f = fixture(FakeProvider::answering(json!({"id": "fb-1"}))).await;

        let handled = f.handler.handle(sign_in("facebook", &f.credential)).await.unwrap();
        let names: Vec<_> = handled.events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["idos:user.created", "idos:source.created", "idos:sso.facebook.created"]);

        let claims = verify(&handled.result, &f.credential.private).unwrap();
        assert_eq!(claims.iss, f.credential.public);
        let username = claims.sub.unwrap();
        assert_eq!(username.len(), 20);

        let sources = f.sources.find_by(vec![], &QueryParams::new()).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "facebook");
        assert_eq!(sources[0].tags["profile_id"], "fb-1");
        assert_eq!(sources[0].tags["sso"], true);
        assert!(sources[0].tags.get("token_secret").is_none());
        assert_eq!(sources[0].ipaddr.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn returning_users_keep_their_username() {
        let f = fixture(FakeProvider::answering(json!({"id": "fb-1"}))).await;

        let first = f.handler.handle(sign_in("facebook", &f.credential)).await.unwrap();
        let second = f.handler.handle(sign_in("facebook", &f.credential)).await.unwrap();
        assert_eq!(peek(&first.result).unwrap().sub, peek(&second.result).unwrap().sub);
        assert_eq!(f.users.len(), 1);
        assert_eq!(f.sources.len(), 2);
        assert!(second.events.iter().all(|e| e.name != "idos:user.created"));
    }

    #[tokio::test]
    async fn profiles_of_other_credentials_are_not_reused() {
        let f = fixture(FakeProvider::answering(json!({"id": "fb-1"}))).await;
        let stranger = f.users.save(User::new(999, "stranger", "user")).await.unwrap();
        f.sources
            .save(Source::new(
                stranger.id.unwrap(),
                "facebook",
                json!({"profile_id": "fb-1", "sso": true}),
                None,
            ))
            .await
            .unwrap();

        let handled = f.handler.handle(sign_in("facebook", &f.credential)).await.unwrap();
        assert_ne!(peek(&handled.result).unwrap().sub.as_deref(), Some("stranger"));
        assert_eq!(f.users.len(), 2);
    }

    #[tokio::test]
    async fn token_secrets_are_recorded() {
        let f = fixture(FakeProvider::answering(json!({"id_str": "tw-7"}))).await;
        let mut command = sign_in("twitter", &f.credential);
        command.token_secret = Some("shh".to_string());

        let handled = f.handler.handle(command).await.unwrap();
        assert_eq!(handled.events[2].name, "idos:sso.twitter.created");
        let sources = f.sources.find_by(vec![], &QueryParams::new()).await.unwrap();
        assert_eq!(sources[0].tags["token_secret"], "shh");
        assert_eq!(sources[0].tags["profile_id"], "tw-7");
    }

    #[tokio::test]
    async fn provider_errors_fail_the_sign_in() {
        let f = fixture(FakeProvider::answering(json!({"error": {"message": "expired"}}))).await;
        let err = f.handler.handle(sign_in("google", &f.credential)).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(f.users.len(), 0);

        let f = fixture(FakeProvider::unreachable()).await;
        let err = f.handler.handle(sign_in("google", &f.credential)).await.unwrap_err();
        assert_eq!(err.message(), "Error while trying to contact provider");
    }

    #[tokio::test]
    async fn unknown_credentials_and_providers() {
        let f = fixture(FakeProvider::answering(json!({"id": "1"}))).await;

        let mut command = sign_in("facebook", &f.credential);
        command.credential_public_key = "0123456789abcdef0123456789abcdef".to_string();
        assert_eq!(f.handler.handle(command).await.unwrap_err().status_code(), 404);

        let command = sign_in("myspace", &f.credential);
        assert_eq!(f.handler.handle(command).await.unwrap_err().status_code(), 400);
    }
}
