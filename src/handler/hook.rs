use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{create_failed, delete_failed, deleted_multi, ensure_owned, not_found, update_failed, Handled, Handler};
use crate::command::hook::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne};
use crate::command::CompanyScope;
use crate::config::config;
use crate::database::models::{Credential, Hook};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, assert_trigger_name, assert_url, Validation};

/// Confirms that a webhook endpoint is willing to receive deliveries
#[async_trait]
pub trait Handshake: Send + Sync {
    async fn handshake(&self, url: &str) -> bool;
}

/// `GET <url>` answered with `204 No Content`
pub struct HttpHandshake {
    client: reqwest::Client,
}

impl HttpHandshake {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config().api.handshake_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Handshake for HttpHandshake {
    async fn handshake(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::NO_CONTENT,
            Err(err) => {
                tracing::debug!(url, "Hook handshake failed: {}", err);
                false
            }
        }
    }
}

pub struct HookHandler {
    hooks: Arc<dyn Repository<Hook>>,
    credentials: Arc<dyn Repository<Credential>>,
    handshake: Arc<dyn Handshake>,
}

impl HookHandler {
    pub fn new(
        hooks: Arc<dyn Repository<Hook>>,
        credentials: Arc<dyn Repository<Credential>>,
        handshake: Arc<dyn Handshake>,
    ) -> Self {
        Self {
            hooks,
            credentials,
            handshake,
        }
    }

    /// Credential by public key, required to belong to the company in scope
    async fn credential(&self, scope: &CompanyScope, public_key: &str) -> Result<Credential, ApiError> {
        let credential = self
            .credentials
            .find_one_by(vec![Constraint::eq("public", public_key)])
            .await
            .map_err(not_found("Credential not found"))?;
        ensure_owned(credential.company_id == scope.company_id, "Company not found")?;
        Ok(credential)
    }

    async fn hook(&self, credential: &Credential, hook_id: i64) -> Result<Hook, ApiError> {
        let hook = self.hooks.find(hook_id).await.map_err(not_found("Hook not found"))?;
        ensure_owned(Some(hook.credential_id) == credential.id, "Hook not found")?;
        Ok(hook)
    }

    async fn shake(&self, url: &str) -> Result<(), ApiError> {
        if self.handshake.handshake(url).await {
            Ok(())
        } else {
            Err(ApiError::create("Failed to perform hook handshake.", format!("{} did not answer 204", url)))
        }
    }
}

#[async_trait]
impl Handler<ListAll> for HookHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Hook>>, ApiError> {
        let credential = self.credential(&command.scope, &command.credential_public_key).await?;
        let hooks = self
            .hooks
            .find_by(vec![Constraint::eq("credential_id", credential.id)], &command.query)
            .await?;
        Ok(Handled::new(hooks))
    }
}

#[async_trait]
impl Handler<GetOne> for HookHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Hook>, ApiError> {
        Validation::new().check("hookId", assert_id(command.hook_id)).finish()?;
        let credential = self.credential(&command.scope, &command.credential_public_key).await?;
        Ok(Handled::new(self.hook(&credential, command.hook_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for HookHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Hook>, ApiError> {
        Validation::new()
            .check("trigger", assert_trigger_name(&command.trigger))
            .check("url", assert_url(&command.url))
            .finish()?;

        let credential = self.credential(&command.scope, &command.credential_public_key).await?;
        let credential_id = credential.id.unwrap_or_default();
        self.shake(&command.url).await?;

        let hook = Hook::new(credential_id, command.trigger, command.url, command.subscribed);
        let hook = self.hooks.save(hook).await.map_err(create_failed("hook"))?;

        let event = Event::about("hook", "created", &hook, &command.identity).for_company(command.scope.company_id);
        Ok(Handled::with_event(hook, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for HookHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Hook>, ApiError> {
        Validation::new()
            .check("hookId", assert_id(command.hook_id))
            .check("trigger", assert_trigger_name(&command.trigger))
            .check("url", assert_url(&command.url))
            .finish()?;

        let credential = self.credential(&command.scope, &command.credential_public_key).await?;
        let mut hook = self.hook(&credential, command.hook_id).await?;
        self.shake(&command.url).await?;

        hook.trigger = command.trigger;
        hook.url = command.url;
        hook.subscribed = command.subscribed;
        let hook = self.hooks.save(hook).await.map_err(update_failed("hook"))?;

        let event = Event::about("hook", "updated", &hook, &command.identity).for_company(command.scope.company_id);
        Ok(Handled::with_event(hook, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for HookHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("hookId", assert_id(command.hook_id)).finish()?;
        let credential = self.credential(&command.scope, &command.credential_public_key).await?;
        let hook = self.hook(&credential, command.hook_id).await?;

        let deleted = self
            .hooks
            .delete(command.hook_id)
            .await
            .map_err(delete_failed("hook"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Hook not found"));
        }

        let event = Event::about("hook", "deleted", &hook, &command.identity).for_company(command.scope.company_id);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for HookHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let credential = self.credential(&command.scope, &command.credential_public_key).await?;
        let deleted = self
            .hooks
            .delete_by(vec![Constraint::eq("credential_id", credential.id)])
            .await
            .map_err(delete_failed("hooks"))?;

        let event = deleted_multi("hook", deleted, &command.identity).map(|e| e.for_company(command.scope.company_id));
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::testing::{seed_credential, FakeHandshake, InMemoryRepository};

    struct Fixture {
        handler: HookHandler,
        hooks: Arc<InMemoryRepository<Hook>>,
        credential: Credential,
    }

    async fn fixture(handshake: FakeHandshake) -> Fixture {
        let hooks = Arc::new(InMemoryRepository::<Hook>::new());
        let credentials = Arc::new(InMemoryRepository::<Credential>::new());
        let credential = seed_credential(&credentials, 1).await;
        let handler = HookHandler::new(hooks.clone(), credentials, Arc::new(handshake));
        Fixture {
            handler,
            hooks,
            credential,
        }
    }

    fn create(company_id: i64, public_key: &str) -> CreateNew {
        CreateNew {
            scope: CompanyScope {
                company_id,
                identity_id: None,
            },
            identity: Identity::Company("company-pub".into()),
            credential_public_key: public_key.to_string(),
            trigger: "idos:feature.created".to_string(),
            url: "https://example.com/hook".to_string(),
            subscribed: true,
        }
    }

    #[tokio::test]
    async fn create_performs_the_handshake_and_emits_created() {
        let fx = fixture(FakeHandshake::accepting()).await;
        let handled = fx.handler.handle(create(1, &fx.credential.public)).await.unwrap();

        assert!(handled.result.id.is_some());
        assert_eq!(handled.result.credential_id, fx.credential.id.unwrap());
        assert_eq!(handled.events.len(), 1);
        assert_eq!(handled.events[0].name, "idos:hook.created");
        assert_eq!(handled.events[0].payload["trigger"], "idos:feature.created");
        assert_eq!(handled.events[0].payload["subscribed"], true);
        assert_eq!(fx.hooks.len(), 1);
    }

    #[tokio::test]
    async fn failed_handshake_creates_nothing() {
        let fx = fixture(FakeHandshake::rejecting()).await;
        let err = fx.handler.handle(create(1, &fx.credential.public)).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "Failed to perform hook handshake.");
        assert_eq!(fx.hooks.len(), 0);
    }

    #[tokio::test]
    async fn credentials_of_other_companies_are_not_found() {
        let fx = fixture(FakeHandshake::accepting()).await;
        let err = fx.handler.handle(create(2, &fx.credential.public)).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_any_lookup() {
        let fx = fixture(FakeHandshake::accepting()).await;
        let mut command = create(1, "missing");
        command.url = "not a url".to_string();
        let err = fx.handler.handle(command).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn delete_all_reports_the_count() {
        let fx = fixture(FakeHandshake::accepting()).await;
        fx.handler.handle(create(1, &fx.credential.public)).await.unwrap();
        fx.handler.handle(create(1, &fx.credential.public)).await.unwrap();

        let handled = fx
            .handler
            .handle(DeleteAll {
                scope: CompanyScope {
                    company_id: 1,
                    identity_id: None,
                },
                identity: Identity::default(),
                credential_public_key: fx.credential.public.clone(),
            })
            .await
            .unwrap();
        assert_eq!(handled.result, 2);
        assert_eq!(handled.events[0].name, "idos:hook.deleted_multi");
        assert_eq!(fx.hooks.len(), 0);
    }

    #[tokio::test]
    async fn hooks_of_other_credentials_are_hidden() {
        let fx = fixture(FakeHandshake::accepting()).await;
        let stranger = fx.hooks.save(Hook::new(999, "x", "https://example.com", false)).await.unwrap();

        let err = fx
            .handler
            .handle(GetOne {
                scope: CompanyScope {
                    company_id: 1,
                    identity_id: None,
                },
                identity: Identity::default(),
                credential_public_key: fx.credential.public.clone(),
                hook_id: stranger.id.unwrap(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
