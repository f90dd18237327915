//! Command routing.
//!
//! Handlers are registered per command type. Dispatching runs the handler, logs the outcome
//! with its duration and then hands the produced events to the event dispatcher.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::Cache;
use crate::command::{self, Command};
use crate::database::cached::CachedPermissions;
use crate::database::Repositories;
use crate::error::ApiError;
use crate::event::listeners::{DeleteCacheListener, LogListener, ServiceQueueListener};
use crate::event::EventDispatcher;
use crate::handler::user::ProfileRepositories;
use crate::handler::*;
use crate::queue::JobQueue;
use crate::sso::ProviderClient;

/// Outside systems the handlers and listeners talk to
#[derive(Clone)]
pub struct Collaborators {
    pub handshake: Arc<dyn Handshake>,
    pub provider: Arc<dyn ProviderClient>,
    pub cache: Arc<dyn Cache>,
    pub queue: Arc<dyn JobQueue>,
}

struct Route {
    name: &'static str,
    /// `Arc<dyn Handler<C>>` for the command type keying the route
    handler: Box<dyn Any + Send + Sync>,
}

pub struct CommandBus {
    routes: HashMap<TypeId, Route>,
    events: EventDispatcher,
}

/// Register one handler instance for each listed command
macro_rules! register {
    ($bus:expr, $handler:expr, [$($command:ty),+ $(,)?]) => {{
        let handler = Arc::new($handler);
        $( $bus.register::<$command>(handler.clone()); )+
    }};
}

impl CommandBus {
    pub fn new(events: EventDispatcher) -> Self {
        Self {
            routes: HashMap::new(),
            events,
        }
    }

    pub fn register<C: Command>(&mut self, handler: Arc<dyn Handler<C>>) {
        tracing::trace!(command = C::NAME, "Registered handler");
        self.routes.insert(
            TypeId::of::<C>(),
            Route {
                name: C::NAME,
                handler: Box::new(handler),
            },
        );
    }

    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.routes.values().map(|route| route.name).collect();
        names.sort_unstable();
        names
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub async fn dispatch<C: Command>(&self, command: C) -> Result<C::Output, ApiError> {
        let handler = self
            .routes
            .get(&TypeId::of::<C>())
            .and_then(|route| route.handler.downcast_ref::<Arc<dyn Handler<C>>>())
            .cloned()
            .ok_or_else(|| {
                tracing::error!(command = C::NAME, "No handler registered");
                ApiError::internal(format!("No handler registered for {}", C::NAME))
            })?;

        let started = Instant::now();
        let outcome = handler.handle(command).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let handled = match outcome {
            Ok(handled) => {
                tracing::info!(command = C::NAME, elapsed_ms, events = handled.events.len(), "Command handled");
                handled
            }
            Err(err) => {
                tracing::info!(command = C::NAME, elapsed_ms, status = err.status_code(), "Command failed: {}", err);
                return Err(err);
            }
        };

        self.events.dispatch(handled.events).await;
        Ok(handled.result)
    }

    /// Every handler and listener over `repos`
    pub fn wired(repos: &Repositories, with: Collaborators) -> Self {
        let mut events = EventDispatcher::new();
        events.register(Arc::new(LogListener));
        events.register(Arc::new(DeleteCacheListener::new(with.cache.clone())));
        events.register(Arc::new(ServiceQueueListener::new(repos.services.clone(), with.queue)));

        let mut bus = Self::new(events);
        let r = repos.clone();

        register!(bus, CompanyHandler::new(r.companies.clone(), r.credentials.clone(), r.services.clone(), r.settings.clone(), r.members.clone(), r.permissions.clone()), [
            command::company::GetOne,
            command::company::CreateNew,
            command::company::DeleteOne,
        ]);
        register!(bus, CredentialHandler::new(r.credentials.clone(), profile_repositories(&r), r.hooks.clone()), [
            command::credential::ListAll,
            command::credential::GetOne,
            command::credential::CreateNew,
            command::credential::DeleteOne,
        ]);
        register!(bus, UserHandler::new(profile_repositories(&r)), [
            command::user::CreateNew,
            command::user::DeleteOne,
        ]);
        register!(bus, HookHandler::new(r.hooks.clone(), r.credentials.clone(), with.handshake), [
            command::hook::ListAll,
            command::hook::GetOne,
            command::hook::CreateNew,
            command::hook::UpdateOne,
            command::hook::DeleteOne,
            command::hook::DeleteAll,
        ]);
        register!(bus, ServiceHandler::new(r.services.clone()), [
            command::service::ListAll,
            command::service::GetOne,
            command::service::CreateNew,
            command::service::UpdateOne,
            command::service::DeleteOne,
            command::service::DeleteAll,
        ]);
        register!(bus, SettingHandler::new(r.settings.clone()), [
            command::setting::ListAll,
            command::setting::GetOne,
            command::setting::CreateNew,
            command::setting::UpdateOne,
            command::setting::DeleteOne,
            command::setting::DeleteAll,
        ]);
        register!(bus, MemberHandler::new(r.members.clone(), r.users.clone()), [
            command::member::ListAll,
            command::member::CreateNew,
            command::member::UpdateOne,
            command::member::DeleteOne,
        ]);
        register!(bus, RoleAccessHandler::new(r.role_access.clone()), [
            command::role_access::ListAll,
            command::role_access::CreateNew,
            command::role_access::UpdateOne,
            command::role_access::DeleteOne,
        ]);
        register!(bus, AttributeHandler::new(r.attributes.clone(), r.scores.clone()), [
            command::attribute::ListAll,
            command::attribute::GetOne,
            command::attribute::CreateNew,
            command::attribute::UpdateOne,
            command::attribute::DeleteOne,
            command::attribute::DeleteAll,
        ]);
        register!(bus, FeatureHandler::new(r.features.clone(), r.sources.clone()), [
            command::feature::ListAll,
            command::feature::GetOne,
            command::feature::CreateNew,
            command::feature::UpdateOne,
            command::feature::Upsert,
            command::feature::UpsertBulk,
            command::feature::DeleteOne,
            command::feature::DeleteAll,
        ]);
        register!(bus, ScoreHandler::new(r.scores.clone(), r.attributes.clone()), [
            command::score::ListAll,
            command::score::GetOne,
            command::score::CreateNew,
            command::score::Upsert,
            command::score::DeleteOne,
            command::score::DeleteAll,
        ]);
        register!(bus, SourceHandler::new(r.sources.clone(), r.raw.clone(), r.features.clone(), r.processes.clone()), [
            command::source::ListAll,
            command::source::GetOne,
            command::source::CreateNew,
            command::source::DeleteOne,
            command::source::DeleteAll,
        ]);
        register!(bus, CandidateHandler::new(r.candidates.clone()), [
            command::candidate::ListAll,
            command::candidate::CreateNew,
            command::candidate::DeleteAll,
        ]);
        register!(bus, TagHandler::new(r.tags.clone()), [
            command::tag::ListAll,
            command::tag::CreateNew,
            command::tag::DeleteOne,
            command::tag::DeleteAll,
        ]);
        register!(bus, RawHandler::new(r.raw.clone(), r.sources.clone()), [
            command::raw::ListAll,
            command::raw::CreateNew,
            command::raw::UpdateOne,
            command::raw::Upsert,
            command::raw::DeleteAll,
        ]);
        register!(bus, GateHandler::new(r.gates.clone(), r.reviews.clone()), [
            command::gate::ListAll,
            command::gate::GetOne,
            command::gate::CreateNew,
            command::gate::UpdateOne,
            command::gate::Upsert,
            command::gate::DeleteOne,
            command::gate::DeleteAll,
        ]);
        register!(bus, ReviewHandler::new(r.reviews.clone(), r.gates.clone()), [
            command::review::ListAll,
            command::review::GetOne,
            command::review::CreateNew,
            command::review::UpdateOne,
            command::review::Upsert,
            command::review::DeleteOne,
            command::review::DeleteAll,
        ]);
        register!(bus, WarningHandler::new(r.warnings.clone()), [
            command::warning::ListAll,
            command::warning::GetOne,
            command::warning::CreateNew,
            command::warning::UpdateOne,
            command::warning::Upsert,
            command::warning::DeleteOne,
            command::warning::DeleteAll,
        ]);
        register!(bus, FlagHandler::new(r.flags.clone()), [
            command::flag::ListAll,
            command::flag::GetOne,
            command::flag::CreateNew,
            command::flag::Upsert,
            command::flag::DeleteOne,
            command::flag::DeleteAll,
        ]);
        register!(bus, ProcessHandler::new(r.processes.clone(), r.tasks.clone(), r.sources.clone()), [
            command::process::ListAll,
            command::process::GetOne,
            command::process::CreateNew,
            command::process::DeleteOne,
            command::process::DeleteAll,
        ]);
        register!(bus, TaskHandler::new(r.tasks.clone(), r.processes.clone()), [
            command::task::ListAll,
            command::task::GetOne,
            command::task::CreateNew,
            command::task::UpdateOne,
            command::task::DeleteOne,
        ]);
        register!(bus, PermissionHandler::new(CachedPermissions::new(r.permissions.clone(), with.cache.clone())), [
            command::permission::ListAll,
            command::permission::GetOne,
            command::permission::CreateNew,
            command::permission::DeleteOne,
            command::permission::DeleteAll,
        ]);
        register!(bus, SsoHandler::new(r.users.clone(), r.credentials.clone(), r.sources.clone(), with.provider), [
            command::sso::CreateNew,
        ]);

        tracing::info!(
            commands = bus.routes.len(),
            listeners = ?bus.events.listener_names(),
            "Command bus ready"
        );
        bus
    }
}

fn profile_repositories(r: &Repositories) -> ProfileRepositories {
    ProfileRepositories {
        users: r.users.clone(),
        attributes: r.attributes.clone(),
        scores: r.scores.clone(),
        features: r.features.clone(),
        sources: r.sources.clone(),
        raw: r.raw.clone(),
        candidates: r.candidates.clone(),
        tags: r.tags.clone(),
        gates: r.gates.clone(),
        reviews: r.reviews.clone(),
        warnings: r.warnings.clone(),
        flags: r.flags.clone(),
        processes: r.processes.clone(),
        tasks: r.tasks.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::command::{CompanyScope, CredentialScope};
    use crate::testing::{repositories, FakeHandshake, FakeProvider, RecordingCache, RecordingQueue};
    use serde_json::json;

    fn collaborators(queue: Arc<RecordingQueue>) -> Collaborators {
        Collaborators {
            handshake: Arc::new(FakeHandshake::accepting()),
            provider: Arc::new(FakeProvider::answering(json!({"id": "1"}))),
            cache: Arc::new(RecordingCache::default()),
            queue,
        }
    }

    #[test]
    fn every_command_has_a_handler() {
        let bus = CommandBus::wired(&repositories(), collaborators(Arc::new(RecordingQueue::default())));
        let mut expected = command::names();
        expected.sort_unstable();
        assert_eq!(bus.registered(), expected);
        assert_eq!(bus.events().listener_names(), vec!["log", "delete_cache", "service_queue"]);
    }

    #[tokio::test]
    async fn unregistered_commands_are_internal_errors() {
        let bus = CommandBus::new(EventDispatcher::new());
        let err = bus.dispatch(command::tag::ListAll::default()).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn handler_events_reach_the_listeners() {
        let repos = repositories();
        let queue = Arc::new(RecordingQueue::default());
        let bus = CommandBus::wired(&repos, collaborators(queue.clone()));

        let mut service = crate::database::models::Service::new(1, "scores", "https://scores.example.com");
        service.listens = vec!["idos:user.created".to_string()];
        repos.services.save(service).await.unwrap();

        let user = bus
            .dispatch(command::user::CreateNew {
                scope: CredentialScope {
                    company_id: 1,
                    credential_id: 10,
                    creator_id: None,
                },
                identity: Identity::Credential("pub".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].1["handler"]["event"], "idos:user.created");
        assert_eq!(jobs[0].1["handler"]["user"], user.username.as_str());
    }

    #[tokio::test]
    async fn failures_produce_no_events() {
        let repos = repositories();
        let queue = Arc::new(RecordingQueue::default());
        let bus = CommandBus::wired(&repos, collaborators(queue.clone()));

        let err = bus
            .dispatch(command::company::GetOne {
                scope: CompanyScope {
                    company_id: 1,
                    identity_id: None,
                },
                slug: "acme".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(queue.jobs().is_empty());
    }
}
