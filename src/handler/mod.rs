//! Command handlers.
//!
//! A handler validates the command, checks that every entity it touches belongs to the
//! scope of the request (answering 404 otherwise), mutates through repositories and returns
//! the result together with the events describing what happened.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::auth::Identity;
use crate::command::{Command, ProfileScope};
use crate::database::manager::DatabaseError;
use crate::database::models::Entity;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::{Constraint, FilterWhere, QueryParams};
use crate::optimus::optimus;

pub mod attribute;
pub mod candidate;
pub mod company;
pub mod credential;
pub mod feature;
pub mod flag;
pub mod gate;
pub mod hook;
pub mod member;
pub mod permission;
pub mod process;
pub mod raw;
pub mod review;
pub mod role_access;
pub mod score;
pub mod service;
pub mod setting;
pub mod source;
pub mod sso;
pub mod tag;
pub mod task;
pub mod user;
pub mod warning;

pub use attribute::AttributeHandler;
pub use candidate::CandidateHandler;
pub use company::CompanyHandler;
pub use credential::CredentialHandler;
pub use feature::FeatureHandler;
pub use flag::FlagHandler;
pub use gate::GateHandler;
pub use hook::{Handshake, HookHandler, HttpHandshake};
pub use member::MemberHandler;
pub use permission::PermissionHandler;
pub use process::ProcessHandler;
pub use raw::RawHandler;
pub use review::ReviewHandler;
pub use role_access::RoleAccessHandler;
pub use score::ScoreHandler;
pub use service::ServiceHandler;
pub use setting::SettingHandler;
pub use source::SourceHandler;
pub use sso::SsoHandler;
pub use tag::TagHandler;
pub use task::TaskHandler;
pub use user::UserHandler;
pub use warning::WarningHandler;

#[derive(Debug)]
pub struct Handled<T> {
    pub result: T,
    pub events: Vec<Event>,
}

impl<T> Handled<T> {
    pub fn new(result: T) -> Self {
        Self { result, events: vec![] }
    }

    pub fn with_event(result: T, event: Event) -> Self {
        Self {
            result,
            events: vec![event],
        }
    }

    pub fn with_events(result: T, events: Vec<Event>) -> Self {
        Self { result, events }
    }
}

#[async_trait]
pub trait Handler<C: Command>: Send + Sync {
    async fn handle(&self, command: C) -> Result<Handled<C::Output>, ApiError>;
}

/// Missing rows become a 404 with `message`; anything else is a server error
pub(crate) fn not_found(message: &'static str) -> impl FnOnce(DatabaseError) -> ApiError {
    move |err| match err {
        DatabaseError::NotFound(_) => ApiError::not_found(message),
        other => other.into(),
    }
}

/// Entities outside the request scope are reported as missing
pub(crate) fn ensure_owned(owned: bool, message: &'static str) -> Result<(), ApiError> {
    if owned {
        Ok(())
    } else {
        Err(ApiError::not_found(message))
    }
}

/// Scope constraints plus the filterable keys of the query string
pub(crate) fn filtered<E: Entity>(mut scope: Vec<Constraint>, query: &QueryParams) -> Vec<Constraint> {
    scope.extend(FilterWhere::constraints(query, E::mapping().filterable, optimus()));
    scope
}

/// `DeletedMulti` is only emitted when something was deleted
pub(crate) fn deleted_multi(resource: &str, deleted: u64, identity: &Identity) -> Option<Event> {
    (deleted > 0).then(|| Event::new(resource, "deleted_multi", json!({ "deleted": deleted }), identity.clone()))
}

/// Profile events are forwarded to the company's listening services
pub(crate) fn profile_event<T: Serialize>(
    resource: &str,
    action: &str,
    entity: &T,
    scope: &ProfileScope,
    identity: &Identity,
) -> Event {
    Event::about(resource, action, entity, identity).queued_for(scope.company_id, &scope.username)
}

pub(crate) fn create_failed(resource: &'static str) -> impl FnOnce(DatabaseError) -> ApiError {
    move |err| ApiError::create(format!("Error while trying to create a new {}", resource), err)
}

pub(crate) fn update_failed(resource: &'static str) -> impl FnOnce(DatabaseError) -> ApiError {
    move |err| ApiError::update(format!("Error while trying to update a {}", resource), err)
}

pub(crate) fn delete_failed(resource: &'static str) -> impl FnOnce(DatabaseError) -> ApiError {
    move |err| ApiError::delete(format!("Error while trying to delete {}", resource), err)
}
