//! Commands: one parameter struct per intended operation.
//!
//! Parameters come from the request body, context (the authenticated scope, the acting
//! identity and the query string) is filled in by the controller. Building from a body
//! copies only known parameter keys; setting a parameter that does not exist is an error.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::error::ApiError;

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

/// Fields filled from the request context, never from the body
pub const CONTEXT_FIELDS: &[&str] = &["scope", "identity", "query"];

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown parameter {parameter} for command {command}")]
    UnknownParameter { command: &'static str, parameter: String },

    #[error("Invalid value for parameter {parameter}: {message}")]
    InvalidParameter { parameter: String, message: String },
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::InvalidParameter { ref parameter, .. } => {
                let mut fields = std::collections::BTreeMap::new();
                fields.insert(parameter.clone(), err.to_string());
                ApiError::validation(err.to_string(), fields)
            }
            CommandError::UnknownParameter { .. } => {
                tracing::error!("{}", err);
                ApiError::internal(err.to_string())
            }
        }
    }
}

pub trait Command: Serialize + DeserializeOwned + Default + fmt::Debug + Send + Sync + 'static {
    /// `<resource>.<operation>`, used in logs and the registration table
    const NAME: &'static str;

    type Output: Send + 'static;

    fn from_body(body: &Value) -> Result<Self, CommandError> {
        let mut command = Self::default();
        if let Some(map) = body.as_object() {
            command.merge(map)?;
        }
        Ok(command)
    }

    /// Copy the known, non-context keys of `map` onto the command
    fn merge(&mut self, map: &Map<String, Value>) -> Result<(), CommandError> {
        let mut current = self.to_map();
        for (key, value) in map {
            if current.contains_key(key) && !CONTEXT_FIELDS.contains(&key.as_str()) {
                current.insert(key.clone(), value.clone());
            }
        }
        *self = Self::from_map(current, None)?;
        Ok(())
    }

    fn set_parameter(&mut self, name: &str, value: Value) -> Result<(), CommandError> {
        let mut current = self.to_map();
        if !current.contains_key(name) {
            return Err(CommandError::UnknownParameter {
                command: Self::NAME,
                parameter: name.to_string(),
            });
        }
        current.insert(name.to_string(), value);
        *self = Self::from_map(current, Some(name))?;
        Ok(())
    }

    fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn from_map(map: Map<String, Value>, parameter: Option<&str>) -> Result<Self, CommandError> {
        serde_json::from_value(Value::Object(map)).map_err(|e| CommandError::InvalidParameter {
            parameter: parameter.map(str::to_string).unwrap_or_else(|| "body".to_string()),
            message: e.to_string(),
        })
    }
}

/// Implements [`Command`] for a parameter struct
macro_rules! command {
    ($ty:ident, $name:literal, $output:ty) => {
        impl $crate::command::Command for $ty {
            const NAME: &'static str = $name;
            type Output = $output;
        }
    };
}
pub(crate) use command;

/// Company a company-token request acts on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyScope {
    pub company_id: i64,
    /// Token subject, the identity acting for the company
    pub identity_id: Option<i64>,
}

/// Credential a credential-token request acts on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialScope {
    pub company_id: i64,
    pub credential_id: i64,
    /// Service acting through the credential, recorded as `creator`
    pub creator_id: Option<i64>,
}

/// User profile a credential-token request acts on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileScope {
    pub company_id: i64,
    pub credential_id: i64,
    pub creator_id: Option<i64>,
    pub user_id: i64,
    pub username: String,
}

impl ProfileScope {
    pub fn new(credential: CredentialScope, user_id: i64, username: impl Into<String>) -> Self {
        Self {
            company_id: credential.company_id,
            credential_id: credential.credential_id,
            creator_id: credential.creator_id,
            user_id,
            username: username.into(),
        }
    }
}

/// Every command the bus must route
pub fn names() -> Vec<&'static str> {
    vec![
        company::GetOne::NAME,
        company::CreateNew::NAME,
        company::DeleteOne::NAME,
        credential::ListAll::NAME,
        credential::GetOne::NAME,
        credential::CreateNew::NAME,
        credential::DeleteOne::NAME,
        user::CreateNew::NAME,
        user::DeleteOne::NAME,
        hook::ListAll::NAME,
        hook::GetOne::NAME,
        hook::CreateNew::NAME,
        hook::UpdateOne::NAME,
        hook::DeleteOne::NAME,
        hook::DeleteAll::NAME,
        service::ListAll::NAME,
        service::GetOne::NAME,
        service::CreateNew::NAME,
        service::UpdateOne::NAME,
        service::DeleteOne::NAME,
        service::DeleteAll::NAME,
        setting::ListAll::NAME,
        setting::GetOne::NAME,
        setting::CreateNew::NAME,
        setting::UpdateOne::NAME,
        setting::DeleteOne::NAME,
        setting::DeleteAll::NAME,
        member::ListAll::NAME,
        member::CreateNew::NAME,
        member::UpdateOne::NAME,
        member::DeleteOne::NAME,
        role_access::ListAll::NAME,
        role_access::CreateNew::NAME,
        role_access::UpdateOne::NAME,
        role_access::DeleteOne::NAME,
        attribute::ListAll::NAME,
        attribute::GetOne::NAME,
        attribute::CreateNew::NAME,
        attribute::UpdateOne::NAME,
        attribute::DeleteOne::NAME,
        attribute::DeleteAll::NAME,
        feature::ListAll::NAME,
        feature::GetOne::NAME,
        feature::CreateNew::NAME,
        feature::UpdateOne::NAME,
        feature::Upsert::NAME,
        feature::UpsertBulk::NAME,
        feature::DeleteOne::NAME,
        feature::DeleteAll::NAME,
        score::ListAll::NAME,
        score::GetOne::NAME,
        score::CreateNew::NAME,
        score::Upsert::NAME,
        score::DeleteOne::NAME,
        score::DeleteAll::NAME,
        source::ListAll::NAME,
        source::GetOne::NAME,
        source::CreateNew::NAME,
        source::DeleteOne::NAME,
        source::DeleteAll::NAME,
        candidate::ListAll::NAME,
        candidate::CreateNew::NAME,
        candidate::DeleteAll::NAME,
        tag::ListAll::NAME,
        tag::CreateNew::NAME,
        tag::DeleteOne::NAME,
        tag::DeleteAll::NAME,
        raw::ListAll::NAME,
        raw::CreateNew::NAME,
        raw::UpdateOne::NAME,
        raw::Upsert::NAME,
        raw::DeleteAll::NAME,
        gate::ListAll::NAME,
        gate::GetOne::NAME,
        gate::CreateNew::NAME,
        gate::UpdateOne::NAME,
        gate::Upsert::NAME,
        gate::DeleteOne::NAME,
        gate::DeleteAll::NAME,
        review::ListAll::NAME,
        review::GetOne::NAME,
        review::CreateNew::NAME,
        review::UpdateOne::NAME,
        review::Upsert::NAME,
        review::DeleteOne::NAME,
        review::DeleteAll::NAME,
        warning::ListAll::NAME,
        warning::GetOne::NAME,
        warning::CreateNew::NAME,
        warning::UpdateOne::NAME,
        warning::Upsert::NAME,
        warning::DeleteOne::NAME,
        warning::DeleteAll::NAME,
        flag::ListAll::NAME,
        flag::GetOne::NAME,
        flag::CreateNew::NAME,
        flag::Upsert::NAME,
        flag::DeleteOne::NAME,
        flag::DeleteAll::NAME,
        process::ListAll::NAME,
        process::GetOne::NAME,
        process::CreateNew::NAME,
        process::DeleteOne::NAME,
        process::DeleteAll::NAME,
        task::ListAll::NAME,
        task::GetOne::NAME,
        task::CreateNew::NAME,
        task::UpdateOne::NAME,
        task::DeleteOne::NAME,
        permission::ListAll::NAME,
        permission::GetOne::NAME,
        permission::CreateNew::NAME,
        permission::DeleteOne::NAME,
        permission::DeleteAll::NAME,
        sso::CreateNew::NAME,
    ]
}

/// Result of an upsert: the stored entity and whether it was inserted
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<E> {
    pub entity: E,
    pub created: bool,
}
