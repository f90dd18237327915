//! Entities: one typed struct per table.
//!
//! Serialization is the public representation: ids go through the Optimus codec, foreign
//! keys that clients have no use for are skipped, timestamps are unix seconds and secure
//! fields are plain. [`Entity::columns`] is the stored representation.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::database::dynamic::nest_relations;
use crate::database::mapping::Mapping;
use crate::database::value::SqlValue;
use crate::vault::VaultError;

pub mod timestamp;

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
pub mod tag;
pub mod task;
pub mod user;
pub mod warning;

pub use attribute::Attribute;
pub use candidate::Candidate;
pub use company::Company;
pub use credential::Credential;
pub use feature::Feature;
pub use flag::Flag;
pub use gate::Gate;
pub use hook::Hook;
pub use member::Member;
pub use permission::Permission;
pub use process::Process;
pub use raw::Raw;
pub use review::Review;
pub use role_access::RoleAccess;
pub use score::Score;
pub use service::Service;
pub use setting::Setting;
pub use source::Source;
pub use tag::Tag;
pub use task::Task;
pub use user::User;
pub use warning::Warning;

/// Stored column values, secure fields sealed. Never includes `id`.
pub type Columns = Vec<(&'static str, SqlValue)>;

pub trait Entity: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Human readable name used in error messages
    const NAME: &'static str;

    fn mapping() -> &'static Mapping;

    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> Option<DateTime<Utc>>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);

    fn columns(&self) -> Result<Columns, VaultError>;

    /// Fill the slot of a hydrated relation. Entities without relation slots ignore it.
    fn attach(&mut self, _relation: &str, _data: Value) -> Result<(), serde_json::Error> {
        Ok(())
    }

    fn from_row(row: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(nest_relations(row))
    }

    /// Stored value of one column; `id` included
    fn column(&self, name: &str) -> Result<SqlValue, VaultError> {
        if name == "id" {
            return Ok(self.id().into());
        }
        Ok(self
            .columns()?
            .into_iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| value)
            .unwrap_or(SqlValue::Null))
    }

    /// Unix seconds of the last change, used as the envelope's `updated`
    fn last_modified(&self) -> i64 {
        match self.updated_at() {
            Some(updated) if updated > self.created_at() => updated.timestamp(),
            _ => self.created_at().timestamp(),
        }
    }
}

/// Implements the identity and timestamp accessors for entities with the standard
/// `id`, `created_at` and `updated_at` fields.
macro_rules! entity_identity {
    () => {
        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }

        fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
            self.created_at
        }

        fn updated_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
            self.updated_at
        }

        fn set_updated_at(&mut self, at: chrono::DateTime<chrono::Utc>) {
            self.updated_at = Some(at);
        }
    };
}
pub(crate) use entity_identity;

/// Hydrated relation carrying only a name (services, sources, attributes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

/// Hydrated user relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Lowercase ASCII slug: runs of anything but letters and digits collapse into one `-`
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub(crate) fn attach_slot<T: DeserializeOwned>(slot: &mut Option<T>, data: Value) -> Result<(), serde_json::Error> {
    *slot = if data.is_null() { None } else { Some(serde_json::from_value(data)?) };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slugify("Full Name"), "full-name");
        assert_eq!(slugify("  Date of  Birth!! "), "date-of-birth");
        assert_eq!(slugify("KYC/AML v2"), "kyc-aml-v2");
        assert_eq!(slugify("***"), "");
    }
}
