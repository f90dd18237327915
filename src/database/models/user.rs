use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "users",
    filterable: &[
        ("username", FilterType::String),
        ("role", FilterType::String),
        ("created_at", FilterType::Date),
    ],
    orderable: &["username", "created_at"],
    relations: &[Relation::ManyToOne(ManyToOne {
        name: "credential",
        table: "credentials",
        foreign_key: "credential_id",
        key: "id",
        nullable: false,
        hydrate: &[],
    })],
};

/// Identity inside a credential's namespace; owner of all profile data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub credential_id: i64,
    #[serde(default, skip_serializing)]
    pub identity_id: Option<i64>,
    pub role: String,
    pub username: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(credential_id: i64, username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: None,
            credential_id,
            identity_id: None,
            role: role.into(),
            username: username.into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "User";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("credential_id", self.credential_id.into()),
            ("identity_id", self.identity_id.into()),
            ("role", self.role.clone().into()),
            ("username", self.username.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}
