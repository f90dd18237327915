use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{attach_slot, timestamp, Columns, Entity, UserRef};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "members",
    filterable: &[
        ("role", FilterType::String),
        ("user_id", FilterType::Decoded),
        ("user.username", FilterType::String),
        ("created_at", FilterType::Date),
    ],
    orderable: &["role", "created_at"],
    relations: &[
        Relation::ManyToOne(ManyToOne {
            name: "company",
            table: "companies",
            foreign_key: "company_id",
            key: "id",
            nullable: false,
            hydrate: &[],
        }),
        Relation::ManyToOne(ManyToOne {
            name: "user",
            table: "users",
            foreign_key: "user_id",
            key: "id",
            nullable: false,
            hydrate: &["username", "role"],
        }),
    ],
};

/// A user's membership and role in a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub company_id: i64,
    #[serde(serialize_with = "optimus::encoded::serialize")]
    pub user_id: i64,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn new(company_id: i64, user_id: i64, role: impl Into<String>) -> Self {
        Self {
            id: None,
            company_id,
            user_id,
            role: role.into(),
            user: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Member {
    const NAME: &'static str = "Member";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("company_id", self.company_id.into()),
            ("user_id", self.user_id.into()),
            ("role", self.role.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }

    fn attach(&mut self, relation: &str, data: Value) -> Result<(), serde_json::Error> {
        match relation {
            "user" => attach_slot(&mut self.user, data),
            _ => Ok(()),
        }
    }
}
