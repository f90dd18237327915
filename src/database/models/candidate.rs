use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{attach_slot, timestamp, Columns, Entity, NamedRef};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::{Secure, VaultError};

static MAPPING: Mapping = Mapping {
    table: "candidates",
    filterable: &[
        ("attribute", FilterType::String),
        ("creator.name", FilterType::String),
        ("created_at", FilterType::Date),
    ],
    orderable: &["attribute", "support", "created_at"],
    relations: &[
        Relation::ManyToOne(ManyToOne {
            name: "user",
            table: "users",
            foreign_key: "user_id",
            key: "id",
            nullable: false,
            hydrate: &[],
        }),
        Relation::ManyToOne(ManyToOne {
            name: "creator",
            table: "services",
            foreign_key: "creator_id",
            key: "id",
            nullable: true,
            hydrate: &["name"],
        }),
    ],
};

/// Possible value for a user attribute, with the support a service gave it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(default, skip_serializing)]
    pub creator_id: Option<i64>,
    pub attribute: String,
    pub value: Secure<String>,
    pub support: f64,
    #[serde(default)]
    pub creator: Option<NamedRef>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn new(user_id: i64, attribute: impl Into<String>, value: impl Into<String>, support: f64) -> Self {
        Self {
            id: None,
            user_id,
            creator_id: None,
            attribute: attribute.into(),
            value: Secure::new(value.into()),
            support,
            creator: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Candidate {
    const NAME: &'static str = "Candidate";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("creator_id", self.creator_id.into()),
            ("attribute", self.attribute.clone().into()),
            ("value", self.value.seal()?.into()),
            ("support", self.support.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }

    fn attach(&mut self, relation: &str, data: Value) -> Result<(), serde_json::Error> {
        match relation {
            "creator" => attach_slot(&mut self.creator, data),
            _ => Ok(()),
        }
    }
}
