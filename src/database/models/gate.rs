use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{attach_slot, slugify, timestamp, Columns, Entity, NamedRef};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "gates",
    filterable: &[
        ("name", FilterType::String),
        ("slug", FilterType::String),
        ("pass", FilterType::Boolean),
        ("creator.name", FilterType::String),
        ("created_at", FilterType::Date),
    ],
    orderable: &["name", "slug", "created_at", "updated_at"],
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

/// Pass/fail verdict a service reached about a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(default, skip_serializing)]
    pub creator_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub pass: bool,
    #[serde(default)]
    pub creator: Option<NamedRef>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Gate {
    pub fn new(user_id: i64, name: impl Into<String>, pass: bool) -> Self {
        let name = name.into();
        Self {
            id: None,
            user_id,
            creator_id: None,
            slug: slugify(&name),
            name,
            pass,
            creator: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Gate {
    const NAME: &'static str = "Gate";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("creator_id", self.creator_id.into()),
            ("name", self.name.clone().into()),
            ("slug", self.slug.clone().into()),
            ("pass", self.pass.into()),
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
