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
    table: "features",
    filterable: &[
        ("name", FilterType::String),
        ("slug", FilterType::String),
        ("source_id", FilterType::Decoded),
        ("source.name", FilterType::String),
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
            name: "source",
            table: "sources",
            foreign_key: "source_id",
            key: "id",
            nullable: true,
            hydrate: &["name"],
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

/// Derived value about a user, optionally tied to the source it was extracted from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub source_id: Option<i64>,
    #[serde(default, skip_serializing)]
    pub creator_id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NamedRef>,
    #[serde(default)]
    pub creator: Option<NamedRef>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Feature {
    pub fn new(user_id: i64, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        Self {
            id: None,
            user_id,
            source_id: None,
            creator_id: None,
            slug: slugify(&name),
            name,
            value,
            source: None,
            creator: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Feature {
    const NAME: &'static str = "Feature";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("source_id", self.source_id.into()),
            ("creator_id", self.creator_id.into()),
            ("name", self.name.clone().into()),
            ("slug", self.slug.clone().into()),
            ("value", self.value.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }

    fn attach(&mut self, relation: &str, data: Value) -> Result<(), serde_json::Error> {
        match relation {
            "source" => attach_slot(&mut self.source, data),
            "creator" => attach_slot(&mut self.creator, data),
            _ => Ok(()),
        }
    }
}
