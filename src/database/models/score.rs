use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{attach_slot, timestamp, Columns, Entity, NamedRef};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "scores",
    filterable: &[
        ("name", FilterType::String),
        ("attribute.name", FilterType::String),
        ("creator.name", FilterType::String),
        ("created_at", FilterType::Date),
    ],
    orderable: &["name", "value", "created_at"],
    relations: &[
        Relation::ManyToOne(ManyToOne {
            name: "attribute",
            table: "attributes",
            foreign_key: "attribute_id",
            key: "id",
            nullable: false,
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

/// Numeric evaluation of an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub attribute_id: i64,
    #[serde(default, skip_serializing)]
    pub creator_id: Option<i64>,
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<NamedRef>,
    #[serde(default)]
    pub creator: Option<NamedRef>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Score {
    pub fn new(attribute_id: i64, name: impl Into<String>, value: f64) -> Self {
        Self {
            id: None,
            attribute_id,
            creator_id: None,
            name: name.into(),
            value,
            attribute: None,
            creator: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Score {
    const NAME: &'static str = "Score";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("attribute_id", self.attribute_id.into()),
            ("creator_id", self.creator_id.into()),
            ("name", self.name.clone().into()),
            ("value", self.value.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }

    fn attach(&mut self, relation: &str, data: Value) -> Result<(), serde_json::Error> {
        match relation {
            "attribute" => attach_slot(&mut self.attribute, data),
            "creator" => attach_slot(&mut self.creator, data),
            _ => Ok(()),
        }
    }
}
