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
    table: "raw",
    filterable: &[
        ("collection", FilterType::String),
        ("source_id", FilterType::Decoded),
        ("source.name", FilterType::String),
        ("created_at", FilterType::Date),
    ],
    orderable: &["collection", "created_at", "updated_at"],
    relations: &[Relation::ManyToOne(ManyToOne {
        name: "source",
        table: "sources",
        foreign_key: "source_id",
        key: "id",
        nullable: false,
        hydrate: &["name"],
    })],
};

/// Raw data collected from a source, one row per `(source, collection)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raw {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(serialize_with = "optimus::encoded::serialize")]
    pub source_id: i64,
    pub collection: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NamedRef>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Raw {
    pub fn new(source_id: i64, collection: impl Into<String>, data: Value) -> Self {
        Self {
            id: None,
            source_id,
            collection: collection.into(),
            data,
            source: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Raw {
    const NAME: &'static str = "Raw";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("source_id", self.source_id.into()),
            ("collection", self.collection.clone().into()),
            ("data", self.data.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }

    fn attach(&mut self, relation: &str, data: Value) -> Result<(), serde_json::Error> {
        match relation {
            "source" => attach_slot(&mut self.source, data),
            _ => Ok(()),
        }
    }
}
