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
    table: "processes",
    filterable: &[
        ("name", FilterType::String),
        ("event", FilterType::String),
        ("source_id", FilterType::Decoded),
        ("created_at", FilterType::Date),
    ],
    orderable: &["name", "event", "created_at", "updated_at"],
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
    ],
};

/// Unit of background work started for a user by an event, tracked through its tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(default, skip_serializing)]
    pub source_id: Option<i64>,
    pub name: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NamedRef>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Process {
    pub fn new(user_id: i64, name: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id,
            source_id: None,
            name: name.into(),
            event: event.into(),
            source: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Process {
    const NAME: &'static str = "Process";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("source_id", self.source_id.into()),
            ("name", self.name.clone().into()),
            ("event", self.event.clone().into()),
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
