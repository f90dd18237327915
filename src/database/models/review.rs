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
    table: "reviews",
    filterable: &[
        ("gate_id", FilterType::Decoded),
        ("gate.name", FilterType::String),
        ("positive", FilterType::Boolean),
        ("creator.name", FilterType::String),
        ("created_at", FilterType::Date),
    ],
    orderable: &["positive", "created_at", "updated_at"],
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
            name: "gate",
            table: "gates",
            foreign_key: "gate_id",
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

/// Confirmation or rejection of a gate's verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(serialize_with = "optimus::encoded::serialize")]
    pub gate_id: i64,
    #[serde(default, skip_serializing)]
    pub creator_id: Option<i64>,
    pub positive: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<NamedRef>,
    #[serde(default)]
    pub creator: Option<NamedRef>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Review {
    pub fn new(user_id: i64, gate_id: i64, positive: bool) -> Self {
        Self {
            id: None,
            user_id,
            gate_id,
            creator_id: None,
            positive,
            description: None,
            gate: None,
            creator: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Review {
    const NAME: &'static str = "Review";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("gate_id", self.gate_id.into()),
            ("creator_id", self.creator_id.into()),
            ("positive", self.positive.into()),
            ("description", self.description.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }

    fn attach(&mut self, relation: &str, data: Value) -> Result<(), serde_json::Error> {
        match relation {
            "gate" => attach_slot(&mut self.gate, data),
            "creator" => attach_slot(&mut self.creator, data),
            _ => Ok(()),
        }
    }
}
