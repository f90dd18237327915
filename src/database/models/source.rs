use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "sources",
    filterable: &[
        ("id", FilterType::Decoded),
        ("name", FilterType::String),
        ("created_at", FilterType::Date),
    ],
    orderable: &["name", "created_at"],
    relations: &[Relation::ManyToOne(ManyToOne {
        name: "user",
        table: "users",
        foreign_key: "user_id",
        key: "id",
        nullable: false,
        hydrate: &[],
    })],
};

/// External data origin for a user. `tags` holds provider metadata such as access tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub tags: Value,
    #[serde(default)]
    pub ipaddr: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Source {
    pub fn new(user_id: i64, name: impl Into<String>, tags: Value, ipaddr: Option<String>) -> Self {
        Self {
            id: None,
            user_id,
            name: name.into(),
            tags,
            ipaddr,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn tag(&self, name: &str) -> Option<&Value> {
        self.tags.get(name)
    }
}

impl Entity for Source {
    const NAME: &'static str = "Source";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("name", self.name.clone().into()),
            ("tags", self.tags.clone().into()),
            ("ipaddr", self.ipaddr.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}
