use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "hooks",
    filterable: &[
        ("trigger", FilterType::String),
        ("url", FilterType::String),
        ("subscribed", FilterType::Boolean),
        ("created_at", FilterType::Date),
    ],
    orderable: &["trigger", "created_at"],
    relations: &[Relation::ManyToOne(ManyToOne {
        name: "credential",
        table: "credentials",
        foreign_key: "credential_id",
        key: "id",
        nullable: false,
        hydrate: &[],
    })],
};

/// Webhook endpoint bound to a credential and a trigger event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub credential_id: i64,
    pub trigger: String,
    pub url: String,
    pub subscribed: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Hook {
    pub fn new(credential_id: i64, trigger: impl Into<String>, url: impl Into<String>, subscribed: bool) -> Self {
        Self {
            id: None,
            credential_id,
            trigger: trigger.into(),
            url: url.into(),
            subscribed,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Hook {
    const NAME: &'static str = "Hook";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("credential_id", self.credential_id.into()),
            ("trigger", self.trigger.clone().into()),
            ("url", self.url.clone().into()),
            ("subscribed", self.subscribed.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}
