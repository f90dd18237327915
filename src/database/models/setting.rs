use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::{Secure, VaultError};

static MAPPING: Mapping = Mapping {
    table: "settings",
    filterable: &[
        ("section", FilterType::String),
        ("property", FilterType::String),
        ("protected", FilterType::Boolean),
        ("created_at", FilterType::Date),
    ],
    orderable: &["section", "property", "created_at"],
    relations: &[Relation::ManyToOne(ManyToOne {
        name: "company",
        table: "companies",
        foreign_key: "company_id",
        key: "id",
        nullable: false,
        hydrate: &[],
    })],
};

/// Company scoped key-value configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub company_id: i64,
    pub section: String,
    pub property: String,
    pub value: Secure<String>,
    pub protected: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Setting {
    pub fn new(
        company_id: i64,
        section: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
        protected: bool,
    ) -> Self {
        Self {
            id: None,
            company_id,
            section: section.into(),
            property: property.into(),
            value: Secure::new(value.into()),
            protected,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Setting {
    const NAME: &'static str = "Setting";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("company_id", self.company_id.into()),
            ("section", self.section.clone().into()),
            ("property", self.property.clone().into()),
            ("value", self.value.seal()?.into()),
            ("protected", self.protected.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}
