use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{slugify, timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "credentials",
    filterable: &[
        ("name", FilterType::String),
        ("slug", FilterType::String),
        ("production", FilterType::Boolean),
        ("created_at", FilterType::Date),
    ],
    orderable: &["name", "created_at"],
    relations: &[Relation::ManyToOne(ManyToOne {
        name: "company",
        table: "companies",
        foreign_key: "company_id",
        key: "id",
        nullable: false,
        hydrate: &[],
    })],
};

/// API key pair scoping a company's integrations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub company_id: i64,
    pub name: String,
    pub slug: String,
    pub public: String,
    #[serde(skip_serializing)]
    pub private: String,
    pub production: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(
        company_id: i64,
        name: impl Into<String>,
        production: bool,
        public: impl Into<String>,
        private: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: None,
            company_id,
            slug: slugify(&name),
            name,
            public: public.into(),
            private: private.into(),
            production,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Credential {
    const NAME: &'static str = "Credential";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("company_id", self.company_id.into()),
            ("name", self.name.clone().into()),
            ("slug", self.slug.clone().into()),
            ("public", self.public.clone().into()),
            ("private", self.private.clone().into()),
            ("production", self.production.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}
