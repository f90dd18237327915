use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{slugify, timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "tags",
    filterable: &[
        ("name", FilterType::String),
        ("slug", FilterType::String),
        ("created_at", FilterType::Date),
    ],
    orderable: &["name", "slug", "created_at"],
    relations: &[Relation::ManyToOne(ManyToOne {
        name: "user",
        table: "users",
        foreign_key: "user_id",
        key: "id",
        nullable: false,
        hydrate: &[],
    })],
};

/// Label attached to a user by an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(skip_serializing)]
    pub identity_id: i64,
    pub name: String,
    pub slug: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Tag {
    pub fn new(user_id: i64, identity_id: i64, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: None,
            user_id,
            identity_id,
            slug: slugify(&name),
            name,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Tag {
    const NAME: &'static str = "Tag";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("identity_id", self.identity_id.into()),
            ("name", self.name.clone().into()),
            ("slug", self.slug.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}
