use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{slugify, timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "companies",
    filterable: &[
        ("name", FilterType::String),
        ("slug", FilterType::String),
        ("personal", FilterType::Boolean),
        ("parent_id", FilterType::Decoded),
        ("created_at", FilterType::Date),
    ],
    orderable: &["name", "slug", "created_at"],
    relations: &[],
};

/// Tenant. Child companies point at their parent through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub private_key: String,
    pub personal: bool,
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub parent_id: Option<i64>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Company {
    pub fn new(
        name: impl Into<String>,
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        parent_id: Option<i64>,
    ) -> Self {
        let name = name.into();
        Self {
            id: None,
            slug: slugify(&name),
            name,
            public_key: public_key.into(),
            private_key: private_key.into(),
            personal: false,
            parent_id,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Company {
    const NAME: &'static str = "Company";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("name", self.name.clone().into()),
            ("slug", self.slug.clone().into()),
            ("public_key", self.public_key.clone().into()),
            ("private_key", self.private_key.clone().into()),
            ("personal", self.personal.into()),
            ("parent_id", self.parent_id.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_serializes_the_private_key() {
        let company = Company::new("Acme Corp", "pub", "secret", Some(1));
        let body = serde_json::to_value(&company).unwrap();
        assert_eq!(body["slug"], "acme-corp");
        assert!(body.get("private_key").is_none());
        assert!(body["parent_id"].is_i64());
    }
}
