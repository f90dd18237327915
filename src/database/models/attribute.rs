use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{attach_slot, timestamp, Columns, Entity, NamedRef};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::{Secure, VaultError};

static MAPPING: Mapping = Mapping {
    table: "attributes",
    filterable: &[
        ("name", FilterType::String),
        ("creator.name", FilterType::String),
        ("creator_id", FilterType::Decoded),
        ("created_at", FilterType::Date),
    ],
    orderable: &["name", "support", "created_at"],
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
            name: "creator",
            table: "services",
            foreign_key: "creator_id",
            key: "id",
            nullable: true,
            hydrate: &["name"],
        }),
    ],
};

/// Fact about a user, optionally produced by a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub user_id: i64,
    #[serde(default, skip_serializing)]
    pub creator_id: Option<i64>,
    pub name: String,
    pub value: Secure<String>,
    pub support: f64,
    #[serde(default)]
    pub creator: Option<NamedRef>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Attribute {
    pub fn new(user_id: i64, name: impl Into<String>, value: impl Into<String>, support: f64) -> Self {
        Self {
            id: None,
            user_id,
            creator_id: None,
            name: name.into(),
            value: Secure::new(value.into()),
            support,
            creator: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Attribute {
    const NAME: &'static str = "Attribute";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("user_id", self.user_id.into()),
            ("creator_id", self.creator_id.into()),
            ("name", self.name.clone().into()),
            ("value", self.value.seal()?.into()),
            ("support", self.support.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }

    fn attach(&mut self, relation: &str, data: Value) -> Result<(), serde_json::Error> {
        match relation {
            "creator" => attach_slot(&mut self.creator, data),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_creator_from_aliased_columns() {
        let row = json!({
            "id": 1,
            "user_id": 2,
            "creator_id": 3,
            "name": "email",
            "value": "\"jane@example.com\"",
            "support": 0.9,
            "created_at": 1_700_000_000,
            "updated_at": null,
            "creator.name": "Email Checker"
        });
        let attribute = Attribute::from_row(row).unwrap();
        assert_eq!(attribute.creator, Some(NamedRef { name: "Email Checker".to_string() }));

        let body = serde_json::to_value(&attribute).unwrap();
        assert_eq!(body["creator"]["name"], "Email Checker");
        assert!(body.get("creator_id").is_none());
    }

    #[test]
    fn attach_fills_the_slot() {
        let mut attribute = Attribute::new(1, "email", "x", 1.0);
        attribute.attach("creator", json!({"name": "Svc"})).unwrap();
        assert_eq!(attribute.creator.unwrap().name, "Svc");
    }
}
