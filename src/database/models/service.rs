use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::{Secure, VaultError};

pub const ACCESS_PRIVATE: i32 = 0;
pub const ACCESS_COMPANY: i32 = 1;
pub const ACCESS_PUBLIC: i32 = 2;

static MAPPING: Mapping = Mapping {
    table: "services",
    filterable: &[
        ("name", FilterType::String),
        ("url", FilterType::String),
        ("enabled", FilterType::Boolean),
        ("access", FilterType::Integer),
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

/// Registered listener target for domain events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub company_id: i64,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub auth_username: String,
    #[serde(default, skip_serializing)]
    pub auth_password: Secure<String>,
    pub public: String,
    #[serde(skip_serializing)]
    pub private: String,
    #[serde(default)]
    pub listens: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    pub enabled: bool,
    pub access: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Service {
    pub fn new(company_id: i64, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: None,
            company_id,
            name: name.into(),
            url: url.into(),
            auth_username: String::new(),
            auth_password: Secure::default(),
            public: String::new(),
            private: String::new(),
            listens: vec![],
            triggers: vec![],
            enabled: true,
            access: ACCESS_PRIVATE,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn listens_to(&self, identifier: &str) -> bool {
        self.listens.iter().any(|l| l == identifier)
    }
}

impl Entity for Service {
    const NAME: &'static str = "Service";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("company_id", self.company_id.into()),
            ("name", self.name.clone().into()),
            ("url", self.url.clone().into()),
            ("auth_username", self.auth_username.clone().into()),
            ("auth_password", self.auth_password.seal()?.into()),
            ("public", self.public.clone().into()),
            ("private", self.private.clone().into()),
            ("listens", json!(self.listens).into()),
            ("triggers", json!(self.triggers).into()),
            ("enabled", self.enabled.into()),
            ("access", self.access.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_listens_as_json_and_hides_secrets() {
        let mut service = Service::new(1, "KYC", "https://kyc.example.com/hook");
        service.listens = vec!["idos:feature.created".to_string()];
        service.auth_password = Secure::new("hunter2".to_string());

        let columns = service.columns().unwrap();
        let listens = columns.iter().find(|(c, _)| *c == "listens").unwrap();
        assert_eq!(listens.1, json!(["idos:feature.created"]).into());

        let body = serde_json::to_value(&service).unwrap();
        assert!(body.get("auth_password").is_none());
        assert!(body.get("private").is_none());
        assert!(service.listens_to("idos:feature.created"));
        assert!(!service.listens_to("idos:feature.deleted"));
    }
}
