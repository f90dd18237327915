use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

static MAPPING: Mapping = Mapping {
    table: "permissions",
    filterable: &[("route_name", FilterType::String), ("created_at", FilterType::Date)],
    orderable: &["route_name", "created_at"],
    relations: &[Relation::ManyToOne(ManyToOne {
        name: "company",
        table: "companies",
        foreign_key: "company_id",
        key: "id",
        nullable: false,
        hydrate: &[],
    })],
};

/// Grant of one named route to a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub company_id: i64,
    pub route_name: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Permission {
    pub fn new(company_id: i64, route_name: impl Into<String>) -> Self {
        Self {
            id: None,
            company_id,
            route_name: route_name.into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Permission {
    const NAME: &'static str = "Permission";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("company_id", self.company_id.into()),
            ("route_name", self.route_name.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}
