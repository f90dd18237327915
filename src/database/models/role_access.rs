use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::VaultError;

pub const ACCESS_NONE: i32 = 0x00;
pub const ACCESS_EXEC: i32 = 0x01;
pub const ACCESS_WRITE: i32 = 0x02;
pub const ACCESS_READ: i32 = 0x04;
pub const ACCESS_ALL: i32 = ACCESS_EXEC | ACCESS_WRITE | ACCESS_READ;

static MAPPING: Mapping = Mapping {
    table: "role_access",
    filterable: &[
        ("role", FilterType::String),
        ("resource", FilterType::String),
        ("access", FilterType::Integer),
        ("created_at", FilterType::Date),
    ],
    orderable: &["role", "resource", "access", "created_at"],
    relations: &[],
};

/// Permission bitmask an identity holds over a role and resource pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAccess {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub identity_id: i64,
    pub role: String,
    pub resource: String,
    pub access: i32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RoleAccess {
    pub fn new(identity_id: i64, role: impl Into<String>, resource: impl Into<String>, access: i32) -> Self {
        Self {
            id: None,
            identity_id,
            role: role.into(),
            resource: resource.into(),
            access,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn allows(&self, wanted: i32) -> bool {
        wanted != ACCESS_NONE && self.access & wanted == wanted
    }
}

impl Entity for RoleAccess {
    const NAME: &'static str = "RoleAccess";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        Ok(vec![
            ("identity_id", self.identity_id.into()),
            ("role", self.role.clone().into()),
            ("resource", self.resource.clone().into()),
            ("access", self.access.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}
