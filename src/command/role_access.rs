use serde::{Deserialize, Serialize};

use super::{command, CompanyScope};
use crate::auth::Identity;
use crate::database::models::RoleAccess;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "role_access.list_all", Vec<RoleAccess>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub role: String,
    pub resource: String,
    pub access: i32,
}
command!(CreateNew, "role_access.create_new", RoleAccess);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub role_access_id: i64,
    pub access: i32,
}
command!(UpdateOne, "role_access.update_one", RoleAccess);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub role_access_id: i64,
}
command!(DeleteOne, "role_access.delete_one", ());
