use serde::{Deserialize, Serialize};

use super::{command, CompanyScope};
use crate::auth::Identity;
use crate::database::models::Permission;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "permission.list_all", Vec<Permission>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub route_name: String,
}
command!(GetOne, "permission.get_one", Permission);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub route_name: String,
}
command!(CreateNew, "permission.create_new", Permission);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub route_name: String,
}
command!(DeleteOne, "permission.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "permission.delete_all", u64);
