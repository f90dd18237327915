use serde::{Deserialize, Serialize};

use super::{command, CompanyScope};
use crate::auth::Identity;
use crate::database::models::Service;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "service.list_all", Vec<Service>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub service_id: i64,
}
command!(GetOne, "service.get_one", Service);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub name: String,
    pub url: String,
    pub auth_username: String,
    pub auth_password: String,
    pub listens: Vec<String>,
    pub triggers: Vec<String>,
    pub enabled: Option<bool>,
    pub access: Option<i32>,
}
command!(CreateNew, "service.create_new", Service);

/// Absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub service_id: i64,
    pub name: Option<String>,
    pub url: Option<String>,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
    pub listens: Option<Vec<String>>,
    pub triggers: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub access: Option<i32>,
}
command!(UpdateOne, "service.update_one", Service);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub service_id: i64,
}
command!(DeleteOne, "service.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "service.delete_all", u64);
