use serde::{Deserialize, Serialize};

use super::{command, CompanyScope};
use crate::auth::Identity;
use crate::database::models::Credential;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "credential.list_all", Vec<Credential>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub public_key: String,
}
command!(GetOne, "credential.get_one", Credential);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub name: String,
    pub production: bool,
}
command!(CreateNew, "credential.create_new", Credential);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub public_key: String,
}
command!(DeleteOne, "credential.delete_one", ());
