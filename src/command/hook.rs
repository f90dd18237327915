use serde::{Deserialize, Serialize};

use super::{command, CompanyScope};
use crate::auth::Identity;
use crate::database::models::Hook;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub query: QueryParams,
    pub credential_public_key: String,
}
command!(ListAll, "hook.list_all", Vec<Hook>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub credential_public_key: String,
    pub hook_id: i64,
}
command!(GetOne, "hook.get_one", Hook);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub credential_public_key: String,
    pub trigger: String,
    pub url: String,
    pub subscribed: bool,
}
command!(CreateNew, "hook.create_new", Hook);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub credential_public_key: String,
    pub hook_id: i64,
    pub trigger: String,
    pub url: String,
    pub subscribed: bool,
}
command!(UpdateOne, "hook.update_one", Hook);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub credential_public_key: String,
    pub hook_id: i64,
}
command!(DeleteOne, "hook.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub credential_public_key: String,
}
command!(DeleteAll, "hook.delete_all", u64);
