use serde::{Deserialize, Serialize};

use super::{command, ProfileScope, Upserted};
use crate::auth::Identity;
use crate::database::models::Warning;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "warning.list_all", Vec<Warning>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub warning_id: i64,
}
command!(GetOne, "warning.get_one", Warning);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub slug: String,
    pub attribute: Option<String>,
}
command!(CreateNew, "warning.create_new", Warning);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub warning_id: i64,
    pub attribute: Option<String>,
}
command!(UpdateOne, "warning.update_one", Warning);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Upsert {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub slug: String,
    pub attribute: Option<String>,
}
command!(Upsert, "warning.upsert", Upserted<Warning>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub warning_id: i64,
}
command!(DeleteOne, "warning.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "warning.delete_all", u64);
