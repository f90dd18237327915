use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{command, ProfileScope, Upserted};
use crate::auth::Identity;
use crate::database::models::Raw;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "raw.list_all", Vec<Raw>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub source_id: i64,
    pub collection: String,
    pub data: Value,
}
command!(CreateNew, "raw.create_new", Raw);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub source_id: i64,
    pub collection: String,
    pub data: Value,
}
command!(UpdateOne, "raw.update_one", Raw);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Upsert {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub source_id: i64,
    pub collection: String,
    pub data: Value,
}
command!(Upsert, "raw.upsert", Upserted<Raw>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "raw.delete_all", u64);
