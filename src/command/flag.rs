use serde::{Deserialize, Serialize};

use super::{command, ProfileScope, Upserted};
use crate::auth::Identity;
use crate::database::models::Flag;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "flag.list_all", Vec<Flag>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub flag_id: i64,
}
command!(GetOne, "flag.get_one", Flag);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub slug: String,
    pub attribute: Option<String>,
}
command!(CreateNew, "flag.create_new", Flag);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Upsert {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub slug: String,
    pub attribute: Option<String>,
}
command!(Upsert, "flag.upsert", Upserted<Flag>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub flag_id: i64,
}
command!(DeleteOne, "flag.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "flag.delete_all", u64);
