use serde::{Deserialize, Serialize};

use super::{command, ProfileScope, Upserted};
use crate::auth::Identity;
use crate::database::models::Gate;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "gate.list_all", Vec<Gate>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub gate_id: i64,
}
command!(GetOne, "gate.get_one", Gate);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub name: String,
    pub pass: bool,
}
command!(CreateNew, "gate.create_new", Gate);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub gate_id: i64,
    pub pass: bool,
}
command!(UpdateOne, "gate.update_one", Gate);

/// Insert or replace the gate with the same slug
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Upsert {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub name: String,
    pub pass: bool,
}
command!(Upsert, "gate.upsert", Upserted<Gate>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub gate_id: i64,
}
command!(DeleteOne, "gate.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "gate.delete_all", u64);
