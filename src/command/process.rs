use serde::{Deserialize, Serialize};

use super::{command, ProfileScope};
use crate::auth::Identity;
use crate::database::models::Process;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "process.list_all", Vec<Process>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub process_id: i64,
}
command!(GetOne, "process.get_one", Process);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub name: String,
    pub event: String,
    pub source_id: Option<i64>,
}
command!(CreateNew, "process.create_new", Process);

/// Removes the process together with its tasks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub process_id: i64,
}
command!(DeleteOne, "process.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "process.delete_all", u64);
