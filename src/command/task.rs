use serde::{Deserialize, Serialize};

use super::{command, ProfileScope};
use crate::auth::Identity;
use crate::database::models::Task;
use crate::database::repository::Page;
use crate::filter::types::QueryParams;

/// One page of a process's tasks. `page` starts at 1; a `per_page` of 0 uses the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
    pub process_id: i64,
    pub page: i64,
    pub per_page: i64,
}
command!(ListAll, "task.list_all", Page<Task>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub process_id: i64,
    pub task_id: i64,
}
command!(GetOne, "task.get_one", Task);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub process_id: i64,
    pub name: String,
    pub event: String,
    pub running: bool,
    pub success: Option<bool>,
    pub message: Option<String>,
}
command!(CreateNew, "task.create_new", Task);

/// Absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub process_id: i64,
    pub task_id: i64,
    pub running: Option<bool>,
    pub success: Option<bool>,
    pub message: Option<String>,
}
command!(UpdateOne, "task.update_one", Task);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub process_id: i64,
    pub task_id: i64,
}
command!(DeleteOne, "task.delete_one", ());
