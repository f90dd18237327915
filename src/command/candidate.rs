use serde::{Deserialize, Serialize};

use super::{command, ProfileScope};
use crate::auth::Identity;
use crate::database::models::Candidate;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "candidate.list_all", Vec<Candidate>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub attribute: String,
    pub value: String,
    pub support: f64,
}
command!(CreateNew, "candidate.create_new", Candidate);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "candidate.delete_all", u64);
