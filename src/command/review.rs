use serde::{Deserialize, Serialize};

use super::{command, ProfileScope, Upserted};
use crate::auth::Identity;
use crate::database::models::Review;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "review.list_all", Vec<Review>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub review_id: i64,
}
command!(GetOne, "review.get_one", Review);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub gate_id: i64,
    pub positive: bool,
    pub description: Option<String>,
}
command!(CreateNew, "review.create_new", Review);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub review_id: i64,
    pub positive: bool,
    pub description: Option<String>,
}
command!(UpdateOne, "review.update_one", Review);

/// Insert or replace the review of the same gate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Upsert {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub gate_id: i64,
    pub positive: bool,
    pub description: Option<String>,
}
command!(Upsert, "review.upsert", Upserted<Review>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub review_id: i64,
}
command!(DeleteOne, "review.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "review.delete_all", u64);
