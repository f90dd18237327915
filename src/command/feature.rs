use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{command, ProfileScope, Upserted};
use crate::auth::Identity;
use crate::database::models::Feature;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "feature.list_all", Vec<Feature>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub feature_id: i64,
}
command!(GetOne, "feature.get_one", Feature);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub name: String,
    pub value: Value,
    pub source_id: Option<i64>,
}
command!(CreateNew, "feature.create_new", Feature);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub feature_id: i64,
    pub value: Value,
}
command!(UpdateOne, "feature.update_one", Feature);

/// Insert or replace the feature with the same slug
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Upsert {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub name: String,
    pub value: Value,
    pub source_id: Option<i64>,
}
command!(Upsert, "feature.upsert", Upserted<Feature>);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureInput {
    pub name: String,
    pub value: Value,
    pub source_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpsertBulk {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub features: Vec<FeatureInput>,
}
command!(UpsertBulk, "feature.upsert_bulk", Vec<Feature>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub feature_id: i64,
}
command!(DeleteOne, "feature.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "feature.delete_all", u64);
