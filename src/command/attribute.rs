use serde::{Deserialize, Serialize};

use super::{command, ProfileScope};
use crate::auth::Identity;
use crate::database::models::Attribute;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "attribute.list_all", Vec<Attribute>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub attribute_id: i64,
}
command!(GetOne, "attribute.get_one", Attribute);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub name: String,
    pub value: String,
    pub support: f64,
}
command!(CreateNew, "attribute.create_new", Attribute);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub attribute_id: i64,
    pub value: String,
    pub support: Option<f64>,
}
command!(UpdateOne, "attribute.update_one", Attribute);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub attribute_id: i64,
}
command!(DeleteOne, "attribute.delete_one", ());

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteAll {
    pub scope: ProfileScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(DeleteAll, "attribute.delete_all", u64);
