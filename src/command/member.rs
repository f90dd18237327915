use serde::{Deserialize, Serialize};

use super::{command, CompanyScope};
use crate::auth::Identity;
use crate::database::models::Member;
use crate::filter::types::QueryParams;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListAll {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub query: QueryParams,
}
command!(ListAll, "member.list_all", Vec<Member>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub user_id: i64,
    pub role: String,
}
command!(CreateNew, "member.create_new", Member);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub member_id: i64,
    pub role: String,
}
command!(UpdateOne, "member.update_one", Member);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub member_id: i64,
}
command!(DeleteOne, "member.delete_one", ());
