use serde::{Deserialize, Serialize};

use super::{command, CompanyScope};
use crate::auth::Identity;
use crate::database::models::Company;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub slug: String,
}
command!(GetOne, "company.get_one", Company);

/// Creates a child of the company in scope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub name: String,
}
command!(CreateNew, "company.create_new", Company);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: CompanyScope,
    pub identity: Identity,
    pub slug: String,
}
command!(DeleteOne, "company.delete_one", ());
