use serde::{Deserialize, Serialize};

use super::{command, CredentialScope, ProfileScope};
use crate::auth::Identity;
use crate::database::models::User;

/// A missing username is replaced with a random one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub scope: CredentialScope,
    pub identity: Identity,
    pub username: Option<String>,
    pub role: Option<String>,
}
command!(CreateNew, "user.create_new", User);

/// Deletes the user in scope and every piece of profile data it owns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOne {
    pub scope: ProfileScope,
    pub identity: Identity,
}
command!(DeleteOne, "user.delete_one", ());
