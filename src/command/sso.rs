use serde::{Deserialize, Serialize};

use super::command;
use crate::auth::Identity;

/// Signs a user in through a social provider, answering with a user token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNew {
    pub identity: Identity,
    pub provider: String,
    /// Public key of the credential the user signs in to
    #[serde(rename = "credential")]
    pub credential_public_key: String,
    pub access_token: String,
    pub token_secret: Option<String>,
    /// Address of the caller, filled in by the controller
    pub ipaddr: Option<String>,
}
command!(CreateNew, "sso.create_new", String);
