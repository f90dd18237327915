use async_trait::async_trait;
use std::sync::Arc;

use super::user::{purge_profile, ProfileRepositories};
use super::{create_failed, delete_failed, ensure_owned, not_found, Handled, Handler};
use crate::auth::generate_key_pair;
use crate::command::credential::{CreateNew, DeleteOne, GetOne, ListAll};
use crate::command::CompanyScope;
use crate::database::models::{Credential, Hook};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::{Constraint, QueryParams};
use crate::validation::{assert_identifier, assert_name, Validation};

pub struct CredentialHandler {
    credentials: Arc<dyn Repository<Credential>>,
    profiles: ProfileRepositories,
    hooks: Arc<dyn Repository<Hook>>,
}

impl CredentialHandler {
    pub fn new(
        credentials: Arc<dyn Repository<Credential>>,
        profiles: ProfileRepositories,
        hooks: Arc<dyn Repository<Hook>>,
    ) -> Self {
        Self {
            credentials,
            profiles,
            hooks,
        }
    }

    async fn owned(&self, scope: &CompanyScope, public_key: &str) -> Result<Credential, ApiError> {
        let credential = self
            .credentials
            .find_one_by(vec![Constraint::eq("public", public_key)])
            .await
            .map_err(not_found("Credential not found"))?;
        ensure_owned(credential.company_id == scope.company_id, "Credential not found")?;
        Ok(credential)
    }
}

#[async_trait]
impl Handler<ListAll> for CredentialHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Credential>>, ApiError> {
        let credentials = self
            .credentials
            .find_by(vec![Constraint::eq("company_id", command.scope.company_id)], &command.query)
            .await?;
        Ok(Handled::new(credentials))
    }
}

#[async_trait]
impl Handler<GetOne> for CredentialHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Credential>, ApiError> {
        Validation::new()
            .check("pubKey", assert_identifier(&command.public_key))
            .finish()?;
        Ok(Handled::new(self.owned(&command.scope, &command.public_key).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for CredentialHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Credential>, ApiError> {
        Validation::new().check("name", assert_name(&command.name)).finish()?;

        let (public, private) = generate_key_pair();
        let credential = Credential::new(command.scope.company_id, command.name, command.production, public, private);
        let credential = self
            .credentials
            .save(credential)
            .await
            .map_err(create_failed("credential"))?;

        let event = Event::about("credential", "created", &credential, &command.identity)
            .for_company(command.scope.company_id);
        Ok(Handled::with_event(credential, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for CredentialHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new()
            .check("pubKey", assert_identifier(&command.public_key))
            .finish()?;
        let credential = self.owned(&command.scope, &command.public_key).await?;
        let credential_id = credential.id.unwrap_or_default();

        let children = || vec![Constraint::eq("credential_id", credential_id)];
        let users = self.profiles.users.find_by(children(), &QueryParams::new()).await?;
        for user_id in users.iter().filter_map(|user| user.id) {
            purge_profile(&self.profiles, user_id).await?;
        }
        self.profiles
            .users
            .delete_by(children())
            .await
            .map_err(delete_failed("credential"))?;
        self.hooks.delete_by(children()).await.map_err(delete_failed("credential"))?;

        let deleted = self
            .credentials
            .delete(credential_id)
            .await
            .map_err(delete_failed("credential"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Credential not found"));
        }

        let event = Event::about("credential", "deleted", &credential, &command.identity)
            .for_company(command.scope.company_id)
            .purging_key(format!("credential:{}", credential.public));
        Ok(Handled::with_event((), event))
    }
}
