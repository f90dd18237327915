use async_trait::async_trait;
use std::sync::Arc;

use super::{create_failed, delete_failed, ensure_owned, not_found, update_failed, Handled, Handler};
use crate::command::role_access::{CreateNew, DeleteOne, ListAll, UpdateOne};
use crate::command::CompanyScope;
use crate::database::models::RoleAccess;
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, assert_identifier, assert_role, assert_role_access, Validation};

/// Access rules belong to the identity behind a company token
fn identity_of(scope: &CompanyScope) -> Result<i64, ApiError> {
    scope
        .identity_id
        .ok_or_else(|| ApiError::not_allowed("An identity token is required to manage access rules"))
}

pub struct RoleAccessHandler {
    role_access: Arc<dyn Repository<RoleAccess>>,
}

impl RoleAccessHandler {
    pub fn new(role_access: Arc<dyn Repository<RoleAccess>>) -> Self {
        Self { role_access }
    }

    async fn owned(&self, identity_id: i64, role_access_id: i64) -> Result<RoleAccess, ApiError> {
        let rule = self
            .role_access
            .find(role_access_id)
            .await
            .map_err(not_found("RoleAccess not found"))?;
        ensure_owned(rule.identity_id == identity_id, "RoleAccess not found")?;
        Ok(rule)
    }
}

#[async_trait]
impl Handler<ListAll> for RoleAccessHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<RoleAccess>>, ApiError> {
        let identity_id = identity_of(&command.scope)?;
        let rules = self
            .role_access
            .find_by(vec![Constraint::eq("identity_id", identity_id)], &command.query)
            .await?;
        Ok(Handled::new(rules))
    }
}

#[async_trait]
impl Handler<CreateNew> for RoleAccessHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<RoleAccess>, ApiError> {
        Validation::new()
            .check("role", assert_role(&command.role))
            .check("resource", assert_identifier(&command.resource))
            .check("access", assert_role_access(command.access))
            .finish()?;
        let identity_id = identity_of(&command.scope)?;

        let existing = self
            .role_access
            .count_by(vec![
                Constraint::eq("identity_id", identity_id),
                Constraint::eq("role", command.role.as_str()),
                Constraint::eq("resource", command.resource.as_str()),
            ])
            .await?;
        if existing > 0 {
            return Err(ApiError::create(
                "Error while trying to create a new role access",
                format!("{} on {} already has a rule", command.role, command.resource),
            ));
        }

        let rule = RoleAccess::new(identity_id, command.role, command.resource, command.access);
        let rule = self.role_access.save(rule).await.map_err(create_failed("role access"))?;

        let event = Event::about("role_access", "created", &rule, &command.identity).for_company(command.scope.company_id);
        Ok(Handled::with_event(rule, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for RoleAccessHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<RoleAccess>, ApiError> {
        Validation::new()
            .check("roleAccessId", assert_id(command.role_access_id))
            .check("access", assert_role_access(command.access))
            .finish()?;
        let identity_id = identity_of(&command.scope)?;

        let mut rule = self.owned(identity_id, command.role_access_id).await?;
        rule.access = command.access;
        let rule = self.role_access.save(rule).await.map_err(update_failed("role access"))?;

        let event = Event::about("role_access", "updated", &rule, &command.identity).for_company(command.scope.company_id);
        Ok(Handled::with_event(rule, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for RoleAccessHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new()
            .check("roleAccessId", assert_id(command.role_access_id))
            .finish()?;
        let identity_id = identity_of(&command.scope)?;
        let rule = self.owned(identity_id, command.role_access_id).await?;

        let deleted = self
            .role_access
            .delete(command.role_access_id)
            .await
            .map_err(delete_failed("role access"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("RoleAccess not found"));
        }

        let event = Event::about("role_access", "deleted", &rule, &command.identity).for_company(command.scope.company_id);
        Ok(Handled::with_event((), event))
    }
}
