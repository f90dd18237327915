use async_trait::async_trait;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, update_failed, Handled, Handler,
};
use crate::auth::{generate_key_pair, Identity};
use crate::command::service::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne};
use crate::command::CompanyScope;
use crate::database::models::service::ACCESS_PRIVATE;
use crate::database::models::Service;
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, assert_name, assert_service_access, assert_trigger_list, assert_url, Validation};
use crate::vault::Secure;

pub struct ServiceHandler {
    services: Arc<dyn Repository<Service>>,
}

/// Services are cached per company, so every change drops the company tag
fn company_tag(company_id: i64) -> String {
    format!("company:{}", company_id)
}

impl ServiceHandler {
    pub fn new(services: Arc<dyn Repository<Service>>) -> Self {
        Self { services }
    }

    async fn owned(&self, scope: &CompanyScope, service_id: i64) -> Result<Service, ApiError> {
        let service = self
            .services
            .find(service_id)
            .await
            .map_err(not_found("Service not found"))?;
        ensure_owned(service.company_id == scope.company_id, "Service not found")?;
        Ok(service)
    }

    fn event(action: &str, service: &Service, scope: &CompanyScope, identity: &Identity) -> Event {
        Event::about("service", action, service, identity)
            .for_company(scope.company_id)
            .purging_tag(company_tag(scope.company_id))
    }
}

#[async_trait]
impl Handler<ListAll> for ServiceHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Service>>, ApiError> {
        let services = self
            .services
            .find_by(vec![Constraint::eq("company_id", command.scope.company_id)], &command.query)
            .await?;
        Ok(Handled::new(services))
    }
}

#[async_trait]
impl Handler<GetOne> for ServiceHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Service>, ApiError> {
        Validation::new().check("serviceId", assert_id(command.service_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.service_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for ServiceHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Service>, ApiError> {
        let access = command.access.unwrap_or(ACCESS_PRIVATE);
        Validation::new()
            .check("name", assert_name(&command.name))
            .check("url", assert_url(&command.url))
            .check("listens", assert_trigger_list(&command.listens))
            .check("triggers", assert_trigger_list(&command.triggers))
            .check("access", assert_service_access(access))
            .finish()?;

        let (public, private) = generate_key_pair();
        let mut service = Service::new(command.scope.company_id, command.name, command.url);
        service.auth_username = command.auth_username;
        service.auth_password = Secure::new(command.auth_password);
        service.public = public;
        service.private = private;
        service.listens = command.listens;
        service.triggers = command.triggers;
        service.enabled = command.enabled.unwrap_or(true);
        service.access = access;

        let service = self.services.save(service).await.map_err(create_failed("service"))?;
        let event = Self::event("created", &service, &command.scope, &command.identity);
        Ok(Handled::with_event(service, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for ServiceHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Service>, ApiError> {
        let mut validation = Validation::new();
        validation.check("serviceId", assert_id(command.service_id));
        if let Some(name) = &command.name {
            validation.check("name", assert_name(name));
        }
        if let Some(url) = &command.url {
            validation.check("url", assert_url(url));
        }
        if let Some(listens) = &command.listens {
            validation.check("listens", assert_trigger_list(listens));
        }
        if let Some(triggers) = &command.triggers {
            validation.check("triggers", assert_trigger_list(triggers));
        }
        if let Some(access) = command.access {
            validation.check("access", assert_service_access(access));
        }
        validation.finish()?;

        let before = self.owned(&command.scope, command.service_id).await?;
        let mut service = before.clone();
        if let Some(name) = command.name {
            service.name = name;
        }
        if let Some(url) = command.url {
            service.url = url;
        }
        if let Some(username) = command.auth_username {
            service.auth_username = username;
        }
        if let Some(password) = command.auth_password {
            service.auth_password = Secure::new(password);
        }
        if let Some(listens) = command.listens {
            service.listens = listens;
        }
        if let Some(triggers) = command.triggers {
            service.triggers = triggers;
        }
        if let Some(enabled) = command.enabled {
            service.enabled = enabled;
        }
        if let Some(access) = command.access {
            service.access = access;
        }

        if service == before {
            tracing::debug!(service_id = command.service_id, "Service unchanged, skipping save");
            return Ok(Handled::new(before));
        }

        let service = self.services.save(service).await.map_err(update_failed("service"))?;
        let event = Self::event("updated", &service, &command.scope, &command.identity);
        Ok(Handled::with_event(service, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for ServiceHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("serviceId", assert_id(command.service_id)).finish()?;
        let service = self.owned(&command.scope, command.service_id).await?;

        let deleted = self
            .services
            .delete(command.service_id)
            .await
            .map_err(delete_failed("service"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Service not found"));
        }

        let event = Self::event("deleted", &service, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for ServiceHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Service>(
            vec![Constraint::eq("company_id", command.scope.company_id)],
            &command.query,
        );
        let deleted = self
            .services
            .delete_by(constraints)
            .await
            .map_err(delete_failed("services"))?;

        let event = deleted_multi("service", deleted, &command.identity).map(|e| {
            e.for_company(command.scope.company_id)
                .purging_tag(company_tag(command.scope.company_id))
        });
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}
