use async_trait::async_trait;
use std::sync::Arc;

use super::{create_failed, delete_failed, ensure_owned, not_found, Handled, Handler};
use crate::auth::generate_key_pair;
use crate::command::company::{CreateNew, DeleteOne, GetOne};
use crate::command::CompanyScope;
use crate::database::models::{Company, Credential, Member, Permission, Service, Setting};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::Constraint;
use crate::validation::{assert_name, assert_slug, Validation};

pub struct CompanyHandler {
    companies: Arc<dyn Repository<Company>>,
    credentials: Arc<dyn Repository<Credential>>,
    services: Arc<dyn Repository<Service>>,
    settings: Arc<dyn Repository<Setting>>,
    members: Arc<dyn Repository<Member>>,
    permissions: Arc<dyn Repository<Permission>>,
}

impl CompanyHandler {
    pub fn new(
        companies: Arc<dyn Repository<Company>>,
        credentials: Arc<dyn Repository<Credential>>,
        services: Arc<dyn Repository<Service>>,
        settings: Arc<dyn Repository<Setting>>,
        members: Arc<dyn Repository<Member>>,
        permissions: Arc<dyn Repository<Permission>>,
    ) -> Self {
        Self {
            companies,
            credentials,
            services,
            settings,
            members,
            permissions,
        }
    }

    /// The company in scope itself or one of its children
    async fn visible(&self, scope: &CompanyScope, slug: &str) -> Result<Company, ApiError> {
        let company = self
            .companies
            .find_one_by(vec![Constraint::eq("slug", slug)])
            .await
            .map_err(not_found("Company not found"))?;
        let id = company.id.unwrap_or_default();
        ensure_owned(
            id == scope.company_id || company.parent_id == Some(scope.company_id),
            "Company not found",
        )?;
        Ok(company)
    }
}

#[async_trait]
impl Handler<GetOne> for CompanyHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Company>, ApiError> {
        Validation::new().check("companySlug", assert_slug(&command.slug)).finish()?;
        Ok(Handled::new(self.visible(&command.scope, &command.slug).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for CompanyHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Company>, ApiError> {
        Validation::new().check("name", assert_name(&command.name)).finish()?;

        let (public_key, private_key) = generate_key_pair();
        let company = Company::new(command.name, public_key, private_key, Some(command.scope.company_id));
        let company = self.companies.save(company).await.map_err(create_failed("company"))?;

        let event = Event::about("company", "created", &company, &command.identity)
            .for_company(command.scope.company_id);
        Ok(Handled::with_event(company, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for CompanyHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("companySlug", assert_slug(&command.slug)).finish()?;
        let company = self.visible(&command.scope, &command.slug).await?;
        let company_id = company.id.unwrap_or_default();

        let owned = || vec![Constraint::eq("company_id", company_id)];
        self.credentials.delete_by(owned()).await.map_err(delete_failed("company"))?;
        self.services.delete_by(owned()).await.map_err(delete_failed("company"))?;
        self.settings.delete_by(owned()).await.map_err(delete_failed("company"))?;
        self.members.delete_by(owned()).await.map_err(delete_failed("company"))?;
        self.permissions.delete_by(owned()).await.map_err(delete_failed("company"))?;

        let deleted = self.companies.delete(company_id).await.map_err(delete_failed("company"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Company not found"));
        }

        let event = Event::about("company", "deleted", &company, &command.identity)
            .for_company(command.scope.company_id)
            .purging_tag(format!("company:{}", company_id));
        Ok(Handled::with_event((), event))
    }
}
