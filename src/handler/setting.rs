use async_trait::async_trait;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, update_failed, Handled, Handler,
};
use crate::auth::Identity;
use crate::command::setting::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne};
use crate::command::CompanyScope;
use crate::database::models::Setting;
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, assert_identifier, assert_value, Validation};
use crate::vault::Secure;

pub struct SettingHandler {
    settings: Arc<dyn Repository<Setting>>,
}

impl SettingHandler {
    pub fn new(settings: Arc<dyn Repository<Setting>>) -> Self {
        Self { settings }
    }

    async fn owned(&self, scope: &CompanyScope, setting_id: i64) -> Result<Setting, ApiError> {
        let setting = self
            .settings
            .find(setting_id)
            .await
            .map_err(not_found("Setting not found"))?;
        ensure_owned(setting.company_id == scope.company_id, "Setting not found")?;
        Ok(setting)
    }
}

/// Cached lookups are keyed by `settings:<company>:<section>.<property>`
fn event(action: &str, setting: &Setting, scope: &CompanyScope, identity: &Identity) -> Event {
    Event::about("setting", action, setting, identity)
        .for_company(scope.company_id)
        .purging_key(format!(
            "settings:{}:{}.{}",
            scope.company_id, setting.section, setting.property
        ))
        .purging_tag(format!("company:{}", scope.company_id))
}

#[async_trait]
impl Handler<ListAll> for SettingHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Setting>>, ApiError> {
        let settings = self
            .settings
            .find_by(vec![Constraint::eq("company_id", command.scope.company_id)], &command.query)
            .await?;
        Ok(Handled::new(settings))
    }
}

#[async_trait]
impl Handler<GetOne> for SettingHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Setting>, ApiError> {
        Validation::new().check("settingId", assert_id(command.setting_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.setting_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for SettingHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Setting>, ApiError> {
        Validation::new()
            .check("section", assert_identifier(&command.section))
            .check("property", assert_identifier(&command.property))
            .check("value", assert_value(&command.value))
            .finish()?;

        let existing = self
            .settings
            .count_by(vec![
                Constraint::eq("company_id", command.scope.company_id),
                Constraint::eq("section", command.section.as_str()),
                Constraint::eq("property", command.property.as_str()),
            ])
            .await?;
        if existing > 0 {
            return Err(ApiError::create(
                "Error while trying to create a new setting",
                format!("{}.{} already exists", command.section, command.property),
            ));
        }

        let setting = Setting::new(
            command.scope.company_id,
            command.section,
            command.property,
            command.value,
            command.protected,
        );
        let setting = self.settings.save(setting).await.map_err(create_failed("setting"))?;

        let event = event("created", &setting, &command.scope, &command.identity);
        Ok(Handled::with_event(setting, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for SettingHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Setting>, ApiError> {
        Validation::new()
            .check("settingId", assert_id(command.setting_id))
            .check("value", assert_value(&command.value))
            .finish()?;

        let mut setting = self.owned(&command.scope, command.setting_id).await?;
        setting.value = Secure::new(command.value);
        let setting = self.settings.save(setting).await.map_err(update_failed("setting"))?;

        let event = event("updated", &setting, &command.scope, &command.identity);
        Ok(Handled::with_event(setting, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for SettingHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("settingId", assert_id(command.setting_id)).finish()?;
        let setting = self.owned(&command.scope, command.setting_id).await?;

        let deleted = self
            .settings
            .delete(command.setting_id)
            .await
            .map_err(delete_failed("setting"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Setting not found"));
        }

        let event = event("deleted", &setting, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for SettingHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Setting>(
            vec![Constraint::eq("company_id", command.scope.company_id)],
            &command.query,
        );
        let deleted = self
            .settings
            .delete_by(constraints)
            .await
            .map_err(delete_failed("settings"))?;

        let event = deleted_multi("setting", deleted, &command.identity).map(|e| {
            e.for_company(command.scope.company_id)
                .purging_tag(format!("company:{}", command.scope.company_id))
        });
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::QueryParams;
    use crate::testing::InMemoryRepository;

    fn scope(company_id: i64) -> CompanyScope {
        CompanyScope {
            company_id,
            identity_id: None,
        }
    }

    fn create(section: &str, property: &str) -> CreateNew {
        CreateNew {
            scope: scope(1),
            identity: Identity::default(),
            section: section.to_string(),
            property: property.to_string(),
            value: "value".to_string(),
            protected: false,
        }
    }

    #[tokio::test]
    async fn update_purges_the_cached_value() {
        let handler = SettingHandler::new(Arc::new(InMemoryRepository::new()));
        let created = handler.handle(create("mail", "from")).await.unwrap().result;

        let handled = handler
            .handle(UpdateOne {
                scope: scope(1),
                identity: Identity::default(),
                setting_id: created.id.unwrap(),
                value: "noreply@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(handled.result.value.get(), "noreply@example.com");
        let event = &handled.events[0];
        assert_eq!(event.name, "idos:setting.updated");
        assert_eq!(event.delete_cache_key.as_deref(), Some("settings:1:mail.from"));
        assert_eq!(event.delete_cache_tag.as_deref(), Some("company:1"));
    }

    #[tokio::test]
    async fn duplicate_keys_fail_to_create() {
        let handler = SettingHandler::new(Arc::new(InMemoryRepository::new()));
        handler.handle(create("mail", "from")).await.unwrap();
        let err = handler.handle(create("mail", "from")).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_code(), "CREATE_ERROR");
    }

    #[tokio::test]
    async fn settings_of_other_companies_are_not_found() {
        let handler = SettingHandler::new(Arc::new(InMemoryRepository::new()));
        let created = handler.handle(create("mail", "from")).await.unwrap().result;

        let err = handler
            .handle(GetOne {
                scope: scope(2),
                identity: Identity::default(),
                setting_id: created.id.unwrap(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn delete_all_with_nothing_to_delete_is_silent() {
        let handler = SettingHandler::new(Arc::new(InMemoryRepository::new()));
        let handled = handler
            .handle(DeleteAll {
                scope: scope(1),
                identity: Identity::default(),
                query: QueryParams::new(),
            })
            .await
            .unwrap();
        assert_eq!(handled.result, 0);
        assert!(handled.events.is_empty());
    }
}
