use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, update_failed,
    Handled, Handler,
};
use crate::command::warning::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne, Upsert};
use crate::command::{ProfileScope, Upserted};
use crate::database::models::{slugify, Warning};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, assert_name, assert_slug, Validation};

const CONFLICT_KEYS: &[&str] = &["user_id", "slug"];
const UPDATE_KEYS: &[&str] = &["attribute", "creator_id", "updated_at"];

/// Slug and attribute rules shared with flags
pub(crate) fn check_label(slug: &str, attribute: Option<&str>) -> Result<(), ApiError> {
    let mut validation = Validation::new();
    validation.check("slug", assert_slug(&slugify(slug)));
    if let Some(attribute) = attribute {
        validation.check("attribute", assert_name(attribute));
    }
    validation.finish()
}

pub struct WarningHandler {
    warnings: Arc<dyn Repository<Warning>>,
}

impl WarningHandler {
    pub fn new(warnings: Arc<dyn Repository<Warning>>) -> Self {
        Self { warnings }
    }

    async fn owned(&self, scope: &ProfileScope, warning_id: i64) -> Result<Warning, ApiError> {
        let warning = self
            .warnings
            .find(warning_id)
            .await
            .map_err(not_found("Warning not found"))?;
        ensure_owned(warning.user_id == scope.user_id, "Warning not found")?;
        Ok(warning)
    }

    fn build(scope: &ProfileScope, slug: &str, attribute: Option<String>) -> Warning {
        let mut warning = Warning::new(scope.user_id, slug, attribute);
        warning.creator_id = scope.creator_id;
        warning
    }
}

#[async_trait]
impl Handler<ListAll> for WarningHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Warning>>, ApiError> {
        let warnings = self
            .warnings
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(warnings))
    }
}

#[async_trait]
impl Handler<GetOne> for WarningHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Warning>, ApiError> {
        Validation::new().check("warningId", assert_id(command.warning_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.warning_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for WarningHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Warning>, ApiError> {
        check_label(&command.slug, command.attribute.as_deref())?;

        let warning = Self::build(&command.scope, &command.slug, command.attribute);
        let warning = self.warnings.save(warning).await.map_err(create_failed("warning"))?;

        let event = profile_event("warning", "created", &warning, &command.scope, &command.identity);
        Ok(Handled::with_event(warning, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for WarningHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Warning>, ApiError> {
        let mut validation = Validation::new();
        validation.check("warningId", assert_id(command.warning_id));
        if let Some(attribute) = &command.attribute {
            validation.check("attribute", assert_name(attribute));
        }
        validation.finish()?;

        let mut warning = self.owned(&command.scope, command.warning_id).await?;
        warning.attribute = command.attribute;
        let warning = self.warnings.save(warning).await.map_err(update_failed("warning"))?;

        let event = profile_event("warning", "updated", &warning, &command.scope, &command.identity);
        Ok(Handled::with_event(warning, event))
    }
}

#[async_trait]
impl Handler<Upsert> for WarningHandler {
    async fn handle(&self, command: Upsert) -> Result<Handled<Upserted<Warning>>, ApiError> {
        check_label(&command.slug, command.attribute.as_deref())?;

        let mut warning = Self::build(&command.scope, &command.slug, command.attribute);
        let existing = self
            .warnings
            .count_by(vec![
                Constraint::eq("user_id", command.scope.user_id),
                Constraint::eq("slug", warning.slug.as_str()),
            ])
            .await?;
        let created = existing == 0;
        if !created {
            warning.updated_at = Some(Utc::now());
        }

        let warning = self
            .warnings
            .upsert(warning, CONFLICT_KEYS, UPDATE_KEYS)
            .await
            .map_err(update_failed("warning"))?;

        let action = if created { "created" } else { "updated" };
        let event = profile_event("warning", action, &warning, &command.scope, &command.identity);
        Ok(Handled::with_event(Upserted { entity: warning, created }, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for WarningHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("warningId", assert_id(command.warning_id)).finish()?;
        let warning = self.owned(&command.scope, command.warning_id).await?;

        let deleted = self
            .warnings
            .delete(command.warning_id)
            .await
            .map_err(delete_failed("warning"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Warning not found"));
        }

        let event = profile_event("warning", "deleted", &warning, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for WarningHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Warning>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let deleted = self
            .warnings
            .delete_by(constraints)
            .await
            .map_err(delete_failed("warnings"))?;

        let event = deleted_multi("warning", deleted, &command.identity)
            .map(|e| e.queued_for(command.scope.company_id, &command.scope.username));
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::command::CredentialScope;
    use crate::filter::types::QueryParams;
    use crate::testing::InMemoryRepository;

    fn scope(user_id: i64) -> ProfileScope {
        ProfileScope::new(
            CredentialScope {
                company_id: 1,
                credential_id: 10,
                creator_id: Some(3),
            },
            user_id,
            "alice",
        )
    }

    fn handler() -> (WarningHandler, Arc<InMemoryRepository<Warning>>) {
        let warnings = Arc::new(InMemoryRepository::<Warning>::new());
        (WarningHandler::new(warnings.clone()), warnings)
    }

    fn upsert(slug: &str, attribute: Option<&str>) -> Upsert {
        Upsert {
            scope: scope(100),
            identity: Identity::default(),
            slug: slug.to_string(),
            attribute: attribute.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn create_slugifies_and_emits() {
        let (handler, _) = handler();
        let handled = handler
            .handle(CreateNew {
                scope: scope(100),
                identity: Identity::default(),
                slug: "Name Mismatch".to_string(),
                attribute: Some("last-name".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(handled.result.slug, "name-mismatch");
        assert_eq!(handled.result.creator_id, Some(3));
        assert_eq!(handled.events[0].name, "idos:warning.created");
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates_in_place() {
        let (handler, warnings) = handler();

        let first = handler.handle(upsert("name-mismatch", None)).await.unwrap();
        assert!(first.result.created);

        let second = handler
            .handle(upsert("name-mismatch", Some("first-name")))
            .await
            .unwrap();
        assert!(!second.result.created);
        assert_eq!(second.result.entity.id, first.result.entity.id);
        assert_eq!(second.result.entity.attribute.as_deref(), Some("first-name"));
        assert_eq!(second.events[0].name, "idos:warning.updated");
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn unusable_slugs_are_rejected() {
        let (handler, _) = handler();
        let err = handler.handle(upsert("!!!", None)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn list_filters_by_slug() {
        let (handler, warnings) = handler();
        warnings.save(Warning::new(100, "name-mismatch", None)).await.unwrap();
        warnings.save(Warning::new(100, "expired-document", None)).await.unwrap();
        warnings.save(Warning::new(200, "name-mismatch", None)).await.unwrap();

        let mut query = QueryParams::new();
        query.insert("slug".to_string(), "name-*".to_string());
        let handled = handler
            .handle(ListAll {
                scope: scope(100),
                identity: Identity::default(),
                query,
            })
            .await
            .unwrap();
        assert_eq!(handled.result.len(), 1);
        assert_eq!(handled.result[0].slug, "name-mismatch");
    }

    #[tokio::test]
    async fn delete_all_reports_nothing_when_empty() {
        let (handler, _) = handler();
        let handled = handler
            .handle(DeleteAll {
                scope: scope(100),
                identity: Identity::default(),
                query: QueryParams::new(),
            })
            .await
            .unwrap();
        assert_eq!(handled.result, 0);
        assert!(handled.events.is_empty());
    }
}
