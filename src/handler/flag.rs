use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::warning::check_label;
use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, update_failed,
    Handled, Handler,
};
use crate::command::flag::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, Upsert};
use crate::command::{ProfileScope, Upserted};
use crate::database::models::Flag;
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, Validation};

const CONFLICT_KEYS: &[&str] = &["user_id", "slug"];
const UPDATE_KEYS: &[&str] = &["attribute", "creator_id", "updated_at"];

pub struct FlagHandler {
    flags: Arc<dyn Repository<Flag>>,
}

impl FlagHandler {
    pub fn new(flags: Arc<dyn Repository<Flag>>) -> Self {
        Self { flags }
    }

    async fn owned(&self, scope: &ProfileScope, flag_id: i64) -> Result<Flag, ApiError> {
        let flag = self.flags.find(flag_id).await.map_err(not_found("Flag not found"))?;
        ensure_owned(flag.user_id == scope.user_id, "Flag not found")?;
        Ok(flag)
    }

    fn build(scope: &ProfileScope, slug: &str, attribute: Option<String>) -> Flag {
        let mut flag = Flag::new(scope.user_id, slug, attribute);
        flag.creator_id = scope.creator_id;
        flag
    }
}

#[async_trait]
impl Handler<ListAll> for FlagHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Flag>>, ApiError> {
        let flags = self
            .flags
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(flags))
    }
}

#[async_trait]
impl Handler<GetOne> for FlagHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Flag>, ApiError> {
        Validation::new().check("flagId", assert_id(command.flag_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.flag_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for FlagHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Flag>, ApiError> {
        check_label(&command.slug, command.attribute.as_deref())?;

        let flag = Self::build(&command.scope, &command.slug, command.attribute);
        let flag = self.flags.save(flag).await.map_err(create_failed("flag"))?;

        let event = profile_event("flag", "created", &flag, &command.scope, &command.identity);
        Ok(Handled::with_event(flag, event))
    }
}

#[async_trait]
impl Handler<Upsert> for FlagHandler {
    async fn handle(&self, command: Upsert) -> Result<Handled<Upserted<Flag>>, ApiError> {
        check_label(&command.slug, command.attribute.as_deref())?;

        let mut flag = Self::build(&command.scope, &command.slug, command.attribute);
        let existing = self
            .flags
            .count_by(vec![
                Constraint::eq("user_id", command.scope.user_id),
                Constraint::eq("slug", flag.slug.as_str()),
            ])
            .await?;
        let created = existing == 0;
        if !created {
            flag.updated_at = Some(Utc::now());
        }

        let flag = self
            .flags
            .upsert(flag, CONFLICT_KEYS, UPDATE_KEYS)
            .await
            .map_err(update_failed("flag"))?;

        let action = if created { "created" } else { "updated" };
        let event = profile_event("flag", action, &flag, &command.scope, &command.identity);
        Ok(Handled::with_event(Upserted { entity: flag, created }, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for FlagHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("flagId", assert_id(command.flag_id)).finish()?;
        let flag = self.owned(&command.scope, command.flag_id).await?;

        let deleted = self.flags.delete(command.flag_id).await.map_err(delete_failed("flag"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Flag not found"));
        }

        let event = profile_event("flag", "deleted", &flag, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for FlagHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Flag>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let deleted = self.flags.delete_by(constraints).await.map_err(delete_failed("flags"))?;

        let event = deleted_multi("flag", deleted, &command.identity)
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
                creator_id: None,
            },
            user_id,
            "alice",
        )
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
    async fn upsert_inserts_then_updates_in_place() {
        let flags = Arc::new(InMemoryRepository::<Flag>::new());
        let handler = FlagHandler::new(flags.clone());

        let first = handler.handle(upsert("PEP", None)).await.unwrap();
        assert!(first.result.created);
        assert_eq!(first.result.entity.slug, "pep");
        assert_eq!(first.events[0].name, "idos:flag.created");

        let second = handler.handle(upsert("pep", Some("nationality"))).await.unwrap();
        assert!(!second.result.created);
        assert_eq!(second.result.entity.id, first.result.entity.id);
        assert_eq!(second.result.entity.attribute.as_deref(), Some("nationality"));
        assert_eq!(flags.len(), 1);
    }

    #[tokio::test]
    async fn other_profiles_do_not_see_the_flag() {
        let flags = Arc::new(InMemoryRepository::<Flag>::new());
        let flag = flags.save(Flag::new(200, "pep", None)).await.unwrap();
        let handler = FlagHandler::new(flags.clone());

        let err = handler
            .handle(DeleteOne {
                scope: scope(100),
                identity: Identity::default(),
                flag_id: flag.id.unwrap(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(flags.len(), 1);

        let listed = handler
            .handle(ListAll {
                scope: scope(100),
                identity: Identity::default(),
                query: QueryParams::new(),
            })
            .await
            .unwrap();
        assert!(listed.result.is_empty());
    }
}
