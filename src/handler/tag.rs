use async_trait::async_trait;
use std::sync::Arc;

use super::{create_failed, delete_failed, deleted_multi, filtered, not_found, profile_event, Handled, Handler};
use crate::command::tag::{CreateNew, DeleteAll, DeleteOne, ListAll};
use crate::database::models::Tag;
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::types::Constraint;
use crate::validation::{assert_name, assert_slug, Validation};

pub struct TagHandler {
    tags: Arc<dyn Repository<Tag>>,
}

impl TagHandler {
    pub fn new(tags: Arc<dyn Repository<Tag>>) -> Self {
        Self { tags }
    }
}

#[async_trait]
impl Handler<ListAll> for TagHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Tag>>, ApiError> {
        let tags = self
            .tags
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(tags))
    }
}

#[async_trait]
impl Handler<CreateNew> for TagHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Tag>, ApiError> {
        Validation::new().check("name", assert_name(&command.name)).finish()?;

        // the credential acting on the profile is the tagging identity
        let tag = Tag::new(command.scope.user_id, command.scope.credential_id, command.name);
        let tag = self.tags.save(tag).await.map_err(create_failed("tag"))?;

        let event = profile_event("tag", "created", &tag, &command.scope, &command.identity);
        Ok(Handled::with_event(tag, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for TagHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("tagSlug", assert_slug(&command.slug)).finish()?;

        let tag = self
            .tags
            .find_one_by(vec![
                Constraint::eq("user_id", command.scope.user_id),
                Constraint::eq("slug", command.slug.as_str()),
            ])
            .await
            .map_err(not_found("Tag not found"))?;

        let deleted = self
            .tags
            .delete(tag.id.unwrap_or_default())
            .await
            .map_err(delete_failed("tag"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("No tags found for deletion"));
        }

        let event = profile_event("tag", "deleted", &tag, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for TagHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Tag>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let deleted = self.tags.delete_by(constraints).await.map_err(delete_failed("tags"))?;

        let event = deleted_multi("tag", deleted, &command.identity)
            .map(|e| e.queued_for(command.scope.company_id, &command.scope.username));
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}
