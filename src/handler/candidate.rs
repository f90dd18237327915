use async_trait::async_trait;
use std::sync::Arc;

use super::{create_failed, delete_failed, deleted_multi, filtered, profile_event, Handled, Handler};
use crate::command::candidate::{CreateNew, DeleteAll, ListAll};
use crate::database::models::Candidate;
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::types::Constraint;
use crate::validation::{assert_name, assert_support, assert_value, Validation};

pub struct CandidateHandler {
    candidates: Arc<dyn Repository<Candidate>>,
}

impl CandidateHandler {
    pub fn new(candidates: Arc<dyn Repository<Candidate>>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl Handler<ListAll> for CandidateHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Candidate>>, ApiError> {
        let candidates = self
            .candidates
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(candidates))
    }
}

#[async_trait]
impl Handler<CreateNew> for CandidateHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Candidate>, ApiError> {
        Validation::new()
            .check("attribute", assert_name(&command.attribute))
            .check("value", assert_value(&command.value))
            .check("support", assert_support(command.support))
            .finish()?;

        let mut candidate = Candidate::new(command.scope.user_id, command.attribute, command.value, command.support);
        candidate.creator_id = command.scope.creator_id;
        let candidate = self
            .candidates
            .save(candidate)
            .await
            .map_err(create_failed("candidate"))?;

        let event = profile_event("candidate", "created", &candidate, &command.scope, &command.identity);
        Ok(Handled::with_event(candidate, event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for CandidateHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Candidate>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let deleted = self
            .candidates
            .delete_by(constraints)
            .await
            .map_err(delete_failed("candidates"))?;

        let event = deleted_multi("candidate", deleted, &command.identity)
            .map(|e| e.queued_for(command.scope.company_id, &command.scope.username));
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::command::{CredentialScope, ProfileScope};
    use crate::filter::types::QueryParams;
    use crate::testing::InMemoryRepository;

    fn scope() -> ProfileScope {
        ProfileScope::new(
            CredentialScope {
                company_id: 1,
                credential_id: 10,
                creator_id: Some(4),
            },
            100,
            "alice",
        )
    }

    fn create(attribute: &str) -> CreateNew {
        CreateNew {
            scope: scope(),
            identity: Identity::default(),
            attribute: attribute.to_string(),
            value: "Alice".to_string(),
            support: 0.6,
        }
    }

    #[tokio::test]
    async fn candidates_are_created_and_filtered_on_delete() {
        let candidates = Arc::new(InMemoryRepository::<Candidate>::new());
        let handler = CandidateHandler::new(candidates.clone());
        let created = handler.handle(create("first-name")).await.unwrap();
        assert_eq!(created.result.creator_id, Some(4));
        assert_eq!(created.events[0].name, "idos:candidate.created");
        handler.handle(create("last-name")).await.unwrap();

        let mut query = QueryParams::new();
        query.insert("attribute".to_string(), "first-name".to_string());
        let handled = handler
            .handle(DeleteAll {
                scope: scope(),
                identity: Identity::default(),
                query,
            })
            .await
            .unwrap();
        assert_eq!(handled.result, 1);
        assert_eq!(candidates.len(), 1);
    }
}
