use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, update_failed,
    Handled, Handler,
};
use crate::command::score::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, Upsert};
use crate::command::{ProfileScope, Upserted};
use crate::database::models::{Attribute, Score};
use crate::database::repository::Repository;
use crate::database::SqlValue;
use crate::error::ApiError;
use crate::filter::types::{Constraint, QueryParams};
use crate::validation::{assert_id, assert_name, assert_score, Validation};

const CONFLICT_KEYS: &[&str] = &["attribute_id", "name"];
const UPDATE_KEYS: &[&str] = &["value", "creator_id", "updated_at"];

/// Scores hang off attributes; a profile owns the scores of its attributes
pub struct ScoreHandler {
    scores: Arc<dyn Repository<Score>>,
    attributes: Arc<dyn Repository<Attribute>>,
}

impl ScoreHandler {
    pub fn new(scores: Arc<dyn Repository<Score>>, attributes: Arc<dyn Repository<Attribute>>) -> Self {
        Self { scores, attributes }
    }

    async fn attribute_ids(&self, scope: &ProfileScope) -> Result<Vec<SqlValue>, ApiError> {
        Ok(self
            .attributes
            .find_by(vec![Constraint::eq("user_id", scope.user_id)], &QueryParams::new())
            .await?
            .into_iter()
            .filter_map(|attribute| attribute.id.map(SqlValue::from))
            .collect())
    }

    async fn check_attribute(&self, scope: &ProfileScope, attribute_id: i64) -> Result<(), ApiError> {
        let attribute = self
            .attributes
            .find(attribute_id)
            .await
            .map_err(not_found("Attribute not found"))?;
        ensure_owned(attribute.user_id == scope.user_id, "Attribute not found")
    }

    async fn owned(&self, scope: &ProfileScope, score_id: i64) -> Result<Score, ApiError> {
        let score = self.scores.find(score_id).await.map_err(not_found("Score not found"))?;
        self.check_attribute(scope, score.attribute_id)
            .await
            .map_err(|_| ApiError::not_found("Score not found"))?;
        Ok(score)
    }
}

fn validate(attribute_id: i64, name: &str, value: f64) -> Result<(), ApiError> {
    Validation::new()
        .check("attribute_id", assert_id(attribute_id))
        .check("name", assert_name(name))
        .check("value", assert_score(value))
        .finish()
}

#[async_trait]
impl Handler<ListAll> for ScoreHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Score>>, ApiError> {
        let ids = self.attribute_ids(&command.scope).await?;
        let scores = self
            .scores
            .find_by(vec![Constraint::any_of("attribute_id", ids)], &command.query)
            .await?;
        Ok(Handled::new(scores))
    }
}

#[async_trait]
impl Handler<GetOne> for ScoreHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Score>, ApiError> {
        Validation::new().check("scoreId", assert_id(command.score_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.score_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for ScoreHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Score>, ApiError> {
        validate(command.attribute_id, &command.name, command.value)?;
        self.check_attribute(&command.scope, command.attribute_id).await?;

        let mut score = Score::new(command.attribute_id, command.name, command.value);
        score.creator_id = command.scope.creator_id;
        let score = self.scores.save(score).await.map_err(create_failed("score"))?;

        let event = profile_event("score", "created", &score, &command.scope, &command.identity);
        Ok(Handled::with_event(score, event))
    }
}

#[async_trait]
impl Handler<Upsert> for ScoreHandler {
    async fn handle(&self, command: Upsert) -> Result<Handled<Upserted<Score>>, ApiError> {
        validate(command.attribute_id, &command.name, command.value)?;
        self.check_attribute(&command.scope, command.attribute_id).await?;

        let mut score = Score::new(command.attribute_id, command.name, command.value);
        score.creator_id = command.scope.creator_id;
        let existing = self
            .scores
            .count_by(vec![
                Constraint::eq("attribute_id", score.attribute_id),
                Constraint::eq("name", score.name.as_str()),
            ])
            .await?;
        let created = existing == 0;
        if !created {
            score.updated_at = Some(Utc::now());
        }

        let score = self
            .scores
            .upsert(score, CONFLICT_KEYS, UPDATE_KEYS)
            .await
            .map_err(update_failed("score"))?;

        let action = if created { "created" } else { "updated" };
        let event = profile_event("score", action, &score, &command.scope, &command.identity);
        Ok(Handled::with_event(Upserted { entity: score, created }, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for ScoreHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("scoreId", assert_id(command.score_id)).finish()?;
        let score = self.owned(&command.scope, command.score_id).await?;

        let deleted = self
            .scores
            .delete(command.score_id)
            .await
            .map_err(delete_failed("score"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Score not found"));
        }

        let event = profile_event("score", "deleted", &score, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for ScoreHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let ids = self.attribute_ids(&command.scope).await?;
        if ids.is_empty() {
            return Ok(Handled::new(0));
        }

        let constraints = filtered::<Score>(vec![Constraint::any_of("attribute_id", ids)], &command.query);
        let deleted = self
            .scores
            .delete_by(constraints)
            .await
            .map_err(delete_failed("scores"))?;

        let event = deleted_multi("score", deleted, &command.identity)
            .map(|e| e.queued_for(command.scope.company_id, &command.scope.username));
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::command::CredentialScope;
    use crate::testing::InMemoryRepository;

    fn scope(user_id: i64) -> ProfileScope {
        ProfileScope::new(
            CredentialScope {
                company_id: 1,
                credential_id: 10,
                creator_id: Some(7),
            },
            user_id,
            "alice",
        )
    }

    async fn fixture() -> (ScoreHandler, Arc<InMemoryRepository<Score>>, i64, i64) {
        let scores = Arc::new(InMemoryRepository::<Score>::new());
        let attributes = Arc::new(InMemoryRepository::<Attribute>::new());
        let mine = attributes
            .save(Attribute::new(100, "email", "alice@example.com", 1.0))
            .await
            .unwrap();
        let theirs = attributes
            .save(Attribute::new(200, "email", "bob@example.com", 1.0))
            .await
            .unwrap();
        let handler = ScoreHandler::new(scores.clone(), attributes);
        (handler, scores, mine.id.unwrap(), theirs.id.unwrap())
    }

    fn upsert(attribute_id: i64, value: f64) -> Upsert {
        Upsert {
            scope: scope(100),
            identity: Identity::default(),
            attribute_id,
            name: "trust".to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn upsert_keys_on_attribute_and_name() {
        let (handler, scores, mine, _) = fixture().await;

        let first = handler.handle(upsert(mine, 0.4)).await.unwrap();
        assert!(first.result.created);
        assert_eq!(first.result.entity.creator_id, Some(7));

        let second = handler.handle(upsert(mine, 0.9)).await.unwrap();
        assert!(!second.result.created);
        assert_eq!(second.result.entity.id, first.result.entity.id);
        assert_eq!(second.result.entity.value, 0.9);
        assert_eq!(second.events[0].name, "idos:score.updated");
        assert_eq!(scores.len(), 1);
    }

    #[tokio::test]
    async fn scores_on_foreign_attributes_are_refused() {
        let (handler, scores, _, theirs) = fixture().await;
        let err = handler.handle(upsert(theirs, 0.4)).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(scores.len(), 0);
    }

    #[tokio::test]
    async fn listing_only_sees_own_attributes() {
        let (handler, scores, mine, theirs) = fixture().await;
        handler.handle(upsert(mine, 0.4)).await.unwrap();
        scores.save(Score::new(theirs, "trust", 0.1)).await.unwrap();

        let handled = handler
            .handle(ListAll {
                scope: scope(100),
                identity: Identity::default(),
                query: QueryParams::new(),
            })
            .await
            .unwrap();
        assert_eq!(handled.result.len(), 1);
        assert_eq!(handled.result[0].attribute_id, mine);
    }

    #[tokio::test]
    async fn non_finite_values_are_rejected() {
        let (handler, _, mine, _) = fixture().await;
        let err = handler.handle(upsert(mine, f64::NAN)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
