use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, update_failed,
    Handled, Handler,
};
use crate::command::review::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne, Upsert};
use crate::command::{ProfileScope, Upserted};
use crate::database::models::{Gate, Review};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, assert_long_name, Validation};

/// One review per user and gate
const CONFLICT_KEYS: &[&str] = &["user_id", "gate_id"];
const UPDATE_KEYS: &[&str] = &["positive", "description", "creator_id", "updated_at"];

pub struct ReviewHandler {
    reviews: Arc<dyn Repository<Review>>,
    gates: Arc<dyn Repository<Gate>>,
}

fn check_input(gate_id: i64, description: Option<&str>) -> Result<(), ApiError> {
    let mut validation = Validation::new();
    validation.check("gate_id", assert_id(gate_id));
    if let Some(description) = description {
        validation.check("description", assert_long_name(description));
    }
    validation.finish()
}

impl ReviewHandler {
    pub fn new(reviews: Arc<dyn Repository<Review>>, gates: Arc<dyn Repository<Gate>>) -> Self {
        Self { reviews, gates }
    }

    async fn owned(&self, scope: &ProfileScope, review_id: i64) -> Result<Review, ApiError> {
        let review = self
            .reviews
            .find(review_id)
            .await
            .map_err(not_found("Review not found"))?;
        ensure_owned(review.user_id == scope.user_id, "Review not found")?;
        Ok(review)
    }

    /// The reviewed gate must belong to the same profile
    async fn check_gate(&self, scope: &ProfileScope, gate_id: i64) -> Result<(), ApiError> {
        let gate = self.gates.find(gate_id).await.map_err(not_found("Gate not found"))?;
        ensure_owned(gate.user_id == scope.user_id, "Gate not found")
    }

    fn build(scope: &ProfileScope, gate_id: i64, positive: bool, description: Option<String>) -> Review {
        let mut review = Review::new(scope.user_id, gate_id, positive);
        review.description = description;
        review.creator_id = scope.creator_id;
        review
    }
}

#[async_trait]
impl Handler<ListAll> for ReviewHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Review>>, ApiError> {
        let reviews = self
            .reviews
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(reviews))
    }
}

#[async_trait]
impl Handler<GetOne> for ReviewHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Review>, ApiError> {
        Validation::new().check("reviewId", assert_id(command.review_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.review_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for ReviewHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Review>, ApiError> {
        check_input(command.gate_id, command.description.as_deref())?;
        self.check_gate(&command.scope, command.gate_id).await?;

        let review = Self::build(&command.scope, command.gate_id, command.positive, command.description);
        let review = self.reviews.save(review).await.map_err(create_failed("review"))?;

        let event = profile_event("review", "created", &review, &command.scope, &command.identity);
        Ok(Handled::with_event(review, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for ReviewHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Review>, ApiError> {
        let mut validation = Validation::new();
        validation.check("reviewId", assert_id(command.review_id));
        if let Some(description) = &command.description {
            validation.check("description", assert_long_name(description));
        }
        validation.finish()?;

        let mut review = self.owned(&command.scope, command.review_id).await?;
        review.positive = command.positive;
        if command.description.is_some() {
            review.description = command.description;
        }
        let review = self.reviews.save(review).await.map_err(update_failed("review"))?;

        let event = profile_event("review", "updated", &review, &command.scope, &command.identity);
        Ok(Handled::with_event(review, event))
    }
}

#[async_trait]
impl Handler<Upsert> for ReviewHandler {
    async fn handle(&self, command: Upsert) -> Result<Handled<Upserted<Review>>, ApiError> {
        check_input(command.gate_id, command.description.as_deref())?;
        self.check_gate(&command.scope, command.gate_id).await?;

        let mut review = Self::build(&command.scope, command.gate_id, command.positive, command.description);
        let existing = self
            .reviews
            .count_by(vec![
                Constraint::eq("user_id", command.scope.user_id),
                Constraint::eq("gate_id", command.gate_id),
            ])
            .await?;
        let created = existing == 0;
        if !created {
            review.updated_at = Some(Utc::now());
        }

        let review = self
            .reviews
            .upsert(review, CONFLICT_KEYS, UPDATE_KEYS)
            .await
            .map_err(update_failed("review"))?;

        let action = if created { "created" } else { "updated" };
        let event = profile_event("review", action, &review, &command.scope, &command.identity);
        Ok(Handled::with_event(Upserted { entity: review, created }, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for ReviewHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("reviewId", assert_id(command.review_id)).finish()?;
        let review = self.owned(&command.scope, command.review_id).await?;

        let deleted = self
            .reviews
            .delete(command.review_id)
            .await
            .map_err(delete_failed("review"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Review not found"));
        }

        let event = profile_event("review", "deleted", &review, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for ReviewHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Review>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let deleted = self
            .reviews
            .delete_by(constraints)
            .await
            .map_err(delete_failed("reviews"))?;

        let event = deleted_multi("review", deleted, &command.identity)
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

    struct Fixture {
        handler: ReviewHandler,
        reviews: Arc<InMemoryRepository<Review>>,
        gate_id: i64,
    }

    async fn fixture() -> Fixture {
        let reviews = Arc::new(InMemoryRepository::<Review>::new());
        let gates = Arc::new(InMemoryRepository::<Gate>::new());
        let gate = gates.save(Gate::new(100, "Over 18", true)).await.unwrap();
        Fixture {
            handler: ReviewHandler::new(reviews.clone(), gates),
            reviews,
            gate_id: gate.id.unwrap(),
        }
    }

    fn upsert(gate_id: i64, positive: bool) -> Upsert {
        Upsert {
            scope: scope(100),
            identity: Identity::default(),
            gate_id,
            positive,
            description: None,
        }
    }

    #[tokio::test]
    async fn create_needs_a_gate_of_the_profile() {
        let f = fixture().await;
        let created = f
            .handler
            .handle(CreateNew {
                scope: scope(100),
                identity: Identity::default(),
                gate_id: f.gate_id,
                positive: true,
                description: Some("documents match".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(created.events[0].name, "idos:review.created");

        let mut stranger = scope(200);
        stranger.username = "bob".to_string();
        let err = f
            .handler
            .handle(CreateNew {
                scope: stranger,
                identity: Identity::default(),
                gate_id: f.gate_id,
                positive: true,
                description: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "Gate not found");
        assert_eq!(f.reviews.len(), 1);
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates_in_place() {
        let f = fixture().await;

        let first = f.handler.handle(upsert(f.gate_id, true)).await.unwrap();
        assert!(first.result.created);
        assert_eq!(first.events[0].name, "idos:review.created");

        let second = f.handler.handle(upsert(f.gate_id, false)).await.unwrap();
        assert!(!second.result.created);
        assert_eq!(second.result.entity.id, first.result.entity.id);
        assert!(!second.result.entity.positive);
        assert_eq!(second.events[0].name, "idos:review.updated");
        assert_eq!(f.reviews.len(), 1);
    }

    #[tokio::test]
    async fn update_keeps_the_description_when_absent() {
        let f = fixture().await;
        let mut review = Review::new(100, f.gate_id, true);
        review.description = Some("looks fine".to_string());
        let review = f.reviews.save(review).await.unwrap();

        let handled = f
            .handler
            .handle(UpdateOne {
                scope: scope(100),
                identity: Identity::default(),
                review_id: review.id.unwrap(),
                positive: false,
                description: None,
            })
            .await
            .unwrap();
        assert!(!handled.result.positive);
        assert_eq!(handled.result.description.as_deref(), Some("looks fine"));
    }

    #[tokio::test]
    async fn delete_all_is_scoped_to_the_user() {
        let f = fixture().await;
        f.reviews.save(Review::new(100, f.gate_id, true)).await.unwrap();
        f.reviews.save(Review::new(200, f.gate_id + 1, true)).await.unwrap();

        let handled = f
            .handler
            .handle(DeleteAll {
                scope: scope(100),
                identity: Identity::default(),
                query: QueryParams::new(),
            })
            .await
            .unwrap();
        assert_eq!(handled.result, 1);
        assert_eq!(f.reviews.len(), 1);
    }
}
