use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, update_failed,
    Handled, Handler,
};
use crate::auth::Identity;
use crate::command::feature::{
    CreateNew, DeleteAll, DeleteOne, FeatureInput, GetOne, ListAll, UpdateOne, Upsert, UpsertBulk,
};
use crate::command::{ProfileScope, Upserted};
use crate::database::models::{slugify, Feature, Source};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, assert_name, assert_slug, Validation};

/// A feature is unique per user and slug
const CONFLICT_KEYS: &[&str] = &["user_id", "slug"];
const UPDATE_KEYS: &[&str] = &["name", "value", "source_id", "creator_id", "updated_at"];

pub struct FeatureHandler {
    features: Arc<dyn Repository<Feature>>,
    sources: Arc<dyn Repository<Source>>,
}

fn check_input(validation: &mut Validation, prefix: &str, input: &FeatureInput) {
    validation
        .check(&format!("{}name", prefix), assert_name(&input.name))
        .check(&format!("{}name", prefix), assert_slug(&slugify(&input.name)));
    if let Some(source_id) = input.source_id {
        validation.check(&format!("{}source_id", prefix), assert_id(source_id));
    }
}

impl FeatureHandler {
    pub fn new(features: Arc<dyn Repository<Feature>>, sources: Arc<dyn Repository<Source>>) -> Self {
        Self { features, sources }
    }

    async fn owned(&self, scope: &ProfileScope, feature_id: i64) -> Result<Feature, ApiError> {
        let feature = self
            .features
            .find(feature_id)
            .await
            .map_err(not_found("Feature not found"))?;
        ensure_owned(feature.user_id == scope.user_id, "Feature not found")?;
        Ok(feature)
    }

    /// A referenced source must belong to the same profile
    async fn check_source(&self, scope: &ProfileScope, source_id: Option<i64>) -> Result<(), ApiError> {
        if let Some(source_id) = source_id {
            let source = self
                .sources
                .find(source_id)
                .await
                .map_err(not_found("Source not found"))?;
            ensure_owned(source.user_id == scope.user_id, "Source not found")?;
        }
        Ok(())
    }

    fn build(scope: &ProfileScope, input: FeatureInput) -> Feature {
        let mut feature = Feature::new(scope.user_id, input.name, input.value);
        feature.source_id = input.source_id;
        feature.creator_id = scope.creator_id;
        feature
    }

    async fn upsert_one(&self, scope: &ProfileScope, input: FeatureInput) -> Result<Upserted<Feature>, ApiError> {
        self.check_source(scope, input.source_id).await?;

        let mut feature = Self::build(scope, input);
        let existing = self
            .features
            .count_by(vec![
                Constraint::eq("user_id", scope.user_id),
                Constraint::eq("slug", feature.slug.as_str()),
            ])
            .await?;
        let created = existing == 0;
        if !created {
            feature.updated_at = Some(Utc::now());
        }

        let feature = self
            .features
            .upsert(feature, CONFLICT_KEYS, UPDATE_KEYS)
            .await
            .map_err(update_failed("feature"))?;
        Ok(Upserted { entity: feature, created })
    }
}

fn upsert_event(upserted: &Upserted<Feature>, scope: &ProfileScope, identity: &Identity) -> Event {
    let action = if upserted.created { "created" } else { "updated" };
    profile_event("feature", action, &upserted.entity, scope, identity)
}

#[async_trait]
impl Handler<ListAll> for FeatureHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Feature>>, ApiError> {
        let features = self
            .features
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(features))
    }
}

#[async_trait]
impl Handler<GetOne> for FeatureHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Feature>, ApiError> {
        Validation::new().check("featureId", assert_id(command.feature_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.feature_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for FeatureHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Feature>, ApiError> {
        let input = FeatureInput {
            name: command.name,
            value: command.value,
            source_id: command.source_id,
        };
        let mut validation = Validation::new();
        check_input(&mut validation, "", &input);
        validation.finish()?;
        self.check_source(&command.scope, input.source_id).await?;

        let feature = Self::build(&command.scope, input);
        let feature = self.features.save(feature).await.map_err(create_failed("feature"))?;

        let event = profile_event("feature", "created", &feature, &command.scope, &command.identity);
        Ok(Handled::with_event(feature, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for FeatureHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Feature>, ApiError> {
        Validation::new().check("featureId", assert_id(command.feature_id)).finish()?;

        let mut feature = self.owned(&command.scope, command.feature_id).await?;
        feature.value = command.value;
        let feature = self.features.save(feature).await.map_err(update_failed("feature"))?;

        let event = profile_event("feature", "updated", &feature, &command.scope, &command.identity);
        Ok(Handled::with_event(feature, event))
    }
}

#[async_trait]
impl Handler<Upsert> for FeatureHandler {
    async fn handle(&self, command: Upsert) -> Result<Handled<Upserted<Feature>>, ApiError> {
        let input = FeatureInput {
            name: command.name,
            value: command.value,
            source_id: command.source_id,
        };
        let mut validation = Validation::new();
        check_input(&mut validation, "", &input);
        validation.finish()?;

        let upserted = self.upsert_one(&command.scope, input).await?;
        let event = upsert_event(&upserted, &command.scope, &command.identity);
        Ok(Handled::with_event(upserted, event))
    }
}

#[async_trait]
impl Handler<UpsertBulk> for FeatureHandler {
    async fn handle(&self, command: UpsertBulk) -> Result<Handled<Vec<Feature>>, ApiError> {
        let mut validation = Validation::new();
        for (index, input) in command.features.iter().enumerate() {
            check_input(&mut validation, &format!("features.{}.", index), input);
        }
        validation.finish()?;

        let mut features = Vec::with_capacity(command.features.len());
        let mut events = Vec::with_capacity(command.features.len());
        for input in command.features {
            let upserted = self.upsert_one(&command.scope, input).await?;
            events.push(upsert_event(&upserted, &command.scope, &command.identity));
            features.push(upserted.entity);
        }
        Ok(Handled::with_events(features, events))
    }
}

#[async_trait]
impl Handler<DeleteOne> for FeatureHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("featureId", assert_id(command.feature_id)).finish()?;
        let feature = self.owned(&command.scope, command.feature_id).await?;

        let deleted = self
            .features
            .delete(command.feature_id)
            .await
            .map_err(delete_failed("feature"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Feature not found"));
        }

        let event = profile_event("feature", "deleted", &feature, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for FeatureHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Feature>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let deleted = self
            .features
            .delete_by(constraints)
            .await
            .map_err(delete_failed("features"))?;

        let event = deleted_multi("feature", deleted, &command.identity)
            .map(|e| e.queued_for(command.scope.company_id, &command.scope.username));
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}
