use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, update_failed,
    Handled, Handler,
};
use crate::command::raw::{CreateNew, DeleteAll, ListAll, UpdateOne, Upsert};
use crate::command::{ProfileScope, Upserted};
use crate::database::manager::DatabaseError;
use crate::database::models::{Raw, Source};
use crate::database::repository::Repository;
use crate::database::SqlValue;
use crate::error::ApiError;
use crate::filter::types::{Constraint, QueryParams};
use crate::validation::{assert_id, assert_identifier, Validation};

/// Raw collections are keyed by `(source, collection)`; sources must belong to the profile
pub struct RawHandler {
    raw: Arc<dyn Repository<Raw>>,
    sources: Arc<dyn Repository<Source>>,
}

fn validate(source_id: i64, collection: &str, data: &Value) -> Result<(), ApiError> {
    let mut validation = Validation::new();
    validation
        .check("source_id", assert_id(source_id))
        .check("collection", assert_identifier(collection));
    if data.is_null() {
        validation.check("data", Err("is required".to_string()));
    }
    validation.finish()
}

fn pair(source_id: i64, collection: &str) -> Vec<Constraint> {
    vec![
        Constraint::eq("source_id", source_id),
        Constraint::eq("collection", collection),
    ]
}

impl RawHandler {
    pub fn new(raw: Arc<dyn Repository<Raw>>, sources: Arc<dyn Repository<Source>>) -> Self {
        Self { raw, sources }
    }

    async fn check_source(&self, scope: &ProfileScope, source_id: i64) -> Result<(), ApiError> {
        let source = self
            .sources
            .find(source_id)
            .await
            .map_err(not_found("Source not found"))?;
        ensure_owned(source.user_id == scope.user_id, "Source not found")
    }

    async fn source_ids(&self, scope: &ProfileScope) -> Result<Vec<SqlValue>, ApiError> {
        Ok(self
            .sources
            .find_by(vec![Constraint::eq("user_id", scope.user_id)], &QueryParams::new())
            .await?
            .into_iter()
            .filter_map(|source| source.id.map(SqlValue::from))
            .collect())
    }

    async fn create(&self, source_id: i64, collection: String, data: Value) -> Result<Raw, ApiError> {
        self.raw
            .save(Raw::new(source_id, collection, data))
            .await
            .map_err(create_failed("raw"))
    }

    async fn update(&self, mut raw: Raw, data: Value) -> Result<Raw, ApiError> {
        raw.data = data;
        raw.updated_at = Some(Utc::now());
        self.raw.save(raw).await.map_err(update_failed("raw"))
    }
}

#[async_trait]
impl Handler<ListAll> for RawHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Raw>>, ApiError> {
        let ids = self.source_ids(&command.scope).await?;
        let raw = self
            .raw
            .find_by(vec![Constraint::any_of("source_id", ids)], &command.query)
            .await?;
        Ok(Handled::new(raw))
    }
}

#[async_trait]
impl Handler<CreateNew> for RawHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Raw>, ApiError> {
        validate(command.source_id, &command.collection, &command.data)?;
        self.check_source(&command.scope, command.source_id).await?;

        let existing = self.raw.count_by(pair(command.source_id, &command.collection)).await?;
        if existing > 0 {
            return Err(ApiError::create(
                "Error while trying to create a new raw",
                format!("collection {} already exists for the source", command.collection),
            ));
        }

        let raw = self.create(command.source_id, command.collection, command.data).await?;
        let event = profile_event("raw", "created", &raw, &command.scope, &command.identity);
        Ok(Handled::with_event(raw, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for RawHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Raw>, ApiError> {
        validate(command.source_id, &command.collection, &command.data)?;
        self.check_source(&command.scope, command.source_id).await?;

        let raw = self
            .raw
            .find_one_by(pair(command.source_id, &command.collection))
            .await
            .map_err(not_found("Raw not found"))?;
        let raw = self.update(raw, command.data).await?;

        let event = profile_event("raw", "updated", &raw, &command.scope, &command.identity);
        Ok(Handled::with_event(raw, event))
    }
}

#[async_trait]
impl Handler<Upsert> for RawHandler {
    async fn handle(&self, command: Upsert) -> Result<Handled<Upserted<Raw>>, ApiError> {
        validate(command.source_id, &command.collection, &command.data)?;
        self.check_source(&command.scope, command.source_id).await?;

        let (raw, created) = match self.raw.find_one_by(pair(command.source_id, &command.collection)).await {
            Ok(existing) => (self.update(existing, command.data).await?, false),
            Err(DatabaseError::NotFound(_)) => (
                self.create(command.source_id, command.collection, command.data).await?,
                true,
            ),
            Err(err) => return Err(err.into()),
        };

        let action = if created { "created" } else { "updated" };
        let event = profile_event("raw", action, &raw, &command.scope, &command.identity);
        Ok(Handled::with_event(Upserted { entity: raw, created }, event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for RawHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let ids = self.source_ids(&command.scope).await?;
        if ids.is_empty() {
            return Ok(Handled::new(0));
        }

        let constraints = filtered::<Raw>(vec![Constraint::any_of("source_id", ids)], &command.query);
        let deleted = self.raw.delete_by(constraints).await.map_err(delete_failed("raw"))?;

        let event = deleted_multi("raw", deleted, &command.identity)
            .map(|e| e.queued_for(command.scope.company_id, &command.scope.username));
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}
