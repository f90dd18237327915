use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, Handled, Handler};
use crate::command::source::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll};
use crate::command::ProfileScope;
use crate::database::models::{Feature, Process, Raw, Source};
use crate::database::repository::Repository;
use crate::database::SqlValue;
use crate::error::ApiError;
use crate::filter::types::{Constraint, QueryParams};
use crate::validation::{assert_id, assert_ip_address, assert_json_object, assert_name, Validation};

/// Sources together with the rows derived from them
pub struct SourceHandler {
    sources: Arc<dyn Repository<Source>>,
    raw: Arc<dyn Repository<Raw>>,
    features: Arc<dyn Repository<Feature>>,
    processes: Arc<dyn Repository<Process>>,
}

impl SourceHandler {
    pub fn new(
        sources: Arc<dyn Repository<Source>>,
        raw: Arc<dyn Repository<Raw>>,
        features: Arc<dyn Repository<Feature>>,
        processes: Arc<dyn Repository<Process>>,
    ) -> Self {
        Self {
            sources,
            raw,
            features,
            processes,
        }
    }

    async fn owned(&self, scope: &ProfileScope, source_id: i64) -> Result<Source, ApiError> {
        let source = self
            .sources
            .find(source_id)
            .await
            .map_err(not_found("Source not found"))?;
        ensure_owned(source.user_id == scope.user_id, "Source not found")?;
        Ok(source)
    }

    async fn purge_derived(&self, ids: Vec<SqlValue>) -> Result<(), ApiError> {
        self.raw
            .delete_by(vec![Constraint::any_of("source_id", ids.clone())])
            .await
            .map_err(delete_failed("source"))?;
        self.features
            .delete_by(vec![Constraint::any_of("source_id", ids.clone())])
            .await
            .map_err(delete_failed("source"))?;

        // Processes outlive their source
        let detached = self
            .processes
            .find_by(vec![Constraint::any_of("source_id", ids)], &QueryParams::new())
            .await?;
        for mut process in detached {
            process.source_id = None;
            self.processes.save(process).await.map_err(delete_failed("source"))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Handler<ListAll> for SourceHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Source>>, ApiError> {
        let sources = self
            .sources
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(sources))
    }
}

#[async_trait]
impl Handler<GetOne> for SourceHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Source>, ApiError> {
        Validation::new().check("sourceId", assert_id(command.source_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.source_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for SourceHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Source>, ApiError> {
        let tags = match command.tags {
            Value::Null => json!({}),
            tags => tags,
        };
        let mut validation = Validation::new();
        validation
            .check("name", assert_name(&command.name))
            .check("tags", assert_json_object(&tags));
        if let Some(ipaddr) = &command.ipaddr {
            validation.check("ipaddr", assert_ip_address(ipaddr));
        }
        validation.finish()?;

        let source = Source::new(command.scope.user_id, command.name, tags, command.ipaddr);
        let source = self.sources.save(source).await.map_err(create_failed("source"))?;

        let event = profile_event("source", "created", &source, &command.scope, &command.identity);
        Ok(Handled::with_event(source, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for SourceHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("sourceId", assert_id(command.source_id)).finish()?;
        let source = self.owned(&command.scope, command.source_id).await?;

        self.purge_derived(vec![command.source_id.into()]).await?;
        let deleted = self
            .sources
            .delete(command.source_id)
            .await
            .map_err(delete_failed("source"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Source not found"));
        }

        let event = profile_event("source", "deleted", &source, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for SourceHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Source>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let ids: Vec<SqlValue> = self
            .sources
            .find_by(constraints, &QueryParams::new())
            .await?
            .into_iter()
            .filter_map(|source| source.id.map(SqlValue::from))
            .collect();
        if ids.is_empty() {
            return Ok(Handled::new(0));
        }

        self.purge_derived(ids.clone()).await?;
        let deleted = self
            .sources
            .delete_by(vec![Constraint::any_of("id", ids)])
            .await
            .map_err(delete_failed("sources"))?;

        let event = deleted_multi("source", deleted, &command.identity)
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

    fn scope() -> ProfileScope {
        ProfileScope::new(
            CredentialScope {
                company_id: 1,
                credential_id: 10,
                creator_id: None,
            },
            100,
            "alice",
        )
    }

    fn create(ipaddr: Option<&str>) -> CreateNew {
        CreateNew {
            scope: scope(),
            identity: Identity::default(),
            name: "facebook".to_string(),
            tags: Value::Null,
            ipaddr: ipaddr.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn missing_tags_default_to_an_empty_object() {
        let handler = SourceHandler::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
        );
        let handled = handler.handle(create(Some("10.0.0.1"))).await.unwrap();
        assert_eq!(handled.result.tags, json!({}));
        assert_eq!(handled.events[0].name, "idos:source.created");
    }

    #[tokio::test]
    async fn bad_ip_addresses_are_rejected() {
        let handler = SourceHandler::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
        );
        let err = handler.handle(create(Some("300.1.1.1"))).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn deleting_a_source_drops_its_raw_data() {
        let sources = Arc::new(InMemoryRepository::<Source>::new());
        let raw = Arc::new(InMemoryRepository::<Raw>::new());
        let features = Arc::new(InMemoryRepository::<Feature>::new());
        let processes = Arc::new(InMemoryRepository::<Process>::new());
        let handler = SourceHandler::new(sources.clone(), raw.clone(), features.clone(), processes.clone());

        let source = handler.handle(create(None)).await.unwrap().result;
        let source_id = source.id.unwrap();
        raw.save(Raw::new(source_id, "likes", json!([1, 2]))).await.unwrap();
        let mut scrape = Process::new(100, "scrape", "idos:source.created");
        scrape.source_id = Some(source_id);
        let scrape = processes.save(scrape).await.unwrap();
        let mut derived = Feature::new(100, "Friends", json!(12));
        derived.source_id = Some(source_id);
        features.save(derived).await.unwrap();
        features.save(Feature::new(100, "Age", json!(30))).await.unwrap();

        handler
            .handle(DeleteOne {
                scope: scope(),
                identity: Identity::default(),
                source_id,
            })
            .await
            .unwrap();

        assert_eq!(sources.len(), 0);
        assert_eq!(raw.len(), 0);
        assert_eq!(features.len(), 1);
        assert_eq!(processes.find(scrape.id.unwrap()).await.unwrap().source_id, None);
    }
}
