use async_trait::async_trait;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, Handled, Handler,
};
use crate::command::process::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll};
use crate::command::ProfileScope;
use crate::database::models::{Process, Source, Task};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::types::{Constraint, QueryParams};
use crate::validation::{assert_id, assert_name, assert_trigger_name, Validation};

pub struct ProcessHandler {
    processes: Arc<dyn Repository<Process>>,
    tasks: Arc<dyn Repository<Task>>,
    sources: Arc<dyn Repository<Source>>,
}

impl ProcessHandler {
    pub fn new(
        processes: Arc<dyn Repository<Process>>,
        tasks: Arc<dyn Repository<Task>>,
        sources: Arc<dyn Repository<Source>>,
    ) -> Self {
        Self {
            processes,
            tasks,
            sources,
        }
    }

    async fn owned(&self, scope: &ProfileScope, process_id: i64) -> Result<Process, ApiError> {
        let process = self
            .processes
            .find(process_id)
            .await
            .map_err(not_found("Process not found"))?;
        ensure_owned(process.user_id == scope.user_id, "Process not found")?;
        Ok(process)
    }

    async fn drop_tasks(&self, process_id: i64) -> Result<u64, ApiError> {
        self.tasks
            .delete_by(vec![Constraint::eq("process_id", process_id)])
            .await
            .map_err(delete_failed("process"))
    }
}

#[async_trait]
impl Handler<ListAll> for ProcessHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Process>>, ApiError> {
        let processes = self
            .processes
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(processes))
    }
}

#[async_trait]
impl Handler<GetOne> for ProcessHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Process>, ApiError> {
        Validation::new().check("processId", assert_id(command.process_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.process_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for ProcessHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Process>, ApiError> {
        let mut validation = Validation::new();
        validation
            .check("name", assert_name(&command.name))
            .check("event", assert_trigger_name(&command.event));
        if let Some(source_id) = command.source_id {
            validation.check("source_id", assert_id(source_id));
        }
        validation.finish()?;

        if let Some(source_id) = command.source_id {
            let source = self
                .sources
                .find(source_id)
                .await
                .map_err(not_found("Source not found"))?;
            ensure_owned(source.user_id == command.scope.user_id, "Source not found")?;
        }

        let mut process = Process::new(command.scope.user_id, command.name, command.event);
        process.source_id = command.source_id;
        let process = self.processes.save(process).await.map_err(create_failed("process"))?;

        let event = profile_event("process", "created", &process, &command.scope, &command.identity);
        Ok(Handled::with_event(process, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for ProcessHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("processId", assert_id(command.process_id)).finish()?;
        let process = self.owned(&command.scope, command.process_id).await?;

        self.drop_tasks(command.process_id).await?;
        let deleted = self
            .processes
            .delete(command.process_id)
            .await
            .map_err(delete_failed("process"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Process not found"));
        }

        let event = profile_event("process", "deleted", &process, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for ProcessHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Process>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let doomed = self.processes.find_by(constraints.clone(), &QueryParams::new()).await?;
        for id in doomed.iter().filter_map(|process| process.id) {
            self.drop_tasks(id).await?;
        }
        let deleted = self
            .processes
            .delete_by(constraints)
            .await
            .map_err(delete_failed("processes"))?;

        let event = deleted_multi("process", deleted, &command.identity)
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
    use serde_json::json;

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
        handler: ProcessHandler,
        processes: Arc<InMemoryRepository<Process>>,
        tasks: Arc<InMemoryRepository<Task>>,
        sources: Arc<InMemoryRepository<Source>>,
    }

    fn fixture() -> Fixture {
        let processes = Arc::new(InMemoryRepository::<Process>::new());
        let tasks = Arc::new(InMemoryRepository::<Task>::new());
        let sources = Arc::new(InMemoryRepository::<Source>::new());
        Fixture {
            handler: ProcessHandler::new(processes.clone(), tasks.clone(), sources.clone()),
            processes,
            tasks,
            sources,
        }
    }

    fn create(source_id: Option<i64>) -> CreateNew {
        CreateNew {
            scope: scope(100),
            identity: Identity::default(),
            name: "scrape".to_string(),
            event: "idos:source.created".to_string(),
            source_id,
        }
    }

    #[tokio::test]
    async fn create_checks_the_source_owner() {
        let f = fixture();
        let mine = f.sources.save(Source::new(100, "facebook", json!({}), None)).await.unwrap();
        let theirs = f.sources.save(Source::new(200, "twitter", json!({}), None)).await.unwrap();

        let handled = f.handler.handle(create(mine.id)).await.unwrap();
        assert_eq!(handled.result.source_id, mine.id);
        assert_eq!(handled.events[0].name, "idos:process.created");

        let err = f.handler.handle(create(theirs.id)).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(f.processes.len(), 1);
    }

    #[tokio::test]
    async fn events_must_be_trigger_names() {
        let f = fixture();
        let mut command = create(None);
        command.event = "not an event".to_string();
        let err = f.handler.handle(command).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn delete_takes_the_tasks_along() {
        let f = fixture();
        let process = f.handler.handle(create(None)).await.unwrap().result;
        let process_id = process.id.unwrap();
        f.tasks.save(Task::new(process_id, "fetch", "idos:source.created")).await.unwrap();
        f.tasks.save(Task::new(process_id + 1, "fetch", "idos:source.created")).await.unwrap();

        f.handler
            .handle(DeleteOne {
                scope: scope(100),
                identity: Identity::default(),
                process_id,
            })
            .await
            .unwrap();
        assert!(f.processes.is_empty());
        assert_eq!(f.tasks.len(), 1);
    }
}
