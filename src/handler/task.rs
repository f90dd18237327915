use async_trait::async_trait;
use std::sync::Arc;

use super::{create_failed, delete_failed, ensure_owned, filtered, not_found, profile_event, update_failed, Handled, Handler};
use crate::command::task::{CreateNew, DeleteOne, GetOne, ListAll, UpdateOne};
use crate::command::ProfileScope;
use crate::database::models::{Process, Task};
use crate::database::repository::{Page, Repository};
use crate::error::ApiError;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, assert_name, assert_trigger_name, Validation};
use crate::vault::Secure;

/// Tasks are reached through their process, which must belong to the profile
pub struct TaskHandler {
    tasks: Arc<dyn Repository<Task>>,
    processes: Arc<dyn Repository<Process>>,
}

impl TaskHandler {
    pub fn new(tasks: Arc<dyn Repository<Task>>, processes: Arc<dyn Repository<Process>>) -> Self {
        Self { tasks, processes }
    }

    async fn check_process(&self, scope: &ProfileScope, process_id: i64) -> Result<(), ApiError> {
        let process = self
            .processes
            .find(process_id)
            .await
            .map_err(not_found("Process not found"))?;
        ensure_owned(process.user_id == scope.user_id, "Process not found")
    }

    async fn owned(&self, scope: &ProfileScope, process_id: i64, task_id: i64) -> Result<Task, ApiError> {
        self.check_process(scope, process_id).await?;
        let task = self.tasks.find(task_id).await.map_err(not_found("Task not found"))?;
        ensure_owned(task.process_id == process_id, "Task not found")?;
        Ok(task)
    }
}

fn check_ids(process_id: i64, task_id: i64) -> Result<(), ApiError> {
    Validation::new()
        .check("processId", assert_id(process_id))
        .check("taskId", assert_id(task_id))
        .finish()
}

#[async_trait]
impl Handler<ListAll> for TaskHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Page<Task>>, ApiError> {
        Validation::new().check("processId", assert_id(command.process_id)).finish()?;
        self.check_process(&command.scope, command.process_id).await?;

        let constraints = filtered::<Task>(vec![Constraint::eq("process_id", command.process_id)], &command.query);
        let page = self
            .tasks
            .paginate(constraints, command.page, command.per_page)
            .await?;
        Ok(Handled::new(page))
    }
}

#[async_trait]
impl Handler<GetOne> for TaskHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Task>, ApiError> {
        check_ids(command.process_id, command.task_id)?;
        Ok(Handled::new(
            self.owned(&command.scope, command.process_id, command.task_id).await?,
        ))
    }
}

#[async_trait]
impl Handler<CreateNew> for TaskHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Task>, ApiError> {
        Validation::new()
            .check("processId", assert_id(command.process_id))
            .check("name", assert_name(&command.name))
            .check("event", assert_trigger_name(&command.event))
            .finish()?;
        self.check_process(&command.scope, command.process_id).await?;

        let mut task = Task::new(command.process_id, command.name, command.event);
        task.running = command.running;
        task.success = command.success;
        task.message = command.message.map(Secure::new);
        let task = self.tasks.save(task).await.map_err(create_failed("task"))?;

        let event = profile_event("task", "created", &task, &command.scope, &command.identity);
        Ok(Handled::with_event(task, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for TaskHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Task>, ApiError> {
        check_ids(command.process_id, command.task_id)?;

        let mut task = self.owned(&command.scope, command.process_id, command.task_id).await?;
        if let Some(running) = command.running {
            task.running = running;
        }
        if command.success.is_some() {
            task.success = command.success;
        }
        if let Some(message) = command.message {
            task.message = Some(Secure::new(message));
        }
        let task = self.tasks.save(task).await.map_err(update_failed("task"))?;

        let event = profile_event("task", "updated", &task, &command.scope, &command.identity);
        Ok(Handled::with_event(task, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for TaskHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        check_ids(command.process_id, command.task_id)?;
        let task = self.owned(&command.scope, command.process_id, command.task_id).await?;

        let deleted = self.tasks.delete(command.task_id).await.map_err(delete_failed("task"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Task not found"));
        }

        let event = profile_event("task", "deleted", &task, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}
