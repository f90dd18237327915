use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::{Event, Listener, ListenerError};
use crate::cache::Cache;
use crate::config::config;
use crate::database::models::Service;
use crate::database::repository::Repository;
use crate::filter::types::{Constraint, QueryParams};
use crate::queue::JobQueue;

/// Structured record of every event
pub struct LogListener;

#[async_trait]
impl Listener for LogListener {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn handle(&self, event: &Event) -> Result<Vec<Event>, ListenerError> {
        tracing::info!(
            event = %event.name,
            identity = %event.identity,
            company_id = ?event.company_id,
            "Event"
        );
        Ok(vec![])
    }
}

pub struct DeleteCacheListener {
    cache: Arc<dyn Cache>,
}

impl DeleteCacheListener {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Listener for DeleteCacheListener {
    fn name(&self) -> &'static str {
        "delete_cache"
    }

    fn listens_to(&self, event: &Event) -> bool {
        event.delete_cache_key.is_some() || event.delete_cache_tag.is_some()
    }

    async fn handle(&self, event: &Event) -> Result<Vec<Event>, ListenerError> {
        if let Some(key) = &event.delete_cache_key {
            self.cache.delete(key).await?;
        }
        if let Some(tag) = &event.delete_cache_tag {
            self.cache.clean_tag(tag).await?;
        }
        Ok(vec![])
    }
}

/// Forwards queueable events to the company's enabled services listening for them
pub struct ServiceQueueListener {
    services: Arc<dyn Repository<Service>>,
    queue: Arc<dyn JobQueue>,
    function: String,
}

impl ServiceQueueListener {
    pub fn new(services: Arc<dyn Repository<Service>>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            services,
            queue,
            function: config().queue.function.clone(),
        }
    }

    /// Enqueue one job per listening service. The flag is true only when every push
    /// succeeded; follow-ups report each outcome.
    pub async fn queue_listening_services(&self, event: &Event) -> Result<(bool, Vec<Event>), ListenerError> {
        let (Some(company_id), Some(handler)) = (event.company_id, &event.handler_payload) else {
            return Ok((false, vec![]));
        };

        let services: Vec<Service> = self
            .services
            .find_by(
                vec![Constraint::eq("company_id", company_id), Constraint::eq("enabled", true)],
                &QueryParams::new(),
            )
            .await?
            .into_iter()
            .filter(|service| service.listens_to(&event.name))
            .collect();

        if services.is_empty() {
            return Ok((false, vec![Event::manager("unhandled", event)]));
        }

        let mut success = true;
        let mut follow_ups = Vec::with_capacity(services.len());
        for service in services {
            let payload = json!({
                "name": service.name,
                "user": service.auth_username,
                "pass": service.auth_password.get(),
                "url": service.url,
                "handler": handler,
            });

            match self.queue.push(&self.function, &payload).await {
                Ok(()) => follow_ups.push(Event::manager("work_queued", event)),
                Err(err) => {
                    tracing::warn!(service = %service.name, event = %event.name, "Failed to queue job: {}", err);
                    success = false;
                    follow_ups.push(Event::manager("unhandled", event));
                }
            }
        }
        Ok((success, follow_ups))
    }
}

#[async_trait]
impl Listener for ServiceQueueListener {
    fn name(&self) -> &'static str {
        "service_queue"
    }

    fn listens_to(&self, event: &Event) -> bool {
        event.is_queueable()
    }

    async fn handle(&self, event: &Event) -> Result<Vec<Event>, ListenerError> {
        let (success, follow_ups) = self.queue_listening_services(event).await?;
        if !success {
            tracing::debug!(event = %event.name, "Event not fully handled by services");
        }
        Ok(follow_ups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::testing::{InMemoryRepository, RecordingCache, RecordingQueue};

    fn service(company_id: i64, name: &str, listens: &[&str]) -> Service {
        let mut service = Service::new(company_id, name, format!("https://{}.example.com", name));
        service.auth_username = "worker".to_string();
        service.listens = listens.iter().map(|s| s.to_string()).collect();
        service
    }

    async fn listener(services: Vec<Service>, queue: Arc<RecordingQueue>) -> ServiceQueueListener {
        let repository = Arc::new(InMemoryRepository::<Service>::new());
        for service in services {
            repository.save(service).await.unwrap();
        }
        ServiceQueueListener::new(repository, queue)
    }

    fn feature_created() -> Event {
        Event::new("feature", "created", json!({"name": "age"}), Identity::Credential("pub".into()))
            .queued_for(1, "alice")
    }

    #[tokio::test]
    async fn no_listening_service_is_unhandled() {
        let queue = Arc::new(RecordingQueue::default());
        let listener = listener(vec![service(1, "scores", &["idos:source.created"])], queue.clone()).await;

        let (success, follow_ups) = listener.queue_listening_services(&feature_created()).await.unwrap();
        assert!(!success);
        assert_eq!(follow_ups.len(), 1);
        assert_eq!(follow_ups[0].name, "idos:manager.unhandled");
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn listening_services_get_one_job_each() {
        let queue = Arc::new(RecordingQueue::default());
        let listener = listener(
            vec![
                service(1, "scores", &["idos:feature.created"]),
                service(1, "fraud", &["idos:feature.created", "idos:source.created"]),
                service(2, "other-company", &["idos:feature.created"]),
            ],
            queue.clone(),
        )
        .await;

        let (success, follow_ups) = listener.queue_listening_services(&feature_created()).await.unwrap();
        assert!(success);
        assert_eq!(follow_ups.len(), 2);
        assert!(follow_ups.iter().all(|e| e.name == "idos:manager.work_queued"));

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].0, "manager");
        assert_eq!(jobs[0].1["name"], "scores");
        assert_eq!(jobs[0].1["user"], "worker");
        assert_eq!(jobs[0].1["handler"]["event"], "idos:feature.created");
        assert_eq!(jobs[0].1["handler"]["user"], "alice");
    }

    #[tokio::test]
    async fn one_failed_push_does_not_abort_the_rest() {
        let queue = Arc::new(RecordingQueue::failing_on("scores"));
        let listener = listener(
            vec![
                service(1, "scores", &["idos:feature.created"]),
                service(1, "fraud", &["idos:feature.created"]),
            ],
            queue.clone(),
        )
        .await;

        let (success, follow_ups) = listener.queue_listening_services(&feature_created()).await.unwrap();
        assert!(!success);
        let names: Vec<&str> = follow_ups.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["idos:manager.unhandled", "idos:manager.work_queued"]);
        assert_eq!(queue.jobs().len(), 1);
    }

    #[tokio::test]
    async fn disabled_services_are_skipped() {
        let queue = Arc::new(RecordingQueue::default());
        let mut disabled = service(1, "scores", &["idos:feature.created"]);
        disabled.enabled = false;
        let listener = listener(vec![disabled], queue.clone()).await;

        let (success, _) = listener.queue_listening_services(&feature_created()).await.unwrap();
        assert!(!success);
        assert!(queue.jobs().is_empty());
    }

    #[tokio::test]
    async fn cache_entries_are_purged() {
        let cache = Arc::new(RecordingCache::default());
        let listener = DeleteCacheListener::new(cache.clone());
        let event = Event::new("setting", "updated", json!({}), Identity::default())
            .purging_key("settings:1")
            .purging_tag("company:1");

        assert!(listener.listens_to(&event));
        listener.handle(&event).await.unwrap();
        assert_eq!(cache.deleted(), vec!["settings:1".to_string()]);
        assert_eq!(cache.cleaned(), vec!["company:1".to_string()]);

        assert!(!listener.listens_to(&feature_created()));
    }
}
