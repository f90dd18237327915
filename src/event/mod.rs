//! Domain events and their synchronous dispatch to listeners.
//!
//! Handlers return events; after a successful command the bus hands them to the
//! [`EventDispatcher`]. Listener failures and timeouts are logged and never reach the
//! caller. Follow-up events returned by listeners are dispatched again up to
//! `events.max_dispatch_depth` levels deep.

pub mod listeners;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;

use crate::auth::Identity;
use crate::cache::CacheError;
use crate::config::config;
use crate::database::manager::DatabaseError;
use crate::queue::QueueError;

pub use listeners::{DeleteCacheListener, LogListener, ServiceQueueListener};

pub const PREFIX: &str = "idos";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// `idos:<resource>.<action>`
    pub name: String,
    /// Company whose services may be notified
    pub company_id: Option<i64>,
    pub identity: Identity,
    pub payload: Value,
    pub delete_cache_key: Option<String>,
    pub delete_cache_tag: Option<String>,
    /// Present on events forwarded to listening services
    pub handler_payload: Option<Value>,
}

impl Event {
    pub fn new(resource: &str, action: &str, payload: Value, identity: Identity) -> Self {
        Self {
            name: format!("{}:{}.{}", PREFIX, resource, action),
            company_id: None,
            identity,
            payload,
            delete_cache_key: None,
            delete_cache_tag: None,
            handler_payload: None,
        }
    }

    /// Event carrying a serialized entity
    pub fn about<T: Serialize>(resource: &str, action: &str, entity: &T, identity: &Identity) -> Self {
        let payload = serde_json::to_value(entity).unwrap_or(Value::Null);
        Self::new(resource, action, payload, identity.clone())
    }

    pub fn for_company(mut self, company_id: i64) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn purging_key(mut self, key: impl Into<String>) -> Self {
        self.delete_cache_key = Some(key.into());
        self
    }

    pub fn purging_tag(mut self, tag: impl Into<String>) -> Self {
        self.delete_cache_tag = Some(tag.into());
        self
    }

    /// Mark the event for service fan-out. `user` is the profile the event is about.
    pub fn queued_for(mut self, company_id: i64, user: &str) -> Self {
        self.company_id = Some(company_id);
        self.handler_payload = Some(json!({
            "event": self.name,
            "user": user,
            "data": self.payload,
        }));
        self
    }

    pub fn is_queueable(&self) -> bool {
        self.handler_payload.is_some() && self.company_id.is_some()
    }

    /// Follow-up event produced by the service manager fan-out
    pub fn manager(action: &str, origin: &Event) -> Self {
        let mut event = Self::new(
            "manager",
            action,
            json!({ "event": origin.name }),
            origin.identity.clone(),
        );
        event.company_id = origin.company_id;
        event
    }
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[async_trait]
pub trait Listener: Send + Sync {
    fn name(&self) -> &'static str;

    fn listens_to(&self, _event: &Event) -> bool {
        true
    }

    /// Returns follow-up events
    async fn handle(&self, event: &Event) -> Result<Vec<Event>, ListenerError>;
}

pub struct EventDispatcher {
    listeners: Vec<Arc<dyn Listener>>,
    listener_timeout: Duration,
    max_depth: usize,
}

impl EventDispatcher {
    pub fn new() -> Self {
        let settings = &config().events;
        Self {
            listeners: Vec::new(),
            listener_timeout: Duration::from_millis(settings.listener_timeout_ms),
            max_depth: settings.max_dispatch_depth,
        }
    }

    pub fn with_limits(listener_timeout: Duration, max_depth: usize) -> Self {
        Self {
            listeners: Vec::new(),
            listener_timeout,
            max_depth,
        }
    }

    pub fn register(&mut self, listener: Arc<dyn Listener>) {
        tracing::debug!("Registered listener '{}'", listener.name());
        self.listeners.push(listener);
    }

    pub fn listener_names(&self) -> Vec<&'static str> {
        self.listeners.iter().map(|l| l.name()).collect()
    }

    /// Run every listener for every event, breadth first through follow-ups
    pub async fn dispatch(&self, events: Vec<Event>) {
        let mut pending = events;
        let mut depth = 0;

        while !pending.is_empty() {
            if depth >= self.max_depth {
                tracing::warn!(
                    dropped = pending.len(),
                    max_depth = self.max_depth,
                    "Event dispatch depth exceeded"
                );
                break;
            }

            let mut follow_ups = Vec::new();
            for event in &pending {
                follow_ups.extend(self.dispatch_one(event).await);
            }
            pending = follow_ups;
            depth += 1;
        }
    }

    async fn dispatch_one(&self, event: &Event) -> Vec<Event> {
        let mut follow_ups = Vec::new();
        for listener in self.listeners.iter().filter(|l| l.listens_to(event)) {
            let started = Instant::now();
            match timeout(self.listener_timeout, listener.handle(event)).await {
                Ok(Ok(events)) => {
                    tracing::trace!(
                        listener = listener.name(),
                        event = %event.name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Listener finished"
                    );
                    follow_ups.extend(events);
                }
                Ok(Err(err)) => {
                    tracing::error!(listener = listener.name(), event = %event.name, "Listener failed: {}", err);
                }
                Err(_) => {
                    tracing::error!(
                        listener = listener.name(),
                        event = %event.name,
                        timeout_ms = self.listener_timeout.as_millis() as u64,
                        "Listener timed out"
                    );
                }
            }
        }
        follow_ups
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Listener for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn handle(&self, event: &Event) -> Result<Vec<Event>, ListenerError> {
            self.seen.lock().unwrap().push(event.name.clone());
            Ok(vec![])
        }
    }

    /// Answers every event with a follow-up, forever
    struct Echo;

    #[async_trait]
    impl Listener for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn handle(&self, event: &Event) -> Result<Vec<Event>, ListenerError> {
            Ok(vec![Event::manager("unhandled", event)])
        }
    }

    struct Slow;

    #[async_trait]
    impl Listener for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn handle(&self, _event: &Event) -> Result<Vec<Event>, ListenerError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
    }

    fn created() -> Event {
        Event::new("hook", "created", json!({"url": "https://example.com"}), Identity::default())
    }

    #[test]
    fn event_names() {
        assert_eq!(created().name, "idos:hook.created");
        assert_eq!(Event::manager("work_queued", &created()).name, "idos:manager.work_queued");
        assert!(!created().is_queueable());
        assert!(created().queued_for(1, "alice").is_queueable());
    }

    #[tokio::test]
    async fn follow_ups_are_bounded_by_depth() {
        let recorder = Arc::new(Recorder::default());
        let mut dispatcher = EventDispatcher::with_limits(Duration::from_secs(1), 3);
        dispatcher.register(recorder.clone());
        dispatcher.register(Arc::new(Echo));

        dispatcher.dispatch(vec![created()]).await;

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["idos:hook.created", "idos:manager.unhandled", "idos:manager.unhandled"]);
    }

    #[tokio::test]
    async fn slow_listeners_do_not_block_others() {
        let recorder = Arc::new(Recorder::default());
        let mut dispatcher = EventDispatcher::with_limits(Duration::from_millis(20), 3);
        dispatcher.register(Arc::new(Slow));
        dispatcher.register(recorder.clone());

        dispatcher.dispatch(vec![created()]).await;

        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
        assert_eq!(dispatcher.listener_names(), vec!["slow", "recorder"]);
    }
}
