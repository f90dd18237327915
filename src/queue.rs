//! Background job queue feeding the service manager.
//!
//! Jobs are JSON documents pushed to a named queue; workers pop them elsewhere. Dispatch is
//! fire and forget: the caller only learns whether the push succeeded.

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No queue backend configured")]
    Unavailable,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn push(&self, function: &str, payload: &Value) -> Result<(), QueueError>;
}

/// Jobs stored on Redis lists named `queue:<function>`
#[derive(Clone)]
pub struct RedisQueue {
    client: Client,
}

impl RedisQueue {
    pub fn new(url: &str) -> Result<Self, QueueError> {
        let client = Client::open(url)?;
        tracing::info!("Redis job queue client created");
        Ok(Self { client })
    }

    pub fn list_name(function: &str) -> String {
        format!("queue:{}", function)
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn push(&self, function: &str, payload: &Value) -> Result<(), QueueError> {
        let body = serde_json::to_string(payload)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.rpush(Self::list_name(function), body).await?;
        tracing::debug!(function, "Job queued");
        Ok(())
    }
}

/// Rejects every job; keeps the API usable without a queue backend
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledQueue;

#[async_trait]
impl JobQueue for DisabledQueue {
    async fn push(&self, function: &str, _payload: &Value) -> Result<(), QueueError> {
        tracing::warn!(function, "Job dropped, no queue backend configured");
        Err(QueueError::Unavailable)
    }
}
