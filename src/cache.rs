//! Response cache with tag based invalidation.
//!
//! A tag is a Redis set holding the keys stored under it; cleaning a tag deletes every
//! member and then the set.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use thiserror::Error;

use crate::config::CacheConfig;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` and register `key` under every tag
    async fn put(&self, key: &str, value: &str, tags: &[&str]) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key stored under `tag`, returning how many were removed
    async fn clean_tag(&self, tag: &str) -> Result<u64, CacheError>;
}

#[derive(Clone)]
pub struct RedisCache {
    client: Client,
    prefix: String,
    ttl: Duration,
}

impl RedisCache {
    pub fn new(url: &str, settings: &CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        tracing::info!("Redis cache client created");
        Ok(Self {
            client,
            prefix: settings.prefix.clone(),
            ttl: Duration::from_secs(settings.ttl_secs),
        })
    }

    async fn conn(&self) -> Result<MultiplexedConnection, CacheError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn tag(&self, tag: &str) -> String {
        format!("{}:tag:{}", self.prefix, tag)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        Ok(conn.get(self.key(key)).await?)
    }

    async fn put(&self, key: &str, value: &str, tags: &[&str]) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let full_key = self.key(key);
        let _: () = conn.set_ex(&full_key, value, self.ttl.as_secs()).await?;
        for tag in tags {
            let _: () = conn.sadd(self.tag(tag), &full_key).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: () = conn.del(self.key(key)).await?;
        Ok(())
    }

    async fn clean_tag(&self, tag: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn().await?;
        let tag_key = self.tag(tag);
        let members: Vec<String> = conn.smembers(&tag_key).await?;
        let removed: u64 = if members.is_empty() { 0 } else { conn.del(members).await? };
        let _: () = conn.del(&tag_key).await?;
        tracing::debug!(tag, removed, "Cleaned cache tag");
        Ok(removed)
    }
}

/// Used when no cache server is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &str, _tags: &[&str]) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn clean_tag(&self, _tag: &str) -> Result<u64, CacheError> {
        Ok(0)
    }
}
