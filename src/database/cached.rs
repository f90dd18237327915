//! Read-through cache for permission lookups.
//!
//! Entries hold the stored row (secure fields sealed) under `permission:<company>:<route>`
//! and are tagged with both `permissions:<company>` and `company:<company>`, so the delete
//! cache listener drops them when a permission changes or the company goes away. Cache
//! failures are logged and the lookup falls through to the repository.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::cache::Cache;
use crate::database::manager::DatabaseError;
use crate::database::models::{Entity, Permission};
use crate::database::repository::Repository;
use crate::filter::types::Constraint;

pub fn permission_key(company_id: i64, route_name: &str) -> String {
    format!("permission:{}:{}", company_id, route_name)
}

pub fn permissions_tag(company_id: i64) -> String {
    format!("permissions:{}", company_id)
}

/// Stored representation of an entity, `id` included, as cached JSON
pub fn stored_row<E: Entity>(entity: &E) -> Result<Value, DatabaseError> {
    let mut row = Map::new();
    row.insert("id".to_string(), entity.id().map(Value::from).unwrap_or(Value::Null));
    for (column, value) in entity.columns()? {
        row.insert(column.to_string(), value.to_json());
    }
    Ok(Value::Object(row))
}

pub struct CachedPermissions {
    permissions: Arc<dyn Repository<Permission>>,
    cache: Arc<dyn Cache>,
}

impl CachedPermissions {
    pub fn new(permissions: Arc<dyn Repository<Permission>>, cache: Arc<dyn Cache>) -> Self {
        Self { permissions, cache }
    }

    pub fn repository(&self) -> &Arc<dyn Repository<Permission>> {
        &self.permissions
    }

    pub async fn find_one(&self, company_id: i64, route_name: &str) -> Result<Permission, DatabaseError> {
        let key = permission_key(company_id, route_name);
        match self.cache.get(&key).await {
            Ok(Some(cached)) => match serde_json::from_str::<Value>(&cached).map(Permission::from_row) {
                Ok(Ok(permission)) => {
                    tracing::trace!(%key, "Permission cache hit");
                    return Ok(permission);
                }
                _ => tracing::warn!(%key, "Discarding unreadable cached permission"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(%key, "Permission cache unavailable: {}", err),
        }

        let permission = self
            .permissions
            .find_one_by(vec![
                Constraint::eq("company_id", company_id),
                Constraint::eq("route_name", route_name),
            ])
            .await?;

        let tags = [permissions_tag(company_id), format!("company:{}", company_id)];
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        let row = stored_row(&permission)?.to_string();
        if let Err(err) = self.cache.put(&key, &row, &tags).await {
            tracing::warn!(%key, "Failed to cache permission: {}", err);
        }
        Ok(permission)
    }
}
