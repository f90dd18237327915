use async_trait::async_trait;

use super::{create_failed, delete_failed, deleted_multi, filtered, not_found, Handled, Handler};
use crate::command::permission::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll};
use crate::database::cached::{permission_key, permissions_tag, CachedPermissions};
use crate::database::models::Permission;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::Constraint;
use crate::validation::{assert_route_name, Validation};

/// Route grants of a company; single lookups go through the permission cache
pub struct PermissionHandler {
    permissions: CachedPermissions,
}

impl PermissionHandler {
    pub fn new(permissions: CachedPermissions) -> Self {
        Self { permissions }
    }
}

fn check_route(route_name: &str) -> Result<(), ApiError> {
    Validation::new().check("routeName", assert_route_name(route_name)).finish()
}

#[async_trait]
impl Handler<ListAll> for PermissionHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Permission>>, ApiError> {
        let permissions = self
            .permissions
            .repository()
            .find_by(vec![Constraint::eq("company_id", command.scope.company_id)], &command.query)
            .await?;
        Ok(Handled::new(permissions))
    }
}

#[async_trait]
impl Handler<GetOne> for PermissionHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Permission>, ApiError> {
        check_route(&command.route_name)?;
        let permission = self
            .permissions
            .find_one(command.scope.company_id, &command.route_name)
            .await
            .map_err(not_found("Permission not found"))?;
        Ok(Handled::new(permission))
    }
}

#[async_trait]
impl Handler<CreateNew> for PermissionHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Permission>, ApiError> {
        check_route(&command.route_name)?;
        let company_id = command.scope.company_id;

        let existing = self
            .permissions
            .repository()
            .count_by(vec![
                Constraint::eq("company_id", company_id),
                Constraint::eq("route_name", command.route_name.as_str()),
            ])
            .await?;
        if existing > 0 {
            return Err(ApiError::create(
                "Error while trying to create a new permission",
                format!("{} is already granted", command.route_name),
            ));
        }

        let permission = self
            .permissions
            .repository()
            .save(Permission::new(company_id, command.route_name))
            .await
            .map_err(create_failed("permission"))?;

        let event = Event::about("permission", "created", &permission, &command.identity)
            .for_company(company_id)
            .purging_key(permission_key(company_id, &permission.route_name));
        Ok(Handled::with_event(permission, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for PermissionHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        check_route(&command.route_name)?;
        let company_id = command.scope.company_id;

        let deleted = self
            .permissions
            .repository()
            .delete_by(vec![
                Constraint::eq("company_id", company_id),
                Constraint::eq("route_name", command.route_name.as_str()),
            ])
            .await
            .map_err(delete_failed("permission"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Permission not found"));
        }

        let event = Event::new(
            "permission",
            "deleted",
            serde_json::json!({ "routeName": command.route_name }),
            command.identity.clone(),
        )
        .for_company(company_id)
        .purging_key(permission_key(company_id, &command.route_name));
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for PermissionHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let company_id = command.scope.company_id;
        let constraints = filtered::<Permission>(vec![Constraint::eq("company_id", company_id)], &command.query);
        let deleted = self
            .permissions
            .repository()
            .delete_by(constraints)
            .await
            .map_err(delete_failed("permissions"))?;

        let event = deleted_multi("permission", deleted, &command.identity)
            .map(|e| e.for_company(company_id).purging_tag(permissions_tag(company_id)));
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::cache::Cache;
    use crate::command::CompanyScope;
    use crate::database::repository::Repository;
    use crate::event::listeners::DeleteCacheListener;
    use crate::event::Listener;
    use crate::filter::types::QueryParams;
    use crate::testing::{InMemoryRepository, RecordingCache};
    use std::sync::Arc;

    fn scope(company_id: i64) -> CompanyScope {
        CompanyScope {
            company_id,
            identity_id: None,
        }
    }

    struct Fixture {
        handler: PermissionHandler,
        permissions: Arc<InMemoryRepository<Permission>>,
        cache: Arc<RecordingCache>,
    }

    fn fixture() -> Fixture {
        let permissions = Arc::new(InMemoryRepository::<Permission>::new());
        let cache = Arc::new(RecordingCache::default());
        Fixture {
            handler: PermissionHandler::new(CachedPermissions::new(permissions.clone(), cache.clone())),
            permissions,
            cache,
        }
    }

    fn create(company_id: i64, route_name: &str) -> CreateNew {
        CreateNew {
            scope: scope(company_id),
            identity: Identity::default(),
            route_name: route_name.to_string(),
        }
    }

    fn get(company_id: i64, route_name: &str) -> GetOne {
        GetOne {
            scope: scope(company_id),
            identity: Identity::default(),
            route_name: route_name.to_string(),
        }
    }

    #[tokio::test]
    async fn grants_are_unique_per_company() {
        let f = fixture();
        let handled = f.handler.handle(create(1, "gate:createNew")).await.unwrap();
        assert_eq!(handled.events[0].name, "idos:permission.created");
        assert_eq!(handled.events[0].delete_cache_key.as_deref(), Some("permission:1:gate:createNew"));

        let err = f.handler.handle(create(1, "gate:createNew")).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        f.handler.handle(create(2, "gate:createNew")).await.unwrap();
        assert_eq!(f.permissions.len(), 2);
    }

    #[tokio::test]
    async fn route_names_are_validated() {
        let f = fixture();
        let err = f.handler.handle(create(1, "no route")).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(f.permissions.is_empty());
    }

    #[tokio::test]
    async fn lookups_fill_the_cache_and_deletes_purge_it() {
        let f = fixture();
        f.handler.handle(create(1, "review:listAll")).await.unwrap();

        let found = f.handler.handle(get(1, "review:listAll")).await.unwrap().result;
        assert_eq!(found.route_name, "review:listAll");
        assert!(f.cache.stored("permission:1:review:listAll").is_some());

        let err = f.handler.handle(get(2, "review:listAll")).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "Permission not found");

        let handled = f
            .handler
            .handle(DeleteOne {
                scope: scope(1),
                identity: Identity::default(),
                route_name: "review:listAll".to_string(),
            })
            .await
            .unwrap();
        let listener = DeleteCacheListener::new(f.cache.clone());
        listener.handle(&handled.events[0]).await.unwrap();
        assert!(f.cache.stored("permission:1:review:listAll").is_none());

        let err = f.handler.handle(get(1, "review:listAll")).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn delete_all_purges_the_company_tag() {
        let f = fixture();
        for route in ["gate:listAll", "gate:getOne"] {
            f.handler.handle(create(1, route)).await.unwrap();
            f.handler.handle(get(1, route)).await.unwrap();
        }
        f.permissions.save(Permission::new(2, "gate:listAll")).await.unwrap();

        let handled = f
            .handler
            .handle(DeleteAll {
                scope: scope(1),
                identity: Identity::default(),
                query: QueryParams::new(),
            })
            .await
            .unwrap();
        assert_eq!(handled.result, 2);
        assert_eq!(handled.events[0].delete_cache_tag.as_deref(), Some("permissions:1"));
        assert_eq!(f.permissions.len(), 1);

        f.cache.clean_tag("permissions:1").await.unwrap();
        assert!(f.cache.stored("permission:1:gate:getOne").is_none());
    }
}
