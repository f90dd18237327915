use async_trait::async_trait;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, update_failed,
    Handled, Handler,
};
use crate::command::attribute::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne};
use crate::command::ProfileScope;
use crate::database::models::{Attribute, Score};
use crate::database::repository::Repository;
use crate::database::SqlValue;
use crate::error::ApiError;
use crate::filter::types::{Constraint, QueryParams};
use crate::validation::{assert_id, assert_name, assert_support, assert_value, Validation};
use crate::vault::Secure;

pub struct AttributeHandler {
    attributes: Arc<dyn Repository<Attribute>>,
    scores: Arc<dyn Repository<Score>>,
}

impl AttributeHandler {
    pub fn new(attributes: Arc<dyn Repository<Attribute>>, scores: Arc<dyn Repository<Score>>) -> Self {
        Self { attributes, scores }
    }

    async fn owned(&self, scope: &ProfileScope, attribute_id: i64) -> Result<Attribute, ApiError> {
        let attribute = self
            .attributes
            .find(attribute_id)
            .await
            .map_err(not_found("Attribute not found"))?;
        ensure_owned(attribute.user_id == scope.user_id, "Attribute not found")?;
        Ok(attribute)
    }
}

#[async_trait]
impl Handler<ListAll> for AttributeHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Attribute>>, ApiError> {
        let attributes = self
            .attributes
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(attributes))
    }
}

#[async_trait]
impl Handler<GetOne> for AttributeHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Attribute>, ApiError> {
        Validation::new()
            .check("attributeId", assert_id(command.attribute_id))
            .finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.attribute_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for AttributeHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Attribute>, ApiError> {
        Validation::new()
            .check("name", assert_name(&command.name))
            .check("value", assert_value(&command.value))
            .check("support", assert_support(command.support))
            .finish()?;

        let mut attribute = Attribute::new(command.scope.user_id, command.name, command.value, command.support);
        attribute.creator_id = command.scope.creator_id;
        let attribute = self
            .attributes
            .save(attribute)
            .await
            .map_err(create_failed("attribute"))?;

        let event = profile_event("attribute", "created", &attribute, &command.scope, &command.identity);
        Ok(Handled::with_event(attribute, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for AttributeHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Attribute>, ApiError> {
        let mut validation = Validation::new();
        validation
            .check("attributeId", assert_id(command.attribute_id))
            .check("value", assert_value(&command.value));
        if let Some(support) = command.support {
            validation.check("support", assert_support(support));
        }
        validation.finish()?;

        let mut attribute = self.owned(&command.scope, command.attribute_id).await?;
        attribute.value = Secure::new(command.value);
        if let Some(support) = command.support {
            attribute.support = support;
        }
        let attribute = self
            .attributes
            .save(attribute)
            .await
            .map_err(update_failed("attribute"))?;

        let event = profile_event("attribute", "updated", &attribute, &command.scope, &command.identity);
        Ok(Handled::with_event(attribute, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for AttributeHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new()
            .check("attributeId", assert_id(command.attribute_id))
            .finish()?;
        let attribute = self.owned(&command.scope, command.attribute_id).await?;

        self.scores
            .delete_by(vec![Constraint::eq("attribute_id", command.attribute_id)])
            .await
            .map_err(delete_failed("attribute"))?;
        let deleted = self
            .attributes
            .delete(command.attribute_id)
            .await
            .map_err(delete_failed("attribute"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Attribute not found"));
        }

        let event = profile_event("attribute", "deleted", &attribute, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for AttributeHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Attribute>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let ids: Vec<SqlValue> = self
            .attributes
            .find_by(constraints, &QueryParams::new())
            .await?
            .into_iter()
            .filter_map(|attribute| attribute.id.map(SqlValue::from))
            .collect();
        if ids.is_empty() {
            return Ok(Handled::new(0));
        }

        self.scores
            .delete_by(vec![Constraint::any_of("attribute_id", ids.clone())])
            .await
            .map_err(delete_failed("attributes"))?;
        let deleted = self
            .attributes
            .delete_by(vec![Constraint::any_of("id", ids)])
            .await
            .map_err(delete_failed("attributes"))?;

        let event = deleted_multi("attribute", deleted, &command.identity)
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

    fn scope(user_id: i64) -> ProfileScope {
        ProfileScope::new(
            CredentialScope {
                company_id: 1,
                credential_id: 10,
                creator_id: Some(3),
            },
            user_id,
            "alice",
        )
    }

    fn create(name: &str) -> CreateNew {
        CreateNew {
            scope: scope(100),
            identity: Identity::Credential("pub".into()),
            name: name.to_string(),
            value: "alice@example.com".to_string(),
            support: 0.8,
        }
    }

    #[tokio::test]
    async fn created_attributes_record_their_creator() {
        let handler = AttributeHandler::new(Arc::new(InMemoryRepository::new()), Arc::new(InMemoryRepository::new()));
        let handled = handler.handle(create("email")).await.unwrap();

        assert_eq!(handled.result.creator_id, Some(3));
        assert_eq!(handled.result.value.get(), "alice@example.com");
        let event = &handled.events[0];
        assert_eq!(event.name, "idos:attribute.created");
        assert_eq!(event.handler_payload.as_ref().unwrap()["user"], "alice");
    }

    #[tokio::test]
    async fn support_outside_the_unit_interval_is_rejected() {
        let handler = AttributeHandler::new(Arc::new(InMemoryRepository::new()), Arc::new(InMemoryRepository::new()));
        let mut command = create("email");
        command.support = 1.5;
        let err = handler.handle(command).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn delete_all_takes_scores_along() {
        let attributes = Arc::new(InMemoryRepository::<Attribute>::new());
        let scores = Arc::new(InMemoryRepository::<Score>::new());
        let handler = AttributeHandler::new(attributes.clone(), scores.clone());

        let email = handler.handle(create("email")).await.unwrap().result;
        handler.handle(create("phone")).await.unwrap();
        scores.save(Score::new(email.id.unwrap(), "trust", 0.5)).await.unwrap();
        attributes.save(Attribute::new(200, "email", "bob@example.com", 1.0)).await.unwrap();

        let handled = handler
            .handle(DeleteAll {
                scope: scope(100),
                identity: Identity::default(),
                query: QueryParams::new(),
            })
            .await
            .unwrap();

        assert_eq!(handled.result, 2);
        assert_eq!(handled.events[0].name, "idos:attribute.deleted_multi");
        assert_eq!(attributes.len(), 1);
        assert_eq!(scores.len(), 0);
    }

    #[tokio::test]
    async fn attributes_of_other_users_are_not_found() {
        let handler = AttributeHandler::new(Arc::new(InMemoryRepository::new()), Arc::new(InMemoryRepository::new()));
        let created = handler.handle(create("email")).await.unwrap().result;

        let err = handler
            .handle(GetOne {
                scope: scope(200),
                identity: Identity::default(),
                attribute_id: created.id.unwrap(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
