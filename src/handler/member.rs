use async_trait::async_trait;
use std::sync::Arc;

use super::{create_failed, delete_failed, ensure_owned, not_found, update_failed, Handled, Handler};
use crate::command::member::{CreateNew, DeleteOne, ListAll, UpdateOne};
use crate::command::CompanyScope;
use crate::database::models::{Member, User};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::Constraint;
use crate::validation::{assert_id, assert_role, Validation};

pub struct MemberHandler {
    members: Arc<dyn Repository<Member>>,
    users: Arc<dyn Repository<User>>,
}

impl MemberHandler {
    pub fn new(members: Arc<dyn Repository<Member>>, users: Arc<dyn Repository<User>>) -> Self {
        Self { members, users }
    }

    async fn owned(&self, scope: &CompanyScope, member_id: i64) -> Result<Member, ApiError> {
        let member = self
            .members
            .find(member_id)
            .await
            .map_err(not_found("Member not found"))?;
        ensure_owned(member.company_id == scope.company_id, "Member not found")?;
        Ok(member)
    }
}

#[async_trait]
impl Handler<ListAll> for MemberHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Member>>, ApiError> {
        let members = self
            .members
            .find_by(vec![Constraint::eq("company_id", command.scope.company_id)], &command.query)
            .await?;
        Ok(Handled::new(members))
    }
}

#[async_trait]
impl Handler<CreateNew> for MemberHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Member>, ApiError> {
        Validation::new()
            .check("user_id", assert_id(command.user_id))
            .check("role", assert_role(&command.role))
            .finish()?;

        self.users
            .find(command.user_id)
            .await
            .map_err(not_found("User not found"))?;

        let existing = self
            .members
            .count_by(vec![
                Constraint::eq("company_id", command.scope.company_id),
                Constraint::eq("user_id", command.user_id),
            ])
            .await?;
        if existing > 0 {
            return Err(ApiError::create(
                "Error while trying to create a new member",
                "user is already a member of the company",
            ));
        }

        let member = Member::new(command.scope.company_id, command.user_id, command.role);
        let member = self.members.save(member).await.map_err(create_failed("member"))?;
        let mut hydrated = self.members.hydrate_relations(vec![member]).await?;
        let member = hydrated
            .pop()
            .ok_or_else(|| ApiError::internal("Hydration dropped the new member"))?;

        let event = Event::about("member", "created", &member, &command.identity).for_company(command.scope.company_id);
        Ok(Handled::with_event(member, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for MemberHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Member>, ApiError> {
        Validation::new()
            .check("memberId", assert_id(command.member_id))
            .check("role", assert_role(&command.role))
            .finish()?;

        let mut member = self.owned(&command.scope, command.member_id).await?;
        member.role = command.role;
        let member = self.members.save(member).await.map_err(update_failed("member"))?;

        let event = Event::about("member", "updated", &member, &command.identity).for_company(command.scope.company_id);
        Ok(Handled::with_event(member, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for MemberHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("memberId", assert_id(command.member_id)).finish()?;
        let member = self.owned(&command.scope, command.member_id).await?;

        let deleted = self
            .members
            .delete(command.member_id)
            .await
            .map_err(delete_failed("member"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Member not found"));
        }

        let event = Event::about("member", "deleted", &member, &command.identity).for_company(command.scope.company_id);
        Ok(Handled::with_event((), event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::testing::InMemoryRepository;

    fn scope() -> CompanyScope {
        CompanyScope {
            company_id: 1,
            identity_id: None,
        }
    }

    async fn handler_with_user() -> (MemberHandler, i64) {
        let users = Arc::new(InMemoryRepository::<User>::new());
        let user = users.save(User::new(10, "alice", "user")).await.unwrap();
        let handler = MemberHandler::new(Arc::new(InMemoryRepository::new()), users);
        (handler, user.id.unwrap())
    }

    #[tokio::test]
    async fn members_join_once() {
        let (handler, user_id) = handler_with_user().await;
        let create = || CreateNew {
            scope: scope(),
            identity: Identity::default(),
            user_id,
            role: "admin".to_string(),
        };

        let handled = handler.handle(create()).await.unwrap();
        assert_eq!(handled.result.role, "admin");
        assert_eq!(handled.events[0].name, "idos:member.created");

        let err = handler.handle(create()).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn unknown_users_cannot_join() {
        let (handler, user_id) = handler_with_user().await;
        let err = handler
            .handle(CreateNew {
                scope: scope(),
                identity: Identity::default(),
                user_id: user_id + 1,
                role: "member".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "User not found");
    }

    #[tokio::test]
    async fn role_changes_are_validated() {
        let (handler, user_id) = handler_with_user().await;
        let member = handler
            .handle(CreateNew {
                scope: scope(),
                identity: Identity::default(),
                user_id,
                role: "member".to_string(),
            })
            .await
            .unwrap()
            .result;

        let err = handler
            .handle(UpdateOne {
                scope: scope(),
                identity: Identity::default(),
                member_id: member.id.unwrap(),
                role: "emperor".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let updated = handler
            .handle(UpdateOne {
                scope: scope(),
                identity: Identity::default(),
                member_id: member.id.unwrap(),
                role: "owner".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(updated.result.role, "owner");
    }
}
