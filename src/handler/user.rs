use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{create_failed, delete_failed, Handled, Handler};
use crate::auth::random_hex;
use crate::command::user::{CreateNew, DeleteOne};
use crate::database::models::{
    Attribute, Candidate, Feature, Flag, Gate, Process, Raw, Review, Score, Source, Tag, Task, User, Warning,
};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::event::Event;
use crate::filter::types::{Constraint, QueryParams};
use crate::validation::{assert_role, assert_username, Validation};

pub const DEFAULT_ROLE: &str = "user";

/// Length in bytes of generated usernames
const USERNAME_BYTES: usize = 10;

/// Users and everything hanging off their profile
#[derive(Clone)]
pub struct ProfileRepositories {
    pub users: Arc<dyn Repository<User>>,
    pub attributes: Arc<dyn Repository<Attribute>>,
    pub scores: Arc<dyn Repository<Score>>,
    pub features: Arc<dyn Repository<Feature>>,
    pub sources: Arc<dyn Repository<Source>>,
    pub raw: Arc<dyn Repository<Raw>>,
    pub candidates: Arc<dyn Repository<Candidate>>,
    pub tags: Arc<dyn Repository<Tag>>,
    pub gates: Arc<dyn Repository<Gate>>,
    pub reviews: Arc<dyn Repository<Review>>,
    pub warnings: Arc<dyn Repository<Warning>>,
    pub flags: Arc<dyn Repository<Flag>>,
    pub processes: Arc<dyn Repository<Process>>,
    pub tasks: Arc<dyn Repository<Task>>,
}

/// Delete the profile rows of a user, children before parents. The user row itself stays.
pub(crate) async fn purge_profile(repos: &ProfileRepositories, user_id: i64) -> Result<(), ApiError> {
    let fail = || delete_failed("user");
    let mine = || vec![Constraint::eq("user_id", user_id)];

    let attributes = repos.attributes.find_by(mine(), &QueryParams::new()).await?;
    for id in attributes.iter().filter_map(|attribute| attribute.id) {
        repos
            .scores
            .delete_by(vec![Constraint::eq("attribute_id", id)])
            .await
            .map_err(fail())?;
    }

    let processes = repos.processes.find_by(mine(), &QueryParams::new()).await?;
    for id in processes.iter().filter_map(|process| process.id) {
        repos
            .tasks
            .delete_by(vec![Constraint::eq("process_id", id)])
            .await
            .map_err(fail())?;
    }

    let sources = repos.sources.find_by(mine(), &QueryParams::new()).await?;
    for id in sources.iter().filter_map(|source| source.id) {
        repos
            .raw
            .delete_by(vec![Constraint::eq("source_id", id)])
            .await
            .map_err(fail())?;
    }

    repos.reviews.delete_by(mine()).await.map_err(fail())?;
    repos.gates.delete_by(mine()).await.map_err(fail())?;
    repos.warnings.delete_by(mine()).await.map_err(fail())?;
    repos.flags.delete_by(mine()).await.map_err(fail())?;
    repos.processes.delete_by(mine()).await.map_err(fail())?;
    repos.features.delete_by(mine()).await.map_err(fail())?;
    repos.attributes.delete_by(mine()).await.map_err(fail())?;
    repos.candidates.delete_by(mine()).await.map_err(fail())?;
    repos.tags.delete_by(mine()).await.map_err(fail())?;
    repos.sources.delete_by(mine()).await.map_err(fail())?;
    Ok(())
}

pub struct UserHandler {
    repos: ProfileRepositories,
}

impl UserHandler {
    pub fn new(repos: ProfileRepositories) -> Self {
        Self { repos }
    }
}

#[async_trait]
impl Handler<CreateNew> for UserHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<User>, ApiError> {
        let username = command.username.unwrap_or_else(|| random_hex(USERNAME_BYTES));
        let role = command.role.unwrap_or_else(|| DEFAULT_ROLE.to_string());
        Validation::new()
            .check("username", assert_username(&username))
            .check("role", assert_role(&role))
            .finish()?;

        let taken = self
            .repos
            .users
            .count_by(vec![
                Constraint::eq("credential_id", command.scope.credential_id),
                Constraint::eq("username", username.as_str()),
            ])
            .await?;
        if taken > 0 {
            let mut fields = BTreeMap::new();
            fields.insert("username".to_string(), "is already taken".to_string());
            return Err(ApiError::validation("username is already taken", fields));
        }

        let user = User::new(command.scope.credential_id, username, role);
        let user = self.repos.users.save(user).await.map_err(create_failed("user"))?;

        let event = Event::about("user", "created", &user, &command.identity)
            .queued_for(command.scope.company_id, &user.username);
        Ok(Handled::with_event(user, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for UserHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        let user = self
            .repos
            .users
            .find(command.scope.user_id)
            .await
            .map_err(super::not_found("User not found"))?;

        purge_profile(&self.repos, command.scope.user_id).await?;
        let deleted = self
            .repos
            .users
            .delete(command.scope.user_id)
            .await
            .map_err(delete_failed("user"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("User not found"));
        }

        let event = Event::about("user", "deleted", &user, &command.identity)
            .queued_for(command.scope.company_id, &command.scope.username);
        Ok(Handled::with_event((), event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::command::{CredentialScope, ProfileScope};
    use crate::testing::{profile_repositories, InMemoryRepository};
    use serde_json::json;

    fn credential_scope() -> CredentialScope {
        CredentialScope {
            company_id: 1,
            credential_id: 10,
            creator_id: None,
        }
    }

    #[tokio::test]
    async fn generated_usernames_are_random_hex() {
        let handler = UserHandler::new(profile_repositories());
        let handled = handler
            .handle(CreateNew {
                scope: credential_scope(),
                identity: Identity::Credential("pub".into()),
                username: None,
                role: None,
            })
            .await
            .unwrap();

        assert_eq!(handled.result.username.len(), 20);
        assert!(handled.result.username.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(handled.result.role, "user");
        assert_eq!(handled.events[0].name, "idos:user.created");
        assert!(handled.events[0].is_queueable());
    }

    #[tokio::test]
    async fn usernames_are_unique_per_credential() {
        let handler = UserHandler::new(profile_repositories());
        let create = || CreateNew {
            scope: credential_scope(),
            identity: Identity::default(),
            username: Some("alice".to_string()),
            role: None,
        };
        handler.handle(create()).await.unwrap();
        let err = handler.handle(create()).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn delete_cascades_to_profile_data() {
        let repos = profile_repositories();
        let user = repos.users.save(User::new(10, "alice", "user")).await.unwrap();
        let user_id = user.id.unwrap();
        let attribute = repos
            .attributes
            .save(Attribute::new(user_id, "email", "alice@example.com", 1.0))
            .await
            .unwrap();
        repos
            .scores
            .save(Score::new(attribute.id.unwrap(), "trust", 0.9))
            .await
            .unwrap();
        let source = repos
            .sources
            .save(Source::new(user_id, "facebook", json!({}), None))
            .await
            .unwrap();
        repos
            .raw
            .save(Raw::new(source.id.unwrap(), "likes", json!([])))
            .await
            .unwrap();
        repos
            .features
            .save(Feature::new(user_id, "Age", json!(30)))
            .await
            .unwrap();
        let gate = repos.gates.save(Gate::new(user_id, "Over 18", true)).await.unwrap();
        repos
            .reviews
            .save(Review::new(user_id, gate.id.unwrap(), true))
            .await
            .unwrap();
        repos
            .warnings
            .save(Warning::new(user_id, "name-mismatch", None))
            .await
            .unwrap();
        repos.flags.save(Flag::new(user_id, "pep", None)).await.unwrap();
        let process = repos
            .processes
            .save(Process::new(user_id, "scrape", "idos:source.created"))
            .await
            .unwrap();
        repos
            .tasks
            .save(Task::new(process.id.unwrap(), "fetch", "idos:source.created"))
            .await
            .unwrap();

        let stranger = repos.users.save(User::new(10, "bob", "user")).await.unwrap();
        repos
            .features
            .save(Feature::new(stranger.id.unwrap(), "Age", json!(40)))
            .await
            .unwrap();

        let handler = UserHandler::new(repos.clone());
        handler
            .handle(DeleteOne {
                scope: ProfileScope::new(credential_scope(), user_id, "alice"),
                identity: Identity::default(),
            })
            .await
            .unwrap();

        let everything = QueryParams::new();
        assert_eq!(repos.users.find_by(vec![], &everything).await.unwrap().len(), 1);
        assert!(repos.attributes.find_by(vec![], &everything).await.unwrap().is_empty());
        assert!(repos.scores.find_by(vec![], &everything).await.unwrap().is_empty());
        assert!(repos.sources.find_by(vec![], &everything).await.unwrap().is_empty());
        assert!(repos.raw.find_by(vec![], &everything).await.unwrap().is_empty());
        assert!(repos.gates.find_by(vec![], &everything).await.unwrap().is_empty());
        assert!(repos.reviews.find_by(vec![], &everything).await.unwrap().is_empty());
        assert!(repos.warnings.find_by(vec![], &everything).await.unwrap().is_empty());
        assert!(repos.flags.find_by(vec![], &everything).await.unwrap().is_empty());
        assert!(repos.processes.find_by(vec![], &everything).await.unwrap().is_empty());
        assert!(repos.tasks.find_by(vec![], &everything).await.unwrap().is_empty());
        assert_eq!(repos.features.find_by(vec![], &everything).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let repos = ProfileRepositories {
            users: Arc::new(InMemoryRepository::new()),
            ..profile_repositories()
        };
        let err = UserHandler::new(repos)
            .handle(DeleteOne {
                scope: ProfileScope::new(credential_scope(), 42, "ghost"),
                identity: Identity::default(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
