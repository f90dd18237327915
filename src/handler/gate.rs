use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{
    create_failed, delete_failed, deleted_multi, ensure_owned, filtered, not_found, profile_event, update_failed,
    Handled, Handler,
};
use crate::command::gate::{CreateNew, DeleteAll, DeleteOne, GetOne, ListAll, UpdateOne, Upsert};
use crate::command::{ProfileScope, Upserted};
use crate::database::models::{slugify, Gate, Review};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::types::{Constraint, QueryParams};
use crate::validation::{assert_id, assert_name, assert_slug, Validation};

/// A gate is unique per user and slug
const CONFLICT_KEYS: &[&str] = &["user_id", "slug"];
const UPDATE_KEYS: &[&str] = &["name", "pass", "creator_id", "updated_at"];

pub struct GateHandler {
    gates: Arc<dyn Repository<Gate>>,
    reviews: Arc<dyn Repository<Review>>,
}

fn check_name(name: &str) -> Result<(), ApiError> {
    Validation::new()
        .check("name", assert_name(name))
        .check("name", assert_slug(&slugify(name)))
        .finish()
}

impl GateHandler {
    pub fn new(gates: Arc<dyn Repository<Gate>>, reviews: Arc<dyn Repository<Review>>) -> Self {
        Self { gates, reviews }
    }

    async fn owned(&self, scope: &ProfileScope, gate_id: i64) -> Result<Gate, ApiError> {
        let gate = self.gates.find(gate_id).await.map_err(not_found("Gate not found"))?;
        ensure_owned(gate.user_id == scope.user_id, "Gate not found")?;
        Ok(gate)
    }

    fn build(scope: &ProfileScope, name: String, pass: bool) -> Gate {
        let mut gate = Gate::new(scope.user_id, name, pass);
        gate.creator_id = scope.creator_id;
        gate
    }
}

#[async_trait]
impl Handler<ListAll> for GateHandler {
    async fn handle(&self, command: ListAll) -> Result<Handled<Vec<Gate>>, ApiError> {
        let gates = self
            .gates
            .find_by(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query)
            .await?;
        Ok(Handled::new(gates))
    }
}

#[async_trait]
impl Handler<GetOne> for GateHandler {
    async fn handle(&self, command: GetOne) -> Result<Handled<Gate>, ApiError> {
        Validation::new().check("gateId", assert_id(command.gate_id)).finish()?;
        Ok(Handled::new(self.owned(&command.scope, command.gate_id).await?))
    }
}

#[async_trait]
impl Handler<CreateNew> for GateHandler {
    async fn handle(&self, command: CreateNew) -> Result<Handled<Gate>, ApiError> {
        check_name(&command.name)?;

        let gate = Self::build(&command.scope, command.name, command.pass);
        let gate = self.gates.save(gate).await.map_err(create_failed("gate"))?;

        let event = profile_event("gate", "created", &gate, &command.scope, &command.identity);
        Ok(Handled::with_event(gate, event))
    }
}

#[async_trait]
impl Handler<UpdateOne> for GateHandler {
    async fn handle(&self, command: UpdateOne) -> Result<Handled<Gate>, ApiError> {
        Validation::new().check("gateId", assert_id(command.gate_id)).finish()?;

        let mut gate = self.owned(&command.scope, command.gate_id).await?;
        gate.pass = command.pass;
        let gate = self.gates.save(gate).await.map_err(update_failed("gate"))?;

        let event = profile_event("gate", "updated", &gate, &command.scope, &command.identity);
        Ok(Handled::with_event(gate, event))
    }
}

#[async_trait]
impl Handler<Upsert> for GateHandler {
    async fn handle(&self, command: Upsert) -> Result<Handled<Upserted<Gate>>, ApiError> {
        check_name(&command.name)?;

        let mut gate = Self::build(&command.scope, command.name, command.pass);
        let existing = self
            .gates
            .count_by(vec![
                Constraint::eq("user_id", command.scope.user_id),
                Constraint::eq("slug", gate.slug.as_str()),
            ])
            .await?;
        let created = existing == 0;
        if !created {
            gate.updated_at = Some(Utc::now());
        }

        let gate = self
            .gates
            .upsert(gate, CONFLICT_KEYS, UPDATE_KEYS)
            .await
            .map_err(update_failed("gate"))?;

        let action = if created { "created" } else { "updated" };
        let event = profile_event("gate", action, &gate, &command.scope, &command.identity);
        Ok(Handled::with_event(Upserted { entity: gate, created }, event))
    }
}

#[async_trait]
impl Handler<DeleteOne> for GateHandler {
    async fn handle(&self, command: DeleteOne) -> Result<Handled<()>, ApiError> {
        Validation::new().check("gateId", assert_id(command.gate_id)).finish()?;
        let gate = self.owned(&command.scope, command.gate_id).await?;

        self.reviews
            .delete_by(vec![Constraint::eq("gate_id", command.gate_id)])
            .await
            .map_err(delete_failed("gate"))?;
        let deleted = self.gates.delete(command.gate_id).await.map_err(delete_failed("gate"))?;
        if deleted == 0 {
            return Err(ApiError::not_found("Gate not found"));
        }

        let event = profile_event("gate", "deleted", &gate, &command.scope, &command.identity);
        Ok(Handled::with_event((), event))
    }
}

#[async_trait]
impl Handler<DeleteAll> for GateHandler {
    async fn handle(&self, command: DeleteAll) -> Result<Handled<u64>, ApiError> {
        let constraints = filtered::<Gate>(vec![Constraint::eq("user_id", command.scope.user_id)], &command.query);
        let doomed = self.gates.find_by(constraints.clone(), &QueryParams::new()).await?;
        for id in doomed.iter().filter_map(|gate| gate.id) {
            self.reviews
                .delete_by(vec![Constraint::eq("gate_id", id)])
                .await
                .map_err(delete_failed("gates"))?;
        }
        let deleted = self.gates.delete_by(constraints).await.map_err(delete_failed("gates"))?;

        let event = deleted_multi("gate", deleted, &command.identity)
            .map(|e| e.queued_for(command.scope.company_id, &command.scope.username));
        Ok(Handled::with_events(deleted, event.into_iter().collect()))
    }
}
