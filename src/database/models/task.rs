use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Columns, Entity};
use crate::database::mapping::Mapping;
use crate::database::relation::{ManyToOne, Relation};
use crate::filter::types::FilterType;
use crate::optimus;
use crate::vault::{Secure, VaultError};

static MAPPING: Mapping = Mapping {
    table: "tasks",
    filterable: &[
        ("name", FilterType::String),
        ("event", FilterType::String),
        ("running", FilterType::Boolean),
        ("success", FilterType::Boolean),
        ("created_at", FilterType::Date),
    ],
    orderable: &["name", "created_at", "updated_at"],
    relations: &[Relation::ManyToOne(ManyToOne {
        name: "process",
        table: "processes",
        foreign_key: "process_id",
        key: "id",
        nullable: false,
        hydrate: &[],
    })],
};

/// One step of a process. `message` carries the outcome and is stored encrypted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, serialize_with = "optimus::encoded::option::serialize")]
    pub id: Option<i64>,
    #[serde(skip_serializing)]
    pub process_id: i64,
    pub name: String,
    pub event: String,
    pub running: bool,
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<Secure<String>>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(process_id: i64, name: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            id: None,
            process_id,
            name: name.into(),
            event: event.into(),
            running: false,
            success: None,
            message: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

impl Entity for Task {
    const NAME: &'static str = "Task";

    fn mapping() -> &'static Mapping {
        &MAPPING
    }

    super::entity_identity!();

    fn columns(&self) -> Result<Columns, VaultError> {
        let message = match &self.message {
            Some(message) => Some(message.seal()?),
            None => None,
        };
        Ok(vec![
            ("process_id", self.process_id.into()),
            ("name", self.name.clone().into()),
            ("event", self.event.clone().into()),
            ("running", self.running.into()),
            ("success", self.success.into()),
            ("message", message.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_plain_in_output() {
        let mut task = Task::new(3, "scrape", "idos:source.created");
        task.message = Some(Secure::new("timed out".to_string()));
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["message"], "timed out");
        assert!(json.get("process_id").is_none());
        assert_eq!(json["success"], serde_json::Value::Null);
    }
}
