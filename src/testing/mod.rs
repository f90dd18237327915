//! In-memory collaborators for unit tests.
//!
//! [`InMemoryRepository`] evaluates constraints against [`Entity::column`], so it sees the
//! stored representation the SQL repository writes. Relations are not joined: a dotted
//! `relation.key` or a bare foreign key compares the foreign key column, other relation
//! columns are rejected.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::auth::generate_key_pair;
use crate::cache::{Cache, CacheError};
use crate::database::manager::DatabaseError;
use crate::database::models::{Company, Credential, Entity};
use crate::database::repository::{Page, Pagination, Repository};
use crate::database::{Repositories, SqlValue};
use crate::filter::types::{Constraint, Operator, Predicate, QueryParams, SortDirection};
use crate::filter::{FilterOrder, FilterWhere};
use crate::handler::user::ProfileRepositories;
use crate::handler::Handshake;
use crate::optimus::optimus;
use crate::queue::{JobQueue, QueueError};
use crate::sso::{Provider, ProviderClient, SsoError};

struct Table<E> {
    rows: Vec<E>,
    next_id: i64,
}

pub struct InMemoryRepository<E> {
    table: Mutex<Table<E>>,
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table { rows: vec![], next_id: 1 }),
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rows(&self) -> Vec<E> {
        self.table.lock().unwrap().rows.clone()
    }

    fn select(&self, constraints: &[Constraint]) -> Result<Vec<E>, DatabaseError> {
        let mut selected = Vec::new();
        for row in self.rows() {
            if matches_all(&row, constraints)? {
                selected.push(row);
            }
        }
        Ok(selected)
    }

    fn not_found() -> DatabaseError {
        DatabaseError::NotFound(format!("{} not found", E::NAME))
    }
}

fn matches_all<E: Entity>(entity: &E, constraints: &[Constraint]) -> Result<bool, DatabaseError> {
    for constraint in constraints {
        if !satisfies(entity, constraint)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn satisfies<E: Entity>(entity: &E, constraint: &Constraint) -> Result<bool, DatabaseError> {
    let mapping = E::mapping();
    let mut predicate = constraint.predicate.clone();

    let column = if let Some((name, column)) = constraint.column.split_once('.') {
        let relation = mapping.relation(name)?;
        if column != relation.key() {
            return Err(DatabaseError::InvalidColumn(constraint.column.clone()));
        }
        relation.foreign_key().to_string()
    } else {
        constraint.column.clone()
    };

    if mapping.relation_by_foreign_key(&column).is_some() {
        if let Predicate::Compare(operator, SqlValue::Int(value)) = &predicate {
            let encoded_zero = optimus().encode(*value).map(|e| e == 0).unwrap_or(false);
            if *value == 0 || encoded_zero {
                predicate = Predicate::Compare(*operator, SqlValue::Null);
            }
        }
    }

    let stored = entity.column(&column)?;
    Ok(evaluate(&stored, &predicate))
}

fn evaluate(stored: &SqlValue, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Compare(Operator::Eq, SqlValue::Null) => stored.is_null(),
        Predicate::Compare(Operator::Neq, SqlValue::Null) => !stored.is_null(),
        Predicate::Compare(_, _) if stored.is_null() => false,
        Predicate::Compare(Operator::Eq, value) => same(stored, value),
        Predicate::Compare(Operator::Neq, value) => !same(stored, value),
        Predicate::Compare(Operator::Gt, value) => compare(stored, value) == Some(Ordering::Greater),
        Predicate::Compare(Operator::Gte, value) => {
            matches!(compare(stored, value), Some(Ordering::Greater | Ordering::Equal))
        }
        Predicate::Compare(Operator::Lt, value) => compare(stored, value) == Some(Ordering::Less),
        Predicate::Compare(Operator::Lte, value) => {
            matches!(compare(stored, value), Some(Ordering::Less | Ordering::Equal))
        }
        Predicate::Compare(Operator::ILike, value) => match (stored.to_json(), value.to_json()) {
            (Value::String(text), Value::String(pattern)) => like(&text.to_lowercase(), &pattern.to_lowercase()),
            _ => false,
        },
        Predicate::Between(low, high) => {
            matches!(compare(stored, low), Some(Ordering::Greater | Ordering::Equal))
                && matches!(compare(stored, high), Some(Ordering::Less | Ordering::Equal))
        }
        Predicate::In(values) => values.iter().any(|value| same(stored, value)),
        Predicate::JsonText { field, value } => match stored.to_json().get(field) {
            Some(Value::String(text)) => value.to_json() == Value::String(text.clone()),
            Some(Value::Null) | None => false,
            Some(other) => value.to_json() == Value::String(other.to_string()),
        },
        Predicate::Contains(value) => contains(&stored.to_json(), &value.to_json()),
    }
}

fn same(a: &SqlValue, b: &SqlValue) -> bool {
    compare(a, b) == Some(Ordering::Equal) || a.to_json() == b.to_json()
}

fn compare(a: &SqlValue, b: &SqlValue) -> Option<Ordering> {
    match (a.to_json(), b.to_json()) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(&y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(&y)),
        _ => None,
    }
}

/// `%` matches any run, `_` one character
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// jsonb `@>`
fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(h), Value::Object(n)) => n
            .iter()
            .all(|(key, value)| h.get(key).map(|found| contains(found, value)).unwrap_or(false)),
        (Value::Array(h), Value::Array(n)) => n.iter().all(|value| h.iter().any(|found| contains(found, value))),
        (Value::Array(h), scalar) => h.iter().any(|found| found == scalar),
        (h, n) => h == n,
    }
}

fn sort_rows<E: Entity>(rows: &mut [E], column: &str, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ordering = match (a.column(column), b.column(column)) {
            (Ok(x), Ok(y)) => compare(&x, &y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn find(&self, id: i64) -> Result<E, DatabaseError> {
        self.rows()
            .into_iter()
            .find(|row| row.id() == Some(id))
            .ok_or_else(Self::not_found)
    }

    async fn find_by(&self, constraints: Vec<Constraint>, params: &QueryParams) -> Result<Vec<E>, DatabaseError> {
        let mapping = E::mapping();
        let mut all = constraints;
        all.extend(FilterWhere::constraints(params, mapping.filterable, optimus()));
        let mut rows = self.select(&all)?;

        let modifiers = FilterOrder::modifiers(params, mapping.orderable, None);
        for order in modifiers.order.iter().rev() {
            sort_rows(&mut rows, &order.column, order.sort);
        }
        if let Some(limit) = modifiers.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn find_one_by(&self, constraints: Vec<Constraint>) -> Result<E, DatabaseError> {
        self.select(&constraints)?.into_iter().next().ok_or_else(Self::not_found)
    }

    async fn count_by(&self, constraints: Vec<Constraint>) -> Result<i64, DatabaseError> {
        Ok(self.select(&constraints)?.len() as i64)
    }

    async fn paginate(&self, constraints: Vec<Constraint>, page: i64, per_page: i64) -> Result<Page<E>, DatabaseError> {
        let per_page = per_page.max(1);
        let rows = self.select(&constraints)?;
        let total = rows.len() as i64;
        let data: Vec<E> = rows
            .into_iter()
            .skip(Pagination::offset(page, per_page) as usize)
            .take(per_page as usize)
            .collect();
        let pagination = Pagination::new(total, page, per_page, data.len());
        Ok(Page { data, pagination })
    }

    async fn save(&self, mut entity: E) -> Result<E, DatabaseError> {
        let mut table = self.table.lock().unwrap();
        match entity.id() {
            None => {
                entity.set_id(table.next_id);
                table.next_id += 1;
                table.rows.push(entity.clone());
            }
            Some(id) => {
                let slot = table
                    .rows
                    .iter_mut()
                    .find(|row| row.id() == Some(id))
                    .ok_or(DatabaseError::NoRowsUpdated)?;
                entity.set_updated_at(Utc::now());
                *slot = entity.clone();
            }
        }
        Ok(entity)
    }

    /// The conflicting row is replaced by `entity` under the existing id
    async fn upsert(&self, entity: E, conflict_keys: &[&str], _update_keys: &[&str]) -> Result<E, DatabaseError> {
        let mut constraints = Vec::with_capacity(conflict_keys.len());
        for key in conflict_keys {
            constraints.push(Constraint::eq(*key, entity.column(key)?));
        }
        let existing = if constraints.is_empty() {
            None
        } else {
            self.select(&constraints)?.into_iter().next()
        };

        let mut entity = entity;
        match existing.and_then(|row| row.id()) {
            Some(id) => {
                entity.set_id(id);
                let mut table = self.table.lock().unwrap();
                if let Some(slot) = table.rows.iter_mut().find(|row| row.id() == Some(id)) {
                    *slot = entity.clone();
                }
                Ok(entity)
            }
            None => {
                let mut table = self.table.lock().unwrap();
                entity.set_id(table.next_id);
                table.next_id += 1;
                table.rows.push(entity.clone());
                Ok(entity)
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<u64, DatabaseError> {
        let mut table = self.table.lock().unwrap();
        let before = table.rows.len();
        table.rows.retain(|row| row.id() != Some(id));
        Ok((before - table.rows.len()) as u64)
    }

    async fn delete_by(&self, constraints: Vec<Constraint>) -> Result<u64, DatabaseError> {
        if constraints.is_empty() {
            return Err(DatabaseError::Unconstrained("delete_by"));
        }
        let doomed: Vec<i64> = self.select(&constraints)?.iter().filter_map(|row| row.id()).collect();
        let mut table = self.table.lock().unwrap();
        table.rows.retain(|row| !row.id().map(|id| doomed.contains(&id)).unwrap_or(false));
        Ok(doomed.len() as u64)
    }

    async fn update_by(&self, _constraints: Vec<Constraint>, _values: Vec<(String, SqlValue)>) -> Result<u64, DatabaseError> {
        Err(DatabaseError::QueryError("update_by needs SQL".to_string()))
    }

    async fn hydrate_relations(&self, entities: Vec<E>) -> Result<Vec<E>, DatabaseError> {
        Ok(entities)
    }
}

/// Every repository held in memory
pub fn repositories() -> Repositories {
    Repositories {
        companies: Arc::new(InMemoryRepository::new()),
        credentials: Arc::new(InMemoryRepository::new()),
        users: Arc::new(InMemoryRepository::new()),
        hooks: Arc::new(InMemoryRepository::new()),
        services: Arc::new(InMemoryRepository::new()),
        settings: Arc::new(InMemoryRepository::new()),
        members: Arc::new(InMemoryRepository::new()),
        role_access: Arc::new(InMemoryRepository::new()),
        attributes: Arc::new(InMemoryRepository::new()),
        features: Arc::new(InMemoryRepository::new()),
        scores: Arc::new(InMemoryRepository::new()),
        sources: Arc::new(InMemoryRepository::new()),
        candidates: Arc::new(InMemoryRepository::new()),
        tags: Arc::new(InMemoryRepository::new()),
        raw: Arc::new(InMemoryRepository::new()),
        gates: Arc::new(InMemoryRepository::new()),
        reviews: Arc::new(InMemoryRepository::new()),
        warnings: Arc::new(InMemoryRepository::new()),
        flags: Arc::new(InMemoryRepository::new()),
        processes: Arc::new(InMemoryRepository::new()),
        tasks: Arc::new(InMemoryRepository::new()),
        permissions: Arc::new(InMemoryRepository::new()),
    }
}

pub fn profile_repositories() -> ProfileRepositories {
    let repos = repositories();
    ProfileRepositories {
        users: repos.users,
        attributes: repos.attributes,
        scores: repos.scores,
        features: repos.features,
        sources: repos.sources,
        raw: repos.raw,
        candidates: repos.candidates,
        tags: repos.tags,
        gates: repos.gates,
        reviews: repos.reviews,
        warnings: repos.warnings,
        flags: repos.flags,
        processes: repos.processes,
        tasks: repos.tasks,
    }
}

pub async fn seed_company(companies: &Arc<InMemoryRepository<Company>>, name: &str) -> Company {
    let (public, private) = generate_key_pair();
    companies.save(Company::new(name, public, private, None)).await.unwrap()
}

pub async fn seed_credential(credentials: &Arc<InMemoryRepository<Credential>>, company_id: i64) -> Credential {
    let (public, private) = generate_key_pair();
    credentials
        .save(Credential::new(company_id, "Production", true, public, private))
        .await
        .unwrap()
}

/// Remembers pushed jobs; pushes whose payload `name` matches `failing` are refused
#[derive(Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<(String, Value)>>,
    failing: Option<String>,
}

impl RecordingQueue {
    pub fn failing_on(name: &str) -> Self {
        Self {
            jobs: Mutex::default(),
            failing: Some(name.to_string()),
        }
    }

    pub fn jobs(&self) -> Vec<(String, Value)> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn push(&self, function: &str, payload: &Value) -> Result<(), QueueError> {
        if self.failing.is_some() && payload["name"].as_str() == self.failing.as_deref() {
            return Err(QueueError::Unavailable);
        }
        self.jobs.lock().unwrap().push((function.to_string(), payload.clone()));
        Ok(())
    }
}

/// Keeps stored entries in memory and remembers every invalidation
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, (String, Vec<String>)>>,
    deleted: Mutex<Vec<String>>,
    cleaned: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn cleaned(&self) -> Vec<String> {
        self.cleaned.lock().unwrap().clone()
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).map(|(value, _)| value.clone())
    }

    pub fn tags_of(&self, key: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, tags)| tags.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Cache for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.stored(key))
    }

    async fn put(&self, key: &str, value: &str, tags: &[&str]) -> Result<(), CacheError> {
        let tags = tags.iter().map(|tag| tag.to_string()).collect();
        self.entries.lock().unwrap().insert(key.to_string(), (value.to_string(), tags));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn clean_tag(&self, tag: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, (_, tags)| !tags.iter().any(|t| t == tag));
        self.cleaned.lock().unwrap().push(tag.to_string());
        Ok((before - entries.len()) as u64)
    }
}

pub struct FakeHandshake {
    accept: bool,
    urls: Mutex<Vec<String>>,
}

impl FakeHandshake {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            urls: Mutex::default(),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            urls: Mutex::default(),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Handshake for FakeHandshake {
    async fn handshake(&self, url: &str) -> bool {
        self.urls.lock().unwrap().push(url.to_string());
        self.accept
    }
}

/// Answers every profile request with the same document, or fails as unreachable
pub struct FakeProvider {
    body: Option<Value>,
}

impl FakeProvider {
    pub fn answering(body: Value) -> Self {
        Self { body: Some(body) }
    }

    pub fn unreachable() -> Self {
        Self { body: None }
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn profile(&self, provider: &Provider, _access_token: &str, _token_secret: Option<&str>) -> Result<Value, SsoError> {
        self.body
            .clone()
            .ok_or_else(|| SsoError::Transport(format!("{} is unreachable", provider.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Feature, Source};
    use serde_json::json;

    #[tokio::test]
    async fn constraints_follow_stored_columns() {
        let features = InMemoryRepository::<Feature>::new();
        let mut derived = Feature::new(1, "Friend Count", json!(12));
        derived.source_id = Some(5);
        features.save(derived).await.unwrap();
        features.save(Feature::new(1, "Age", json!(30))).await.unwrap();
        features.save(Feature::new(2, "Age", json!(41))).await.unwrap();

        let mine = features.count_by(vec![Constraint::eq("user_id", 1)]).await.unwrap();
        assert_eq!(mine, 2);

        let unsourced = features.count_by(vec![Constraint::eq("source_id", 0)]).await.unwrap();
        assert_eq!(unsourced, 2);

        let wildcard = features
            .count_by(vec![Constraint::new("name", Operator::ILike, "friend%")])
            .await
            .unwrap();
        assert_eq!(wildcard, 1);

        let none = features.count_by(vec![Constraint::any_of("user_id", vec![])]).await.unwrap();
        assert_eq!(none, 0);
    }

    #[tokio::test]
    async fn json_text_and_containment() {
        let sources = InMemoryRepository::<Source>::new();
        sources
            .save(Source::new(1, "twitter", json!({"profile_id": "42", "sso": true}), None))
            .await
            .unwrap();

        let found = sources
            .find_one_by(vec![Constraint::json_text("tags", "profile_id", "42")])
            .await
            .unwrap();
        assert_eq!(found.name, "twitter");
        assert_eq!(
            sources.count_by(vec![Constraint::contains("tags", json!({"sso": true}))]).await.unwrap(),
            1
        );
        assert!(sources
            .find_one_by(vec![Constraint::json_text("tags", "profile_id", "7")])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unconstrained_deletes_are_refused() {
        let sources = InMemoryRepository::<Source>::new();
        let err = sources.delete_by(vec![]).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Unconstrained("delete_by")));
    }

    #[test]
    fn like_patterns() {
        assert!(like("friend count", "friend%"));
        assert!(like("friend count", "%count"));
        assert!(like("abc", "a_c"));
        assert!(!like("abc", "a_d"));
        assert!(like("", "%"));
    }
}
