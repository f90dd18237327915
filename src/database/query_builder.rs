//! SQL statement builders.
//!
//! Columns are written either bare (`name`, qualified with the base table when rendered) or
//! table-qualified (`sources.name`). Relation names never reach this layer; the repository
//! resolves them to tables first.

use crate::database::manager::DatabaseManager;
use crate::database::value::SqlValue;
use crate::filter::error::FilterError;
use crate::filter::types::{Constraint, Operator, Predicate, SortDirection, SqlResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn to_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// `<kind> JOIN table ON left = right`
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq)]
enum SelectExpr {
    All(String),
    Column(String),
    Aliased { column: String, alias: String },
}

/// Positional parameter collector. `NULL` is rendered inline and never bound.
#[derive(Default)]
struct Params {
    values: Vec<SqlValue>,
}

impl Params {
    fn param(&mut self, value: &SqlValue) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.values.push(value.clone());
        format!("${}", self.values.len())
    }
}

fn validate_identifier(name: &str) -> Result<(), FilterError> {
    if DatabaseManager::is_valid_identifier(name) {
        Ok(())
    } else {
        Err(FilterError::InvalidTableName(name.to_string()))
    }
}

fn validate_column(column: &str) -> Result<(), FilterError> {
    if column.split('.').all(DatabaseManager::is_valid_identifier) && column.split('.').count() <= 2 {
        Ok(())
    } else {
        Err(FilterError::InvalidColumn(column.to_string()))
    }
}

/// Render a column, qualifying bare names with `table`
fn quote_column(table: &str, column: &str) -> String {
    match column.split_once('.') {
        Some((owner, name)) => format!(
            "{}.{}",
            DatabaseManager::quote_identifier(owner),
            DatabaseManager::quote_identifier(name)
        ),
        None => format!(
            "{}.{}",
            DatabaseManager::quote_identifier(table),
            DatabaseManager::quote_identifier(column)
        ),
    }
}

fn render_condition(table: &str, constraint: &Constraint, params: &mut Params) -> String {
    let column = quote_column(table, &constraint.column);
    match &constraint.predicate {
        Predicate::Compare(Operator::Eq, SqlValue::Null) => format!("{} IS NULL", column),
        Predicate::Compare(Operator::Neq, SqlValue::Null) => format!("{} IS NOT NULL", column),
        Predicate::Compare(operator, value) => {
            format!("{} {} {}", column, operator.to_sql(), params.param(value))
        }
        Predicate::Between(low, high) => format!(
            "{} BETWEEN {} AND {}",
            column,
            params.param(low),
            params.param(high)
        ),
        Predicate::In(values) => {
            if values.is_empty() {
                return "1=0".to_string();
            }
            let placeholders: Vec<String> = values.iter().map(|v| params.param(v)).collect();
            format!("{} IN ({})", column, placeholders.join(", "))
        }
        Predicate::JsonText { field, value } => {
            let field = params.param(&SqlValue::Text(field.clone()));
            if value.is_null() {
                format!("{}->>{} IS NULL", column, field)
            } else {
                format!("{}->>{} = {}", column, field, params.param(value))
            }
        }
        Predicate::Contains(value) => format!("{} @> {}", column, params.param(value)),
    }
}

#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: String,
    columns: Vec<SelectExpr>,
    joins: Vec<Join>,
    conditions: Vec<Constraint>,
    order: Vec<(String, SortDirection)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Result<Self, FilterError> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self {
            table,
            columns: vec![],
            joins: vec![],
            conditions: vec![],
            order: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `table.*`
    pub fn select_all_of(&mut self, table: &str) -> Result<&mut Self, FilterError> {
        validate_identifier(table)?;
        self.columns.push(SelectExpr::All(table.to_string()));
        Ok(self)
    }

    pub fn select(&mut self, column: &str) -> Result<&mut Self, FilterError> {
        validate_column(column)?;
        self.columns.push(SelectExpr::Column(column.to_string()));
        Ok(self)
    }

    /// `column AS "alias"`; aliases may contain dots (`creator.name`)
    pub fn select_as(&mut self, column: &str, alias: &str) -> Result<&mut Self, FilterError> {
        validate_column(column)?;
        validate_column(alias)?;
        self.columns.push(SelectExpr::Aliased {
            column: column.to_string(),
            alias: alias.to_string(),
        });
        Ok(self)
    }

    pub fn has_join(&self, table: &str) -> bool {
        self.joins.iter().any(|join| join.table == table)
    }

    pub fn join_kind(&self, table: &str) -> Option<JoinKind> {
        self.joins.iter().find(|join| join.table == table).map(|join| join.kind)
    }

    /// Adds a join unless one on the same table exists
    pub fn join(&mut self, join: Join) -> Result<&mut Self, FilterError> {
        validate_identifier(&join.table)?;
        validate_column(&join.left)?;
        validate_column(&join.right)?;
        if !self.has_join(&join.table) {
            self.joins.push(join);
        }
        Ok(self)
    }

    pub fn relax_join(&mut self, table: &str) {
        for join in self.joins.iter_mut().filter(|join| join.table == table) {
            join.kind = JoinKind::Left;
        }
    }

    pub fn where_constraint(&mut self, constraint: Constraint) -> Result<&mut Self, FilterError> {
        validate_column(&constraint.column)?;
        if let Predicate::Compare(operator, SqlValue::Null) = &constraint.predicate {
            if !matches!(operator, Operator::Eq | Operator::Neq) {
                return Err(FilterError::NullComparison {
                    column: constraint.column.clone(),
                    operator: operator.to_sql(),
                });
            }
        }
        self.conditions.push(constraint);
        Ok(self)
    }

    pub fn order_by(&mut self, column: &str, direction: SortDirection) -> Result<&mut Self, FilterError> {
        validate_column(column)?;
        self.order.push((column.to_string(), direction));
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::NegativeLimit(limit));
        }
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = Some(offset.max(0));
        self
    }

    pub fn to_sql(&self) -> SqlResult {
        let mut params = Params::default();
        let columns = self.render_columns();
        let mut sql = format!("SELECT {} FROM {}", columns, DatabaseManager::quote_identifier(&self.table));
        sql.push_str(&self.render_joins());
        sql.push_str(&self.render_where(&mut params));

        if !self.order.is_empty() {
            let parts: Vec<String> = self
                .order
                .iter()
                .map(|(column, dir)| format!("{} {}", quote_column(&self.table, column), dir.to_sql()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", parts.join(", ")));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        SqlResult {
            query: sql,
            params: params.values,
        }
    }

    /// Wraps the select so every row comes back as one JSON object
    pub fn to_json_sql(&self) -> SqlResult {
        let inner = self.to_sql();
        SqlResult {
            query: format!("SELECT row_to_json(t) AS row FROM ({}) t", inner.query),
            params: inner.params,
        }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let mut params = Params::default();
        let mut sql = format!(
            "SELECT COUNT(*) AS count FROM {}",
            DatabaseManager::quote_identifier(&self.table)
        );
        sql.push_str(&self.render_joins());
        sql.push_str(&self.render_where(&mut params));
        SqlResult {
            query: sql,
            params: params.values,
        }
    }

    pub fn to_delete_sql(&self) -> SqlResult {
        let mut params = Params::default();
        let mut sql = format!("DELETE FROM {}", DatabaseManager::quote_identifier(&self.table));
        sql.push_str(&self.render_scoped_where(&mut params));
        SqlResult {
            query: sql,
            params: params.values,
        }
    }

    pub fn to_update_sql(&self, values: &[(String, SqlValue)]) -> Result<SqlResult, FilterError> {
        let mut params = Params::default();
        let mut assignments = Vec::with_capacity(values.len());
        for (column, value) in values {
            validate_identifier(column).map_err(|_| FilterError::InvalidColumn(column.clone()))?;
            assignments.push(format!(
                "{} = {}",
                DatabaseManager::quote_identifier(column),
                params.param(value)
            ));
        }
        let mut sql = format!(
            "UPDATE {} SET {}",
            DatabaseManager::quote_identifier(&self.table),
            assignments.join(", ")
        );
        sql.push_str(&self.render_scoped_where(&mut params));
        Ok(SqlResult {
            query: sql,
            params: params.values,
        })
    }

    fn render_columns(&self) -> String {
        if self.columns.is_empty() {
            return format!("{}.*", DatabaseManager::quote_identifier(&self.table));
        }
        let parts: Vec<String> = self
            .columns
            .iter()
            .map(|expr| match expr {
                SelectExpr::All(table) => format!("{}.*", DatabaseManager::quote_identifier(table)),
                SelectExpr::Column(column) => quote_column(&self.table, column),
                SelectExpr::Aliased { column, alias } => format!(
                    "{} AS {}",
                    quote_column(&self.table, column),
                    DatabaseManager::quote_identifier(alias)
                ),
            })
            .collect();
        parts.join(", ")
    }

    fn render_joins(&self) -> String {
        self.joins
            .iter()
            .map(|join| {
                format!(
                    " {} {} ON {} = {}",
                    join.kind.to_sql(),
                    DatabaseManager::quote_identifier(&join.table),
                    quote_column(&self.table, &join.left),
                    quote_column(&join.table, &join.right)
                )
            })
            .collect()
    }

    fn render_where(&self, params: &mut Params) -> String {
        if self.conditions.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|c| render_condition(&self.table, c, params))
            .collect();
        format!(" WHERE {}", parts.join(" AND "))
    }

    /// WHERE clause for DELETE/UPDATE. Joined constraints go through an id sub-select.
    fn render_scoped_where(&self, params: &mut Params) -> String {
        if self.joins.is_empty() {
            return self.render_where(params);
        }
        let table = DatabaseManager::quote_identifier(&self.table);
        format!(
            " WHERE {}.\"id\" IN (SELECT {}.\"id\" FROM {}{}{})",
            table,
            table,
            table,
            self.render_joins(),
            self.render_where(params)
        )
    }
}

/// What happens when an insert hits a unique constraint
#[derive(Debug, Clone, PartialEq)]
pub enum OnConflict {
    Nothing,
    Update {
        keys: Vec<String>,
        set: Vec<(String, SqlValue)>,
    },
}

#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: String,
    values: Vec<(String, SqlValue)>,
    conflict: Option<OnConflict>,
}

impl InsertQuery {
    pub fn new(table: impl Into<String>, values: Vec<(String, SqlValue)>) -> Result<Self, FilterError> {
        let table = table.into();
        validate_identifier(&table)?;
        for (column, _) in &values {
            validate_identifier(column).map_err(|_| FilterError::InvalidColumn(column.clone()))?;
        }
        Ok(Self {
            table,
            values,
            conflict: None,
        })
    }

    /// `ON CONFLICT (keys) DO UPDATE SET ...`, or `DO NOTHING` when either list is empty
    pub fn on_conflict(mut self, keys: &[&str], set: Vec<(String, SqlValue)>) -> Result<Self, FilterError> {
        for column in keys.iter().copied().chain(set.iter().map(|(c, _)| c.as_str())) {
            validate_identifier(column).map_err(|_| FilterError::InvalidColumn(column.to_string()))?;
        }
        self.conflict = Some(if keys.is_empty() || set.is_empty() {
            OnConflict::Nothing
        } else {
            OnConflict::Update {
                keys: keys.iter().map(|k| k.to_string()).collect(),
                set,
            }
        });
        Ok(self)
    }

    /// Name of every bound parameter in order: the column for inserted values and
    /// `conflict_<column>` for update-clause values, so the two never collide.
    pub fn bind_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .values
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(c, _)| c.clone())
            .collect();
        if let Some(OnConflict::Update { set, .. }) = &self.conflict {
            names.extend(
                set.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(c, _)| format!("conflict_{}", c)),
            );
        }
        names
    }

    pub fn to_sql(&self) -> SqlResult {
        let mut params = Params::default();
        let columns: Vec<String> = self
            .values
            .iter()
            .map(|(c, _)| DatabaseManager::quote_identifier(c))
            .collect();
        let placeholders: Vec<String> = self.values.iter().map(|(_, v)| params.param(v)).collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            DatabaseManager::quote_identifier(&self.table),
            columns.join(", "),
            placeholders.join(", ")
        );

        match &self.conflict {
            None => {}
            Some(OnConflict::Nothing) => sql.push_str(" ON CONFLICT DO NOTHING"),
            Some(OnConflict::Update { keys, set }) => {
                let keys: Vec<String> = keys.iter().map(|k| DatabaseManager::quote_identifier(k)).collect();
                let updates: Vec<String> = set
                    .iter()
                    .map(|(c, v)| format!("{} = {}", DatabaseManager::quote_identifier(c), params.param(v)))
                    .collect();
                sql.push_str(&format!(
                    " ON CONFLICT ({}) DO UPDATE SET {}",
                    keys.join(", "),
                    updates.join(", ")
                ));
            }
        }
        sql.push_str(" RETURNING \"id\"");

        SqlResult {
            query: sql,
            params: params.values,
        }
    }
}
