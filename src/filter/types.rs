use std::collections::BTreeMap;

use crate::database::value::SqlValue;

/// Raw query-string parameters of a list request
pub type QueryParams = BTreeMap<String, String>;

/// How the value of a filterable key is cast before it becomes a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Date,
    Boolean,
    Integer,
    Decoded,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    ILike,
}

impl Operator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::ILike => "ILIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare(Operator, SqlValue),
    Between(SqlValue, SqlValue),
    In(Vec<SqlValue>),
    /// `column->>'field' = value` on a jsonb column
    JsonText { field: String, value: SqlValue },
    /// `column @> value` on a jsonb column
    Contains(SqlValue),
}

/// One `column <predicate>` term. The column is either a base-table column, a bare foreign
/// key, or a dotted `relation.column`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub column: String,
    pub predicate: Predicate,
}

impl Constraint {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<SqlValue>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::Compare(operator, value.into()),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, Operator::Eq, SqlValue::Null)
    }

    pub fn between(column: impl Into<String>, low: impl Into<SqlValue>, high: impl Into<SqlValue>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::Between(low.into(), high.into()),
        }
    }

    pub fn any_of(column: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::In(values),
        }
    }

    pub fn json_text(column: impl Into<String>, field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::JsonText {
                field: field.into(),
                value: value.into(),
            },
        }
    }

    pub fn contains(column: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            column: column.into(),
            predicate: Predicate::Contains(SqlValue::Json(value)),
        }
    }

    /// The compared value when this is a plain comparison
    pub fn value(&self) -> Option<&SqlValue> {
        match &self.predicate {
            Predicate::Compare(_, value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlValue>,
}
