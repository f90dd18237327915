use crate::database::manager::DatabaseError;
use crate::database::query_builder::{Join, JoinKind, SelectQuery};
use crate::database::value::SqlValue;
use crate::filter::types::{Constraint, Operator, Predicate};
use crate::optimus::Optimus;

/// `table.foreign_key` points at `relation_table.key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManyToOne {
    pub name: &'static str,
    pub table: &'static str,
    pub foreign_key: &'static str,
    pub key: &'static str,
    /// Rows may exist without the related row; joins become LEFT
    pub nullable: bool,
    /// Related columns selected with every read as `<name>.<column>`. Empty disables hydration.
    pub hydrate: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    ManyToOne(ManyToOne),
}

impl Relation {
    pub fn name(&self) -> &'static str {
        match self {
            Relation::ManyToOne(r) => r.name,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Relation::ManyToOne(r) => r.table,
        }
    }

    pub fn foreign_key(&self) -> &'static str {
        match self {
            Relation::ManyToOne(r) => r.foreign_key,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Relation::ManyToOne(r) => r.key,
        }
    }

    pub fn hydrates(&self) -> bool {
        !self.hydrate_columns().is_empty()
    }

    pub fn hydrate_columns(&self) -> &'static [&'static str] {
        match self {
            Relation::ManyToOne(r) => r.hydrate,
        }
    }

    /// The join that reads this relation alongside `base_table`
    pub fn join(&self, base_table: &str) -> Join {
        match self {
            Relation::ManyToOne(r) => Join {
                kind: if r.nullable { JoinKind::Left } else { JoinKind::Inner },
                table: r.table.to_string(),
                left: format!("{}.{}", base_table, r.foreign_key),
                right: format!("{}.{}", r.table, r.key),
            },
        }
    }

    /// Idempotent join insertion, detected by table name
    pub fn join_with(&self, query: &mut SelectQuery) -> Result<(), DatabaseError> {
        if query.has_join(self.table()) {
            return Ok(());
        }
        let join = self.join(query.table());
        query.join(join)?;
        Ok(())
    }

    pub fn has_join_with(&self, query: &SelectQuery) -> bool {
        query.has_join(self.table())
    }

    /// Constrain `query` on `column` of this relation.
    ///
    /// Constraining the relation key itself is satisfied by the foreign key, so no join is
    /// needed unless the relation hydrates. A key value of `0` (or an id whose obfuscated
    /// form is `0`) means "rows without this relation": `fk IS NULL` with any join relaxed
    /// to LEFT.
    pub fn constrain(
        &self,
        query: &mut SelectQuery,
        column: &str,
        predicate: Predicate,
        optimus: &Optimus,
    ) -> Result<(), DatabaseError> {
        match self {
            Relation::ManyToOne(r) => {
                let base_table = query.table().to_string();
                let on_key = column == r.key;

                let mut required = if !on_key || self.hydrates() {
                    Some(JoinKind::Inner)
                } else {
                    None
                };

                let mut predicate = predicate;
                if on_key && Self::is_zero_sentinel(&predicate, optimus) {
                    predicate = Predicate::Compare(Operator::Eq, SqlValue::Null);
                    if required.is_some() {
                        required = Some(JoinKind::Left);
                    }
                }

                match (query.join_kind(r.table), required) {
                    // An existing join of another kind, or one this constraint does not need,
                    // must not drop rows the other constraints allow
                    (Some(existing), kind) if kind != Some(existing) => query.relax_join(r.table),
                    (None, Some(kind)) => {
                        query.join(Join {
                            kind,
                            table: r.table.to_string(),
                            left: format!("{}.{}", base_table, r.foreign_key),
                            right: format!("{}.{}", r.table, r.key),
                        })?;
                    }
                    _ => {}
                }

                let target = if on_key {
                    format!("{}.{}", base_table, r.foreign_key)
                } else {
                    format!("{}.{}", r.table, column)
                };
                query.where_constraint(Constraint {
                    column: target,
                    predicate,
                })?;
                Ok(())
            }
        }
    }

    fn is_zero_sentinel(predicate: &Predicate, optimus: &Optimus) -> bool {
        match predicate {
            Predicate::Compare(_, SqlValue::Int(value)) => {
                *value == 0 || optimus.encode(*value).map(|encoded| encoded == 0).unwrap_or(false)
            }
            _ => false,
        }
    }
}
