use crate::database::manager::DatabaseError;
use crate::database::relation::Relation;
use crate::filter::types::FilterType;

/// Static description of one table: what may be filtered and ordered through the query
/// string and which relations can be joined.
#[derive(Debug)]
pub struct Mapping {
    pub table: &'static str,
    pub filterable: &'static [(&'static str, FilterType)],
    pub orderable: &'static [&'static str],
    pub relations: &'static [Relation],
}

impl Mapping {
    pub fn relation(&self, name: &str) -> Result<&Relation, DatabaseError> {
        self.relations
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| DatabaseError::UnknownRelation {
                relation: name.to_string(),
                table: self.table.to_string(),
            })
    }

    pub fn relation_by_foreign_key(&self, column: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.foreign_key() == column)
    }

    pub fn hydrated_relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(|r| r.hydrates())
    }
}
