pub mod cached;
pub mod dynamic;
pub mod manager;
pub mod mapping;
pub mod models;
pub mod query_builder;
pub mod registry;
pub mod relation;
pub mod repository;
pub mod value;

pub use manager::{DatabaseError, DatabaseManager};
pub use registry::Repositories;
pub use repository::{DbRepository, Page, Pagination, Repository};
pub use value::SqlValue;
