use sqlx::PgPool;
use std::sync::Arc;

use crate::database::models::{
    Attribute, Candidate, Company, Credential, Feature, Flag, Gate, Hook, Member, Permission, Process, Raw, Review,
    RoleAccess, Score, Service, Setting, Source, Tag, Task, User, Warning,
};
use crate::database::repository::{DbRepository, Repository};

/// One repository per entity, shared by handlers and listeners
#[derive(Clone)]
pub struct Repositories {
    pub companies: Arc<dyn Repository<Company>>,
    pub credentials: Arc<dyn Repository<Credential>>,
    pub users: Arc<dyn Repository<User>>,
    pub hooks: Arc<dyn Repository<Hook>>,
    pub services: Arc<dyn Repository<Service>>,
    pub settings: Arc<dyn Repository<Setting>>,
    pub members: Arc<dyn Repository<Member>>,
    pub role_access: Arc<dyn Repository<RoleAccess>>,
    pub attributes: Arc<dyn Repository<Attribute>>,
    pub features: Arc<dyn Repository<Feature>>,
    pub scores: Arc<dyn Repository<Score>>,
    pub sources: Arc<dyn Repository<Source>>,
    pub candidates: Arc<dyn Repository<Candidate>>,
    pub tags: Arc<dyn Repository<Tag>>,
    pub raw: Arc<dyn Repository<Raw>>,
    pub gates: Arc<dyn Repository<Gate>>,
    pub reviews: Arc<dyn Repository<Review>>,
    pub warnings: Arc<dyn Repository<Warning>>,
    pub flags: Arc<dyn Repository<Flag>>,
    pub processes: Arc<dyn Repository<Process>>,
    pub tasks: Arc<dyn Repository<Task>>,
    pub permissions: Arc<dyn Repository<Permission>>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            companies: Arc::new(DbRepository::new(pool.clone())),
            credentials: Arc::new(DbRepository::new(pool.clone())),
            users: Arc::new(DbRepository::new(pool.clone())),
            hooks: Arc::new(DbRepository::new(pool.clone())),
            services: Arc::new(DbRepository::new(pool.clone())),
            settings: Arc::new(DbRepository::new(pool.clone())),
            members: Arc::new(DbRepository::new(pool.clone())),
            role_access: Arc::new(DbRepository::new(pool.clone())),
            attributes: Arc::new(DbRepository::new(pool.clone())),
            features: Arc::new(DbRepository::new(pool.clone())),
            scores: Arc::new(DbRepository::new(pool.clone())),
            sources: Arc::new(DbRepository::new(pool.clone())),
            candidates: Arc::new(DbRepository::new(pool.clone())),
            tags: Arc::new(DbRepository::new(pool.clone())),
            raw: Arc::new(DbRepository::new(pool.clone())),
            gates: Arc::new(DbRepository::new(pool.clone())),
            reviews: Arc::new(DbRepository::new(pool.clone())),
            warnings: Arc::new(DbRepository::new(pool.clone())),
            flags: Arc::new(DbRepository::new(pool.clone())),
            processes: Arc::new(DbRepository::new(pool.clone())),
            tasks: Arc::new(DbRepository::new(pool.clone())),
            permissions: Arc::new(DbRepository::new(pool)),
        }
    }
}
