//! gam-adapter-postgres - PostgreSQL 适配器

mod connection;
mod policy_repository;
mod schema;

pub use connection::*;
pub use policy_repository::*;
pub use schema::*;
