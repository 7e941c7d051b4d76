//! SQLite persistence backends

mod mirror;
mod schema;

pub use mirror::SqliteMirror;
pub use schema::{SCHEMA_VERSION, check_version, init_schema};
