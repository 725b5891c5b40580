//! # Sluice
//!
//! Structured query descriptors compiled to dialect-correct PostgreSQL and
//! executed transactionally on the `may` runtime.
//!
//! Callers describe operations as [`Select`]/[`Insert`]/[`Update`]/[`Delete`]
//! descriptors against a [`ModelRegistry`]; [`Database::run`] compiles them to
//! parameterized SQL, executes inside one transaction per logical call, and
//! maps rows back into [`Record`]s.

pub mod compiler;
pub mod config;
pub mod connection;
mod dialect;
pub mod engine;
pub mod error;
pub mod executor;
mod macros;
pub mod model;
mod params;
pub mod pool;
pub mod query;
pub mod record;
mod resolver;
pub mod transaction;

pub use compiler::{compile, CompiledStatement, StatementKind};
pub use config::DatabaseConfig;
pub use engine::{Database, QueryOutcome};
pub use error::SluiceError;
pub use executor::{ClientExecutor, SqlExecutor};
pub use model::{ColumnDef, ColumnType, DefaultRule, EntityDef, ModelRegistry};
pub use pool::{ConnectionPool, PooledClient};
pub use query::{
    CompareOp, Delete, Insert, Limit, Predicate, QueryDescriptor, Select, SortOrder, Update,
};
pub use record::Record;
pub use transaction::{IsolationLevel, Transaction};

// The bind/result value type; descriptors and records use it directly.
pub use sea_query::Value;
