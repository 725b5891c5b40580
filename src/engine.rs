//! The execution engine: descriptors in, typed results out.
//!
//! [`Database`] owns the connection pool and the model registry, both passed
//! in explicitly rather than looked up from ambient global state. A `run` call is
//! one logical operation: compile (pure), acquire a transaction, execute,
//! shape the result, commit or roll back. Compile-time failures never open a
//! transaction; execution failures always roll back before surfacing.

use crate::compiler::{self, CompiledStatement, StatementKind};
use crate::config::DatabaseConfig;
use crate::dialect;
use crate::error::{classify_backend_detail, SluiceError};
use crate::executor::{ClientExecutor, SqlExecutor};
use crate::model::ModelRegistry;
use crate::params::with_converted_params;
use crate::pool::ConnectionPool;
use crate::query::QueryDescriptor;
use crate::record::Record;
use crate::resolver;
use crate::transaction::{IsolationLevel, Transaction};

/// Result of one executed descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// SELECT: records in statement order
    Rows(Vec<Record>),
    /// Single-row SELECT: the first record, or the absent marker
    Row(Option<Record>),
    /// INSERT: the resolved entries, generated keys included
    Inserted(Vec<Record>),
    /// UPDATE/DELETE: backend-reported affected-row count
    Affected(u64),
}

impl QueryOutcome {
    /// Records of a `Rows` outcome
    pub fn rows(self) -> Option<Vec<Record>> {
        match self {
            QueryOutcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Record of a `Row` outcome (`None` both for absent and for other kinds)
    pub fn row(self) -> Option<Record> {
        match self {
            QueryOutcome::Row(row) => row,
            _ => None,
        }
    }

    /// Entries of an `Inserted` outcome
    pub fn inserted(self) -> Option<Vec<Record>> {
        match self {
            QueryOutcome::Inserted(entries) => Some(entries),
            _ => None,
        }
    }

    /// Count of an `Affected` outcome
    pub fn affected(self) -> Option<u64> {
        match self {
            QueryOutcome::Affected(count) => Some(count),
            _ => None,
        }
    }

    /// Number of records or affected rows, across all outcome kinds
    pub fn len(&self) -> usize {
        match self {
            QueryOutcome::Rows(rows) => rows.len(),
            QueryOutcome::Row(row) => usize::from(row.is_some()),
            QueryOutcome::Inserted(entries) => entries.len(),
            QueryOutcome::Affected(count) => *count as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A compiled statement plus the context needed to shape its result
struct Prepared {
    statement: CompiledStatement,
    /// Resolved INSERT entries, returned as the write result
    entries: Vec<Record>,
}

/// Database handle: model registry + connection pool.
///
/// Stateless between calls apart from the pool. Cheap to share by reference
/// across concurrently running callers.
///
/// # Examples
///
/// ```no_run
/// use sluice::{
///     ColumnDef, ColumnType, Database, DatabaseConfig, EntityDef, ModelRegistry, Select,
///     SluiceError,
/// };
///
/// # fn main() -> Result<(), SluiceError> {
/// let registry = ModelRegistry::builder("csw")
///     .entity(
///         EntityDef::new("Beers", "csw_beers")
///             .column(ColumnDef::new("ID", ColumnType::Uuid).key())
///             .column(ColumnDef::new("name", ColumnType::Text).nullable()),
///     )
///     .build()?;
/// let db = Database::connect(&DatabaseConfig::default(), registry)?;
///
/// let beers = db.run(Select::from("Beers"))?;
/// println!("{} beers", beers.len());
/// # Ok(())
/// # }
/// ```
pub struct Database {
    registry: ModelRegistry,
    pool: ConnectionPool,
}

impl Database {
    /// Build the pool and bind it to a model registry.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::ConnectionUnavailable`] when the backend is
    /// unreachable at startup.
    pub fn connect(config: &DatabaseConfig, registry: ModelRegistry) -> Result<Self, SluiceError> {
        let pool = ConnectionPool::connect(config)?;
        Ok(Self { registry, pool })
    }

    /// The bound model registry
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Run one descriptor as its own logical operation.
    ///
    /// Compiles first, so compile-time errors return before any connection is
    /// touched; then executes inside a fresh transaction that commits on
    /// success and rolls back on failure.
    ///
    /// # Errors
    ///
    /// Compile-time: `UnknownEntity`, `UnknownColumn`, `InvalidDescriptor`,
    /// `MissingKeyValue`, `ValueConversion`. Execution-time:
    /// `ConstraintViolation`, `ConnectionUnavailable`, `ExecutionFailure`.
    pub fn run(&self, descriptor: impl Into<QueryDescriptor>) -> Result<QueryOutcome, SluiceError> {
        let prepared = self.prepare(descriptor.into())?;
        self.with_transaction(|tx| self.execute_prepared(&prepared, tx))
    }

    /// Run one descriptor inside an existing transaction.
    ///
    /// Nested calls within a logical operation share the outer transaction;
    /// there are no nested transactions.
    ///
    /// # Errors
    ///
    /// As [`Database::run`]; a failure leaves the outer transaction poisoned
    /// and the enclosing `with_transaction` rolls it back.
    pub fn run_in(
        &self,
        descriptor: impl Into<QueryDescriptor>,
        tx: &Transaction,
    ) -> Result<QueryOutcome, SluiceError> {
        let prepared = self.prepare(descriptor.into())?;
        self.execute_prepared(&prepared, tx)
    }

    /// Run `f` inside one transaction: acquire, BEGIN, commit on `Ok`, roll
    /// back on `Err`, release the connection on every exit path.
    ///
    /// # Errors
    ///
    /// Returns `f`'s error after rollback, or a transaction-control failure.
    pub fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction) -> Result<T, SluiceError>,
    ) -> Result<T, SluiceError> {
        self.with_transaction_isolated(IsolationLevel::ReadCommitted, f)
    }

    /// As [`Database::with_transaction`], with an explicit isolation level
    pub fn with_transaction_isolated<T>(
        &self,
        isolation: IsolationLevel,
        f: impl FnOnce(&Transaction) -> Result<T, SluiceError>,
    ) -> Result<T, SluiceError> {
        let conn = self.pool.acquire()?;
        let tx = Transaction::begin_with_isolation(conn, isolation)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                // Surface the original error; a rollback failure is logged.
                if let Err(rollback_err) = tx.rollback() {
                    log::warn!("rollback after failed operation also failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }

    /// Execute a raw statement outside the descriptor algebra.
    ///
    /// The door for external collaborators (schema deployment, test setup)
    /// that own SQL this adapter does not compile. Runs in autocommit mode on
    /// a pooled connection, not inside a managed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::ExecutionFailure`] when the backend rejects the
    /// statement.
    pub fn execute_raw(&self, sql: &str) -> Result<u64, SluiceError> {
        let conn = self.pool.acquire()?;
        let executor = ClientExecutor::new(conn.client().clone());
        executor.execute(sql, &[])
    }

    /// Resolve and compile; pure, no connection involved
    fn prepare(&self, descriptor: QueryDescriptor) -> Result<Prepared, SluiceError> {
        let prepared = match &descriptor {
            QueryDescriptor::Insert(insert) => {
                let entity = self.registry.entity(insert.entity())?;
                let entries = resolver::resolve(entity, insert.normalized_entries()?)?;
                let statement = compiler::compile_insert(&self.registry, insert, &entries)?;
                Prepared { statement, entries }
            }
            other => Prepared {
                statement: compiler::compile(&self.registry, other)?,
                entries: Vec::new(),
            },
        };
        log::debug!("compiled statement: {}", prepared.statement);
        Ok(prepared)
    }

    fn execute_prepared(
        &self,
        prepared: &Prepared,
        tx: &Transaction,
    ) -> Result<QueryOutcome, SluiceError> {
        let statement = &prepared.statement;
        let entity_name = statement.kind().entity();
        match statement.kind() {
            StatementKind::Select {
                entity,
                columns,
                single_row,
            } => {
                let entity = self.registry.entity(entity)?;
                let projection = columns
                    .iter()
                    .map(|name| entity.require_column(name))
                    .collect::<Result<Vec<_>, _>>()?;
                let rows = with_converted_params(statement.binds(), |params| {
                    tx.query_all(statement.sql(), params)
                })
                .map_err(|e| reclassify(entity_name, e))?;
                let mut records = Vec::with_capacity(rows.len());
                for row in &rows {
                    records.push(dialect::decode_row(&projection, row)?);
                }
                if *single_row {
                    Ok(QueryOutcome::Row(records.into_iter().next()))
                } else {
                    Ok(QueryOutcome::Rows(records))
                }
            }
            StatementKind::Insert { .. } => {
                with_converted_params(statement.binds(), |params| {
                    tx.execute(statement.sql(), params)
                })
                .map_err(|e| reclassify(entity_name, e))?;
                // Value-identity result: the resolved entries, one per row
                // written, rather than the backend's bare count.
                Ok(QueryOutcome::Inserted(prepared.entries.clone()))
            }
            StatementKind::Update { .. } | StatementKind::Delete { .. } => {
                let affected = with_converted_params(statement.binds(), |params| {
                    tx.execute(statement.sql(), params)
                })
                .map_err(|e| reclassify(entity_name, e))?;
                Ok(QueryOutcome::Affected(affected))
            }
        }
    }
}

/// Re-classify a backend execution failure with entity context, so constraint
/// rejections surface as `ConstraintViolation`
fn reclassify(entity: &str, err: SluiceError) -> SluiceError {
    match err {
        SluiceError::ExecutionFailure { detail } => classify_backend_detail(entity, detail),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let rows = QueryOutcome::Rows(vec![Record::new()]);
        assert_eq!(rows.len(), 1);
        assert!(rows.rows().is_some());

        let absent = QueryOutcome::Row(None);
        assert_eq!(absent.len(), 0);
        assert!(absent.is_empty());

        let affected = QueryOutcome::Affected(3);
        assert_eq!(affected.len(), 3);
        assert_eq!(affected.affected(), Some(3));
    }

    #[test]
    fn test_reclassify_tags_constraint_violations() {
        let err = reclassify(
            "Beers",
            SluiceError::ExecutionFailure {
                detail: "db error: ERROR: duplicate key value violates unique constraint \"beers_pkey\""
                    .to_string(),
            },
        );
        assert!(matches!(err, SluiceError::ConstraintViolation { .. }));

        let err = reclassify(
            "Beers",
            SluiceError::ExecutionFailure {
                detail: "db error: ERROR: relation does not exist".to_string(),
            },
        );
        assert!(matches!(err, SluiceError::ExecutionFailure { .. }));

        let err = reclassify(
            "Beers",
            SluiceError::ConnectionUnavailable { detail: "timeout".to_string() },
        );
        assert!(matches!(err, SluiceError::ConnectionUnavailable { .. }));
    }
}
