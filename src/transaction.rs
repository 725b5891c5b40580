//! Transactions over pooled connections.
//!
//! One transaction per logical operation: acquired at call start, committed on
//! success, rolled back on failure, and rolled back from `Drop` if abandoned
//! mid-flight, so no exit path leaks an open transaction. Statements issued
//! within one transaction execute in issue order. There are no nested
//! transactions; nested calls reuse the same `Transaction`.

use crate::error::SluiceError;
use crate::executor::SqlExecutor;
use crate::pool::PooledClient;
use may_postgres::types::ToSql;
use may_postgres::Row;

/// Transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Read committed (PostgreSQL default)
    ReadCommitted,
    /// Repeatable read
    RepeatableRead,
    /// Serializable
    Serializable,
}

impl IsolationLevel {
    fn to_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// An open transaction holding its pooled connection.
///
/// The connection returns to the pool when the transaction is committed,
/// rolled back, or dropped. Dropping without an explicit commit/rollback
/// issues a ROLLBACK first.
///
/// # Examples
///
/// ```no_run
/// use sluice::{Database, SqlExecutor, SluiceError};
///
/// # fn demo(db: &Database) -> Result<(), SluiceError> {
/// db.with_transaction(|tx| {
///     tx.execute("UPDATE csw_beers SET abv = $1 WHERE name = $2", &[&4.9f64, &"Lagerbier Hell"])?;
///     Ok(())
/// })
/// # }
/// ```
pub struct Transaction {
    conn: PooledClient,
    closed: bool,
}

impl Transaction {
    /// Begin a transaction with the given isolation level
    pub(crate) fn begin_with_isolation(
        conn: PooledClient,
        isolation: IsolationLevel,
    ) -> Result<Self, SluiceError> {
        conn.client()
            .execute("BEGIN", &[])
            .map_err(|e| SluiceError::ExecutionFailure { detail: e.to_string() })?;
        if isolation != IsolationLevel::ReadCommitted {
            let isolation_sql = format!("SET TRANSACTION ISOLATION LEVEL {}", isolation.to_sql());
            conn.client()
                .execute(isolation_sql.as_str(), &[])
                .map_err(|e| SluiceError::ExecutionFailure { detail: e.to_string() })?;
        }
        Ok(Self { conn, closed: false })
    }

    /// Commit the transaction and release the connection.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::ExecutionFailure`] when COMMIT itself fails; the
    /// connection is still released.
    pub(crate) fn commit(mut self) -> Result<(), SluiceError> {
        self.closed = true;
        self.conn
            .client()
            .execute("COMMIT", &[])
            .map(|_| ())
            .map_err(|e| SluiceError::ExecutionFailure { detail: e.to_string() })
    }

    /// Roll back the transaction and release the connection.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::ExecutionFailure`] when ROLLBACK itself fails;
    /// the connection is still released.
    pub(crate) fn rollback(mut self) -> Result<(), SluiceError> {
        self.closed = true;
        self.conn
            .client()
            .execute("ROLLBACK", &[])
            .map(|_| ())
            .map_err(|e| SluiceError::ExecutionFailure { detail: e.to_string() })
    }

    /// Whether the transaction has been committed or rolled back
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        // Abandoned mid-flight (early return, panic unwind): roll back before
        // the connection goes back to the pool.
        if !self.closed {
            if let Err(e) = self.conn.client().execute("ROLLBACK", &[]) {
                log::warn!("rollback of abandoned transaction failed: {e}");
            }
        }
    }
}

impl SqlExecutor for Transaction {
    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<u64, SluiceError> {
        if self.closed {
            return Err(SluiceError::ExecutionFailure {
                detail: "transaction already closed".to_string(),
            });
        }
        self.conn
            .client()
            .execute(sql, params)
            .map_err(|e| SluiceError::ExecutionFailure { detail: e.to_string() })
    }

    fn query_all(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, SluiceError> {
        if self.closed {
            return Err(SluiceError::ExecutionFailure {
                detail: "transaction already closed".to_string(),
            });
        }
        self.conn
            .client()
            .query(sql, params)
            .map_err(|e| SluiceError::ExecutionFailure { detail: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_to_sql() {
        assert_eq!(IsolationLevel::ReadCommitted.to_sql(), "READ COMMITTED");
        assert_eq!(IsolationLevel::RepeatableRead.to_sql(), "REPEATABLE READ");
        assert_eq!(IsolationLevel::Serializable.to_sql(), "SERIALIZABLE");
    }
}
