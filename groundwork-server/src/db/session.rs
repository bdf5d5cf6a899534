//! Scoped unit of work against the relational store

use std::fmt;

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::trace;

use super::DbError;

/// One logical unit of work.
///
/// A transaction begins on first use. [`Session::commit`] and
/// [`Session::rollback`] end it; the next use begins a fresh one. Dropping a
/// session with an open transaction rolls it back, there is no implicit commit.
///
/// Sessions are not shared between concurrent operations.
pub struct Session {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl Session {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }

    /// Whether a transaction is currently open
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Connection bound to the current transaction, beginning one if needed.
    pub async fn connection(&mut self) -> Result<&mut PgConnection, DbError> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                trace!("beginning transaction");
                self.pool.begin().await?
            }
        };
        Ok(&mut **self.tx.insert(tx))
    }

    /// Commit the current transaction. No-op when none is open.
    pub async fn commit(&mut self) -> Result<(), DbError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            trace!("transaction committed");
        }
        Ok(())
    }

    /// Roll back the current transaction. No-op when none is open.
    pub async fn rollback(&mut self) -> Result<(), DbError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
            trace!("transaction rolled back");
        }
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
