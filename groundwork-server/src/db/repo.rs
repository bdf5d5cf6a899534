//! Generic record repository
//!
//! Key-based CRUD for any [`Record`]:
//! - reads run in the session's current transaction
//! - create/update/delete commit their own unit of work
//! - no optimistic concurrency; concurrent updates are last-write-wins
//! - `get_all` is an unbounded full scan with no pagination

use std::fmt;
use std::marker::PhantomData;

use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use super::record::column_type;
use super::{DbError, FieldValue, Fields, Record, Session};

/// CRUD access for one record shape
pub struct Repository<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Repository<R> {
    pub const fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }

    /// Fetch a single record by primary key.
    pub async fn get_by_id(&self, session: &mut Session, key: R::Key) -> Result<Option<R>, DbError> {
        let sql = select_by_key_sql::<R>();
        let record = sqlx::query_as::<Postgres, R>(&sql)
            .bind(key)
            .fetch_optional(session.connection().await?)
            .await?;
        Ok(record)
    }

    /// Fetch every record in the table, unordered.
    pub async fn get_all(&self, session: &mut Session) -> Result<Vec<R>, DbError> {
        let sql = select_all_sql::<R>();
        let records = sqlx::query_as::<Postgres, R>(&sql)
            .fetch_all(session.connection().await?)
            .await?;
        Ok(records)
    }

    /// Insert a record and commit. Returns the stored row, including
    /// server-assigned columns such as generated keys.
    pub async fn create(&self, session: &mut Session, fields: Fields) -> Result<R, DbError> {
        let columns = fields.insert_columns::<R>()?;
        let mut query = insert_query::<R>(columns);
        let record = query
            .build_query_as::<R>()
            .fetch_one(session.connection().await?)
            .await?;
        session.commit().await?;

        debug!(table = R::TABLE, "record created");
        Ok(record)
    }

    /// Apply the non-null known fields onto the record with `key` and commit.
    ///
    /// Returns `None` without writing when no such record exists.
    pub async fn update(
        &self,
        session: &mut Session,
        key: R::Key,
        fields: Fields,
    ) -> Result<Option<R>, DbError> {
        let Some(current) = self.get_by_id(session, key.clone()).await? else {
            debug!(table = R::TABLE, ?key, "update skipped, record not found");
            return Ok(None);
        };

        let changes = fields.update_columns::<R>();
        if changes.is_empty() {
            session.commit().await?;
            return Ok(Some(current));
        }

        let mut query = update_query::<R>(key, changes);
        let record = query
            .build_query_as::<R>()
            .fetch_optional(session.connection().await?)
            .await?;
        session.commit().await?;

        debug!(table = R::TABLE, "record updated");
        Ok(record)
    }

    /// Delete by primary key and commit. Returns whether any row was removed.
    pub async fn delete(&self, session: &mut Session, key: R::Key) -> Result<bool, DbError> {
        let sql = delete_sql::<R>();
        let result = sqlx::query(&sql)
            .bind(key)
            .execute(session.connection().await?)
            .await?;
        session.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

impl<R: Record> Default for Repository<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Repository<R> {}

impl<R: Record> fmt::Debug for Repository<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").field("table", &R::TABLE).finish()
    }
}

fn select_by_key_sql<R: Record>() -> String {
    format!("SELECT * FROM {} WHERE {} = $1", R::TABLE, R::PRIMARY_KEY)
}

fn select_all_sql<R: Record>() -> String {
    format!("SELECT * FROM {}", R::TABLE)
}

fn delete_sql<R: Record>() -> String {
    format!("DELETE FROM {} WHERE {} = $1", R::TABLE, R::PRIMARY_KEY)
}

fn insert_query<R: Record>(columns: Vec<(&'static str, FieldValue)>) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("INSERT INTO ");
    query.push(R::TABLE);

    if columns.is_empty() {
        query.push(" DEFAULT VALUES");
    } else {
        let names: Vec<_> = columns.iter().map(|(column, _)| *column).collect();
        query.push(" (").push(names.join(", ")).push(") VALUES (");
        for (i, (column, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                query.push(", ");
            }
            value.push_bind(&mut query, column_type::<R>(column));
        }
        query.push(")");
    }

    query.push(" RETURNING *");
    query
}

fn update_query<R: Record>(
    key: R::Key,
    changes: Vec<(&'static str, FieldValue)>,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE ");
    query.push(R::TABLE).push(" SET ");

    for (i, (column, value)) in changes.into_iter().enumerate() {
        if i > 0 {
            query.push(", ");
        }
        query.push(column).push(" = ");
        value.push_bind(&mut query, column_type::<R>(column));
    }

    query
        .push(" WHERE ")
        .push(R::PRIMARY_KEY)
        .push(" = ")
        .push_bind(key);
    query.push(" RETURNING *");
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::record::tests::Widget;

    #[test]
    fn select_and_delete_statements_use_primary_key() {
        assert_eq!(select_by_key_sql::<Widget>(), "SELECT * FROM widgets WHERE id = $1");
        assert_eq!(select_all_sql::<Widget>(), "SELECT * FROM widgets");
        assert_eq!(delete_sql::<Widget>(), "DELETE FROM widgets WHERE id = $1");
    }

    #[test]
    fn insert_binds_values_and_inlines_null() {
        let columns = Fields::new()
            .with("name", "a")
            .with("note", None::<String>)
            .with("quantity", 3)
            .insert_columns::<Widget>()
            .unwrap();

        let query = insert_query::<Widget>(columns);
        assert_eq!(
            query.sql(),
            "INSERT INTO widgets (name, note, quantity) VALUES ($1, NULL, $2) RETURNING *"
        );
    }

    #[test]
    fn empty_insert_uses_default_values() {
        let query = insert_query::<Widget>(Vec::new());
        assert_eq!(query.sql(), "INSERT INTO widgets DEFAULT VALUES RETURNING *");
    }

    #[test]
    fn update_sets_only_supplied_columns() {
        let changes = Fields::new()
            .with("name", "b")
            .with("note", None::<String>)
            .update_columns::<Widget>();

        let query = update_query::<Widget>(42, changes);
        assert_eq!(
            query.sql(),
            "UPDATE widgets SET name = $1 WHERE id = $2 RETURNING *"
        );
    }

    #[test]
    fn typed_columns_are_cast_on_write() {
        #[derive(Debug, sqlx::FromRow)]
        struct Event {
            #[allow(dead_code)]
            id: i64,
        }

        impl Record for Event {
            type Key = i64;
            const TABLE: &'static str = "events";
            const COLUMNS: &'static [&'static str] = &["id", "ref_id", "at", "label"];
            const COLUMN_TYPES: &'static [(&'static str, &'static str)] =
                &[("ref_id", "uuid"), ("at", "timestamptz")];
        }

        let fields = Fields::from_json(serde_json::json!({
            "ref_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "at": "2026-01-01T00:00:00Z",
            "label": "launch",
        }))
        .unwrap();

        let query = insert_query::<Event>(fields.clone().insert_columns::<Event>().unwrap());
        assert_eq!(
            query.sql(),
            "INSERT INTO events (at, label, ref_id) VALUES \
             (CAST($1 AS timestamptz), $2, CAST($3 AS uuid)) RETURNING *"
        );

        let query = update_query::<Event>(7, fields.with("at", None::<String>).update_columns::<Event>());
        assert_eq!(
            query.sql(),
            "UPDATE events SET label = $1, ref_id = CAST($2 AS uuid) WHERE id = $3 RETURNING *"
        );
    }

    #[test]
    fn custom_primary_key_is_honoured() {
        #[derive(Debug, sqlx::FromRow)]
        struct Account {
            #[allow(dead_code)]
            account_id: uuid::Uuid,
        }

        impl Record for Account {
            type Key = uuid::Uuid;
            const TABLE: &'static str = "billing.accounts";
            const PRIMARY_KEY: &'static str = "account_id";
            const COLUMNS: &'static [&'static str] = &["account_id", "email"];
        }

        assert_eq!(
            select_by_key_sql::<Account>(),
            "SELECT * FROM billing.accounts WHERE account_id = $1"
        );

        let changes = Fields::new().with("email", "a@example.com").update_columns::<Account>();
        let query = update_query::<Account>(uuid::Uuid::nil(), changes);
        assert_eq!(
            query.sql(),
            "UPDATE billing.accounts SET email = $1 WHERE account_id = $2 RETURNING *"
        );
    }
}
