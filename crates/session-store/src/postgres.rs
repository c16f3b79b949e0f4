use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::{Result, SessionKey, SessionStore, StateBag};

/// PostgreSQL-backed session store.
///
/// Sessions live in a single `sessions` table as JSONB. `merge` relies on the
/// JSONB `||` operator, which performs exactly the shallow merge the
/// [`SessionStore`] contract asks for.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Creates a new PostgreSQL session store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Deletes sessions not written to since `cutoff`.
    ///
    /// Returns the number of deleted sessions.
    pub async fn purge_idle_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE updated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn get(&self, key: &SessionKey) -> Result<StateBag> {
        let state: Option<Value> = sqlx::query_scalar(
            "SELECT state FROM sessions WHERE namespace = $1 AND user_id = $2",
        )
        .bind(key.namespace.as_str())
        .bind(key.user_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match state {
            Some(Value::Object(map)) => map,
            _ => StateBag::new(),
        })
    }

    async fn merge(&self, key: &SessionKey, partial: StateBag) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (namespace, user_id, state, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (namespace, user_id)
            DO UPDATE SET state = sessions.state || EXCLUDED.state, updated_at = NOW()
            "#,
        )
        .bind(key.namespace.as_str())
        .bind(key.user_id.as_i64())
        .bind(Value::Object(partial))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace(&self, key: &SessionKey, full: StateBag) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (namespace, user_id, state, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (namespace, user_id)
            DO UPDATE SET state = EXCLUDED.state, updated_at = NOW()
            "#,
        )
        .bind(key.namespace.as_str())
        .bind(key.user_id.as_i64())
        .bind(Value::Object(full))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
