//! `PostgreSQL` reset backend over the shared SQLx pool.

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{ADMIN_ROLE, PROFILES_TABLE, RESET_TABLES, ResetBackend, ResetError, ResetReport, TableReset};

#[derive(Clone)]
pub struct PgResetBackend {
    pool: PgPool,
}

impl PgResetBackend {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ResetBackend for PgResetBackend {
    async fn stored_role(&self, user_id: Uuid) -> Result<Option<String>, ResetError> {
        let role: Option<Option<String>> = sqlx::query_scalar("SELECT role::text FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role.flatten())
    }

    async fn reset(&self, caller: Uuid) -> Result<ResetReport, ResetError> {
        let mut tx = self.pool.begin().await?;
        let mut report = ResetReport::default();

        for table in RESET_TABLES {
            // Optional tables may not exist in every deployment.
            let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
                .bind(format!("public.{table}"))
                .fetch_one(&mut *tx)
                .await?;
            if !exists {
                debug!(table, "reset: table absent, skipped");
                continue;
            }

            let result = if table == PROFILES_TABLE {
                sqlx::query("DELETE FROM profiles WHERE id <> $1 AND role::text IS DISTINCT FROM $2")
                    .bind(caller)
                    .bind(ADMIN_ROLE)
                    .execute(&mut *tx)
                    .await?
            } else {
                let sql = format!(r#"DELETE FROM "{table}""#);
                sqlx::query(&sql).execute(&mut *tx).await?
            };
            debug!(table, deleted = result.rows_affected(), "reset: table cleared");
            report.tables.push(TableReset { table, deleted: result.rows_affected() });
        }

        tx.commit().await?;
        Ok(report)
    }
}
