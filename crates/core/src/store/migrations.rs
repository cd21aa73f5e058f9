//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.
//! Each migration is a SQL batch that transforms the schema.

use tokio_rusqlite::{Connection, params, rusqlite};

use crate::Error;

/// Migration list: (version, SQL).
///
/// Migrations must be applied in order. All of them are idempotent using
/// CREATE ... IF NOT EXISTS, so a half-recorded run can be repeated.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_documents.sql"))];

/// Run any pending migrations.
///
/// Creates the `_migrations` table if it doesn't exist, checks the current
/// version, and applies each newer migration inside its own transaction.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` if a migration SQL fails to execute.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    let applied = conn
        .call(|conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                )",
                [],
            )?;

            let current: i64 =
                conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

            let mut applied = 0;
            for (version, sql) in MIGRATIONS {
                if *version > current {
                    let tx = conn.transaction()?;
                    tx.execute_batch(sql)?;
                    tx.execute(
                        "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                        params![version, chrono::Utc::now().to_rfc3339()],
                    )?;
                    tx.commit()?;
                    applied += 1;
                }
            }

            Ok(applied)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::ConnectionClosed => Error::Closed,
            other => Error::MigrationFailed(other.to_string()),
        })?;

    if applied > 0 {
        tracing::info!(applied, "schema migrations applied");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn index_names(conn: &Connection) -> Vec<String> {
        conn.call(|conn| {
            let mut stmt =
                conn.prepare("SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='documents' ORDER BY name")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let has_documents: bool = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='documents')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();

        assert!(has_documents);
    }

    #[tokio::test]
    async fn test_migrations_version_tracking() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let count: i64 = conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0)))
            .await
            .unwrap();

        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_migrations_create_query_indexes() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let names = index_names(&conn).await;
        for expected in [
            "idx_documents_crawled_at",
            "idx_documents_normalized_url",
            "idx_documents_status",
            "idx_documents_updated_at",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing index {expected}: {names:?}");
        }
    }

    #[tokio::test]
    async fn test_revisit_query_uses_index() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let plan: Vec<String> = conn
            .call(|conn| {
                let mut stmt = conn.prepare("EXPLAIN QUERY PLAN SELECT id FROM documents WHERE updated_at < ?1")?;
                let rows = stmt.query_map([0i64], |row| row.get::<_, String>(3))?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .unwrap();

        assert!(plan.iter().any(|line| line.contains("idx_documents_updated_at")), "plan: {plan:?}");
    }
}
