//! Versioned schema migrations for the SQLite backend

use assetdesk_core::{DeskError, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        statements: &[r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                first_name TEXT,
                last_name TEXT,
                email TEXT,
                department TEXT,
                is_admin INTEGER NOT NULL DEFAULT 0,
                permissions TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            )
            "#],
    },
    Migration {
        version: 2,
        name: "create_assets_and_licenses",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS assets (
                id TEXT PRIMARY KEY,
                asset_tag TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'available',
                serial_number TEXT,
                model TEXT,
                manufacturer TEXT,
                location TEXT,
                assigned_to TEXT,
                purchase_date TEXT,
                purchase_cost REAL,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS licenses (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                license_key TEXT,
                seats INTEGER NOT NULL DEFAULT 1,
                assigned_seats INTEGER NOT NULL DEFAULT 0,
                company TEXT,
                expiration_date TEXT,
                purchase_cost REAL,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        ],
    },
    Migration {
        version: 3,
        name: "create_accessories_and_consumables",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS accessories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                manufacturer TEXT,
                quantity INTEGER NOT NULL DEFAULT 0,
                available_quantity INTEGER NOT NULL DEFAULT 0,
                location TEXT,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS consumables (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                manufacturer TEXT,
                quantity INTEGER NOT NULL DEFAULT 0,
                min_quantity INTEGER NOT NULL DEFAULT 0,
                location TEXT,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        ],
    },
    Migration {
        version: 4,
        name: "index_asset_assignee",
        statements: &["CREATE INDEX IF NOT EXISTS idx_assets_assigned_to ON assets (assigned_to)"],
    },
];

/// Applies `MIGRATIONS` in order, each inside its own transaction
pub struct MigrationRunner<'a> {
    pool: &'a SqlitePool,
    migrations: &'a [Migration],
}

impl<'a> MigrationRunner<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            migrations: MIGRATIONS,
        }
    }

    #[cfg(test)]
    pub fn with_migrations(pool: &'a SqlitePool, migrations: &'a [Migration]) -> Self {
        Self { pool, migrations }
    }

    /// Run pending migrations and return the versions applied this time
    pub async fn run(&self) -> Result<Vec<i64>> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool)
        .await
        .map_err(|e| DeskError::Migration(format!("cannot create schema_migrations: {}", e)))?;

        let applied: Vec<(i64,)> = sqlx::query_as("SELECT version FROM schema_migrations")
            .fetch_all(self.pool)
            .await
            .map_err(|e| DeskError::Migration(format!("cannot read schema_migrations: {}", e)))?;
        let applied: Vec<i64> = applied.into_iter().map(|(v,)| v).collect();

        let mut newly_applied = Vec::new();
        for migration in self.migrations {
            if applied.contains(&migration.version) {
                debug!("Migration {} already applied", migration.version);
                continue;
            }

            self.apply(migration).await.map_err(|e| {
                DeskError::Migration(format!(
                    "migration {} ({}) failed: {}",
                    migration.version, migration.name, e
                ))
            })?;
            info!("Applied migration {} ({})", migration.version, migration.name);
            newly_applied.push(migration.version);
        }

        Ok(newly_applied)
    }

    async fn apply(&self, migration: &Migration) -> std::result::Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::memory_pool;

    #[tokio::test]
    async fn test_runs_all_then_nothing() {
        let pool = memory_pool().await;

        let first = MigrationRunner::new(&pool).run().await.unwrap();
        assert_eq!(first, vec![1, 2, 3, 4]);

        let second = MigrationRunner::new(&pool).run().await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_failed_migration_is_rolled_back() {
        const BROKEN: &[Migration] = &[
            Migration {
                version: 1,
                name: "ok",
                statements: &["CREATE TABLE a (id TEXT)"],
            },
            Migration {
                version: 2,
                name: "broken",
                statements: &["CREATE TABLE b (id TEXT)", "NOT VALID SQL"],
            },
        ];

        let pool = memory_pool().await;
        let err = MigrationRunner::with_migrations(&pool, BROKEN)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::Migration(_)));

        // Table b from the failed migration must not exist
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'b'")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert!(rows.is_empty());
    }
}
