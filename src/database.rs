#[cfg(feature = "database")]
use anyhow::Result;
#[cfg(feature = "database")]
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
#[cfg(feature = "database")]
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Row, SqlitePool};
#[cfg(feature = "database")]
use tracing::{info, warn};

#[cfg(feature = "database")]
use crate::approvals::{AuditEntry, ProjectApprovalState};
#[cfg(feature = "database")]
use crate::config::GreenlightConfig;
#[cfg(feature = "database")]
use crate::store::{AuditLogSink, AuditTrail, ProjectRecord, ProjectRecordStore, StoreError};

#[cfg(feature = "database")]
/// SQLite-backed project record store and audit log
pub struct DatabaseManager {
    pool: SqlitePool,
}

#[cfg(feature = "database")]
impl DatabaseManager {
    /// Initialize database with automatic migrations
    pub async fn new(database_url: &str, max_connections: u32, auto_migrate: bool) -> Result<Self> {
        // Create database if it doesn't exist
        if !database_url.contains(":memory:")
            && !sqlx::Sqlite::database_exists(database_url).await?
        {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;

        // Run migrations if enabled
        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    /// Create a project row at version 0
    pub async fn create_project(
        &self,
        project_id: &str,
        approvals: &ProjectApprovalState,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO project_approvals (project_id, version, approvals, updated_at)
            VALUES (?1, 0, ?2, datetime('now'))
            "#,
        )
        .bind(project_id)
        .bind(serde_json::to_string(approvals)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn current_version(&self, project_id: &str) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query("SELECT version FROM project_approvals WHERE project_id = ?1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<i64, _>("version") as u64))
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl ProjectRecordStore for DatabaseManager {
    async fn read(&self, project_id: &str) -> Result<ProjectRecord, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT project_id, version, approvals
            FROM project_approvals
            WHERE project_id = ?1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| StoreError::NotFound {
            project_id: project_id.to_string(),
        })?;

        let approvals: String = row.get("approvals");
        Ok(ProjectRecord {
            project_id: row.get("project_id"),
            version: row.get::<i64, _>("version") as u64,
            approvals: serde_json::from_str(&approvals)?,
        })
    }

    async fn write(
        &self,
        project_id: &str,
        state: &ProjectApprovalState,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let approvals = serde_json::to_string(state)?;

        let row = match expected_version {
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE project_approvals
                    SET approvals = ?1, version = version + 1, updated_at = datetime('now')
                    WHERE project_id = ?2 AND version = ?3
                    RETURNING version
                    "#,
                )
                .bind(&approvals)
                .bind(project_id)
                .bind(expected as i64)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                warn!(
                    project_id = %project_id,
                    "Unconditional write to project approvals (last writer wins)"
                );
                sqlx::query(
                    r#"
                    UPDATE project_approvals
                    SET approvals = ?1, version = version + 1, updated_at = datetime('now')
                    WHERE project_id = ?2
                    RETURNING version
                    "#,
                )
                .bind(&approvals)
                .bind(project_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        if let Some(row) = row {
            return Ok(row.get::<i64, _>("version") as u64);
        }

        match (self.current_version(project_id).await?, expected_version) {
            (Some(found), Some(expected)) => Err(StoreError::VersionConflict {
                project_id: project_id.to_string(),
                expected,
                found,
            }),
            _ => Err(StoreError::NotFound {
                project_id: project_id.to_string(),
            }),
        }
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AuditLogSink for DatabaseManager {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO audit_log
                (id, project_id, actor_identity, actor_role_label, action, target, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.project_id)
        .bind(&entry.actor_identity)
        .bind(&entry.actor_role_label)
        .bind(&entry.action)
        .bind(&entry.target)
        .bind(serde_json::to_string(&entry.metadata)?)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl AuditTrail for DatabaseManager {
    async fn entries(&self, project_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, actor_identity, actor_role_label, action, target, metadata, created_at
            FROM audit_log
            WHERE project_id = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<AuditEntry, StoreError> {
                let id: String = row.get("id");
                let metadata: String = row.get("metadata");
                let created_at: String = row.get("created_at");
                Ok(AuditEntry {
                    id: id.parse().map_err(|e| StoreError::Corrupt {
                        reason: format!("audit id {id}: {e}"),
                    })?,
                    project_id: row.get("project_id"),
                    actor_identity: row.get("actor_identity"),
                    actor_role_label: row.get("actor_role_label"),
                    action: row.get("action"),
                    target: row.get("target"),
                    metadata: serde_json::from_str(&metadata)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|at| at.with_timezone(&Utc))
                        .map_err(|e| StoreError::Corrupt {
                            reason: format!("audit timestamp {created_at}: {e}"),
                        })?,
                })
            })
            .collect()
    }
}

#[cfg(feature = "database")]
/// Open the configured database, if any
pub async fn init_database(config: &GreenlightConfig) -> Result<Option<DatabaseManager>> {
    if let Some(db_config) = &config.database {
        info!("Initializing database at {}", db_config.url);
        let manager = DatabaseManager::new(
            &db_config.url,
            db_config.max_connections,
            db_config.auto_migrate,
        )
        .await?;
        info!("Database manager initialized successfully");
        Ok(Some(manager))
    } else {
        info!("Database not configured, using file storage");
        Ok(None)
    }
}
