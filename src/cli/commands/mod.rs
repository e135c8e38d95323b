use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{EngineConfig, GreenlightConfig};
use crate::service::GreenlightService;
use crate::store::{
    AuditLogSink, AuditTrail, FileAuditLog, FileProjectStore, ProjectRecordStore,
};

pub mod actionable;
pub mod audit;
pub mod decide;
pub mod progress;
pub mod show;

pub use actionable::ActionableCommand;
pub use audit::AuditCommand;
pub use decide::DecideCommand;
pub use progress::ProgressCommand;
pub use show::ShowCommand;

/// Store, audit log and service settings the commands run against
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn ProjectRecordStore>,
    pub audit_log: Arc<dyn AuditLogSink>,
    pub audit_trail: Arc<dyn AuditTrail>,
    pub max_conflict_retries: u32,
    pub max_audit_retries: u32,
    #[cfg(feature = "database")]
    database: Option<Arc<crate::database::DatabaseManager>>,
}

impl Backend {
    /// File-backed store rooted at `data_dir`
    pub fn file(data_dir: &Path, engine: &EngineConfig) -> Self {
        let audit = Arc::new(FileAuditLog::new(data_dir));
        Self {
            store: Arc::new(FileProjectStore::new(data_dir)),
            audit_log: audit.clone(),
            audit_trail: audit,
            max_conflict_retries: engine.max_conflict_retries,
            max_audit_retries: engine.max_audit_retries,
            #[cfg(feature = "database")]
            database: None,
        }
    }

    /// Pick the configured backend; `data_dir` overrides the configured file store location
    pub async fn from_config(config: &GreenlightConfig, data_dir: Option<PathBuf>) -> Result<Self> {
        #[cfg(feature = "database")]
        if data_dir.is_none() {
            if let Some(db) = crate::database::init_database(config).await? {
                let db = Arc::new(db);
                return Ok(Self {
                    store: db.clone(),
                    audit_log: db.clone(),
                    audit_trail: db.clone(),
                    max_conflict_retries: config.engine.max_conflict_retries,
                    max_audit_retries: config.engine.max_audit_retries,
                    database: Some(db),
                });
            }
        }

        let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(&config.storage.data_dir));
        tracing::debug!(data_dir = %data_dir.display(), "Using file storage");
        Ok(Self::file(&data_dir, &config.engine))
    }

    /// Release backend resources; closes the database pool when one is open
    pub async fn shutdown(&self) {
        #[cfg(feature = "database")]
        if let Some(db) = &self.database {
            db.shutdown().await;
        }
    }

    pub fn service(&self) -> GreenlightService {
        GreenlightService::new(self.store.clone(), self.audit_log.clone())
            .with_max_conflict_retries(self.max_conflict_retries)
            .with_max_audit_retries(self.max_audit_retries)
    }
}

pub fn show_how_to_use() -> Result<()> {
    println!("🎬 Greenlight - Multi-Stakeholder Project Approvals");
    println!();
    println!("Approvers:");
    println!("  ✅ greenlight actionable --project <id> --as <email>   # What can I decide?");
    println!("  🖊️  greenlight decide --project <id> --role legal --as <email> --approve");
    println!("  ⛔ greenlight decide --project <id> --role legal --as <email> --reject --comment \"...\"");
    println!();
    println!("Everyone:");
    println!("  📊 greenlight progress --project <id>   # Completion across required roles");
    println!("  🔎 greenlight show --project <id>       # Per-role approval state");
    println!("  📜 greenlight audit --project <id>      # Decision history");
    println!();
    println!("💡 Project records live under .greenlight/projects/<id>.json (see greenlight.toml)");
    Ok(())
}
