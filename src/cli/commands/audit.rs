use anyhow::Result;

use super::Backend;

pub struct AuditCommand {
    pub project: String,
}

impl AuditCommand {
    pub fn new(project: String) -> Self {
        Self { project }
    }

    pub async fn execute(&self, backend: &Backend) -> Result<()> {
        let entries = backend.audit_trail.entries(&self.project).await?;

        if entries.is_empty() {
            println!("📜 No greenlight decisions recorded for {}", self.project);
            return Ok(());
        }

        println!("📜 GREENLIGHT AUDIT TRAIL: {}", self.project);
        println!("──────────────────────────");
        for entry in &entries {
            println!("   {}", entry.summary());
        }
        Ok(())
    }
}
