use anyhow::Result;

use super::Backend;

pub struct ActionableCommand {
    pub project: String,
    pub identity: String,
}

impl ActionableCommand {
    pub fn new(project: String, identity: String) -> Self {
        Self { project, identity }
    }

    pub async fn execute(&self, backend: &Backend) -> Result<()> {
        let roles = backend
            .service()
            .actionable_roles(&self.project, &self.identity)
            .await?;

        if roles.is_empty() {
            println!("📭 Nothing on {} awaits a decision from {}", self.project, self.identity);
            return Ok(());
        }

        println!("📝 Awaiting your decision on {}:", self.project);
        for role in roles {
            println!("   • {} (--role {})", role.label(), role.key());
        }
        Ok(())
    }
}
