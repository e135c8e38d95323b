use anyhow::Result;

use super::Backend;
use crate::approvals::{Decision, Role};

pub struct DecideCommand {
    pub project: String,
    pub role: Role,
    pub identity: String,
    pub decision: Decision,
    pub comment: Option<String>,
}

impl DecideCommand {
    pub fn new(project: String, role: Role, identity: String, decision: Decision) -> Self {
        Self {
            project,
            role,
            identity,
            decision,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    pub async fn execute(&self, backend: &Backend) -> Result<()> {
        let outcome = backend
            .service()
            .decide(
                &self.project,
                self.role,
                &self.identity,
                self.decision,
                self.comment.as_deref(),
            )
            .await?;

        let verb = match self.decision {
            Decision::Approve => "✅ Approved",
            Decision::Reject => "⛔ Rejected",
        };
        println!(
            "{} {} on {} as {}",
            verb,
            self.role.label(),
            outcome.project_id,
            self.identity
        );
        println!("📊 Progress: {}", outcome.progress);

        if outcome.greenlit() {
            println!("🎬 All required approvals recorded: project is greenlit!");
        }
        Ok(())
    }
}
