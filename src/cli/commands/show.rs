use anyhow::Result;
use serde::Serialize;

use super::Backend;
use crate::approvals::{ProjectApprovalState, Progress, RoleStatus};

#[derive(Serialize)]
struct ShowOutput<'a> {
    project_id: &'a str,
    approvals: &'a ProjectApprovalState,
    progress: Progress,
}

pub struct ShowCommand {
    pub project: String,
    pub json: bool,
}

impl ShowCommand {
    pub fn new(project: String) -> Self {
        Self {
            project,
            json: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub async fn execute(&self, backend: &Backend) -> Result<()> {
        let state = backend.service().state(&self.project).await?;
        let progress = state.progress();

        if self.json {
            let output = ShowOutput {
                project_id: &self.project,
                approvals: &state,
                progress,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("🎬 GREENLIGHT STATUS: {}", self.project);
        println!("──────────────────────");
        for (role, approval) in state.roles() {
            let status = approval.status();
            let icon = match status {
                RoleStatus::NotRequired => "⚪",
                RoleStatus::Pending => "🟡",
                RoleStatus::Rejected => "🔴",
                RoleStatus::Approved => "🟢",
            };
            let mut line = format!("{icon} {:<10} {}", role.label(), status);
            if let Some(email) = approval.assigned_email.as_deref().filter(|e| !e.is_empty()) {
                line.push_str(&format!(" [{email}]"));
            }
            if let (Some(by), Some(at)) = (&approval.approved_by, approval.approved_at) {
                line.push_str(&format!(" by {by} at {}", at.format("%Y-%m-%d %H:%M UTC")));
            }
            println!("{line}");
            if let Some(comment) = &approval.comment {
                println!("      💬 {comment}");
            }
        }
        println!();
        println!("📊 {progress}");
        if let Some(at) = state.all_approvals_completed_at {
            println!("✅ Greenlit at {}", at.format("%Y-%m-%d %H:%M UTC"));
        }
        Ok(())
    }
}
