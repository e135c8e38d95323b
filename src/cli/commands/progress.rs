use anyhow::Result;

use super::Backend;

pub struct ProgressCommand {
    pub project: String,
    pub json: bool,
}

impl ProgressCommand {
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
        let progress = backend.service().progress(&self.project).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&progress)?);
            return Ok(());
        }

        println!("📊 {}: {}", self.project, progress);
        if progress.required_count == 0 {
            println!("   💡 No approvers are assigned on this project yet");
        } else if progress.all_approved {
            println!("   🎬 Greenlit");
        } else {
            println!(
                "   ⏳ Waiting on {} more approval(s)",
                progress.required_count - progress.completed_count
            );
        }
        Ok(())
    }
}
