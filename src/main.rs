use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use greenlight::approvals::GreenlightError;
use greenlight::cli::commands::{
    show_how_to_use, ActionableCommand, AuditCommand, Backend, DecideCommand, ProgressCommand,
    ShowCommand,
};
use greenlight::cli::{Cli, Commands};
use greenlight::config::config;
use greenlight::observability::decision_metrics;
use greenlight::service::ServiceError;
use greenlight::store::StoreError;
use greenlight::telemetry::{init_telemetry, shutdown_telemetry};

/// Exit status for a refused decision (not applicable, not authorized, already decided)
const EXIT_REFUSED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match tokio::runtime::Runtime::new()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(run(cli)))
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        return show_how_to_use();
    };

    let config = config()?;
    init_telemetry(&config.observability)?;

    let backend = Backend::from_config(config, cli.data_dir).await?;

    let result = match command {
        Commands::Decide {
            project,
            role,
            identity,
            approve,
            reject,
            comment,
        } => {
            DecideCommand::new(project, role, identity, Commands::verdict(approve, reject))
                .with_comment(comment)
                .execute(&backend)
                .await
        }
        Commands::Progress { project, json } => {
            ProgressCommand::new(project)
                .with_json(json)
                .execute(&backend)
                .await
        }
        Commands::Actionable { project, identity } => {
            ActionableCommand::new(project, identity)
                .execute(&backend)
                .await
        }
        Commands::Show { project, json } => {
            ShowCommand::new(project).with_json(json).execute(&backend).await
        }
        Commands::Audit { project } => AuditCommand::new(project).execute(&backend).await,
    };

    backend.shutdown().await;
    decision_metrics().log_stats();
    shutdown_telemetry();
    result
}

fn report_error(error: &anyhow::Error) -> ExitCode {
    let refusal = error
        .downcast_ref::<ServiceError>()
        .and_then(ServiceError::decision_error)
        .or_else(|| error.downcast_ref::<GreenlightError>());

    if let Some(refusal) = refusal {
        eprintln!("❌ {} ({})", refusal, refusal.kind());
        eprintln!("💡 {}", refusal.hint());
        return ExitCode::from(EXIT_REFUSED);
    }

    eprintln!("❌ {error:#}");
    let store_error = match error.downcast_ref::<ServiceError>() {
        Some(ServiceError::Store(e)) => Some(e),
        _ => error.downcast_ref::<StoreError>(),
    };
    match (store_error, error.downcast_ref::<ServiceError>()) {
        (Some(StoreError::NotFound { project_id }), _) => {
            eprintln!("💡 No record for '{project_id}'. Check --project or --data-dir");
        }
        (_, Some(ServiceError::ConflictRetriesExhausted { .. })) => {
            eprintln!("💡 Other approvers are deciding right now. Try again in a moment");
        }
        (_, Some(ServiceError::AuditAppend { entry, .. })) => {
            eprintln!(
                "💡 The decision is saved but audit entry {} is missing; do not re-decide, restore it from the logs",
                entry.id
            );
            if let Ok(json) = serde_json::to_string(entry) {
                eprintln!("   {json}");
            }
        }
        _ => {}
    }
    ExitCode::FAILURE
}
