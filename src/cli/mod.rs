use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use crate::approvals::{Decision, Role};

pub mod commands;

#[derive(Parser)]
#[command(name = "greenlight")]
#[command(about = "Multi-stakeholder greenlight approvals for production projects")]
#[command(long_about = "Greenlight records role-based sign-off on a project: each required role \
                       (Producer, Legal, Finance, Executive, Client) is approved or rejected by its \
                       assigned approver, every decision is written to an append-only audit log, \
                       and the project is greenlit once every required role has approved.")]
pub struct Cli {
    /// Override the data directory of the file store
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Approve or reject a role on a project as its assigned approver
    #[command(group(ArgGroup::new("verdict").required(true).args(["approve", "reject"])))]
    Decide {
        /// Project identifier
        #[arg(long)]
        project: String,
        /// Role being decided (producer, legal, finance, executive, client)
        #[arg(long)]
        role: Role,
        /// Email of the acting approver
        #[arg(long = "as", value_name = "EMAIL")]
        identity: String,
        /// Record an approval
        #[arg(long)]
        approve: bool,
        /// Record a rejection
        #[arg(long)]
        reject: bool,
        /// Optional note stored with the decision
        #[arg(long)]
        comment: Option<String>,
    },
    /// Show how many required approvals are complete
    Progress {
        #[arg(long)]
        project: String,
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// List the roles an approver can decide right now
    Actionable {
        #[arg(long)]
        project: String,
        #[arg(long = "as", value_name = "EMAIL")]
        identity: String,
    },
    /// Show every role's approval state
    Show {
        #[arg(long)]
        project: String,
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the audit trail of greenlight decisions
    Audit {
        #[arg(long)]
        project: String,
    },
}

impl Commands {
    /// Decision selected by the mutually exclusive --approve/--reject flags
    pub fn verdict(approve: bool, reject: bool) -> Decision {
        match (approve, reject) {
            (_, true) => Decision::Reject,
            _ => Decision::Approve,
        }
    }
}
