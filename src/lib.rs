//! Planact: a local-first action plan tracker.
//!
//! An action plan is a tree of weighted "variable actions": sub-goals that
//! measure progress toward the plan. The engine in [`core`] keeps three
//! things true after every mutation:
//!
//! - every node carries a stable hierarchical code (`VA1`, `VA12`, ...) that
//!   is globally unique and prefixed by its parent's code;
//! - the weights of every sibling set sum to 100, redistributed equally
//!   whenever the set changes;
//! - every structural mutation leaves one audit record naming the acting
//!   user and exactly the fields that changed.
//!
//! All state lives in a single SQLite database under `.planact/` in the
//! project root; each mutation runs inside one transaction.
//!
//! # Crate structure
//!
//! - [`core`]: data model, store contract, code allocator, weight
//!   redistributor, hierarchy mutator, audit trail
//! - [`plugins`]: plan management and the `va` operation surface consumed by
//!   the CLI

pub mod core;
pub mod plugins;

use crate::core::{audit, db, error, time};
use crate::plugins::{plan, variable};

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = ".planact";

#[derive(Parser, Debug)]
#[clap(
    name = "planact",
    version = env!("CARGO_PKG_VERSION"),
    about = "Weighted action-plan trees with stable codes and an audit trail"
)]
struct Cli {
    /// Acting user recorded in the audit trail.
    #[clap(long, global = true, default_value = "local")]
    actor: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a planact workspace in the current directory.
    Init {
        /// Directory to initialize (defaults to current working directory).
        #[clap(short, long)]
        dir: Option<PathBuf>,
    },
    /// Manage action plans.
    Plan(plan::PlanCli),
    /// Manage a plan's variable-action tree.
    Va(variable::VariableCli),
    /// Show the audit trail for an entity.
    Audit {
        #[clap(long)]
        entity_id: String,
        #[clap(long, default_value = "VariableAction")]
        entity_type: String,
    },
    /// Print the version.
    Version,
}

/// Walks upward from `start` looking for a `.planact` data directory.
fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(DATA_DIR).is_dir() {
            return Some(dir.join(DATA_DIR));
        }
        current = dir.parent();
    }
    None
}

fn require_root() -> Result<PathBuf, error::PlanactError> {
    let cwd = std::env::current_dir()?;
    find_project_root(&cwd).ok_or_else(|| {
        error::PlanactError::ValidationError(
            "no planact workspace found; run `planact init` first".to_string(),
        )
    })
}

pub fn run() -> Result<(), error::PlanactError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Init { dir } => {
            let target = match dir {
                Some(d) => d,
                None => std::env::current_dir()?,
            };
            let target = fs::canonicalize(&target).map_err(error::PlanactError::IoError)?;
            let root = target.join(DATA_DIR);
            let already = root.is_dir();
            db::initialize_plan_db(&root)?;
            if already {
                println!(
                    "{} workspace already initialized at {}",
                    "planact:".cyan().bold(),
                    root.display()
                );
            } else {
                println!(
                    "{} initialized workspace at {}",
                    "planact:".cyan().bold(),
                    root.display()
                );
            }
            Ok(())
        }
        Command::Plan(args) => {
            let root = require_root()?;
            plan::run(&root, args, &cli.actor)
        }
        Command::Va(args) => {
            let root = require_root()?;
            variable::run(&root, args, &cli.actor)
        }
        Command::Audit {
            entity_id,
            entity_type,
        } => {
            let root = require_root()?;
            let conn = db::connect_plan_db(&root)?;
            let trail = audit::audits_for_entity(&conn, &entity_type, &entity_id)?;
            if trail.is_empty() {
                println!(
                    "{} no audit entries for {} {}",
                    "planact:".cyan().bold(),
                    entity_type,
                    entity_id
                );
                return Ok(());
            }
            for entry in audit::format_for_display(&trail) {
                println!(
                    "{:>12}  {}  {}",
                    entry["date"].as_str().unwrap_or("").dimmed(),
                    entry["action"].as_str().unwrap_or("").yellow(),
                    entry["details"].as_str().unwrap_or("")
                );
            }
            Ok(())
        }
        Command::Version => {
            println!("v{} ({})", env!("CARGO_PKG_VERSION"), time::now_epoch_z());
            Ok(())
        }
    }
}
