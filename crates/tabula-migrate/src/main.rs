//! tabula-migrate CLI
//!
//! Command-line tool for diffing schema snapshots and generating SQLite
//! migrations.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tabula_migrate::dialect::{MigrationDialect, SqliteDialect};
use tabula_migrate::history::MigrationHistory;
use tabula_migrate::prelude::*;

/// Schema diffing and migration generation for SQLite-backed schemas.
#[derive(Parser)]
#[command(name = "tabula-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory where planned migration sets are recorded.
    #[arg(short = 'm', long, env = "TABULA_MIGRATIONS_DIR", default_value = "migrations")]
    migrations_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two schema snapshots and print the diff as JSON.
    Diff {
        /// Base snapshot file (defaults to the last recorded target schema).
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Target snapshot file.
        #[arg(short, long)]
        target: PathBuf,
    },

    /// Plan migrations for a target snapshot and print the SQL.
    Plan {
        /// Base snapshot file (defaults to the last recorded target schema).
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Target snapshot file.
        #[arg(short, long)]
        target: PathBuf,

        /// Schema version of the base snapshot; ignored when the base comes
        /// from the recorded history.
        #[arg(long, default_value_t = 0)]
        source_version: u32,

        /// Show SQL without recording the migration set.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recorded migration sets.
    ShowHistory,
}

fn load_snapshot(path: &Path) -> anyhow::Result<SchemaSnapshot> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Resolves the base snapshot and source version, preferring an explicit
/// file over the recorded history.
fn resolve_base(
    base: Option<&Path>,
    source_version: u32,
    history: &MigrationHistory,
) -> anyhow::Result<(SchemaSnapshot, u32)> {
    match base {
        Some(path) => Ok((load_snapshot(path)?, source_version)),
        None => Ok(history.base_for_next_run()?),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let history = MigrationHistory::new(&cli.migrations_dir);

    match cli.command {
        Commands::Diff { base, target } => {
            let (base_snapshot, _) = resolve_base(base.as_deref(), 0, &history)?;
            let target_snapshot = load_snapshot(&target)?;

            let diff = DiffGenerator::new().generate(&base_snapshot, &target_snapshot)?;
            if diff.is_empty() {
                info!("schemas are identical");
            }
            println!("{}", serde_json::to_string_pretty(&diff)?);
        }

        Commands::Plan {
            base,
            target,
            source_version,
            dry_run,
        } => {
            let (base_snapshot, source_version) =
                resolve_base(base.as_deref(), source_version, &history)?;
            let target_snapshot = load_snapshot(&target)?;

            let diff = DiffGenerator::new().generate(&base_snapshot, &target_snapshot)?;
            let set = MigrationPlanner::new().plan(&diff, &target_snapshot, source_version)?;

            let dialect = SqliteDialect::new();
            for statement in dialect.synthesize(&set)? {
                println!("{statement}");
            }

            if dry_run {
                info!("dry run, migration set not recorded");
            } else {
                let path = history.record(&set)?;
                info!(path = %path.display(), "migration set recorded");
            }
        }

        Commands::ShowHistory => {
            let versions = history.versions()?;
            if versions.is_empty() {
                info!("no migration sets recorded yet");
            } else {
                for version in versions {
                    let recorded = history.load(version)?;
                    println!(
                        "v{} ({}) {} migrations, {} tables",
                        version,
                        recorded.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                        recorded.set.migrations.len(),
                        recorded.set.target_schema.len()
                    );
                }
            }
        }
    }

    Ok(())
}
