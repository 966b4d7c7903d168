//! `erm` binary: config loading and exit-code mapping around the
//! loader/differ/codegen/migrate libraries (spec §6). Subcommand richness is
//! deliberately minimal — flag parsing is glue, not a specified surface.

use clap::{Parser, Subcommand};
use erm_cli::commands::{check, generate, migrate};
use erm_cli::{config, CliError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "erm", about = "Schema-driven codegen and migrations for erm")]
struct Cli {
    /// Path to the config file (default: erm.toml in the current directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Diff the schema against the last snapshot and emit migration SQL
    /// plus the typed client/GraphQL artifacts.
    Generate {
        /// Write to a staging directory instead of the live tree.
        #[arg(long)]
        dry_run: bool,
        /// Rewrite every generated file even if its content is unchanged.
        #[arg(long)]
        force: bool,
        /// Slug used in the migration filename.
        #[arg(long, default_value = "schema_update")]
        name: String,
    },
    /// Migration commands against the configured database.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Report schema and migration drift without applying anything.
    Check,
}

#[derive(Subcommand)]
enum MigrateAction {
    /// List applied and pending migrations.
    Status,
    /// Apply every pending migration.
    Up,
    /// Roll back the most recently applied migration.
    Down,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::from(0),
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Generate { dry_run, force, name } => {
            let opts = generate::GenerateOptions { dry_run, force, migration_name: name };
            generate::run(&config, &opts)
        }
        Command::Migrate { action } => match action {
            MigrateAction::Status => migrate::status(&config).await,
            MigrateAction::Up => migrate::up(&config).await,
            MigrateAction::Down => migrate::down(&config).await,
        },
        Command::Check => check::run(&config).await,
    }
}
