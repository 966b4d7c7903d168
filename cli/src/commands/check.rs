//! `erm check`: report schema drift and pending migrations without
//! mutating anything — diff only, never apply (spec §6 CLI surface).

use crate::config::Config;
use crate::error::CliError;
use colored::Colorize;
use erm_core::SchemaSnapshot;

pub async fn run(config: &Config) -> Result<(), CliError> {
    let entities = erm_loader::load_dir(&config.schema.dir)?;
    let mut current = SchemaSnapshot::from_entities(&entities);
    current.canonicalize();

    let previous = if config.migrations.snapshot_path.exists() {
        SchemaSnapshot::load(&config.migrations.snapshot_path)?
    } else {
        SchemaSnapshot::new()
    };

    let operations = erm_differ::diff_snapshots(&previous, &current);
    if operations.is_empty() {
        println!("{}", "schema matches the last snapshot".green());
    } else {
        println!(
            "{} {} pending schema change(s) since the last snapshot",
            "!".yellow(),
            operations.len()
        );
    }

    let migrations = erm_migrate::discover(&config.migrations.dir)?;
    let (client, connection) =
        tokio_postgres::connect(&config.database.url, tokio_postgres::NoTls).await?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            tracing::error!(%error, "postgres connection task ended");
        }
    });
    let mut client = client;
    let plan = erm_migrate::plan(&mut client, &migrations, &erm_migrate::MigrateOptions::default()).await?;
    if plan.pending.is_empty() {
        println!("{}", "no pending migrations".green());
    } else {
        println!("{} {} pending migration(s)", "!".yellow(), plan.pending.len());
    }

    Ok(())
}
