//! `erm migrate status|up|down` — thin glue over `erm_migrate`'s
//! discover/plan/apply/rollback library API (spec §4.4, §6).

use crate::config::Config;
use crate::error::CliError;
use colored::Colorize;
use erm_migrate::{apply, discover, plan, rollback, MigrateOptions};

async fn connect(config: &Config) -> Result<tokio_postgres::Client, CliError> {
    let (client, connection) = tokio_postgres::connect(&config.database.url, tokio_postgres::NoTls).await?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            tracing::error!(%error, "postgres connection task ended");
        }
    });
    Ok(client)
}

pub async fn status(config: &Config) -> Result<(), CliError> {
    let migrations = discover(&config.migrations.dir)?;
    let mut client = connect(config).await?;
    let opts = MigrateOptions::default();
    let result = plan(&mut client, &migrations, &opts).await?;

    println!("{}", "─".repeat(50));
    for version in &result.applied {
        println!("{} {}", "✓".green(), version);
    }
    for migration in &result.pending {
        println!("{} {}", "!".yellow(), migration.version);
    }
    println!("{}", "─".repeat(50));
    println!(
        "{} applied, {} pending",
        result.applied.len(),
        result.pending.len()
    );
    Ok(())
}

pub async fn up(config: &Config) -> Result<(), CliError> {
    let migrations = discover(&config.migrations.dir)?;
    let mut client = connect(config).await?;
    let opts = MigrateOptions::default();
    let applied = apply(&mut client, &migrations, &opts).await?;

    if applied.is_empty() {
        println!("{}", "nothing to apply".dimmed());
    } else {
        for version in &applied {
            println!("{} applied {}", "✓".green(), version);
        }
    }
    Ok(())
}

pub async fn down(config: &Config) -> Result<(), CliError> {
    let migrations = discover(&config.migrations.dir)?;
    let mut client = connect(config).await?;
    let opts = MigrateOptions::default();
    let rolled_back = rollback(&mut client, &migrations, &opts).await?;
    println!("{} rolled back {}", "✗".red(), rolled_back);
    Ok(())
}
