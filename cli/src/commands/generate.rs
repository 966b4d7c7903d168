//! `erm generate`: load schema, diff against the last snapshot, and emit
//! migration SQL plus the typed client/GraphQL artifacts — grounded on
//! `cli/src/commands/generate.rs` calling the teacher's writer.

use crate::config::Config;
use crate::error::CliError;
use colored::Colorize;
use erm_codegen::{emit_client, emit_graphql, emit_migration, ArtifactTracker, PlannedFile};
use erm_core::{pluralize, to_snake_case, SchemaSnapshot};

pub struct GenerateOptions {
    pub dry_run: bool,
    pub force: bool,
    pub migration_name: String,
}

pub fn run(config: &Config, opts: &GenerateOptions) -> Result<(), CliError> {
    let entities = erm_loader::load_dir(&config.schema.dir)?;

    let mut next = SchemaSnapshot::from_entities(&entities);
    next.extensions = requested_extensions(config);
    next.canonicalize();

    let previous = if config.migrations.snapshot_path.exists() {
        SchemaSnapshot::load(&config.migrations.snapshot_path)?
    } else {
        SchemaSnapshot::new()
    };

    let operations = erm_differ::diff_snapshots(&previous, &next);

    let staging_root = config.migrations.dir.join(".erm-staging");
    let manifest_path = config.migrations.dir.join(".erm-manifest.json");
    let mut migrations_tracker = if opts.dry_run {
        ArtifactTracker::staging(&config.migrations.dir, &staging_root, &manifest_path, opts.force)?
    } else {
        ArtifactTracker::new(&config.migrations.dir, &manifest_path, opts.force)?
    };

    if operations.is_empty() {
        println!("{}", "no schema changes detected".dimmed());
    } else {
        let version = timestamp_version();
        let migration = emit_migration(&version, &opts.migration_name, &operations);
        let mut files = vec![PlannedFile::new(migration.forward_relative_path, migration.forward_sql)];
        if let (Some(path), Some(sql)) = (migration.down_relative_path, migration.down_sql) {
            files.push(PlannedFile::new(path, sql));
        }
        let summary = migrations_tracker.run_plan("migrations", files)?;
        report("migrations", &summary, opts.dry_run);
    }
    migrations_tracker.save_manifest()?;

    if !opts.dry_run {
        next.save(&config.migrations.snapshot_path)?;
    }

    run_codegen_plan(config, &entities, "orm", &config.codegen.orm_out, opts, |entities| {
        entities
            .iter()
            .map(|entity| {
                let table = pluralize(&to_snake_case(&entity.name));
                let file = emit_client(entity, &table);
                PlannedFile::new(format!("{}.rs", file.module_name), file.source)
            })
            .collect()
    })?;

    run_codegen_plan(config, &entities, "graphql", &config.codegen.graphql_out, opts, |entities| {
        let files = emit_graphql(entities);
        vec![
            PlannedFile::new("schema.graphql", files.schema_sdl),
            PlannedFile::new("resolvers.rs", files.resolvers_source),
            PlannedFile::new("dataloaders.rs", files.dataloaders_source),
        ]
    })?;

    Ok(())
}

fn run_codegen_plan(
    config: &Config,
    entities: &[erm_core::Entity],
    plan_name: &str,
    out_dir: &std::path::Path,
    opts: &GenerateOptions,
    build: impl Fn(&[erm_core::Entity]) -> Vec<PlannedFile>,
) -> Result<(), CliError> {
    let staging_root = out_dir.join(".erm-staging");
    let manifest_path = out_dir.join(".erm-manifest.json");
    let mut tracker = if opts.dry_run {
        ArtifactTracker::staging(out_dir, &staging_root, &manifest_path, opts.force)?
    } else {
        ArtifactTracker::new(out_dir, &manifest_path, opts.force)?
    };

    let files = build(entities);
    let summary = tracker.run_plan(plan_name, files)?;
    report(plan_name, &summary, opts.dry_run);
    tracker.save_manifest()?;
    let _ = config;
    Ok(())
}

fn report(plan_name: &str, summary: &erm_codegen::PlanSummary, dry_run: bool) {
    let verb = if dry_run { "would write" } else { "wrote" };
    for outcome in &summary.outcomes {
        if outcome.written {
            println!("{} {} {}", "+".green(), verb, outcome.relative_path.display());
        }
    }
    if summary.changed_count() == 0 {
        println!("{}: {}", plan_name, "up to date".dimmed());
    }
}

fn requested_extensions(config: &Config) -> Vec<String> {
    let mut extensions = Vec::new();
    if config.extensions.postgis {
        extensions.push("postgis".to_string());
    }
    if config.extensions.pgvector {
        extensions.push("vector".to_string());
    }
    if config.extensions.timescaledb {
        extensions.push("timescaledb".to_string());
    }
    extensions
}

fn timestamp_version() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:014}", now.as_secs())
}
