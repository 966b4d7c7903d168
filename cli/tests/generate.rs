use assert_cmd::Command;
use std::fs;

fn write(path: &std::path::Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn generate_dry_run_does_not_touch_the_live_tree() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("schema/user.edl"),
        r#"entity User { field("email", Text).unique() }"#,
    );
    write(
        &dir.path().join("erm.toml"),
        r#"
        [schema]
        dir = "schema"

        [migrations]
        dir = "migrations"
        snapshot_path = "migrations/schema.snapshot.json"

        [codegen]
        orm_out = "generated/orm"
        graphql_out = "generated/graphql"
        "#,
    );

    Command::cargo_bin("erm")
        .unwrap()
        .current_dir(dir.path())
        .args(["generate", "--dry-run"])
        .assert()
        .success();

    assert!(!dir.path().join("migrations").exists());
    assert!(!dir.path().join("generated").exists());
}

#[test]
fn generate_writes_migration_and_codegen_output() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir.path().join("schema/user.edl"),
        r#"entity User { field("email", Text).unique() }"#,
    );
    write(
        &dir.path().join("erm.toml"),
        r#"
        [schema]
        dir = "schema"

        [migrations]
        dir = "migrations"
        snapshot_path = "migrations/schema.snapshot.json"

        [codegen]
        orm_out = "generated/orm"
        graphql_out = "generated/graphql"
        "#,
    );

    Command::cargo_bin("erm")
        .unwrap()
        .current_dir(dir.path())
        .args(["generate"])
        .assert()
        .success();

    assert!(dir.path().join("migrations/schema.snapshot.json").exists());
    assert!(dir.path().join("generated/orm/user.rs").exists());
    assert!(dir.path().join("generated/graphql/schema.graphql").exists());

    // Second run with no schema changes should report nothing new to write.
    Command::cargo_bin("erm")
        .unwrap()
        .current_dir(dir.path())
        .args(["generate"])
        .assert()
        .success()
        .stdout(predicates::str::contains("up to date"));
}
