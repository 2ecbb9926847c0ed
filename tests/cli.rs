use assert_cmd::Command;
use clap::Parser;
use predicates::prelude::*;

use notion_docx::{Cli, Commands};

#[test]
fn help_describes_the_export_command() {
    let mut cmd = Command::cargo_bin("notion-docx").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("Word document"));
}

#[test]
fn export_help_lists_the_fallback_flags() {
    let mut cmd = Command::cargo_bin("notion-docx").expect("Binary exists");
    cmd.args(["export", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--token"))
        .stdout(predicate::str::contains("--database-id"))
        .stdout(predicate::str::contains("--filter-history-file"))
        .stdout(predicate::str::contains("--db-history-file"))
        .stdout(predicate::str::contains("--skip-upload"));
}

#[test]
fn export_defaults_match_the_documented_paths() {
    let cli = Cli::try_parse_from(["notion-docx", "export", "--database-id", "db-123"])
        .expect("Arguments parse");
    let Commands::Export {
        database_id,
        output_dir,
        filter_history_file,
        db_history_file,
        skip_upload,
        ..
    } = cli.command;
    assert_eq!(database_id.as_deref(), Some("db-123"));
    assert_eq!(output_dir, std::path::PathBuf::from("Output"));
    assert_eq!(
        filter_history_file,
        std::path::PathBuf::from("notion_filter_history.json")
    );
    assert_eq!(
        db_history_file,
        std::path::PathBuf::from("notion_db_history.json")
    );
    assert!(!skip_upload);
}

#[test]
fn rejects_unknown_subcommands() {
    let mut cmd = Command::cargo_bin("notion-docx").expect("Binary exists");
    cmd.arg("synchronise");
    cmd.assert().failure();
}
