//! Unit tests for the architecture lint.

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest::rstest;

use super::*;

#[derive(Clone, Copy)]
struct LintSingle;

impl LintSingle {
    fn lint(self, file: &str, contents: &str) -> Result<(), ArchitectureLintError> {
        lint_sources(&[LintSource {
            file: Utf8PathBuf::from(file),
            contents: contents.to_owned(),
        }])
    }
}

#[fixture]
fn lint_single() -> LintSingle {
    LintSingle
}

#[rstest]
#[case(
    "inbound/cli/mod.rs",
    "use crate::domain::TodoService; fn run(service: &TodoService) { let _ = service; }",
    true
)]
#[case(
    "inbound/cli/mod.rs",
    "use crate::outbound::persistence::SqliteTodoStore; fn run() { let _ = SqliteTodoStore::new; }",
    false
)]
#[case(
    "inbound/cli/mod.rs",
    "use outbound::postgrest::PostgrestRemoteStore; fn run() {}",
    false
)]
#[case(
    "inbound/cli/mod.rs",
    "use client::outbound::persistence::DbPool; fn run() {}",
    false
)]
#[case("inbound/cli/mod.rs", "use diesel::prelude::*; fn run() {}", false)]
#[case(
    "inbound/cli/mod.rs",
    "fn run() { let _ = reqwest::Client::new(); }",
    false
)]
#[case("inbound/cli/mod.rs", "use clap::Parser; fn run() {}", true)]
#[case(
    "domain/uploader/mod.rs",
    "use crate::inbound::cli; fn thing() { let _ = 1; }",
    false
)]
#[case(
    "domain/uploader/mod.rs",
    "use crate::config::SyncSettings; fn thing() {}",
    false
)]
#[case(
    "domain/ports/remote_store.rs",
    "use reqwest::StatusCode; fn thing() {}",
    false
)]
#[case("domain/record.rs", "use clap::ValueEnum; fn thing() {}", false)]
#[case(
    "domain/record.rs",
    "use super::super::ports::TodoStore; use chrono::Utc; fn thing() {}",
    true
)]
#[case(
    "outbound/persistence/queue.rs",
    "use crate::inbound::cli; fn thing() { let _ = 1; }",
    false
)]
#[case(
    "outbound/postgrest/mod.rs",
    "use inbound::cli::Cli; fn thing() {}",
    false
)]
#[case(
    "outbound/postgrest/mod.rs",
    "use reqwest::Client; use crate::domain::ports::RemoteStore; fn thing() {}",
    true
)]
fn detects_boundary_violations(
    lint_single: LintSingle,
    #[case] file: &str,
    #[case] contents: &str,
    #[case] ok: bool,
) {
    let result = lint_single.lint(file, contents);
    assert_eq!(result.is_ok(), ok, "result: {result:?}");
}

#[rstest]
fn files_outside_a_layer_are_rejected(lint_single: LintSingle) {
    let result = lint_single.lint("config.rs", "fn thing() {}");
    assert!(matches!(result, Err(ArchitectureLintError::Parse { .. })));
}

#[rstest]
fn one_file_reports_each_rule_once(lint_single: LintSingle) {
    let result = lint_single.lint(
        "domain/bad.rs",
        "use diesel::prelude::*; use diesel::sql_query; fn a() { diesel::sql_query(\"x\"); }",
    );
    let Err(ArchitectureLintError::Violations(violations)) = result else {
        panic!("expected violations, got {result:?}");
    };
    assert_eq!(violations.len(), 1, "violations: {violations:?}");
}
