//! Behaviour tests for the architecture guardrails.

use std::sync::Mutex;

use architecture_lint::{ArchitectureLintError, LintSource, Violation};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

#[derive(Debug, Default)]
struct LintWorld {
    sources: Vec<LintSource>,
    result: Option<Result<(), ArchitectureLintError>>,
}

#[fixture]
fn world() -> Mutex<LintWorld> {
    Mutex::new(LintWorld::default())
}

fn add_source(world: &Mutex<LintWorld>, file: &str, contents: &str) {
    let mut world = world.lock().expect("world lock");
    world.sources.push(LintSource {
        file: Utf8PathBuf::from(file),
        contents: contents.to_owned(),
    });
}

#[given("an inbound module that imports the outbound layer")]
fn inbound_imports_outbound(world: &Mutex<LintWorld>) {
    add_source(
        world,
        "inbound/cli/mod.rs",
        "use client::outbound::persistence::SqliteTodoStore; fn run() { let _ = SqliteTodoStore::new; }",
    );
}

#[given("an inbound module that imports Diesel directly")]
fn inbound_imports_diesel(world: &Mutex<LintWorld>) {
    add_source(
        world,
        "inbound/cli/mod.rs",
        "use diesel::prelude::*; fn run() {}",
    );
}

#[given("a domain module that imports reqwest")]
fn domain_imports_reqwest(world: &Mutex<LintWorld>) {
    add_source(
        world,
        "domain/uploader/mod.rs",
        "use reqwest::StatusCode; fn classify() { let _ = StatusCode::CONFLICT; }",
    );
}

#[given("an outbound module that imports the inbound layer")]
fn outbound_imports_inbound(world: &Mutex<LintWorld>) {
    add_source(
        world,
        "outbound/persistence/bad_cross_boundary.rs",
        "use crate::inbound::cli; fn run() { let _ = 1; }",
    );
}

#[given("valid domain, inbound, and outbound modules")]
fn valid_modules(world: &Mutex<LintWorld>) {
    add_valid_modules(world);
}

#[given("valid modules mixed with multiple boundary violations")]
fn valid_modules_with_multiple_violations(world: &Mutex<LintWorld>) {
    add_valid_modules(world);
    add_source(
        world,
        "inbound/cli/bad_cross_boundary.rs",
        "use client::outbound::postgrest::PostgrestRemoteStore; fn run() {}",
    );
    add_source(
        world,
        "domain/bad.rs",
        "use reqwest::StatusCode; fn classify() { let _ = StatusCode::CONFLICT; }",
    );
}

fn add_valid_modules(world: &Mutex<LintWorld>) {
    add_source(
        world,
        "domain/record.rs",
        "pub struct RecordId(String); impl RecordId { pub fn new(v: &str) -> Self { Self(v.to_owned()) } }",
    );
    add_source(
        world,
        "domain/ports/remote_store.rs",
        "use super::super::record::RecordId; pub trait RemoteStore { fn delete(&self, id: &RecordId); }",
    );
    add_source(
        world,
        "inbound/cli/mod.rs",
        "use clap::Parser; use crate::domain::record::RecordId; fn run() { let _id = RecordId::new(\"ok\"); }",
    );
    add_source(
        world,
        "outbound/postgrest/mod.rs",
        "use reqwest::Client; use crate::domain::record::RecordId; pub struct Remote(Client); impl Remote { pub fn delete(&self, _id: RecordId) {} }",
    );
}

fn write_sources(src: &Dir, sources: &[LintSource]) {
    for source in sources {
        if let Some(parent) = source.file.parent().filter(|p| !p.as_str().is_empty()) {
            src.create_dir_all(parent)
                .expect("create parent directories");
        }
        src.write(&source.file, &source.contents)
            .expect("write source file");
    }
}

#[when("the architecture lint runs")]
fn run_architecture_lint(world: &Mutex<LintWorld>) {
    let sources = {
        let world = world.lock().expect("world lock");
        world.sources.clone()
    };

    let temp_dir = TempDir::new().expect("tempdir");
    let root = Utf8Path::from_path(temp_dir.path()).expect("utf-8 temp path");
    let client_dir = root.join("client");
    let root_dir = Dir::open_ambient_dir(root, ambient_authority()).expect("open temp dir");
    root_dir
        .create_dir_all("client/src")
        .expect("create client/src");
    let src = root_dir.open_dir("client/src").expect("open client/src");
    write_sources(&src, &sources);

    let result = architecture_lint::lint_client_sources(&client_dir);
    let mut world = world.lock().expect("world lock");
    world.result = Some(result);
}

#[then("the lint succeeds")]
fn lint_succeeds(world: &Mutex<LintWorld>) {
    let world = world.lock().expect("world lock");
    let outcome = world.result.as_ref().expect("lint must have run");
    assert!(outcome.is_ok(), "expected success, got: {outcome:?}");
}

fn assert_violation_in_file_contains(
    world: &Mutex<LintWorld>,
    expected_file: &str,
    expected_substring: &str,
) {
    let violations = violations(world);
    assert!(
        violations.iter().any(|violation| {
            violation.file == expected_file && violation.message.contains(expected_substring)
        }),
        "expected violation in '{expected_file}' containing '{expected_substring}', got: {violations:?}"
    );
}

fn violations(world: &Mutex<LintWorld>) -> Vec<Violation> {
    let world = world.lock().expect("world lock");
    let outcome = world.result.as_ref().expect("lint must have run");
    extract_violations(outcome).expect("expected violations")
}

#[then("the lint fails due to outbound access from inbound")]
fn lint_fails_due_to_outbound_access(world: &Mutex<LintWorld>) {
    assert_violation_in_file_contains(world, "inbound/cli/mod.rs", "crate::outbound");
}

#[then("the lint fails due to inbound access from outbound")]
fn lint_fails_due_to_inbound_access(world: &Mutex<LintWorld>) {
    assert_violation_in_file_contains(
        world,
        "outbound/persistence/bad_cross_boundary.rs",
        "crate::inbound",
    );
}

#[then("the lint fails due to infrastructure crate usage")]
fn lint_fails_due_to_infrastructure_crate(world: &Mutex<LintWorld>) {
    assert_violation_in_file_contains(world, "inbound/cli/mod.rs", "external crate `diesel`");
}

#[then("the lint fails due to HTTP crate usage in the domain")]
fn lint_fails_due_to_http_crate(world: &Mutex<LintWorld>) {
    assert_violation_in_file_contains(world, "domain/uploader/mod.rs", "external crate `reqwest`");
}

#[then("the lint fails")]
fn lint_fails(world: &Mutex<LintWorld>) {
    let world = world.lock().expect("world lock");
    let outcome = world.result.as_ref().expect("lint must have run");
    assert!(outcome.is_err(), "expected failure, got: {outcome:?}");
}

#[then("all boundary violations are reported")]
fn all_boundary_violations_are_reported(world: &Mutex<LintWorld>) {
    let violations = violations(world);
    assert_eq!(violations.len(), 2, "violations: {violations:?}");
    assert_violation_in_file_contains(world, "inbound/cli/bad_cross_boundary.rs", "crate::outbound");
    assert_violation_in_file_contains(world, "domain/bad.rs", "external crate `reqwest`");
}

fn extract_violations(outcome: &Result<(), ArchitectureLintError>) -> Option<Vec<Violation>> {
    match outcome {
        Ok(()) => None,
        Err(ArchitectureLintError::Violations(violations)) => Some(violations.clone()),
        Err(other) => panic!("expected violations error, got: {other:?}"),
    }
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Well-layered modules pass"
)]
fn well_layered_modules_pass(world: Mutex<LintWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "The CLI may not reach the SQLite adapter"
)]
fn cli_may_not_reach_sqlite_adapter(world: Mutex<LintWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "The CLI may not use Diesel directly"
)]
fn cli_may_not_use_diesel(world: Mutex<LintWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "The domain may not use the HTTP client"
)]
fn domain_may_not_use_http_client(world: Mutex<LintWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Adapters may not reach the CLI"
)]
fn adapters_may_not_reach_cli(world: Mutex<LintWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/architecture_guardrails.feature",
    name = "Every violation is reported"
)]
fn every_violation_is_reported(world: Mutex<LintWorld>) {
    let _ = world;
}
