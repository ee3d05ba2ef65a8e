//! Unit tests for CLI parsing and command execution.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{
    FixtureTodoStore, MockTodoStore, RemoteStoreError, StoreCounts, TodoStore,
};
use crate::domain::{
    ErrorCode, LocalWrite, MutationDraft, SyncStatus, Todo, TodoList, WriteQueueUploaderConfig,
    WriteQueueUploaderPorts,
};
use crate::test_support::{InMemoryMutationQueue, InMemoryRemoteStore, MutableClock};

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0)
        .single()
        .expect("valid time")
}

fn id(raw: &str) -> RecordId {
    RecordId::new(raw).expect("valid id")
}

fn list(raw_id: &str, name: &str, at: DateTime<Utc>) -> TodoList {
    TodoList {
        id: id(raw_id),
        name: name.to_owned(),
        created_at: at,
        updated_at: at,
    }
}

fn todo(raw_id: &str, description: &str, completed: bool, at: DateTime<Utc>) -> Todo {
    Todo {
        id: id(raw_id),
        list_id: id("L1"),
        description: description.to_owned(),
        completed,
        created_at: at,
        updated_at: at,
    }
}

struct Harness {
    queue: Arc<InMemoryMutationQueue>,
    remote: Arc<InMemoryRemoteStore>,
    context: CliContext,
}

fn harness(store: Arc<dyn TodoStore>, drafts: Vec<MutationDraft>, now: DateTime<Utc>) -> Harness {
    let clock: Arc<dyn Clock> = Arc::new(MutableClock::new(now));
    let queue = Arc::new(InMemoryMutationQueue::with_drafts(drafts));
    let remote = Arc::new(InMemoryRemoteStore::new());
    let uploader = Arc::new(WriteQueueUploader::new(
        WriteQueueUploaderPorts::new(queue.clone(), remote.clone()),
        WriteQueueUploaderConfig::default(),
    ));
    let trigger = SyncTrigger::new();
    let service = TodoService::new(store, Arc::clone(&clock)).with_trigger(trigger.clone());
    Harness {
        queue,
        remote,
        context: CliContext::new(service, uploader, clock, trigger),
    }
}

async fn run(context: &CliContext, command: Command) -> (Result<(), CliError>, String) {
    let mut out = Vec::new();
    let result = execute_until(context, command, &mut out, async {}).await;
    let text = String::from_utf8(out).expect("utf-8 output");
    (result, text)
}

#[test]
fn global_database_flag_is_accepted_after_the_subcommand() {
    let cli = Cli::try_parse_from(["todo-sync", "add-list", "Groceries", "--database", "x.db"])
        .expect("valid arguments");

    assert_eq!(cli.database.as_deref(), Some(std::path::Path::new("x.db")));
    assert!(matches!(cli.command, Command::AddList { name } if name == "Groceries"));
}

#[rstest]
#[case(&["todo-sync", "toggle", ""])]
#[case(&["todo-sync", "delete-todo", "has space"])]
#[case(&["todo-sync", "rename-list", "L1"])]
#[case(&["todo-sync", "frobnicate"])]
fn malformed_arguments_are_rejected(#[case] args: &[&str]) {
    assert!(Cli::try_parse_from(args).is_err());
}

#[cfg(feature = "example-data")]
#[test]
fn seed_registry_requires_a_seed_name() {
    assert!(Cli::try_parse_from(["todo-sync", "seed", "--registry", "seeds.json"]).is_err());
    let cli = Cli::try_parse_from(["todo-sync", "seed", "--name", "demo"]).expect("valid");
    assert!(matches!(cli.command, Command::Seed(args) if args.name.as_deref() == Some("demo")));
}

#[rstest]
#[tokio::test]
async fn empty_cache_lists_nothing(now: DateTime<Utc>) {
    let h = harness(Arc::new(FixtureTodoStore), Vec::new(), now);

    let (result, text) = run(&h.context, Command::Lists).await;

    result.expect("lists succeeds");
    assert_eq!(text, "no lists\n");
}

#[rstest]
#[tokio::test]
async fn lists_are_printed_one_per_line(now: DateTime<Utc>) {
    let mut store = MockTodoStore::new();
    store
        .expect_lists()
        .times(1)
        .return_once(move || Ok(vec![list("L2", "Work", now), list("L1", "Home", now)]));
    let h = harness(Arc::new(store), Vec::new(), now);

    let (result, text) = run(&h.context, Command::Lists).await;

    result.expect("lists succeeds");
    assert_eq!(text, "L2  Work\nL1  Home\n");
}

#[rstest]
#[tokio::test]
async fn todos_show_their_completion_marks(now: DateTime<Utc>) {
    let mut store = MockTodoStore::new();
    store
        .expect_find_list()
        .returning(move |_| Ok(Some(list("L1", "Home", now))));
    store.expect_todos_for_list().times(1).return_once(move |_| {
        Ok(vec![
            todo("T2", "Water plants", true, now),
            todo("T1", "Buy milk", false, now),
        ])
    });
    let h = harness(Arc::new(store), Vec::new(), now);

    let (result, text) = run(&h.context, Command::Todos { list: id("L1") }).await;

    result.expect("todos succeeds");
    assert_eq!(text, "Home\n  [x] T2  Water plants\n  [ ] T1  Buy milk\n");
}

#[rstest]
#[tokio::test]
async fn unknown_lists_are_reported_as_not_found(now: DateTime<Utc>) {
    let h = harness(Arc::new(FixtureTodoStore), Vec::new(), now);

    let (result, text) = run(&h.context, Command::Todos { list: id("missing") }).await;

    let error = result.expect_err("missing list");
    assert!(matches!(error, CliError::Domain(ref err) if err.code() == ErrorCode::NotFound));
    assert!(text.is_empty());
}

#[rstest]
#[tokio::test]
async fn toggle_flips_an_open_todo(now: DateTime<Utc>) {
    let mut store = MockTodoStore::new();
    store
        .expect_find_todo()
        .returning(move |_| Ok(Some(todo("T1", "Buy milk", false, now))));
    store
        .expect_apply()
        .withf(|writes| {
            matches!(
                writes,
                [LocalWrite::PatchTodo { changes, .. }] if changes.completed == Some(true)
            )
        })
        .times(1)
        .returning(|_| Ok(vec![7]));
    let h = harness(Arc::new(store), Vec::new(), now);

    let (result, text) = run(&h.context, Command::Toggle { id: id("T1") }).await;

    result.expect("toggle succeeds");
    assert_eq!(text, "[x] T1  Buy milk\n");
}

#[rstest]
#[tokio::test]
async fn blank_list_names_are_rejected_before_writing(now: DateTime<Utc>) {
    let mut store = MockTodoStore::new();
    store.expect_apply().never();
    let h = harness(Arc::new(store), Vec::new(), now);

    let (result, _) = run(
        &h.context,
        Command::AddList {
            name: "   ".to_owned(),
        },
    )
    .await;

    let error = result.expect_err("blank name");
    assert!(matches!(error, CliError::Domain(ref err) if err.code() == ErrorCode::InvalidRequest));
}

#[rstest]
#[tokio::test]
async fn status_reports_counts_and_remote_state(now: DateTime<Utc>) {
    let mut store = MockTodoStore::new();
    store.expect_counts().times(1).return_once(|| {
        Ok(StoreCounts {
            lists: 2,
            todos: 5,
            pending: 3,
        })
    });
    let mut h = harness(Arc::new(store), Vec::new(), now);
    h.context = h.context.with_remote_configured(true);

    let (result, text) = run(&h.context, Command::Status).await;

    result.expect("status succeeds");
    assert_eq!(
        text,
        "lists: 2\ntodos: 5\npending mutations: 3\nremote: configured\n"
    );
}

#[rstest]
#[tokio::test]
async fn sync_with_an_empty_queue_has_nothing_to_upload(now: DateTime<Utc>) {
    let h = harness(Arc::new(FixtureTodoStore), Vec::new(), now);

    let (result, text) = run(&h.context, Command::Sync).await;

    result.expect("sync succeeds");
    assert_eq!(text, "nothing to upload\n");
}

#[rstest]
#[tokio::test]
async fn sync_uploads_queued_mutations(now: DateTime<Utc>) {
    let drafts = vec![LocalWrite::PutList(list("L1", "Home", now)).to_draft()];
    let h = harness(Arc::new(FixtureTodoStore), drafts, now);

    let (result, text) = run(&h.context, Command::Sync).await;

    result.expect("sync succeeds");
    assert_eq!(text, "uploaded 1 mutations in 1 batches (0 skipped)\n");
    assert!(h.queue.snapshot().is_empty());
    assert_eq!(h.remote.rows("lists").len(), 1);
}

#[rstest]
#[tokio::test]
async fn sync_failures_keep_the_queue_and_fail_the_command(now: DateTime<Utc>) {
    let drafts = vec![LocalWrite::PutList(list("L1", "Home", now)).to_draft()];
    let h = harness(Arc::new(FixtureTodoStore), drafts, now);
    h.remote.fail_next(RemoteStoreError::transport("offline"));

    let (result, _) = run(&h.context, Command::Sync).await;

    let error = result.expect_err("sync fails");
    assert!(matches!(error, CliError::SyncStopped { pending: 1, .. }));
    assert_eq!(h.queue.snapshot().len(), 1);
}

#[rstest]
#[tokio::test]
async fn watch_stops_when_shutdown_resolves(now: DateTime<Utc>) {
    let h = harness(Arc::new(FixtureTodoStore), Vec::new(), now);

    let (result, text) = run(&h.context, Command::Watch).await;

    result.expect("watch stops cleanly");
    assert!(text.starts_with("watching the upload queue"));
    assert!(text.contains("committed batches: 0"));
}

#[tokio::test(start_paused = true)]
async fn a_failed_signal_listener_never_requests_shutdown() {
    let shutdown = shutdown_on(async { Err(io::Error::other("no signal driver")) });

    let waited = tokio::time::timeout(Duration::from_secs(3_600), shutdown).await;

    assert!(waited.is_err(), "shutdown resolved without a signal");
}

#[tokio::test]
async fn a_delivered_signal_requests_shutdown() {
    tokio::time::timeout(Duration::from_secs(1), shutdown_on(async { Ok(()) }))
        .await
        .expect("signal resolves shutdown");
}

#[test]
fn sync_status_names_the_blocking_mutation() {
    let status = SyncStatus {
        consecutive_failures: 2,
        last_error: Some("remote constraint violated: duplicate key".to_owned()),
        blocked_op_id: Some(7),
        ..SyncStatus::default()
    };
    let mut out = Vec::new();

    render::sync_status(&mut out, &status).expect("render");

    let text = String::from_utf8(out).expect("utf-8 output");
    assert!(text.contains("last error (2 consecutive failures)"));
    assert!(text.contains("blocked on op 7"));
}
