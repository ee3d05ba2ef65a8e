//! `todo-sync` command-line interface.
//!
//! Parsing is done with clap. [`execute`] runs one command against a
//! [`CliContext`] and writes human-readable output to any writer, so tests
//! can capture it without spawning a process.

use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mockable::Clock;
use tracing::warn;

use crate::domain::{
    ApplyFailure, Error, RecordId, RecordValidationError, SyncLoop, SyncLoopConfig, SyncTrigger,
    TodoService, UploadError, WriteQueueUploader,
};

mod render;
#[cfg(feature = "example-data")]
mod seed;

#[cfg(feature = "example-data")]
pub use seed::{SeedArgs, SeedError, SeedReport};

/// Top-level arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "todo-sync",
    about = "Offline todo lists with a write queue replayed against a remote store",
    version
)]
pub struct Cli {
    /// SQLite database file. Overrides `TODO_SYNC_DATABASE_PATH`.
    #[arg(long, global = true, value_name = "path")]
    pub database: Option<PathBuf>,
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of `todo-sync`.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show every list, newest first.
    Lists,
    /// Show the todos of one list, newest first.
    Todos {
        /// List identifier.
        #[arg(value_parser = parse_record_id)]
        list: RecordId,
    },
    /// Create a list.
    AddList {
        /// List name.
        name: String,
    },
    /// Rename a list.
    RenameList {
        /// List identifier.
        #[arg(value_parser = parse_record_id)]
        id: RecordId,
        /// New name.
        name: String,
    },
    /// Delete a list and all of its todos.
    DeleteList {
        /// List identifier.
        #[arg(value_parser = parse_record_id)]
        id: RecordId,
    },
    /// Add an open todo to a list.
    AddTodo {
        /// Owning list identifier.
        #[arg(value_parser = parse_record_id)]
        list: RecordId,
        /// Todo description.
        description: String,
    },
    /// Replace a todo's description.
    EditTodo {
        /// Todo identifier.
        #[arg(value_parser = parse_record_id)]
        id: RecordId,
        /// New description.
        description: String,
    },
    /// Flip a todo between open and completed.
    Toggle {
        /// Todo identifier.
        #[arg(value_parser = parse_record_id)]
        id: RecordId,
    },
    /// Delete a todo.
    DeleteTodo {
        /// Todo identifier.
        #[arg(value_parser = parse_record_id)]
        id: RecordId,
    },
    /// Insert sample lists and todos.
    #[cfg(feature = "example-data")]
    Seed(SeedArgs),
    /// Upload queued mutations until the queue is empty or a batch fails.
    Sync,
    /// Keep uploading in the background until interrupted.
    Watch,
    /// Show local row counts and the upload queue depth.
    Status,
}

fn parse_record_id(raw: &str) -> Result<RecordId, RecordValidationError> {
    RecordId::new(raw)
}

/// Errors surfaced by command execution.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The todo service rejected the command.
    #[error(transparent)]
    Domain(#[from] Error),
    /// The uploader could not read or update the queue.
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// `sync` stopped at a batch that could not be uploaded.
    #[error("sync stopped with {pending} mutations still queued: {failure}")]
    SyncStopped {
        /// The mutation that failed.
        failure: ApplyFailure,
        /// Queue depth after the rollback.
        pending: u64,
    },
    /// Seeding failed.
    #[cfg(feature = "example-data")]
    #[error(transparent)]
    Seed(#[from] SeedError),
    /// Output could not be written.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Everything a command needs.
pub struct CliContext {
    service: TodoService,
    uploader: Arc<WriteQueueUploader>,
    clock: Arc<dyn Clock>,
    trigger: SyncTrigger,
    sync_loop: SyncLoopConfig,
    remote_configured: bool,
}

impl CliContext {
    /// Bundle the service and uploader with default loop settings.
    ///
    /// `trigger` should be the one the service nudges after each write.
    pub fn new(
        service: TodoService,
        uploader: Arc<WriteQueueUploader>,
        clock: Arc<dyn Clock>,
        trigger: SyncTrigger,
    ) -> Self {
        Self {
            service,
            uploader,
            clock,
            trigger,
            sync_loop: SyncLoopConfig::default(),
            remote_configured: false,
        }
    }

    /// Use `config` for `watch`.
    #[must_use]
    pub fn with_sync_loop_config(mut self, config: SyncLoopConfig) -> Self {
        self.sync_loop = config;
        self
    }

    /// Record whether remote credentials were supplied, for `status`.
    #[must_use]
    pub fn with_remote_configured(mut self, configured: bool) -> Self {
        self.remote_configured = configured;
        self
    }

    /// The todo service.
    pub fn service(&self) -> &TodoService {
        &self.service
    }
}

/// Run `command`, stopping `watch` on Ctrl-C.
///
/// # Errors
///
/// Returns [`CliError`] when the command fails or output cannot be written.
pub async fn execute<W: Write>(
    context: &CliContext,
    command: Command,
    out: &mut W,
) -> Result<(), CliError> {
    execute_until(context, command, out, ctrl_c()).await
}

/// Run `command`, stopping `watch` when `shutdown` resolves.
///
/// # Errors
///
/// Returns [`CliError`] when the command fails or output cannot be written.
pub async fn execute_until<W, F>(
    context: &CliContext,
    command: Command,
    out: &mut W,
    shutdown: F,
) -> Result<(), CliError>
where
    W: Write,
    F: Future<Output = ()> + Send,
{
    let service = &context.service;
    match command {
        Command::Lists => render::lists(out, &service.lists().await?)?,
        Command::Todos { list } => {
            let owner = service.list(&list).await?;
            render::todos(out, &owner, &service.todos(&list).await?)?;
        }
        Command::AddList { name } => {
            let list = service.create_list(&name).await?;
            writeln!(out, "created list {} {}", list.id, list.name)?;
        }
        Command::RenameList { id, name } => {
            let list = service.rename_list(&id, &name).await?;
            writeln!(out, "renamed list {} to {}", list.id, list.name)?;
        }
        Command::DeleteList { id } => {
            service.delete_list(&id).await?;
            writeln!(out, "deleted list {id}")?;
        }
        Command::AddTodo { list, description } => {
            let todo = service.create_todo(&list, &description).await?;
            writeln!(out, "created todo {} {}", todo.id, todo.description)?;
        }
        Command::EditTodo { id, description } => {
            let todo = service.edit_todo(&id, &description).await?;
            writeln!(out, "updated todo {} {}", todo.id, todo.description)?;
        }
        Command::Toggle { id } => {
            let todo = service.toggle_todo(&id).await?;
            render::todo(out, &todo)?;
        }
        Command::DeleteTodo { id } => {
            service.delete_todo(&id).await?;
            writeln!(out, "deleted todo {id}")?;
        }
        #[cfg(feature = "example-data")]
        Command::Seed(args) => {
            let report = seed::seed(service, &args).await?;
            writeln!(
                out,
                "seeded {} lists and {} todos",
                report.lists, report.todos
            )?;
        }
        Command::Sync => sync(context, out).await?,
        Command::Watch => watch(context, out, shutdown).await?,
        Command::Status => {
            let counts = service.counts().await?;
            render::status(out, &counts, context.remote_configured)?;
        }
    }
    Ok(())
}

async fn sync<W: Write>(context: &CliContext, out: &mut W) -> Result<(), CliError> {
    let report = context.uploader.drain_until_idle().await?;
    render::drain(out, &report)?;
    match report.failure {
        None => Ok(()),
        Some(failure) => {
            let pending = context.uploader.pending_count().await?;
            Err(CliError::SyncStopped { failure, pending })
        }
    }
}

async fn watch<W, F>(context: &CliContext, out: &mut W, shutdown: F) -> Result<(), CliError>
where
    W: Write,
    F: Future<Output = ()> + Send,
{
    let sync_loop = SyncLoop::new(
        Arc::clone(&context.uploader),
        Arc::clone(&context.clock),
        context.trigger.clone(),
        context.sync_loop.clone(),
    );
    writeln!(out, "watching the upload queue; press Ctrl-C to stop")?;
    out.flush()?;
    sync_loop.run_until(shutdown).await;
    render::sync_status(out, &sync_loop.status())?;
    Ok(())
}

async fn ctrl_c() {
    shutdown_on(tokio::signal::ctrl_c()).await;
}

/// Resolve once `signal` fires.
///
/// A listener that cannot be installed never resolves, so `watch` keeps
/// uploading until the process is stopped some other way.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(error) = signal.await {
        warn!(error = %error, "failed to listen for Ctrl-C; watching until killed");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests;
