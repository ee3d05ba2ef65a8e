#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]
//! `todo-sync` entry point: wires the SQLite cache, the write queue and the
//! PostgREST remote, then runs one command.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::{Clock, DefaultClock};
use tokio::runtime::Builder;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt};

use client::SyncSettings;
use client::domain::ports::CredentialsProvider;
use client::domain::{SyncTrigger, TodoService, WriteQueueUploader, WriteQueueUploaderPorts};
use client::inbound::cli::{Cli, CliContext, execute};
use client::outbound::persistence::{
    DbPool, PoolConfig, SqliteMutationQueue, SqliteTodoStore, run_migrations,
};
use client::outbound::postgrest::PostgrestRemoteStore;
use ortho_config::OrthoConfig;

fn main() -> Result<()> {
    color_eyre::install()?;
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let cli = Cli::parse();
    // Subcommands are parsed above; settings come from files and the
    // environment only.
    let settings = SyncSettings::load_from_iter([OsString::from("todo-sync")])
        .map_err(|error| eyre!("load settings: {error}"))?;
    let database_path = cli
        .database
        .clone()
        .unwrap_or_else(|| settings.database_path());

    let context = build_context(&settings, &database_path).await?;
    let mut stdout = io::stdout().lock();
    execute(&context, cli.command, &mut stdout).await?;
    Ok(())
}

async fn build_context(settings: &SyncSettings, database_path: &Path) -> Result<CliContext> {
    let database_url = database_path.display().to_string();
    debug!(database = %database_url, "opening local database");
    run_migrations(&database_url)
        .await
        .wrap_err_with(|| format!("migrate {database_url}"))?;
    let pool = DbPool::new(PoolConfig::new(database_url.as_str()))
        .await
        .wrap_err("create database pool")?;

    let credentials = settings.credentials_provider()?;
    let remote_configured = credentials.is_configured();
    let credentials: Arc<dyn CredentialsProvider> = Arc::new(credentials);
    let remote = PostgrestRemoteStore::new(credentials, settings.call_timeout())
        .wrap_err("create HTTP client")?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let uploader = WriteQueueUploader::new(
        WriteQueueUploaderPorts::new(
            Arc::new(SqliteMutationQueue::new(pool.clone())),
            Arc::new(remote),
        ),
        settings.uploader_config()?,
    );
    let trigger = SyncTrigger::new();
    let service = TodoService::new(
        Arc::new(SqliteTodoStore::new(pool, Arc::clone(&clock))),
        Arc::clone(&clock),
    )
    .with_trigger(trigger.clone());

    Ok(
        CliContext::new(service, Arc::new(uploader), clock, trigger)
            .with_sync_loop_config(settings.sync_loop_config()?)
            .with_remote_configured(remote_configured),
    )
}
