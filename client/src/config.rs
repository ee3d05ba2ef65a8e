//! Client configuration loaded via OrthoConfig.
//!
//! Every field is optional; accessors supply the defaults and turn raw
//! values into the domain configuration types.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::ports::AccessToken;
use crate::domain::{
    MAX_BATCH_SIZE, SyncLoopConfig, UnmappedTablePolicy, WriteQueueUploaderConfig,
};
use crate::outbound::credentials::StaticCredentialsProvider;

const DEFAULT_DATABASE_PATH: &str = "todo-sync.db";
const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
const DEFAULT_MAX_BACKOFF_MS: u64 = 60_000;

/// Errors raised while turning settings into runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A setting held a value outside its accepted range or format.
    #[error("invalid setting `{name}`: {message}")]
    Invalid {
        /// Setting name as used in files and without the env prefix.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

impl SettingsError {
    fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            message: message.into(),
        }
    }
}

/// Configuration values for the local store, the uploader and the sync loop.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TODO_SYNC")]
pub struct SyncSettings {
    /// SQLite database file holding the cache and the write queue.
    pub database_path: Option<PathBuf>,
    /// Base URL of the remote project.
    pub remote_url: Option<String>,
    /// Bearer token for the remote store.
    pub token: Option<String>,
    /// Project API key; the token is used when absent.
    pub api_key: Option<String>,
    /// Maximum mutations per upload batch.
    pub batch_size: Option<usize>,
    /// Deadline for each remote call, in milliseconds.
    pub call_timeout_ms: Option<u64>,
    /// Idle poll interval, in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// First backoff delay after a failed batch, in milliseconds.
    pub initial_backoff_ms: Option<u64>,
    /// Upper bound for backoff delays, in milliseconds.
    pub max_backoff_ms: Option<u64>,
    /// `skip` or `reject` mutations for tables without a remote resource.
    pub unmapped_table_policy: Option<String>,
}

impl SyncSettings {
    /// Return the configured database path, falling back to the default.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
    }

    /// Return the configured call timeout.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms.unwrap_or(DEFAULT_CALL_TIMEOUT_MS))
    }

    /// Build the uploader configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for a batch size outside
    /// `1..=MAX_BATCH_SIZE`, a zero timeout or an unknown unmapped-table
    /// policy.
    pub fn uploader_config(&self) -> Result<WriteQueueUploaderConfig, SettingsError> {
        let batch_size = self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(SettingsError::invalid("batch_size", "must be at least 1"));
        }
        if batch_size > MAX_BATCH_SIZE {
            return Err(SettingsError::invalid(
                "batch_size",
                format!("must be at most {MAX_BATCH_SIZE}"),
            ));
        }
        let call_timeout = self.call_timeout();
        if call_timeout.is_zero() {
            return Err(SettingsError::invalid("call_timeout_ms", "must be positive"));
        }
        let unmapped_table_policy = match self.unmapped_table_policy.as_deref() {
            Some(raw) => raw
                .parse::<UnmappedTablePolicy>()
                .map_err(|error| SettingsError::invalid("unmapped_table_policy", error.to_string()))?,
            None => UnmappedTablePolicy::default(),
        };
        Ok(WriteQueueUploaderConfig {
            batch_size,
            call_timeout,
            unmapped_table_policy,
        })
    }

    /// Build the sync loop configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when the initial backoff exceeds
    /// the maximum backoff.
    pub fn sync_loop_config(&self) -> Result<SyncLoopConfig, SettingsError> {
        let config = SyncLoopConfig {
            poll_interval: Duration::from_millis(
                self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            initial_backoff: Duration::from_millis(
                self.initial_backoff_ms.unwrap_or(DEFAULT_INITIAL_BACKOFF_MS),
            ),
            max_backoff: Duration::from_millis(
                self.max_backoff_ms.unwrap_or(DEFAULT_MAX_BACKOFF_MS),
            ),
        };
        if config.initial_backoff > config.max_backoff {
            return Err(SettingsError::invalid(
                "initial_backoff_ms",
                "must not exceed max_backoff_ms",
            ));
        }
        Ok(config)
    }

    /// Build the credentials provider from the remote settings.
    ///
    /// Missing values are allowed; the provider then reports itself as
    /// unavailable when asked.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when `remote_url` is not a URL.
    pub fn credentials_provider(&self) -> Result<StaticCredentialsProvider, SettingsError> {
        let endpoint = self
            .remote_url
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(Url::parse)
            .transpose()
            .map_err(|error| SettingsError::invalid("remote_url", error.to_string()))?;
        Ok(StaticCredentialsProvider::new(
            endpoint,
            self.token.as_deref().map(AccessToken::new),
            self.api_key.as_deref().map(AccessToken::new),
        ))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for client configuration parsing.

    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    const KEYS: [&str; 10] = [
        "TODO_SYNC_DATABASE_PATH",
        "TODO_SYNC_REMOTE_URL",
        "TODO_SYNC_TOKEN",
        "TODO_SYNC_API_KEY",
        "TODO_SYNC_BATCH_SIZE",
        "TODO_SYNC_CALL_TIMEOUT_MS",
        "TODO_SYNC_POLL_INTERVAL_MS",
        "TODO_SYNC_INITIAL_BACKOFF_MS",
        "TODO_SYNC_MAX_BACKOFF_MS",
        "TODO_SYNC_UNMAPPED_TABLE_POLICY",
    ];

    fn load_from_empty_args() -> SyncSettings {
        SyncSettings::load_from_iter([OsString::from("todo-sync")]).expect("config should load")
    }

    fn env_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        KEYS.iter()
            .map(|key| {
                let value = overrides
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| (*value).to_owned());
                (*key, value)
            })
            .collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        let uploader = settings.uploader_config().expect("valid uploader config");
        let sync = settings.sync_loop_config().expect("valid sync config");

        assert_eq!(settings.database_path(), PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(uploader, WriteQueueUploaderConfig::default());
        assert_eq!(sync, SyncLoopConfig::default());
        assert!(
            !settings
                .credentials_provider()
                .expect("no remote settings is fine")
                .is_configured()
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("TODO_SYNC_DATABASE_PATH", "/tmp/todo.db"),
            ("TODO_SYNC_REMOTE_URL", "https://project.supabase.co"),
            ("TODO_SYNC_TOKEN", "token"),
            ("TODO_SYNC_BATCH_SIZE", "25"),
            ("TODO_SYNC_CALL_TIMEOUT_MS", "2500"),
            ("TODO_SYNC_MAX_BACKOFF_MS", "3000"),
            ("TODO_SYNC_UNMAPPED_TABLE_POLICY", "reject"),
        ]));

        let settings = load_from_empty_args();
        let uploader = settings.uploader_config().expect("valid uploader config");
        let sync = settings.sync_loop_config().expect("valid sync config");

        assert_eq!(settings.database_path(), PathBuf::from("/tmp/todo.db"));
        assert_eq!(uploader.batch_size, 25);
        assert_eq!(uploader.call_timeout, Duration::from_millis(2500));
        assert_eq!(uploader.unmapped_table_policy, UnmappedTablePolicy::Reject);
        assert_eq!(sync.max_backoff, Duration::from_secs(3));
        assert!(
            settings
                .credentials_provider()
                .expect("valid remote settings")
                .is_configured()
        );
    }

    #[rstest]
    #[case(SyncSettings { batch_size: Some(0), ..SyncSettings::default() }, "batch_size")]
    #[case(SyncSettings { batch_size: Some(40_000), ..SyncSettings::default() }, "batch_size")]
    #[case(SyncSettings { call_timeout_ms: Some(0), ..SyncSettings::default() }, "call_timeout_ms")]
    #[case(
        SyncSettings { unmapped_table_policy: Some("drop".to_owned()), ..SyncSettings::default() },
        "unmapped_table_policy"
    )]
    fn invalid_uploader_settings_are_rejected(
        #[case] settings: SyncSettings,
        #[case] expected: &str,
    ) {
        let error = settings.uploader_config().expect_err("invalid settings");
        assert!(matches!(error, SettingsError::Invalid { name, .. } if name == expected));
    }

    #[test]
    fn the_largest_batch_size_is_accepted() {
        let settings = SyncSettings {
            batch_size: Some(MAX_BATCH_SIZE),
            ..SyncSettings::default()
        };
        let uploader = settings.uploader_config().expect("valid uploader config");
        assert_eq!(uploader.batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn backoff_bounds_must_be_ordered() {
        let settings = SyncSettings {
            initial_backoff_ms: Some(5_000),
            max_backoff_ms: Some(1_000),
            ..SyncSettings::default()
        };
        assert!(settings.sync_loop_config().is_err());
    }

    #[test]
    fn malformed_remote_urls_are_rejected() {
        let settings = SyncSettings {
            remote_url: Some("not a url".to_owned()),
            ..SyncSettings::default()
        };
        assert!(matches!(
            settings.credentials_provider(),
            Err(SettingsError::Invalid { name: "remote_url", .. })
        ));
    }
}
