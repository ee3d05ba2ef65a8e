//! Driven port supplying the remote endpoint and access token.

use std::fmt;

use async_trait::async_trait;
use url::Url;
use zeroize::Zeroizing;

use super::define_port_error;

/// Secret bearer value, wiped from memory on drop.
///
/// `Debug` never prints the secret.
///
/// ```
/// use client::domain::ports::AccessToken;
///
/// let token = AccessToken::new("s3cret");
/// assert_eq!(token.expose(), "s3cret");
/// assert_eq!(format!("{token:?}"), "AccessToken(<redacted>)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the secret for use in a request header.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Connection details for the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    /// Base URL of the remote project.
    pub endpoint: Url,
    /// Bearer token sent in `Authorization`.
    pub token: AccessToken,
    /// Project API key; the token doubles as the key when absent.
    pub api_key: Option<AccessToken>,
}

impl RemoteCredentials {
    /// Key to send in the `apikey` header.
    pub fn api_key(&self) -> &AccessToken {
        self.api_key.as_ref().unwrap_or(&self.token)
    }
}

define_port_error! {
    /// Errors surfaced while fetching credentials.
    pub enum CredentialsError {
        /// No credentials are available right now.
        Unavailable { message: String } => "credentials unavailable: {message}",
        /// Credentials exist but are unusable.
        Invalid { message: String } => "credentials invalid: {message}",
    }
}

/// Port for obtaining remote credentials before each call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Fetch the endpoint and token to use for the next remote call.
    async fn fetch_credentials(&self) -> Result<RemoteCredentials, CredentialsError>;
}

/// Fixture provider that never has credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureCredentialsProvider;

#[async_trait]
impl CredentialsProvider for FixtureCredentialsProvider {
    async fn fetch_credentials(&self) -> Result<RemoteCredentials, CredentialsError> {
        Err(CredentialsError::unavailable("no credentials configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://project.example.test").expect("valid url")
    }

    #[test]
    fn token_doubles_as_api_key() {
        let credentials = RemoteCredentials {
            endpoint: endpoint(),
            token: AccessToken::new("jwt"),
            api_key: None,
        };
        assert_eq!(credentials.api_key().expose(), "jwt");
    }

    #[test]
    fn distinct_api_key_wins() {
        let credentials = RemoteCredentials {
            endpoint: endpoint(),
            token: AccessToken::new("jwt"),
            api_key: Some(AccessToken::new("anon")),
        };
        assert_eq!(credentials.api_key().expose(), "anon");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = RemoteCredentials {
            endpoint: endpoint(),
            token: AccessToken::new("jwt-secret"),
            api_key: Some(AccessToken::new("anon-secret")),
        };
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("jwt-secret"));
        assert!(!rendered.contains("anon-secret"));
    }

    #[tokio::test]
    async fn fixture_reports_unavailable() {
        let error = FixtureCredentialsProvider
            .fetch_credentials()
            .await
            .expect_err("fixture has no credentials");
        assert!(matches!(error, CredentialsError::Unavailable { .. }));
    }
}
