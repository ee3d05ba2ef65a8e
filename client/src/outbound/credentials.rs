//! Credentials provider backed by values known at start-up.

use async_trait::async_trait;
use url::Url;

use crate::domain::ports::{AccessToken, CredentialsError, CredentialsProvider, RemoteCredentials};

/// Serves one fixed endpoint and token for the process lifetime.
///
/// A missing endpoint or token is reported on every fetch as `Unavailable`,
/// which the uploader treats as retryable, so the queue simply keeps
/// accumulating until the process is configured.
#[derive(Debug, Clone)]
pub struct StaticCredentialsProvider {
    endpoint: Option<Url>,
    token: Option<AccessToken>,
    api_key: Option<AccessToken>,
}

impl StaticCredentialsProvider {
    /// Build a provider from optional settings.
    pub fn new(endpoint: Option<Url>, token: Option<AccessToken>, api_key: Option<AccessToken>) -> Self {
        Self {
            endpoint,
            token,
            api_key,
        }
    }

    /// Whether both an endpoint and a token were supplied.
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.token.is_some()
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn fetch_credentials(&self) -> Result<RemoteCredentials, CredentialsError> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or_else(|| CredentialsError::unavailable("no remote endpoint configured"))?;
        let token = self
            .token
            .clone()
            .ok_or_else(|| CredentialsError::unavailable("no access token configured"))?;
        if token.expose().trim().is_empty() {
            return Err(CredentialsError::invalid("access token is blank"));
        }
        Ok(RemoteCredentials {
            endpoint,
            token,
            api_key: self.api_key.clone(),
        })
    }
}
