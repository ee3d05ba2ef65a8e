//! Reqwest-backed PostgREST remote store adapter.
//!
//! This adapter owns transport details only: URL and filter construction,
//! authentication headers, the client timeout and HTTP status mapping. The
//! payloads it sends are already in remote representation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use tracing::debug;

use crate::domain::ports::{CredentialsProvider, RemoteCredentials, RemoteStore, RemoteStoreError};
use crate::domain::{RecordId, RecordPayload, RemoteResource};

const REST_PATH: [&str; 2] = ["rest", "v1"];
const UPSERT_PREFER: &str = "resolution=merge-duplicates,return=minimal";
const MINIMAL_PREFER: &str = "return=minimal";

/// Remote store adapter issuing PostgREST requests.
///
/// Credentials are fetched before every call, so a provider that refreshes
/// tokens is picked up without rebuilding the adapter.
pub struct PostgrestRemoteStore {
    client: Client,
    credentials: Arc<dyn CredentialsProvider>,
}

impl PostgrestRemoteStore {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let remote = PostgrestRemoteStore::new(credentials, Duration::from_secs(10));
    /// assert!(remote.is_ok() || remote.is_err());
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        credentials: Arc<dyn CredentialsProvider>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    async fn credentials(&self) -> Result<RemoteCredentials, RemoteStoreError> {
        self.credentials
            .fetch_credentials()
            .await
            .map_err(|error| RemoteStoreError::credentials(error.to_string()))
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        prefer: &'static str,
        body: Option<&RecordPayload>,
        credentials: &RemoteCredentials,
    ) -> Result<(), RemoteStoreError> {
        debug!(%method, path = url.path(), "sending remote request");
        let mut request = self
            .client
            .request(method, url)
            .header("apikey", credentials.api_key().expose())
            .bearer_auth(credentials.token.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .header("Prefer", prefer);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }
}

#[async_trait]
impl RemoteStore for PostgrestRemoteStore {
    async fn upsert(
        &self,
        resource: &RemoteResource,
        record: &RecordPayload,
    ) -> Result<(), RemoteStoreError> {
        let credentials = self.credentials().await?;
        let mut url = resource_url(&credentials.endpoint, resource)?;
        url.query_pairs_mut()
            .append_pair("on_conflict", resource.primary_key);
        self.send(Method::POST, url, UPSERT_PREFER, Some(record), &credentials)
            .await
    }

    async fn update(
        &self,
        resource: &RemoteResource,
        record_id: &RecordId,
        changes: &RecordPayload,
    ) -> Result<(), RemoteStoreError> {
        let credentials = self.credentials().await?;
        let url = filtered_url(&credentials.endpoint, resource, record_id)?;
        self.send(Method::PATCH, url, MINIMAL_PREFER, Some(changes), &credentials)
            .await
    }

    async fn delete(
        &self,
        resource: &RemoteResource,
        record_id: &RecordId,
    ) -> Result<(), RemoteStoreError> {
        let credentials = self.credentials().await?;
        let url = filtered_url(&credentials.endpoint, resource, record_id)?;
        self.send(Method::DELETE, url, MINIMAL_PREFER, None, &credentials)
            .await
    }
}

fn resource_url(endpoint: &Url, resource: &RemoteResource) -> Result<Url, RemoteStoreError> {
    let mut url = endpoint.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| {
            RemoteStoreError::rejected(format!("endpoint `{endpoint}` cannot carry a path"))
        })?
        .pop_if_empty()
        .extend(REST_PATH)
        .push(resource.name);
    Ok(url)
}

fn filtered_url(
    endpoint: &Url,
    resource: &RemoteResource,
    record_id: &RecordId,
) -> Result<Url, RemoteStoreError> {
    let mut url = resource_url(endpoint, resource)?;
    url.query_pairs_mut()
        .append_pair(resource.primary_key, &format!("eq.{record_id}"));
    Ok(url)
}

fn map_transport_error(error: reqwest::Error) -> RemoteStoreError {
    if error.is_timeout() {
        RemoteStoreError::timeout(error.to_string())
    } else {
        RemoteStoreError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RemoteStoreError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteStoreError::unauthorized(message)
        }
        StatusCode::CONFLICT => RemoteStoreError::constraint(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RemoteStoreError::timeout(message)
        }
        StatusCode::TOO_MANY_REQUESTS => RemoteStoreError::transport(message),
        _ if status.is_client_error() => RemoteStoreError::rejected(message),
        _ => RemoteStoreError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
