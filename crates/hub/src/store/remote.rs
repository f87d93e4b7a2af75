//! JSONBin document client.
//!
//! The whole snapshot lives in one hosted JSON document.
//!
//! - Read: `GET {base}/{bin}/latest`, body wrapped as `{"record": <snapshot>}`
//! - Write: `PUT {base}/{bin}` with the bare snapshot as body
//! - Authentication: static key via the `X-Master-Key` header

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

use libertad_hub_core::Snapshot;

use crate::config::RemoteConfig;

/// Header carrying the JSONBin master key.
const MASTER_KEY_HEADER: &str = "X-Master-Key";

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Store returned a non-success response.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Master key rejected.
    #[error("Unauthorized: invalid master key")]
    Unauthorized,

    /// Document does not exist.
    #[error("Document not found")]
    NotFound,

    /// Response body was not a snapshot.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Shared document holding the canonical cross-device snapshot.
///
/// Implementations swallow failures: a failed read yields `None` and a
/// failed write yields `false`.
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetch the latest stored snapshot.
    fn fetch_latest(&self) -> impl Future<Output = Option<Snapshot>> + Send;

    /// Replace the stored snapshot. Returns whether the store accepted it.
    fn save_latest(&self, snapshot: &Snapshot) -> impl Future<Output = bool> + Send;
}

impl<R: RemoteStore> RemoteStore for Arc<R> {
    fn fetch_latest(&self) -> impl Future<Output = Option<Snapshot>> + Send {
        (**self).fetch_latest()
    }

    fn save_latest(&self, snapshot: &Snapshot) -> impl Future<Output = bool> + Send {
        (**self).save_latest(snapshot)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    record: serde_json::Value,
}

/// JSONBin v3 client.
#[derive(Clone)]
pub struct JsonBinClient {
    inner: Arc<JsonBinClientInner>,
}

struct JsonBinClientInner {
    client: reqwest::Client,
    latest_url: String,
    document_url: String,
    bin_id: String,
}

impl JsonBinClient {
    /// Create a new client for one document.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();

        let mut key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| RemoteError::Parse(format!("Invalid master key format: {e}")))?;
        key.set_sensitive(true);
        headers.insert(MASTER_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(JsonBinClientInner {
                client,
                latest_url: config.latest_url(),
                document_url: config.document_url(),
                bin_id: config.bin_id.clone(),
            }),
        })
    }

    /// Document id this client reads and writes.
    #[must_use]
    pub fn bin_id(&self) -> &str {
        &self.inner.bin_id
    }

    /// Fetch the latest snapshot, reporting why it failed.
    ///
    /// A record without collections decodes as empty collections, and
    /// messages without a sender get the non-admin identity.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, a non-success status, or a body
    /// that is not a snapshot.
    #[instrument(skip(self), fields(bin_id = %self.inner.bin_id))]
    pub async fn try_fetch_latest(&self) -> Result<Snapshot, RemoteError> {
        let response = self.inner.client.get(&self.inner.latest_url).send().await?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(format!("Failed to parse response: {e}")))?;

        if envelope.record.is_null() {
            return Err(RemoteError::Parse("Response has no record".to_string()));
        }

        let decoded = Snapshot::from_stored_value(envelope.record)
            .map_err(|e| RemoteError::Parse(format!("Invalid snapshot: {e}")))?;
        if decoded.dropped > 0 {
            warn!(
                dropped = decoded.dropped,
                "Skipped undecodable records in remote snapshot"
            );
        }
        debug!(
            counts = %decoded.snapshot.counts(),
            patched = decoded.patched,
            "Fetched remote snapshot"
        );
        Ok(decoded.snapshot)
    }

    /// Overwrite the document, reporting why it failed.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success status.
    #[instrument(skip(self, snapshot), fields(bin_id = %self.inner.bin_id))]
    pub async fn try_save_latest(&self, snapshot: &Snapshot) -> Result<(), RemoteError> {
        let response = self
            .inner
            .client
            .put(&self.inner.document_url)
            .json(snapshot)
            .send()
            .await?;

        if response.status().is_success() {
            debug!(counts = %snapshot.counts(), "Saved remote snapshot");
            return Ok(());
        }

        Err(Self::parse_error(response).await)
    }

    async fn parse_error(response: reqwest::Response) -> RemoteError {
        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return RemoteError::Unauthorized;
        }

        if status == 404 {
            return RemoteError::NotFound;
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        RemoteError::Status { status, message }
    }
}

impl RemoteStore for JsonBinClient {
    async fn fetch_latest(&self) -> Option<Snapshot> {
        match self.try_fetch_latest().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                error!(error = %e, "Cloud fetch failed");
                None
            }
        }
    }

    async fn save_latest(&self, snapshot: &Snapshot) -> bool {
        match self.try_save_latest(snapshot).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Cloud save failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for JsonBinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonBinClient")
            .field("bin_id", &self.inner.bin_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config() -> RemoteConfig {
        RemoteConfig::new(
            "https://api.jsonbin.io/v3/b",
            "abc123",
            SecretString::from("$2a$10$examplemasterkeyvalue"),
        )
        .unwrap()
    }

    #[test]
    fn test_client_urls() {
        let client = JsonBinClient::new(&config()).unwrap();
        assert_eq!(client.bin_id(), "abc123");
        assert_eq!(
            client.inner.latest_url,
            "https://api.jsonbin.io/v3/b/abc123/latest"
        );
        assert_eq!(client.inner.document_url, "https://api.jsonbin.io/v3/b/abc123");
    }

    #[test]
    fn test_debug_hides_key() {
        let client = JsonBinClient::new(&config()).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("abc123"));
        assert!(!debug.contains("examplemasterkey"));
    }

    #[test]
    fn test_key_with_newline_is_rejected() {
        let mut config = config();
        config.api_key = SecretString::from("bad\nkey");
        assert!(matches!(
            JsonBinClient::new(&config),
            Err(RemoteError::Parse(_))
        ));
    }

    #[test]
    fn test_envelope_missing_record() {
        let envelope: Envelope = serde_json::from_str(r#"{"metadata": {}}"#).unwrap();
        assert!(envelope.record.is_null());
    }
}
