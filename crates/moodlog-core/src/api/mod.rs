//! Typed HTTP client for the journal API.
//!
//! One request/response schema pair per endpoint, strict decoding with
//! explicit optionals, and a lenient error-body parser. All calls carry a
//! bearer-style session credential and a fixed request timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::normalize_base_url;
use crate::error::{Error, Result};
use crate::models::{Attachment, Emotion, Entry, EntryId, ServerId, MAX_ATTACHMENTS};
use crate::util::compact_text;

/// Fixed budget for every remote call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One entry as the server represents it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryRecord {
    pub id: i64,
    #[serde(default)]
    pub content: Option<String>,
    /// Pre-rendered safe-HTML variant of the body.
    #[serde(default)]
    pub content_html: Option<String>,
    /// Pre-rendered plain-text variant of the body.
    #[serde(default)]
    pub content_text: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    /// Creation time, Unix ms.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Last update time, Unix ms.
    #[serde(default)]
    pub updated_at: Option<i64>,
    /// Server attachment ids, integers in string form.
    #[serde(default)]
    pub image_ids: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl EntryRecord {
    /// Build a client entry with a fresh local identity.
    #[must_use]
    pub fn into_entry(self) -> Entry {
        let identity = EntryId::synced(ServerId::new(self.id));
        self.into_entry_as(identity, false)
    }

    /// Build a client entry reusing a known identity and edited flag, so a
    /// re-fetch does not change which logical list item it is.
    #[must_use]
    pub fn into_entry_as(self, id: EntryId, edited: bool) -> Entry {
        let attachments = self
            .image_ids
            .iter()
            .zip(self.image_urls.iter())
            .take(MAX_ATTACHMENTS)
            .map(|(attachment_id, url)| Attachment::existing(attachment_id, url))
            .collect();

        Entry {
            id,
            timestamp: self
                .created_at
                .unwrap_or_else(crate::util::unix_timestamp_ms),
            content: self.content.or(self.content_text).unwrap_or_default(),
            emotion: Emotion::from_tag(self.emotion.as_deref().unwrap_or_default()),
            attachments,
            edited,
        }
    }
}

/// One page of the remote ordered collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPage {
    #[serde(default)]
    pub entries: Vec<EntryRecord>,
    /// Total entry count across all pages.
    #[serde(default)]
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateEntryRequest {
    pub content: String,
    pub emotion: String,
    /// Self-describing base64 payloads of new attachments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_image_data: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateEntryRequest {
    /// Fields left `None` are unchanged server-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    /// Server attachment ids to retain; anything omitted and not freshly
    /// added is deleted server-side.
    pub keep_image_ids: Vec<i64>,
    pub add_image_data: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UpdateEntryResponse {
    #[serde(default)]
    updated: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DeleteEntryResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// The remote collection, as the sync coordinator sees it.
///
/// The production implementation is [`JournalApiClient`]; tests drive the
/// coordinator with an in-memory fake.
#[async_trait]
pub trait JournalApi: Send + Sync {
    async fn list_entries(&self, access_token: &str, limit: usize, offset: usize)
        -> Result<EntryPage>;

    async fn create_entry(
        &self,
        access_token: &str,
        request: &CreateEntryRequest,
    ) -> Result<EntryRecord>;

    /// Partial update; returns the names of the fields the server changed.
    async fn update_entry(
        &self,
        access_token: &str,
        server_id: ServerId,
        request: &UpdateEntryRequest,
    ) -> Result<Vec<String>>;

    async fn delete_entry(&self, access_token: &str, server_id: ServerId) -> Result<()>;

    async fn fetch_entry(&self, access_token: &str, server_id: ServerId) -> Result<EntryRecord>;
}

/// reqwest-backed [`JournalApi`] implementation.
#[derive(Debug, Clone)]
pub struct JournalApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl JournalApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into().as_str())?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| Error::Network(error.to_string()))?;
        Ok(Self { base_url, client })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn entries_url(&self) -> String {
        format!("{}/v1/entries", self.base_url)
    }

    fn entry_url(&self, server_id: ServerId) -> String {
        format!("{}/v1/entries/{server_id}", self.base_url)
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|error| Error::InvalidResponse(error.to_string()))
    }
}

#[async_trait]
impl JournalApi for JournalApiClient {
    async fn list_entries(
        &self,
        access_token: &str,
        limit: usize,
        offset: usize,
    ) -> Result<EntryPage> {
        let response = self
            .client
            .get(self.entries_url())
            .bearer_auth(access_token)
            .query(&[("limit", limit), ("offset", offset)])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::decode(response).await
    }

    async fn create_entry(
        &self,
        access_token: &str,
        request: &CreateEntryRequest,
    ) -> Result<EntryRecord> {
        let response = self
            .client
            .post(self.entries_url())
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::decode(response).await
    }

    async fn update_entry(
        &self,
        access_token: &str,
        server_id: ServerId,
        request: &UpdateEntryRequest,
    ) -> Result<Vec<String>> {
        let response = self
            .client
            .patch(self.entry_url(server_id))
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;
        let payload: UpdateEntryResponse = Self::decode(response).await?;
        Ok(payload.updated)
    }

    async fn delete_entry(&self, access_token: &str, server_id: ServerId) -> Result<()> {
        let response = self
            .client
            .delete(self.entry_url(server_id))
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        let payload: DeleteEntryResponse = Self::decode(response).await?;
        tracing::debug!(
            %server_id,
            status = payload.status.as_deref().unwrap_or("ok"),
            message = payload.message.as_deref().unwrap_or(""),
            "remote delete acknowledged"
        );
        Ok(())
    }

    async fn fetch_entry(&self, access_token: &str, server_id: ServerId) -> Result<EntryRecord> {
        let response = self
            .client
            .get(self.entry_url(server_id))
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        Self::decode(response).await
    }
}

fn map_transport_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else if error.is_decode() {
        Error::InvalidResponse(error.to_string())
    } else {
        Error::Network(error.to_string())
    }
}

async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    map_error_status(status, &body)
}

fn map_error_status(status: StatusCode, body: &str) -> Error {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized,
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::PAYMENT_REQUIRED => Error::InsufficientResource(message),
        _ if status.is_server_error() => Error::Network(message),
        _ => {
            if parse_error_code(body)
                .is_some_and(|code| code.starts_with("insufficient"))
            {
                Error::InsufficientResource(message)
            } else {
                Error::InvalidResponse(message)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
    code: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn parse_error_code(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|payload| payload.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_conversion_fills_defaults() {
        let record = EntryRecord {
            id: 42,
            ..EntryRecord::default()
        };
        let entry = record.into_entry();
        assert_eq!(entry.server_id(), Some(ServerId::new(42)));
        assert_eq!(entry.content, "");
        assert_eq!(entry.emotion, Emotion::Neutral);
        assert!(!entry.has_attachments());
        assert!(!entry.edited);
    }

    #[test]
    fn record_conversion_pairs_attachment_ids_with_urls() {
        let record = EntryRecord {
            id: 1,
            content: Some("with images".to_string()),
            emotion: Some("happy".to_string()),
            created_at: Some(1_700_000_000_000),
            image_ids: vec!["10".to_string(), "11".to_string()],
            image_urls: vec![
                "https://cdn.example.com/10.jpg".to_string(),
                "https://cdn.example.com/11.jpg".to_string(),
            ],
            ..EntryRecord::default()
        };
        let entry = record.into_entry();
        assert_eq!(entry.attachments.len(), 2);
        assert_eq!(
            entry.attachments[0],
            Attachment::existing("10", "https://cdn.example.com/10.jpg")
        );
        assert_eq!(entry.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn record_conversion_caps_attachments_at_maximum() {
        let record = EntryRecord {
            id: 1,
            image_ids: (0..5).map(|n| n.to_string()).collect(),
            image_urls: (0..5).map(|n| format!("https://x/{n}")).collect(),
            ..EntryRecord::default()
        };
        assert_eq!(record.into_entry().attachments.len(), MAX_ATTACHMENTS);
    }

    #[test]
    fn record_conversion_falls_back_to_plain_text_variant() {
        let record = EntryRecord {
            id: 2,
            content: None,
            content_text: Some("plain".to_string()),
            ..EntryRecord::default()
        };
        assert_eq!(record.into_entry().content, "plain");
    }

    #[test]
    fn record_conversion_preserves_known_identity() {
        let identity = EntryId::synced(ServerId::new(9));
        let local = identity.local();
        let record = EntryRecord {
            id: 9,
            content: Some("revised".to_string()),
            ..EntryRecord::default()
        };
        let entry = record.into_entry_as(identity, true);
        assert_eq!(entry.local_id(), local);
        assert!(entry.edited);
    }

    #[test]
    fn unauthorized_status_maps_to_session_error() {
        let error = map_error_status(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(error, Error::Unauthorized));
    }

    #[test]
    fn not_found_and_quota_statuses_map_to_their_kinds() {
        assert!(matches!(
            map_error_status(StatusCode::NOT_FOUND, r#"{"message":"no such entry"}"#),
            Error::NotFound(message) if message.contains("no such entry")
        ));
        assert!(matches!(
            map_error_status(StatusCode::PAYMENT_REQUIRED, r#"{"message":"quota exhausted"}"#),
            Error::InsufficientResource(message) if message.contains("quota exhausted")
        ));
    }

    #[test]
    fn insufficient_error_code_maps_regardless_of_status() {
        let body = r#"{"message":"not enough credits","code":"insufficient_quota"}"#;
        assert!(matches!(
            map_error_status(StatusCode::FORBIDDEN, body),
            Error::InsufficientResource(_)
        ));
    }

    #[test]
    fn server_errors_are_retryable() {
        let error = map_error_status(StatusCode::BAD_GATEWAY, "");
        assert!(error.is_retryable());
    }

    #[test]
    fn other_client_errors_surface_as_invalid_response() {
        let error = map_error_status(StatusCode::UNPROCESSABLE_ENTITY, r#"{"error":"bad emotion"}"#);
        assert!(matches!(
            error,
            Error::InvalidResponse(message) if message.contains("bad emotion")
        ));
    }

    #[test]
    fn parse_api_error_handles_unstructured_bodies() {
        let rendered = parse_api_error(StatusCode::BAD_REQUEST, "plain text failure");
        assert_eq!(rendered, "plain text failure (400)");

        let rendered = parse_api_error(StatusCode::BAD_REQUEST, "");
        assert_eq!(rendered, "HTTP 400");
    }

    #[test]
    fn update_request_omits_unset_fields() {
        let request = UpdateEntryRequest {
            content: Some("revised".to_string()),
            emotion: None,
            keep_image_ids: vec![10],
            add_image_data: Vec::new(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"content\""));
        assert!(!json.contains("\"emotion\""));
        assert!(json.contains("\"keep_image_ids\":[10]"));
    }

    #[test]
    fn create_request_omits_empty_attachment_payloads() {
        let request = CreateEntryRequest {
            content: "today was fine".to_string(),
            emotion: "happy".to_string(),
            add_image_data: Vec::new(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("add_image_data"));
    }

    #[test]
    fn client_rejects_invalid_base_url() {
        assert!(JournalApiClient::new("api.example.com").is_err());
        assert!(JournalApiClient::new("https://api.example.com/").is_ok());
    }
}
