//! HTTP implementation of [`DraftApi`] against the Typefully v2 API

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::client::DraftApi;
use crate::config::ApiConfig;
use crate::credentials::ApiKey;
use crate::error::{ApiErrorDetail, ConfigError, Result, TypecastError};
use crate::gate::Approved;
use crate::types::{
    DraftFilter, DraftRequest, DraftResult, DraftUpdate, NotificationKind, NotificationList, Page,
    Pagination, PostAnalytics, SocialSet, UserProfile,
};

const MAX_RAW_MESSAGE_LEN: usize = 200;

/// Remote error body: `{error, message, details{field, code}}`
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

pub struct TypefullyClient {
    http: Client,
    base_url: String,
    app_url: String,
    timeout: Duration,
}

impl TypefullyClient {
    /// Build a client with the configured base URL and per-request timeout
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the HTTP client cannot be
    /// constructed (e.g. TLS backend initialization fails).
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("typecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "api".to_string(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_url: config.app_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and decode a successful JSON body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, context: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e, context))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, context))?;

        if !status.is_success() {
            let error = classify_status(status.as_u16(), &body, retry_after);
            tracing::debug!("{} failed: {}", context, error);
            return Err(error);
        }

        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            TypecastError::TransientService(ApiErrorDetail::new(
                Some(status.as_u16()),
                format!("could not decode response while {}: {}", context, e),
            ))
        })
    }

    fn transport_error(&self, error: reqwest::Error, context: &str) -> TypecastError {
        let message = if error.is_timeout() {
            format!(
                "request timed out after {}s while {}",
                self.timeout.as_secs(),
                context
            )
        } else if error.is_connect() {
            format!("could not connect to the publishing API while {}: {}", context, error)
        } else {
            format!("network error while {}: {}", context, error)
        };

        tracing::debug!("{}", message);
        TypecastError::TransientService(ApiErrorDetail::new(None, message))
    }

    /// Fill URLs the response left out
    fn with_links(&self, mut result: DraftResult, share_requested: bool) -> DraftResult {
        if result.edit_url.is_none() {
            result.edit_url = Some(format!("{}/?d={}", self.app_url, result.id));
        }

        if result.share_url.is_none() {
            if let Some(share_id) = &result.share_id {
                result.share_url = Some(format!("{}/share/{}", self.app_url, share_id));
            } else if share_requested {
                result.share_url = Some(format!("{}/share/{}", self.app_url, result.id));
            }
        }

        result
    }
}

fn draft_path(draft_id: &str) -> Result<String> {
    let id = draft_id.trim();
    if id.is_empty() || id.contains(|c| matches!(c, '/' | '?' | '#')) {
        return Err(TypecastError::validation_field(
            format!("Invalid draft id '{}'", draft_id),
            "draft_id",
        ));
    }
    Ok(format!("drafts/{}", id))
}

/// Map a non-success HTTP status and body onto the error taxonomy
pub fn classify_status(status: u16, body: &str, retry_after: Option<u64>) -> TypecastError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let (field, code) = match &parsed.details {
        Some(serde_json::Value::Object(details)) => (
            details.get("field").and_then(|v| v.as_str()).map(String::from),
            details.get("code").and_then(|v| v.as_str()).map(String::from),
        ),
        _ => (None, None),
    };

    let message = parsed
        .message
        .clone()
        .or_else(|| parsed.error.clone())
        .or_else(|| {
            let raw = body.trim();
            (!raw.is_empty()).then(|| raw.chars().take(MAX_RAW_MESSAGE_LEN).collect())
        })
        .or_else(|| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(String::from)
        })
        .unwrap_or_else(|| "request failed".to_string());

    let detail = ApiErrorDetail {
        status: Some(status),
        error: parsed.error,
        message,
        field,
        code,
        retry_after,
    };

    match status {
        400 | 422 => TypecastError::remote_validation(detail),
        401 => TypecastError::Authentication(detail),
        403 => TypecastError::Permission(detail),
        404 => TypecastError::NotFound(detail),
        429 => TypecastError::RateLimit(detail),
        500..=599 => TypecastError::TransientService(detail),
        _ => TypecastError::UnexpectedStatus(detail),
    }
}

#[async_trait]
impl DraftApi for TypefullyClient {
    async fn create_draft(
        &self,
        key: &ApiKey,
        request: &Approved<DraftRequest>,
    ) -> Result<DraftResult> {
        let payload = request.get();
        tracing::debug!(
            "Creating draft for {} platform(s), schedule: {}",
            payload.platforms.len(),
            payload
                .schedule
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        let builder = self
            .http
            .post(self.url("drafts"))
            .bearer_auth(key.expose())
            .json(payload);

        let result: DraftResult = self.send(builder, "creating draft").await?;
        tracing::info!("Created draft {} ({})", result.id, result.status);
        Ok(self.with_links(result, payload.share))
    }

    async fn get_draft(&self, key: &ApiKey, draft_id: &str) -> Result<DraftResult> {
        let builder = self
            .http
            .get(self.url(&draft_path(draft_id)?))
            .bearer_auth(key.expose());

        let result = self.send(builder, "fetching draft").await?;
        Ok(self.with_links(result, false))
    }

    async fn list_drafts(
        &self,
        key: &ApiKey,
        filter: &DraftFilter,
        page: Pagination,
    ) -> Result<Page<DraftResult>> {
        page.validate()?;

        let mut query: Vec<(&str, String)> = vec![
            ("limit", page.limit.to_string()),
            ("offset", page.offset.to_string()),
        ];
        if let Some(status) = filter.status {
            query.push(("status", status.to_string()));
        }
        if let Some(tag) = &filter.tag {
            query.push(("tag", tag.clone()));
        }

        let builder = self
            .http
            .get(self.url("drafts"))
            .bearer_auth(key.expose())
            .query(&query);

        let mut listing: Page<DraftResult> = self.send(builder, "listing drafts").await?;
        listing.results = listing
            .results
            .into_iter()
            .map(|draft| self.with_links(draft, false))
            .collect();
        Ok(listing)
    }

    async fn update_draft(
        &self,
        key: &ApiKey,
        draft_id: &str,
        update: &Approved<DraftUpdate>,
    ) -> Result<DraftResult> {
        if update.get().is_empty() {
            return Err(TypecastError::validation("Draft update has no changes"));
        }

        let builder = self
            .http
            .patch(self.url(&draft_path(draft_id)?))
            .bearer_auth(key.expose())
            .json(update.get());

        let result: DraftResult = self.send(builder, "updating draft").await?;
        tracing::info!("Updated draft {} ({})", result.id, result.status);
        Ok(self.with_links(result, update.get().share.unwrap_or(false)))
    }

    async fn get_analytics(&self, key: &ApiKey, limit: u32) -> Result<Page<PostAnalytics>> {
        Pagination::new(limit, 0)?;

        let builder = self
            .http
            .get(self.url("analytics"))
            .bearer_auth(key.expose())
            .query(&[("limit", limit.to_string())]);

        self.send(builder, "fetching analytics").await
    }

    async fn list_social_sets(&self, key: &ApiKey) -> Result<Page<SocialSet>> {
        let builder = self
            .http
            .get(self.url("social-sets"))
            .bearer_auth(key.expose());

        self.send(builder, "listing social sets").await
    }

    async fn get_me(&self, key: &ApiKey) -> Result<UserProfile> {
        let builder = self.http.get(self.url("me")).bearer_auth(key.expose());
        self.send(builder, "fetching user profile").await
    }

    async fn get_notifications(
        &self,
        key: &ApiKey,
        kind: NotificationKind,
    ) -> Result<NotificationList> {
        let builder = self
            .http
            .get(self.url("notifications"))
            .bearer_auth(key.expose())
            .query(&[("kind", kind.as_str())]);

        self.send(builder, "fetching notifications").await
    }

    async fn mark_notifications_read(
        &self,
        key: &ApiKey,
        kind: Option<NotificationKind>,
        username: Option<&str>,
    ) -> Result<serde_json::Value> {
        let mut body = serde_json::Map::new();
        if let Some(kind) = kind {
            body.insert("kind".to_string(), kind.as_str().into());
        }
        if let Some(username) = username {
            body.insert("username".to_string(), username.into());
        }

        let builder = self
            .http
            .post(self.url("notifications/mark-all-read"))
            .bearer_auth(key.expose())
            .json(&body);

        self.send(builder, "marking notifications read").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TypefullyClient {
        TypefullyClient::new(&ApiConfig::default()).unwrap()
    }

    #[test]
    fn test_classify_status_table() {
        assert!(matches!(classify_status(401, "", None), TypecastError::Authentication(_)));
        assert!(matches!(classify_status(403, "", None), TypecastError::Permission(_)));
        assert!(matches!(classify_status(404, "", None), TypecastError::NotFound(_)));
        assert!(matches!(classify_status(429, "", None), TypecastError::RateLimit(_)));
        assert!(matches!(classify_status(400, "", None), TypecastError::Validation { .. }));
        assert!(matches!(classify_status(500, "", None), TypecastError::TransientService(_)));
        assert!(matches!(classify_status(503, "", None), TypecastError::TransientService(_)));
        assert!(matches!(classify_status(409, "", None), TypecastError::UnexpectedStatus(_)));
    }

    #[test]
    fn test_classify_status_extracts_field_detail() {
        let body = r#"{"error": "validation_error", "message": "Unknown tag", "details": {"field": "tags", "code": "invalid_choice"}}"#;
        let err = classify_status(400, body, None);
        match &err {
            TypecastError::Validation { message, field, .. } => {
                assert_eq!(message, "Unknown tag");
                assert_eq!(field.as_deref(), Some("tags"));
            }
            other => panic!("Expected Validation, got {:?}", other),
        }

        let record = err.to_record();
        assert_eq!(record.status, Some(400));
        assert_eq!(record.code.as_deref(), Some("invalid_choice"));
        assert_eq!(err.detail().unwrap().error.as_deref(), Some("validation_error"));
    }

    #[test]
    fn test_classify_status_keeps_retry_after_and_code() {
        let body = r#"{"error": "rate_limited", "message": "Slow down", "details": {"code": "throttled"}}"#;
        let err = classify_status(429, body, Some(12));
        let detail = err.detail().unwrap();
        assert_eq!(detail.retry_after, Some(12));
        assert_eq!(detail.code.as_deref(), Some("throttled"));
        assert_eq!(detail.error.as_deref(), Some("rate_limited"));
    }

    #[test]
    fn test_classify_status_with_non_json_body() {
        let err = classify_status(502, "<html>Bad Gateway</html>", None);
        assert_eq!(err.detail().unwrap().message, "<html>Bad Gateway</html>");
    }

    #[test]
    fn test_classify_status_with_empty_body_uses_reason() {
        let err = classify_status(503, "", None);
        assert_eq!(err.detail().unwrap().message, "Service Unavailable");
    }

    #[test]
    fn test_draft_path_rejects_traversal() {
        assert_eq!(draft_path(" d1 ").unwrap(), "drafts/d1");
        assert!(draft_path("").is_err());
        assert!(draft_path("../me").is_err());
        assert!(draft_path("d1?x=1").is_err());
    }

    #[test]
    fn test_links_are_derived_when_missing() {
        let result: DraftResult = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "status": "draft",
            "share_id": "s-1"
        }))
        .unwrap();

        let result = client().with_links(result, false);
        assert_eq!(result.edit_url.as_deref(), Some("https://typefully.com/?d=abc"));
        assert_eq!(result.share_url.as_deref(), Some("https://typefully.com/share/s-1"));
    }

    #[test]
    fn test_share_url_only_when_requested_without_share_id() {
        let result: DraftResult =
            serde_json::from_value(serde_json::json!({"id": "abc", "status": "draft"})).unwrap();

        assert_eq!(client().with_links(result.clone(), false).share_url, None);
        assert_eq!(
            client().with_links(result, true).share_url.as_deref(),
            Some("https://typefully.com/share/abc")
        );
    }

    #[test]
    fn test_url_joining() {
        let config = ApiConfig {
            base_url: "http://localhost:1234/v2/".to_string(),
            ..Default::default()
        };
        let client = TypefullyClient::new(&config).unwrap();
        assert_eq!(client.url("drafts"), "http://localhost:1234/v2/drafts");
    }
}
