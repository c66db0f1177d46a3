//! In-process publishing API for testing
//!
//! `MockDraftApi` implements [`DraftApi`] without any network access. It
//! records every call, echoes draft content back as a `DraftResult`, keeps
//! created drafts so they can be read back, and can be told to fail or stall
//! for specific credentials. Used to verify orchestration logic such as
//! per-account isolation and rate-limit handling.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use crate::client::DraftApi;
use crate::credentials::ApiKey;
use crate::error::{ApiErrorDetail, Result, TypecastError};
use crate::gate::Approved;
use crate::types::{
    DraftFilter, DraftRequest, DraftResult, DraftStatus, DraftUpdate, NotificationKind,
    NotificationList, Page, Pagination, PostAnalytics, ScheduleDirective, SocialSet, UserProfile,
};

const MOCK_APP_URL: &str = "https://typefully.test";

/// Failure to inject for a credential
#[derive(Debug, Clone, PartialEq)]
pub enum MockFailure {
    Validation { message: String, field: Option<String> },
    Authentication,
    Permission,
    NotFound,
    RateLimit { retry_after: Option<u64> },
    Transient,
}

impl MockFailure {
    fn to_error(&self) -> TypecastError {
        match self {
            MockFailure::Validation { message, field } => {
                TypecastError::remote_validation(ApiErrorDetail {
                    field: field.clone(),
                    ..ApiErrorDetail::new(Some(400), message.clone())
                })
            }
            MockFailure::Authentication => {
                TypecastError::Authentication(ApiErrorDetail::new(Some(401), "Invalid API key"))
            }
            MockFailure::Permission => {
                TypecastError::Permission(ApiErrorDetail::new(Some(403), "Forbidden"))
            }
            MockFailure::NotFound => {
                TypecastError::NotFound(ApiErrorDetail::new(Some(404), "Not found"))
            }
            MockFailure::RateLimit { retry_after } => TypecastError::RateLimit(ApiErrorDetail {
                retry_after: *retry_after,
                ..ApiErrorDetail::new(Some(429), "Too many requests")
            }),
            MockFailure::Transient => TypecastError::TransientService(ApiErrorDetail::new(
                Some(503),
                "Service unavailable",
            )),
        }
    }
}

/// Behaviour for one credential
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    pub failure: Option<MockFailure>,
    pub delay: Duration,
}

/// A call made against the mock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Raw credential the call was made with
    pub key: String,
    pub operation: &'static str,
    pub payload: serde_json::Value,
}

#[derive(Default)]
pub struct MockDraftApi {
    behaviors: HashMap<String, MockBehavior>,
    default_delay: Duration,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    drafts: Arc<Mutex<BTreeMap<String, DraftResult>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockDraftApi {
    /// A mock that accepts everything immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call made with `key`
    pub fn with_failure(mut self, key: &str, failure: MockFailure) -> Self {
        self.behaviors.entry(key.to_string()).or_default().failure = Some(failure);
        self
    }

    /// Delay every call made with `key`
    pub fn with_delay(mut self, key: &str, delay: Duration) -> Self {
        self.behaviors.entry(key.to_string()).or_default().delay = delay;
        self
    }

    /// Delay calls for credentials without their own behaviour
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Draft payloads submitted with `key`, in call order
    pub fn created_with(&self, key: &str) -> Vec<DraftRequest> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.operation == "create_draft" && call.key == key)
            .filter_map(|call| serde_json::from_value(call.payload.clone()).ok())
            .collect()
    }

    /// Highest number of calls observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Calls currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Record a call, apply configured delay and failure
    async fn enter(
        &self,
        key: &ApiKey,
        operation: &'static str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let key = key.expose().to_string();
        let behavior = self.behaviors.get(&key).cloned().unwrap_or(MockBehavior {
            failure: None,
            delay: self.default_delay,
        });

        self.calls.lock().unwrap().push(RecordedCall {
            key,
            operation,
            payload,
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        if !behavior.delay.is_zero() {
            sleep(behavior.delay).await;
        }

        match behavior.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn stored(&self, draft_id: &str) -> Result<DraftResult> {
        self.drafts
            .lock()
            .unwrap()
            .get(draft_id)
            .cloned()
            .ok_or_else(|| {
                TypecastError::NotFound(ApiErrorDetail::new(
                    Some(404),
                    format!("Draft {} not found", draft_id),
                ))
            })
    }
}

/// Decrements the in-flight count even when the call future is dropped
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn status_for(schedule: &Option<ScheduleDirective>) -> DraftStatus {
    match schedule {
        Some(ScheduleDirective::Now) => DraftStatus::Publishing,
        Some(_) => DraftStatus::Scheduled,
        None => DraftStatus::Draft,
    }
}

#[async_trait]
impl DraftApi for MockDraftApi {
    async fn create_draft(
        &self,
        key: &ApiKey,
        request: &Approved<DraftRequest>,
    ) -> Result<DraftResult> {
        let payload = request.get();
        self.enter(
            key,
            "create_draft",
            serde_json::to_value(payload).unwrap_or_default(),
        )
        .await?;

        let id = Uuid::new_v4().to_string();
        let result = DraftResult {
            edit_url: Some(format!("{}/?d={}", MOCK_APP_URL, id)),
            share_url: payload
                .share
                .then(|| format!("{}/share/{}", MOCK_APP_URL, id)),
            share_id: None,
            status: status_for(&payload.schedule),
            scheduled_date: match &payload.schedule {
                Some(ScheduleDirective::At(at)) => Some(*at),
                _ => None,
            },
            title: payload.title.clone(),
            tags: payload.tags.clone(),
            platforms: payload.platforms.clone(),
            id,
        };

        self.drafts
            .lock()
            .unwrap()
            .insert(result.id.clone(), result.clone());
        Ok(result)
    }

    async fn get_draft(&self, key: &ApiKey, draft_id: &str) -> Result<DraftResult> {
        self.enter(key, "get_draft", serde_json::json!({ "id": draft_id }))
            .await?;
        self.stored(draft_id)
    }

    async fn list_drafts(
        &self,
        key: &ApiKey,
        filter: &DraftFilter,
        page: Pagination,
    ) -> Result<Page<DraftResult>> {
        page.validate()?;
        self.enter(
            key,
            "list_drafts",
            serde_json::json!({ "limit": page.limit, "offset": page.offset }),
        )
        .await?;

        let matching: Vec<DraftResult> = self
            .drafts
            .lock()
            .unwrap()
            .values()
            .filter(|d| filter.status.map_or(true, |s| d.status == s))
            .filter(|d| filter.tag.as_ref().map_or(true, |t| d.tags.contains(t)))
            .cloned()
            .collect();

        Ok(Page {
            count: matching.len() as u64,
            results: matching
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect(),
            limit: page.limit,
            offset: page.offset,
            next: None,
            previous: None,
        })
    }

    async fn update_draft(
        &self,
        key: &ApiKey,
        draft_id: &str,
        update: &Approved<DraftUpdate>,
    ) -> Result<DraftResult> {
        let changes = update.get();
        self.enter(
            key,
            "update_draft",
            serde_json::to_value(changes).unwrap_or_default(),
        )
        .await?;

        let mut draft = self.stored(draft_id)?;
        if let Some(platforms) = &changes.platforms {
            draft.platforms = platforms.clone();
        }
        if let Some(title) = &changes.title {
            draft.title = Some(title.clone());
        }
        if let Some(tags) = &changes.tags {
            draft.tags = tags.clone();
        }
        if changes.schedule.is_some() {
            draft.status = status_for(&changes.schedule);
        }

        self.drafts
            .lock()
            .unwrap()
            .insert(draft.id.clone(), draft.clone());
        Ok(draft)
    }

    async fn get_analytics(&self, key: &ApiKey, limit: u32) -> Result<Page<PostAnalytics>> {
        Pagination::new(limit, 0)?;
        self.enter(key, "get_analytics", serde_json::json!({ "limit": limit }))
            .await?;
        Ok(Page {
            results: vec![],
            count: 0,
            limit,
            offset: 0,
            next: None,
            previous: None,
        })
    }

    async fn list_social_sets(&self, key: &ApiKey) -> Result<Page<SocialSet>> {
        self.enter(key, "list_social_sets", serde_json::Value::Null)
            .await?;
        Ok(Page {
            results: vec![SocialSet {
                id: "1".to_string(),
                username: Some("mock".to_string()),
                name: Some("Mock Set".to_string()),
                profile_image_url: None,
            }],
            count: 1,
            limit: Pagination::DEFAULT_LIMIT,
            offset: 0,
            next: None,
            previous: None,
        })
    }

    async fn get_me(&self, key: &ApiKey) -> Result<UserProfile> {
        self.enter(key, "get_me", serde_json::Value::Null).await?;
        Ok(UserProfile {
            id: "mock-user".to_string(),
            name: Some("Mock User".to_string()),
            email: None,
        })
    }

    async fn get_notifications(
        &self,
        key: &ApiKey,
        kind: NotificationKind,
    ) -> Result<NotificationList> {
        self.enter(
            key,
            "get_notifications",
            serde_json::json!({ "kind": kind.as_str() }),
        )
        .await?;
        Ok(NotificationList {
            notifications: vec![],
        })
    }

    async fn mark_notifications_read(
        &self,
        key: &ApiKey,
        kind: Option<NotificationKind>,
        username: Option<&str>,
    ) -> Result<serde_json::Value> {
        self.enter(
            key,
            "mark_notifications_read",
            serde_json::json!({ "kind": kind.map(|k| k.as_str()), "username": username }),
        )
        .await?;
        Ok(serde_json::json!({ "marked_read": true }))
    }
}
