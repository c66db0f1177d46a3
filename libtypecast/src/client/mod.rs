//! Publishing API client abstraction
//!
//! [`DraftApi`] is the seam between orchestration and the network. The real
//! implementation is [`typefully::TypefullyClient`]; [`mock::MockDraftApi`]
//! stands in for it in tests.
//!
//! Every call takes the credential explicitly, so one client instance can
//! serve many accounts concurrently. Drafts and draft updates must arrive as
//! [`Approved`] payloads, which only the safety gate can produce.

use async_trait::async_trait;

use crate::credentials::ApiKey;
use crate::error::Result;
use crate::gate::Approved;
use crate::types::{
    DraftFilter, DraftRequest, DraftResult, DraftUpdate, NotificationKind, NotificationList, Page,
    Pagination, PostAnalytics, SocialSet, UserProfile,
};

pub mod typefully;

// Available outside tests so integration tests can drive orchestration offline
pub mod mock;

pub use typefully::TypefullyClient;

#[async_trait]
pub trait DraftApi: Send + Sync {
    /// Create a draft, optionally scheduled if the gate let a directive through
    ///
    /// # Errors
    ///
    /// Remote failures are classified by HTTP status: `Authentication` (401),
    /// `Permission` (403), `NotFound` (404), `RateLimit` (429), `Validation`
    /// (400/422), `TransientService` (5xx, timeouts, connection failures) and
    /// `UnexpectedStatus` for anything else.
    async fn create_draft(
        &self,
        key: &ApiKey,
        request: &Approved<DraftRequest>,
    ) -> Result<DraftResult>;

    async fn get_draft(&self, key: &ApiKey, draft_id: &str) -> Result<DraftResult>;

    async fn list_drafts(
        &self,
        key: &ApiKey,
        filter: &DraftFilter,
        page: Pagination,
    ) -> Result<Page<DraftResult>>;

    async fn update_draft(
        &self,
        key: &ApiKey,
        draft_id: &str,
        update: &Approved<DraftUpdate>,
    ) -> Result<DraftResult>;

    /// Engagement for recently published posts
    async fn get_analytics(&self, key: &ApiKey, limit: u32) -> Result<Page<PostAnalytics>>;

    async fn list_social_sets(&self, key: &ApiKey) -> Result<Page<SocialSet>>;

    async fn get_me(&self, key: &ApiKey) -> Result<UserProfile>;

    async fn get_notifications(
        &self,
        key: &ApiKey,
        kind: NotificationKind,
    ) -> Result<NotificationList>;

    /// Mark notifications read, optionally narrowed to a kind and a username
    async fn mark_notifications_read(
        &self,
        key: &ApiKey,
        kind: Option<NotificationKind>,
        username: Option<&str>,
    ) -> Result<serde_json::Value>;
}
