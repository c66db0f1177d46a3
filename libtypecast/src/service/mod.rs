//! Service layer for Typecast
//!
//! `TypecastService` is the single entry point used by the CLI. It owns the
//! immutable settings and credential store, the safety gate, and a
//! [`DraftApi`] implementation, and exposes one method per command.
//!
//! # Example
//!
//! ```no_run
//! use libtypecast::service::{CreateDraft, TypecastService};
//! use libtypecast::types::Platform;
//!
//! # async fn example() -> libtypecast::Result<()> {
//! let service = TypecastService::new()?;
//!
//! let draft = CreateDraft::new("First post\n\n\n\nSecond post")
//!     .platforms(vec![Platform::X, Platform::Linkedin]);
//!
//! let outcome = service.create_draft("personal", draft).await?;
//! if outcome.downgraded() {
//!     eprintln!("Scheduling is disabled; created an unscheduled draft");
//! }
//! println!("Edit at {:?}", outcome.result.edit_url);
//! # Ok(())
//! # }
//! ```

pub mod draft;

pub use draft::{CreateDraft, DraftOutcome};

use std::path::Path;
use std::sync::Arc;

use crate::builder::build_spec;
use crate::client::{DraftApi, TypefullyClient};
use crate::config::Settings;
use crate::credentials::CredentialStore;
use crate::crosspost::{AbortSignal, ContentMap, CrossPostOptions, CrossPostReport, CrossPoster};
use crate::gate::SafetyGate;
use crate::types::{
    DraftFilter, DraftResult, DraftUpdate, NotificationKind, NotificationList, Page, Pagination,
    PostAnalytics, SocialSet, UserProfile,
};
use crate::Result;

/// Main service facade
///
/// Settings and credentials are loaded once and shared behind `Arc`; nothing
/// in the service mutates them afterwards.
pub struct TypecastService<A: DraftApi = TypefullyClient> {
    settings: Arc<Settings>,
    credentials: Arc<CredentialStore>,
    gate: SafetyGate,
    api: A,
}

impl TypecastService<TypefullyClient> {
    /// Create a service from the default configuration location
    ///
    /// # Errors
    ///
    /// Returns an error if the settings or credentials file is malformed.
    pub fn new() -> Result<Self> {
        let settings = Settings::load()?;
        Self::from_settings(settings, None)
    }

    /// Create a service from loaded settings
    ///
    /// `env_file` overrides the credentials file named in the settings.
    pub fn from_settings(settings: Settings, env_file: Option<&Path>) -> Result<Self> {
        let env_path = match env_file {
            Some(path) => path.to_path_buf(),
            None => settings.credentials.env_file_path(),
        };

        let credentials = CredentialStore::from_env_file(&env_path, &settings.credentials.prefix)?;
        let api = TypefullyClient::new(&settings.api)?;
        Ok(Self::with_api(settings, credentials, api))
    }
}

impl<A: DraftApi> TypecastService<A> {
    /// Assemble a service around any `DraftApi` implementation
    pub fn with_api(settings: Settings, credentials: CredentialStore, api: A) -> Self {
        let gate = SafetyGate::from_settings(&settings);
        Self {
            settings: Arc::new(settings),
            credentials: Arc::new(credentials),
            gate,
            api,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn gate(&self) -> SafetyGate {
        self.gate
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Split, build, gate and submit one draft
    pub async fn create_draft(&self, account: &str, draft: CreateDraft) -> Result<DraftOutcome> {
        let request = build_spec(draft.into_spec(&self.settings))?;

        let warnings = request.length_warnings();
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let approved = self.gate.approve(request);
        let key = self.credentials.resolve(account)?;
        let result = self.api.create_draft(key, &approved).await?;

        Ok(DraftOutcome {
            result,
            gate: approved.decision().clone(),
            warnings,
        })
    }

    /// Submit content to several accounts, recording each outcome separately
    ///
    /// Empty `options.platforms` means the configured default platforms.
    pub async fn cross_post(
        &self,
        accounts: &[String],
        content: &ContentMap,
        mut options: CrossPostOptions,
        abort: Option<AbortSignal>,
    ) -> CrossPostReport {
        if options.platforms.is_empty() {
            options.platforms = self.settings.default_platforms.clone();
        }

        CrossPoster::new(&self.api, &self.credentials, self.gate)
            .with_max_concurrency(self.settings.api.max_concurrency)
            .cross_post_with_abort(accounts, content, &options, abort)
            .await
    }

    pub async fn get_draft(&self, account: &str, draft_id: &str) -> Result<DraftResult> {
        let key = self.credentials.resolve(account)?;
        self.api.get_draft(key, draft_id).await
    }

    pub async fn list_drafts(
        &self,
        account: &str,
        filter: &DraftFilter,
        page: Pagination,
    ) -> Result<Page<DraftResult>> {
        page.validate()?;
        let key = self.credentials.resolve(account)?;
        self.api.list_drafts(key, filter, page).await
    }

    /// Update an existing draft; a schedule in the update is gated too
    pub async fn update_draft(
        &self,
        account: &str,
        draft_id: &str,
        update: DraftUpdate,
    ) -> Result<DraftOutcome> {
        let approved = self.gate.approve_update(update);
        let key = self.credentials.resolve(account)?;
        let result = self.api.update_draft(key, draft_id, &approved).await?;

        Ok(DraftOutcome {
            result,
            gate: approved.decision().clone(),
            warnings: vec![],
        })
    }

    pub async fn get_analytics(&self, account: &str, limit: u32) -> Result<Page<PostAnalytics>> {
        Pagination::new(limit, 0)?;
        let key = self.credentials.resolve(account)?;
        self.api.get_analytics(key, limit).await
    }

    pub async fn list_social_sets(&self, account: &str) -> Result<Page<SocialSet>> {
        let key = self.credentials.resolve(account)?;
        self.api.list_social_sets(key).await
    }

    /// Configured account names, sorted; never the keys
    pub fn list_accounts(&self) -> Vec<String> {
        self.credentials.account_names()
    }

    pub async fn get_me(&self, account: &str) -> Result<UserProfile> {
        let key = self.credentials.resolve(account)?;
        self.api.get_me(key).await
    }

    pub async fn get_notifications(
        &self,
        account: &str,
        kind: NotificationKind,
    ) -> Result<NotificationList> {
        let key = self.credentials.resolve(account)?;
        self.api.get_notifications(key, kind).await
    }

    pub async fn mark_notifications_read(
        &self,
        account: &str,
        kind: Option<NotificationKind>,
        username: Option<&str>,
    ) -> Result<serde_json::Value> {
        let key = self.credentials.resolve(account)?;
        self.api.mark_notifications_read(key, kind, username).await
    }
}
