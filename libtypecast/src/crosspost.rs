//! Cross-posting one logical operation to many accounts
//!
//! Each account is resolved, built, gated and submitted on its own. Whatever
//! happens to one account is recorded against that account and never stops
//! the others, so the report always holds one entry per distinct account.
//!
//! With `max_concurrency == 1` accounts are processed one at a time in input
//! order. Higher values run submissions concurrently behind a semaphore; the
//! first 429 moves every submission that has not started yet onto a single
//! serial lane.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::{watch, Mutex, Semaphore};
use tracing::{debug, info, warn};

use crate::builder::{build_spec, DraftSpec};
use crate::client::DraftApi;
use crate::content::split_posts;
use crate::credentials::{AccountName, CredentialStore};
use crate::error::{ErrorRecord, Result, TypecastError};
use crate::gate::{GateDecision, SafetyGate};
use crate::types::{DraftOptions, DraftResult, Platform, ScheduleDirective};

/// Content for one account
///
/// Either one text for every platform, or a default text plus per-platform
/// overrides:
///
/// ```json
/// { "text": "Shared", "platforms": { "linkedin": "Longer version" } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum AccountContent {
    Text(String),
    Detailed {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        platforms: BTreeMap<Platform, String>,
    },
}

impl AccountContent {
    /// Split content into a shared post sequence and per-platform overrides
    pub fn to_posts(&self) -> (Vec<String>, BTreeMap<Platform, Vec<String>>) {
        match self {
            AccountContent::Text(text) => (split_posts(text), BTreeMap::new()),
            AccountContent::Detailed { text, platforms } => (
                text.as_deref().map(split_posts).unwrap_or_default(),
                platforms
                    .iter()
                    .map(|(platform, text)| (*platform, split_posts(text)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for AccountContent {
    fn from(text: &str) -> Self {
        AccountContent::Text(text.to_string())
    }
}

/// Account → content mapping with validated, case-insensitive keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentMap {
    entries: BTreeMap<AccountName, AccountContent>,
}

impl ContentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `account → content`
    ///
    /// # Errors
    ///
    /// Returns `TypecastError::Validation` for malformed JSON, invalid
    /// account names, or two keys naming the same account.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, AccountContent> = serde_json::from_str(json).map_err(|e| {
            TypecastError::validation_field(format!("Invalid content map: {}", e), "content_map")
        })?;

        let mut map = Self::new();
        for (account, content) in raw {
            map.insert(&account, content)?;
        }
        Ok(map)
    }

    pub fn insert(&mut self, account: &str, content: impl Into<AccountContent>) -> Result<()> {
        let name = AccountName::parse(account)?;
        if self.entries.contains_key(&name) {
            return Err(TypecastError::validation_field(
                format!("Content for account '{}' is given more than once", name),
                "content_map",
            ));
        }
        self.entries.insert(name, content.into());
        Ok(())
    }

    pub fn with(mut self, account: &str, content: impl Into<AccountContent>) -> Result<Self> {
        self.insert(account, content)?;
        Ok(self)
    }

    pub fn get(&self, account: &str) -> Option<&AccountContent> {
        AccountName::parse(account)
            .ok()
            .and_then(|name| self.entries.get(&name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Request-wide options shared by every account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossPostOptions {
    pub platforms: Vec<Platform>,
    pub schedule: Option<ScheduleDirective>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub share: bool,
    pub draft_options: DraftOptions,
}

/// Outcome for a single account
#[derive(Debug)]
pub struct CrossPostEntry {
    pub account: String,
    pub outcome: Result<DraftResult>,
}

impl CrossPostEntry {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-account results in input order
#[derive(Debug)]
pub struct CrossPostReport {
    entries: Vec<CrossPostEntry>,
    gate: GateDecision,
}

impl CrossPostReport {
    pub fn entries(&self) -> &[CrossPostEntry] {
        &self.entries
    }

    /// Outcome for an account, matched case-insensitively
    pub fn get(&self, account: &str) -> Option<&Result<DraftResult>> {
        let wanted = account.trim().to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.account.to_lowercase() == wanted)
            .map(|entry| &entry.outcome)
    }

    pub fn gate(&self) -> &GateDecision {
        &self.gate
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum EntryRecord<'a> {
    Success(&'a DraftResult),
    Failure { error: ErrorRecord },
}

impl Serialize for CrossPostReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            let record = match &entry.outcome {
                Ok(result) => EntryRecord::Success(result),
                Err(e) => EntryRecord::Failure {
                    error: e.to_record(),
                },
            };
            map.serialize_entry(&entry.account, &record)?;
        }
        map.end()
    }
}

/// Sender half of an abort signal
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Cancel every submission that has not completed yet
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiver half of an abort signal, cheap to clone
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once abort is requested; never resolves if the handle is
    /// dropped without aborting
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a linked abort handle and signal
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

pub struct CrossPoster<'a, A: DraftApi + ?Sized> {
    api: &'a A,
    credentials: &'a CredentialStore,
    gate: SafetyGate,
    max_concurrency: usize,
}

impl<'a, A: DraftApi + ?Sized> CrossPoster<'a, A> {
    pub fn new(api: &'a A, credentials: &'a CredentialStore, gate: SafetyGate) -> Self {
        Self {
            api,
            credentials,
            gate,
            max_concurrency: 1,
        }
    }

    /// Allow up to `limit` concurrent submissions; 1 (or 0) means sequential
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    pub async fn cross_post(
        &self,
        accounts: &[String],
        content: &ContentMap,
        options: &CrossPostOptions,
    ) -> CrossPostReport {
        self.cross_post_with_abort(accounts, content, options, None)
            .await
    }

    /// Cross-post, cancelling still-pending accounts when `abort` fires
    pub async fn cross_post_with_abort(
        &self,
        accounts: &[String],
        content: &ContentMap,
        options: &CrossPostOptions,
        abort: Option<AbortSignal>,
    ) -> CrossPostReport {
        let accounts = distinct_accounts(accounts);
        let gate = self.gate.check(options.schedule.clone());
        let options = CrossPostOptions {
            schedule: gate.effective.clone(),
            ..options.clone()
        };

        info!(
            "Cross-posting to {} account(s) on {} platform(s)",
            accounts.len(),
            options.platforms.len()
        );

        let entries = if self.max_concurrency <= 1 {
            self.run_sequential(&accounts, content, &options, abort.as_ref())
                .await
        } else {
            self.run_bounded(&accounts, content, &options, abort.as_ref())
                .await
        };

        let report = CrossPostReport { entries, gate };
        info!(
            "Cross-post finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    async fn run_sequential(
        &self,
        accounts: &[String],
        content: &ContentMap,
        options: &CrossPostOptions,
        abort: Option<&AbortSignal>,
    ) -> Vec<CrossPostEntry> {
        let mut entries = Vec::with_capacity(accounts.len());
        for account in accounts {
            let outcome = self.run_abortable(account, content, options, abort).await;
            entries.push(CrossPostEntry {
                account: account.clone(),
                outcome,
            });
        }
        entries
    }

    async fn run_bounded(
        &self,
        accounts: &[String],
        content: &ContentMap,
        options: &CrossPostOptions,
        abort: Option<&AbortSignal>,
    ) -> Vec<CrossPostEntry> {
        let semaphore = Semaphore::new(self.max_concurrency);
        let serial_lane = Mutex::new(());
        let throttled = AtomicBool::new(false);

        let tasks = accounts.iter().map(|account| {
            let semaphore = &semaphore;
            let serial_lane = &serial_lane;
            let throttled = &throttled;
            async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => {
                        let _lane = if throttled.load(Ordering::SeqCst) {
                            Some(serial_lane.lock().await)
                        } else {
                            None
                        };

                        let outcome = self.run_abortable(account, content, options, abort).await;
                        if matches!(outcome, Err(TypecastError::RateLimit(_)))
                            && !throttled.swap(true, Ordering::SeqCst)
                        {
                            warn!(
                                "Rate limited while posting to '{}'; serializing remaining accounts",
                                account
                            );
                        }
                        outcome
                    }
                    Err(_) => Err(TypecastError::Cancelled {
                        account: account.clone(),
                    }),
                };

                CrossPostEntry {
                    account: account.clone(),
                    outcome,
                }
            }
        });

        join_all(tasks).await
    }

    async fn run_abortable(
        &self,
        account: &str,
        content: &ContentMap,
        options: &CrossPostOptions,
        abort: Option<&AbortSignal>,
    ) -> Result<DraftResult> {
        let cancelled = || TypecastError::Cancelled {
            account: account.to_string(),
        };

        let outcome = match abort {
            Some(signal) if signal.is_aborted() => Err(cancelled()),
            Some(signal) => {
                tokio::select! {
                    biased;
                    _ = signal.aborted() => Err(cancelled()),
                    outcome = self.submit(account, content, options) => outcome,
                }
            }
            None => self.submit(account, content, options).await,
        };

        match &outcome {
            Ok(result) => debug!("'{}' → draft {} ({})", account, result.id, result.status),
            Err(e) => warn!("Cross-post to '{}' failed: {}", account, e),
        }
        outcome
    }

    async fn submit(
        &self,
        account: &str,
        content: &ContentMap,
        options: &CrossPostOptions,
    ) -> Result<DraftResult> {
        let account_content = content.get(account).ok_or_else(|| {
            TypecastError::validation_field(
                format!("No content provided for account '{}'", account),
                format!("content_map.{}", account),
            )
        })?;

        let key = self.credentials.resolve(account)?;
        let (posts, overrides) = account_content.to_posts();

        let request = build_spec(DraftSpec {
            posts,
            platforms: options.platforms.clone(),
            overrides,
            schedule: options.schedule.clone(),
            title: options.title.clone(),
            tags: options.tags.clone(),
            share: options.share,
            options: options.draft_options,
        })?;

        for warning in request.length_warnings() {
            warn!("'{}': {}", account, warning);
        }

        let approved = self.gate.approve(request);
        self.api.create_draft(key, &approved).await
    }
}

/// Trim and drop repeated accounts (case-insensitive), keeping first occurrences
fn distinct_accounts(accounts: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(accounts.len());
    let mut distinct = Vec::with_capacity(accounts.len());

    for account in accounts {
        let trimmed = account.trim();
        let key = trimmed.to_lowercase();
        if seen.contains(&key) {
            warn!("Account '{}' listed more than once; posting once", trimmed);
            continue;
        }
        seen.push(key);
        distinct.push(trimmed.to_string());
    }

    distinct
}
