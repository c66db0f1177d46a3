//! Core types for Typecast
//!
//! Platform identifiers, scheduling directives, the draft request payload and
//! the response models returned by the publishing API.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TypecastError};

/// Platforms supported by the publishing service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    X,
    Linkedin,
    Threads,
    Bluesky,
    Mastodon,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::X,
        Platform::Linkedin,
        Platform::Threads,
        Platform::Bluesky,
        Platform::Mastodon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::X => "x",
            Platform::Linkedin => "linkedin",
            Platform::Threads => "threads",
            Platform::Bluesky => "bluesky",
            Platform::Mastodon => "mastodon",
        }
    }

    /// Per-post character limit enforced by the platform itself
    pub fn character_limit(&self) -> usize {
        match self {
            Platform::X => 280,
            Platform::Bluesky => 300,
            Platform::Threads => 500,
            Platform::Mastodon => 500,
            Platform::Linkedin => 3000,
        }
    }

    /// Parse a comma-separated platform list such as "x,linkedin"
    pub fn parse_list(input: &str) -> Result<Vec<Platform>> {
        let mut platforms = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let platform: Platform = part.parse()?;
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        Ok(platforms)
    }
}

impl FromStr for Platform {
    type Err = TypecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "x" | "twitter" => Ok(Platform::X),
            "linkedin" => Ok(Platform::Linkedin),
            "threads" => Ok(Platform::Threads),
            "bluesky" => Ok(Platform::Bluesky),
            "mastodon" => Ok(Platform::Mastodon),
            other => Err(TypecastError::validation_field(
                format!(
                    "Unknown platform '{}'. Valid options: x, linkedin, threads, bluesky, mastodon",
                    other
                ),
                "platforms",
            )),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When the remote service should publish a draft
///
/// Absence of a directive (`Option::None`) means draft-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ScheduleDirective {
    Now,
    NextFreeSlot,
    At(DateTime<Utc>),
}

impl fmt::Display for ScheduleDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleDirective::Now => write!(f, "now"),
            ScheduleDirective::NextFreeSlot => write!(f, "next-free-slot"),
            ScheduleDirective::At(at) => write!(f, "{}", at.to_rfc3339()),
        }
    }
}

impl From<ScheduleDirective> for String {
    fn from(directive: ScheduleDirective) -> Self {
        directive.to_string()
    }
}

impl TryFrom<String> for ScheduleDirective {
    type Error = TypecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl FromStr for ScheduleDirective {
    type Err = TypecastError;

    /// Strict wire-format parse; see `schedule::parse_directive` for the
    /// lenient user-facing parser.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "now" => Ok(ScheduleDirective::Now),
            "next-free-slot" => Ok(ScheduleDirective::NextFreeSlot),
            other => DateTime::parse_from_rfc3339(other)
                .map(|dt| ScheduleDirective::At(dt.with_timezone(&Utc)))
                .map_err(|e| {
                    TypecastError::validation_field(
                        format!("Invalid schedule directive '{}': {}", other, e),
                        "publish_at",
                    )
                }),
        }
    }
}

/// Lifecycle state of a draft on the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Scheduled,
    Publishing,
    Published,
    Error,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Scheduled => "scheduled",
            DraftStatus::Publishing => "publishing",
            DraftStatus::Published => "published",
            DraftStatus::Error => "error",
        }
    }
}

impl FromStr for DraftStatus {
    type Err = TypecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(DraftStatus::Draft),
            "scheduled" => Ok(DraftStatus::Scheduled),
            "publishing" => Ok(DraftStatus::Publishing),
            "published" => Ok(DraftStatus::Published),
            "error" => Ok(DraftStatus::Error),
            other => Err(TypecastError::validation_field(
                format!(
                    "Unknown draft status '{}'. Valid options: draft, scheduled, publishing, published, error",
                    other
                ),
                "status",
            )),
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single post inside a platform's post sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostText {
    pub text: String,
}

/// Content attached to one platform in a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformContent {
    pub enabled: bool,
    pub posts: Vec<PostText>,
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl PlatformContent {
    pub fn from_posts(posts: &[String]) -> Self {
        Self {
            enabled: true,
            posts: posts
                .iter()
                .map(|text| PostText { text: text.clone() })
                .collect(),
            settings: serde_json::Map::new(),
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.posts.iter().map(|p| p.text.as_str()).collect()
    }
}

/// Per-draft publishing options
///
/// Carried in each platform's `settings`, and only where they differ from
/// the service defaults: `threadify` is on remotely unless sent as `false`,
/// and AutoRT / AutoPlug exist only on X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftOptions {
    /// Let the service split posts that exceed a platform's length limit
    pub threadify: bool,
    pub auto_retweet: bool,
    pub auto_plug: bool,
}

impl Default for DraftOptions {
    fn default() -> Self {
        Self {
            threadify: true,
            auto_retweet: false,
            auto_plug: false,
        }
    }
}

impl DraftOptions {
    /// Platform settings entries for these options
    pub fn settings_for(
        &self,
        platform: Platform,
    ) -> serde_json::Map<String, serde_json::Value> {
        let mut settings = serde_json::Map::new();
        if !self.threadify {
            settings.insert("threadify".to_string(), false.into());
        }
        if platform == Platform::X {
            if self.auto_retweet {
                settings.insert("auto_retweet_enabled".to_string(), true.into());
            }
            if self.auto_plug {
                settings.insert("auto_plug_enabled".to_string(), true.into());
            }
        }
        settings
    }
}

/// Payload for draft creation
///
/// Produced by `builder::build` and submitted only after passing the
/// safety gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub platforms: BTreeMap<Platform, PlatformContent>,
    #[serde(rename = "draft_title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(rename = "publish_at", default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleDirective>,
    #[serde(default)]
    pub share: bool,
}

impl DraftRequest {
    /// Platforms enabled in this request, in identifier order
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        self.platforms
            .iter()
            .filter(|(_, content)| content.enabled)
            .map(|(platform, _)| *platform)
            .collect()
    }

    /// Non-blocking hints for posts longer than a platform accepts
    ///
    /// The remote service may still split long posts itself.
    pub fn length_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (platform, content) in &self.platforms {
            let limit = platform.character_limit();
            for (index, post) in content.posts.iter().enumerate() {
                let length = post.text.chars().count();
                if length > limit {
                    warnings.push(format!(
                        "{} post {} is {} characters (limit {})",
                        platform,
                        index + 1,
                        length,
                        limit
                    ));
                }
            }
        }
        warnings
    }
}

/// Partial update for an existing draft
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<BTreeMap<Platform, PlatformContent>>,
    #[serde(rename = "draft_title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "publish_at", default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleDirective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<bool>,
}

impl DraftUpdate {
    pub fn is_empty(&self) -> bool {
        self.platforms.is_none()
            && self.title.is_none()
            && self.tags.is_none()
            && self.schedule.is_none()
            && self.share.is_none()
    }
}

/// Draft as reported by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftResult {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub status: DraftStatus,
    #[serde(default, alias = "private_url", alias = "url")]
    pub edit_url: Option<String>,
    #[serde(default)]
    pub share_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub share_id: Option<String>,
    #[serde(default, alias = "publish_at")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "draft_title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub platforms: BTreeMap<Platform, PlatformContent>,
}

impl DraftResult {
    /// Post texts for one platform, if the response echoed them
    pub fn post_texts(&self, platform: Platform) -> Option<Vec<&str>> {
        self.platforms.get(&platform).map(PlatformContent::texts)
    }
}

/// Limit/offset pagination, as accepted by list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 50;

    pub fn new(limit: u32, offset: u32) -> Result<Self> {
        let page = Self { limit, offset };
        page.validate()?;
        Ok(page)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 || self.limit > Self::MAX_LIMIT {
            return Err(TypecastError::validation_field(
                format!(
                    "Limit must be between 1 and {} (got {})",
                    Self::MAX_LIMIT,
                    self.limit
                ),
                "limit",
            ));
        }
        Ok(())
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of a list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub count: u64,
    pub limit: u32,
    pub offset: u32,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

/// Filter for draft listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftFilter {
    pub status: Option<DraftStatus>,
    pub tag: Option<String>,
}

/// A named group of connected platform accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialSet {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// The user that owns an API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Engagement figures for one published post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAnalytics {
    #[serde(default)]
    pub draft_id: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Replies and comments
    Inbox,
    /// Publishing events
    Activity,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Inbox => "inbox",
            NotificationKind::Activity => "activity",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = TypecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inbox" => Ok(NotificationKind::Inbox),
            "activity" => Ok(NotificationKind::Activity),
            other => Err(TypecastError::validation_field(
                format!("Unknown notification kind '{}'. Valid options: inbox, activity", other),
                "kind",
            )),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub kind: NotificationKind,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationList {
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

/// Identifiers arrive as either JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_platform_from_str() {
        assert_eq!("x".parse::<Platform>().unwrap(), Platform::X);
        assert_eq!("Twitter".parse::<Platform>().unwrap(), Platform::X);
        assert_eq!("LINKEDIN".parse::<Platform>().unwrap(), Platform::Linkedin);
        assert_eq!(" bluesky ".parse::<Platform>().unwrap(), Platform::Bluesky);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_parse_list_dedupes_in_order() {
        let platforms = Platform::parse_list("linkedin, x,linkedin,,threads").unwrap();
        assert_eq!(
            platforms,
            vec![Platform::Linkedin, Platform::X, Platform::Threads]
        );
    }

    #[test]
    fn test_platform_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Platform::Mastodon).unwrap(), json!("mastodon"));
    }

    #[test]
    fn test_schedule_directive_wire_format() {
        assert_eq!(ScheduleDirective::Now.to_string(), "now");
        assert_eq!(ScheduleDirective::NextFreeSlot.to_string(), "next-free-slot");

        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let value = serde_json::to_value(ScheduleDirective::At(at)).unwrap();
        assert_eq!(value, json!("2030-01-02T03:04:05+00:00"));
    }

    #[test]
    fn test_schedule_directive_parse_rejects_garbage() {
        assert!("whenever".parse::<ScheduleDirective>().is_err());
        assert_eq!(
            "next-free-slot".parse::<ScheduleDirective>().unwrap(),
            ScheduleDirective::NextFreeSlot
        );
    }

    #[test]
    fn test_draft_request_payload_shape() {
        let mut platforms = BTreeMap::new();
        platforms.insert(
            Platform::X,
            PlatformContent::from_posts(&["one".to_string(), "two".to_string()]),
        );

        let request = DraftRequest {
            platforms,
            title: Some("Launch".to_string()),
            tags: vec!["product".to_string()],
            schedule: None,
            share: true,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "platforms": {
                    "x": {
                        "enabled": true,
                        "posts": [{"text": "one"}, {"text": "two"}],
                        "settings": {}
                    }
                },
                "draft_title": "Launch",
                "tags": ["product"],
                "share": true
            })
        );
    }

    #[test]
    fn test_draft_options_settings() {
        assert!(DraftOptions::default().settings_for(Platform::X).is_empty());

        let options = DraftOptions {
            threadify: false,
            auto_retweet: true,
            auto_plug: true,
        };
        assert_eq!(
            serde_json::Value::Object(options.settings_for(Platform::X)),
            json!({"threadify": false, "auto_retweet_enabled": true, "auto_plug_enabled": true})
        );
        assert_eq!(
            serde_json::Value::Object(options.settings_for(Platform::Linkedin)),
            json!({"threadify": false})
        );
    }

    #[test]
    fn test_length_warnings() {
        let mut platforms = BTreeMap::new();
        platforms.insert(Platform::X, PlatformContent::from_posts(&["a".repeat(281)]));
        platforms.insert(Platform::Linkedin, PlatformContent::from_posts(&["a".repeat(281)]));

        let request = DraftRequest {
            platforms,
            title: None,
            tags: vec![],
            schedule: None,
            share: false,
        };

        let warnings = request.length_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("x post 1"));
        assert!(warnings[0].contains("limit 280"));
    }

    #[test]
    fn test_draft_result_parses_numeric_id_and_aliases() {
        let result: DraftResult = serde_json::from_value(json!({
            "id": 42,
            "status": "scheduled",
            "private_url": "https://typefully.com/?d=42",
            "share_url": null,
            "publish_at": "2030-01-02T03:04:05Z"
        }))
        .unwrap();

        assert_eq!(result.id, "42");
        assert_eq!(result.status, DraftStatus::Scheduled);
        assert_eq!(result.edit_url.as_deref(), Some("https://typefully.com/?d=42"));
        assert!(result.scheduled_date.is_some());
        assert!(result.platforms.is_empty());
    }

    #[test]
    fn test_draft_result_rejects_unknown_status() {
        let parsed = serde_json::from_value::<DraftResult>(json!({
            "id": "d1",
            "status": "archived"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(Pagination::default().limit, 10);
        assert!(Pagination::new(50, 0).is_ok());
        assert!(Pagination::new(51, 0).is_err());
        assert!(Pagination::new(0, 0).is_err());
    }

    #[test]
    fn test_page_parses() {
        let page: Page<SocialSet> = serde_json::from_value(json!({
            "results": [{"id": 7, "username": "acme"}],
            "count": 1,
            "limit": 10,
            "offset": 0,
            "next": null,
            "previous": null
        }))
        .unwrap();

        assert_eq!(page.results[0].id, "7");
        assert_eq!(page.results[0].username.as_deref(), Some("acme"));
        assert!(page.next.is_none());
    }

    #[test]
    fn test_draft_update_is_empty() {
        assert!(DraftUpdate::default().is_empty());
        let update = DraftUpdate {
            title: Some("New".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
