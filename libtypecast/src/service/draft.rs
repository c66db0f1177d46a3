//! Inputs and outputs of draft creation through the service facade

use std::collections::BTreeMap;

use serde::Serialize;

use crate::builder::DraftSpec;
use crate::config::Settings;
use crate::content::split_posts;
use crate::gate::GateDecision;
use crate::types::{DraftOptions, DraftResult, Platform, ScheduleDirective};

/// A draft as a caller describes it, before splitting and defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateDraft {
    /// Raw text; threads are separated by four newlines
    pub content: String,
    /// Empty means the configured default platforms
    pub platforms: Vec<Platform>,
    /// Raw per-platform text replacing `content` on that platform
    pub overrides: BTreeMap<Platform, String>,
    pub schedule: Option<ScheduleDirective>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    /// `None` means the configured default
    pub share: Option<bool>,
    /// `None` means the configured defaults
    pub options: Option<DraftOptions>,
}

impl CreateDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn platforms(mut self, platforms: Vec<Platform>) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn schedule(mut self, schedule: Option<ScheduleDirective>) -> Self {
        self.schedule = schedule;
        self
    }

    /// Apply settings defaults and split every text into posts
    pub(crate) fn into_spec(self, settings: &Settings) -> DraftSpec {
        let platforms = if self.platforms.is_empty() {
            settings.default_platforms.clone()
        } else {
            self.platforms
        };

        DraftSpec {
            posts: split_posts(&self.content),
            platforms,
            overrides: self
                .overrides
                .iter()
                .map(|(platform, text)| (*platform, split_posts(text)))
                .collect(),
            schedule: self.schedule,
            title: self.title,
            tags: self.tags,
            share: self.share.unwrap_or(settings.default_share),
            options: self.options.unwrap_or_else(|| settings.draft_options()),
        }
    }
}

/// Result of creating or updating a draft
#[derive(Debug, Clone, Serialize)]
pub struct DraftOutcome {
    pub result: DraftResult,
    /// What the safety gate did with the requested schedule
    pub gate: GateDecision,
    /// Non-blocking content hints such as over-length posts
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl DraftOutcome {
    pub fn downgraded(&self) -> bool {
        self.gate.downgraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_come_from_settings() {
        let settings = Settings {
            default_platforms: vec![Platform::Bluesky, Platform::Mastodon],
            default_share: false,
            ..Default::default()
        };

        let spec = CreateDraft::new("one\n\n\n\ntwo").into_spec(&settings);
        assert_eq!(spec.platforms, vec![Platform::Bluesky, Platform::Mastodon]);
        assert_eq!(spec.posts, vec!["one", "two"]);
        assert!(!spec.share);
        assert_eq!(spec.options, DraftOptions::default());
    }

    #[test]
    fn test_configured_draft_options_apply() {
        let settings = Settings {
            auto_plug: true,
            ..Default::default()
        };
        let spec = CreateDraft::new("text").into_spec(&settings);
        assert!(spec.options.auto_plug);

        let mut draft = CreateDraft::new("text");
        draft.options = Some(DraftOptions::default());
        assert!(!draft.into_spec(&settings).options.auto_plug);
    }

    #[test]
    fn test_explicit_values_win_over_defaults() {
        let mut draft = CreateDraft::new("text").platforms(vec![Platform::Threads]);
        draft.share = Some(true);
        draft
            .overrides
            .insert(Platform::Threads, "a\n\n\n\nb".to_string());

        let spec = draft.into_spec(&Settings::default());
        assert_eq!(spec.platforms, vec![Platform::Threads]);
        assert_eq!(spec.overrides[&Platform::Threads], vec!["a", "b"]);
        assert!(spec.share);
    }
}
