//! Draft request assembly
//!
//! Turns split post sequences, a platform selection and draft metadata into a
//! `DraftRequest`. Every selected platform receives the same post sequence
//! unless an override for that platform is supplied.

use std::collections::BTreeMap;

use crate::error::{Result, TypecastError};
use crate::types::{DraftOptions, DraftRequest, Platform, PlatformContent, ScheduleDirective};

/// Everything needed to build one draft request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftSpec {
    /// Posts shared by every platform without an override
    pub posts: Vec<String>,
    pub platforms: Vec<Platform>,
    /// Platform-specific post sequences
    pub overrides: BTreeMap<Platform, Vec<String>>,
    pub schedule: Option<ScheduleDirective>,
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub share: bool,
    pub options: DraftOptions,
}

impl DraftSpec {
    pub fn new(posts: Vec<String>, platforms: Vec<Platform>) -> Self {
        Self {
            posts,
            platforms,
            ..Default::default()
        }
    }

    pub fn with_override(mut self, platform: Platform, posts: Vec<String>) -> Self {
        self.overrides.insert(platform, posts);
        self
    }

    pub fn with_schedule(mut self, schedule: Option<ScheduleDirective>) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_share(mut self, share: bool) -> Self {
        self.share = share;
        self
    }

    pub fn with_options(mut self, options: DraftOptions) -> Self {
        self.options = options;
        self
    }
}

/// Build a draft request where every platform gets the same posts
///
/// # Errors
///
/// Returns `TypecastError::Validation` if `platforms` or `posts` is empty, or
/// if any post is blank.
pub fn build(
    posts: Vec<String>,
    platforms: &[Platform],
    schedule: Option<ScheduleDirective>,
    title: Option<String>,
    tags: Vec<String>,
    share: bool,
) -> Result<DraftRequest> {
    build_spec(DraftSpec {
        posts,
        platforms: platforms.to_vec(),
        overrides: BTreeMap::new(),
        schedule,
        title,
        tags,
        share,
        options: DraftOptions::default(),
    })
}

/// Build a draft request, honouring per-platform overrides
///
/// Shared posts may be empty only when every selected platform has an
/// override. Overrides must name selected platforms.
pub fn build_spec(spec: DraftSpec) -> Result<DraftRequest> {
    let mut platforms: Vec<Platform> = Vec::with_capacity(spec.platforms.len());
    for platform in spec.platforms {
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }

    if platforms.is_empty() {
        return Err(TypecastError::validation_field(
            "At least one platform must be selected",
            "platforms",
        ));
    }

    for platform in spec.overrides.keys() {
        if !platforms.contains(platform) {
            return Err(TypecastError::validation_field(
                format!(
                    "Content supplied for {} but {} is not a selected platform",
                    platform, platform
                ),
                format!("platforms.{}", platform),
            ));
        }
    }

    check_posts(&spec.posts, "posts")?;

    let mut content = BTreeMap::new();
    for platform in platforms {
        let posts = match spec.overrides.get(&platform) {
            Some(posts) => {
                let field = format!("platforms.{}.posts", platform);
                check_posts(posts, &field)?;
                if posts.is_empty() {
                    return Err(TypecastError::validation_field(
                        format!("No posts supplied for {}", platform),
                        field,
                    ));
                }
                posts
            }
            None => {
                if spec.posts.is_empty() {
                    return Err(TypecastError::validation_field(
                        "Content cannot be empty",
                        "posts",
                    ));
                }
                &spec.posts
            }
        };

        let mut platform_content = PlatformContent::from_posts(posts);
        platform_content.settings = spec.options.settings_for(platform);
        content.insert(platform, platform_content);
    }

    Ok(DraftRequest {
        platforms: content,
        title: spec
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        tags: normalize_tags(spec.tags),
        schedule: spec.schedule,
        share: spec.share,
    })
}

fn check_posts(posts: &[String], field: &str) -> Result<()> {
    if let Some(index) = posts.iter().position(|p| p.trim().is_empty()) {
        return Err(TypecastError::validation_field(
            format!("Post {} is empty", index + 1),
            field,
        ));
    }
    Ok(())
}

/// Trim, drop blanks and duplicates; tag slugs are otherwise passed through
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::split_posts;

    fn posts(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_every_platform_gets_identical_posts() {
        let request = build(
            posts(&["one", "two"]),
            &[Platform::X, Platform::Linkedin],
            None,
            None,
            vec![],
            false,
        )
        .unwrap();

        assert_eq!(request.enabled_platforms(), vec![Platform::X, Platform::Linkedin]);
        assert_eq!(request.platforms[&Platform::X].texts(), vec!["one", "two"]);
        assert_eq!(
            request.platforms[&Platform::X],
            request.platforms[&Platform::Linkedin]
        );
    }

    #[test]
    fn test_empty_platforms_is_validation_error() {
        let err = build(posts(&["one"]), &[], None, None, vec![], false).unwrap_err();
        match err {
            TypecastError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("platforms")),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_posts_is_validation_error() {
        let err = build(vec![], &[Platform::X], None, None, vec![], false).unwrap_err();
        assert!(matches!(err, TypecastError::Validation { .. }));
    }

    #[test]
    fn test_blank_post_is_validation_error() {
        let err = build(posts(&["one", "  "]), &[Platform::X], None, None, vec![], false)
            .unwrap_err();
        assert!(err.to_string().contains("Post 2 is empty"));
    }

    #[test]
    fn test_duplicate_platforms_collapse() {
        let request = build(
            posts(&["one"]),
            &[Platform::X, Platform::X],
            None,
            None,
            vec![],
            false,
        )
        .unwrap();
        assert_eq!(request.platforms.len(), 1);
    }

    #[test]
    fn test_override_replaces_shared_posts_for_one_platform() {
        let spec = DraftSpec::new(posts(&["shared"]), vec![Platform::X, Platform::Linkedin])
            .with_override(Platform::Linkedin, posts(&["long form", "part two"]));

        let request = build_spec(spec).unwrap();
        assert_eq!(request.platforms[&Platform::X].texts(), vec!["shared"]);
        assert_eq!(
            request.platforms[&Platform::Linkedin].texts(),
            vec!["long form", "part two"]
        );
    }

    #[test]
    fn test_overrides_alone_are_enough_when_they_cover_every_platform() {
        let spec = DraftSpec::new(vec![], vec![Platform::X])
            .with_override(Platform::X, posts(&["only x"]));
        assert!(build_spec(spec).is_ok());
    }

    #[test]
    fn test_platform_without_override_needs_shared_posts() {
        let spec = DraftSpec::new(vec![], vec![Platform::X, Platform::Threads])
            .with_override(Platform::X, posts(&["only x"]));
        assert!(build_spec(spec).is_err());
    }

    #[test]
    fn test_override_for_unselected_platform_is_rejected() {
        let spec = DraftSpec::new(posts(&["shared"]), vec![Platform::X])
            .with_override(Platform::Mastodon, posts(&["toot"]));

        let err = build_spec(spec).unwrap_err();
        match err {
            TypecastError::Validation { field, .. } => {
                assert_eq!(field.as_deref(), Some("platforms.mastodon"))
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_metadata_passthrough() {
        let spec = DraftSpec::new(posts(&["one"]), vec![Platform::X])
            .with_schedule(Some(ScheduleDirective::NextFreeSlot))
            .with_title("  Launch day  ")
            .with_tags(vec![
                "launch".to_string(),
                " launch ".to_string(),
                "".to_string(),
                "unknown-slug".to_string(),
            ])
            .with_share(true);

        let request = build_spec(spec).unwrap();
        assert_eq!(request.title.as_deref(), Some("Launch day"));
        assert_eq!(request.tags, vec!["launch", "unknown-slug"]);
        assert_eq!(request.schedule, Some(ScheduleDirective::NextFreeSlot));
        assert!(request.share);
    }

    #[test]
    fn test_blank_title_is_dropped() {
        let spec = DraftSpec::new(posts(&["one"]), vec![Platform::X]).with_title("   ");
        assert_eq!(build_spec(spec).unwrap().title, None);
    }

    #[test]
    fn test_split_then_build_preserves_thread() {
        let text = "Tweet one\n\n\n\nTweet two\n\n\n\nTweet three";
        let request = build(split_posts(text), &[Platform::X], None, None, vec![], false).unwrap();
        assert_eq!(
            request.platforms[&Platform::X].texts(),
            vec!["Tweet one", "Tweet two", "Tweet three"]
        );
    }

    #[test]
    fn test_auto_options_land_in_x_settings_only() {
        let options = DraftOptions {
            auto_retweet: true,
            auto_plug: true,
            ..Default::default()
        };
        let spec = DraftSpec::new(posts(&["one"]), vec![Platform::X, Platform::Bluesky])
            .with_options(options);
        let request = build_spec(spec).unwrap();

        let x = &request.platforms[&Platform::X].settings;
        assert_eq!(x.get("auto_retweet_enabled"), Some(&serde_json::Value::Bool(true)));
        assert_eq!(x.get("auto_plug_enabled"), Some(&serde_json::Value::Bool(true)));
        assert!(request.platforms[&Platform::Bluesky].settings.is_empty());
    }
}
