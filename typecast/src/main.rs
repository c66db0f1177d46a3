//! typecast - Draft, thread and cross-post through the Typefully API
//!
//! Thin command-line wrapper: every subcommand maps onto one
//! `TypecastService` operation and prints its result.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use libtypecast::crosspost::{abort_pair, AbortHandle};
use libtypecast::logging::{LogFormat, LoggingConfig};
use libtypecast::schedule::parse_directive;
use libtypecast::service::{CreateDraft, DraftOutcome};
use libtypecast::types::{DraftFilter, DraftOptions, DraftStatus, NotificationKind, Pagination};
use libtypecast::{
    ContentMap, CrossPostOptions, CrossPostReport, Platform, ScheduleDirective, Settings,
    TypecastError, TypecastService,
};

#[derive(Parser, Debug)]
#[command(name = "typecast")]
#[command(version)]
#[command(about = "Create drafts, threads and cross-posts through the Typefully API")]
#[command(long_about = "\
typecast - Create drafts, threads and cross-posts through the Typefully API

DESCRIPTION:
    typecast turns plain text into drafts on X, LinkedIn, Threads, Bluesky and
    Mastodon. Separate posts of a thread with four newlines (three blank lines).

    Scheduling is disabled by default: every draft is created unscheduled until
    `scheduling_enabled = true` is set in the configuration file.

USAGE EXAMPLES:
    # Create a two-post thread on X and LinkedIn
    typecast create-draft --account personal --platforms x,linkedin \\
        --content $'First post\\n\\n\\n\\nSecond post'

    # Read the draft text from stdin
    cat thread.txt | typecast create-draft --account personal --content -

    # Cross-post different content to several accounts
    typecast cross-post --accounts personal company --content-json posts.json

    # Ask for the next free slot (only honoured with scheduling enabled)
    typecast create-draft --account personal --content \"Hello\" --schedule

CONFIGURATION:
    Configuration file: ~/.config/typecast/config.toml
    Credentials file:   ~/.config/typecast/.env
        TYPEFULLY_API_KEY_PERSONAL=...
        TYPEFULLY_API_KEY_COMPANY=...

    Override with environment variables:
        TYPECAST_CONFIG      - Path to config file
        TYPECAST_LOG_FORMAT  - text, json or pretty
        TYPECAST_LOG_LEVEL   - error, warn, info, debug or trace

EXIT CODES:
    0 - Success
    1 - Remote or transient failure (or any failed account in cross-post)
    2 - Authentication or permission error
    3 - Invalid input or unknown account
    4 - Configuration error
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the credentials (.env) file
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Log output format: text, json or pretty
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[arg(short, long, global = true)]
    #[arg(help = "Enable verbose logging to stderr (useful for debugging)")]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
struct ScheduleArgs {
    /// Schedule for the next free slot (ignored while scheduling is disabled)
    #[arg(long)]
    schedule: bool,

    /// Explicit schedule: "now", "next-free-slot", ISO-8601, "2h", "tomorrow 3pm"
    #[arg(long, value_name = "DATE")]
    schedule_date: Option<String>,
}

impl ScheduleArgs {
    /// Requested directive; with scheduling disabled a date that does not
    /// parse is still passed on so the gate records the downgrade
    fn directive(
        &self,
        scheduling_enabled: bool,
    ) -> libtypecast::Result<Option<ScheduleDirective>> {
        match &self.schedule_date {
            Some(date) if scheduling_enabled => parse_directive(date).map(Some),
            Some(date) => Ok(Some(parse_directive(date).unwrap_or_else(|e| {
                tracing::debug!("Ignoring schedule date '{}': {}", date, e);
                ScheduleDirective::NextFreeSlot
            }))),
            None if self.schedule => Ok(Some(ScheduleDirective::NextFreeSlot)),
            None => Ok(None),
        }
    }
}

#[derive(clap::Args, Debug)]
struct DraftOptionArgs {
    /// Enable AutoRT on X for this draft
    #[arg(long)]
    auto_retweet: bool,

    /// Enable AutoPlug on X for this draft
    #[arg(long)]
    auto_plug: bool,

    /// Don't let the service split over-long posts
    #[arg(long)]
    no_threadify: bool,
}

impl DraftOptionArgs {
    /// Flags switch options on (or threadify off) over the configured defaults
    fn resolve(&self, defaults: DraftOptions) -> DraftOptions {
        DraftOptions {
            threadify: defaults.threadify && !self.no_threadify,
            auto_retweet: defaults.auto_retweet || self.auto_retweet,
            auto_plug: defaults.auto_plug || self.auto_plug,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a draft (or thread) on one account
    CreateDraft {
        #[arg(short, long)]
        account: String,

        /// Draft text, or "-" to read from stdin
        #[arg(short, long)]
        content: String,

        /// Comma-separated platforms (default from config)
        #[arg(short, long)]
        platforms: Option<String>,

        #[command(flatten)]
        schedule: ScheduleArgs,

        #[arg(long)]
        title: Option<String>,

        /// Tag slug; repeat for several tags
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Don't create a public share link
        #[arg(long)]
        no_share: bool,

        #[command(flatten)]
        draft_options: DraftOptionArgs,
    },

    /// Create drafts on several accounts with per-account content
    CrossPost {
        #[arg(long, num_args = 1.., required = true)]
        accounts: Vec<String>,

        /// JSON file mapping account to content, or "-" for stdin
        #[arg(long, value_name = "FILE")]
        content_json: PathBuf,

        /// Comma-separated platforms (default from config)
        #[arg(short, long)]
        platforms: Option<String>,

        #[command(flatten)]
        schedule: ScheduleArgs,

        #[arg(long)]
        title: Option<String>,

        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long)]
        no_share: bool,

        #[command(flatten)]
        draft_options: DraftOptionArgs,
    },

    /// Show one draft
    GetDraft {
        #[arg(short, long)]
        account: String,

        #[arg(long)]
        id: String,
    },

    /// List drafts
    GetDrafts {
        #[arg(short, long)]
        account: String,

        /// draft, scheduled, publishing, published or error
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        #[arg(long, default_value_t = Pagination::DEFAULT_LIMIT)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Engagement for recently published posts
    GetAnalytics {
        #[arg(short, long)]
        account: String,

        #[arg(long, default_value_t = Pagination::DEFAULT_LIMIT)]
        limit: u32,
    },

    /// List social sets connected to an account
    ListSocialSets {
        #[arg(short, long)]
        account: String,
    },

    /// List configured accounts (never prints keys)
    ListAccounts,

    /// Show the user that owns an account's key
    GetMe {
        #[arg(short, long)]
        account: String,
    },

    /// Show notifications
    GetNotifications {
        #[arg(short, long)]
        account: String,

        /// inbox or activity
        #[arg(long, default_value = "activity")]
        kind: String,
    },

    /// Mark notifications as read
    MarkNotificationsRead {
        #[arg(short, long)]
        account: String,

        /// inbox or activity (default: all)
        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env(cli.verbose);
    if let Some(format) = cli.log_format {
        logging.format = format;
    }
    logging.init();

    let format = cli.format;
    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let code = match e.downcast_ref::<TypecastError>() {
                Some(error) => {
                    if format == OutputFormat::Json {
                        let record = serde_json::json!({ "error": error.to_record() });
                        println!("{}", record);
                    }
                    error.exit_code()
                }
                None => 1,
            };
            eprintln!("Error: {}", e);
            std::process::exit(code);
        }
    }
}

fn load_settings(config: Option<&Path>) -> libtypecast::Result<Settings> {
    match config {
        Some(path) => Settings::load_from_path(path),
        None => Settings::load(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let settings = load_settings(cli.config.as_deref())?;
    let service = TypecastService::from_settings(settings, cli.env_file.as_deref())?;
    let format = cli.format;

    match cli.command {
        Commands::CreateDraft {
            account,
            content,
            platforms,
            schedule,
            title,
            tags,
            no_share,
            draft_options,
        } => {
            let draft = CreateDraft {
                content: read_content(&content)?,
                platforms: parse_platforms(platforms.as_deref())?,
                schedule: schedule.directive(service.gate().is_enabled())?,
                title,
                tags,
                share: no_share.then_some(false),
                options: Some(draft_options.resolve(service.settings().draft_options())),
                ..Default::default()
            };

            let outcome = service.create_draft(&account, draft).await?;
            if outcome.downgraded() {
                warn_downgrade();
            }
            emit(format, &outcome, || draft_outcome_text(&outcome))?;
        }

        Commands::CrossPost {
            accounts,
            content_json,
            platforms,
            schedule,
            title,
            tags,
            no_share,
            draft_options,
        } => {
            let content = ContentMap::from_json_str(&read_content_file(&content_json)?)?;
            let options = CrossPostOptions {
                platforms: parse_platforms(platforms.as_deref())?,
                schedule: schedule.directive(service.gate().is_enabled())?,
                title,
                tags,
                share: !no_share && service.settings().default_share,
                draft_options: draft_options.resolve(service.settings().draft_options()),
            };

            let (handle, signal) = abort_pair();
            abort_on_signal(handle)?;

            let report = service
                .cross_post(&accounts, &content, options, Some(signal))
                .await;
            if report.gate().downgraded {
                warn_downgrade();
            }
            emit(format, &report, || cross_post_text(&report))?;

            return Ok(if report.all_succeeded() { 0 } else { 1 });
        }

        Commands::GetDraft { account, id } => {
            let draft = service.get_draft(&account, &id).await?;
            emit(format, &draft, || {
                format!(
                    "{} [{}] {}",
                    draft.id,
                    draft.status,
                    draft.edit_url.as_deref().unwrap_or("-")
                )
            })?;
        }

        Commands::GetDrafts {
            account,
            status,
            tag,
            limit,
            offset,
        } => {
            let filter = DraftFilter {
                status: status
                    .as_deref()
                    .map(str::parse::<DraftStatus>)
                    .transpose()?,
                tag,
            };
            let page = service
                .list_drafts(&account, &filter, Pagination::new(limit, offset)?)
                .await?;
            emit(format, &page, || {
                page.results
                    .iter()
                    .map(|d| {
                        format!(
                            "{} [{}] {}",
                            d.id,
                            d.status,
                            d.title.as_deref().unwrap_or("(untitled)")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }

        Commands::GetAnalytics { account, limit } => {
            let page = service.get_analytics(&account, limit).await?;
            emit(format, &page, || {
                page.results
                    .iter()
                    .map(|a| {
                        let metrics: Vec<String> = a
                            .metrics
                            .iter()
                            .map(|(name, value)| format!("{}={}", name, value))
                            .collect();
                        format!(
                            "{} {} {}",
                            a.platform.as_deref().unwrap_or("-"),
                            a.url.as_deref().unwrap_or("-"),
                            metrics.join(" ")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }

        Commands::ListSocialSets { account } => {
            let page = service.list_social_sets(&account).await?;
            emit(format, &page, || {
                page.results
                    .iter()
                    .map(|s| format!("{} {}", s.id, s.username.as_deref().unwrap_or("-")))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }

        Commands::ListAccounts => {
            let accounts = service.list_accounts();
            emit(format, &accounts, || accounts.join("\n"))?;
        }

        Commands::GetMe { account } => {
            let me = service.get_me(&account).await?;
            emit(format, &me, || {
                format!("{} {}", me.id, me.name.as_deref().unwrap_or("-"))
            })?;
        }

        Commands::GetNotifications { account, kind } => {
            let kind: NotificationKind = kind.parse()?;
            let list = service.get_notifications(&account, kind).await?;
            emit(format, &list, || {
                list.notifications
                    .iter()
                    .map(|n| format!("{} [{}] {}", n.id, n.kind, n.payload))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }

        Commands::MarkNotificationsRead {
            account,
            kind,
            username,
        } => {
            let kind = kind
                .as_deref()
                .map(str::parse::<NotificationKind>)
                .transpose()?;
            let response = service
                .mark_notifications_read(&account, kind, username.as_deref())
                .await?;
            emit(format, &response, || "Notifications marked as read".to_string())?;
        }
    }

    Ok(0)
}

fn parse_platforms(input: Option<&str>) -> libtypecast::Result<Vec<Platform>> {
    match input {
        Some(list) => Platform::parse_list(list),
        None => Ok(vec![]),
    }
}

/// Draft text from the argument, or stdin when it is "-"
fn read_content(content: &str) -> anyhow::Result<String> {
    if content != "-" {
        return Ok(content.to_string());
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read draft content from stdin")?;
    Ok(buffer)
}

fn read_content_file(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        return read_content("-");
    }

    std::fs::read_to_string(path).map_err(|e| {
        anyhow::Error::from(TypecastError::validation_field(
            format!("Failed to read content file {}: {}", path.display(), e),
            "content_json",
        ))
    })
}

fn warn_downgrade() {
    eprintln!(
        "Warning: scheduling is disabled, so the draft was created without a schedule. \
         Set `scheduling_enabled = true` in your config to allow scheduling."
    );
}

fn emit<T, F>(format: OutputFormat, value: &T, text: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => {
            let text = text();
            if !text.is_empty() {
                println!("{}", text);
            }
        }
    }
    Ok(())
}

fn draft_outcome_text(outcome: &DraftOutcome) -> String {
    let draft = &outcome.result;
    let mut lines = vec![format!("Created draft {} ({})", draft.id, draft.status)];
    if let Some(url) = &draft.edit_url {
        lines.push(format!("Edit:  {}", url));
    }
    if let Some(url) = &draft.share_url {
        lines.push(format!("Share: {}", url));
    }
    if let Some(date) = &draft.scheduled_date {
        lines.push(format!("Scheduled for {}", date.to_rfc3339()));
    }
    for warning in &outcome.warnings {
        lines.push(format!("Note: {}", warning));
    }
    lines.join("\n")
}

fn cross_post_text(report: &CrossPostReport) -> String {
    let mut lines: Vec<String> = report
        .entries()
        .iter()
        .map(|entry| match &entry.outcome {
            Ok(draft) => format!(
                "{}: created draft {} ({}) {}",
                entry.account,
                draft.id,
                draft.status,
                draft.edit_url.as_deref().unwrap_or("")
            ),
            Err(e) => format!("{}: FAILED {}", entry.account, e),
        })
        .collect();
    lines.push(format!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    ));
    lines.join("\n")
}

/// Cancel pending cross-post accounts on SIGINT/SIGTERM
#[cfg(unix)]
fn abort_on_signal(handle: AbortHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Signal setup failed")?;

    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            tracing::warn!(
                "Received signal {}, cancelling accounts that have not finished",
                signal
            );
            handle.abort();
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn abort_on_signal(_handle: AbortHandle) -> anyhow::Result<()> {
    Ok(())
}
