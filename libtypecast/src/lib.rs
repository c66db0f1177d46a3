//! Typecast - a command-line client for the Typefully publishing API
//!
//! This library resolves accounts to API keys, turns delimited text into
//! multi-platform threads, keeps scheduling behind an explicit safety switch,
//! and cross-posts to many accounts with per-account outcomes.

pub mod builder;
pub mod client;
pub mod config;
pub mod content;
pub mod credentials;
pub mod crosspost;
pub mod error;
pub mod gate;
pub mod logging;
pub mod schedule;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Settings;
pub use credentials::{AccountName, ApiKey, CredentialStore};
pub use crosspost::{ContentMap, CrossPostOptions, CrossPostReport};
pub use error::{Result, TypecastError};
pub use gate::{GateDecision, SafetyGate};
pub use service::TypecastService;
pub use types::{DraftRequest, DraftResult, DraftStatus, Platform, ScheduleDirective};
