//! feedfold - incremental harvester for infinitely-scrolling media feeds
//!
//! Repeated runs scroll a newest-first feed only as far as the first post
//! already stored, merge the new posts in front of the collection, and
//! regenerate a browsable gallery whose cards carry ordinal numbers that
//! can be grouped into folders.
//!
//! # Modules
//!
//! - [`model`] - Items, the collection, and run reports
//! - [`scan`] - Post-reference scanning over page HTML
//! - [`surface`] - Content surfaces the extractor scrolls
//! - [`host`] - Message-passing boundary around the extractor
//! - [`extractor`] - Incremental extraction and termination
//! - [`storage`] - `SQLite` collection store
//! - [`artifacts`] - Gallery and backup outputs
//! - [`pipeline`] - Merge-and-persist runs
//! - [`render`] - Gallery document rendering
//! - [`tags`] - Folder tags over ordinals

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod host;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod scan;
pub mod storage;
pub mod surface;
pub mod tags;

pub use artifacts::{ArtifactSink, DirSink};
pub use cli::*;
pub use error::{
    FeedError, Result, VALID_CONFIG_KEYS, find_closest_match, format_did_you_mean,
    format_error, format_unknown_value_error,
};
pub use extractor::{ExtractPolicy, Extractor};
pub use host::{LocalHost, PageHost, SurfaceSpec};
pub use model::*;
pub use pipeline::{Harvester, NullStatus, StatusSink};
pub use render::GalleryRenderer;
pub use storage::Storage;
pub use tags::{TagSession, TagStore};

use chrono::{DateTime, Datelike, Utc};

/// Crate version, as reported by `--version` and the default user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default collection store filename
pub const DEFAULT_STORE_NAME: &str = "feedfold.db";

/// Default artifact directory name
pub const DEFAULT_OUTPUT_DIR: &str = "out";

/// Default folder file name
pub const DEFAULT_TAGS_NAME: &str = "folders.json";

/// Standard width for content dividers in CLI output
pub const CONTENT_DIVIDER_WIDTH: usize = 60;

const BYTES_PER_KB: u64 = 1024;
const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Get the default data directory for feedfold
#[must_use]
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("feedfold")
}

/// Get the default collection store path
#[must_use]
pub fn default_store_path() -> std::path::PathBuf {
    default_data_dir().join(DEFAULT_STORE_NAME)
}

/// Get the default artifact directory
#[must_use]
pub fn default_output_dir() -> std::path::PathBuf {
    default_data_dir().join(DEFAULT_OUTPUT_DIR)
}

/// Get the default folder file path
#[must_use]
pub fn default_tags_path() -> std::path::PathBuf {
    default_data_dir().join(DEFAULT_TAGS_NAME)
}

/// Format an unsigned integer with thousands separators.
#[must_use]
pub fn format_number_u64(value: u64) -> String {
    let mut out = String::with_capacity(24);

    for (idx, ch) in value.to_string().chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}

/// Format a usize with thousands separators.
#[must_use]
pub fn format_number_usize(value: usize) -> String {
    format_number_u64(u64::try_from(value).unwrap_or(u64::MAX))
}

/// Format a datetime as a human-friendly relative string.
///
/// - < 1 minute: "just now"
/// - < 1 hour: "Nm ago"
/// - < 24 hours: "Nh ago"
/// - < 7 days: "Nd ago"
/// - Same calendar year: "Mon D"
/// - Different year: "Mon D, YYYY"
#[must_use]
pub fn format_relative_date(dt: DateTime<Utc>) -> String {
    format_relative_date_with_base(dt, Utc::now())
}

/// Format a datetime relative to a fixed base time.
#[must_use]
pub fn format_relative_date_with_base(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(dt);

    if duration.num_seconds() < 0 {
        return dt.format("%b %d, %Y").to_string();
    }

    let seconds = duration.num_seconds();
    let minutes = duration.num_minutes();
    let hours = duration.num_hours();
    let days = duration.num_days();

    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else if dt.year() == now.year() {
        dt.format("%b %d").to_string()
    } else {
        dt.format("%b %d, %Y").to_string()
    }
}

/// Format an optional datetime, `never` when absent.
#[must_use]
pub fn format_optional_date(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| "never".to_string(), format_relative_date)
}

/// Format bytes into a human-friendly string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < BYTES_PER_KB {
        format!("{bytes} B")
    } else if bytes < BYTES_PER_MB {
        format_bytes_with_unit(bytes, BYTES_PER_KB, "KB")
    } else if bytes < BYTES_PER_GB {
        format_bytes_with_unit(bytes, BYTES_PER_MB, "MB")
    } else {
        format_bytes_with_unit(bytes, BYTES_PER_GB, "GB")
    }
}

fn format_bytes_with_unit(bytes: u64, unit: u64, suffix: &str) -> String {
    let whole = bytes / unit;
    let tenths = (bytes % unit) * 10 / unit;
    format!("{whole}.{tenths} {suffix}")
}
