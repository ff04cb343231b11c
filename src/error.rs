//! Custom error types for feedfold.
//!
//! Every fault in the core surfaces to its caller as a labeled outcome.
//! Nothing is retried automatically; a failed run is re-triggered by the user.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for feedfold operations.
#[derive(Error, Debug)]
pub enum FeedError {
    // =========================================================================
    // Host Errors
    // =========================================================================
    /// The automation host could not identify or attach to a content surface.
    #[error("Content surface unavailable: {reason}")]
    HostUnavailable { reason: String },

    /// A fault inside the scroll/scan loop. Items recorded before the fault are dropped.
    #[error("Extraction failed in round {round}: {reason}")]
    ExtractionFault { round: usize, reason: String },

    /// The host returned a result that breaks the extraction contract.
    #[error("Malformed extraction result: {reason}")]
    MalformedResult { reason: String },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Writing the collection store or an artifact failed.
    #[error("Failed to persist {target}: {reason}")]
    PersistenceFault { target: String, reason: String },

    /// Another run holds the run lock.
    #[error(
        "Another extraction run is in progress (lock held on '{lock}').\nWait for it to finish or remove a stale lock file."
    )]
    RunInProgress { lock: PathBuf },

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    // =========================================================================
    // Data Validation Errors
    // =========================================================================
    /// An item failed construction.
    #[error("Invalid item: {reason}")]
    InvalidItem { reason: String },

    /// A merge would introduce a second item with an existing link.
    #[error("Duplicate item identity: {link}")]
    DuplicateIdentity { link: String },

    // =========================================================================
    // Tag Store Errors
    // =========================================================================
    /// Folder name is empty or reserved.
    #[error("Invalid folder name '{name}': {reason}")]
    InvalidFolderName { name: String, reason: &'static str },

    /// Folder already exists.
    #[error("Folder '{name}' already exists")]
    FolderExists { name: String },

    /// Folder does not exist.
    #[error("Folder '{name}' not found")]
    FolderNotFound { name: String },

    /// Range filter bounds are missing or reversed.
    #[error("Invalid ordinal range: {reason}")]
    InvalidRange { reason: String },

    /// A membership toggle was requested without folders or ordinals.
    #[error("Nothing selected: {what}")]
    EmptySelection { what: &'static str },

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    /// Invalid command-line argument or policy value.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for feedfold operations.
pub type Result<T> = std::result::Result<T, FeedError>;

impl FeedError {
    /// Create a host unavailable error.
    pub fn host_unavailable(reason: impl Into<String>) -> Self {
        Self::HostUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an extraction fault for the given round.
    pub fn extraction_fault(round: usize, reason: impl Into<String>) -> Self {
        Self::ExtractionFault {
            round,
            reason: reason.into(),
        }
    }

    /// Create a persistence fault.
    pub fn persistence(target: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::PersistenceFault {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid item error.
    pub fn invalid_item(reason: impl Into<String>) -> Self {
        Self::InvalidItem {
            reason: reason.into(),
        }
    }

    /// Create an invalid range error.
    pub fn invalid_range(reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Short outcome label for the status channel.
    #[must_use]
    pub const fn outcome_label(&self) -> &'static str {
        match self {
            Self::HostUnavailable { .. } => "host unavailable",
            Self::ExtractionFault { .. } | Self::MalformedResult { .. } => "extraction fault",
            Self::PersistenceFault { .. }
            | Self::DatabaseError(_)
            | Self::IoError(_)
            | Self::PathError { .. } => "persistence fault",
            Self::InvalidFolderName { .. }
            | Self::FolderExists { .. }
            | Self::FolderNotFound { .. }
            | Self::InvalidRange { .. }
            | Self::EmptySelection { .. }
            | Self::InvalidArgument { .. } => "invalid input",
            Self::RunInProgress { .. } => "busy",
            _ => "error",
        }
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::HostUnavailable { .. } => {
                Some("Check that the capture directory exists or the feed URL is reachable.")
            }
            Self::ExtractionFault { .. } => {
                Some("Nothing was merged. Re-run 'feedfold extract'; known items are skipped.")
            }
            Self::PersistenceFault { .. } => Some(
                "The collection and the rendered gallery may disagree. Run 'feedfold render' after fixing the cause.",
            ),
            Self::RunInProgress { .. } => Some("Only one extraction may run at a time."),
            Self::InvalidRange { .. } => Some("Use two ordinals with FROM <= TO, e.g. --from 2 --to 5."),
            Self::FolderNotFound { .. } => Some("Run 'feedfold folder list' to see existing folders."),
            _ => None,
        }
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

/// Calculate the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Find the closest candidate within `max_distance` edits (default 2).
#[must_use]
pub fn find_closest_match<'a>(
    input: &str,
    candidates: &[&'a str],
    max_distance: Option<usize>,
) -> Option<&'a str> {
    let max_dist = max_distance.unwrap_or(2);
    let input_lower = input.to_lowercase();

    candidates
        .iter()
        .map(|&candidate| {
            let distance = levenshtein_distance(&input_lower, &candidate.to_lowercase());
            (candidate, distance)
        })
        .filter(|(_, distance)| *distance <= max_dist && *distance > 0)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Format a "did you mean?" suggestion.
#[must_use]
pub fn format_did_you_mean(suggestion: &str) -> String {
    format!("Did you mean '{}'?", suggestion.green())
}

/// Format an error for an unknown value with "did you mean?" support.
pub fn format_unknown_value_error(kind: &str, input: &str, valid_options: &[&str]) -> String {
    let title = format!("Unknown {kind}: '{input}'");

    let mut suggestions = Vec::new();

    if let Some(closest) = find_closest_match(input, valid_options, None) {
        suggestions.push(format_did_you_mean(closest));
    }

    if !valid_options.is_empty() && valid_options.len() <= 8 {
        suggestions.push(format!("Valid {kind}s: {}", valid_options.join(", ")));
    }

    let suggestion_refs: Vec<&str> = suggestions.iter().map(String::as_str).collect();
    format_error(&title, "", &suggestion_refs)
}

/// Config keys accepted by `feedfold config --set`.
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "paths.store",
    "paths.output_dir",
    "paths.tags",
    "extractor.settle_delay_ms",
    "extractor.final_settle_ms",
    "extractor.stability_rounds",
    "extractor.max_rounds",
    "http.user_agent",
    "http.timeout_secs",
    "output.format",
    "output.colors",
    "output.quiet",
];
