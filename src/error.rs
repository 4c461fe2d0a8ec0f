use std::path::PathBuf;

use thiserror::Error;

/// Result type for aggregation, persistence and configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level failures. Per-event and per-source problems never end up here:
/// they are counted in `ParseStats` or listed in the `AggregateReport`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    #[error("cannot start fetch workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Nothing to aggregate after source resolution.
    #[error("no schedule sources given")]
    NoSources,

    /// Every attempted source failed.
    #[error(
        "none of the {} attempted sources returned data: {}",
        .attempted.len(),
        .attempted.join(", ")
    )]
    NoSourcesResolved { attempted: Vec<String> },

    /// Nothing resolved and the portal rejected at least one request for lack of a session.
    #[error("the portal requires authentication (set a session cookie) for: {}", .sources.join(", "))]
    AuthenticationRequired { sources: Vec<String> },

    #[error("cannot write {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read index {}: {reason}", .path.display())]
    IndexUnreadable { path: PathBuf, reason: String },
}
