//! Typed errors for the analysis pipeline.
//!
//! Page-level errors are recovered locally by the walker (the page is
//! omitted, the walk continues); analysis-level errors terminate the whole
//! job and surface verbatim as the job's error message.

/// A failure confined to one page visit.
#[derive(thiserror::Error, Debug)]
pub enum PageError {
    /// The page did not settle within the navigation deadline.
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// Navigation failed outright (DNS, connection reset, bad target).
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The DOM probe could not run on a settled page. Never reported as an
    /// all-false feature map — callers must be able to tell "all features
    /// absent" from "detection could not run".
    #[error("feature detection failed: {0}")]
    Detection(String),

    /// Screenshot capture or persistence failed.
    #[error("screenshot capture failed: {0}")]
    Screenshot(String),

    #[error("screenshot io: {0}")]
    Io(#[from] std::io::Error),
}

impl PageError {
    /// Short stable tag used in logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            PageError::NavigationTimeout { .. } => "navigation_timeout",
            PageError::Navigation { .. } => "navigation",
            PageError::Detection(_) => "detection",
            PageError::Screenshot(_) => "screenshot",
            PageError::Io(_) => "io",
        }
    }
}

/// A failure that terminates the whole analysis job.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    /// Missing or malformed site URL; rejected before any walk starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The rendering collaborator could not be acquired.
    #[error("browser session unavailable: {0}")]
    SessionAcquisition(String),
}
