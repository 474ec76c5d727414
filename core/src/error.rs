use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    /// User-correctable input problem (missing identifier, empty domain).
    /// Surfaced verbatim to the caller, never retried.
    #[error("{0}")]
    Input(String),

    /// The identifier/name matched zero customers. Terminal for this
    /// attempt; the caller may retry with different input.
    #[error("{0}")]
    NotFound(String),

    /// A name matched more than one customer. Carries the candidate list
    /// so the caller can re-resolve by id.
    #[error("Ambiguous customer name. Candidates: {}", .candidates.join("; "))]
    Ambiguous { candidates: Vec<String> },

    /// An optional collaborator (email source) is unreachable or
    /// unauthenticated. Combined computations downgrade this to a partial
    /// result with a reason annotation.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<crate::email::EmailError> for InsightError {
    fn from(err: crate::email::EmailError) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}

pub type InsightResult<T> = Result<T, InsightError>;
