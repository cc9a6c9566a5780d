//! Error types for Fraudet

/// Result type alias using Fraudet's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Fraudet operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Empty or malformed request input; request-scoped
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The bundle prefix lists zero objects in the remote store
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Listing or downloading a bundle object failed
    #[error("artifact transfer failed: {0}")]
    ArtifactTransfer(String),

    /// A fetched bundle could not be deserialized into a usable model
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// Non-empty text produced zero usable tokens; request-scoped
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Local filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The one-time model load exceeded its deadline
    #[error("model load timed out")]
    LoadTimeout,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new artifact-not-found error
    pub fn artifact_not_found(msg: impl Into<String>) -> Self {
        Self::ArtifactNotFound(msg.into())
    }

    /// Create a new artifact-transfer error
    pub fn artifact_transfer(msg: impl Into<String>) -> Self {
        Self::ArtifactTransfer(msg.into())
    }

    /// Create a new model-load error
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create a new preprocessing error
    pub fn preprocessing(msg: impl Into<String>) -> Self {
        Self::Preprocessing(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable tag for this error, used in API error
    /// bodies and metrics labels. Never includes paths or messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::ArtifactNotFound(_) => "artifact_not_found",
            Self::ArtifactTransfer(_) => "artifact_transfer",
            Self::ModelLoad(_) => "model_load",
            Self::Preprocessing(_) => "preprocessing",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::LoadTimeout => "load_timeout",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether this error is scoped to a single request. Request-scoped
    /// errors never affect other in-flight or future requests; everything
    /// else is load-scoped and persists until the cache leaves `Failed`.
    pub fn is_request_scoped(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Preprocessing(_))
    }
}
