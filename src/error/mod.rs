use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Timeline graph construction and query errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Cannot build graph: no session has a message at position 0")]
    MissingRootAnchor,

    #[error("Node not found: {node_id}")]
    NodeNotFound { node_id: String },

    #[error("Node {node_id} does not carry stored swipes")]
    NotASwipeParent { node_id: String },

    #[error("Session {session_id} does not pass through node {node_id}")]
    SessionNotOnNode { node_id: String, session_id: String },

    #[error("Node {node_id} belongs to no chat session")]
    NoSessions { node_id: String },

    #[error("No timeline has been built yet")]
    NotBuilt,
}

/// Chat log fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Chat source unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;
