//! Error types for MusicLib core operations.
//!
//! Errors are grouped by domain: the curation workflow ([`CuratorError`]),
//! the external catalog API ([`CatalogError`]) and playlist management
//! ([`PlaylistError`]). All of them fold into the crate-level [`Error`].

use thiserror::Error;

use crate::model::SongId;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in MusicLib core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Curation workflow error.
    #[error(transparent)]
    Curator(#[from] CuratorError),

    /// Catalog API error.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Playlist management error.
    #[error(transparent)]
    Playlist(#[from] PlaylistError),

    /// No user is signed in.
    #[error("No user is signed in")]
    NotSignedIn,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the catalog-diff curator.
#[derive(Debug, Error)]
pub enum CuratorError {
    /// Reading the catalog or the playlist failed while opening a session.
    #[error("Failed to load curation data: {0}")]
    Load(#[source] CatalogError),

    /// Commit was called with nothing selected.
    #[error("No songs selected")]
    NoSelection,

    /// A commit for this session is already in flight.
    #[error("A submission is already in progress")]
    AlreadySubmitting,

    /// A commit is in flight, so a new session cannot be opened.
    #[error("Curator is busy with an in-flight submission")]
    SessionBusy,

    /// The batch-add request was rejected or failed in transport.
    #[error("Failed to add songs to playlist: {0}")]
    Submit(String),

    /// The song is not part of the candidate pool.
    #[error("Song is not a valid candidate: {0}")]
    InvalidCandidate(SongId),

    /// No curation session is open.
    #[error("No curation session is open")]
    NoSession,

    /// The session has already been committed; open a new one to continue.
    #[error("Curation session has already been committed")]
    SessionCommitted,
}

/// Errors returned by the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("Request failed: {0}")]
    Request(String),

    /// Server is offline or unreachable.
    #[error("Catalog server unreachable: {0}")]
    Unreachable(String),

    /// Server returned an error response.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with existing state (e.g. a duplicate playlist name).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Failed to parse the server response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Invalid API base URL.
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::Unreachable(e.to_string())
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Errors raised by playlist management operations.
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// The playlist name is not acceptable.
    #[error("Invalid playlist name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Another playlist already uses this name.
    #[error("A playlist named '{name}' already exists")]
    NameConflict {
        /// The conflicting name.
        name: String,
    },

    /// The playlist does not exist.
    #[error("Playlist not found: {name}")]
    NotFound {
        /// Name of the missing playlist.
        name: String,
    },
}

/// Broad error category for programmatic handling by UI callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse of the curation workflow (empty selection, bad candidate...).
    InvalidRequest,
    /// A concurrency guard rejected the call.
    Busy,
    /// Data could not be loaded.
    Load,
    /// A mutation failed.
    Submit,
    /// Network or server failure.
    Network,
    /// Name or state conflict on the server.
    Conflict,
    /// Resource not found.
    NotFound,
    /// No signed-in user.
    Unauthenticated,
    /// Configuration or local IO problem.
    Local,
}

impl Error {
    /// Get the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Curator(e) => match e {
                CuratorError::Load(_) => ErrorKind::Load,
                CuratorError::Submit(_) => ErrorKind::Submit,
                CuratorError::AlreadySubmitting | CuratorError::SessionBusy => ErrorKind::Busy,
                CuratorError::NoSelection
                | CuratorError::InvalidCandidate(_)
                | CuratorError::NoSession
                | CuratorError::SessionCommitted => ErrorKind::InvalidRequest,
            },
            Self::Catalog(e) => match e {
                CatalogError::NotFound(_) => ErrorKind::NotFound,
                CatalogError::Conflict(_) => ErrorKind::Conflict,
                CatalogError::InvalidUrl(_) => ErrorKind::Local,
                _ => ErrorKind::Network,
            },
            Self::Playlist(e) => match e {
                PlaylistError::InvalidName { .. } => ErrorKind::InvalidRequest,
                PlaylistError::NameConflict { .. } => ErrorKind::Conflict,
                PlaylistError::NotFound { .. } => ErrorKind::NotFound,
            },
            Self::NotSignedIn => ErrorKind::Unauthenticated,
            Self::Configuration(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Local,
        }
    }

    /// Check whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Curator(CuratorError::Load(_) | CuratorError::Submit(_)) => true,
            Self::Catalog(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl CatalogError {
    /// Transport failures and 5xx responses are transient.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) | Self::Unreachable(_) => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
