use std::fmt;

// === SurfaceError ===

/// Precondition violations raised by the rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceError {
    /// The document body is not available yet.
    MissingBody,
    /// A required element of the overlay was not found.
    MissingAnchor(String),
    /// The clipboard rejected the write.
    Clipboard(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::MissingBody => write!(f, "Document body is not available"),
            SurfaceError::MissingAnchor(id) => {
                write!(f, "Required element '#{}' was not found", id)
            }
            SurfaceError::Clipboard(msg) => write!(f, "Clipboard write failed: {}", msg),
        }
    }
}

impl std::error::Error for SurfaceError {}

// === SettingsError ===

/// Errors related to the persisted settings store.
#[derive(Debug)]
pub enum SettingsError {
    /// The storage backend failed.
    StorageError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is not known.
    InvalidKey(String),
    /// The provided settings value is invalid for its key.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::StorageError(msg) => write!(f, "Settings storage error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<rusqlite::Error> for SettingsError {
    fn from(e: rusqlite::Error) -> Self {
        SettingsError::StorageError(e.to_string())
    }
}

// === MessagingError ===

/// Errors on the cross-context message channel.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagingError {
    /// No response arrived within the allowed time.
    Timeout,
    /// The receiving context was reloaded or torn down.
    ContextInvalidated,
    /// The background answered but is not ready to serve the preview.
    NotReady,
    /// The channel to the peer closed while a message was in flight.
    ChannelClosed,
    /// The message could not be encoded, decoded, or routed.
    Protocol(String),
}

impl fmt::Display for MessagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessagingError::Timeout => write!(f, "Message response timed out"),
            MessagingError::ContextInvalidated => write!(f, "Extension context invalidated"),
            MessagingError::NotReady => write!(f, "Background script not ready"),
            MessagingError::ChannelClosed => write!(f, "Message channel closed"),
            MessagingError::Protocol(msg) => write!(f, "Message protocol error: {}", msg),
        }
    }
}

impl std::error::Error for MessagingError {}

// === PreviewError ===

/// Top-level errors surfaced by the preview session controller.
#[derive(Debug)]
pub enum PreviewError {
    /// A required DOM anchor is missing. Fatal to the current operation.
    Precondition(SurfaceError),
    /// The target uses plain HTTP and must go through the warning dialog.
    InsecureUrl(String),
    /// The target could not be parsed as a URL.
    InvalidUrl(String),
    /// The prepare handshake with the background failed.
    Handshake(MessagingError),
    /// Persisting settings failed.
    Settings(SettingsError),
}

impl PreviewError {
    /// Whether the error is routed to a user-facing dialog instead of being rethrown.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PreviewError::InsecureUrl(_) | PreviewError::Handshake(_))
    }
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewError::Precondition(e) => write!(f, "Precondition violated: {}", e),
            PreviewError::InsecureUrl(url) => write!(f, "Insecure link: {}", url),
            PreviewError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            PreviewError::Handshake(e) => write!(f, "Prepare handshake failed: {}", e),
            PreviewError::Settings(e) => write!(f, "Settings error: {}", e),
        }
    }
}

impl std::error::Error for PreviewError {}

impl From<SurfaceError> for PreviewError {
    fn from(e: SurfaceError) -> Self {
        PreviewError::Precondition(e)
    }
}

impl From<SettingsError> for PreviewError {
    fn from(e: SettingsError) -> Self {
        PreviewError::Settings(e)
    }
}

impl From<MessagingError> for PreviewError {
    fn from(e: MessagingError) -> Self {
        PreviewError::Handshake(e)
    }
}
