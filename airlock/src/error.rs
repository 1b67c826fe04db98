//! Error types for facade operations.

use airlock_engine::EngineError;

/// Error type for facade operations.
///
/// Every kind that wraps an engine failure preserves the original
/// [`EngineError`] as its [`source`](std::error::Error::source).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid construction arguments, e.g. an empty location.
    Initialization(String),

    /// The engine failed to open, close, destroy, or repair.
    Open {
        message: String,
        source: Option<EngineError>,
    },

    /// Read failures (get, approximate size), including "not open".
    Read {
        message: String,
        source: Option<EngineError>,
    },

    /// Write failures (put, del, batch), including "not open".
    Write {
        message: String,
        source: Option<EngineError>,
    },

    /// The engine reported the key absent.
    NotFound {
        message: String,
        source: Option<EngineError>,
    },

    /// Codec failure while encoding an operand or decoding a result.
    Encoding(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            Error::Open { message, .. } => write!(f, "Open error: {}", message),
            Error::Read { message, .. } => write!(f, "Read error: {}", message),
            Error::Write { message, .. } => write!(f, "Write error: {}", message),
            Error::NotFound { message, .. } => write!(f, "Key not found: {}", message),
            Error::Encoding(msg) => write!(f, "Encoding error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { source, .. }
            | Error::Read { source, .. }
            | Error::Write { source, .. }
            | Error::NotFound { source, .. } => {
                source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// Returns true if the engine error looks like a missing-key signal.
///
/// Engines report absence as `EngineError::NotFound` or, for engines that
/// can only signal through error text, a message matching "notfound" /
/// "not found" case-insensitively.
fn is_not_found_signal(err: &EngineError) -> bool {
    if matches!(err, EngineError::NotFound(_)) {
        return true;
    }
    let text = err.to_string().to_lowercase();
    text.contains("notfound") || text.contains("not found")
}

impl Error {
    pub(crate) fn initialization(message: impl Into<String>) -> Self {
        Error::Initialization(message.into())
    }

    pub(crate) fn open(message: impl Into<String>, source: Option<EngineError>) -> Self {
        Error::Open {
            message: message.into(),
            source,
        }
    }

    pub(crate) fn read(message: impl Into<String>) -> Self {
        Error::Read {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn write(message: impl Into<String>) -> Self {
        Error::Write {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn not_found(message: impl Into<String>, source: Option<EngineError>) -> Self {
        Error::NotFound {
            message: message.into(),
            source,
        }
    }

    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding(message.into())
    }

    /// Maps an engine error from a read path, distinguishing the
    /// missing-key signal from other failures.
    pub(crate) fn from_read(err: EngineError) -> Self {
        if is_not_found_signal(&err) {
            Error::NotFound {
                message: err.to_string(),
                source: Some(err),
            }
        } else {
            Error::Read {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }

    /// Wraps an engine error from a write path.
    pub(crate) fn from_write(err: EngineError) -> Self {
        Error::Write {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Returns true if this error reports a missing key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result type alias for facade operations.
pub type Result<T> = std::result::Result<T, Error>;
