//! The engine adapter contract.
//!
//! These traits are the only boundary the facade depends on. Any ordered
//! key-value engine can sit behind them: an embedded LSM tree, a remote
//! store, or the in-memory reference engine in [`crate::memory`].

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

/// Error type for engine operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The requested key does not exist.
    NotFound(String),
    /// Engine-level failures (I/O, corruption, rejected writes).
    Storage(String),
    /// Internal errors indicating bugs or invariant violations.
    Internal(String),
}

impl std::error::Error for EngineError {}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(msg) => write!(f, "NotFound: {}", msg),
            EngineError::Storage(msg) => write!(f, "Storage error: {}", msg),
            EngineError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl EngineError {
    /// Converts an arbitrary error to `EngineError::Storage`.
    pub fn from_storage(e: impl std::fmt::Display) -> Self {
        EngineError::Storage(e.to_string())
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Options passed to [`Engine::open`].
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Create the location if it does not exist yet.
    pub create_if_missing: bool,
    /// Fail the open if the location already exists.
    pub error_if_exists: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
        }
    }
}

/// Options for [`Engine::iterator`].
///
/// `start` and `end` are encoded key bounds and are both inclusive.
/// `limit` caps the number of entries yielded; `reverse` iterates in
/// descending key order (bounds keep their meaning).
#[derive(Debug, Clone, Default)]
pub struct IterOptions {
    pub start: Option<Bytes>,
    pub end: Option<Bytes>,
    pub limit: Option<usize>,
    pub reverse: bool,
}

/// A single encoded sub-operation in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOp {
    Put { key: Bytes, value: Bytes },
    Del { key: Bytes },
}

/// An engine-native atomic batch under construction.
///
/// `write` consumes the batch; a written batch cannot be reused.
#[async_trait]
pub trait EngineBatch: Send {
    /// Appends a put to the batch.
    fn put(&mut self, key: Bytes, value: Bytes) -> EngineResult<()>;

    /// Appends a delete to the batch.
    fn del(&mut self, key: Bytes) -> EngineResult<()>;

    /// Discards all accumulated operations.
    fn clear(&mut self);

    /// Commits the accumulated operations atomically.
    async fn write(self: Box<Self>) -> EngineResult<()>;
}

/// A cursor over an ordered range of encoded entries.
///
/// Dropping the iterator releases the underlying cursor resource.
#[async_trait]
pub trait EngineIterator: Send {
    /// Returns the next `(key, value)` pair, or `None` when exhausted.
    async fn next(&mut self) -> EngineResult<Option<(Bytes, Bytes)>>;
}

/// The byte-oriented primitives the facade consumes.
///
/// All keys and values at this boundary are already encoded; the facade's
/// codec layer owns the translation to and from application-level data.
/// Engines report a missing key as `Ok(None)` from [`get`](Engine::get);
/// engines that can only signal absence through an error should include
/// "notfound" in the error text, which the facade also recognizes.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Opens the engine. Called exactly once per facade open transition.
    async fn open(&self, options: &OpenOptions) -> EngineResult<()>;

    /// Closes the engine, releasing its resources.
    async fn close(&self) -> EngineResult<()>;

    /// Reads a single value.
    async fn get(&self, key: Bytes) -> EngineResult<Option<Bytes>>;

    /// Writes a single value.
    async fn put(&self, key: Bytes, value: Bytes) -> EngineResult<()>;

    /// Deletes a single key. No-op if the key does not exist.
    async fn del(&self, key: Bytes) -> EngineResult<()>;

    /// Applies a batch of operations atomically: either all become
    /// visible or none do.
    async fn apply(&self, ops: Vec<EngineOp>) -> EngineResult<()>;

    /// Returns an empty engine-native batch builder.
    fn batch(&self) -> EngineResult<Box<dyn EngineBatch>>;

    /// Returns a cursor over the entries selected by `options`.
    fn iterator(&self, options: IterOptions) -> EngineResult<Box<dyn EngineIterator>>;

    /// Estimates the byte size of entries in `[start, end)`.
    async fn approximate_size(&self, start: Bytes, end: Bytes) -> EngineResult<u64>;
}

/// Constructs engines for locations.
///
/// The facade holds a factory in its options and calls `create` during the
/// open transition, so a handle can be constructed before any engine
/// resources exist.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Creates an (unopened) engine for the given location.
    fn create(&self, location: &str) -> Arc<dyn Engine>;

    /// Destroys all data at a location. The engine must not be open.
    async fn destroy(&self, _location: &str) -> EngineResult<()> {
        Err(EngineError::Storage(
            "destroy is not supported by this engine".to_string(),
        ))
    }

    /// Attempts to repair data at a location. The engine must not be open.
    async fn repair(&self, _location: &str) -> EngineResult<()> {
        Err(EngineError::Storage(
            "repair is not supported by this engine".to_string(),
        ))
    }
}
