//! Configuration for database handles and per-call option overrides.
//!
//! Facade-level [`Options`] are fixed at construction; per-call option
//! records are merged into a fresh resolution each call and never mutate
//! the shared defaults. Resolution order: per-entry encoding (batch array
//! form) → per-call option → facade option.

use std::sync::Arc;

use airlock_engine::{EngineFactory, MemoryEngineFactory, OpenOptions};

use crate::encoding::Encoding;

/// Facade-level configuration, merged from defaults and user settings at
/// construction time.
#[derive(Clone)]
pub struct Options {
    /// Factory the open transition constructs the engine through.
    pub engine: Arc<dyn EngineFactory>,
    /// Create the location on open if it does not exist. Default: true.
    pub create_if_missing: bool,
    /// Fail open if the location already exists. Default: false.
    pub error_if_exists: bool,
    /// Default key encoding. Default: utf8.
    pub key_encoding: Encoding,
    /// Default value encoding. Default: utf8.
    pub value_encoding: Encoding,
    /// Capacity of the event broadcast channel. Default: 64.
    pub event_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            engine: Arc::new(MemoryEngineFactory::new()),
            create_if_missing: true,
            error_if_exists: false,
            key_encoding: Encoding::Utf8,
            value_encoding: Encoding::Utf8,
            event_capacity: 64,
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("create_if_missing", &self.create_if_missing)
            .field("error_if_exists", &self.error_if_exists)
            .field("key_encoding", &self.key_encoding)
            .field("value_encoding", &self.value_encoding)
            .field("event_capacity", &self.event_capacity)
            .finish_non_exhaustive()
    }
}

impl Options {
    pub(crate) fn open_options(&self) -> OpenOptions {
        OpenOptions {
            create_if_missing: self.create_if_missing,
            error_if_exists: self.error_if_exists,
        }
    }

    pub(crate) fn resolve_read(&self, options: &ReadOptions) -> ResolvedEncodings {
        ResolvedEncodings {
            key: options.key_encoding.unwrap_or(self.key_encoding),
            value: options.value_encoding.unwrap_or(self.value_encoding),
            as_bytes: options.as_bytes,
        }
    }

    pub(crate) fn resolve_write(&self, options: &WriteOptions) -> ResolvedEncodings {
        ResolvedEncodings {
            key: options.key_encoding.unwrap_or(self.key_encoding),
            value: options.value_encoding.unwrap_or(self.value_encoding),
            as_bytes: false,
        }
    }
}

/// Per-call options for read operations.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Key encoding override for this call.
    pub key_encoding: Option<Encoding>,
    /// Value encoding override for this call.
    pub value_encoding: Option<Encoding>,
    /// Skip value decoding and return the raw stored bytes.
    pub as_bytes: bool,
}

/// Per-call options for write operations.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Key encoding override for this call.
    pub key_encoding: Option<Encoding>,
    /// Value encoding override for this call.
    pub value_encoding: Option<Encoding>,
}

/// Options for creating a read stream.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// First key to yield (inclusive), in application form.
    pub start: Option<crate::encoding::Datum>,
    /// Last key to yield (inclusive), in application form.
    pub end: Option<crate::encoding::Datum>,
    /// Maximum number of entries to yield.
    pub limit: Option<usize>,
    /// Iterate in descending key order.
    pub reverse: bool,
    /// Key encoding override for this stream.
    pub key_encoding: Option<Encoding>,
    /// Value encoding override for this stream.
    pub value_encoding: Option<Encoding>,
}

/// Options for creating a write stream.
#[derive(Debug, Clone)]
pub struct WriteStreamOptions {
    /// Bound of the in-flight entry channel; a full channel makes
    /// `write()` wait, applying backpressure to the producer.
    pub buffer: usize,
    /// Maximum number of entries grouped into one engine batch.
    pub chunk: usize,
    /// Key encoding override for this stream.
    pub key_encoding: Option<Encoding>,
    /// Value encoding override for this stream.
    pub value_encoding: Option<Encoding>,
}

impl Default for WriteStreamOptions {
    fn default() -> Self {
        Self {
            buffer: 16,
            chunk: 128,
            key_encoding: None,
            value_encoding: None,
        }
    }
}

/// The encodings resolved for one operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedEncodings {
    pub key: Encoding,
    pub value: Encoding,
    pub as_bytes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fall_back_to_facade_encodings() {
        // given
        let options = Options {
            key_encoding: Encoding::Binary,
            value_encoding: Encoding::Json,
            ..Default::default()
        };

        // when
        let resolved = options.resolve_read(&ReadOptions::default());

        // then
        assert_eq!(resolved.key, Encoding::Binary);
        assert_eq!(resolved.value, Encoding::Json);
    }

    #[test]
    fn should_prefer_per_call_encodings() {
        // given
        let options = Options::default();
        let per_call = ReadOptions {
            key_encoding: Some(Encoding::Binary),
            value_encoding: Some(Encoding::Json),
            as_bytes: false,
        };

        // when
        let resolved = options.resolve_read(&per_call);

        // then - the facade defaults (utf8) are overridden
        assert_eq!(resolved.key, Encoding::Binary);
        assert_eq!(resolved.value, Encoding::Json);
    }

    #[test]
    fn should_not_mutate_shared_defaults() {
        // given
        let options = Options::default();
        let per_call = WriteOptions {
            key_encoding: Some(Encoding::Json),
            value_encoding: None,
        };

        // when
        let _ = options.resolve_write(&per_call);

        // then
        assert_eq!(options.key_encoding, Encoding::Utf8);
        assert_eq!(options.value_encoding, Encoding::Utf8);
    }
}
