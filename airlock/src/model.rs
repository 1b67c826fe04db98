//! Data types for facade operations.

use crate::encoding::{Datum, Encoding};

/// A decoded key-value entry yielded by a read stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The decoded key.
    pub key: Datum,
    /// The decoded value.
    pub value: Datum,
}

/// A single sub-operation in the array form of batch submission.
///
/// Per-entry encodings override the per-call and facade-level encodings
/// for that entry only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEntry {
    Put {
        key: Datum,
        value: Datum,
        key_encoding: Option<Encoding>,
        value_encoding: Option<Encoding>,
    },
    Del {
        key: Datum,
        key_encoding: Option<Encoding>,
    },
}

impl BatchEntry {
    /// A put entry using the inherited encodings.
    pub fn put(key: impl Into<Datum>, value: impl Into<Datum>) -> Self {
        BatchEntry::Put {
            key: key.into(),
            value: value.into(),
            key_encoding: None,
            value_encoding: None,
        }
    }

    /// A delete entry using the inherited encodings.
    pub fn del(key: impl Into<Datum>) -> Self {
        BatchEntry::Del {
            key: key.into(),
            key_encoding: None,
        }
    }

    /// The entry's key.
    pub fn key(&self) -> &Datum {
        match self {
            BatchEntry::Put { key, .. } | BatchEntry::Del { key, .. } => key,
        }
    }
}
