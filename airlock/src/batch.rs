//! Fluent builder for atomic multi-operation writes.

use airlock_engine::EngineBatch;

use crate::config::{Options, WriteOptions};
use crate::encoding::Datum;
use crate::error::{Error, Result};
use crate::events::{Event, EventBus};
use crate::model::BatchEntry;

/// An atomic batch under construction.
///
/// Wraps an engine-native batch and keeps a parallel log of accepted
/// operations. Keys and values are encoded as they are added, so a rejected
/// operation leaves the log untouched. [`write`](Batch::write) consumes the
/// builder; there is no way to commit twice.
pub struct Batch {
    inner: Box<dyn EngineBatch>,
    ops: Vec<BatchEntry>,
    options: Options,
    events: EventBus,
}

impl Batch {
    pub(crate) fn new(inner: Box<dyn EngineBatch>, options: Options, events: EventBus) -> Self {
        Self {
            inner,
            ops: Vec::new(),
            options,
            events,
        }
    }

    /// Appends a put.
    ///
    /// Encodes the key and value immediately; on failure nothing is added.
    pub fn put(
        &mut self,
        key: impl Into<Datum>,
        value: impl Into<Datum>,
        options: WriteOptions,
    ) -> Result<&mut Self> {
        let key = key.into();
        let value = value.into();
        let enc = self.options.resolve_write(&options);
        let raw_key = enc.key.encode(&key)?;
        let raw_value = enc.value.encode(&value)?;
        self.inner
            .put(raw_key.clone(), raw_value.clone())
            .map_err(Error::from_write)?;
        self.ops.push(BatchEntry::Put {
            key: Datum::Bytes(raw_key),
            value: Datum::Bytes(raw_value),
            key_encoding: None,
            value_encoding: None,
        });
        Ok(self)
    }

    /// Appends a delete.
    pub fn del(&mut self, key: impl Into<Datum>, options: WriteOptions) -> Result<&mut Self> {
        let key = key.into();
        let enc = self.options.resolve_write(&options);
        let raw_key = enc.key.encode(&key)?;
        self.inner.del(raw_key.clone()).map_err(Error::from_write)?;
        self.ops.push(BatchEntry::Del {
            key: Datum::Bytes(raw_key),
            key_encoding: None,
        });
        Ok(self)
    }

    /// Discards everything accumulated so far.
    pub fn clear(&mut self) -> &mut Self {
        self.inner.clear();
        self.ops.clear();
        self
    }

    /// The operations accepted so far, in order.
    pub fn ops(&self) -> &[BatchEntry] {
        &self.ops
    }

    /// Number of accepted operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True if nothing has been accepted.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Commits the batch atomically and emits one `Batch` event carrying
    /// the accumulated operation log.
    pub async fn write(self) -> Result<()> {
        self.inner.write().await.map_err(Error::from_write)?;
        self.events.emit(Event::Batch(self.ops));
        Ok(())
    }
}
