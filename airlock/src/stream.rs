//! Streaming reads and writes.
//!
//! Read streams are pull-based: nothing is fetched until the consumer asks
//! for the next entry, so a slow consumer is its own backpressure. Write
//! streams push entries through a bounded channel to a background task that
//! groups them into atomic batches; a full channel makes the producer wait.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use airlock_engine::EngineIterator;

use crate::config::{WriteOptions, WriteStreamOptions};
use crate::db::Database;
use crate::encoding::{Datum, Encoding};
use crate::error::{Error, Result};
use crate::model::{BatchEntry, Entry};

/// A pull-based stream of decoded entries in key order.
///
/// The stream ends after yielding `Ok(None)` or any error; both release the
/// underlying engine cursor.
pub struct ReadStream {
    iter: Option<Box<dyn EngineIterator>>,
    key_encoding: Encoding,
    value_encoding: Encoding,
}

impl ReadStream {
    pub(crate) fn new(
        iter: Box<dyn EngineIterator>,
        key_encoding: Encoding,
        value_encoding: Encoding,
    ) -> Self {
        Self {
            iter: Some(iter),
            key_encoding,
            value_encoding,
        }
    }

    /// Yields the next decoded entry, or `None` when the range is exhausted.
    pub async fn next(&mut self) -> Result<Option<Entry>> {
        let Some((raw_key, raw_value)) = self.next_raw().await? else {
            return Ok(None);
        };
        let key = self.key_encoding.decode(raw_key).map_err(|e| {
            self.destroy();
            e
        })?;
        let value = self.value_encoding.decode(raw_value).map_err(|e| {
            self.destroy();
            e
        })?;
        Ok(Some(Entry { key, value }))
    }

    /// Releases the engine cursor early. Subsequent `next` calls yield `None`.
    pub fn destroy(&mut self) {
        self.iter = None;
    }

    async fn next_raw(&mut self) -> Result<Option<(bytes::Bytes, bytes::Bytes)>> {
        let Some(iter) = self.iter.as_mut() else {
            return Ok(None);
        };
        match iter.next().await {
            Ok(Some(pair)) => Ok(Some(pair)),
            Ok(None) => {
                self.iter = None;
                Ok(None)
            }
            Err(e) => {
                self.iter = None;
                Err(Error::from_read(e))
            }
        }
    }
}

/// A read stream that decodes keys only.
pub struct KeyStream {
    inner: ReadStream,
}

impl KeyStream {
    pub(crate) fn new(iter: Box<dyn EngineIterator>, key_encoding: Encoding) -> Self {
        Self {
            inner: ReadStream::new(iter, key_encoding, Encoding::Binary),
        }
    }

    /// Yields the next decoded key.
    pub async fn next(&mut self) -> Result<Option<Datum>> {
        let Some((raw_key, _)) = self.inner.next_raw().await? else {
            return Ok(None);
        };
        self.inner.key_encoding.decode(raw_key).map(Some).map_err(|e| {
            self.inner.destroy();
            e
        })
    }

    /// Releases the engine cursor early.
    pub fn destroy(&mut self) {
        self.inner.destroy();
    }
}

/// A read stream that decodes values only.
pub struct ValueStream {
    inner: ReadStream,
}

impl ValueStream {
    pub(crate) fn new(iter: Box<dyn EngineIterator>, value_encoding: Encoding) -> Self {
        Self {
            inner: ReadStream::new(iter, Encoding::Binary, value_encoding),
        }
    }

    /// Yields the next decoded value.
    pub async fn next(&mut self) -> Result<Option<Datum>> {
        let Some((_, raw_value)) = self.inner.next_raw().await? else {
            return Ok(None);
        };
        self.inner
            .value_encoding
            .decode(raw_value)
            .map(Some)
            .map_err(|e| {
                self.inner.destroy();
                e
            })
    }

    /// Releases the engine cursor early.
    pub fn destroy(&mut self) {
        self.inner.destroy();
    }
}

/// Accepts entries from a producer and commits them in atomic batches.
///
/// Entries flow through a bounded channel to a background writer task; a
/// full channel makes [`write`](WriteStream::write) wait. A failed batch
/// stops the writer, fails subsequent writes, and surfaces the error from
/// [`close`](WriteStream::close).
pub struct WriteStream {
    tx: mpsc::Sender<BatchEntry>,
    task: JoinHandle<Result<()>>,
}

impl WriteStream {
    pub(crate) fn spawn(db: Database, options: WriteStreamOptions) -> Self {
        let (tx, rx) = mpsc::channel(options.buffer.max(1));
        let write_options = WriteOptions {
            key_encoding: options.key_encoding,
            value_encoding: options.value_encoding,
        };
        let chunk = options.chunk.max(1);
        let task = tokio::spawn(run_writer(db, rx, write_options, chunk));
        Self { tx, task }
    }

    /// Submits a put. Waits when the stream's buffer is full.
    pub async fn write(&self, key: impl Into<Datum>, value: impl Into<Datum>) -> Result<()> {
        self.write_entry(BatchEntry::put(key, value)).await
    }

    /// Submits an arbitrary entry, including deletes and entries with
    /// per-entry encodings.
    pub async fn write_entry(&self, entry: BatchEntry) -> Result<()> {
        self.tx
            .send(entry)
            .await
            .map_err(|_| Error::write("write stream is closed"))
    }

    /// Finishes the stream: flushes everything submitted, then reports the
    /// first write failure, if any.
    pub async fn close(self) -> Result<()> {
        let WriteStream { tx, task } = self;
        drop(tx);
        task.await
            .unwrap_or_else(|e| Err(Error::write(format!("write stream task failed: {}", e))))
    }

    /// Abandons the stream without flushing.
    pub fn destroy(self) {
        self.task.abort();
    }
}

async fn run_writer(
    db: Database,
    mut rx: mpsc::Receiver<BatchEntry>,
    options: WriteOptions,
    chunk: usize,
) -> Result<()> {
    while let Some(first) = rx.recv().await {
        let mut entries = vec![first];
        while entries.len() < chunk {
            match rx.try_recv() {
                Ok(entry) => entries.push(entry),
                Err(_) => break,
            }
        }
        db.apply_batch(entries, options.clone()).await?;
    }
    Ok(())
}
