//! The database facade and its lifecycle state machine.
//!
//! A [`Database`] is a cheap-to-clone handle over a shared inner state. The
//! engine behind it is constructed lazily by [`open`](Database::open);
//! operations issued before the handle is open are queued and replayed in
//! order once it is. All transitions go through one mutex that is never held
//! across an await.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use airlock_engine::{Engine, EngineFactory, EngineOp, IterOptions};
use tokio::sync::oneshot;

use crate::batch::Batch;
use crate::config::{
    Options, ReadOptions, ResolvedEncodings, StreamOptions, WriteOptions, WriteStreamOptions,
};
use crate::deferred::DeferredOp;
use crate::encoding::Datum;
use crate::error::{Error, Result};
use crate::events::{Event, EventBus, EventSubscriber};
use crate::model::BatchEntry;
use crate::stream::{KeyStream, ReadStream, ValueStream, WriteStream};

/// Lifecycle status of a database handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Constructed, never opened.
    New,
    /// An open transition is in flight.
    Opening,
    /// Ready; operations dispatch directly to the engine.
    Open,
    /// A close transition is in flight.
    Closing,
    /// Closed; can be reopened.
    Closed,
}

/// Mutable lifecycle state, guarded by the handle's mutex.
struct Lifecycle {
    status: Status,
    engine: Option<Arc<dyn Engine>>,
    pending: Vec<DeferredOp>,
    open_waiters: Vec<oneshot::Sender<Result<()>>>,
    close_waiters: Vec<oneshot::Sender<Result<()>>>,
    close_requested: bool,
}

struct DbInner {
    location: String,
    options: Options,
    events: EventBus,
    state: Mutex<Lifecycle>,
}

/// What `open()` decided to do under the lock.
enum OpenStep {
    AlreadyOpen,
    WaitForOpen(oneshot::Receiver<Result<()>>),
    WaitForClose(oneshot::Receiver<Result<()>>),
    Proceed(Status),
}

/// What `close()` decided to do under the lock.
enum CloseStep {
    AlreadyClosed(Vec<DeferredOp>),
    WaitForClose(oneshot::Receiver<Result<()>>),
    Proceed(Option<Arc<dyn Engine>>),
}

/// How an operation dispatches given the current status.
enum Dispatch<T> {
    Ready(Arc<dyn Engine>),
    Deferred(oneshot::Receiver<Result<T>>),
    NotOpen,
}

/// A handle to an ordered key-value database behind a pluggable engine.
///
/// Clones share one lifecycle, one engine, and one event channel.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DbInner>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("location", &self.inner.location)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Creates a handle for `location` without touching the engine.
    ///
    /// Returns an `Initialization` error if the location is empty.
    pub fn new(location: impl Into<String>, options: Options) -> Result<Self> {
        let location = location.into();
        if location.is_empty() {
            return Err(Error::initialization(
                "must provide a location for the database",
            ));
        }
        let events = EventBus::new(options.event_capacity);
        Ok(Self {
            inner: Arc::new(DbInner {
                location,
                options,
                events,
                state: Mutex::new(Lifecycle {
                    status: Status::New,
                    engine: None,
                    pending: Vec::new(),
                    open_waiters: Vec::new(),
                    close_waiters: Vec::new(),
                    close_requested: false,
                }),
            }),
        })
    }

    /// The location this handle was created for.
    pub fn location(&self) -> &str {
        &self.inner.location
    }

    /// The options this handle was created with.
    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        self.lock_state().status
    }

    /// True once the open transition has completed.
    pub fn is_open(&self) -> bool {
        self.status() == Status::Open
    }

    /// True while closing or after close completed.
    pub fn is_closed(&self) -> bool {
        matches!(self.status(), Status::Closing | Status::Closed)
    }

    /// Subscribes to lifecycle and write events from this handle.
    pub fn subscribe(&self) -> EventSubscriber {
        self.inner.events.subscribe()
    }

    fn lock_state(&self) -> MutexGuard<'_, Lifecycle> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the database, constructing the engine through the factory.
    ///
    /// Idempotent when already open. Concurrent callers during an open or
    /// close transition wait for that transition instead of starting a
    /// second engine open. On failure the status reverts to what it was, so
    /// the caller can retry; queued operations stay queued.
    pub async fn open(&self) -> Result<()> {
        loop {
            let step = {
                let mut state = self.lock_state();
                match state.status {
                    Status::Open => OpenStep::AlreadyOpen,
                    Status::Opening => {
                        let (tx, rx) = oneshot::channel();
                        state.open_waiters.push(tx);
                        OpenStep::WaitForOpen(rx)
                    }
                    Status::Closing => {
                        let (tx, rx) = oneshot::channel();
                        state.close_waiters.push(tx);
                        OpenStep::WaitForClose(rx)
                    }
                    Status::New | Status::Closed => {
                        let prior = state.status;
                        state.status = Status::Opening;
                        OpenStep::Proceed(prior)
                    }
                }
            };
            match step {
                OpenStep::AlreadyOpen => return Ok(()),
                OpenStep::WaitForOpen(rx) => {
                    return rx.await.unwrap_or_else(|_| {
                        Err(Error::open("open transition was abandoned", None))
                    });
                }
                OpenStep::WaitForClose(rx) => {
                    let _ = rx.await;
                    continue;
                }
                OpenStep::Proceed(prior) => return self.do_open(prior).await,
            }
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(location = %self.inner.location))]
    async fn do_open(&self, prior: Status) -> Result<()> {
        self.inner.events.emit(Event::Opening);
        let engine = self.inner.options.engine.create(&self.inner.location);
        let opened = engine.open(&self.inner.options.open_options()).await;

        if let Err(e) = opened {
            let err = Error::open(
                format!("failed to open database [{}]: {}", self.inner.location, e),
                Some(e),
            );
            let (open_waiters, close_waiters, pending) = {
                let mut state = self.lock_state();
                if state.close_requested {
                    // A close was granted while opening; honor it. The queue
                    // will never replay, so its callers must be failed.
                    state.close_requested = false;
                    state.status = Status::Closed;
                    (
                        std::mem::take(&mut state.open_waiters),
                        std::mem::take(&mut state.close_waiters),
                        std::mem::take(&mut state.pending),
                    )
                } else {
                    state.status = prior;
                    (std::mem::take(&mut state.open_waiters), Vec::new(), Vec::new())
                }
            };
            for waiter in open_waiters {
                let _ = waiter.send(Err(err.clone()));
            }
            // An engine that never opened has nothing to close.
            for waiter in close_waiters {
                let _ = waiter.send(Ok(()));
            }
            self.fail_pending(pending);
            tracing::debug!(error = %err, "open failed");
            return Err(err);
        }

        let (pending, open_waiters) = {
            let mut state = self.lock_state();
            state.engine = Some(engine.clone());
            state.status = Status::Open;
            (
                std::mem::take(&mut state.pending),
                std::mem::take(&mut state.open_waiters),
            )
        };
        self.inner.events.emit(Event::Open);
        for waiter in open_waiters {
            let _ = waiter.send(Ok(()));
        }

        tracing::debug!(replaying = pending.len(), "database open");
        for op in pending {
            self.replay(&engine, op).await;
        }
        self.inner.events.emit(Event::Ready);

        let close_requested = {
            let mut state = self.lock_state();
            std::mem::take(&mut state.close_requested)
        };
        if close_requested {
            // The closer is parked as a close waiter and gets the result
            // there; open itself succeeded.
            let _ = self.close().await;
        }
        Ok(())
    }

    /// Closes the database, releasing the engine.
    ///
    /// A close issued while an open is in flight runs after that open
    /// resolves, so queued operations are replayed first. Closing a `New`
    /// or already-closed handle succeeds immediately.
    pub async fn close(&self) -> Result<()> {
        let step = {
            let mut state = self.lock_state();
            match state.status {
                Status::New | Status::Closed => {
                    CloseStep::AlreadyClosed(std::mem::take(&mut state.pending))
                }
                Status::Opening => {
                    state.close_requested = true;
                    let (tx, rx) = oneshot::channel();
                    state.close_waiters.push(tx);
                    CloseStep::WaitForClose(rx)
                }
                Status::Closing => {
                    let (tx, rx) = oneshot::channel();
                    state.close_waiters.push(tx);
                    CloseStep::WaitForClose(rx)
                }
                Status::Open => {
                    state.status = Status::Closing;
                    CloseStep::Proceed(state.engine.take())
                }
            }
        };
        match step {
            CloseStep::AlreadyClosed(pending) => {
                self.fail_pending(pending);
                Ok(())
            }
            CloseStep::WaitForClose(rx) => rx.await.unwrap_or_else(|_| {
                Err(Error::open("close transition was abandoned", None))
            }),
            CloseStep::Proceed(engine) => self.do_close(engine).await,
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(location = %self.inner.location))]
    async fn do_close(&self, engine: Option<Arc<dyn Engine>>) -> Result<()> {
        self.inner.events.emit(Event::Closing);
        let result = match engine {
            Some(engine) => engine.close().await.map_err(|e| {
                Error::open(
                    format!("failed to close database [{}]: {}", self.inner.location, e),
                    Some(e),
                )
            }),
            None => Ok(()),
        };
        let close_waiters = {
            let mut state = self.lock_state();
            state.status = Status::Closed;
            std::mem::take(&mut state.close_waiters)
        };
        self.inner.events.emit(Event::Closed);
        for waiter in close_waiters {
            let _ = waiter.send(result.clone());
        }
        tracing::debug!("database closed");
        result
    }

    /// Fails queued operations on a handle that will never open.
    fn fail_pending(&self, pending: Vec<DeferredOp>) {
        for op in pending {
            let err = Error::write(format!(
                "database [{}] closed before the operation could run",
                self.inner.location
            ));
            match op {
                DeferredOp::Get { tx, .. } => {
                    let _ = tx.send(Err(err));
                }
                DeferredOp::Put { tx, .. }
                | DeferredOp::Del { tx, .. }
                | DeferredOp::Batch { tx, .. } => {
                    let _ = tx.send(Err(err));
                }
                DeferredOp::ApproximateSize { tx, .. } => {
                    let _ = tx.send(Err(err));
                }
            }
        }
    }

    /// Runs a queued operation against the freshly installed engine.
    ///
    /// If the caller stopped listening, an error result is broadcast on the
    /// event channel instead of being dropped.
    async fn replay(&self, engine: &Arc<dyn Engine>, op: DeferredOp) {
        match op {
            DeferredOp::Get { key, enc, tx } => {
                let result = self.execute_get(engine, &key, enc).await;
                if let Err(Err(err)) = tx.send(result) {
                    self.inner.events.emit(Event::Error(err));
                }
            }
            DeferredOp::Put {
                key,
                value,
                enc,
                tx,
            } => {
                let result = self.execute_put(engine, key, value, enc).await;
                if let Err(Err(err)) = tx.send(result) {
                    self.inner.events.emit(Event::Error(err));
                }
            }
            DeferredOp::Del { key, enc, tx } => {
                let result = self.execute_del(engine, key, enc).await;
                if let Err(Err(err)) = tx.send(result) {
                    self.inner.events.emit(Event::Error(err));
                }
            }
            DeferredOp::Batch { entries, enc, tx } => {
                let result = self.execute_batch(engine, entries, enc).await;
                if let Err(Err(err)) = tx.send(result) {
                    self.inner.events.emit(Event::Error(err));
                }
            }
            DeferredOp::ApproximateSize {
                start,
                end,
                enc,
                tx,
            } => {
                let result = self.execute_approximate_size(engine, &start, &end, enc).await;
                if let Err(Err(err)) = tx.send(result) {
                    self.inner.events.emit(Event::Error(err));
                }
            }
        }
    }

    /// Reads the value stored under `key`.
    ///
    /// Deferred while the handle is new or opening. Returns `NotFound` when
    /// the engine reports the key absent.
    pub async fn get(&self, key: impl Into<Datum>, options: ReadOptions) -> Result<Datum> {
        let key = key.into();
        let enc = self.inner.options.resolve_read(&options);
        let dispatch = {
            let mut state = self.lock_state();
            match state.status {
                Status::Open => match state.engine.clone() {
                    Some(engine) => Dispatch::Ready(engine),
                    None => Dispatch::NotOpen,
                },
                Status::New | Status::Opening => {
                    let (tx, rx) = oneshot::channel();
                    state.pending.push(DeferredOp::Get {
                        key: key.clone(),
                        enc,
                        tx,
                    });
                    Dispatch::Deferred(rx)
                }
                Status::Closing | Status::Closed => Dispatch::NotOpen,
            }
        };
        match dispatch {
            Dispatch::Ready(engine) => self.execute_get(&engine, &key, enc).await,
            Dispatch::Deferred(rx) => Self::await_deferred(rx).await,
            Dispatch::NotOpen => Err(self.not_open_read()),
        }
    }

    /// Stores `value` under `key`. Deferred while new or opening.
    pub async fn put(
        &self,
        key: impl Into<Datum>,
        value: impl Into<Datum>,
        options: WriteOptions,
    ) -> Result<()> {
        let key = key.into();
        let value = value.into();
        let enc = self.inner.options.resolve_write(&options);
        let dispatch = {
            let mut state = self.lock_state();
            match state.status {
                Status::Open => match state.engine.clone() {
                    Some(engine) => Dispatch::Ready(engine),
                    None => Dispatch::NotOpen,
                },
                Status::New | Status::Opening => {
                    let (tx, rx) = oneshot::channel();
                    state.pending.push(DeferredOp::Put {
                        key: key.clone(),
                        value: value.clone(),
                        enc,
                        tx,
                    });
                    Dispatch::Deferred(rx)
                }
                Status::Closing | Status::Closed => Dispatch::NotOpen,
            }
        };
        match dispatch {
            Dispatch::Ready(engine) => self.execute_put(&engine, key, value, enc).await,
            Dispatch::Deferred(rx) => Self::await_deferred(rx).await,
            Dispatch::NotOpen => Err(self.not_open_write()),
        }
    }

    /// Deletes `key`. Deferred while new or opening.
    pub async fn del(&self, key: impl Into<Datum>, options: WriteOptions) -> Result<()> {
        let key = key.into();
        let enc = self.inner.options.resolve_write(&options);
        let dispatch = {
            let mut state = self.lock_state();
            match state.status {
                Status::Open => match state.engine.clone() {
                    Some(engine) => Dispatch::Ready(engine),
                    None => Dispatch::NotOpen,
                },
                Status::New | Status::Opening => {
                    let (tx, rx) = oneshot::channel();
                    state.pending.push(DeferredOp::Del {
                        key: key.clone(),
                        enc,
                        tx,
                    });
                    Dispatch::Deferred(rx)
                }
                Status::Closing | Status::Closed => Dispatch::NotOpen,
            }
        };
        match dispatch {
            Dispatch::Ready(engine) => self.execute_del(&engine, key, enc).await,
            Dispatch::Deferred(rx) => Self::await_deferred(rx).await,
            Dispatch::NotOpen => Err(self.not_open_write()),
        }
    }

    /// Applies an array of entries as one atomic batch.
    ///
    /// Every entry is encoded up front per its resolved encodings; a single
    /// malformed entry rejects the whole batch and nothing commits.
    /// Deferred while new or opening.
    pub async fn apply_batch(
        &self,
        entries: Vec<BatchEntry>,
        options: WriteOptions,
    ) -> Result<()> {
        let enc = self.inner.options.resolve_write(&options);
        let dispatch = {
            let mut state = self.lock_state();
            match state.status {
                Status::Open => match state.engine.clone() {
                    Some(engine) => Dispatch::Ready(engine),
                    None => Dispatch::NotOpen,
                },
                Status::New | Status::Opening => {
                    let (tx, rx) = oneshot::channel();
                    state.pending.push(DeferredOp::Batch {
                        entries: entries.clone(),
                        enc,
                        tx,
                    });
                    Dispatch::Deferred(rx)
                }
                Status::Closing | Status::Closed => Dispatch::NotOpen,
            }
        };
        match dispatch {
            Dispatch::Ready(engine) => self.execute_batch(&engine, entries, enc).await,
            Dispatch::Deferred(rx) => Self::await_deferred(rx).await,
            Dispatch::NotOpen => Err(self.not_open_write()),
        }
    }

    /// Estimates the byte size of entries with keys in `[start, end)`.
    /// Deferred while new or opening.
    pub async fn approximate_size(
        &self,
        start: impl Into<Datum>,
        end: impl Into<Datum>,
        options: ReadOptions,
    ) -> Result<u64> {
        let start = start.into();
        let end = end.into();
        let enc = self.inner.options.resolve_read(&options);
        let dispatch = {
            let mut state = self.lock_state();
            match state.status {
                Status::Open => match state.engine.clone() {
                    Some(engine) => Dispatch::Ready(engine),
                    None => Dispatch::NotOpen,
                },
                Status::New | Status::Opening => {
                    let (tx, rx) = oneshot::channel();
                    state.pending.push(DeferredOp::ApproximateSize {
                        start: start.clone(),
                        end: end.clone(),
                        enc,
                        tx,
                    });
                    Dispatch::Deferred(rx)
                }
                Status::Closing | Status::Closed => Dispatch::NotOpen,
            }
        };
        match dispatch {
            Dispatch::Ready(engine) => {
                self.execute_approximate_size(&engine, &start, &end, enc).await
            }
            Dispatch::Deferred(rx) => Self::await_deferred(rx).await,
            Dispatch::NotOpen => Err(self.not_open_read()),
        }
    }

    /// Starts a fluent batch builder.
    ///
    /// Requires the handle to be open: the builder wraps an engine-native
    /// batch, which needs a live engine. Use [`apply_batch`](Self::apply_batch)
    /// for writes that must queue behind an open.
    pub fn batch(&self) -> Result<Batch> {
        let engine = self.open_engine().ok_or_else(|| self.not_open_write())?;
        let inner = engine.batch().map_err(Error::from_write)?;
        Ok(Batch::new(
            inner,
            self.inner.options.clone(),
            self.inner.events.clone(),
        ))
    }

    /// Streams decoded entries in key order. Requires the handle to be open.
    pub fn read_stream(&self, options: StreamOptions) -> Result<ReadStream> {
        let (iter, enc) = self.open_iterator(&options)?;
        Ok(ReadStream::new(iter, enc.key, enc.value))
    }

    /// Streams decoded keys only. Requires the handle to be open.
    pub fn key_stream(&self, options: StreamOptions) -> Result<KeyStream> {
        let (iter, enc) = self.open_iterator(&options)?;
        Ok(KeyStream::new(iter, enc.key))
    }

    /// Streams decoded values only. Requires the handle to be open.
    pub fn value_stream(&self, options: StreamOptions) -> Result<ValueStream> {
        let (iter, enc) = self.open_iterator(&options)?;
        Ok(ValueStream::new(iter, enc.value))
    }

    /// Starts a write stream that groups entries into atomic batches.
    pub fn write_stream(&self, options: WriteStreamOptions) -> WriteStream {
        WriteStream::spawn(self.clone(), options)
    }

    fn open_engine(&self) -> Option<Arc<dyn Engine>> {
        let state = self.lock_state();
        match state.status {
            Status::Open => state.engine.clone(),
            _ => None,
        }
    }

    fn open_iterator(
        &self,
        options: &StreamOptions,
    ) -> Result<(Box<dyn airlock_engine::EngineIterator>, ResolvedEncodings)> {
        let engine = self.open_engine().ok_or_else(|| self.not_open_read())?;
        let enc = self.inner.options.resolve_read(&ReadOptions {
            key_encoding: options.key_encoding,
            value_encoding: options.value_encoding,
            as_bytes: false,
        });
        let start = options
            .start
            .as_ref()
            .map(|d| enc.key.encode(d))
            .transpose()?;
        let end = options.end.as_ref().map(|d| enc.key.encode(d)).transpose()?;
        let iter = engine
            .iterator(IterOptions {
                start,
                end,
                limit: options.limit,
                reverse: options.reverse,
            })
            .map_err(Error::from_read)?;
        Ok((iter, enc))
    }

    async fn await_deferred<T>(rx: oneshot::Receiver<Result<T>>) -> Result<T> {
        rx.await.unwrap_or_else(|_| {
            Err(Error::write(
                "database closed before the deferred operation could run",
            ))
        })
    }

    fn not_open_read(&self) -> Error {
        Error::read(format!("database is not open [{}]", self.inner.location))
    }

    fn not_open_write(&self) -> Error {
        Error::write(format!("database is not open [{}]", self.inner.location))
    }

    async fn execute_get(
        &self,
        engine: &Arc<dyn Engine>,
        key: &Datum,
        enc: ResolvedEncodings,
    ) -> Result<Datum> {
        let raw_key = enc.key.encode(key)?;
        match engine.get(raw_key).await {
            Ok(Some(raw)) => {
                if enc.as_bytes {
                    Ok(Datum::Bytes(raw))
                } else {
                    enc.value.decode(raw)
                }
            }
            Ok(None) => Err(Error::not_found(
                format!("key [{}] not found in database [{}]", key, self.inner.location),
                None,
            )),
            Err(e) => Err(Error::from_read(e)),
        }
    }

    async fn execute_put(
        &self,
        engine: &Arc<dyn Engine>,
        key: Datum,
        value: Datum,
        enc: ResolvedEncodings,
    ) -> Result<()> {
        let raw_key = enc.key.encode(&key)?;
        let raw_value = enc.value.encode(&value)?;
        engine
            .put(raw_key, raw_value)
            .await
            .map_err(Error::from_write)?;
        self.inner.events.emit(Event::Put { key, value });
        Ok(())
    }

    async fn execute_del(
        &self,
        engine: &Arc<dyn Engine>,
        key: Datum,
        enc: ResolvedEncodings,
    ) -> Result<()> {
        let raw_key = enc.key.encode(&key)?;
        engine.del(raw_key).await.map_err(Error::from_write)?;
        self.inner.events.emit(Event::Del { key });
        Ok(())
    }

    async fn execute_batch(
        &self,
        engine: &Arc<dyn Engine>,
        entries: Vec<BatchEntry>,
        enc: ResolvedEncodings,
    ) -> Result<()> {
        let ops = encode_entries(&entries, enc)?;
        engine.apply(ops).await.map_err(Error::from_write)?;
        self.inner.events.emit(Event::Batch(entries));
        Ok(())
    }

    async fn execute_approximate_size(
        &self,
        engine: &Arc<dyn Engine>,
        start: &Datum,
        end: &Datum,
        enc: ResolvedEncodings,
    ) -> Result<u64> {
        let raw_start = enc.key.encode(start)?;
        let raw_end = enc.key.encode(end)?;
        engine
            .approximate_size(raw_start, raw_end)
            .await
            .map_err(Error::from_read)
    }
}

/// Encodes batch entries up front so a malformed entry rejects the whole
/// batch before anything reaches the engine.
pub(crate) fn encode_entries(
    entries: &[BatchEntry],
    enc: ResolvedEncodings,
) -> Result<Vec<EngineOp>> {
    entries
        .iter()
        .map(|entry| match entry {
            BatchEntry::Put {
                key,
                value,
                key_encoding,
                value_encoding,
            } => {
                let key_enc = key_encoding.unwrap_or(enc.key);
                let value_enc = value_encoding.unwrap_or(enc.value);
                Ok(EngineOp::Put {
                    key: key_enc.encode(key)?,
                    value: value_enc.encode(value)?,
                })
            }
            BatchEntry::Del { key, key_encoding } => {
                let key_enc = key_encoding.unwrap_or(enc.key);
                Ok(EngineOp::Del {
                    key: key_enc.encode(key)?,
                })
            }
        })
        .collect()
}

/// Destroys all data at `location`. The database must not be open.
pub async fn destroy(factory: &dyn EngineFactory, location: &str) -> Result<()> {
    factory.destroy(location).await.map_err(|e| {
        Error::open(format!("failed to destroy [{}]: {}", location, e), Some(e))
    })
}

/// Attempts to repair the data at `location`. The database must not be open.
pub async fn repair(factory: &dyn EngineFactory, location: &str) -> Result<()> {
    factory.repair(location).await.map_err(|e| {
        Error::open(format!("failed to repair [{}]: {}", location, e), Some(e))
    })
}
