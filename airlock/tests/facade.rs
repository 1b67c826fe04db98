//! Integration tests for the database facade.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use airlock::{
    destroy, BatchEntry, Database, Datum, Encoding, Error, Event, Options, ReadOptions, Status,
    StreamOptions, WriteOptions, WriteStreamOptions,
};
use airlock_engine::{
    Engine, EngineBatch, EngineError, EngineFactory, EngineIterator, EngineOp, EngineResult,
    FailingEngine, IterOptions, MemoryEngineFactory, OpenOptions,
};
use async_trait::async_trait;
use bytes::Bytes;

fn memory_db(location: &str) -> Database {
    Database::new(location, Options::default()).expect("valid location")
}

/// Counts how many engines the open transition actually constructs.
struct CountingFactory {
    inner: MemoryEngineFactory,
    creates: AtomicUsize,
}

impl CountingFactory {
    fn new() -> Self {
        Self {
            inner: MemoryEngineFactory::new(),
            creates: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EngineFactory for CountingFactory {
    fn create(&self, location: &str) -> Arc<dyn Engine> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(location)
    }
}

/// Delays the engine open so a test can act while the facade is opening.
struct SlowEngine {
    inner: Arc<dyn Engine>,
    delay: Duration,
}

#[async_trait]
impl Engine for SlowEngine {
    async fn open(&self, options: &OpenOptions) -> EngineResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.open(options).await
    }

    async fn close(&self) -> EngineResult<()> {
        self.inner.close().await
    }

    async fn get(&self, key: Bytes) -> EngineResult<Option<Bytes>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: Bytes, value: Bytes) -> EngineResult<()> {
        self.inner.put(key, value).await
    }

    async fn del(&self, key: Bytes) -> EngineResult<()> {
        self.inner.del(key).await
    }

    async fn apply(&self, ops: Vec<EngineOp>) -> EngineResult<()> {
        self.inner.apply(ops).await
    }

    fn batch(&self) -> EngineResult<Box<dyn EngineBatch>> {
        self.inner.batch()
    }

    fn iterator(&self, options: IterOptions) -> EngineResult<Box<dyn EngineIterator>> {
        self.inner.iterator(options)
    }

    async fn approximate_size(&self, start: Bytes, end: Bytes) -> EngineResult<u64> {
        self.inner.approximate_size(start, end).await
    }
}

struct SlowFactory {
    inner: MemoryEngineFactory,
    delay: Duration,
}

#[async_trait]
impl EngineFactory for SlowFactory {
    fn create(&self, location: &str) -> Arc<dyn Engine> {
        Arc::new(SlowEngine {
            inner: self.inner.create(location),
            delay: self.delay,
        })
    }
}

/// Hands the facade a pre-built failure-injecting engine.
struct FailingFactory {
    engine: Arc<FailingEngine>,
}

#[async_trait]
impl EngineFactory for FailingFactory {
    fn create(&self, _location: &str) -> Arc<dyn Engine> {
        self.engine.clone()
    }
}

/// Always hands out the same pre-composed engine.
struct FixedFactory {
    engine: Arc<dyn Engine>,
}

#[async_trait]
impl EngineFactory for FixedFactory {
    fn create(&self, _location: &str) -> Arc<dyn Engine> {
        self.engine.clone()
    }
}

fn failing_options(engine: Arc<FailingEngine>) -> Options {
    Options {
        engine: Arc::new(FailingFactory { engine }),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_put_get_del_roundtrip() {
    let db = memory_db("roundtrip");
    db.open().await.unwrap();

    db.put("a", "1", WriteOptions::default()).await.unwrap();
    db.put("b", "2", WriteOptions::default()).await.unwrap();

    let a = db.get("a", ReadOptions::default()).await.unwrap();
    assert_eq!(a, Datum::from("1"));

    db.del("a", WriteOptions::default()).await.unwrap();

    let missing = db.get("a", ReadOptions::default()).await.unwrap_err();
    assert!(missing.is_not_found());

    let b = db.get("b", ReadOptions::default()).await.unwrap();
    assert_eq!(b, Datum::from("2"));
}

#[tokio::test]
async fn test_operations_issued_before_open_replay_in_order() {
    let db = memory_db("deferred-replay");

    // Queue a put and an overwriting put before open() is even called.
    let first = {
        let db = db.clone();
        tokio::spawn(async move { db.put("k", "first", WriteOptions::default()).await })
    };
    tokio::task::yield_now().await;
    let second = {
        let db = db.clone();
        tokio::spawn(async move { db.put("k", "second", WriteOptions::default()).await })
    };
    tokio::task::yield_now().await;

    db.open().await.unwrap();

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    // FIFO replay means the later put wins.
    let value = db.get("k", ReadOptions::default()).await.unwrap();
    assert_eq!(value, Datum::from("second"));
}

#[tokio::test]
async fn test_concurrent_opens_construct_one_engine() {
    let factory = Arc::new(CountingFactory::new());
    let options = Options {
        engine: factory.clone(),
        ..Default::default()
    };
    let db = Database::new("single-engine", options).unwrap();

    let opens: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.open().await })
        })
        .collect();
    for open in opens {
        open.await.unwrap().unwrap();
    }

    assert_eq!(factory.creates.load(Ordering::SeqCst), 1);
    assert!(db.is_open());
}

#[tokio::test]
async fn test_close_while_opening_runs_after_replay() {
    let options = Options {
        engine: Arc::new(SlowFactory {
            inner: MemoryEngineFactory::new(),
            delay: Duration::from_millis(50),
        }),
        ..Default::default()
    };
    let db = Database::new("close-while-opening", options).unwrap();

    let opening = {
        let db = db.clone();
        tokio::spawn(async move { db.open().await })
    };
    tokio::task::yield_now().await;
    assert_eq!(db.status(), Status::Opening);

    // This put defers; it must be replayed before the close runs.
    let queued_put = {
        let db = db.clone();
        tokio::spawn(async move { db.put("k", "v", WriteOptions::default()).await })
    };
    tokio::task::yield_now().await;

    db.close().await.unwrap();

    opening.await.unwrap().unwrap();
    queued_put.await.unwrap().unwrap();
    assert_eq!(db.status(), Status::Closed);

    // The data written by the replayed put survived into the location.
    db.open().await.unwrap();
    let value = db.get("k", ReadOptions::default()).await.unwrap();
    assert_eq!(value, Datum::from("v"));
}

#[tokio::test]
async fn test_close_while_opening_with_failed_open_closes_and_fails_queue() {
    // An engine that takes long enough to fail that a close can be
    // requested while the facade is still opening.
    let memory = MemoryEngineFactory::new();
    let failing = FailingEngine::wrap(memory.create("close-vs-failed-open"));
    failing.fail_open_once(EngineError::Storage("lock held".to_string()));
    let engine: Arc<dyn Engine> = Arc::new(SlowEngine {
        inner: failing,
        delay: Duration::from_millis(50),
    });
    let options = Options {
        engine: Arc::new(FixedFactory { engine }),
        ..Default::default()
    };
    let db = Database::new("close-vs-failed-open", options).unwrap();

    let opening = {
        let db = db.clone();
        tokio::spawn(async move { db.open().await })
    };
    tokio::task::yield_now().await;
    assert_eq!(db.status(), Status::Opening);

    let queued_put = {
        let db = db.clone();
        tokio::spawn(async move { db.put("k", "v", WriteOptions::default()).await })
    };
    tokio::task::yield_now().await;

    // The close is granted even though the open ends up failing.
    db.close().await.unwrap();

    assert!(matches!(
        opening.await.unwrap(),
        Err(Error::Open { .. })
    ));
    // The queued put can never replay; its caller gets an error rather
    // than hanging.
    assert!(matches!(
        queued_put.await.unwrap(),
        Err(Error::Write { .. })
    ));
    assert_eq!(db.status(), Status::Closed);
}

#[tokio::test]
async fn test_open_failure_reverts_and_allows_retry() {
    let factory = MemoryEngineFactory::new();
    let engine = FailingEngine::wrap(factory.create("retry"));
    engine.fail_open_once(EngineError::Storage("lock held".to_string()));
    let db = Database::new("retry", failing_options(engine)).unwrap();

    // A put queued before the first open must survive the failure.
    let queued_put = {
        let db = db.clone();
        tokio::spawn(async move { db.put("k", "v", WriteOptions::default()).await })
    };
    tokio::task::yield_now().await;

    let err = db.open().await.unwrap_err();
    assert!(matches!(err, Error::Open { .. }));
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(db.status(), Status::New);

    // Retry succeeds and replays the queued put.
    db.open().await.unwrap();
    queued_put.await.unwrap().unwrap();
    let value = db.get("k", ReadOptions::default()).await.unwrap();
    assert_eq!(value, Datum::from("v"));
}

#[tokio::test]
async fn test_batch_builder_commits_atomically() {
    let db = memory_db("batch-builder");
    db.open().await.unwrap();
    db.put("doomed", "x", WriteOptions::default()).await.unwrap();

    let mut batch = db.batch().unwrap();
    batch.put("a", "1", WriteOptions::default()).unwrap();
    batch.put("b", "2", WriteOptions::default()).unwrap();
    batch.del("doomed", WriteOptions::default()).unwrap();
    assert_eq!(batch.len(), 3);
    batch.write().await.unwrap();

    assert_eq!(
        db.get("a", ReadOptions::default()).await.unwrap(),
        Datum::from("1")
    );
    assert_eq!(
        db.get("b", ReadOptions::default()).await.unwrap(),
        Datum::from("2")
    );
    assert!(db
        .get("doomed", ReadOptions::default())
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_batch_builder_requires_open() {
    let db = memory_db("batch-not-open");

    let result = db.batch();

    assert!(matches!(result, Err(Error::Write { .. })));
}

#[tokio::test]
async fn test_batch_builder_rejects_malformed_op_without_logging_it() {
    let db = memory_db("batch-reject");
    db.open().await.unwrap();

    let mut batch = db.batch().unwrap();
    // Invalid utf8 bytes cannot be a key under the default utf8 encoding.
    let result = batch.put(vec![0xFF, 0xFE], "v", WriteOptions::default());

    assert!(matches!(result, Err(Error::Encoding(_))));
    assert!(batch.is_empty());

    batch.put("ok", "v", WriteOptions::default()).unwrap();
    batch.write().await.unwrap();
    assert_eq!(
        db.get("ok", ReadOptions::default()).await.unwrap(),
        Datum::from("v")
    );
}

#[tokio::test]
async fn test_array_batch_rejects_whole_batch_on_malformed_entry() {
    let db = memory_db("array-batch-reject");
    db.open().await.unwrap();

    let entries = vec![
        BatchEntry::put("good", "1"),
        // Raw bytes are not representable under the json encoding.
        BatchEntry::Put {
            key: Datum::from("bad"),
            value: Datum::from(vec![1u8, 2, 3]),
            key_encoding: None,
            value_encoding: Some(Encoding::Json),
        },
    ];
    let err = db.apply_batch(entries, WriteOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::Encoding(_)));

    // Nothing committed, not even the well-formed entry.
    assert!(db
        .get("good", ReadOptions::default())
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_array_batch_applies_per_entry_encodings() {
    let db = memory_db("array-batch-encodings");
    db.open().await.unwrap();

    let entries = vec![
        BatchEntry::put("plain", "text"),
        BatchEntry::Put {
            key: Datum::from("structured"),
            value: Datum::from(serde_json::json!({"n": 1})),
            key_encoding: None,
            value_encoding: Some(Encoding::Json),
        },
    ];
    db.apply_batch(entries, WriteOptions::default()).await.unwrap();

    assert_eq!(
        db.get("plain", ReadOptions::default()).await.unwrap(),
        Datum::from("text")
    );
    let structured = db
        .get(
            "structured",
            ReadOptions {
                value_encoding: Some(Encoding::Json),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(structured, Datum::from(serde_json::json!({"n": 1})));
}

#[tokio::test]
async fn test_read_stream_yields_inclusive_range() {
    let db = memory_db("stream-range");
    db.open().await.unwrap();
    for (k, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
        db.put(k, v, WriteOptions::default()).await.unwrap();
    }

    let mut stream = db
        .read_stream(StreamOptions {
            start: Some("a".into()),
            end: Some("b".into()),
            ..Default::default()
        })
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.key, Datum::from("a"));
    assert_eq!(first.value, Datum::from("1"));
    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second.key, Datum::from("b"));
    assert!(stream.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_read_stream_reverse_with_limit() {
    let db = memory_db("stream-reverse");
    db.open().await.unwrap();
    for (k, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
        db.put(k, v, WriteOptions::default()).await.unwrap();
    }

    let mut stream = db
        .read_stream(StreamOptions {
            reverse: true,
            limit: Some(2),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(stream.next().await.unwrap().unwrap().key, Datum::from("c"));
    assert_eq!(stream.next().await.unwrap().unwrap().key, Datum::from("b"));
    assert!(stream.next().await.unwrap().is_none());
}

#[tokio::test]
async fn test_key_and_value_streams() {
    let db = memory_db("key-value-streams");
    db.open().await.unwrap();
    db.put("a", "1", WriteOptions::default()).await.unwrap();
    db.put("b", "2", WriteOptions::default()).await.unwrap();

    let mut keys = db.key_stream(StreamOptions::default()).unwrap();
    assert_eq!(keys.next().await.unwrap(), Some(Datum::from("a")));
    assert_eq!(keys.next().await.unwrap(), Some(Datum::from("b")));
    assert_eq!(keys.next().await.unwrap(), None);

    let mut values = db.value_stream(StreamOptions::default()).unwrap();
    assert_eq!(values.next().await.unwrap(), Some(Datum::from("1")));
    assert_eq!(values.next().await.unwrap(), Some(Datum::from("2")));
    assert_eq!(values.next().await.unwrap(), None);
}

#[tokio::test]
async fn test_streams_require_open() {
    let db = memory_db("stream-not-open");

    let result = db.read_stream(StreamOptions::default());

    assert!(matches!(result, Err(Error::Read { .. })));
}

#[tokio::test]
async fn test_events_trace_lifecycle_and_writes() {
    let db = memory_db("events");
    let mut events = db.subscribe();

    db.open().await.unwrap();
    db.put("k", "v", WriteOptions::default()).await.unwrap();
    db.del("k", WriteOptions::default()).await.unwrap();
    db.close().await.unwrap();

    assert!(matches!(events.recv().await.unwrap(), Event::Opening));
    assert!(matches!(events.recv().await.unwrap(), Event::Open));
    assert!(matches!(events.recv().await.unwrap(), Event::Ready));
    match events.recv().await.unwrap() {
        Event::Put { key, value } => {
            assert_eq!(key, Datum::from("k"));
            assert_eq!(value, Datum::from("v"));
        }
        other => panic!("expected put event, got {:?}", other),
    }
    match events.recv().await.unwrap() {
        Event::Del { key } => assert_eq!(key, Datum::from("k")),
        other => panic!("expected del event, got {:?}", other),
    }
    assert!(matches!(events.recv().await.unwrap(), Event::Closing));
    assert!(matches!(events.recv().await.unwrap(), Event::Closed));
}

#[tokio::test]
async fn test_batch_event_carries_op_log() {
    let db = memory_db("batch-event");
    db.open().await.unwrap();
    let mut events = db.subscribe();

    db.apply_batch(
        vec![BatchEntry::put("a", "1"), BatchEntry::del("b")],
        WriteOptions::default(),
    )
    .await
    .unwrap();

    match events.recv().await.unwrap() {
        Event::Batch(ops) => {
            assert_eq!(ops.len(), 2);
            assert_eq!(ops[0].key(), &Datum::from("a"));
            assert_eq!(ops[1].key(), &Datum::from("b"));
        }
        other => panic!("expected batch event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_write_stream_flushes_on_close() {
    let db = memory_db("write-stream");
    db.open().await.unwrap();

    let stream = db.write_stream(WriteStreamOptions::default());
    for i in 0..10 {
        stream
            .write(format!("key-{i}"), format!("value-{i}"))
            .await
            .unwrap();
    }
    stream.write_entry(BatchEntry::del("key-0")).await.unwrap();
    stream.close().await.unwrap();

    assert!(db
        .get("key-0", ReadOptions::default())
        .await
        .unwrap_err()
        .is_not_found());
    for i in 1..10 {
        let value = db
            .get(format!("key-{i}"), ReadOptions::default())
            .await
            .unwrap();
        assert_eq!(value, Datum::from(format!("value-{i}")));
    }
}

#[tokio::test]
async fn test_write_stream_surfaces_failure_on_close() {
    let factory = MemoryEngineFactory::new();
    let engine = FailingEngine::wrap(factory.create("failing-write-stream"));
    let db = Database::new("failing-write-stream", failing_options(engine.clone())).unwrap();
    db.open().await.unwrap();
    engine.fail_apply(EngineError::Storage("disk full".to_string()));

    let stream = db.write_stream(WriteStreamOptions::default());
    stream.write("k", "v").await.unwrap();

    let err = stream.close().await.unwrap_err();
    assert!(matches!(err, Error::Write { .. }));
}

#[tokio::test]
async fn test_read_error_text_maps_to_not_found() {
    let factory = MemoryEngineFactory::new();
    let engine = FailingEngine::wrap(factory.create("notfound-text"));
    let db = Database::new("notfound-text", failing_options(engine.clone())).unwrap();
    db.open().await.unwrap();

    // An engine that signals absence through error text only.
    engine.fail_get_once(EngineError::Storage("NotFound: no entry".to_string()));
    let err = db.get("k", ReadOptions::default()).await.unwrap_err();
    assert!(err.is_not_found());

    // Any other failure text stays a read error.
    engine.fail_get_once(EngineError::Storage("corrupted block".to_string()));
    let err = db.get("k", ReadOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::Read { .. }));
}

#[tokio::test]
async fn test_as_bytes_skips_value_decoding() {
    let db = memory_db("as-bytes");
    db.open().await.unwrap();
    db.put("k", "v", WriteOptions::default()).await.unwrap();

    let raw = db
        .get(
            "k",
            ReadOptions {
                as_bytes: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(raw, Datum::Bytes(Bytes::from("v")));
}

#[tokio::test]
async fn test_approximate_size_covers_half_open_range() {
    let db = memory_db("approximate-size");
    db.open().await.unwrap();
    for (k, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
        db.put(k, v, WriteOptions::default()).await.unwrap();
    }

    // [a, c) covers the a and b entries, two bytes each.
    let size = db
        .approximate_size("a", "c", ReadOptions::default())
        .await
        .unwrap();
    assert_eq!(size, 4);
}

#[tokio::test]
async fn test_json_value_encoding_end_to_end() {
    let options = Options {
        value_encoding: Encoding::Json,
        ..Default::default()
    };
    let db = Database::new("json-values", options).unwrap();
    db.open().await.unwrap();

    let value = serde_json::json!({"name": "alice", "tags": ["x", "y"]});
    db.put("user", value.clone(), WriteOptions::default())
        .await
        .unwrap();

    let read = db.get("user", ReadOptions::default()).await.unwrap();
    assert_eq!(read, Datum::from(value));
}

#[tokio::test]
async fn test_destroy_drops_location_data() {
    let factory: Arc<dyn EngineFactory> = Arc::new(MemoryEngineFactory::new());
    let options = Options {
        engine: factory.clone(),
        ..Default::default()
    };
    let db = Database::new("destroyed", options.clone()).unwrap();
    db.open().await.unwrap();
    db.put("k", "v", WriteOptions::default()).await.unwrap();
    db.close().await.unwrap();

    destroy(factory.as_ref(), "destroyed").await.unwrap();

    let db = Database::new("destroyed", options).unwrap();
    db.open().await.unwrap();
    let err = db.get("k", ReadOptions::default()).await.unwrap_err();
    assert!(err.is_not_found());
}
