//! Airlock - a uniform facade over pluggable ordered key-value engines.
//!
//! Airlock wraps any engine implementing the [`airlock_engine`] adapter
//! traits behind one API: typed errors, named encodings between application
//! data and engine bytes, streaming reads and writes, and lifecycle events.
//! Operations issued before the database finishes opening are queued and
//! replayed in order, so callers never have to sequence their own startup.
//!
//! # Architecture
//!
//! A [`Database`] is a cheap-to-clone handle over shared state. The engine
//! behind it is constructed lazily through the
//! [`EngineFactory`](airlock_engine::EngineFactory) carried in [`Options`],
//! so a handle exists before any engine resources do. A small state machine
//! (new → opening → open → closing → closed, with reopen) serializes the
//! transitions; the codec layer translates [`Datum`] values to and from
//! engine bytes per the resolved [`Encoding`].
//!
//! # Key Concepts
//!
//! - **Database**: the main entry point; all reads, writes, batches and
//!   streams go through it.
//! - **Encoding**: a named, order-aware codec (`Binary`, `Utf8`, `Json`)
//!   resolved per call from per-call and facade-level options.
//! - **Batch**: a fluent builder for atomic multi-operation writes;
//!   [`Database::apply_batch`] is the array form of the same thing.
//! - **Streams**: pull-based read streams and a buffered, batching write
//!   stream.
//! - **Events**: broadcast notifications for lifecycle transitions and
//!   committed writes.
//!
//! # Example
//!
//! ```ignore
//! use airlock::{Database, Options, ReadOptions, StreamOptions, WriteOptions};
//!
//! let db = Database::new("users", Options::default())?;
//! db.open().await?;
//!
//! // Write data
//! db.put("user:123", "alice", WriteOptions::default()).await?;
//! db.put("user:456", "bob", WriteOptions::default()).await?;
//!
//! // Read data
//! let value = db.get("user:123", ReadOptions::default()).await?;
//! assert_eq!(value.as_text(), Some("alice"));
//!
//! // Scan a range
//! let mut stream = db.read_stream(StreamOptions {
//!     start: Some("user:".into()),
//!     end: Some("user:\u{10FFFF}".into()),
//!     ..Default::default()
//! })?;
//! while let Some(entry) = stream.next().await? {
//!     println!("{}: {}", entry.key, entry.value);
//! }
//!
//! // Delete data
//! db.del("user:123", WriteOptions::default()).await?;
//! db.close().await?;
//! ```

mod batch;
mod config;
mod db;
mod deferred;
mod encoding;
mod error;
mod events;
mod model;
mod stream;

pub use batch::Batch;
pub use config::{Options, ReadOptions, StreamOptions, WriteOptions, WriteStreamOptions};
pub use db::{destroy, repair, Database, Status};
pub use encoding::{Datum, Encoding};
pub use error::{Error, Result};
pub use events::{Event, EventError, EventSubscriber};
pub use model::{BatchEntry, Entry};
pub use stream::{KeyStream, ReadStream, ValueStream, WriteStream};
