//! Storage engine adapter layer for airlock.
//!
//! This crate defines the contract a storage engine must satisfy to sit
//! behind the airlock facade, plus an in-memory reference engine used for
//! testing and embedding.
//!
//! # Key Concepts
//!
//! - **Engine**: the byte-oriented primitives the facade consumes
//!   (open, close, get, put, del, batch, iterate, approximate size).
//! - **EngineFactory**: constructs an engine for a location. The facade
//!   instantiates the engine lazily, when `open()` is first called.
//! - **MemoryEngine**: a `BTreeMap`-backed engine whose factory keeps a
//!   per-location registry, so closing and reopening a location sees the
//!   same data.
//!
//! The facade never depends on a concrete engine type; everything goes
//! through `Arc<dyn Engine>`.

pub mod adapter;
pub mod memory;

#[cfg(feature = "test-utils")]
pub mod failing;

pub use adapter::{
    Engine, EngineBatch, EngineError, EngineFactory, EngineIterator, EngineOp, EngineResult,
    IterOptions, OpenOptions,
};
pub use memory::{MemoryEngine, MemoryEngineFactory};

#[cfg(feature = "test-utils")]
pub use failing::FailingEngine;
