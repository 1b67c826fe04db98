//! In-memory reference engine.
//!
//! `MemoryEngine` stores entries in a `BTreeMap` under a `std::sync::RwLock`.
//! Its factory keeps a registry keyed by location, so closing an engine and
//! reopening the same location sees the same data, and `create_if_missing` /
//! `error_if_exists` / `destroy` behave like they would against a real
//! engine.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::adapter::{
    Engine, EngineBatch, EngineError, EngineFactory, EngineIterator, EngineOp, EngineResult,
    IterOptions, OpenOptions,
};

type Shared = Arc<RwLock<BTreeMap<Bytes, Bytes>>>;
type Registry = Arc<Mutex<HashMap<String, Shared>>>;

/// Factory for [`MemoryEngine`] instances.
///
/// All engines created by one factory share its location registry. Two
/// engines created for the same location operate on the same data.
#[derive(Default)]
pub struct MemoryEngineFactory {
    registry: Registry,
}

impl MemoryEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the registry holds data for the location.
    pub fn exists(&self, location: &str) -> bool {
        self.registry
            .lock()
            .map(|reg| reg.contains_key(location))
            .unwrap_or(false)
    }
}

#[async_trait]
impl EngineFactory for MemoryEngineFactory {
    fn create(&self, location: &str) -> Arc<dyn Engine> {
        Arc::new(MemoryEngine {
            location: location.to_string(),
            registry: Arc::clone(&self.registry),
            data: RwLock::new(None),
        })
    }

    async fn destroy(&self, location: &str) -> EngineResult<()> {
        let mut registry = self
            .registry
            .lock()
            .map_err(|e| EngineError::Internal(format!("failed to acquire registry lock: {}", e)))?;
        registry.remove(location);
        Ok(())
    }

    async fn repair(&self, _location: &str) -> EngineResult<()> {
        // Nothing can go stale in memory.
        Ok(())
    }
}

/// In-memory implementation of the [`Engine`] contract.
pub struct MemoryEngine {
    location: String,
    registry: Registry,
    /// Set while open; cleared on close. The registry keeps the data alive.
    data: RwLock<Option<Shared>>,
}

impl MemoryEngine {
    fn shared(&self) -> EngineResult<Shared> {
        self.data
            .read()
            .map_err(|e| EngineError::Internal(format!("failed to acquire engine lock: {}", e)))?
            .clone()
            .ok_or_else(|| EngineError::Internal("engine is not open".to_string()))
    }
}

#[async_trait]
impl Engine for MemoryEngine {
    #[tracing::instrument(level = "trace", skip_all, fields(location = %self.location))]
    async fn open(&self, options: &OpenOptions) -> EngineResult<()> {
        let mut registry = self
            .registry
            .lock()
            .map_err(|e| EngineError::Internal(format!("failed to acquire registry lock: {}", e)))?;

        let existing = registry.get(&self.location).cloned();
        let shared = match existing {
            Some(_) if options.error_if_exists => {
                return Err(EngineError::Storage(format!(
                    "location already exists: {}",
                    self.location
                )));
            }
            Some(shared) => shared,
            None if !options.create_if_missing => {
                return Err(EngineError::Storage(format!(
                    "location does not exist: {}",
                    self.location
                )));
            }
            None => {
                let shared: Shared = Arc::new(RwLock::new(BTreeMap::new()));
                registry.insert(self.location.clone(), Arc::clone(&shared));
                shared
            }
        };

        let mut data = self
            .data
            .write()
            .map_err(|e| EngineError::Internal(format!("failed to acquire engine lock: {}", e)))?;
        *data = Some(shared);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all, fields(location = %self.location))]
    async fn close(&self) -> EngineResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| EngineError::Internal(format!("failed to acquire engine lock: {}", e)))?;
        *data = None;
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> EngineResult<Option<Bytes>> {
        let shared = self.shared()?;
        let map = shared
            .read()
            .map_err(|e| EngineError::Internal(format!("failed to acquire read lock: {}", e)))?;
        Ok(map.get(&key).cloned())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn put(&self, key: Bytes, value: Bytes) -> EngineResult<()> {
        let shared = self.shared()?;
        let mut map = shared
            .write()
            .map_err(|e| EngineError::Internal(format!("failed to acquire write lock: {}", e)))?;
        map.insert(key, value);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn del(&self, key: Bytes) -> EngineResult<()> {
        let shared = self.shared()?;
        let mut map = shared
            .write()
            .map_err(|e| EngineError::Internal(format!("failed to acquire write lock: {}", e)))?;
        map.remove(&key);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn apply(&self, ops: Vec<EngineOp>) -> EngineResult<()> {
        let shared = self.shared()?;
        // A single write-lock acquisition makes the batch atomic.
        let mut map = shared
            .write()
            .map_err(|e| EngineError::Internal(format!("failed to acquire write lock: {}", e)))?;
        for op in ops {
            match op {
                EngineOp::Put { key, value } => {
                    map.insert(key, value);
                }
                EngineOp::Del { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn batch(&self) -> EngineResult<Box<dyn EngineBatch>> {
        let shared = self.shared()?;
        Ok(Box::new(MemoryBatch {
            shared,
            ops: Vec::new(),
        }))
    }

    fn iterator(&self, options: IterOptions) -> EngineResult<Box<dyn EngineIterator>> {
        let shared = self.shared()?;
        let map = shared
            .read()
            .map_err(|e| EngineError::Internal(format!("failed to acquire read lock: {}", e)))?;

        let start = match &options.start {
            Some(key) => Bound::Included(key.clone()),
            None => Bound::Unbounded,
        };
        let end = match &options.end {
            Some(key) => Bound::Included(key.clone()),
            None => Bound::Unbounded,
        };

        // Snapshot the selected range; the cursor owns its data and is
        // released when the iterator is dropped.
        let mut entries: Vec<(Bytes, Bytes)> = map
            .range((start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if options.reverse {
            entries.reverse();
        }
        if let Some(limit) = options.limit {
            entries.truncate(limit);
        }

        Ok(Box::new(MemoryIterator { entries, index: 0 }))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn approximate_size(&self, start: Bytes, end: Bytes) -> EngineResult<u64> {
        let shared = self.shared()?;
        let map = shared
            .read()
            .map_err(|e| EngineError::Internal(format!("failed to acquire read lock: {}", e)))?;
        let size = map
            .range((Bound::Included(start), Bound::Excluded(end)))
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum();
        Ok(size)
    }
}

struct MemoryIterator {
    entries: Vec<(Bytes, Bytes)>,
    index: usize,
}

#[async_trait]
impl EngineIterator for MemoryIterator {
    async fn next(&mut self) -> EngineResult<Option<(Bytes, Bytes)>> {
        if self.index >= self.entries.len() {
            Ok(None)
        } else {
            let entry = self.entries[self.index].clone();
            self.index += 1;
            Ok(Some(entry))
        }
    }
}

struct MemoryBatch {
    shared: Shared,
    ops: Vec<EngineOp>,
}

#[async_trait]
impl EngineBatch for MemoryBatch {
    fn put(&mut self, key: Bytes, value: Bytes) -> EngineResult<()> {
        self.ops.push(EngineOp::Put { key, value });
        Ok(())
    }

    fn del(&mut self, key: Bytes) -> EngineResult<()> {
        self.ops.push(EngineOp::Del { key });
        Ok(())
    }

    fn clear(&mut self) {
        self.ops.clear();
    }

    async fn write(self: Box<Self>) -> EngineResult<()> {
        let mut map = self
            .shared
            .write()
            .map_err(|e| EngineError::Internal(format!("failed to acquire write lock: {}", e)))?;
        for op in self.ops {
            match op {
                EngineOp::Put { key, value } => {
                    map.insert(key, value);
                }
                EngineOp::Del { key } => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }
}
