//! Failure-injecting engine wrapper for tests.
//!
//! Gated behind the `test-utils` feature.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::adapter::{
    Engine, EngineBatch, EngineError, EngineIterator, EngineOp, EngineResult, IterOptions,
    OpenOptions,
};

/// Injected failure that fires either once or on every call.
#[derive(Clone)]
enum Failure {
    /// Error is returned once, then automatically cleared.
    Once(EngineError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(EngineError),
}

type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Once`], the slot is atomically swapped to `None` so the
/// error fires exactly once. For [`Failure::Persistent`], the slot is left
/// unchanged.
fn check_failure(slot: &FailSlot) -> EngineResult<()> {
    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(_)) => {
            // Swap to None; if another thread raced us, one of them gets the
            // error and the others pass through — reasonable for tests.
            let prev = slot.swap(Arc::new(None));
            match prev.as_ref() {
                Some(Failure::Once(err)) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }
}

fn slot() -> FailSlot {
    arc_swap::ArcSwap::from_pointee(None)
}

/// An engine wrapper that delegates to an inner [`Engine`] but can inject
/// failures into `open`, `close`, `get`, `put`, `del`, and `apply` on
/// demand.
///
/// Failures can be *persistent* (returned on every call until cleared) or
/// *once* (returned on the next call, then automatically cleared).
///
/// # Example
///
/// ```ignore
/// let inner = factory.create("db");
/// let engine = FailingEngine::wrap(inner);
/// engine.fail_open_once(EngineError::Storage("lock held".into()));
/// // only the next open call returns Err(...), then auto-clears
/// ```
pub struct FailingEngine {
    inner: Arc<dyn Engine>,
    fail_open: FailSlot,
    fail_close: FailSlot,
    fail_get: FailSlot,
    fail_put: FailSlot,
    fail_del: FailSlot,
    fail_apply: FailSlot,
}

impl FailingEngine {
    /// Wraps an existing engine, with all failure injections initially `None`.
    pub fn wrap(inner: Arc<dyn Engine>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_open: slot(),
            fail_close: slot(),
            fail_get: slot(),
            fail_put: slot(),
            fail_del: slot(),
            fail_apply: slot(),
        })
    }

    /// Makes `open` return the given error on every subsequent call.
    pub fn fail_open(&self, err: EngineError) {
        self.fail_open.store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `open` return the given error on the next call only.
    pub fn fail_open_once(&self, err: EngineError) {
        self.fail_open.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `close` return the given error on the next call only.
    pub fn fail_close_once(&self, err: EngineError) {
        self.fail_close.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `get` return the given error on every subsequent call.
    pub fn fail_get(&self, err: EngineError) {
        self.fail_get.store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `get` return the given error on the next call only.
    pub fn fail_get_once(&self, err: EngineError) {
        self.fail_get.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `put` return the given error on every subsequent call.
    pub fn fail_put(&self, err: EngineError) {
        self.fail_put.store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `put` return the given error on the next call only.
    pub fn fail_put_once(&self, err: EngineError) {
        self.fail_put.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `del` return the given error on the next call only.
    pub fn fail_del_once(&self, err: EngineError) {
        self.fail_del.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `apply` return the given error on every subsequent call.
    pub fn fail_apply(&self, err: EngineError) {
        self.fail_apply
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `apply` return the given error on the next call only.
    pub fn fail_apply_once(&self, err: EngineError) {
        self.fail_apply.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Clears every pending failure injection.
    pub fn clear_failures(&self) {
        for s in [
            &self.fail_open,
            &self.fail_close,
            &self.fail_get,
            &self.fail_put,
            &self.fail_del,
            &self.fail_apply,
        ] {
            s.store(Arc::new(None));
        }
    }
}

#[async_trait]
impl Engine for FailingEngine {
    async fn open(&self, options: &OpenOptions) -> EngineResult<()> {
        check_failure(&self.fail_open)?;
        self.inner.open(options).await
    }

    async fn close(&self) -> EngineResult<()> {
        check_failure(&self.fail_close)?;
        self.inner.close().await
    }

    async fn get(&self, key: Bytes) -> EngineResult<Option<Bytes>> {
        check_failure(&self.fail_get)?;
        self.inner.get(key).await
    }

    async fn put(&self, key: Bytes, value: Bytes) -> EngineResult<()> {
        check_failure(&self.fail_put)?;
        self.inner.put(key, value).await
    }

    async fn del(&self, key: Bytes) -> EngineResult<()> {
        check_failure(&self.fail_del)?;
        self.inner.del(key).await
    }

    async fn apply(&self, ops: Vec<EngineOp>) -> EngineResult<()> {
        check_failure(&self.fail_apply)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEngineFactory;
    use crate::EngineFactory;

    #[tokio::test]
    async fn should_fail_once_then_recover() {
        // given
        let factory = MemoryEngineFactory::new();
        let engine = FailingEngine::wrap(factory.create("db"));
        engine.fail_open_once(EngineError::Storage("lock held".to_string()));

        // when
        let first = engine.open(&OpenOptions::default()).await;
        let second = engine.open(&OpenOptions::default()).await;

        // then
        assert!(first.is_err());
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn should_fail_persistently_until_cleared() {
        // given
        let factory = MemoryEngineFactory::new();
        let engine = FailingEngine::wrap(factory.create("db"));
        engine.open(&OpenOptions::default()).await.unwrap();
        engine.fail_put(EngineError::Storage("disk full".to_string()));

        // when
        let first = engine.put(Bytes::from("k"), Bytes::from("v")).await;
        let second = engine.put(Bytes::from("k"), Bytes::from("v")).await;
        engine.clear_failures();
        let third = engine.put(Bytes::from("k"), Bytes::from("v")).await;

        // then
        assert!(first.is_err());
        assert!(second.is_err());
        assert!(third.is_ok());
    }
}
