//! Operations queued while the handle is not yet open.
//!
//! Each variant captures the operands and the resolved encodings at call
//! time, plus a one-shot completion sender the dispatcher fulfils when the
//! operation eventually runs. Replay happens in submission order during the
//! open transition.

use tokio::sync::oneshot;

use crate::config::ResolvedEncodings;
use crate::encoding::Datum;
use crate::error::Result;
use crate::model::BatchEntry;

pub(crate) enum DeferredOp {
    Get {
        key: Datum,
        enc: ResolvedEncodings,
        tx: oneshot::Sender<Result<Datum>>,
    },
    Put {
        key: Datum,
        value: Datum,
        enc: ResolvedEncodings,
        tx: oneshot::Sender<Result<()>>,
    },
    Del {
        key: Datum,
        enc: ResolvedEncodings,
        tx: oneshot::Sender<Result<()>>,
    },
    Batch {
        entries: Vec<BatchEntry>,
        enc: ResolvedEncodings,
        tx: oneshot::Sender<Result<()>>,
    },
    ApproximateSize {
        start: Datum,
        end: Datum,
        enc: ResolvedEncodings,
        tx: oneshot::Sender<Result<u64>>,
    },
}

impl std::fmt::Debug for DeferredOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeferredOp::Get { key, .. } => f.debug_struct("Get").field("key", key).finish(),
            DeferredOp::Put { key, .. } => f.debug_struct("Put").field("key", key).finish(),
            DeferredOp::Del { key, .. } => f.debug_struct("Del").field("key", key).finish(),
            DeferredOp::Batch { entries, .. } => {
                f.debug_struct("Batch").field("len", &entries.len()).finish()
            }
            DeferredOp::ApproximateSize { start, end, .. } => f
                .debug_struct("ApproximateSize")
                .field("start", start)
                .field("end", end)
                .finish(),
        }
    }
}
