//! Runtime event stream payloads.

use crate::types::{LineId, OpSeq, Quantity};

/// Events emitted from the single-writer cart loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A new active line was created.
    LineAdded {
        /// Line id.
        id: LineId,
    },
    /// An active line's quantity changed.
    QuantityChanged {
        /// Line id.
        id: LineId,
        /// Quantity after the change.
        quantity: Quantity,
    },
    /// A line moved to the saved list.
    Saved {
        /// Line id.
        id: LineId,
    },
    /// A line moved back to the active list.
    Restored {
        /// Line id.
        id: LineId,
    },
    /// A line was deleted.
    Removed {
        /// Line id.
        id: LineId,
    },
    /// Persistence has reached at least this op sequence.
    DurableUpTo {
        /// Highest sequence known durable.
        op_seq: OpSeq,
    },
}
