//! Cart mutation journal model and persistence wrappers.

use serde::{Deserialize, Serialize};

use crate::{
    line::CartLine,
    types::{LineId, OpSeq, Quantity},
};

/// Version number for serialized [`StoredOpEnvelope`] payloads.
pub const OP_FORMAT_VERSION: u16 = 1;

/// One accepted cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Append a new active line with quantity 1.
    Add {
        /// Line as inserted.
        line: CartLine,
    },
    /// Bump an existing line by one unit.
    Increment {
        /// Line id.
        id: LineId,
        /// True when the line was pulled back from the saved list first.
        from_saved: bool,
    },
    /// Replace an active line's quantity.
    SetQuantity {
        /// Line id.
        id: LineId,
        /// New quantity.
        quantity: Quantity,
    },
    /// Move an active line to the saved list.
    Save {
        /// Line id.
        id: LineId,
    },
    /// Move a saved line back to the end of the active list.
    Restore {
        /// Line id.
        id: LineId,
    },
    /// Delete a line from whichever list held it.
    Remove {
        /// Line as it was just before removal.
        line: CartLine,
    },
}

impl Op {
    /// Line touched by this op.
    pub fn line_id(&self) -> LineId {
        match self {
            Op::Add { line } | Op::Remove { line } => line.id,
            Op::Increment { id, .. }
            | Op::SetQuantity { id, .. }
            | Op::Save { id }
            | Op::Restore { id } => *id,
        }
    }

    /// Stable numeric tag stored alongside the journal payload.
    pub fn kind(&self) -> i64 {
        match self {
            Op::Add { .. } => 1,
            Op::Increment { .. } => 2,
            Op::SetQuantity { .. } => 3,
            Op::Save { .. } => 4,
            Op::Restore { .. } => 5,
            Op::Remove { .. } => 6,
        }
    }
}

/// Journal row metadata plus operation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOp {
    /// Monotonic operation sequence.
    pub seq: OpSeq,
    /// Operation timestamp in milliseconds.
    pub ts_ms: u64,
    /// Operation body.
    pub op: Op,
}

/// Versioned wrapper for stable on-disk payload decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOpEnvelope {
    /// Payload format version.
    pub format_version: u16,
    /// Wrapped operation.
    pub stored: StoredOp,
}

impl StoredOpEnvelope {
    /// Constructs an envelope using [`OP_FORMAT_VERSION`].
    pub fn new(stored: StoredOp) -> Self {
        Self {
            format_version: OP_FORMAT_VERSION,
            stored,
        }
    }
}
