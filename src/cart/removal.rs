//! Confirm-before-remove protocol.
//!
//! A removal is requested first and performed only when the returned token is
//! confirmed, so the dialog shown in between never holds cart state itself.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::types::LineId;

/// Single-use handle for a pending removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemovalToken {
    nonce: u64,
    line: LineId,
}

impl RemovalToken {
    /// Line this token would remove.
    pub fn line_id(&self) -> LineId {
        self.line
    }

    /// Opaque token number.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

#[derive(Debug, Default)]
pub(crate) struct PendingRemovals {
    pending: HashMap<u64, LineId>,
    next_nonce: u64,
}

impl PendingRemovals {
    pub(crate) fn issue(&mut self, line: LineId) -> RemovalToken {
        self.next_nonce += 1;
        let nonce = self.next_nonce;
        self.pending.insert(nonce, line);
        RemovalToken { nonce, line }
    }

    /// Consumes `token`, returning its line when it was still outstanding.
    pub(crate) fn take(&mut self, token: RemovalToken) -> Option<LineId> {
        if self.pending.get(&token.nonce) != Some(&token.line) {
            return None;
        }
        self.pending.remove(&token.nonce)
    }

    /// Drops every token issued for `line`.
    pub(crate) fn forget(&mut self, line: LineId) {
        self.pending.retain(|_, pending| *pending != line);
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
