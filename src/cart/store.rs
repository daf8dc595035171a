use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    line::{CartLine, LineDraft},
    money::Rupees,
    op::{Op, StoredOp},
    types::{LineId, OpSeq, Quantity},
};

use super::{
    indices::{Slot, SlotIndex},
    removal::{PendingRemovals, RemovalToken},
};

/// Flat delivery fee charged whenever the active cart is non-empty.
pub const SHIPPING_FEE: Rupees = Rupees(49);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("line {0} is not in the active cart")]
    NotActive(LineId),
    #[error("line {0} is not saved for later")]
    NotSaved(LineId),
    #[error("line {0} is not in the cart")]
    MissingLine(LineId),
    #[error("quantity {0} is below the minimum of 1")]
    QuantityBelowMinimum(i64),
    #[error("quantity {0} is out of range")]
    QuantityOutOfRange(i64),
    #[error("removal token {0} is unknown or already used")]
    UnknownToken(u64),
    #[error("line {0} already exists")]
    AlreadyExists(LineId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    pub shipping_fee: Rupees,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            shipping_fee: SHIPPING_FEE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Rupees,
    pub shipping: Rupees,
    pub total: Rupees,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshotV1 {
    pub next_op_seq: OpSeq,
    pub active: Vec<CartLine>,
    pub saved: Vec<CartLine>,
}

/// Owner of the active and saved-for-later collections.
///
/// Rejected mutations return a [`CartError`] and leave the store untouched.
#[derive(Debug)]
pub struct CartStore {
    active: Vec<CartLine>,
    saved: Vec<CartLine>,
    slots: SlotIndex,
    removals: PendingRemovals,
    pending_ops: Vec<StoredOp>,
    next_op_seq: OpSeq,
    config: CartConfig,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    pub fn new() -> Self {
        Self::with_config(CartConfig::default())
    }

    pub fn with_config(config: CartConfig) -> Self {
        Self {
            active: Vec::new(),
            saved: Vec::new(),
            slots: SlotIndex::new(),
            removals: PendingRemovals::default(),
            pending_ops: Vec::new(),
            next_op_seq: 1,
            config,
        }
    }

    pub fn from_snapshot(snapshot: CartSnapshotV1, config: CartConfig) -> Result<Self, CartError> {
        let mut store = Self::with_config(config);
        store.next_op_seq = snapshot.next_op_seq.max(1);

        for mut line in snapshot.active {
            if line.quantity == 0 {
                return Err(CartError::QuantityBelowMinimum(0));
            }
            if store.slots.insert(line.id, Slot::Active).is_some() {
                return Err(CartError::AlreadyExists(line.id));
            }
            line.saved = false;
            store.active.push(line);
        }

        for mut line in snapshot.saved {
            if line.quantity == 0 {
                return Err(CartError::QuantityBelowMinimum(0));
            }
            if store.slots.insert(line.id, Slot::Saved).is_some() {
                return Err(CartError::AlreadyExists(line.id));
            }
            line.saved = true;
            store.saved.push(line);
        }

        Ok(store)
    }

    pub fn export_snapshot(&self) -> CartSnapshotV1 {
        CartSnapshotV1 {
            next_op_seq: self.next_op_seq,
            active: self.active.clone(),
            saved: self.saved.clone(),
        }
    }

    /// Adds one unit of `draft`.
    ///
    /// An active line with the same id is incremented; a saved one is moved
    /// back to the end of the active list and incremented; otherwise a new
    /// line with quantity 1 is appended. Never rejected.
    pub fn add_or_increment(&mut self, draft: LineDraft) -> (CartLine, StoredOp) {
        let id = draft.id;
        let (line, op) = if let Some(line) = self.active.iter_mut().find(|l| l.id == id) {
            line.quantity = line.quantity.saturating_add(1);
            (
                line.clone(),
                Op::Increment {
                    id,
                    from_saved: false,
                },
            )
        } else if let Some(mut line) = Self::take_from(&mut self.saved, id) {
            line.saved = false;
            line.quantity = line.quantity.saturating_add(1);
            self.slots.insert(id, Slot::Active);
            self.active.push(line.clone());
            (
                line,
                Op::Increment {
                    id,
                    from_saved: true,
                },
            )
        } else {
            let line = draft.into_line();
            self.slots.insert(id, Slot::Active);
            self.active.push(line.clone());
            (line.clone(), Op::Add { line })
        };

        let seq = self.next_op_seq;
        let stored = self.finish(op, seq);
        self.pending_ops.push(stored.clone());
        (line, stored)
    }

    pub fn set_quantity(&mut self, id: LineId, new_quantity: i64) -> Result<StoredOp, CartError> {
        let res = self.set_quantity_inner(id, new_quantity);
        log_rejection("set_quantity", id, res)
    }

    fn set_quantity_inner(&mut self, id: LineId, new_quantity: i64) -> Result<StoredOp, CartError> {
        if new_quantity < 1 {
            return Err(CartError::QuantityBelowMinimum(new_quantity));
        }
        let quantity =
            Quantity::try_from(new_quantity).map_err(|_| CartError::QuantityOutOfRange(new_quantity))?;
        self.commit(Op::SetQuantity { id, quantity })
    }

    pub fn save(&mut self, id: LineId) -> Result<StoredOp, CartError> {
        let res = self.commit(Op::Save { id });
        log_rejection("save", id, res)
    }

    pub fn restore(&mut self, id: LineId) -> Result<StoredOp, CartError> {
        let res = self.commit(Op::Restore { id });
        log_rejection("restore", id, res)
    }

    /// Removes a line from whichever collection holds it.
    ///
    /// This is the unconditional mutation behind [`CartStore::confirm_removal`].
    pub fn remove(&mut self, id: LineId) -> Result<StoredOp, CartError> {
        let res = match self.get(id).cloned() {
            Some(line) => self.commit(Op::Remove { line }),
            None => Err(CartError::MissingLine(id)),
        };
        log_rejection("remove", id, res)
    }

    pub fn request_removal(&mut self, id: LineId) -> Result<RemovalToken, CartError> {
        if !self.slots.contains_key(&id) {
            return log_rejection("request_removal", id, Err(CartError::MissingLine(id)));
        }
        Ok(self.removals.issue(id))
    }

    pub fn confirm_removal(&mut self, token: RemovalToken) -> Result<StoredOp, CartError> {
        let Some(id) = self.removals.take(token) else {
            return log_rejection(
                "confirm_removal",
                token.line_id(),
                Err(CartError::UnknownToken(token.nonce())),
            );
        };
        self.remove(id)
    }

    pub fn cancel_removal(&mut self, token: RemovalToken) -> bool {
        self.removals.take(token).is_some()
    }

    pub fn pending_removals(&self) -> usize {
        self.removals.len()
    }

    pub fn compute_totals(&self) -> Option<CartTotals> {
        if self.active.is_empty() {
            return None;
        }
        let subtotal: Rupees = self.active.iter().map(CartLine::line_total).sum();
        let shipping = self.config.shipping_fee;
        Some(CartTotals {
            subtotal,
            shipping,
            total: subtotal + shipping,
        })
    }

    pub fn apply_replayed_op(&mut self, stored: StoredOp) -> Result<(), CartError> {
        self.apply_with_seq(stored.op, stored.seq)?;
        Ok(())
    }

    pub fn get(&self, id: LineId) -> Option<&CartLine> {
        match self.slots.get(&id)? {
            Slot::Active => self.active.iter().find(|l| l.id == id),
            Slot::Saved => self.saved.iter().find(|l| l.id == id),
        }
    }

    pub fn slot(&self, id: LineId) -> Option<Slot> {
        self.slots.get(&id).copied()
    }

    pub fn active(&self) -> &[CartLine] {
        &self.active
    }

    pub fn saved(&self) -> &[CartLine] {
        &self.saved
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn item_count(&self) -> u64 {
        self.active.iter().map(|l| u64::from(l.quantity)).sum()
    }

    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    pub fn drain_pending_ops(&mut self) -> Vec<StoredOp> {
        std::mem::take(&mut self.pending_ops)
    }

    pub fn latest_op_seq(&self) -> OpSeq {
        self.next_op_seq.saturating_sub(1)
    }

    fn commit(&mut self, op: Op) -> Result<StoredOp, CartError> {
        let seq = self.next_op_seq;
        let stored = self.apply_with_seq(op, seq)?;
        self.pending_ops.push(stored.clone());
        Ok(stored)
    }

    fn apply_with_seq(&mut self, op: Op, seq: OpSeq) -> Result<StoredOp, CartError> {
        match &op {
            Op::Add { line } => {
                if self.slots.contains_key(&line.id) {
                    return Err(CartError::AlreadyExists(line.id));
                }
                let mut line = line.clone();
                line.saved = false;
                line.quantity = line.quantity.max(1);
                self.slots.insert(line.id, Slot::Active);
                self.active.push(line);
            }
            Op::Increment { id, from_saved } => {
                if *from_saved {
                    let mut line = Self::take_from(&mut self.saved, *id).ok_or(CartError::NotSaved(*id))?;
                    line.saved = false;
                    line.quantity = line.quantity.saturating_add(1).max(1);
                    self.slots.insert(*id, Slot::Active);
                    self.active.push(line);
                } else {
                    let line = self.active_line_mut(*id)?;
                    line.quantity = line.quantity.saturating_add(1);
                }
            }
            Op::SetQuantity { id, quantity } => {
                if *quantity == 0 {
                    return Err(CartError::QuantityBelowMinimum(0));
                }
                self.active_line_mut(*id)?.quantity = *quantity;
            }
            Op::Save { id } => {
                if self.slots.get(id) != Some(&Slot::Active) {
                    return Err(CartError::NotActive(*id));
                }
                let mut line = Self::take_from(&mut self.active, *id).ok_or(CartError::NotActive(*id))?;
                line.saved = true;
                self.slots.insert(*id, Slot::Saved);
                self.saved.push(line);
            }
            Op::Restore { id } => {
                if self.slots.get(id) != Some(&Slot::Saved) {
                    return Err(CartError::NotSaved(*id));
                }
                let mut line = Self::take_from(&mut self.saved, *id).ok_or(CartError::NotSaved(*id))?;
                line.saved = false;
                self.slots.insert(*id, Slot::Active);
                self.active.push(line);
            }
            Op::Remove { line } => {
                let id = line.id;
                let removed = match self.slots.get(&id) {
                    Some(Slot::Active) => Self::take_from(&mut self.active, id),
                    Some(Slot::Saved) => Self::take_from(&mut self.saved, id),
                    None => None,
                };
                if removed.is_none() {
                    return Err(CartError::MissingLine(id));
                }
                self.slots.remove(&id);
                self.removals.forget(id);
            }
        }

        Ok(self.finish(op, seq))
    }

    fn finish(&mut self, op: Op, seq: OpSeq) -> StoredOp {
        self.bump_next_seq_from(seq);
        StoredOp {
            seq,
            ts_ms: now_ms(),
            op,
        }
    }

    fn active_line_mut(&mut self, id: LineId) -> Result<&mut CartLine, CartError> {
        self.active
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(CartError::NotActive(id))
    }

    fn take_from(lines: &mut Vec<CartLine>, id: LineId) -> Option<CartLine> {
        let pos = lines.iter().position(|l| l.id == id)?;
        Some(lines.remove(pos))
    }

    fn bump_next_seq_from(&mut self, seq: OpSeq) {
        self.next_op_seq = self.next_op_seq.max(seq.saturating_add(1));
    }
}

fn log_rejection<T>(op: &'static str, id: LineId, res: Result<T, CartError>) -> Result<T, CartError> {
    if let Err(err) = &res {
        debug!(op, line_id = id, %err, "cart operation rejected");
    }
    res
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
