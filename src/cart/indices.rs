use hashbrown::HashMap;

use crate::types::LineId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Active,
    Saved,
}

pub type SlotIndex = HashMap<LineId, Slot>;
