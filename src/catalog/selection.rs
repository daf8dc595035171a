//! Per-product counters behind the browse screen's +/- buttons.

use hashbrown::HashMap;
use thiserror::Error;

use crate::types::{LineId, Quantity};

use super::record::CatalogRecord;

/// Rejected selection changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Another unit would exceed the available stock.
    #[error("product {id} is limited to {stock} units")]
    StockLimit {
        /// Product id.
        id: LineId,
        /// Units available.
        stock: Quantity,
    },
    /// Nothing of this product is selected.
    #[error("product {0} is not selected")]
    NotSelected(LineId),
}

/// Stock-capped counts keyed by product id. Zero counts are never stored.
#[derive(Debug, Default, Clone)]
pub struct Selection {
    counts: HashMap<LineId, Quantity>,
}

impl Selection {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one unit of `record`, returning the new count.
    pub fn add(&mut self, record: &CatalogRecord) -> Result<Quantity, SelectionError> {
        if !self.can_add(record) {
            return Err(SelectionError::StockLimit {
                id: record.id,
                stock: record.stock,
            });
        }
        let count = self.counts.entry(record.id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    /// Removes one unit, returning what is left. The entry disappears at zero.
    pub fn remove(&mut self, id: LineId) -> Result<Quantity, SelectionError> {
        let count = self.counts.get_mut(&id).ok_or(SelectionError::NotSelected(id))?;
        *count -= 1;
        let left = *count;
        if left == 0 {
            self.counts.remove(&id);
        }
        Ok(left)
    }

    /// True while another unit fits within stock.
    pub fn can_add(&self, record: &CatalogRecord) -> bool {
        self.count(record.id) < record.stock
    }

    /// Units selected for `id`.
    pub fn count(&self, id: LineId) -> Quantity {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Units selected across all products.
    pub fn total_items(&self) -> u64 {
        self.counts.values().map(|c| u64::from(*c)).sum()
    }

    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
