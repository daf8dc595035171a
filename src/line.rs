//! Cart line records and the draft used to create them.

use serde::{Deserialize, Serialize};

use crate::{
    money::Rupees,
    types::{LineId, Quantity},
};

/// Opaque reference to a display asset (URL or bundled asset handle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A line in either the active cart or the saved-for-later list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Stable product/variant identifier.
    pub id: LineId,
    /// Display label.
    pub name: String,
    /// Optional size/weight sub-label; empty when absent.
    pub variation: String,
    /// Price of one unit.
    pub unit_price: Rupees,
    /// Units in the cart, at least 1 while active.
    pub quantity: Quantity,
    /// Display asset, never interpreted by the store.
    pub image: ImageRef,
    /// True only while the line sits in the saved-for-later list.
    pub saved: bool,
}

impl CartLine {
    /// Price of this line, `unit_price * quantity`.
    pub fn line_total(&self) -> Rupees {
        self.unit_price * self.quantity
    }
}

/// Product selection handed to the store when a line is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDraft {
    /// Stable product/variant identifier.
    pub id: LineId,
    /// Display label.
    pub name: String,
    /// Optional size/weight sub-label.
    pub variation: String,
    /// Price of one unit.
    pub unit_price: Rupees,
    /// Display asset.
    pub image: ImageRef,
}

impl LineDraft {
    /// Builds a draft with no variation label.
    pub fn new(id: LineId, name: impl Into<String>, unit_price: Rupees, image: impl Into<ImageRef>) -> Self {
        Self {
            id,
            name: name.into(),
            variation: String::new(),
            unit_price,
            image: image.into(),
        }
    }

    /// Sets the variation label.
    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.variation = variation.into();
        self
    }

    pub(crate) fn into_line(self) -> CartLine {
        CartLine {
            id: self.id,
            name: self.name,
            variation: self.variation,
            unit_price: self.unit_price,
            quantity: 1,
            image: self.image,
            saved: false,
        }
    }
}
