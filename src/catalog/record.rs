use serde::{Deserialize, Serialize};

use crate::{
    line::{ImageRef, LineDraft},
    money::Rupees,
    types::{CategoryId, LineId, Quantity},
};

/// Browsable product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category identifier.
    pub id: CategoryId,
    /// Display label.
    pub name: String,
    /// Icon asset.
    pub icon: ImageRef,
}

/// Purchasable size or pack of a product, priced on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Line id for this variant, unique across the whole catalog.
    pub id: LineId,
    /// Label such as `1 kg`.
    pub name: String,
    /// Price of this variant.
    pub price: Rupees,
}

/// Product as supplied by a catalog provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Product identifier, reused as the cart line id.
    pub id: LineId,
    /// Owning category.
    pub category_id: CategoryId,
    /// Display label.
    pub name: String,
    /// Selling price.
    pub price: Rupees,
    /// List price before discount.
    pub mrp: Rupees,
    /// Discount percentage shown on the card.
    #[serde(default)]
    pub discount: u8,
    /// Display asset.
    pub image: ImageRef,
    /// Units available.
    pub stock: Quantity,
    /// Size/freshness labels; the first one doubles as the variation.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Alternative packs; each becomes its own cart line.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl CatalogRecord {
    /// True when no unit is available.
    pub fn out_of_stock(&self) -> bool {
        self.stock == 0
    }

    /// Variant with line id `id`.
    pub fn variant(&self, id: LineId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

impl LineDraft {
    /// Cart draft for the base product, labelled with its first tag.
    pub fn from_record(record: &CatalogRecord) -> Self {
        let variation = record.tags.first().map(String::as_str).unwrap_or_default();
        LineDraft::new(record.id, record.name.clone(), record.price, record.image.clone())
            .with_variation(variation)
    }

    /// Cart draft for one variant: its own line id, price and label.
    pub fn from_variant(record: &CatalogRecord, variant: &Variant) -> Self {
        LineDraft::new(variant.id, record.name.clone(), variant.price, record.image.clone())
            .with_variation(variant.name.clone())
    }
}

impl From<&CatalogRecord> for LineDraft {
    fn from(record: &CatalogRecord) -> Self {
        LineDraft::from_record(record)
    }
}
