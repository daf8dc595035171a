//! Shared primitive IDs.

/// Stable cart line identifier, one per product/variant.
pub type LineId = u64;
/// Monotonic operation sequence number.
pub type OpSeq = u64;
/// Catalog category identifier.
pub type CategoryId = u32;
/// Quantity held by a cart line.
pub type Quantity = u32;
