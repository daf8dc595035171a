//! Catalog data contracts, providers and browse-screen selection.

/// Async catalog capability and the static provider.
pub mod provider;
/// Catalog record and category types.
pub mod record;
/// Stock-capped per-product selection counters.
pub mod selection;
