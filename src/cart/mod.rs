//! Authoritative in-memory cart state.

/// Line-to-collection index.
pub mod indices;
/// Two-step removal confirmation tokens.
pub mod removal;
/// Cart store with active and saved-for-later collections.
pub mod store;
