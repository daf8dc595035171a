//! Storefront cart state with optional SQLite journaling.
//!
//! # Examples
//!
//! In-memory usage with [`cart::store::CartStore`]:
//! ```
//! use freshcart::{
//!     cart::store::CartStore,
//!     line::LineDraft,
//!     money::Rupees,
//! };
//!
//! let mut cart = CartStore::new();
//! cart.add_or_increment(LineDraft::new(1, "Fresh Salmon Fillet", Rupees(599), "salmon.png"));
//! cart.add_or_increment(LineDraft::new(2, "Prawns (500g)", Rupees(449), "prawns.png"));
//! cart.add_or_increment(LineDraft::new(2, "Prawns (500g)", Rupees(449), "prawns.png"));
//!
//! let totals = cart.compute_totals().expect("non-empty cart");
//! assert_eq!(totals.subtotal, Rupees(1_497));
//! assert_eq!(totals.total.to_string(), "₹1,546");
//! ```
//!
//! Runtime usage with SQLite sink:
//! ```no_run
//! use freshcart::{
//!     cart::store::CartConfig,
//!     line::LineDraft,
//!     money::Rupees,
//!     persist::sqlite::SqliteOpSink,
//!     runtime::handle::{spawn_cart, RuntimeConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = SqliteOpSink::open("cart.db").expect("open sqlite");
//! let store = sink.load_store(CartConfig::default()).expect("replay");
//! let handle = spawn_cart(store, Some(Box::new(sink)), RuntimeConfig::default());
//! let line = handle
//!     .add_or_increment(LineDraft::new(1, "Fresh Fish", Rupees(299), "fish.png"))
//!     .await
//!     .expect("add");
//! let token = handle.request_removal(line.id).await.expect("request");
//! handle.confirm_removal(token).await.expect("confirm");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Cart store, removal tokens and index helpers.
pub mod cart;
/// Catalog records, providers and browse selection.
pub mod catalog;
/// Cart line records and drafts.
pub mod line;
/// Whole-rupee money type.
pub mod money;
/// Mutation op model and persistence wrapper types.
pub mod op;
/// Persistence abstraction and SQLite implementation.
pub mod persist;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Login and onboarding flows.
pub mod session;
/// Shared primitive types.
pub mod types;
