//! # clivet-core: Pure Business Logic for Clivet POS
//!
//! This crate is the heart of the point-of-sale pipeline for a combined
//! veterinary clinic and pet-supply storefront. It contains the cart model,
//! the pricing engine, the payment allocator and the vencimiento scheduler
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Clivet POS Data Flow                             │
//! │                                                                         │
//! │   Catalog ──► Cart ──► Pricing ──► Payment Allocator ──► Committer     │
//! │                                          │                              │
//! │                                          └──► Vencimiento Scheduler    │
//! │                                                                         │
//! │   ★ Everything left of the Committer lives in THIS CRATE ★             │
//! │                                                                         │
//! │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CatalogItem, Tutor, SaleRecord, Vencimiento, ...)
//! - [`money`] - Money type with integer centavo arithmetic (no floating point!)
//! - [`cart`] - Cart lines with per-line discounts and continuous-dose items
//! - [`payment`] - Surcharge policy and payment settlement (debt / vuelto)
//! - [`schedule`] - Due-date derivation and vencimiento status classification
//! - [`validation`] - Business rule validation
//! - [`cache`] - Explicit TTL cache for the tutor list
//! - [`error`] - Domain error types

pub mod cache;
pub mod cart;
pub mod error;
pub mod money;
pub mod payment;
pub mod schedule;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartSummary, Discount};
pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use payment::{PaymentEntry, Settlement};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single discrete item in a cart line.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Days before a vencimiento's due date during which it counts as "proximo".
pub const PROXIMO_WINDOW_DAYS: i64 = 7;
