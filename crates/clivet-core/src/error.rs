//! # Error Types
//!
//! Domain-specific error types for clivet-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  clivet-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  clivet-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  clivet-checkout errors (separate crate)                               │
//! │  └── CheckoutError    - What the operator sees                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → operator dialog   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations in the sale pipeline. They are
/// raised before any write happens, so nothing is persisted when one fires.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Catalog item cannot be found.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Cart line cannot be found.
    #[error("Cart line not found: {0}")]
    LineNotFound(u64),

    /// Online item has no stock left and cannot be added.
    #[error("'{name}' is out of stock")]
    OutOfStock { name: String },

    /// Requested quantity exceeds the last-known stock of an online item.
    ///
    /// Checked against the stock snapshot the operator saw, not a
    /// transactional guarantee.
    #[error("Insufficient stock for '{name}': available {available}, requested {requested}")]
    StockConflict {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Quantity operations only apply to discrete (non-dose) lines.
    #[error("'{name}' is sold by dose, not by quantity")]
    NotDiscrete { name: String },

    /// Dose operations only apply to fractional lines.
    #[error("'{name}' is sold by unit, not by dose")]
    NotFractional { name: String },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// A sale without a tutor attached cannot generate debt.
    ///
    /// The flow must not proceed: the underpaid remainder has no account
    /// to be attributed to.
    #[error("Generic sale is underpaid by {remaining_cents} centavos and has no tutor to carry the debt")]
    GenericSaleWithDebt { remaining_cents: i64 },

    /// Sale not found (e.g. when reopening a cancelled sale).
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised when operator input doesn't meet requirements, before business
/// logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. invalid UUID, non-numeric amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
