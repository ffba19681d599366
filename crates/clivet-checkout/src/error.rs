//! # Checkout Error Type
//!
//! The operator-facing error for the wizard. Wraps core and db errors and
//! adds the flow-level failures. Every variant surfaces as a blocking
//! dialog; none are fatal and the wizard stays interactive.

use thiserror::Error;

use clivet_core::CoreError;
use clivet_db::DbError;

use crate::session::Step;

/// Errors surfaced by the checkout wizard.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Business rule violation from the core (stock, discounts,
    /// generic-sale debt, validation).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persistence failure. The commit transaction already rolled back;
    /// the operator retries the confirmation manually.
    #[error(transparent)]
    Db(#[from] DbError),

    /// An operation was invoked in the wrong wizard step.
    #[error("Operation not allowed in the {current:?} step")]
    WrongStep { current: Step },

    /// The payments step needs something to pay for.
    #[error("Cart is empty")]
    EmptyCart,

    /// Confirm was invoked before the payments were settled.
    #[error("Payments have not been settled")]
    NotSettled,

    /// A paciente was selected that belongs to a different tutor.
    #[error("Paciente {paciente_id} does not belong to tutor {tutor_id}")]
    PacienteMismatch {
        paciente_id: String,
        tutor_id: String,
    },
}

/// Result type for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;
