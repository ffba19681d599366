//! # clivet-checkout: Point-of-Sale Wizard
//!
//! Orchestrates the checkout flow over clivet-core and clivet-db.
//!
//! ## The Wizard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Wizard Steps                              │
//! │                                                                         │
//! │  Tutor ──► Paciente ──► Cart ──► Payments ──► Confirm                  │
//! │    │          │                                  │                      │
//! │    │ (generic │ (skippable)                      └── atomic commit:     │
//! │    │  sale    │                                      sale + clinical +  │
//! │    │  skips   │                                      debt + schedules   │
//! │    │  both)   │                                                         │
//! │                                                                         │
//! │  Editing a sale = cancel (compensating transaction) + reopen the       │
//! │  wizard pre-populated; the operator re-confirms to create a new sale.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`session`] - The wizard session state machine
//! - [`commit`] - Draft assembly, atomic commit, cancel-and-reopen
//! - [`tutors`] - Cached tutor picker for the first step
//! - [`error`] - Operator-facing error type

pub mod commit;
pub mod error;
pub mod session;
pub mod tutors;

pub use commit::{cancel_and_reopen, confirm, OpState};
pub use error::CheckoutError;
pub use session::{CheckoutSession, Step};
