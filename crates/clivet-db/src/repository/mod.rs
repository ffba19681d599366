//! # Repositories
//!
//! One repository per aggregate. All of them are thin handles over the
//! shared pool; the sale repository additionally owns the two multi-table
//! transactions (commit and cancellation).

pub mod catalog;
pub mod clinical;
pub mod sale;
pub mod tutor;
pub mod vencimiento;
