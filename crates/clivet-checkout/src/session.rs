//! # Checkout Session
//!
//! The wizard session: an explicit state machine over the steps
//! `Tutor → Paciente → Cart → Payments → Confirm`, holding the selected
//! client, the cart and the payment entries.
//!
//! ## Step Gates
//! - A generic (tutor-less) sale skips the paciente step.
//! - The payments step requires a non-empty cart.
//! - Confirm requires a settlement: paid exactly, overpaid with vuelto,
//!   or underpaid with a tutor to carry the debt.

use chrono::NaiveDate;
use serde::Serialize;

use clivet_core::cart::Cart;
use clivet_core::error::{CoreError, ValidationError};
use clivet_core::money::Money;
use clivet_core::payment::{self, PaymentEntry, Settlement};
use clivet_core::types::{CardBrand, Paciente, PaymentMethod, Tutor};

use crate::error::{CheckoutError, CheckoutResult};

/// The wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Tutor,
    Paciente,
    Cart,
    Payments,
    Confirm,
}

/// One in-progress checkout.
///
/// Mutations are gated by the current step; out-of-turn calls fail with
/// [`CheckoutError::WrongStep`] and change nothing.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub(crate) step: Step,
    pub(crate) tutor: Option<Tutor>,
    pub(crate) paciente: Option<Paciente>,
    pub(crate) cart: Cart,
    pub(crate) payments: Vec<PaymentEntry>,
    /// Base date for sale-triggered vencimientos; defaults to today.
    pub(crate) applied_date: NaiveDate,
    pub(crate) settlement: Option<Settlement>,
    /// State of the last commit attempt, if any.
    pub(crate) last_op: Option<crate::commit::OpState>,
}

impl CheckoutSession {
    /// Starts a new session at the tutor step.
    pub fn new(applied_date: NaiveDate) -> Self {
        CheckoutSession {
            step: Step::Tutor,
            tutor: None,
            paciente: None,
            cart: Cart::new(),
            payments: Vec::new(),
            applied_date,
            settlement: None,
            last_op: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn tutor(&self) -> Option<&Tutor> {
        self.tutor.as_ref()
    }

    pub fn paciente(&self) -> Option<&Paciente> {
        self.paciente.as_ref()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn payments(&self) -> &[PaymentEntry] {
        &self.payments
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    pub fn applied_date(&self) -> NaiveDate {
        self.applied_date
    }

    /// State of the last commit attempt driven from this session.
    pub fn last_op(&self) -> Option<crate::commit::OpState> {
        self.last_op
    }

    /// Whether a tutor is attached (false = generic sale).
    pub fn has_tutor(&self) -> bool {
        self.tutor.is_some()
    }

    /// The cart total before surcharges.
    pub fn base_total(&self) -> Money {
        Money::from_cents(self.cart.summary().total_cents)
    }

    // -------------------------------------------------------------------------
    // Tutor / Paciente Steps
    // -------------------------------------------------------------------------

    /// Selects the tutor, or None for a generic sale.
    ///
    /// A generic sale has no paciente either, so it jumps straight to the
    /// cart step.
    pub fn select_tutor(&mut self, tutor: Option<Tutor>) -> CheckoutResult<()> {
        self.require_step(Step::Tutor)?;

        self.step = if tutor.is_some() {
            Step::Paciente
        } else {
            Step::Cart
        };
        self.tutor = tutor;
        self.paciente = None;
        Ok(())
    }

    /// Selects the paciente, or None to sell to the tutor without one.
    pub fn select_paciente(&mut self, paciente: Option<Paciente>) -> CheckoutResult<()> {
        self.require_step(Step::Paciente)?;

        if let Some(p) = &paciente {
            let tutor_id = self
                .tutor
                .as_ref()
                .map(|t| t.id.clone())
                .unwrap_or_default();
            if p.tutor_id != tutor_id {
                return Err(CheckoutError::PacienteMismatch {
                    paciente_id: p.id.clone(),
                    tutor_id,
                });
            }
        }

        self.paciente = paciente;
        self.step = Step::Cart;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Cart Step
    // -------------------------------------------------------------------------

    /// Mutable cart access during the cart step.
    pub fn cart_mut(&mut self) -> CheckoutResult<&mut Cart> {
        self.require_step(Step::Cart)?;
        Ok(&mut self.cart)
    }

    /// Advances to the payments step.
    pub fn to_payments(&mut self) -> CheckoutResult<()> {
        self.require_step(Step::Cart)?;
        if self.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        self.step = Step::Payments;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payments Step
    // -------------------------------------------------------------------------

    /// Adds a payment entry. Invalidates any previous settlement.
    pub fn add_payment(&mut self, entry: PaymentEntry) -> CheckoutResult<()> {
        self.require_step(Step::Payments)?;
        self.payments.push(entry);
        self.settlement = None;
        Ok(())
    }

    /// Removes a payment entry by position.
    pub fn remove_payment(&mut self, index: usize) -> CheckoutResult<()> {
        self.require_step(Step::Payments)?;
        if index >= self.payments.len() {
            return Err(CoreError::Validation(ValidationError::InvalidFormat {
                field: "payment".to_string(),
                reason: format!("no payment entry at position {}", index),
            })
            .into());
        }
        self.payments.remove(index);
        self.settlement = None;
        Ok(())
    }

    /// Changes a card entry's brand and re-derives its amount to close the
    /// gap left by the other entries.
    pub fn set_card_brand(&mut self, index: usize, brand: CardBrand) -> CheckoutResult<()> {
        self.require_step(Step::Payments)?;

        let entry = self.payments.get_mut(index).ok_or_else(|| {
            CoreError::Validation(ValidationError::InvalidFormat {
                field: "payment".to_string(),
                reason: format!("no payment entry at position {}", index),
            })
        })?;
        if entry.method != PaymentMethod::Credit {
            return Err(CoreError::Validation(ValidationError::InvalidFormat {
                field: "payment".to_string(),
                reason: "only credit entries carry a card brand".to_string(),
            })
            .into());
        }
        entry.card_brand = Some(brand);

        let base = self.base_total();
        payment::recompute_card_amount(&mut self.payments, index, base)?;
        self.settlement = None;
        Ok(())
    }

    /// Settles the payments against the surcharged total and advances to
    /// the confirm step.
    ///
    /// An underpaid generic sale fails here, before anything touches the
    /// database.
    pub fn settle(&mut self) -> CheckoutResult<Settlement> {
        self.require_step(Step::Payments)?;

        let base = self.base_total();
        let has_tutor = self.has_tutor();
        let settlement = payment::settle(&mut self.payments, base, has_tutor)?;
        self.settlement = Some(settlement);
        self.step = Step::Confirm;
        Ok(settlement)
    }

    // -------------------------------------------------------------------------
    // Confirm Step
    // -------------------------------------------------------------------------

    /// Sets the base date for sale-triggered vencimientos.
    pub fn set_applied_date(&mut self, date: NaiveDate) {
        self.applied_date = date;
    }

    /// Tags a line for the consolidated clinical history entry.
    pub fn tag_clinical(&mut self, line_id: u64, tag: bool) -> CheckoutResult<()> {
        self.require_confirmable()?;
        self.cart.tag_clinical(line_id, tag)?;
        Ok(())
    }

    /// Sets a line's vencimiento day offset; non-positive or None skips
    /// scheduling for that line.
    pub fn set_vencimiento_days(&mut self, line_id: u64, days: Option<i64>) -> CheckoutResult<()> {
        self.require_confirmable()?;
        self.cart.set_vencimiento_days(line_id, days)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Steps back one screen. Going back from confirm drops the
    /// settlement; the operator must settle again.
    pub fn back(&mut self) {
        self.step = match self.step {
            Step::Tutor => Step::Tutor,
            Step::Paciente => Step::Tutor,
            Step::Cart => {
                if self.has_tutor() {
                    Step::Paciente
                } else {
                    Step::Tutor
                }
            }
            Step::Payments => Step::Cart,
            Step::Confirm => {
                self.settlement = None;
                Step::Payments
            }
        };
    }

    fn require_step(&self, expected: Step) -> CheckoutResult<()> {
        if self.step != expected {
            return Err(CheckoutError::WrongStep { current: self.step });
        }
        Ok(())
    }

    /// Tagging is allowed while building the cart and on the final screen.
    fn require_confirmable(&self) -> CheckoutResult<()> {
        if self.step != Step::Cart && self.step != Step::Confirm {
            return Err(CheckoutError::WrongStep { current: self.step });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
