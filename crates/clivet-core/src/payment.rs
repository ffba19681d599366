//! # Payment Allocator
//!
//! Reconciles a set of payment entries against a cart total that may carry
//! card surcharges.
//!
//! ## Settlement Outcomes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  remaining = total_with_surcharges − Σ entry amounts                    │
//! │                                                                         │
//! │  remaining < 0  ──► vuelto: synthetic negative cash entry, debt = 0     │
//! │  remaining > 0  ──► tutor attached: debt on the tutor's account         │
//! │                 ──► generic sale:   hard validation error, no commit    │
//! │  remaining = 0  ──► settled exactly                                     │
//! │                                                                         │
//! │  Exactly one of the three holds for any settled entry set.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Surcharge Policy
//! 15% for the designated brand (Naranja), 10% for every other credit
//! brand, nothing for debit, cash and transfer. Each entry's surcharge is
//! computed against the base cart total only, never against other
//! payments.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CardBrand, PaymentMethod};
use crate::validation;

/// Surcharge for the designated card brand, in basis points.
pub const NARANJA_SURCHARGE_BPS: u32 = 1500;

/// Surcharge for every other credit-card brand, in basis points.
pub const CREDIT_SURCHARGE_BPS: u32 = 1000;

// =============================================================================
// Payment Entry
// =============================================================================

/// A payment entry being assembled in the wizard, before commit.
///
/// The persisted counterpart is [`crate::types::Payment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentEntry {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    /// Credit brand; ignored for other methods.
    pub card_brand: Option<CardBrand>,
    /// Marks the synthetic negative "change" entry.
    pub is_vuelto: bool,
}

impl PaymentEntry {
    pub fn cash(amount: Money) -> Self {
        PaymentEntry {
            method: PaymentMethod::Cash,
            amount_cents: amount.cents(),
            card_brand: None,
            is_vuelto: false,
        }
    }

    pub fn debit(amount: Money) -> Self {
        PaymentEntry {
            method: PaymentMethod::Debit,
            amount_cents: amount.cents(),
            card_brand: None,
            is_vuelto: false,
        }
    }

    pub fn credit(amount: Money, brand: CardBrand) -> Self {
        PaymentEntry {
            method: PaymentMethod::Credit,
            amount_cents: amount.cents(),
            card_brand: Some(brand),
            is_vuelto: false,
        }
    }

    pub fn transfer(amount: Money) -> Self {
        PaymentEntry {
            method: PaymentMethod::Transfer,
            amount_cents: amount.cents(),
            card_brand: None,
            is_vuelto: false,
        }
    }

    /// The synthetic change entry: cash, negative amount.
    pub fn vuelto(change: Money) -> Self {
        PaymentEntry {
            method: PaymentMethod::Cash,
            amount_cents: -change.cents(),
            card_brand: None,
            is_vuelto: true,
        }
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// This entry's surcharge in basis points.
    pub fn surcharge_bps(&self) -> u32 {
        surcharge_bps(self.method, self.card_brand)
    }

    /// This entry's surcharge amount, computed against the base total.
    pub fn surcharge_against(&self, base_total: Money) -> Money {
        if self.is_vuelto {
            return Money::zero();
        }
        base_total.percentage(self.surcharge_bps())
    }
}

/// Surcharge rate for a payment method/brand combination.
pub fn surcharge_bps(method: PaymentMethod, brand: Option<CardBrand>) -> u32 {
    match method {
        PaymentMethod::Credit => match brand {
            Some(CardBrand::Naranja) => NARANJA_SURCHARGE_BPS,
            _ => CREDIT_SURCHARGE_BPS,
        },
        PaymentMethod::Cash | PaymentMethod::Debit | PaymentMethod::Transfer => 0,
    }
}

/// The payable total: base cart total plus every entry's surcharge.
pub fn total_with_surcharges(base_total: Money, entries: &[PaymentEntry]) -> Money {
    let surcharges: Money = entries
        .iter()
        .map(|e| e.surcharge_against(base_total))
        .sum();
    base_total + surcharges
}

// =============================================================================
// Settlement
// =============================================================================

/// Result of reconciling the payment entries against the payable total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    /// Base total plus surcharges, in centavos.
    pub total_cents: i64,
    /// Sum of the entries before any vuelto injection.
    pub paid_cents: i64,
    /// Debt generated by underpayment; 0 unless a tutor carries it.
    pub debt_cents: i64,
    /// Change handed back; mirrored by the injected vuelto entry.
    pub change_cents: i64,
}

impl Settlement {
    /// Paid exactly: no debt, no change.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.debt_cents == 0 && self.change_cents == 0
    }
}

/// Settles the entries against the surcharged total.
///
/// ## Behavior
/// - Overpayment injects a synthetic negative cash entry (`is_vuelto`)
///   into `entries` and zeroes the debt.
/// - Underpayment on a tutor-attached sale becomes debt.
/// - Underpayment on a generic sale is a hard error; the flow must not
///   proceed and nothing is persisted.
///
/// Any previously injected vuelto entries are dropped first, so settling
/// is idempotent over the same entry set.
pub fn settle(
    entries: &mut Vec<PaymentEntry>,
    base_total: Money,
    has_tutor: bool,
) -> CoreResult<Settlement> {
    entries.retain(|e| !e.is_vuelto);

    for entry in entries.iter() {
        validation::validate_payment_amount(entry.amount_cents)?;
    }

    let total = total_with_surcharges(base_total, entries);
    let paid: Money = entries.iter().map(PaymentEntry::amount).sum();
    let remaining = total - paid;

    if remaining.is_negative() {
        let change = remaining.abs();
        entries.push(PaymentEntry::vuelto(change));
        return Ok(Settlement {
            total_cents: total.cents(),
            paid_cents: paid.cents(),
            debt_cents: 0,
            change_cents: change.cents(),
        });
    }

    if remaining.is_positive() && !has_tutor {
        return Err(CoreError::GenericSaleWithDebt {
            remaining_cents: remaining.cents(),
        });
    }

    Ok(Settlement {
        total_cents: total.cents(),
        paid_cents: paid.cents(),
        debt_cents: remaining.cents(),
        change_cents: 0,
    })
}

/// Re-derives one card entry's amount after its brand changed.
///
/// The adjusted entry absorbs whatever gap the *other* entries leave
/// against the recomputed surcharged total, floored at zero.
pub fn recompute_card_amount(
    entries: &mut [PaymentEntry],
    index: usize,
    base_total: Money,
) -> CoreResult<()> {
    if index >= entries.len() {
        return Err(CoreError::Validation(
            crate::error::ValidationError::InvalidFormat {
                field: "payment".to_string(),
                reason: format!("no payment entry at position {}", index),
            },
        ));
    }

    let total = total_with_surcharges(base_total, entries);
    let others: Money = entries
        .iter()
        .enumerate()
        .filter(|(i, e)| *i != index && !e.is_vuelto)
        .map(|(_, e)| e.amount())
        .sum();

    let gap = total - others;
    entries[index].amount_cents = gap.cents().max(0);
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
