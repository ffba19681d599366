//! # Cart Model & Pricing Engine
//!
//! In-memory cart for the point-of-sale wizard. Lines keep their derived
//! monetary fields consistent after every mutation.
//!
//! ## Line Invariants
//! ```text
//! price_before_discount = unit_price × quantity        (discrete lines)
//! price_before_discount = unit_price × dose, rounded   (dose lines)
//! price                 = price_before_discount − discount
//! ```
//!
//! ## Discrete vs Dose Lines
//! Discrete items merge: adding the same product again increments the
//! existing line's quantity. Continuous-dose items (injectables sold by
//! ml) never merge; every dose addition is its own line.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CatalogItem, CatalogSource};
use crate::validation;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Discount
// =============================================================================

/// Per-line discount.
///
/// `Fixed` is applied verbatim: it is NOT clamped to the line subtotal, so
/// a fixed discount larger than the line yields a negative line total.
/// Historical behavior, kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    None,
    /// Percentage in basis points (1000 = 10%).
    Percentage { bps: u32 },
    /// Flat amount in centavos.
    Fixed { cents: i64 },
}

impl Default for Discount {
    fn default() -> Self {
        Discount::None
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// Prices are frozen at add time: later catalog edits do not move lines
/// already in the cart. The operator can still override `unit_price_cents`
/// at the counter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    /// Cart-local line id; stable across mutations.
    pub line_id: u64,

    /// Catalog item id.
    pub product_id: String,

    /// Catalog the item came from; drives the stock gate and the stock
    /// restore on cancellation.
    pub source: CatalogSource,

    /// Name at time of adding (frozen).
    pub name: String,

    /// Per-unit (or per-ml) price in centavos.
    pub unit_price_cents: i64,

    /// Discrete quantity; stays 1 for dose lines.
    pub quantity: i64,

    /// Continuous dose amount; None for discrete lines.
    pub dose: Option<f64>,

    /// Dose unit ("ml", "mg", ...).
    pub unit: Option<String>,

    /// Stock known when the line was added; the client-side cap for
    /// online items. Not a transactional guarantee.
    pub stock_at_add: Option<i64>,

    pub discount: Discount,

    /// unit_price × quantity (derived).
    pub price_before_discount_cents: i64,

    /// Discount amount (derived).
    pub discount_cents: i64,

    /// Final line total: price_before_discount − discount (derived).
    pub price_cents: i64,

    /// Whether the wizard's final step tagged this line for the
    /// consolidated clinical history entry.
    pub clinical_tag: bool,

    /// Day offset for sale-triggered vencimiento scheduling; None or
    /// non-positive skips scheduling for this line.
    pub vencimiento_days: Option<i64>,
}

impl CartLine {
    fn from_item(line_id: u64, item: &CatalogItem, dose: Option<f64>) -> Self {
        let mut line = CartLine {
            line_id,
            product_id: item.id.clone(),
            source: item.source,
            name: item.name.clone(),
            unit_price_cents: item.price_cents,
            quantity: 1,
            dose,
            unit: item.unit.clone(),
            stock_at_add: item.stock,
            discount: Discount::None,
            price_before_discount_cents: 0,
            discount_cents: 0,
            price_cents: 0,
            clinical_tag: false,
            vencimiento_days: None,
        };
        line.recompute();
        line
    }

    /// Whether this line is a continuous-dose line.
    #[inline]
    pub fn is_dose(&self) -> bool {
        self.dose.is_some()
    }

    /// Final line total as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Recomputes the derived monetary fields from quantity/dose, unit
    /// price and discount. Called after every mutation.
    fn recompute(&mut self) {
        let unit_price = Money::from_cents(self.unit_price_cents);
        let before = match self.dose {
            Some(dose) => unit_price.multiply_dose(dose),
            None => unit_price.multiply_quantity(self.quantity),
        };
        let discount = match self.discount {
            Discount::None => Money::zero(),
            Discount::Percentage { bps } => before.percentage(bps),
            Discount::Fixed { cents } => Money::from_cents(cents),
        };
        self.price_before_discount_cents = before.cents();
        self.discount_cents = discount.cents();
        self.price_cents = (before - discount).cents();
    }
}

// =============================================================================
// Cart Summary
// =============================================================================

/// Cart-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSummary {
    pub subtotal_cents: i64,
    pub total_discount_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// Cart
// =============================================================================

/// The point-of-sale cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
    next_line_id: u64,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds a discrete item, merging into an existing line when present.
    ///
    /// ## Behavior
    /// - Online items with no stock are rejected outright.
    /// - If the product is already in the cart, the quantity increments by
    ///   one, capped by the stock known at add time for online items.
    /// - Dose items must go through [`Cart::add_dose_item`].
    ///
    /// ## Returns
    /// The id of the touched line.
    pub fn add_item(&mut self, item: &CatalogItem) -> CoreResult<u64> {
        if item.fractional {
            return Err(CoreError::NotDiscrete {
                name: item.name.clone(),
            });
        }
        if !item.can_sell() {
            return Err(CoreError::OutOfStock {
                name: item.name.clone(),
            });
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == item.id && !l.is_dose())
        {
            let new_qty = line.quantity + 1;
            if item.source == CatalogSource::Online {
                let available = line.stock_at_add.unwrap_or(0);
                if new_qty > available {
                    return Err(CoreError::StockConflict {
                        name: line.name.clone(),
                        available,
                        requested: new_qty,
                    });
                }
            }
            validation::validate_quantity(new_qty)?;
            line.quantity = new_qty;
            line.recompute();
            return Ok(line.line_id);
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        let line_id = self.next_line_id();
        self.lines.push(CartLine::from_item(line_id, item, None));
        Ok(line_id)
    }

    /// Adds a continuous-dose item as a fresh line.
    ///
    /// Dose lines are never merged: applying 2ml twice is two separate
    /// applications, each with its own line and discount.
    pub fn add_dose_item(&mut self, item: &CatalogItem, dose: f64) -> CoreResult<u64> {
        if !item.fractional {
            return Err(CoreError::NotFractional {
                name: item.name.clone(),
            });
        }
        if !item.can_sell() {
            return Err(CoreError::OutOfStock {
                name: item.name.clone(),
            });
        }
        validation::validate_dose(dose)?;

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        let line_id = self.next_line_id();
        self.lines
            .push(CartLine::from_item(line_id, item, Some(dose)));
        Ok(line_id)
    }

    /// Changes a discrete line's quantity.
    ///
    /// ## Behavior
    /// - Quantities below 1 remove the line.
    /// - Online lines are capped at the stock known at add time.
    /// - Derived fields are recomputed from the existing discount.
    pub fn change_quantity(&mut self, line_id: u64, quantity: i64) -> CoreResult<()> {
        let line = self.line(line_id).ok_or(CoreError::LineNotFound(line_id))?;
        if line.is_dose() {
            return Err(CoreError::NotDiscrete {
                name: line.name.clone(),
            });
        }

        if quantity < 1 {
            return self.remove_line(line_id);
        }

        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::Validation(
                crate::error::ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: 1,
                    max: MAX_LINE_QUANTITY,
                },
            ));
        }

        if line.source == CatalogSource::Online {
            let available = line.stock_at_add.unwrap_or(0);
            if quantity > available {
                return Err(CoreError::StockConflict {
                    name: line.name.clone(),
                    available,
                    requested: quantity,
                });
            }
        }

        let line = self.find_line_mut(line_id)?;
        line.quantity = quantity;
        line.recompute();
        Ok(())
    }

    /// Overrides a line's unit price at the counter.
    pub fn set_unit_price(&mut self, line_id: u64, cents: i64) -> CoreResult<()> {
        validation::validate_price_cents(cents)?;
        let line = self.find_line_mut(line_id)?;
        line.unit_price_cents = cents;
        line.recompute();
        Ok(())
    }

    /// Sets a line's discount and recomputes the derived fields.
    pub fn apply_discount(&mut self, line_id: u64, discount: Discount) -> CoreResult<()> {
        validation::validate_discount(&discount)?;
        let line = self.find_line_mut(line_id)?;
        line.discount = discount;
        line.recompute();
        Ok(())
    }

    /// Tags or untags a line for the consolidated clinical history entry.
    pub fn tag_clinical(&mut self, line_id: u64, tag: bool) -> CoreResult<()> {
        let line = self.find_line_mut(line_id)?;
        line.clinical_tag = tag;
        Ok(())
    }

    /// Sets the vencimiento day offset for a line.
    ///
    /// A None or non-positive offset skips scheduling for the line.
    pub fn set_vencimiento_days(&mut self, line_id: u64, days: Option<i64>) -> CoreResult<()> {
        if let Some(d) = days {
            validation::validate_day_offset(d)?;
        }
        let line = self.find_line_mut(line_id)?;
        line.vencimiento_days = days;
        Ok(())
    }

    /// Removes a line by id.
    pub fn remove_line(&mut self, line_id: u64) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.line_id != line_id);
        if self.lines.len() == before {
            return Err(CoreError::LineNotFound(line_id));
        }
        Ok(())
    }

    /// Clears all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Read access to the lines, in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Looks up a line by id.
    pub fn line(&self, line_id: u64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Cart-level totals: subtotal, accumulated discount, final total.
    pub fn summary(&self) -> CartSummary {
        let subtotal: Money = self
            .lines
            .iter()
            .map(|l| Money::from_cents(l.price_before_discount_cents))
            .sum();
        let discount: Money = self
            .lines
            .iter()
            .map(|l| Money::from_cents(l.discount_cents))
            .sum();
        let total: Money = self.lines.iter().map(|l| l.price()).sum();
        CartSummary {
            subtotal_cents: subtotal.cents(),
            total_discount_cents: discount.cents(),
            total_cents: total.cents(),
        }
    }

    fn next_line_id(&mut self) -> u64 {
        self.next_line_id += 1;
        self.next_line_id
    }

    fn find_line_mut(&mut self, line_id: u64) -> CoreResult<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|l| l.line_id == line_id)
            .ok_or(CoreError::LineNotFound(line_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
