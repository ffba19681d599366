//! # Domain Types
//!
//! Core domain types used throughout Clivet POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogItem    │   │   SaleRecord    │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  source         │   │  tutor snapshot │   │  sale_id (FK)   │       │
//! │  │  price_cents    │   │  total / debt   │   │  method, brand  │       │
//! │  │  stock          │   │  items[]        │   │  is_vuelto      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Tutor/Paciente │   │  ClinicalEntry  │   │  Vencimiento    │       │
//! │  │  balance_cents  │   │  reason/dx/tx   │   │  due_date       │       │
//! │  └─────────────────┘   └─────────────────┘   │  suministrado   │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A sale freezes the tutor/paciente names and every line's price at commit
//! time. Later edits to the catalog or to client records never rewrite
//! history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Catalog
// =============================================================================

/// Which catalog an item comes from.
///
/// The storefront keeps two independent catalogs: the `Online` e-commerce
/// stock (tracked inventory) and the `Presential` in-store list of items
/// and services (no stock tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// E-commerce catalog; carries a stock count.
    Online,
    /// In-person catalog (clinic services, counter items); no stock gate.
    Presential,
}

/// A product or service available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CatalogItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Catalog this item belongs to.
    pub source: CatalogSource,

    /// Display name.
    pub name: String,

    /// Price in centavos; per unit for discrete items, per ml (or other
    /// unit) for fractional ones.
    pub price_cents: i64,

    /// Current stock level. Only meaningful for the online catalog.
    pub stock: Option<i64>,

    /// Whether the item is sold by continuous dose instead of by unit.
    pub fractional: bool,

    /// Dose unit for fractional items ("ml", "mg", ...).
    pub unit: Option<String>,

    /// Whether the item is active (soft delete).
    pub active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the item can be added to a cart.
    ///
    /// Only online items block on stock; presential items (services,
    /// counter goods) always sell.
    pub fn can_sell(&self) -> bool {
        match self.source {
            CatalogSource::Online => self.stock.unwrap_or(0) > 0,
            CatalogSource::Presential => true,
        }
    }
}

// =============================================================================
// Tutor & Paciente
// =============================================================================

/// A client record (pet owner).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tutor {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Running account balance in centavos. Negative means the customer
    /// owes money; debts generated at sale time decrement it, debt
    /// payments credit it back.
    pub balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Tutor {
    /// Returns the account balance as Money.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// A patient (animal) record linked to a tutor.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Paciente {
    pub id: String,
    pub tutor_id: String,
    pub name: String,
    pub species: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment (efectivo).
    Cash,
    /// Debit card; no surcharge.
    Debit,
    /// Credit card; surcharged by brand.
    Credit,
    /// Bank transfer; no surcharge.
    Transfer,
}

/// Credit-card brand, for surcharge purposes.
///
/// Naranja carries the designated 15% surcharge; every other credit brand
/// carries 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    Naranja,
    Visa,
    Mastercard,
    Other,
}

// =============================================================================
// Sale
// =============================================================================

/// A committed point-of-sale transaction.
///
/// Immutable after creation; the only way out is cancellation, which
/// reverses every side effect and deletes the record.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleRecord {
    pub id: String,
    /// Tutor snapshot; both None for a generic (anonymous) sale.
    pub tutor_id: Option<String>,
    pub tutor_name: Option<String>,
    /// Paciente snapshot; optional even when a tutor is attached.
    pub paciente_id: Option<String>,
    pub paciente_name: Option<String>,
    /// Sum of line prices before discounts.
    pub subtotal_cents: i64,
    /// Sum of line discounts.
    pub discount_cents: i64,
    /// Final total including card surcharges.
    pub total_cents: i64,
    /// Debt generated by underpayment, attributed to the tutor.
    pub debt_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleRecord {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn debt(&self) -> Money {
        Money::from_cents(self.debt_cents)
    }

    /// A generic sale has no tutor attached.
    #[inline]
    pub fn is_generic(&self) -> bool {
        self.tutor_id.is_none()
    }
}

/// A frozen line item of a committed sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub source: CatalogSource,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit (or per-ml) price in centavos at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Discrete quantity; 1 for dose lines.
    pub quantity: i64,
    /// Continuous dose amount; None for discrete lines.
    pub dose: Option<f64>,
    pub unit: Option<String>,
    pub price_before_discount_cents: i64,
    pub discount_cents: i64,
    /// Final line total: price_before_discount - discount.
    pub price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Whether this line is a continuous-dose line.
    #[inline]
    pub fn is_dose(&self) -> bool {
        self.dose.is_some()
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A persisted payment towards a sale.
///
/// A sale can carry several entries for split tender; a synthetic cash
/// entry with a negative amount records the vuelto handed back.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub method: PaymentMethod,
    pub card_brand: Option<CardBrand>,
    pub amount_cents: i64,
    /// Surcharge this entry added on top of the base total.
    pub surcharge_cents: i64,
    /// Marks the synthetic negative "change" entry.
    pub is_vuelto: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Clinical History
// =============================================================================

/// A clinical history entry for a paciente.
///
/// Created manually by staff, or as the consolidated entry a sale commit
/// writes for its clinically-tagged items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClinicalEntry {
    pub id: String,
    pub paciente_id: String,
    pub reason: String,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    /// Uploaded media references (download URLs).
    pub media: Vec<String>,
    /// Back-reference to the sale that created this entry, if any.
    /// The cancellation cascade deletes entries through it.
    pub sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Vencimiento
// =============================================================================

/// Stored lifecycle status of a vencimiento.
///
/// The richer display classification (vencido / proximo) is derived on
/// read; see [`crate::schedule::display_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum VencimientoStatus {
    Pendiente,
    Suministrado,
}

/// An expiration-tracking record for a dosed or recurring treatment.
///
/// ## Invariant
/// `supplied == true ⇔ status == Suministrado ⇔ supplied_date is set`.
/// [`Vencimiento::mark_supplied`] and [`Vencimiento::mark_unsupplied`] are
/// the only mutations and both preserve it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Vencimiento {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub tutor_id: Option<String>,
    pub paciente_id: Option<String>,
    #[ts(as = "String")]
    pub applied_date: NaiveDate,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: VencimientoStatus,
    pub supplied: bool,
    #[ts(as = "Option<String>")]
    pub supplied_date: Option<NaiveDate>,
    /// Sale that scheduled this record, if sale-triggered.
    pub sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Vencimiento {
    /// Marks the treatment as supplied on the given date.
    pub fn mark_supplied(&mut self, date: NaiveDate) {
        self.supplied = true;
        self.status = VencimientoStatus::Suministrado;
        self.supplied_date = Some(date);
    }

    /// Un-marks a supplied treatment.
    ///
    /// Resets the stored status to `Pendiente` unconditionally, even when
    /// the due date has already passed. Historical behavior, kept as-is;
    /// the derived display status still reports overdue records as
    /// vencido.
    pub fn mark_unsupplied(&mut self) {
        self.supplied = false;
        self.status = VencimientoStatus::Pendiente;
        self.supplied_date = None;
    }

    /// Checks the supplied/status/supplied_date invariant.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            VencimientoStatus::Suministrado => self.supplied && self.supplied_date.is_some(),
            VencimientoStatus::Pendiente => !self.supplied && self.supplied_date.is_none(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
