//! # Commit Flow
//!
//! Assembles the sale draft from a confirmed session and drives the atomic
//! commit in clivet-db, with an explicit per-operation state machine
//! instead of ad hoc flags:
//!
//! ```text
//! Pending ──► Committed     (transaction landed)
//!    │
//!    └──────► RolledBack    (transaction failed; database untouched,
//!                            operator retries the confirmation)
//! ```
//!
//! Editing a sale is cancellation plus reopening the wizard pre-populated;
//! the operator must explicitly re-confirm to create a new sale.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use clivet_core::cart::Discount;
use clivet_core::schedule;
use clivet_core::types::{ClinicalEntry, Payment, SaleItem, SaleRecord};
use clivet_db::{Database, SaleDraft};

use crate::error::{CheckoutError, CheckoutResult};
use crate::session::{CheckoutSession, Step};

/// State of one optimistic commit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpState {
    Pending,
    Committed,
    RolledBack,
}

/// Confirms the session: builds the draft and commits it atomically.
///
/// On failure the transaction has already rolled back; the session keeps
/// its state so the operator can retry, and `last_op` reads `RolledBack`.
pub async fn confirm(session: &mut CheckoutSession, db: &Database) -> CheckoutResult<SaleRecord> {
    if session.step != Step::Confirm {
        return Err(CheckoutError::WrongStep {
            current: session.step,
        });
    }
    let settlement = session.settlement.ok_or(CheckoutError::NotSettled)?;

    let sale_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let summary = session.cart.summary();
    let base_total = session.base_total();

    let sale = SaleRecord {
        id: sale_id.clone(),
        tutor_id: session.tutor.as_ref().map(|t| t.id.clone()),
        tutor_name: session.tutor.as_ref().map(|t| t.name.clone()),
        paciente_id: session.paciente.as_ref().map(|p| p.id.clone()),
        paciente_name: session.paciente.as_ref().map(|p| p.name.clone()),
        subtotal_cents: summary.subtotal_cents,
        discount_cents: summary.total_discount_cents,
        total_cents: settlement.total_cents,
        debt_cents: settlement.debt_cents,
        created_at: now,
    };

    let items: Vec<SaleItem> = session
        .cart
        .lines()
        .iter()
        .map(|line| SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            product_id: line.product_id.clone(),
            source: line.source,
            name_snapshot: line.name.clone(),
            unit_price_cents: line.unit_price_cents,
            quantity: line.quantity,
            dose: line.dose,
            unit: line.unit.clone(),
            price_before_discount_cents: line.price_before_discount_cents,
            discount_cents: line.discount_cents,
            price_cents: line.price_cents,
            created_at: now,
        })
        .collect();

    let payments: Vec<Payment> = session
        .payments
        .iter()
        .map(|entry| Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            method: entry.method,
            card_brand: entry.card_brand,
            amount_cents: entry.amount_cents,
            surcharge_cents: entry.surcharge_against(base_total).cents(),
            is_vuelto: entry.is_vuelto,
            created_at: now,
        })
        .collect();

    let clinical = build_clinical(session, &sale_id, now);

    let tutor_id = session.tutor.as_ref().map(|t| t.id.as_str());
    let paciente_id = session.paciente.as_ref().map(|p| p.id.as_str());
    let vencimientos: Vec<_> = session
        .cart
        .lines()
        .iter()
        .filter_map(|line| {
            schedule::for_sale_line(
                line,
                tutor_id,
                paciente_id,
                session.applied_date,
                &sale_id,
                now,
            )
        })
        .collect();

    let draft = SaleDraft {
        sale: sale.clone(),
        items,
        payments,
        clinical,
        vencimientos,
    };

    session.last_op = Some(OpState::Pending);
    match db.sales().commit(&draft).await {
        Ok(()) => {
            session.last_op = Some(OpState::Committed);
            info!(sale_id = %sale_id, "Checkout confirmed");
            Ok(sale)
        }
        Err(e) => {
            session.last_op = Some(OpState::RolledBack);
            warn!(sale_id = %sale_id, error = %e, "Commit failed, rolled back");
            Err(e.into())
        }
    }
}

/// The consolidated clinical entry for the tagged lines, when a paciente
/// is attached.
fn build_clinical(
    session: &CheckoutSession,
    sale_id: &str,
    now: chrono::DateTime<Utc>,
) -> Option<ClinicalEntry> {
    let paciente = session.paciente.as_ref()?;

    let tagged: Vec<String> = session
        .cart
        .lines()
        .iter()
        .filter(|l| l.clinical_tag)
        .map(|l| match (l.dose, l.unit.as_deref()) {
            (Some(dose), Some(unit)) => format!("{} {}{}", l.name, dose, unit),
            (Some(dose), None) => format!("{} {}", l.name, dose),
            (None, _) => format!("{} x{}", l.name, l.quantity),
        })
        .collect();

    if tagged.is_empty() {
        return None;
    }

    Some(ClinicalEntry {
        id: Uuid::new_v4().to_string(),
        paciente_id: paciente.id.clone(),
        reason: "Venta presencial".to_string(),
        diagnosis: None,
        treatment: Some(tagged.join(", ")),
        media: Vec::new(),
        sale_id: Some(sale_id.to_string()),
        created_at: now,
    })
}

/// Cancels a committed sale and reopens the wizard pre-populated with its
/// tutor, paciente and cart.
///
/// The cancellation is the compensating transaction (stock, debt and
/// dependent records restored); the returned session sits at the cart
/// step and nothing new is persisted until the operator re-confirms.
pub async fn cancel_and_reopen(
    db: &Database,
    sale_id: &str,
    today: NaiveDate,
) -> CheckoutResult<CheckoutSession> {
    let (sale, items) = db.sales().cancel(sale_id).await?;

    let tutor = match &sale.tutor_id {
        Some(id) => db.tutores().get(id).await?,
        None => None,
    };
    let paciente = match &sale.paciente_id {
        Some(id) => db.tutores().get_paciente(id).await?,
        None => None,
    };

    let mut session = CheckoutSession::new(today);
    session.select_tutor(tutor)?;
    if session.step() == Step::Paciente {
        session.select_paciente(paciente)?;
    }

    for item in &items {
        let Some(catalog_item) = db.catalog().get(&item.product_id).await? else {
            // The product was deleted since the sale; the operator re-adds
            // a replacement by hand.
            warn!(product_id = %item.product_id, "Skipping vanished product on reopen");
            continue;
        };

        let cart = session.cart_mut()?;
        let line_id = if let Some(dose) = item.dose {
            cart.add_dose_item(&catalog_item, dose)?
        } else {
            let line_id = cart.add_item(&catalog_item)?;
            if item.quantity > 1 {
                cart.change_quantity(line_id, item.quantity)?;
            }
            line_id
        };

        // Restore the frozen price; the discount survives as the fixed
        // amount actually granted (the original split is not stored).
        cart.set_unit_price(line_id, item.unit_price_cents)?;
        if item.discount_cents > 0 {
            cart.apply_discount(
                line_id,
                Discount::Fixed {
                    cents: item.discount_cents,
                },
            )?;
        }
    }

    info!(sale_id = %sale_id, lines = session.cart().len(), "Sale reopened for editing");
    Ok(session)
}

// =============================================================================
// Unit Tests
// =============================================================================
