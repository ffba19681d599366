//! # Expiration Scheduler
//!
//! Derives due dates and builds vencimiento records for treatments that
//! need a follow-up (vaccines, pipettes, recurring medication).
//!
//! ## Two Entry Points
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Manual scheduling (vencimientos screen)                                │
//! │    operator picks N catalog items + base date + offset/explicit date    │
//! │    └── 1 pending record per item                                        │
//! │    └── optionally a paired "suministro" record per item                 │
//! │        (same product, due = applied, supplied = true)                   │
//! │                                                                         │
//! │  Sale-triggered scheduling (wizard final step)                          │
//! │    only lines tagged with a positive day offset get a record,           │
//! │    created inside the same atomic commit as the sale                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::CartLine;
use crate::error::{CoreResult, ValidationError};
use crate::types::{CatalogItem, Vencimiento, VencimientoStatus};
use crate::PROXIMO_WINDOW_DAYS;

// =============================================================================
// Due Date Derivation
// =============================================================================

/// How the due date is specified: an explicit date, or a day offset from
/// the applied date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DueSpec {
    Date {
        #[ts(as = "String")]
        date: NaiveDate,
    },
    Days {
        days: i64,
    },
}

/// Computes the due date from the applied date and the spec.
///
/// A non-positive day offset means "no scheduling" and yields None.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use clivet_core::schedule::{due_date, DueSpec};
///
/// let applied = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let due = due_date(applied, DueSpec::Days { days: 30 }).unwrap();
/// assert_eq!(due, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
/// ```
pub fn due_date(applied: NaiveDate, spec: DueSpec) -> Option<NaiveDate> {
    match spec {
        DueSpec::Date { date } => Some(date),
        DueSpec::Days { days } if days > 0 => Some(applied + Duration::days(days)),
        DueSpec::Days { .. } => None,
    }
}

// =============================================================================
// Display Status
// =============================================================================

/// Derived display state of a vencimiento. Never stored; the stored field
/// only distinguishes pendiente from suministrado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Pendiente,
    /// Due within the next [`PROXIMO_WINDOW_DAYS`] days.
    Proximo,
    /// Due date already passed.
    Vencido,
    Suministrado,
}

/// Classifies a record for display relative to `today`.
pub fn display_status(record: &Vencimiento, today: NaiveDate) -> DisplayStatus {
    if record.supplied {
        return DisplayStatus::Suministrado;
    }
    if record.due_date < today {
        return DisplayStatus::Vencido;
    }
    if (record.due_date - today).num_days() <= PROXIMO_WINDOW_DAYS {
        return DisplayStatus::Proximo;
    }
    DisplayStatus::Pendiente
}

// =============================================================================
// Record Builders
// =============================================================================

fn make_record(
    item: &CatalogItem,
    tutor_id: Option<&str>,
    paciente_id: Option<&str>,
    applied: NaiveDate,
    due: NaiveDate,
    sale_id: Option<&str>,
    now: DateTime<Utc>,
) -> Vencimiento {
    Vencimiento {
        id: Uuid::new_v4().to_string(),
        product_id: item.id.clone(),
        product_name: item.name.clone(),
        tutor_id: tutor_id.map(str::to_string),
        paciente_id: paciente_id.map(str::to_string),
        applied_date: applied,
        due_date: due,
        status: VencimientoStatus::Pendiente,
        supplied: false,
        supplied_date: None,
        sale_id: sale_id.map(str::to_string),
        created_at: now,
    }
}

/// Builds records for manual scheduling over a set of catalog items.
///
/// Each item yields the pending record; with `with_suministro` it also
/// yields the paired "already supplied" record (due = applied,
/// supplied = true) documenting the application done on the spot.
pub fn build_manual(
    items: &[&CatalogItem],
    tutor_id: Option<&str>,
    paciente_id: Option<&str>,
    applied: NaiveDate,
    spec: DueSpec,
    with_suministro: bool,
    now: DateTime<Utc>,
) -> CoreResult<Vec<Vencimiento>> {
    let due = due_date(applied, spec).ok_or(ValidationError::MustBePositive {
        field: "days".to_string(),
    })?;

    let mut records = Vec::with_capacity(items.len() * 2);
    for item in items {
        records.push(make_record(
            item, tutor_id, paciente_id, applied, due, None, now,
        ));
        if with_suministro {
            let mut supplied = make_record(
                item, tutor_id, paciente_id, applied, applied, None, now,
            );
            supplied.mark_supplied(applied);
            records.push(supplied);
        }
    }
    Ok(records)
}

/// Builds the record for one sale line, if the line was tagged with a
/// positive day offset in the wizard's final step.
pub fn for_sale_line(
    line: &CartLine,
    tutor_id: Option<&str>,
    paciente_id: Option<&str>,
    applied: NaiveDate,
    sale_id: &str,
    now: DateTime<Utc>,
) -> Option<Vencimiento> {
    let days = line.vencimiento_days?;
    let due = due_date(applied, DueSpec::Days { days })?;
    Some(Vencimiento {
        id: Uuid::new_v4().to_string(),
        product_id: line.product_id.clone(),
        product_name: line.name.clone(),
        tutor_id: tutor_id.map(str::to_string),
        paciente_id: paciente_id.map(str::to_string),
        applied_date: applied,
        due_date: due,
        status: VencimientoStatus::Pendiente,
        supplied: false,
        supplied_date: None,
        sale_id: Some(sale_id.to_string()),
        created_at: now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CatalogSource;

    fn naive(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn vaccine() -> CatalogItem {
        CatalogItem {
            id: "vac".to_string(),
            source: CatalogSource::Presential,
            name: "Vacuna quíntuple".to_string(),
            price_cents: 8_000,
            stock: None,
            fractional: false,
            unit: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_due_date_from_offset() {
        // 30 days from 2024-01-01 falls on 2024-01-31.
        assert_eq!(
            due_date(naive(2024, 1, 1), DueSpec::Days { days: 30 }),
            Some(naive(2024, 1, 31))
        );
    }

    #[test]
    fn test_due_date_explicit() {
        assert_eq!(
            due_date(naive(2024, 1, 1), DueSpec::Date { date: naive(2024, 6, 1) }),
            Some(naive(2024, 6, 1))
        );
    }

    #[test]
    fn test_non_positive_offset_skips() {
        assert_eq!(due_date(naive(2024, 1, 1), DueSpec::Days { days: 0 }), None);
        assert_eq!(due_date(naive(2024, 1, 1), DueSpec::Days { days: -5 }), None);
    }

    #[test]
    fn test_display_status_windows() {
        let mut record = make_record(
            &vaccine(),
            None,
            None,
            naive(2024, 1, 1),
            naive(2024, 1, 31),
            None,
            Utc::now(),
        );

        assert_eq!(
            display_status(&record, naive(2024, 1, 10)),
            DisplayStatus::Pendiente
        );
        // Exactly 7 days ahead is proximo; 8 is still pendiente.
        assert_eq!(
            display_status(&record, naive(2024, 1, 24)),
            DisplayStatus::Proximo
        );
        assert_eq!(
            display_status(&record, naive(2024, 1, 23)),
            DisplayStatus::Pendiente
        );
        assert_eq!(
            display_status(&record, naive(2024, 1, 31)),
            DisplayStatus::Proximo
        );
        assert_eq!(
            display_status(&record, naive(2024, 2, 1)),
            DisplayStatus::Vencido
        );

        record.mark_supplied(naive(2024, 1, 20));
        assert_eq!(
            display_status(&record, naive(2024, 2, 1)),
            DisplayStatus::Suministrado
        );
    }

    #[test]
    fn test_unsupplied_overdue_shows_vencido() {
        // The stored status resets to pendiente, but display still says
        // vencido for an overdue record.
        let mut record = make_record(
            &vaccine(),
            None,
            None,
            naive(2024, 1, 1),
            naive(2024, 1, 31),
            None,
            Utc::now(),
        );
        record.mark_supplied(naive(2024, 1, 20));
        record.mark_unsupplied();

        assert_eq!(record.status, VencimientoStatus::Pendiente);
        assert_eq!(
            display_status(&record, naive(2024, 3, 1)),
            DisplayStatus::Vencido
        );
    }

    #[test]
    fn test_build_manual_pending_only() {
        let item = vaccine();
        let records = build_manual(
            &[&item],
            Some("t1"),
            Some("p1"),
            naive(2024, 1, 1),
            DueSpec::Days { days: 30 },
            false,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].due_date, naive(2024, 1, 31));
        assert!(!records[0].supplied);
        assert!(records[0].is_consistent());
    }

    #[test]
    fn test_build_manual_with_suministro_pair() {
        let item = vaccine();
        let records = build_manual(
            &[&item],
            Some("t1"),
            None,
            naive(2024, 1, 1),
            DueSpec::Days { days: 30 },
            true,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(records.len(), 2);

        let pending = &records[0];
        assert!(!pending.supplied);
        assert_eq!(pending.due_date, naive(2024, 1, 31));

        let suministro = &records[1];
        assert!(suministro.supplied);
        assert_eq!(suministro.due_date, suministro.applied_date);
        assert_eq!(suministro.supplied_date, Some(naive(2024, 1, 1)));
        assert!(suministro.is_consistent());
    }

    #[test]
    fn test_build_manual_rejects_non_positive_offset() {
        let item = vaccine();
        assert!(build_manual(
            &[&item],
            None,
            None,
            naive(2024, 1, 1),
            DueSpec::Days { days: 0 },
            false,
            Utc::now(),
        )
        .is_err());
    }

    #[test]
    fn test_for_sale_line_respects_tagging() {
        let mut cart = crate::cart::Cart::new();
        let mut item = vaccine();
        item.fractional = false;
        let line_id = cart.add_item(&item).unwrap();

        // Untagged line: no record.
        let line = cart.line(line_id).unwrap();
        assert!(for_sale_line(line, None, None, naive(2024, 1, 1), "s1", Utc::now()).is_none());

        cart.set_vencimiento_days(line_id, Some(30)).unwrap();
        let line = cart.line(line_id).unwrap();
        let record =
            for_sale_line(line, Some("t1"), Some("p1"), naive(2024, 1, 1), "s1", Utc::now())
                .unwrap();
        assert_eq!(record.due_date, naive(2024, 1, 31));
        assert_eq!(record.sale_id.as_deref(), Some("s1"));
    }
}
