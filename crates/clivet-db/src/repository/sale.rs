//! # Sale Repository
//!
//! Persistence for committed sales, including the two multi-table
//! transactions of the pipeline.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. COMMIT (one transaction, all-or-nothing)                            │
//! │     ├── sale row (tutor/paciente snapshots, totals, debt)              │
//! │     ├── frozen sale_items rows                                         │
//! │     ├── payment rows (vuelto entry included)                           │
//! │     ├── consolidated clinical entry (tagged items, paciente attached)  │
//! │     ├── tutor balance decrement by generated debt                      │
//! │     ├── one vencimiento per scheduled line                             │
//! │     └── stock decrement for online discrete lines                      │
//! │                                                                         │
//! │  2. (OPTIONAL) CANCEL (compensating transaction)                        │
//! │     ├── stock restored for online discrete lines                       │
//! │     ├── clinical entries and vencimientos deleted by sale_id           │
//! │     ├── tutor balance credited back by the sale's debt                 │
//! │     └── payments, items and the sale row deleted                       │
//! │                                                                         │
//! │  Editing = cancel + reopen the wizard pre-populated; a new commit      │
//! │  creates a fresh sale.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use clivet_core::types::{ClinicalEntry, Payment, SaleItem, SaleRecord, Vencimiento};

const SALE_COLUMNS: &str = "id, tutor_id, tutor_name, paciente_id, paciente_name, \
     subtotal_cents, discount_cents, total_cents, debt_cents, created_at";

const SALE_ITEM_COLUMNS: &str = "id, sale_id, product_id, source, name_snapshot, \
     unit_price_cents, quantity, dose, unit, price_before_discount_cents, discount_cents, \
     price_cents, created_at";

const PAYMENT_COLUMNS: &str = "id, sale_id, method, card_brand, amount_cents, \
     surcharge_cents, is_vuelto, created_at";

// =============================================================================
// Sale Draft
// =============================================================================

/// Everything a commit writes, assembled by the checkout layer before the
/// transaction starts. Validation is done by then; the draft is internally
/// consistent.
#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub sale: SaleRecord,
    pub items: Vec<SaleItem>,
    pub payments: Vec<Payment>,
    /// Consolidated entry for the clinically tagged lines; present only
    /// when a paciente is attached and at least one line was tagged.
    pub clinical: Option<ClinicalEntry>,
    pub vencimientos: Vec<Vencimiento>,
}

impl SaleDraft {
    /// Stock decrements implied by the draft: online discrete lines only.
    fn stock_decrements(&self) -> impl Iterator<Item = (&str, i64)> {
        self.items
            .iter()
            .filter(|i| i.source == clivet_core::types::CatalogSource::Online && !i.is_dose())
            .map(|i| (i.product_id.as_str(), i.quantity))
    }
}

// =============================================================================
// Sale Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Commits a finalized sale and all dependent records atomically.
    ///
    /// Any failure rolls the whole transaction back; concurrent readers
    /// never observe a partial batch.
    pub async fn commit(&self, draft: &SaleDraft) -> DbResult<()> {
        debug!(
            sale_id = %draft.sale.id,
            items = draft.items.len(),
            payments = draft.payments.len(),
            vencimientos = draft.vencimientos.len(),
            "Committing sale"
        );

        let mut tx = self.pool.begin().await?;

        insert_sale(&mut tx, &draft.sale).await?;

        for item in &draft.items {
            insert_item(&mut tx, item).await?;
        }

        for payment in &draft.payments {
            insert_payment(&mut tx, payment).await?;
        }

        if let Some(entry) = &draft.clinical {
            insert_clinical(&mut tx, entry).await?;
        }

        if draft.sale.debt_cents > 0 {
            let tutor_id = draft
                .sale
                .tutor_id
                .as_deref()
                .ok_or_else(|| DbError::TransactionFailed("debt without tutor".to_string()))?;
            adjust_balance(&mut tx, tutor_id, -draft.sale.debt_cents).await?;
        }

        for record in &draft.vencimientos {
            insert_vencimiento(&mut tx, record).await?;
        }

        for (product_id, quantity) in draft.stock_decrements() {
            adjust_stock(&mut tx, product_id, -quantity).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %draft.sale.id,
            total = %draft.sale.total_cents,
            debt = %draft.sale.debt_cents,
            "Sale committed"
        );
        Ok(())
    }

    /// Cancels a committed sale, reversing every side effect.
    ///
    /// Restores exactly what the commit changed: stock for online discrete
    /// lines, the tutor's debt, and the dependent clinical/vencimiento
    /// records. Returns the deleted sale and its items so the wizard can
    /// reopen pre-populated.
    pub async fn cancel(&self, sale_id: &str) -> DbResult<(SaleRecord, Vec<SaleItem>)> {
        debug!(sale_id = %sale_id, "Cancelling sale");

        let mut tx = self.pool.begin().await?;

        let sale = sqlx::query_as::<_, SaleRecord>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at"
        ))
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            if item.source == clivet_core::types::CatalogSource::Online && !item.is_dose() {
                adjust_stock(&mut tx, &item.product_id, item.quantity).await?;
            }
        }

        sqlx::query("DELETE FROM clinical_entries WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM vencimientos WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        if sale.debt_cents > 0 {
            if let Some(tutor_id) = sale.tutor_id.as_deref() {
                adjust_balance(&mut tx, tutor_id, sale.debt_cents).await?;
            }
        }

        sqlx::query("DELETE FROM payments WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(sale_id = %sale_id, "Sale cancelled");
        Ok((sale, items))
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SaleRecord>> {
        let sale = sqlx::query_as::<_, SaleRecord>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all payments for a sale.
    pub async fn get_payments(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE sale_id = ?1 ORDER BY created_at"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Lists the most recent sales.
    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<SaleRecord>> {
        let sales = sqlx::query_as::<_, SaleRecord>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn insert_sale(tx: &mut Transaction<'_, Sqlite>, sale: &SaleRecord) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sales \
         (id, tutor_id, tutor_name, paciente_id, paciente_name, subtotal_cents, \
          discount_cents, total_cents, debt_cents, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(&sale.id)
    .bind(&sale.tutor_id)
    .bind(&sale.tutor_name)
    .bind(&sale.paciente_id)
    .bind(&sale.paciente_name)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.debt_cents)
    .bind(sale.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_item(tx: &mut Transaction<'_, Sqlite>, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sale_items \
         (id, sale_id, product_id, source, name_snapshot, unit_price_cents, quantity, dose, \
          unit, price_before_discount_cents, discount_cents, price_cents, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(item.source)
    .bind(&item.name_snapshot)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.dose)
    .bind(&item.unit)
    .bind(item.price_before_discount_cents)
    .bind(item.discount_cents)
    .bind(item.price_cents)
    .bind(item.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_payment(tx: &mut Transaction<'_, Sqlite>, payment: &Payment) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO payments \
         (id, sale_id, method, card_brand, amount_cents, surcharge_cents, is_vuelto, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.method)
    .bind(payment.card_brand)
    .bind(payment.amount_cents)
    .bind(payment.surcharge_cents)
    .bind(payment.is_vuelto)
    .bind(payment.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_clinical(tx: &mut Transaction<'_, Sqlite>, entry: &ClinicalEntry) -> DbResult<()> {
    let media =
        serde_json::to_string(&entry.media).map_err(|e| DbError::Internal(e.to_string()))?;

    sqlx::query(
        "INSERT INTO clinical_entries \
         (id, paciente_id, reason, diagnosis, treatment, media, sale_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&entry.id)
    .bind(&entry.paciente_id)
    .bind(&entry.reason)
    .bind(&entry.diagnosis)
    .bind(&entry.treatment)
    .bind(media)
    .bind(&entry.sale_id)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_vencimiento(
    tx: &mut Transaction<'_, Sqlite>,
    record: &Vencimiento,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO vencimientos \
         (id, product_id, product_name, tutor_id, paciente_id, applied_date, due_date, \
          status, supplied, supplied_date, sale_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )
    .bind(&record.id)
    .bind(&record.product_id)
    .bind(&record.product_name)
    .bind(&record.tutor_id)
    .bind(&record.paciente_id)
    .bind(record.applied_date)
    .bind(record.due_date)
    .bind(record.status)
    .bind(record.supplied)
    .bind(record.supplied_date)
    .bind(&record.sale_id)
    .bind(record.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn adjust_balance(
    tx: &mut Transaction<'_, Sqlite>,
    tutor_id: &str,
    delta_cents: i64,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE tutores SET balance_cents = balance_cents + ?2 WHERE id = ?1")
        .bind(tutor_id)
        .bind(delta_cents)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Tutor", tutor_id));
    }

    Ok(())
}

async fn adjust_stock(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    delta: i64,
) -> DbResult<()> {
    // Unconditional: the cart validated against the stock snapshot the
    // operator saw. Two racing sales can drive stock negative.
    sqlx::query(
        "UPDATE catalog_items SET stock = COALESCE(stock, 0) + ?2 \
         WHERE id = ?1 AND source = 'online'",
    )
    .bind(product_id)
    .bind(delta)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{NaiveDate, Utc};
    use clivet_core::types::{
        CardBrand, CatalogItem, CatalogSource, PaymentMethod, Tutor, VencimientoStatus,
    };
    use uuid::Uuid;

    async fn test_db() -> Database {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn naive(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn online_item(id: &str, price_cents: i64, stock: i64) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            source: CatalogSource::Online,
            name: format!("Item {}", id),
            price_cents,
            stock: Some(stock),
            fractional: false,
            unit: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tutor(id: &str, balance_cents: i64) -> Tutor {
        Tutor {
            id: id.to_string(),
            name: "Ana López".to_string(),
            phone: None,
            email: None,
            balance_cents,
            created_at: Utc::now(),
        }
    }

    /// A draft with one online line (qty 2), a cash payment, debt of 8000
    /// and one scheduled vencimiento.
    fn debt_draft(sale_id: &str, tutor_id: &str, product_id: &str) -> SaleDraft {
        let now = Utc::now();
        let sale = SaleRecord {
            id: sale_id.to_string(),
            tutor_id: Some(tutor_id.to_string()),
            tutor_name: Some("Ana López".to_string()),
            paciente_id: None,
            paciente_name: None,
            subtotal_cents: 20_000,
            discount_cents: 2_000,
            total_cents: 18_000,
            debt_cents: 8_000,
            created_at: now,
        };
        let item = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: product_id.to_string(),
            source: CatalogSource::Online,
            name_snapshot: "Pipeta antipulgas".to_string(),
            unit_price_cents: 10_000,
            quantity: 2,
            dose: None,
            unit: None,
            price_before_discount_cents: 20_000,
            discount_cents: 2_000,
            price_cents: 18_000,
            created_at: now,
        };
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            method: PaymentMethod::Cash,
            card_brand: None,
            amount_cents: 10_000,
            surcharge_cents: 0,
            is_vuelto: false,
            created_at: now,
        };
        let vencimiento = Vencimiento {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            product_name: "Pipeta antipulgas".to_string(),
            tutor_id: Some(tutor_id.to_string()),
            paciente_id: None,
            applied_date: naive(2024, 1, 1),
            due_date: naive(2024, 1, 31),
            status: VencimientoStatus::Pendiente,
            supplied: false,
            supplied_date: None,
            sale_id: Some(sale_id.to_string()),
            created_at: now,
        };
        SaleDraft {
            sale,
            items: vec![item],
            payments: vec![payment],
            clinical: None,
            vencimientos: vec![vencimiento],
        }
    }

    #[tokio::test]
    async fn test_commit_writes_every_record() {
        let db = test_db().await;
        db.tutores().insert(&tutor("t1", 0)).await.unwrap();
        db.catalog().insert(&online_item("p1", 10_000, 10)).await.unwrap();

        let draft = debt_draft("s1", "t1", "p1");
        db.sales().commit(&draft).await.unwrap();

        let sale = db.sales().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(sale.total_cents, 18_000);
        assert_eq!(sale.debt_cents, 8_000);

        assert_eq!(db.sales().get_items("s1").await.unwrap().len(), 1);
        assert_eq!(db.sales().get_payments("s1").await.unwrap().len(), 1);
        assert_eq!(db.vencimientos().list_pending().await.unwrap().len(), 1);

        // Debt decremented the balance; stock dropped by the quantity.
        let t = db.tutores().get("t1").await.unwrap().unwrap();
        assert_eq!(t.balance_cents, -8_000);
        let item = db.catalog().get("p1").await.unwrap().unwrap();
        assert_eq!(item.stock, Some(8));
    }

    #[tokio::test]
    async fn test_commit_rolls_back_on_missing_tutor() {
        let db = test_db().await;
        db.catalog().insert(&online_item("p1", 10_000, 10)).await.unwrap();

        // Tutor row never inserted: the balance decrement fails and the
        // whole batch must roll back.
        let draft = debt_draft("s1", "missing", "p1");
        assert!(db.sales().commit(&draft).await.is_err());

        assert!(db.sales().get_by_id("s1").await.unwrap().is_none());
        assert!(db.sales().get_items("s1").await.unwrap().is_empty());
        assert!(db.vencimientos().list_pending().await.unwrap().is_empty());
        let item = db.catalog().get("p1").await.unwrap().unwrap();
        assert_eq!(item.stock, Some(10));
    }

    #[tokio::test]
    async fn test_cancel_restores_pre_sale_state() {
        let db = test_db().await;
        db.tutores().insert(&tutor("t1", 500)).await.unwrap();
        db.catalog().insert(&online_item("p1", 10_000, 10)).await.unwrap();

        let draft = debt_draft("s1", "t1", "p1");
        db.sales().commit(&draft).await.unwrap();

        let (cancelled, items) = db.sales().cancel("s1").await.unwrap();
        assert_eq!(cancelled.id, "s1");
        assert_eq!(items.len(), 1);

        // Stock, balance and dependent record counts are back where they
        // started: nothing more, nothing less.
        let item = db.catalog().get("p1").await.unwrap().unwrap();
        assert_eq!(item.stock, Some(10));
        let t = db.tutores().get("t1").await.unwrap().unwrap();
        assert_eq!(t.balance_cents, 500);
        assert!(db.sales().get_by_id("s1").await.unwrap().is_none());
        assert!(db.sales().get_payments("s1").await.unwrap().is_empty());
        assert!(db.vencimientos().list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_missing_sale_is_not_found() {
        let db = test_db().await;
        let err = db.sales().cancel("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_payment_rows_round_trip() {
        let db = test_db().await;
        db.tutores().insert(&tutor("t1", 0)).await.unwrap();
        db.catalog().insert(&online_item("p1", 10_000, 10)).await.unwrap();

        let mut draft = debt_draft("s1", "t1", "p1");
        draft.payments.push(Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: "s1".to_string(),
            method: PaymentMethod::Credit,
            card_brand: Some(CardBrand::Naranja),
            amount_cents: 5_000,
            surcharge_cents: 2_700,
            is_vuelto: false,
            created_at: Utc::now(),
        });
        db.sales().commit(&draft).await.unwrap();

        let payments = db.sales().get_payments("s1").await.unwrap();
        assert_eq!(payments.len(), 2);
        let card = payments
            .iter()
            .find(|p| p.method == PaymentMethod::Credit)
            .unwrap();
        assert_eq!(card.card_brand, Some(CardBrand::Naranja));
        assert_eq!(card.surcharge_cents, 2_700);
    }
}
