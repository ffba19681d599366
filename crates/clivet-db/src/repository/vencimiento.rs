//! # Vencimiento Repository
//!
//! Expiration-tracking records for dosed and recurring treatments.
//! Sale-triggered records are inserted inside the commit transaction; this
//! repository covers manual scheduling, listing and the supplied toggle.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use clivet_core::types::Vencimiento;

const VENCIMIENTO_COLUMNS: &str = "id, product_id, product_name, tutor_id, paciente_id, \
     applied_date, due_date, status, supplied, supplied_date, sale_id, created_at";

/// Repository for vencimiento database operations.
#[derive(Debug, Clone)]
pub struct VencimientoRepository {
    pool: SqlitePool,
}

impl VencimientoRepository {
    /// Creates a new VencimientoRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VencimientoRepository { pool }
    }

    /// Inserts a record (manual scheduling path).
    pub async fn insert(&self, record: &Vencimiento) -> DbResult<()> {
        debug!(id = %record.id, product = %record.product_name, "Inserting vencimiento");

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
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts several records at once (manual multi-item scheduling).
    ///
    /// Validation happens before the first insert; a failed insert aborts
    /// the whole batch.
    pub async fn insert_batch(&self, records: &[Vencimiento]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for record in records {
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
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a record by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Vencimiento>> {
        let record = sqlx::query_as::<_, Vencimiento>(&format!(
            "SELECT {VENCIMIENTO_COLUMNS} FROM vencimientos WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Lists pending records ordered by due date.
    pub async fn list_pending(&self) -> DbResult<Vec<Vencimiento>> {
        let records = sqlx::query_as::<_, Vencimiento>(&format!(
            "SELECT {VENCIMIENTO_COLUMNS} FROM vencimientos \
             WHERE supplied = 0 ORDER BY due_date"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Lists a tutor's records, pending first.
    pub async fn list_for_tutor(&self, tutor_id: &str) -> DbResult<Vec<Vencimiento>> {
        let records = sqlx::query_as::<_, Vencimiento>(&format!(
            "SELECT {VENCIMIENTO_COLUMNS} FROM vencimientos \
             WHERE tutor_id = ?1 ORDER BY supplied, due_date"
        ))
        .bind(tutor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Marks a record as supplied on the given date.
    pub async fn set_supplied(&self, id: &str, date: NaiveDate) -> DbResult<Vencimiento> {
        let mut record = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Vencimiento", id))?;

        record.mark_supplied(date);
        self.persist_toggle(&record).await?;
        Ok(record)
    }

    /// Un-marks a supplied record; the stored status resets to pendiente.
    pub async fn set_unsupplied(&self, id: &str) -> DbResult<Vencimiento> {
        let mut record = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Vencimiento", id))?;

        record.mark_unsupplied();
        self.persist_toggle(&record).await?;
        Ok(record)
    }

    /// Deletes a record by explicit staff action.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM vencimientos WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Vencimiento", id));
        }

        Ok(())
    }

    async fn persist_toggle(&self, record: &Vencimiento) -> DbResult<()> {
        debug!(id = %record.id, supplied = %record.supplied, "Toggling vencimiento");

        sqlx::query(
            "UPDATE vencimientos SET status = ?2, supplied = ?3, supplied_date = ?4 \
             WHERE id = ?1",
        )
        .bind(&record.id)
        .bind(record.status)
        .bind(record.supplied)
        .bind(record.supplied_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use clivet_core::schedule::{build_manual, DueSpec};
    use clivet_core::types::{CatalogItem, CatalogSource, VencimientoStatus};

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

    #[tokio::test]
    async fn test_manual_scheduling_with_suministro_pair() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.vencimientos();

        let item = vaccine();
        let records = build_manual(
            &[&item],
            Some("t1"),
            Some("pa1"),
            naive(2024, 1, 1),
            DueSpec::Days { days: 30 },
            true,
            Utc::now(),
        )
        .unwrap();
        repo.insert_batch(&records).await.unwrap();

        // Only the future record is pending; the paired suministro is
        // already supplied.
        let pending = repo.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].due_date, naive(2024, 1, 31));

        let all = repo.list_for_tutor("t1").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_supplied_toggle_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.vencimientos();

        let item = vaccine();
        let records = build_manual(
            &[&item],
            Some("t1"),
            None,
            naive(2024, 1, 1),
            DueSpec::Days { days: 30 },
            false,
            Utc::now(),
        )
        .unwrap();
        repo.insert_batch(&records).await.unwrap();
        let id = records[0].id.clone();

        let supplied = repo.set_supplied(&id, naive(2024, 1, 20)).await.unwrap();
        assert!(supplied.supplied);
        assert_eq!(supplied.status, VencimientoStatus::Suministrado);
        assert_eq!(supplied.supplied_date, Some(naive(2024, 1, 20)));

        // Un-marking resets the stored status to pendiente unconditionally.
        let unsupplied = repo.set_unsupplied(&id).await.unwrap();
        assert_eq!(unsupplied.status, VencimientoStatus::Pendiente);
        assert_eq!(unsupplied.supplied_date, None);

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert!(stored.is_consistent());
    }

    #[tokio::test]
    async fn test_delete_by_staff_action() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.vencimientos();

        let item = vaccine();
        let records = build_manual(
            &[&item],
            None,
            None,
            naive(2024, 1, 1),
            DueSpec::Date { date: naive(2024, 6, 1) },
            false,
            Utc::now(),
        )
        .unwrap();
        repo.insert(&records[0]).await.unwrap();

        repo.delete(&records[0].id).await.unwrap();
        assert!(repo.get(&records[0].id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&records[0].id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
