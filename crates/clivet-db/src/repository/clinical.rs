//! # Clinical History Repository
//!
//! Clinical history entries per paciente. Entries are created manually by
//! staff or by a sale commit (consolidated entry for tagged items, written
//! inside the commit transaction); only the cancellation cascade or an
//! explicit staff action deletes them.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use clivet_core::types::ClinicalEntry;

const ENTRY_COLUMNS: &str = "id, paciente_id, reason, diagnosis, treatment, media, sale_id, \
     created_at";

/// Row shape with the media list still JSON-encoded.
#[derive(sqlx::FromRow)]
struct ClinicalRow {
    id: String,
    paciente_id: String,
    reason: String,
    diagnosis: Option<String>,
    treatment: Option<String>,
    media: String,
    sale_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ClinicalRow> for ClinicalEntry {
    fn from(row: ClinicalRow) -> Self {
        ClinicalEntry {
            id: row.id,
            paciente_id: row.paciente_id,
            reason: row.reason,
            diagnosis: row.diagnosis,
            treatment: row.treatment,
            media: serde_json::from_str(&row.media).unwrap_or_default(),
            sale_id: row.sale_id,
            created_at: row.created_at,
        }
    }
}

/// Repository for clinical history database operations.
#[derive(Debug, Clone)]
pub struct ClinicalRepository {
    pool: SqlitePool,
}

impl ClinicalRepository {
    /// Creates a new ClinicalRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClinicalRepository { pool }
    }

    /// Inserts a manually created entry.
    pub async fn insert(&self, entry: &ClinicalEntry) -> DbResult<()> {
        debug!(id = %entry.id, paciente_id = %entry.paciente_id, "Inserting clinical entry");

        let media = serde_json::to_string(&entry.media)
            .map_err(|e| DbError::Internal(e.to_string()))?;

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
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an entry by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<ClinicalEntry>> {
        let row = sqlx::query_as::<_, ClinicalRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM clinical_entries WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ClinicalEntry::from))
    }

    /// Lists a paciente's entries, newest first.
    pub async fn list_for_paciente(&self, paciente_id: &str) -> DbResult<Vec<ClinicalEntry>> {
        let rows = sqlx::query_as::<_, ClinicalRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM clinical_entries \
             WHERE paciente_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(paciente_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ClinicalEntry::from).collect())
    }

    /// Edits an entry's text fields and media list.
    pub async fn update(&self, entry: &ClinicalEntry) -> DbResult<()> {
        debug!(id = %entry.id, "Updating clinical entry");

        let media = serde_json::to_string(&entry.media)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE clinical_entries SET reason = ?2, diagnosis = ?3, treatment = ?4, media = ?5 \
             WHERE id = ?1",
        )
        .bind(&entry.id)
        .bind(&entry.reason)
        .bind(&entry.diagnosis)
        .bind(&entry.treatment)
        .bind(media)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Clinical entry", &entry.id));
        }

        Ok(())
    }

    /// Deletes an entry by explicit staff action.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM clinical_entries WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Clinical entry", id));
        }

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
    use clivet_core::types::{Paciente, Tutor};

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.tutores()
            .insert(&Tutor {
                id: "t1".to_string(),
                name: "Ana López".to_string(),
                phone: None,
                email: None,
                balance_cents: 0,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        db.tutores()
            .insert_paciente(&Paciente {
                id: "pa1".to_string(),
                tutor_id: "t1".to_string(),
                name: "Firulais".to_string(),
                species: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        db
    }

    fn entry(id: &str) -> ClinicalEntry {
        ClinicalEntry {
            id: id.to_string(),
            paciente_id: "pa1".to_string(),
            reason: "Control anual".to_string(),
            diagnosis: Some("Sano".to_string()),
            treatment: None,
            media: vec!["https://blob/radiografia.png".to_string()],
            sale_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_preserves_media() {
        let db = seeded_db().await;
        let repo = db.clinical();

        repo.insert(&entry("c1")).await.unwrap();

        let entries = repo.list_for_paciente("pa1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].media, vec!["https://blob/radiografia.png"]);
        assert_eq!(entries[0].diagnosis.as_deref(), Some("Sano"));
    }

    #[tokio::test]
    async fn test_update_edits_fields() {
        let db = seeded_db().await;
        let repo = db.clinical();
        repo.insert(&entry("c1")).await.unwrap();

        let mut edited = repo.get("c1").await.unwrap().unwrap();
        edited.treatment = Some("Antiparasitario oral".to_string());
        edited.media.push("https://blob/receta.pdf".to_string());
        repo.update(&edited).await.unwrap();

        let stored = repo.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.treatment.as_deref(), Some("Antiparasitario oral"));
        assert_eq!(stored.media.len(), 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = seeded_db().await;
        let repo = db.clinical();
        repo.insert(&entry("c1")).await.unwrap();

        repo.delete("c1").await.unwrap();
        assert!(repo.get("c1").await.unwrap().is_none());
        assert!(matches!(
            repo.delete("c1").await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
