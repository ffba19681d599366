//! # Tutor Repository
//!
//! Tutors (clients), their pacientes and the signed account balance.
//!
//! ## Balance Convention
//! `balance_cents` is signed: negative means the customer owes money.
//! A sale commit decrements it by the generated debt (inside the commit
//! transaction); a debt payment or a cancellation credits it back.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use clivet_core::types::{Paciente, Tutor};
use clivet_core::validation;

const TUTOR_COLUMNS: &str = "id, name, phone, email, balance_cents, created_at";
const PACIENTE_COLUMNS: &str = "id, tutor_id, name, species, created_at";

/// Repository for tutor and paciente database operations.
#[derive(Debug, Clone)]
pub struct TutorRepository {
    pool: SqlitePool,
}

impl TutorRepository {
    /// Creates a new TutorRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TutorRepository { pool }
    }

    /// Inserts a tutor.
    pub async fn insert(&self, tutor: &Tutor) -> DbResult<()> {
        validation::validate_name(&tutor.name).map_err(|e| DbError::QueryFailed(e.to_string()))?;
        debug!(id = %tutor.id, name = %tutor.name, "Inserting tutor");

        sqlx::query(
            "INSERT INTO tutores (id, name, phone, email, balance_cents, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&tutor.id)
        .bind(&tutor.name)
        .bind(&tutor.phone)
        .bind(&tutor.email)
        .bind(tutor.balance_cents)
        .bind(tutor.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a tutor by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Tutor>> {
        let tutor = sqlx::query_as::<_, Tutor>(&format!(
            "SELECT {TUTOR_COLUMNS} FROM tutores WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tutor)
    }

    /// Lists all tutors by name. Feeds the wizard's tutor picker through
    /// the TTL cache.
    pub async fn list(&self) -> DbResult<Vec<Tutor>> {
        let tutores = sqlx::query_as::<_, Tutor>(&format!(
            "SELECT {TUTOR_COLUMNS} FROM tutores ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tutores)
    }

    /// Inserts a paciente.
    pub async fn insert_paciente(&self, paciente: &Paciente) -> DbResult<()> {
        validation::validate_name(&paciente.name)
            .map_err(|e| DbError::QueryFailed(e.to_string()))?;
        debug!(id = %paciente.id, tutor_id = %paciente.tutor_id, "Inserting paciente");

        sqlx::query(
            "INSERT INTO pacientes (id, tutor_id, name, species, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&paciente.id)
        .bind(&paciente.tutor_id)
        .bind(&paciente.name)
        .bind(&paciente.species)
        .bind(paciente.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a paciente by ID.
    pub async fn get_paciente(&self, id: &str) -> DbResult<Option<Paciente>> {
        let paciente = sqlx::query_as::<_, Paciente>(&format!(
            "SELECT {PACIENTE_COLUMNS} FROM pacientes WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(paciente)
    }

    /// Lists a tutor's pacientes.
    pub async fn pacientes_of(&self, tutor_id: &str) -> DbResult<Vec<Paciente>> {
        let pacientes = sqlx::query_as::<_, Paciente>(&format!(
            "SELECT {PACIENTE_COLUMNS} FROM pacientes WHERE tutor_id = ?1 ORDER BY name"
        ))
        .bind(tutor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pacientes)
    }

    /// Adjusts a tutor's balance by a signed delta in centavos.
    pub async fn adjust_balance(&self, tutor_id: &str, delta_cents: i64) -> DbResult<()> {
        debug!(tutor_id = %tutor_id, delta = %delta_cents, "Adjusting tutor balance");

        let result = sqlx::query(
            "UPDATE tutores SET balance_cents = balance_cents + ?2 WHERE id = ?1",
        )
        .bind(tutor_id)
        .bind(delta_cents)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tutor", tutor_id));
        }

        Ok(())
    }

    /// Registers a debt payment: credits the balance back.
    pub async fn register_debt_payment(&self, tutor_id: &str, amount_cents: i64) -> DbResult<()> {
        validation::validate_payment_amount(amount_cents)
            .map_err(|e| DbError::QueryFailed(e.to_string()))?;

        self.adjust_balance(tutor_id, amount_cents).await?;
        info!(tutor_id = %tutor_id, amount = %amount_cents, "Debt payment registered");
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

    fn tutor(id: &str, name: &str, balance_cents: i64) -> Tutor {
        Tutor {
            id: id.to_string(),
            name: name.to_string(),
            phone: Some("11-5555-0000".to_string()),
            email: None,
            balance_cents,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_tutor_and_pacientes_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tutores();

        repo.insert(&tutor("t1", "Ana López", 0)).await.unwrap();
        repo.insert_paciente(&Paciente {
            id: "pa1".to_string(),
            tutor_id: "t1".to_string(),
            name: "Firulais".to_string(),
            species: Some("perro".to_string()),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        let stored = repo.get("t1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Ana López");

        let pacientes = repo.pacientes_of("t1").await.unwrap();
        assert_eq!(pacientes.len(), 1);
        assert_eq!(pacientes[0].name, "Firulais");
        assert_eq!(
            repo.get_paciente("pa1").await.unwrap().unwrap().tutor_id,
            "t1"
        );
    }

    #[tokio::test]
    async fn test_debt_payment_credits_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tutores();

        // Owes $80.00.
        repo.insert(&tutor("t1", "Ana López", -8_000)).await.unwrap();

        repo.register_debt_payment("t1", 3_000).await.unwrap();
        assert_eq!(repo.get("t1").await.unwrap().unwrap().balance_cents, -5_000);

        // Non-positive payments are rejected.
        assert!(repo.register_debt_payment("t1", 0).await.is_err());
    }

    #[tokio::test]
    async fn test_adjust_balance_unknown_tutor() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.tutores().adjust_balance("ghost", 100).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
