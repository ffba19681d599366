//! # Catalog Repository
//!
//! Reads and stock maintenance over the two product catalogs. The online
//! catalog tracks stock; the presential catalog (services, counter items)
//! does not.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use clivet_core::types::{CatalogItem, CatalogSource};
use clivet_core::validation;

const ITEM_COLUMNS: &str = "id, source, name, price_cents, stock, fractional, unit, active, \
     created_at, updated_at";

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a catalog item.
    pub async fn insert(&self, item: &CatalogItem) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting catalog item");

        sqlx::query(
            "INSERT INTO catalog_items \
             (id, source, name, price_cents, stock, fractional, unit, active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&item.id)
        .bind(item.source)
        .bind(&item.name)
        .bind(item.price_cents)
        .bind(item.stock)
        .bind(item.fractional)
        .bind(&item.unit)
        .bind(item.active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an item by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        let item = sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists the active items of one catalog, by name.
    pub async fn list_active(&self, source: CatalogSource) -> DbResult<Vec<CatalogItem>> {
        let items = sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items \
             WHERE source = ?1 AND active = 1 ORDER BY name"
        ))
        .bind(source)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Searches one catalog by name substring.
    pub async fn search(
        &self,
        source: CatalogSource,
        query: &str,
        limit: i64,
    ) -> DbResult<Vec<CatalogItem>> {
        let query = validation::validate_search_query(query)
            .map_err(|e| DbError::QueryFailed(e.to_string()))?;
        let pattern = format!("%{}%", query);

        let items = sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items \
             WHERE source = ?1 AND active = 1 AND name LIKE ?2 \
             ORDER BY name LIMIT ?3"
        ))
        .bind(source)
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Adjusts an online item's stock by a signed delta (staff correction).
    ///
    /// The sale commit and cancellation adjust stock inside their own
    /// transactions; this is the standalone entry point.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let result = sqlx::query(
            "UPDATE catalog_items SET stock = COALESCE(stock, 0) + ?2, \
             updated_at = ?3 WHERE id = ?1 AND source = 'online'",
        )
        .bind(id)
        .bind(delta)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Catalog item", id));
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

    fn item(id: &str, source: CatalogSource, name: &str, stock: Option<i64>) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            source,
            name: name.to_string(),
            price_cents: 5_000,
            stock,
            fractional: false,
            unit: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.insert(&item("p1", CatalogSource::Online, "Alimento 3kg", Some(7)))
            .await
            .unwrap();

        let stored = repo.get("p1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Alimento 3kg");
        assert_eq!(stored.source, CatalogSource::Online);
        assert_eq!(stored.stock, Some(7));
    }

    #[tokio::test]
    async fn test_search_is_scoped_to_one_catalog() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.insert(&item("p1", CatalogSource::Online, "Pipeta antipulgas", Some(3)))
            .await
            .unwrap();
        repo.insert(&item("p2", CatalogSource::Presential, "Pipeta aplicada", None))
            .await
            .unwrap();

        let online = repo.search(CatalogSource::Online, "pipeta", 10).await.unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].id, "p1");

        let presential = repo.list_active(CatalogSource::Presential).await.unwrap();
        assert_eq!(presential.len(), 1);
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.insert(&item("p1", CatalogSource::Online, "Alimento", Some(5)))
            .await
            .unwrap();
        repo.adjust_stock("p1", -2).await.unwrap();
        assert_eq!(repo.get("p1").await.unwrap().unwrap().stock, Some(3));

        // Presential items have no stock to adjust.
        repo.insert(&item("p2", CatalogSource::Presential, "Consulta", None))
            .await
            .unwrap();
        assert!(repo.adjust_stock("p2", 1).await.is_err());
    }
}
