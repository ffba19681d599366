//! # Tutor Picker
//!
//! Backs the wizard's first step. The tutor directory changes rarely, so
//! reads go through the explicit TTL cache owned by application context;
//! writes that touch the directory invalidate it.

use chrono::{DateTime, Utc};
use tracing::debug;

use clivet_core::cache::TutorCache;
use clivet_core::types::Tutor;
use clivet_db::Database;

use crate::error::CheckoutResult;

/// Returns the tutor list for the picker, served from the cache while it
/// is fresh.
pub async fn tutor_choices(
    db: &Database,
    cache: &mut TutorCache,
    now: DateTime<Utc>,
) -> CheckoutResult<Vec<Tutor>> {
    if let Some(cached) = cache.get(now) {
        debug!(count = cached.len(), "Tutor list served from cache");
        return Ok(cached.clone());
    }

    let tutores = db.tutores().list().await?;
    cache.put(tutores.clone(), now);
    debug!(count = tutores.len(), "Tutor list refreshed");
    Ok(tutores)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use clivet_core::cache::default_tutor_ttl;
    use clivet_db::DbConfig;

    fn tutor(id: &str, name: &str) -> Tutor {
        Tutor {
            id: id.to_string(),
            name: name.to_string(),
            phone: None,
            email: None,
            balance_cents: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_cache_serves_stale_list_within_ttl() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.tutores().insert(&tutor("t1", "Ana")).await.unwrap();

        let mut cache = TutorCache::new(default_tutor_ttl());
        let now = Utc::now();

        let first = tutor_choices(&db, &mut cache, now).await.unwrap();
        assert_eq!(first.len(), 1);

        // A tutor added behind the cache's back is invisible until the
        // window lapses.
        db.tutores().insert(&tutor("t2", "Bruno")).await.unwrap();
        let cached = tutor_choices(&db, &mut cache, now + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);

        let refreshed = tutor_choices(&db, &mut cache, now + Duration::minutes(6))
            .await
            .unwrap();
        assert_eq!(refreshed.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.tutores().insert(&tutor("t1", "Ana")).await.unwrap();

        let mut cache = TutorCache::new(default_tutor_ttl());
        let now = Utc::now();
        tutor_choices(&db, &mut cache, now).await.unwrap();

        db.tutores().insert(&tutor("t2", "Bruno")).await.unwrap();
        cache.invalidate();

        let refreshed = tutor_choices(&db, &mut cache, now).await.unwrap();
        assert_eq!(refreshed.len(), 2);
    }
}
