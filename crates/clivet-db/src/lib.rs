//! # clivet-db: Database Layer for Clivet POS
//!
//! SQLite persistence for the point-of-sale pipeline, with sqlx for async
//! operations and embedded migrations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     clivet-db (THIS CRATE)                              │
//! │                                                                         │
//! │   ┌───────────────┐    ┌──────────────────┐    ┌──────────────┐        │
//! │   │   Database    │    │   Repositories   │    │  Migrations  │        │
//! │   │   (pool.rs)   │◄───│ catalog / tutor  │    │  (embedded)  │        │
//! │   │               │    │ sale / clinical  │    │ 001_init.sql │        │
//! │   │  SqlitePool   │    │ vencimiento      │    │              │        │
//! │   └───────────────┘    └──────────────────┘    └──────────────┘        │
//! │                                                                         │
//! │  The sale repository owns the two multi-table transactions:            │
//! │  the atomic commit and the compensating cancellation.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clivet_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./clivet.db")).await?;
//! let tutors = db.tutores().list().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::clinical::ClinicalRepository;
pub use repository::sale::{SaleDraft, SaleRepository};
pub use repository::tutor::TutorRepository;
pub use repository::vencimiento::VencimientoRepository;
