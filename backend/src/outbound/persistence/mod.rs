//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the repository ports backed by PostgreSQL
//! through `diesel-async` and `bb8` connection pooling.
//!
//! - **Thin adapters**: repositories only translate between rows and domain
//!   types. Workflow rules live in the domain services.
//! - **Internal models**: row structs (`models.rs`) and the schema
//!   (`schema.rs`) never leave this module.
//! - **Atomic units**: capacity-checked finalisation, stage changes and
//!   payment completion each run in one transaction with row locks.
//!
//! # Example
//!
//! ```ignore
//! use college_backend::outbound::persistence::{DbPool, DieselLedgerRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/college")).await?;
//! let ledger = DieselLedgerRepository::new(pool);
//! ```

mod diesel_catalogue_repository;
mod diesel_error_mapping;
mod diesel_grade_repository;
mod diesel_ledger_repository;
mod diesel_principal_repository;
mod diesel_registration_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_catalogue_repository::DieselCatalogueRepository;
pub use diesel_grade_repository::DieselGradeRepository;
pub use diesel_ledger_repository::DieselLedgerRepository;
pub use diesel_principal_repository::DieselPrincipalRepository;
pub use diesel_registration_repository::DieselRegistrationRepository;
pub use migrations::run_pending_migrations;
pub use pool::{DbPool, PoolConfig, PoolError};
