//! Database layer
//!
//! Persistence for the Inkpost engine:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected by configuration; repositories dispatch through
//! the `DatabasePool` trait and never hold backend-specific state.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
