//! Task store: SQLite persistence for tasks and granted rewards.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - The `TaskStore` trait and its `Repository` implementation

pub mod migrations;
pub mod repo;
pub mod store;

pub use migrations::init_db;
pub use repo::Repository;
pub use store::TaskStore;
