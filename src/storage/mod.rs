mod repository;

pub use repository::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for movement indexes
pub const MIGRATION_002_INDEXES: &str = include_str!("migrations/002_movement_indexes.sql");
