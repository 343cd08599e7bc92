use thiserror::Error;

use crate::domain::SnapshotError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product already exists: {0}")]
    ProductAlreadyExists(String),

    #[error("Product is archived: {0}")]
    ProductArchived(String),

    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid minimum threshold: {0}")]
    InvalidThreshold(String),

    #[error(
        "Insufficient stock for product {code}: {available} unit(s) available, {requested} requested"
    )]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    #[error("Ledger validation failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
