use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type ProductId = Uuid;

/// A catalog entry for a tracked item. Stock levels never live here:
/// they are derived by folding the movement ledger. Retired products are
/// archived rather than deleted so their ledger history stays intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Short unique code (SKU) used to address the product from the CLI
    pub code: String,
    pub name: String,
    pub category: String,
    /// Reorder threshold; 0 disables low-stock classification
    pub minimum: i64,
    /// Average purchase cost per unit, in cents
    pub unit_cost: Cents,
    /// Sale price per unit, in cents
    pub sale_price: Cents,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(code: String, name: String, category: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            name,
            category,
            minimum: 0,
            unit_cost: 0,
            sale_price: 0,
            description: None,
            created_at: Utc::now(),
            archived_at: None,
        }
    }

    pub fn with_minimum(mut self, minimum: i64) -> Self {
        self.minimum = minimum;
        self
    }

    pub fn with_unit_cost(mut self, unit_cost: Cents) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    pub fn with_sale_price(mut self, sale_price: Cents) -> Self {
        self.sale_price = sale_price;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}
