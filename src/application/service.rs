use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    build_integrity_report, Cents, Direction, IntegrityReport, Movement, Product, ProductId,
    SnapshotPolicy, StockSnapshot, StockStatus,
};
use crate::storage::Repository;

use super::reporting::{
    build_alerts, build_category_report, build_overview, ActivityReport, CategoryReport,
    StockAlert, StockOverview,
};
use super::AppError;

/// Application service providing high-level operations for the stock
/// ledger. This is the primary interface for any client (CLI, API, TUI).
pub struct InventoryService {
    repo: Repository,
    policy: SnapshotPolicy,
}

/// Result of recording a movement
#[derive(Debug)]
pub struct MovementResult {
    pub movement: Movement,
    pub product: Product,
    /// Derived quantity after the movement, recomputed from the ledger
    pub quantity_after: i64,
}

/// Detailed product information
#[derive(Debug)]
pub struct ProductInfo {
    pub product: Product,
    pub snapshot: StockSnapshot,
    pub received_count: i64,
    pub issued_count: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Filter for querying movements
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub product: Option<String>,
    pub direction: Option<Direction>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Filter and ordering for stock listings
#[derive(Debug, Clone)]
pub struct StockQuery {
    /// Case-insensitive substring match over code, name and category
    pub search: Option<String>,
    pub status: Option<StockStatus>,
    pub sort: SortField,
    pub descending: bool,
}

impl Default for StockQuery {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            sort: SortField::Name,
            descending: false,
        }
    }
}

/// Sortable columns of the stock listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Code,
    Name,
    Category,
    Quantity,
    Minimum,
    UnitPrice,
    SalePrice,
    TotalValue,
    Status,
}

impl std::str::FromStr for SortField {
    type Err = ParseSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "code" => Ok(SortField::Code),
            "name" => Ok(SortField::Name),
            "category" => Ok(SortField::Category),
            "quantity" => Ok(SortField::Quantity),
            "minimum" => Ok(SortField::Minimum),
            "unit-price" => Ok(SortField::UnitPrice),
            "sale-price" => Ok(SortField::SalePrice),
            "total-value" => Ok(SortField::TotalValue),
            "status" => Ok(SortField::Status),
            _ => Err(ParseSortError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSortError(String);

impl std::fmt::Display for ParseSortError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown sort field '{}' (expected code, name, category, quantity, minimum, \
             unit-price, sale-price, total-value or status)",
            self.0
        )
    }
}

impl std::error::Error for ParseSortError {}

impl InventoryService {
    /// Create a new inventory service with the given repository and
    /// snapshot policy.
    pub fn new(repo: Repository, policy: SnapshotPolicy) -> Self {
        Self { repo, policy }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, policy: SnapshotPolicy) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, policy))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, policy: SnapshotPolicy) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, policy))
    }

    // ========================
    // Catalog operations
    // ========================

    /// Register a new product in the catalog.
    pub async fn create_product(
        &self,
        code: String,
        name: String,
        category: String,
        minimum: i64,
        unit_cost: Cents,
        sale_price: Cents,
        description: Option<String>,
    ) -> Result<Product, AppError> {
        if code.trim().is_empty() {
            return Err(AppError::InvalidProduct("Code must not be empty".to_string()));
        }
        if name.trim().is_empty() {
            return Err(AppError::InvalidProduct("Name must not be empty".to_string()));
        }
        if minimum < 0 {
            return Err(AppError::InvalidThreshold(
                "Minimum must not be negative".to_string(),
            ));
        }
        if unit_cost < 0 || sale_price < 0 {
            return Err(AppError::InvalidPrice(
                "Prices must not be negative".to_string(),
            ));
        }

        // Codes address products from the CLI, so they must be unique
        if self.repo.get_product_by_code(&code).await?.is_some() {
            return Err(AppError::ProductAlreadyExists(code));
        }

        let mut product = Product::new(code, name, category)
            .with_minimum(minimum)
            .with_unit_cost(unit_cost)
            .with_sale_price(sale_price);
        if let Some(desc) = description {
            product = product.with_description(desc);
        }

        self.repo.save_product(&product).await?;
        Ok(product)
    }

    /// Get a product by code.
    pub async fn get_product(&self, code: &str) -> Result<Product, AppError> {
        self.repo
            .get_product_by_code(code)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(code.to_string()))
    }

    /// Get detailed product information including its current snapshot.
    pub async fn get_product_info(&self, code: &str) -> Result<ProductInfo, AppError> {
        let product = self.get_product(code).await?;
        let quantity = self.repo.compute_quantity(product.id).await?;
        let snapshot = StockSnapshot::build(&product, quantity, &self.policy)?;
        let (received_count, issued_count) =
            self.repo.count_movements_for_product(product.id).await?;
        let last_activity = self.repo.get_last_activity(product.id).await?;

        Ok(ProductInfo {
            product,
            snapshot,
            received_count,
            issued_count,
            last_activity,
        })
    }

    /// List all products.
    pub async fn list_products(&self, include_archived: bool) -> Result<Vec<Product>, AppError> {
        Ok(self.repo.list_products(include_archived).await?)
    }

    /// Archive a product. Its ledger history stays; it just stops
    /// accepting movements and disappears from stock views.
    pub async fn archive_product(&self, code: &str) -> Result<Product, AppError> {
        let product = self.get_product(code).await?;
        if product.is_archived() {
            return Err(AppError::ProductArchived(code.to_string()));
        }
        self.repo.archive_product(product.id).await?;
        Ok(product)
    }

    // ========================
    // Movement operations
    // ========================

    /// Append a movement to the ledger.
    pub async fn record_movement(
        &self,
        code: &str,
        direction: Direction,
        quantity: i64,
        timestamp: DateTime<Utc>,
        note: Option<String>,
        reference: Option<String>,
        force: bool,
    ) -> Result<MovementResult, AppError> {
        if quantity <= 0 {
            return Err(AppError::InvalidQuantity(
                "Quantity must be positive".to_string(),
            ));
        }

        let product = self.get_product(code).await?;
        if product.is_archived() {
            return Err(AppError::ProductArchived(code.to_string()));
        }

        // Issuing more than is on hand needs --force; forced issues are
        // how negative quantities legitimately enter the ledger
        if direction == Direction::Out && !force {
            let available = self.repo.compute_quantity(product.id).await?;
            if available < quantity {
                return Err(AppError::InsufficientStock {
                    code: code.to_string(),
                    available,
                    requested: quantity,
                });
            }
        }

        let mut movement = Movement::new(product.id, direction, quantity, timestamp);
        if let Some(note) = note {
            movement = movement.with_note(note);
        }
        if let Some(reference) = reference {
            movement = movement.with_reference(reference);
        }

        self.repo.save_movement(&mut movement).await?;
        let quantity_after = self.repo.compute_quantity(product.id).await?;

        Ok(MovementResult {
            movement,
            product,
            quantity_after,
        })
    }

    /// List movements, optionally restricted to one product.
    pub async fn list_movements(&self, code: Option<&str>) -> Result<Vec<Movement>, AppError> {
        match code {
            Some(code) => {
                let product = self.get_product(code).await?;
                Ok(self.repo.list_movements_for_product(product.id).await?)
            }
            None => Ok(self.repo.list_movements().await?),
        }
    }

    /// Map of product id to code, for movement listings.
    pub async fn get_product_codes(&self) -> Result<HashMap<ProductId, String>, AppError> {
        let products = self.repo.list_products(true).await?;
        Ok(products
            .into_iter()
            .map(|product| (product.id, product.code))
            .collect())
    }

    /// List movements with filters.
    pub async fn list_movements_filtered(
        &self,
        filter: MovementFilter,
    ) -> Result<Vec<Movement>, AppError> {
        // Resolve product code to ID if provided
        let product_id = if let Some(code) = &filter.product {
            Some(self.get_product(code).await?.id)
        } else {
            None
        };

        Ok(self
            .repo
            .list_movements_filtered(
                product_id,
                filter.direction,
                filter.from_date,
                filter.to_date,
                filter.limit,
            )
            .await?)
    }

    // ========================
    // Stock operations
    // ========================

    /// Current snapshot for a single product.
    pub async fn get_snapshot(&self, code: &str) -> Result<StockSnapshot, AppError> {
        let product = self.get_product(code).await?;
        let quantity = self.repo.compute_quantity(product.id).await?;
        Ok(StockSnapshot::build(&product, quantity, &self.policy)?)
    }

    /// Snapshots for all active products, filtered and sorted by the query.
    pub async fn list_stock(&self, query: &StockQuery) -> Result<Vec<StockSnapshot>, AppError> {
        let products = self.repo.list_products(false).await?;
        let quantities = self.repo.compute_all_quantities().await?;

        let mut snapshots = Vec::with_capacity(products.len());
        for product in &products {
            let quantity = quantities.get(&product.id).copied().unwrap_or(0);
            snapshots.push(StockSnapshot::build(product, quantity, &self.policy)?);
        }

        Ok(apply_query(snapshots, query))
    }

    // ========================
    // Reporting operations
    // ========================

    /// Dashboard overview across all active products.
    pub async fn get_overview(&self) -> Result<StockOverview, AppError> {
        let snapshots = self.list_stock(&StockQuery::default()).await?;
        Ok(build_overview(&snapshots, Utc::now()))
    }

    /// Per-category stock valuation.
    pub async fn get_category_report(&self) -> Result<CategoryReport, AppError> {
        let snapshots = self.list_stock(&StockQuery::default()).await?;
        Ok(build_category_report(&snapshots, Utc::now()))
    }

    /// Movement activity between two dates.
    pub async fn get_activity_report(
        &self,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<ActivityReport, AppError> {
        let (movement_count, units_received, units_issued) =
            self.repo.movement_totals_between(from_date, to_date).await?;

        Ok(ActivityReport {
            from_date,
            to_date,
            movement_count,
            units_received,
            units_issued,
            net_units: units_received - units_issued,
        })
    }

    /// Products at or below their minimum threshold, most urgent first.
    pub async fn get_alerts(&self) -> Result<Vec<StockAlert>, AppError> {
        let snapshots = self.list_stock(&StockQuery::default()).await?;
        Ok(build_alerts(&snapshots))
    }

    // ========================
    // Integrity operations
    // ========================

    /// Check ledger integrity and return a report. Archived products are
    /// included: their history is still part of the ledger.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let stats = self.repo.get_integrity_stats().await?;
        let products = self.repo.list_products(true).await?;
        let quantities = self.repo.compute_all_quantities().await?;

        Ok(build_integrity_report(&stats, &products, &quantities))
    }
}

/// Apply search, status filter and ordering to a snapshot list.
fn apply_query(mut snapshots: Vec<StockSnapshot>, query: &StockQuery) -> Vec<StockSnapshot> {
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        snapshots.retain(|snapshot| {
            snapshot.name.to_lowercase().contains(&needle)
                || snapshot.code.to_lowercase().contains(&needle)
                || snapshot.category.to_lowercase().contains(&needle)
        });
    }

    if let Some(status) = query.status {
        snapshots.retain(|snapshot| snapshot.status == status);
    }

    snapshots.sort_by(|a, b| {
        let ordering = match query.sort {
            SortField::Code => a.code.to_lowercase().cmp(&b.code.to_lowercase()),
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Category => a.category.to_lowercase().cmp(&b.category.to_lowercase()),
            SortField::Quantity => a.quantity.cmp(&b.quantity),
            SortField::Minimum => a.minimum.cmp(&b.minimum),
            SortField::UnitPrice => a.unit_price.cmp(&b.unit_price),
            SortField::SalePrice => a.sale_price.cmp(&b.sale_price),
            SortField::TotalValue => a.total_value.cmp(&b.total_value),
            SortField::Status => a.status.severity().cmp(&b.status.severity()),
        };
        if query.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    snapshots
}
