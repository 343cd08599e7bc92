use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{Direction, LedgerStats, Movement, Product, ProductId};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_INDEXES};

/// Repository for persisting the product catalog and the movement ledger.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_INDEXES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Product operations
    // ========================

    /// Save a new product to the database.
    pub async fn save_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, code, name, category, minimum, unit_cost, sale_price, description, created_at, archived_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product.id.to_string())
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.minimum)
        .bind(product.unit_cost)
        .bind(product.sale_price)
        .bind(&product.description)
        .bind(product.created_at.to_rfc3339())
        .bind(product.archived_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save product")?;
        Ok(())
    }

    /// Get a product by ID.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, name, category, minimum, unit_cost, sale_price, description, created_at, archived_at
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch product")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_product(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a product by code.
    pub async fn get_product_by_code(&self, code: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, name, category, minimum, unit_cost, sale_price, description, created_at, archived_at
            FROM products
            WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch product by code")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_product(&row)?)),
            None => Ok(None),
        }
    }

    /// List all products (optionally including archived).
    pub async fn list_products(&self, include_archived: bool) -> Result<Vec<Product>> {
        let query = if include_archived {
            "SELECT id, code, name, category, minimum, unit_cost, sale_price, description, created_at, archived_at FROM products ORDER BY name"
        } else {
            "SELECT id, code, name, category, minimum, unit_cost, sale_price, description, created_at, archived_at FROM products WHERE archived_at IS NULL ORDER BY name"
        };

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list products")?;

        rows.iter().map(Self::row_to_product).collect()
    }

    /// Archive a product (soft delete).
    pub async fn archive_product(&self, id: ProductId) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE products SET archived_at = ? WHERE id = ?")
            .bind(&now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to archive product")?;
        Ok(())
    }

    fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");
        let archived_at_str: Option<String> = row.get("archived_at");

        Ok(Product {
            id: Uuid::parse_str(&id_str).context("Invalid product ID")?,
            code: row.get("code"),
            name: row.get("name"),
            category: row.get("category"),
            minimum: row.get("minimum"),
            unit_cost: row.get("unit_cost"),
            sale_price: row.get("sale_price"),
            description: row.get("description"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            archived_at: archived_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid archived_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    // ========================
    // Movement operations
    // ========================

    /// Save a new movement to the database.
    /// Automatically assigns the next sequence number.
    pub async fn save_movement(&self, movement: &mut Movement) -> Result<()> {
        // Get and increment sequence number atomically
        let sequence = self.next_sequence().await?;
        movement.sequence = sequence;

        sqlx::query(
            r#"
            INSERT INTO movements (id, sequence, product_id, direction, quantity, timestamp, recorded_at, note, reference)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movement.id.to_string())
        .bind(movement.sequence)
        .bind(movement.product_id.to_string())
        .bind(movement.direction.as_str())
        .bind(movement.quantity)
        .bind(movement.timestamp.to_rfc3339())
        .bind(movement.recorded_at.to_rfc3339())
        .bind(&movement.note)
        .bind(&movement.reference)
        .execute(&self.pool)
        .await
        .context("Failed to save movement")?;

        Ok(())
    }

    /// Get the next sequence number and increment the counter.
    async fn next_sequence(&self) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'movement_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    /// List all movements, newest first.
    pub async fn list_movements(&self) -> Result<Vec<Movement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sequence, product_id, direction, quantity, timestamp, recorded_at, note, reference
            FROM movements
            ORDER BY sequence DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list movements")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    /// List movements for a specific product, newest first.
    pub async fn list_movements_for_product(&self, product_id: ProductId) -> Result<Vec<Movement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sequence, product_id, direction, quantity, timestamp, recorded_at, note, reference
            FROM movements
            WHERE product_id = ?
            ORDER BY sequence DESC
            "#,
        )
        .bind(product_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list movements for product")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    /// List movements with optional filters, newest first.
    pub async fn list_movements_filtered(
        &self,
        product_id: Option<ProductId>,
        direction: Option<Direction>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<Movement>> {
        // Build query dynamically based on filters
        let mut query = String::from(
            "SELECT id, sequence, product_id, direction, quantity, timestamp, recorded_at, note, reference FROM movements WHERE 1=1"
        );

        // Collect all string bindings first so they live long enough
        let product_id_str = product_id.map(|id| id.to_string());
        let from_date_str = from_date.map(|dt| dt.to_rfc3339());
        let to_date_str = to_date.map(|dt| dt.to_rfc3339());

        if product_id.is_some() {
            query.push_str(" AND product_id = ?");
        }
        if direction.is_some() {
            query.push_str(" AND direction = ?");
        }
        if from_date.is_some() {
            query.push_str(" AND timestamp >= ?");
        }
        if to_date.is_some() {
            query.push_str(" AND timestamp <= ?");
        }

        query.push_str(" ORDER BY sequence DESC");

        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        // Build the query with bindings
        let mut sql_query = sqlx::query(&query);

        if let Some(ref pid_str) = product_id_str {
            sql_query = sql_query.bind(pid_str);
        }
        if let Some(dir) = direction {
            sql_query = sql_query.bind(dir.as_str());
        }
        if let Some(ref fd_str) = from_date_str {
            sql_query = sql_query.bind(fd_str);
        }
        if let Some(ref td_str) = to_date_str {
            sql_query = sql_query.bind(td_str);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list filtered movements")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    /// Compute the derived quantity for a product using SQL aggregation.
    /// This is more efficient than loading all movements and folding in
    /// memory; the signed sum matches the domain fold.
    pub async fn compute_quantity(&self, product_id: ProductId) -> Result<i64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(CASE WHEN direction = 'in' THEN quantity ELSE -quantity END), 0) as quantity
            FROM movements
            WHERE product_id = ?
            "#,
        )
        .bind(product_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute quantity")?;

        Ok(row.get("quantity"))
    }

    /// Compute quantities for all products in a single query.
    /// Returns a map of product_id -> quantity. Products with no movements
    /// won't be in the map (quantity = 0).
    pub async fn compute_all_quantities(
        &self,
    ) -> Result<std::collections::HashMap<ProductId, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT
                product_id,
                SUM(CASE WHEN direction = 'in' THEN quantity ELSE -quantity END) as quantity
            FROM movements
            GROUP BY product_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute all quantities")?;

        let mut quantities = std::collections::HashMap::new();
        for row in rows {
            let product_id_str: String = row.get("product_id");
            let quantity: i64 = row.get("quantity");
            let product_id = Uuid::parse_str(&product_id_str).context("Invalid product ID")?;
            quantities.insert(product_id, quantity);
        }

        Ok(quantities)
    }

    /// Count movements for a product (receipts and issues separately).
    pub async fn count_movements_for_product(&self, product_id: ProductId) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN direction = 'in' THEN 1 ELSE 0 END), 0) as received,
                COALESCE(SUM(CASE WHEN direction = 'out' THEN 1 ELSE 0 END), 0) as issued
            FROM movements
            WHERE product_id = ?
            "#,
        )
        .bind(product_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to count movements")?;

        Ok((row.get("received"), row.get("issued")))
    }

    /// Get the last movement timestamp for a product.
    pub async fn get_last_activity(&self, product_id: ProductId) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            r#"
            SELECT MAX(timestamp) as last_activity
            FROM movements
            WHERE product_id = ?
            "#,
        )
        .bind(product_id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to get last activity")?;

        let last_activity_str: Option<String> = row.get("last_activity");
        match last_activity_str {
            Some(s) => Ok(Some(
                DateTime::parse_from_rfc3339(&s)
                    .context("Invalid timestamp")?
                    .with_timezone(&Utc),
            )),
            None => Ok(None),
        }
    }

    /// Movement totals within a date range, both bounds inclusive so the
    /// window agrees with the movement listing filters:
    /// (movement count, units received, units issued).
    pub async fn movement_totals_between(
        &self,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<(i64, i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as movement_count,
                COALESCE(SUM(CASE WHEN direction = 'in' THEN quantity ELSE 0 END), 0) as units_received,
                COALESCE(SUM(CASE WHEN direction = 'out' THEN quantity ELSE 0 END), 0) as units_issued
            FROM movements
            WHERE timestamp >= ? AND timestamp <= ?
            "#,
        )
        .bind(from_date.to_rfc3339())
        .bind(to_date.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum movements in range")?;

        Ok((
            row.get("movement_count"),
            row.get("units_received"),
            row.get("units_issued"),
        ))
    }

    // ========================
    // Integrity operations
    // ========================

    /// Collect raw counters for an integrity check.
    pub async fn get_integrity_stats(&self) -> Result<LedgerStats> {
        // Count products
        let product_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM products")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        // Count movements and total units per direction
        let totals = sqlx::query(
            r#"
            SELECT
                COUNT(*) as count,
                COALESCE(SUM(CASE WHEN direction = 'in' THEN quantity ELSE 0 END), 0) as units_in,
                COALESCE(SUM(CASE WHEN direction = 'out' THEN quantity ELSE 0 END), 0) as units_out
            FROM movements
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let movement_count: i64 = totals.get("count");
        let units_in: i64 = totals.get("units_in");
        let units_out: i64 = totals.get("units_out");

        // Check for sequence gaps
        let sequence_check = sqlx::query(
            r#"
            SELECT
                MIN(sequence) as min_seq,
                MAX(sequence) as max_seq,
                COUNT(*) as count
            FROM movements
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let min_seq: Option<i64> = sequence_check.get("min_seq");
        let max_seq: Option<i64> = sequence_check.get("max_seq");
        let count: i64 = sequence_check.get("count");

        let sequence_gaps = match (min_seq, max_seq) {
            (Some(min), Some(max)) => ((max - min + 1) - count).max(0),
            _ => 0,
        };

        // Check for movements referencing missing products
        let orphan_movements: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM movements m
            WHERE NOT EXISTS (SELECT 1 FROM products p WHERE p.id = m.product_id)
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        // Check for invalid quantities
        let invalid_quantities: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM movements
            WHERE quantity <= 0
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok(LedgerStats {
            product_count,
            movement_count,
            units_in,
            units_out,
            sequence_gaps,
            orphan_movements,
            invalid_quantities,
        })
    }

    fn row_to_movement(row: &sqlx::sqlite::SqliteRow) -> Result<Movement> {
        let id_str: String = row.get("id");
        let product_id_str: String = row.get("product_id");
        let direction_str: String = row.get("direction");
        let timestamp_str: String = row.get("timestamp");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(Movement {
            id: Uuid::parse_str(&id_str).context("Invalid movement ID")?,
            sequence: row.get("sequence"),
            product_id: Uuid::parse_str(&product_id_str).context("Invalid product ID")?,
            direction: direction_str.parse::<Direction>()?,
            quantity: row.get("quantity"),
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
                .context("Invalid recorded_at")?
                .with_timezone(&Utc),
            note: row.get("note"),
            reference: row.get("reference"),
        })
    }
}
