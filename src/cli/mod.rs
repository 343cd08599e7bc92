use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::application::{InventoryService, MovementFilter, SortField, StockQuery};
use crate::domain::{
    format_cents, parse_cents, Direction, NegativeStock, SnapshotPolicy, StockStatus,
    ValuationBasis,
};

/// Scorta - Warehouse Stock Ledger
#[derive(Parser)]
#[command(name = "scorta")]
#[command(about = "A local-first inventory tool built on an append-only stock ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "scorta.db")]
    pub database: String,

    /// Price used to value stock: unit-cost, sale-price
    #[arg(long, global = true, default_value = "unit-cost")]
    pub valuation: String,

    /// Handling of negative stock levels: display, clamp, reject
    #[arg(long, global = true, default_value = "display")]
    pub negative_stock: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Product catalog commands
    #[command(subcommand)]
    Product(ProductCommands),

    /// Record goods received into stock
    Receive {
        /// Product code
        code: String,

        /// Number of units received
        quantity: i64,

        /// Note describing the movement
        #[arg(short, long)]
        note: Option<String>,

        /// External reference (delivery note, order number)
        #[arg(short, long)]
        reference: Option<String>,

        /// Date of the movement (ISO 8601 format: YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record goods issued out of stock
    Issue {
        /// Product code
        code: String,

        /// Number of units issued
        quantity: i64,

        /// Note describing the movement
        #[arg(short, long)]
        note: Option<String>,

        /// External reference (picking list, order number)
        #[arg(short, long)]
        reference: Option<String>,

        /// Force the issue even if it overdraws the stock level
        #[arg(long)]
        force: bool,

        /// Date of the movement (ISO 8601 format: YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List recent movements
    Movements {
        /// Filter by product code
        #[arg(long)]
        product: Option<String>,

        /// Filter by direction: in, out
        #[arg(long)]
        direction: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Maximum number of movements to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show current stock levels for all active products
    Stock {
        /// Case-insensitive search over code, name and category
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by status: ok, warning, critical
        #[arg(long)]
        status: Option<String>,

        /// Sort column: code, name, category, quantity, minimum,
        /// unit-price, sale-price, total-value, status
        #[arg(long, default_value = "name")]
        sort: String,

        /// Sort in descending order
        #[arg(long)]
        desc: bool,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Generate reports and analytics
    #[command(subcommand)]
    Report(ReportCommands),

    /// List products at or below their minimum threshold
    Alerts {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Verify ledger integrity
    Check,
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Register a new product
    Create {
        /// Product code (must be unique)
        code: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Category (e.g., "electronics", "consumables")
        #[arg(short, long)]
        category: String,

        /// Minimum threshold quantity (0 disables low-stock alerts)
        #[arg(short, long, default_value = "0")]
        minimum: i64,

        /// Average purchase cost per unit (e.g., "12.50" or "12")
        #[arg(long, default_value = "0")]
        unit_cost: String,

        /// Sale price per unit (e.g., "19.90" or "19")
        #[arg(long, default_value = "0")]
        sale_price: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List all products
    List {
        /// Include archived products
        #[arg(long)]
        all: bool,
    },

    /// Show detailed product information
    Show {
        /// Product code
        code: String,
    },

    /// Archive a product (soft delete)
    Archive {
        /// Product code
        code: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Stock totals and status tier counts
    Overview {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Stock valuation per category
    Categories {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Movement activity over a date range
    Activity {
        /// Start date (YYYY-MM-DD, defaults to start of current month)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        to: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

impl Cli {
    fn snapshot_policy(&self) -> Result<SnapshotPolicy> {
        let valuation: ValuationBasis = self.valuation.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid valuation basis '{}'. Valid: unit-cost, sale-price. Error: {}",
                self.valuation,
                e
            )
        })?;

        let negative_stock: NegativeStock = self.negative_stock.parse().map_err(|e| {
            anyhow::anyhow!(
                "Invalid negative-stock policy '{}'. Valid: display, clamp, reject. Error: {}",
                self.negative_stock,
                e
            )
        })?;

        Ok(SnapshotPolicy {
            valuation,
            negative_stock,
        })
    }

    pub async fn run(self) -> Result<()> {
        let policy = self.snapshot_policy()?;

        match self.command {
            Commands::Init => {
                InventoryService::init(&self.database, policy).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Product(product_cmd) => {
                let service = InventoryService::connect(&self.database, policy).await?;
                run_product_command(&service, product_cmd).await?;
            }

            Commands::Receive {
                code,
                quantity,
                note,
                reference,
                date,
            } => {
                let service = InventoryService::connect(&self.database, policy).await?;

                // Parse date or use now
                let timestamp = match date {
                    Some(date_str) => parse_date(&date_str).with_context(|| {
                        format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                    })?,
                    None => Utc::now(),
                };

                let result = service
                    .record_movement(
                        &code,
                        Direction::In,
                        quantity,
                        timestamp,
                        note,
                        reference,
                        false,
                    )
                    .await?;

                println!(
                    "Received {} x {} (now {} on hand)",
                    result.movement.quantity, result.product.name, result.quantity_after
                );
                if self.verbose {
                    eprintln!(
                        "[ledger] movement {} recorded at sequence {}",
                        result.movement.id, result.movement.sequence
                    );
                }
            }

            Commands::Issue {
                code,
                quantity,
                note,
                reference,
                force,
                date,
            } => {
                let service = InventoryService::connect(&self.database, policy).await?;

                let timestamp = match date {
                    Some(date_str) => parse_date(&date_str).with_context(|| {
                        format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                    })?,
                    None => Utc::now(),
                };

                let result = service
                    .record_movement(
                        &code,
                        Direction::Out,
                        quantity,
                        timestamp,
                        note,
                        reference,
                        force,
                    )
                    .await?;

                println!(
                    "Issued {} x {} (now {} on hand)",
                    result.movement.quantity, result.product.name, result.quantity_after
                );
                if result.quantity_after < 0 {
                    eprintln!(
                        "Warning: stock level for '{}' is now negative",
                        result.product.code
                    );
                }
                if self.verbose {
                    eprintln!(
                        "[ledger] movement {} recorded at sequence {}",
                        result.movement.id, result.movement.sequence
                    );
                }
            }

            Commands::Movements {
                product,
                direction,
                from_date,
                to_date,
                limit,
            } => {
                let service = InventoryService::connect(&self.database, policy).await?;
                run_movements_command(&service, product, direction, from_date, to_date, limit)
                    .await?;
            }

            Commands::Stock {
                search,
                status,
                sort,
                desc,
                format,
            } => {
                let service = InventoryService::connect(&self.database, policy).await?;
                run_stock_command(&service, search, status, &sort, desc, &format).await?;
            }

            Commands::Report(report_cmd) => {
                let service = InventoryService::connect(&self.database, policy).await?;
                run_report_command(&service, report_cmd).await?;
            }

            Commands::Alerts { format } => {
                let service = InventoryService::connect(&self.database, policy).await?;
                run_alerts_command(&service, &format).await?;
            }

            Commands::Check => {
                let service = InventoryService::connect(&self.database, policy).await?;
                run_check_command(&service).await?;
            }
        }

        Ok(())
    }
}

async fn run_product_command(service: &InventoryService, cmd: ProductCommands) -> Result<()> {
    match cmd {
        ProductCommands::Create {
            code,
            name,
            category,
            minimum,
            unit_cost,
            sale_price,
            description,
        } => {
            let unit_cost_cents =
                parse_cents(&unit_cost).context("Invalid unit cost format. Use '12.50' or '12'")?;
            let sale_price_cents = parse_cents(&sale_price)
                .context("Invalid sale price format. Use '19.90' or '19'")?;

            let product = service
                .create_product(
                    code,
                    name,
                    category,
                    minimum,
                    unit_cost_cents,
                    sale_price_cents,
                    description,
                )
                .await?;
            println!("Created product: {} ({})", product.code, product.name);
        }

        ProductCommands::List { all } => {
            let products = service.list_products(all).await?;
            if products.is_empty() {
                println!("No products found.");
            } else {
                println!(
                    "{:<12} {:<24} {:<15} {:>8}",
                    "CODE", "NAME", "CATEGORY", "MINIMUM"
                );
                println!("{}", "-".repeat(62));
                for product in products {
                    println!(
                        "{:<12} {:<24} {:<15} {:>8}",
                        product.code,
                        truncate(&product.name, 24),
                        truncate(&product.category, 15),
                        product.minimum
                    );
                }
            }
        }

        ProductCommands::Show { code } => {
            let info = service.get_product_info(&code).await?;
            let product = &info.product;
            let snapshot = &info.snapshot;

            println!("Product: {}", product.name);
            println!("  ID:            {}", product.id);
            println!("  Code:          {}", product.code);
            println!("  Category:      {}", product.category);
            println!("  Minimum:       {}", product.minimum);
            println!("  Unit cost:     {}", format_cents(product.unit_cost));
            println!("  Sale price:    {}", format_cents(product.sale_price));
            if let Some(desc) = &product.description {
                println!("  Description:   {}", desc);
            }
            println!(
                "  Created:       {}",
                product.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(archived) = product.archived_at {
                println!("  Archived:      {}", archived.format("%Y-%m-%d %H:%M:%S"));
            }
            println!();
            println!(
                "  On hand:       {} ({})",
                snapshot.quantity,
                snapshot.status.as_str()
            );
            println!("  Stock value:   {}", format_cents(snapshot.total_value));
            println!(
                "  Movements:     {} ({} in, {} out)",
                info.received_count + info.issued_count,
                info.received_count,
                info.issued_count
            );
            if let Some(last) = info.last_activity {
                println!("  Last activity: {}", last.format("%Y-%m-%d %H:%M:%S"));
            }
        }

        ProductCommands::Archive { code } => {
            service.archive_product(&code).await?;
            println!("Archived product: {}", code);
        }
    }
    Ok(())
}

async fn run_movements_command(
    service: &InventoryService,
    product: Option<String>,
    direction: Option<String>,
    from_date: Option<String>,
    to_date: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    // Parse filters
    let direction_parsed = direction
        .map(|s| s.parse::<Direction>())
        .transpose()
        .context("Invalid direction")?;
    let from_date_parsed = from_date
        .map(|s| parse_date(&s))
        .transpose()
        .context("Invalid from-date")?;
    let to_date_parsed = to_date
        .map(|s| parse_date(&s))
        .transpose()
        .context("Invalid to-date")?;

    let filter = MovementFilter {
        product,
        direction: direction_parsed,
        from_date: from_date_parsed,
        to_date: to_date_parsed,
        limit,
    };

    let movements = service.list_movements_filtered(filter).await?;

    if movements.is_empty() {
        println!("No movements found.");
    } else {
        let codes = service.get_product_codes().await?;

        println!(
            "{:<6} {:<12} {:<4} {:>8} {:<12} NOTE",
            "SEQ", "DATE", "DIR", "QTY", "PRODUCT"
        );
        println!("{}", "-".repeat(70));

        // Newest first in the query so the limit keeps recent entries;
        // display oldest first
        for movement in movements.iter().rev() {
            let code = codes
                .get(&movement.product_id)
                .map(|s| s.as_str())
                .unwrap_or("?");
            let date = movement.timestamp.format("%Y-%m-%d");
            let note = movement.note.as_deref().unwrap_or("");

            println!(
                "{:<6} {:<12} {:<4} {:>8} {:<12} {}",
                movement.sequence,
                date,
                movement.direction.as_str(),
                movement.quantity,
                truncate(code, 12),
                truncate(note, 24)
            );
        }
    }
    Ok(())
}

async fn run_stock_command(
    service: &InventoryService,
    search: Option<String>,
    status: Option<String>,
    sort: &str,
    descending: bool,
    format: &str,
) -> Result<()> {
    let status_parsed = status
        .map(|s| s.parse::<StockStatus>())
        .transpose()
        .context("Invalid status filter")?;
    let sort_field: SortField = sort
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid sort field '{}'. Error: {}", sort, e))?;

    let query = StockQuery {
        search,
        status: status_parsed,
        sort: sort_field,
        descending,
    };

    let snapshots = service.list_stock(&query).await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&snapshots)?);
        }
        _ => {
            // Table format
            if snapshots.is_empty() {
                println!("No products found.");
            } else {
                println!(
                    "{:<12} {:<24} {:>8} {:>8} {:>12} {:<8}",
                    "CODE", "NAME", "QTY", "MIN", "VALUE", "STATUS"
                );
                println!("{}", "-".repeat(78));
                for snapshot in &snapshots {
                    println!(
                        "{:<12} {:<24} {:>8} {:>8} {:>12} {:<8}",
                        snapshot.code,
                        truncate(&snapshot.name, 24),
                        snapshot.quantity,
                        snapshot.minimum,
                        format_cents(snapshot.total_value),
                        snapshot.status.as_str()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_report_command(service: &InventoryService, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::Overview { format } => {
            let report = service.get_overview().await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                _ => {
                    // Table format
                    println!("Stock Overview");
                    println!("As of: {}", report.as_of.format("%Y-%m-%d %H:%M:%S"));
                    println!();
                    println!("Products:     {:>10}", report.product_count);
                    println!("Total units:  {:>10}", report.total_units);
                    println!("Stock value:  {:>10}", format_cents(report.total_value));
                    println!();
                    println!("By status:");
                    println!("  ok:         {:>10}", report.ok_count);
                    println!("  warning:    {:>10}", report.warning_count);
                    println!("  critical:   {:>10}", report.critical_count);
                }
            }
        }

        ReportCommands::Categories { format } => {
            let report = service.get_category_report().await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                _ => {
                    // Table format
                    println!("Stock by Category");
                    println!("As of: {}", report.as_of.format("%Y-%m-%d %H:%M:%S"));
                    println!();

                    if report.categories.is_empty() {
                        println!("No stock recorded.");
                    } else {
                        println!(
                            "{:<18} {:>8} {:>8} {:>12} {:>8}",
                            "CATEGORY", "PRODUCTS", "UNITS", "VALUE", "SHARE"
                        );
                        println!("{}", "-".repeat(60));
                        for category in &report.categories {
                            println!(
                                "{:<18} {:>8} {:>8} {:>12} {:>7.1}%",
                                truncate(&category.category, 18),
                                category.product_count,
                                category.total_units,
                                format_cents(category.total_value),
                                category.percentage
                            );
                        }
                        println!("{}", "-".repeat(60));
                        println!(
                            "{:<18} {:>8} {:>8} {:>12}",
                            "TOTAL",
                            "",
                            "",
                            format_cents(report.total_value)
                        );
                    }
                }
            }
        }

        ReportCommands::Activity { from, to, format } => {
            let (from_date, to_date) = parse_date_range(from, to)?;
            let report = service.get_activity_report(from_date, to_date).await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                _ => {
                    // Table format
                    println!("Movement Activity");
                    println!(
                        "Period: {} to {}",
                        from_date.format("%Y-%m-%d"),
                        to_date.format("%Y-%m-%d")
                    );
                    println!();
                    println!("Movements:      {:>10}", report.movement_count);
                    println!("Units received: {:>10}", report.units_received);
                    println!("Units issued:   {:>10}", report.units_issued);
                    println!("{}", "-".repeat(26));
                    println!("Net change:     {:>10}", report.net_units);
                }
            }
        }
    }

    Ok(())
}

async fn run_alerts_command(service: &InventoryService, format: &str) -> Result<()> {
    let alerts = service.get_alerts().await?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&alerts)?);
        }
        _ => {
            // Table format
            if alerts.is_empty() {
                println!("All stock levels are above their minimums.");
            } else {
                println!(
                    "{:<12} {:<24} {:>8} {:>8} {:>10} {:<8}",
                    "CODE", "NAME", "QTY", "MIN", "SHORTFALL", "STATUS"
                );
                println!("{}", "-".repeat(76));
                for alert in &alerts {
                    println!(
                        "{:<12} {:<24} {:>8} {:>8} {:>10} {:<8}",
                        alert.code,
                        truncate(&alert.name, 24),
                        alert.quantity,
                        alert.minimum,
                        alert.shortfall,
                        alert.status.as_str()
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_check_command(service: &InventoryService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Products:  {}", report.product_count);
    println!("Movements: {}", report.movement_count);
    println!();

    println!("Units moved:");
    println!("  {:<10} {:>12}", "In:", report.units_in);
    println!("  {:<10} {:>12}", "Out:", report.units_out);
    println!("  {}", "-".repeat(23));
    println!("  {:<10} {:>12}", "Net:", report.net_units);
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

/// Shorten a string to at most `max_len` characters for table columns.
/// Counts characters rather than bytes so accented names never split
/// inside a multibyte character.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{}...", cut)
    }
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    use chrono::NaiveDate;

    let naive_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .context("Date must be in YYYY-MM-DD format")?;

    // Midnight UTC
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    Ok(naive_datetime.and_utc())
}

fn parse_date_range(
    from: Option<String>,
    to: Option<String>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    use chrono::Datelike;

    let now = Utc::now();

    // Default to_date is now
    let to_date = match to {
        Some(date_str) => parse_date(&date_str)?,
        None => now,
    };

    // Default from_date is start of current month
    let from_date = match from {
        Some(date_str) => parse_date(&date_str)?,
        None => now
            .date_naive()
            .with_day(1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc(),
    };

    Ok((from_date, to_date))
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn test_truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("Copy Paper A4", 24), "Copy Paper A4");
        assert_eq!(truncate("Métricos", 24), "Métricos");
    }

    #[test]
    fn test_truncate_cuts_long_strings() {
        let cut = truncate("A very long product name indeed", 24);
        assert_eq!(cut, "A very long product n...");
        assert_eq!(cut.chars().count(), 24);
    }

    #[test]
    fn test_truncate_accented_name_on_char_boundary() {
        // The cut lands on the accented character
        let cut = truncate("Caixa de Parafusos Métricos", 24);
        assert_eq!(cut, "Caixa de Parafusos Mé...");
        assert_eq!(cut.chars().count(), 24);
    }
}
