// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use scorta::application::InventoryService;
use scorta::domain::{Direction, SnapshotPolicy};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(InventoryService, TempDir)> {
    test_service_with_policy(SnapshotPolicy::default()).await
}

/// Helper to create a test service with an explicit snapshot policy
pub async fn test_service_with_policy(
    policy: SnapshotPolicy,
) -> Result<(InventoryService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = InventoryService::init(db_path.to_str().unwrap(), policy).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: small warehouse catalog
pub struct WarehouseCatalog;

impl WarehouseCatalog {
    /// Create the basic catalog: two electronics items and one consumable.
    /// NB-200: minimum 20, unit cost 1500.00, sale price 2499.00
    /// MS-10:  minimum 40, unit cost 15.00, sale price 29.90
    /// PPR-A4: minimum 25, unit cost 4.50, sale price 6.00
    pub async fn create_basic(service: &InventoryService) -> Result<()> {
        service
            .create_product(
                "NB-200".into(),
                "Notebook 200".into(),
                "electronics".into(),
                20,
                150_000,
                249_900,
                None,
            )
            .await?;
        service
            .create_product(
                "MS-10".into(),
                "Wireless Mouse".into(),
                "electronics".into(),
                40,
                1_500,
                2_990,
                None,
            )
            .await?;
        service
            .create_product(
                "PPR-A4".into(),
                "Copy Paper A4".into(),
                "consumables".into(),
                25,
                450,
                600,
                None,
            )
            .await?;
        Ok(())
    }

    /// Receive units into stock with an explicit date
    pub async fn receive(
        service: &InventoryService,
        code: &str,
        quantity: i64,
        date: DateTime<Utc>,
    ) -> Result<()> {
        service
            .record_movement(code, Direction::In, quantity, date, None, None, false)
            .await?;
        Ok(())
    }

    /// Receive units with the current timestamp
    pub async fn receive_now(service: &InventoryService, code: &str, quantity: i64) -> Result<()> {
        Self::receive(service, code, quantity, Utc::now()).await
    }

    /// Issue units with the current timestamp
    pub async fn issue_now(service: &InventoryService, code: &str, quantity: i64) -> Result<()> {
        service
            .record_movement(code, Direction::Out, quantity, Utc::now(), None, None, false)
            .await?;
        Ok(())
    }
}
