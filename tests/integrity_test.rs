mod common;

use anyhow::Result;
use chrono::Utc;
use common::{test_service, WarehouseCatalog};
use scorta::domain::Direction;

#[tokio::test]
async fn test_empty_database_is_healthy() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let report = service.check_integrity().await?;

    assert!(report.is_healthy());
    assert_eq!(report.product_count, 0);
    assert_eq!(report.movement_count, 0);
    assert_eq!(report.net_units, 0);

    Ok(())
}

#[tokio::test]
async fn test_healthy_ledger_passes() -> Result<()> {
    let (service, _temp) = test_service().await?;
    WarehouseCatalog::create_basic(&service).await?;

    WarehouseCatalog::receive_now(&service, "NB-200", 30).await?;
    WarehouseCatalog::receive_now(&service, "MS-10", 80).await?;
    WarehouseCatalog::issue_now(&service, "NB-200", 12).await?;

    let report = service.check_integrity().await?;

    assert!(report.is_healthy(), "issues: {:?}", report.issues);
    assert_eq!(report.product_count, 3);
    assert_eq!(report.movement_count, 3);
    assert_eq!(report.units_in, 110);
    assert_eq!(report.units_out, 12);
    assert_eq!(report.net_units, 98);
    assert_eq!(report.overdrawn_products, 0);

    Ok(())
}

#[tokio::test]
async fn test_overdrawn_product_is_flagged() -> Result<()> {
    let (service, _temp) = test_service().await?;
    WarehouseCatalog::create_basic(&service).await?;

    WarehouseCatalog::receive_now(&service, "NB-200", 5).await?;
    service
        .record_movement("NB-200", Direction::Out, 9, Utc::now(), None, None, true)
        .await?;

    let report = service.check_integrity().await?;

    assert!(!report.is_healthy());
    assert_eq!(report.overdrawn_products, 1);
    assert_eq!(report.issues.len(), 1);
    assert!(report.issues[0].contains("NB-200"));
    assert!(report.issues[0].contains("4 unit(s)"));

    Ok(())
}

#[tokio::test]
async fn test_archived_history_still_counted() -> Result<()> {
    let (service, _temp) = test_service().await?;
    WarehouseCatalog::create_basic(&service).await?;

    WarehouseCatalog::receive_now(&service, "PPR-A4", 40).await?;
    service.archive_product("PPR-A4").await?;

    let report = service.check_integrity().await?;

    assert!(report.is_healthy());
    assert_eq!(report.product_count, 3, "archived products are included");
    assert_eq!(report.movement_count, 1);
    assert_eq!(report.units_in, 40);

    Ok(())
}
