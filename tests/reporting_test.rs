mod common;

use anyhow::Result;
use common::{parse_date, test_service, WarehouseCatalog};
use scorta::domain::{Direction, StockStatus};

#[tokio::test]
async fn test_overview_counts_status_tiers() -> Result<()> {
    let (service, _temp) = test_service().await?;
    WarehouseCatalog::create_basic(&service).await?;

    // NB-200: 50 > 20 -> ok
    // MS-10:  no movements -> critical
    // PPR-A4: 10 <= 25 -> warning
    WarehouseCatalog::receive_now(&service, "NB-200", 50).await?;
    WarehouseCatalog::receive_now(&service, "PPR-A4", 10).await?;

    let overview = service.get_overview().await?;

    assert_eq!(overview.product_count, 3);
    assert_eq!(overview.total_units, 60);
    // 50 x 1500.00 + 10 x 4.50
    assert_eq!(overview.total_value, 7_504_500);
    assert_eq!(overview.ok_count, 1);
    assert_eq!(overview.warning_count, 1);
    assert_eq!(overview.critical_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_category_report_groups_and_shares() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service
        .create_product(
            "T-1".into(),
            "Claw Hammer".into(),
            "tools".into(),
            0,
            100,
            0,
            None,
        )
        .await?;
    service
        .create_product(
            "S-1".into(),
            "Ball Bearing".into(),
            "spares".into(),
            0,
            100,
            0,
            None,
        )
        .await?;

    WarehouseCatalog::receive_now(&service, "T-1", 30).await?;
    WarehouseCatalog::receive_now(&service, "S-1", 10).await?;

    let report = service.get_category_report().await?;

    assert_eq!(report.total_value, 4_000);
    assert_eq!(report.categories.len(), 2);

    // Largest value first
    assert_eq!(report.categories[0].category, "tools");
    assert_eq!(report.categories[0].product_count, 1);
    assert_eq!(report.categories[0].total_units, 30);
    assert_eq!(report.categories[0].total_value, 3_000);
    assert!((report.categories[0].percentage - 75.0).abs() < 0.01);

    assert_eq!(report.categories[1].category, "spares");
    assert!((report.categories[1].percentage - 25.0).abs() < 0.01);

    Ok(())
}

#[tokio::test]
async fn test_activity_report_respects_date_window() -> Result<()> {
    let (service, _temp) = test_service().await?;
    WarehouseCatalog::create_basic(&service).await?;

    WarehouseCatalog::receive(&service, "NB-200", 30, parse_date("2024-01-05")).await?;
    service
        .record_movement(
            "NB-200",
            Direction::Out,
            10,
            parse_date("2024-01-20"),
            None,
            None,
            false,
        )
        .await?;
    WarehouseCatalog::receive(&service, "NB-200", 40, parse_date("2024-02-03")).await?;

    let report = service
        .get_activity_report(parse_date("2024-01-01"), parse_date("2024-02-01"))
        .await?;

    assert_eq!(report.movement_count, 2, "February movement is excluded");
    assert_eq!(report.units_received, 30);
    assert_eq!(report.units_issued, 10);
    assert_eq!(report.net_units, 20);

    Ok(())
}

#[tokio::test]
async fn test_activity_report_includes_movements_on_the_end_date() -> Result<()> {
    let (service, _temp) = test_service().await?;
    WarehouseCatalog::create_basic(&service).await?;

    WarehouseCatalog::receive(&service, "NB-200", 30, parse_date("2024-03-15")).await?;

    let report = service
        .get_activity_report(parse_date("2024-03-01"), parse_date("2024-03-15"))
        .await?;

    assert_eq!(report.movement_count, 1, "end date is inclusive");
    assert_eq!(report.units_received, 30);

    // The movements filter sees the same window
    let filter = scorta::application::MovementFilter {
        from_date: Some(parse_date("2024-03-01")),
        to_date: Some(parse_date("2024-03-15")),
        ..Default::default()
    };
    let movements = service.list_movements_filtered(filter).await?;
    assert_eq!(movements.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_alerts_sorted_by_urgency() -> Result<()> {
    let (service, _temp) = test_service().await?;
    WarehouseCatalog::create_basic(&service).await?;

    // NB-200 healthy, MS-10 empty (critical, shortfall 40),
    // PPR-A4 low (warning, shortfall 15)
    WarehouseCatalog::receive_now(&service, "NB-200", 50).await?;
    WarehouseCatalog::receive_now(&service, "PPR-A4", 10).await?;

    let alerts = service.get_alerts().await?;

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].code, "MS-10");
    assert_eq!(alerts[0].status, StockStatus::Critical);
    assert_eq!(alerts[0].shortfall, 40);
    assert_eq!(alerts[1].code, "PPR-A4");
    assert_eq!(alerts[1].status, StockStatus::Warning);
    assert_eq!(alerts[1].shortfall, 15);

    Ok(())
}

#[tokio::test]
async fn test_no_alerts_when_stock_is_healthy() -> Result<()> {
    let (service, _temp) = test_service().await?;
    WarehouseCatalog::create_basic(&service).await?;

    WarehouseCatalog::receive_now(&service, "NB-200", 100).await?;
    WarehouseCatalog::receive_now(&service, "MS-10", 100).await?;
    WarehouseCatalog::receive_now(&service, "PPR-A4", 100).await?;

    let alerts = service.get_alerts().await?;
    assert!(alerts.is_empty());

    Ok(())
}
