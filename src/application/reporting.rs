use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Cents, StockSnapshot, StockStatus};

// Report DTOs serialize camelCase: they are the JSON surface of the crate,
// shared with the per-product snapshot records.

/// Dashboard headline numbers, all derived from one snapshot set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOverview {
    pub as_of: DateTime<Utc>,
    pub product_count: i64,
    pub total_units: i64,
    pub total_value: Cents,
    pub ok_count: i64,
    pub warning_count: i64,
    pub critical_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub as_of: DateTime<Utc>,
    pub categories: Vec<CategorySummary>,
    pub total_value: Cents,
}

/// Stock valuation of one category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub product_count: i64,
    pub total_units: i64,
    pub total_value: Cents,
    pub percentage: f64,
}

/// Movement activity over a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReport {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub movement_count: i64,
    pub units_received: i64,
    pub units_issued: i64,
    pub net_units: i64,
}

/// A product at or below its minimum threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub code: String,
    pub name: String,
    pub quantity: i64,
    pub minimum: i64,
    pub shortfall: i64,
    pub status: StockStatus,
}

/// Fold a snapshot set into the dashboard overview.
pub fn build_overview(snapshots: &[StockSnapshot], as_of: DateTime<Utc>) -> StockOverview {
    let mut overview = StockOverview {
        as_of,
        product_count: snapshots.len() as i64,
        total_units: 0,
        total_value: 0,
        ok_count: 0,
        warning_count: 0,
        critical_count: 0,
    };

    for snapshot in snapshots {
        overview.total_units += snapshot.quantity;
        overview.total_value += snapshot.total_value;
        match snapshot.status {
            StockStatus::Ok => overview.ok_count += 1,
            StockStatus::Warning => overview.warning_count += 1,
            StockStatus::Critical => overview.critical_count += 1,
        }
    }

    overview
}

/// Group snapshots by category and total their valuation. Categories are
/// sorted by value, largest first.
pub fn build_category_report(snapshots: &[StockSnapshot], as_of: DateTime<Utc>) -> CategoryReport {
    let mut grouped: BTreeMap<&str, CategorySummary> = BTreeMap::new();

    for snapshot in snapshots {
        let entry = grouped
            .entry(snapshot.category.as_str())
            .or_insert_with(|| CategorySummary {
                category: snapshot.category.clone(),
                product_count: 0,
                total_units: 0,
                total_value: 0,
                percentage: 0.0,
            });
        entry.product_count += 1;
        entry.total_units += snapshot.quantity;
        entry.total_value += snapshot.total_value;
    }

    let total_value: Cents = grouped.values().map(|summary| summary.total_value).sum();

    let mut categories: Vec<CategorySummary> = grouped.into_values().collect();
    for summary in &mut categories {
        summary.percentage = if total_value != 0 {
            (summary.total_value as f64 / total_value as f64) * 100.0
        } else {
            0.0
        };
    }
    categories.sort_by(|a, b| b.total_value.cmp(&a.total_value));

    CategoryReport {
        as_of,
        categories,
        total_value,
    }
}

/// Products at or below their threshold, most urgent first: critical
/// before warning, larger shortfalls before smaller ones.
pub fn build_alerts(snapshots: &[StockSnapshot]) -> Vec<StockAlert> {
    let mut alerts: Vec<StockAlert> = snapshots
        .iter()
        .filter(|snapshot| snapshot.status != StockStatus::Ok)
        .map(|snapshot| StockAlert {
            code: snapshot.code.clone(),
            name: snapshot.name.clone(),
            quantity: snapshot.quantity,
            minimum: snapshot.minimum,
            shortfall: snapshot.shortfall(),
            status: snapshot.status,
        })
        .collect();

    alerts.sort_by(|a, b| {
        b.status
            .severity()
            .cmp(&a.status.severity())
            .then(b.shortfall.cmp(&a.shortfall))
            .then(a.code.cmp(&b.code))
    });

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Product, SnapshotPolicy};

    fn snapshot(code: &str, category: &str, minimum: i64, quantity: i64) -> StockSnapshot {
        let product = Product::new(code.into(), format!("Product {}", code), category.into())
            .with_minimum(minimum)
            .with_unit_cost(100);
        StockSnapshot::build(&product, quantity, &SnapshotPolicy::default()).unwrap()
    }

    #[test]
    fn test_build_overview_counts_tiers() {
        let snapshots = vec![
            snapshot("A-1", "tools", 20, 50),  // ok
            snapshot("B-2", "tools", 20, 15),  // warning
            snapshot("C-3", "spares", 20, 5),  // critical
            snapshot("D-4", "spares", 20, 3),  // critical
        ];

        let overview = build_overview(&snapshots, Utc::now());

        assert_eq!(overview.product_count, 4);
        assert_eq!(overview.total_units, 73);
        assert_eq!(overview.total_value, 7300);
        assert_eq!(overview.ok_count, 1);
        assert_eq!(overview.warning_count, 1);
        assert_eq!(overview.critical_count, 2);
    }

    #[test]
    fn test_build_category_report_percentages() {
        let snapshots = vec![
            snapshot("A-1", "tools", 0, 30),
            snapshot("B-2", "spares", 0, 10),
        ];

        let report = build_category_report(&snapshots, Utc::now());

        assert_eq!(report.total_value, 4000);
        assert_eq!(report.categories.len(), 2);
        // Largest value first
        assert_eq!(report.categories[0].category, "tools");
        assert!((report.categories[0].percentage - 75.0).abs() < f64::EPSILON);
        assert!((report.categories[1].percentage - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_build_category_report_empty() {
        let report = build_category_report(&[], Utc::now());
        assert_eq!(report.total_value, 0);
        assert!(report.categories.is_empty());
    }

    #[test]
    fn test_build_alerts_orders_by_urgency() {
        let snapshots = vec![
            snapshot("OK-1", "tools", 20, 100),
            snapshot("WARN-1", "tools", 20, 12), // warning, shortfall 8
            snapshot("CRIT-1", "tools", 20, 5),  // critical, shortfall 15
            snapshot("CRIT-2", "tools", 40, 2),  // critical, shortfall 38
        ];

        let alerts = build_alerts(&snapshots);

        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].code, "CRIT-2");
        assert_eq!(alerts[1].code, "CRIT-1");
        assert_eq!(alerts[2].code, "WARN-1");
        assert_eq!(alerts[0].shortfall, 38);
    }
}
