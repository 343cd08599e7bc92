use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Product, ProductId};

/// Raw counters collected by the storage layer for an integrity pass.
#[derive(Debug, Clone, Default)]
pub struct LedgerStats {
    pub product_count: i64,
    pub movement_count: i64,
    pub units_in: i64,
    pub units_out: i64,
    /// Holes in the movement sequence numbering
    pub sequence_gaps: i64,
    /// Movements referencing a product that no longer exists
    pub orphan_movements: i64,
    /// Stored movements with a non-positive quantity
    pub invalid_quantities: i64,
}

/// Result of a ledger health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub product_count: i64,
    pub movement_count: i64,
    pub units_in: i64,
    pub units_out: i64,
    pub net_units: i64,
    pub overdrawn_products: i64,
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Build an integrity report from storage stats plus the derived quantity
/// of every product. Structural problems (sequence gaps, orphan movements,
/// invalid stored quantities) and overdrawn products all surface as issues;
/// overdrawn products are reported here regardless of the snapshot policy
/// in effect.
pub fn build_integrity_report(
    stats: &LedgerStats,
    products: &[Product],
    quantities: &HashMap<ProductId, i64>,
) -> IntegrityReport {
    let mut issues = Vec::new();

    if stats.sequence_gaps > 0 {
        issues.push(format!(
            "{} gap(s) in the movement sequence",
            stats.sequence_gaps
        ));
    }
    if stats.orphan_movements > 0 {
        issues.push(format!(
            "{} movement(s) reference a missing product",
            stats.orphan_movements
        ));
    }
    if stats.invalid_quantities > 0 {
        issues.push(format!(
            "{} movement(s) carry a non-positive quantity",
            stats.invalid_quantities
        ));
    }

    let mut overdrawn_products = 0;
    for product in products {
        let quantity = quantities.get(&product.id).copied().unwrap_or(0);
        if quantity < 0 {
            overdrawn_products += 1;
            issues.push(format!(
                "product '{}' is overdrawn: {} unit(s) more issued than received",
                product.code, -quantity
            ));
        }
    }

    IntegrityReport {
        product_count: stats.product_count,
        movement_count: stats.movement_count,
        units_in: stats.units_in,
        units_out: stats.units_out,
        net_units: stats.units_in - stats.units_out,
        overdrawn_products,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_product(code: &str) -> Product {
        Product::new(code.into(), format!("Product {}", code), "misc".into())
    }

    #[test]
    fn test_healthy_ledger() {
        let stats = LedgerStats {
            product_count: 2,
            movement_count: 5,
            units_in: 120,
            units_out: 80,
            ..LedgerStats::default()
        };
        let products = vec![make_product("A-1"), make_product("B-2")];
        let mut quantities = HashMap::new();
        quantities.insert(products[0].id, 30);
        quantities.insert(products[1].id, 10);

        let report = build_integrity_report(&stats, &products, &quantities);

        assert!(report.is_healthy());
        assert_eq!(report.net_units, 40);
        assert_eq!(report.overdrawn_products, 0);
    }

    #[test]
    fn test_overdrawn_product_is_an_issue() {
        let stats = LedgerStats {
            product_count: 1,
            movement_count: 2,
            units_in: 5,
            units_out: 9,
            ..LedgerStats::default()
        };
        let products = vec![make_product("A-1")];
        let mut quantities = HashMap::new();
        quantities.insert(products[0].id, -4);

        let report = build_integrity_report(&stats, &products, &quantities);

        assert!(!report.is_healthy());
        assert_eq!(report.overdrawn_products, 1);
        assert!(report.issues[0].contains("A-1"));
        assert!(report.issues[0].contains("4 unit(s)"));
    }

    #[test]
    fn test_structural_issues_are_reported() {
        let stats = LedgerStats {
            product_count: 1,
            movement_count: 10,
            units_in: 50,
            units_out: 20,
            sequence_gaps: 2,
            orphan_movements: 1,
            invalid_quantities: 3,
        };
        let products = vec![make_product("A-1")];
        let quantities = HashMap::new();

        let report = build_integrity_report(&stats, &products, &quantities);

        assert_eq!(report.issues.len(), 3);
        assert!(!report.is_healthy());
    }

    #[test]
    fn test_product_without_movements_is_not_overdrawn() {
        let stats = LedgerStats {
            product_count: 1,
            ..LedgerStats::default()
        };
        let products = vec![make_product("A-1")];
        let quantities = HashMap::new();

        let report = build_integrity_report(&stats, &products, &quantities);

        assert!(report.is_healthy());
    }
}
