use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Cents, Movement, MovementId, Product, ProductId};

/// Critical threshold divisor: a product is critical when
/// `quantity * CRITICAL_FACTOR_DIVISOR <= minimum`, i.e. when stock falls
/// to a quarter of the minimum or below. Equivalent to a critical factor
/// of 0.25, kept in integer arithmetic so the boundary is exact.
pub const CRITICAL_FACTOR_DIVISOR: i64 = 4;

/// Classification of a product's stock level against its minimum threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Ok,
    Warning,
    Critical,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Ok => "ok",
            StockStatus::Warning => "warning",
            StockStatus::Critical => "critical",
        }
    }

    /// Rank for sorting: higher means worse. Critical sorts before warning
    /// in alert listings.
    pub fn severity(&self) -> u8 {
        match self {
            StockStatus::Ok => 0,
            StockStatus::Warning => 1,
            StockStatus::Critical => 2,
        }
    }
}

impl std::str::FromStr for StockStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" => Ok(StockStatus::Ok),
            "warning" => Ok(StockStatus::Warning),
            "critical" => Ok(StockStatus::Critical),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError(String);

impl std::fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown stock status '{}' (expected 'ok', 'warning' or 'critical')",
            self.0
        )
    }
}

impl std::error::Error for ParseStatusError {}

/// Which product price field extends a quantity into a stock value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValuationBasis {
    /// Value stock at average purchase cost
    UnitCost,
    /// Value stock at sale price
    SalePrice,
}

impl ValuationBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValuationBasis::UnitCost => "unit-cost",
            ValuationBasis::SalePrice => "sale-price",
        }
    }
}

impl std::str::FromStr for ValuationBasis {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unit-cost" => Ok(ValuationBasis::UnitCost),
            "sale-price" => Ok(ValuationBasis::SalePrice),
            _ => Err(ParsePolicyError {
                value: s.to_string(),
                expected: "'unit-cost' or 'sale-price'",
            }),
        }
    }
}

impl std::fmt::Display for ValuationBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do when the ledger folds to a negative quantity (more units
/// issued than received).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeStock {
    /// Report the negative quantity as computed
    Display,
    /// Floor quantity (and value) at zero
    Clamp,
    /// Fail snapshot construction with a validation error
    Reject,
}

impl NegativeStock {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegativeStock::Display => "display",
            NegativeStock::Clamp => "clamp",
            NegativeStock::Reject => "reject",
        }
    }
}

impl std::str::FromStr for NegativeStock {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "display" => Ok(NegativeStock::Display),
            "clamp" => Ok(NegativeStock::Clamp),
            "reject" => Ok(NegativeStock::Reject),
            _ => Err(ParsePolicyError {
                value: s.to_string(),
                expected: "'display', 'clamp' or 'reject'",
            }),
        }
    }
}

impl std::fmt::Display for NegativeStock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError {
    value: String,
    expected: &'static str,
}

impl std::fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown value '{}' (expected {})", self.value, self.expected)
    }
}

impl std::error::Error for ParsePolicyError {}

/// Snapshot construction settings. Built once at process start and passed
/// in explicitly; there is no module-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    pub valuation: ValuationBasis,
    pub negative_stock: NegativeStock,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            valuation: ValuationBasis::UnitCost,
            negative_stock: NegativeStock::Display,
        }
    }
}

/// Classify a derived quantity against a product's minimum threshold.
///
/// Boundaries are inclusive: a quantity exactly at the minimum is a
/// warning, exactly at a quarter of the minimum is critical. A minimum of
/// 0 disables classification and always reads ok.
pub fn classify_stock(quantity: i64, minimum: i64) -> StockStatus {
    if minimum <= 0 {
        return StockStatus::Ok;
    }
    if quantity * CRITICAL_FACTOR_DIVISOR <= minimum {
        StockStatus::Critical
    } else if quantity <= minimum {
        StockStatus::Warning
    } else {
        StockStatus::Ok
    }
}

/// Compute the current quantity for a single product from a list of
/// movements. Quantity = sum of received units - sum of issued units.
/// The fold is commutative, so movement order does not matter.
pub fn compute_quantity(
    product_id: ProductId,
    movements: &[Movement],
) -> Result<i64, SnapshotError> {
    let mut quantity = 0;
    for movement in movements.iter().filter(|m| m.product_id == product_id) {
        quantity += validated_signed_quantity(movement)?;
    }
    Ok(quantity)
}

/// Compute quantities for every product that appears in a list of
/// movements. Returns a map of product_id -> quantity.
pub fn compute_all_quantities(
    movements: &[Movement],
) -> Result<HashMap<ProductId, i64>, SnapshotError> {
    let mut quantities: HashMap<ProductId, i64> = HashMap::new();
    for movement in movements {
        *quantities.entry(movement.product_id).or_insert(0) +=
            validated_signed_quantity(movement)?;
    }
    Ok(quantities)
}

/// A movement with a negative stored quantity would silently corrupt the
/// sum, so the fold rejects it instead of including it.
fn validated_signed_quantity(movement: &Movement) -> Result<i64, SnapshotError> {
    if movement.quantity < 0 {
        return Err(SnapshotError::NegativeMovementQuantity {
            movement: movement.id,
            quantity: movement.quantity,
        });
    }
    Ok(movement.signed_quantity())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// A stored movement carries a negative quantity
    NegativeMovementQuantity { movement: MovementId, quantity: i64 },
    /// The fold produced a negative quantity and the policy rejects it
    NegativeStock { product: ProductId, quantity: i64 },
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::NegativeMovementQuantity { movement, quantity } => {
                write!(
                    f,
                    "movement {} carries a negative quantity ({})",
                    movement, quantity
                )
            }
            SnapshotError::NegativeStock { product, quantity } => {
                write!(
                    f,
                    "product {} has negative stock ({}): more units issued than received",
                    product, quantity
                )
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Derived stock view for one product. Never stored: always recomputed
/// from the catalog entry plus the movement ledger, so the displayed
/// quantity cannot diverge from the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub category: String,
    pub minimum: i64,
    /// Average purchase cost per unit, in cents
    pub unit_price: Cents,
    /// Sale price per unit, in cents
    pub sale_price: Cents,
    pub quantity: i64,
    /// Quantity times the policy's valuation price, in cents
    pub total_value: Cents,
    pub status: StockStatus,
}

impl StockSnapshot {
    /// Build a snapshot from a product and its already-folded quantity,
    /// applying the policy's negative-stock handling and valuation basis.
    pub fn build(
        product: &Product,
        quantity: i64,
        policy: &SnapshotPolicy,
    ) -> Result<Self, SnapshotError> {
        let quantity = match policy.negative_stock {
            NegativeStock::Display => quantity,
            NegativeStock::Clamp => quantity.max(0),
            NegativeStock::Reject if quantity < 0 => {
                return Err(SnapshotError::NegativeStock {
                    product: product.id,
                    quantity,
                });
            }
            NegativeStock::Reject => quantity,
        };
        let valuation_price = match policy.valuation {
            ValuationBasis::UnitCost => product.unit_cost,
            ValuationBasis::SalePrice => product.sale_price,
        };

        Ok(Self {
            id: product.id,
            code: product.code.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            minimum: product.minimum,
            unit_price: product.unit_cost,
            sale_price: product.sale_price,
            quantity,
            total_value: quantity * valuation_price,
            status: classify_stock(quantity, product.minimum),
        })
    }

    /// Units missing to reach the minimum threshold; 0 at or above it.
    pub fn shortfall(&self) -> i64 {
        (self.minimum - self.quantity).max(0)
    }
}

/// Fold one product's movements into its snapshot.
///
/// The storage layer computes the same signed sum in SQL and feeds it to
/// [`StockSnapshot::build`] directly; this in-memory fold defines the
/// semantics both paths must agree on.
pub fn snapshot_product(
    product: &Product,
    movements: &[Movement],
    policy: &SnapshotPolicy,
) -> Result<StockSnapshot, SnapshotError> {
    let quantity = compute_quantity(product.id, movements)?;
    StockSnapshot::build(product, quantity, policy)
}

/// Fold a movement list into snapshots for every given product. Products
/// with no movements snapshot at quantity 0. Bulk reads use the SQL
/// equivalent ([`Repository::compute_all_quantities`]) instead of loading
/// the full ledger.
///
/// [`Repository::compute_all_quantities`]: crate::storage::Repository::compute_all_quantities
pub fn snapshot_all(
    products: &[Product],
    movements: &[Movement],
    policy: &SnapshotPolicy,
) -> Result<Vec<StockSnapshot>, SnapshotError> {
    let quantities = compute_all_quantities(movements)?;
    products
        .iter()
        .map(|product| {
            let quantity = quantities.get(&product.id).copied().unwrap_or(0);
            StockSnapshot::build(product, quantity, policy)
        })
        .collect()
}
