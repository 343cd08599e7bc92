use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProductId;

pub type MovementId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Goods received into stock
    In,
    /// Goods issued out of stock
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    /// Sign applied to the quantity when folding the ledger
    pub fn sign(&self) -> i64 {
        match self {
            Direction::In => 1,
            Direction::Out => -1,
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDirectionError(String);

impl std::fmt::Display for ParseDirectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown movement direction '{}' (expected 'in' or 'out')",
            self.0
        )
    }
}

impl std::error::Error for ParseDirectionError {}

/// A movement is one ledger entry: a batch of units entering or leaving
/// stock. Movements are immutable and append-only - mistakes are corrected
/// by recording a compensating movement in the opposite direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    /// Monotonically increasing sequence number for ordering
    pub sequence: i64,
    pub product_id: ProductId,
    pub direction: Direction,
    /// Number of units moved (always positive)
    pub quantity: i64,
    /// When the goods actually moved (may be back-dated)
    pub timestamp: DateTime<Utc>,
    /// When we recorded this movement in the system
    pub recorded_at: DateTime<Utc>,
    /// Human-readable note
    pub note: Option<String>,
    /// External reference (delivery note, order number, etc.)
    pub reference: Option<String>,
}

impl Movement {
    /// Create a new movement. Sequence number must be assigned by the repository.
    pub fn new(
        product_id: ProductId,
        direction: Direction,
        quantity: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        assert!(quantity > 0, "Movement quantity must be positive");
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Will be set by repository
            product_id,
            direction,
            quantity,
            timestamp,
            recorded_at: Utc::now(),
            note: None,
            reference: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Quantity with the direction's sign applied: positive for receipts,
    /// negative for issues.
    pub fn signed_quantity(&self) -> i64 {
        self.direction.sign() * self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_roundtrip() {
        for direction in [Direction::In, Direction::Out] {
            let s = direction.as_str();
            let parsed: Direction = s.parse().unwrap();
            assert_eq!(direction, parsed);
        }
    }

    #[test]
    fn test_direction_parse_rejects_unknown() {
        let result = "sideways".parse::<Direction>();
        assert!(result.is_err());
    }

    #[test]
    fn test_create_movement() {
        let product_id = Uuid::new_v4();
        let movement = Movement::new(product_id, Direction::In, 30, Utc::now())
            .with_note("Initial delivery")
            .with_reference("DN-4411");

        assert_eq!(movement.product_id, product_id);
        assert_eq!(movement.quantity, 30);
        assert_eq!(movement.direction, Direction::In);
        assert_eq!(movement.note, Some("Initial delivery".to_string()));
        assert_eq!(movement.reference, Some("DN-4411".to_string()));
        assert_eq!(movement.sequence, 0);
    }

    #[test]
    fn test_signed_quantity() {
        let product_id = Uuid::new_v4();
        let receipt = Movement::new(product_id, Direction::In, 12, Utc::now());
        let issue = Movement::new(product_id, Direction::Out, 7, Utc::now());

        assert_eq!(receipt.signed_quantity(), 12);
        assert_eq!(issue.signed_quantity(), -7);
    }

    #[test]
    #[should_panic(expected = "Movement quantity must be positive")]
    fn test_movement_requires_positive_quantity() {
        Movement::new(Uuid::new_v4(), Direction::In, 0, Utc::now());
    }
}
