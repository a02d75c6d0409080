use crate::core::label::{BondType, CreditRating};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A bond held in the firm's own collateral inventory.
///
/// Owned collateral is what the desk can pledge without borrowing.
/// The allocation engine prices external borrowing only, so bonds are
/// reported alongside a deal but never enter its cost.
///
/// # Examples
///
/// ```
/// use repo_borrow_engine::core::bond::Bond;
/// use repo_borrow_engine::core::label::{BondType, CreditRating};
/// use rust_decimal_macros::dec;
///
/// let bond = Bond::new(
///     "C-001",
///     BondType::new("Treasury"),
///     CreditRating::new("AAA"),
///     250,
///     dec!(99.5),
/// );
///
/// assert_eq!(bond.market_value(), dec!(24875.0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BondRecord")]
pub struct Bond {
    id: String,
    bond_type: BondType,
    credit_rating: CreditRating,
    quantity: u64,
    /// Unit price in currency units. Never negative.
    price: Decimal,
}

impl Bond {
    /// Create a new collateral bond.
    ///
    /// # Panics
    ///
    /// Panics if `price` is negative.
    pub fn new(
        id: impl Into<String>,
        bond_type: BondType,
        credit_rating: CreditRating,
        quantity: u64,
        price: Decimal,
    ) -> Self {
        assert!(
            price >= Decimal::ZERO,
            "Bond price must be non-negative, got {}",
            price
        );
        Self {
            id: id.into(),
            bond_type,
            credit_rating,
            quantity,
            price,
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bond_type(&self) -> &BondType {
        &self.bond_type
    }

    pub fn credit_rating(&self) -> &CreditRating {
        &self.credit_rating
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Quantity times unit price.
    pub fn market_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

#[derive(Deserialize)]
struct BondRecord {
    id: String,
    bond_type: BondType,
    credit_rating: CreditRating,
    quantity: u64,
    price: Decimal,
}

impl TryFrom<BondRecord> for Bond {
    type Error = String;

    fn try_from(record: BondRecord) -> Result<Self, Self::Error> {
        if record.price < Decimal::ZERO {
            return Err(format!("bond price must be non-negative, got {}", record.price));
        }
        Ok(Bond::new(
            record.id,
            record.bond_type,
            record.credit_rating,
            record.quantity,
            record.price,
        ))
    }
}

impl fmt::Display for Bond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bond {} ({}/{}) qty {} @ {} = {}",
            self.id,
            self.credit_rating,
            self.bond_type,
            self.quantity,
            self.price,
            self.market_value()
        )
    }
}

/// The firm's owned collateral, in load order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollateralInventory {
    bonds: Vec<Bond>,
}

impl CollateralInventory {
    pub fn new() -> Self {
        Self { bonds: Vec::new() }
    }

    pub fn add(&mut self, bond: Bond) {
        self.bonds.push(bond);
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Total market value of all bonds.
    pub fn total_market_value(&self) -> Decimal {
        self.bonds.iter().map(|b| b.market_value()).sum()
    }

    /// Market value grouped by credit rating.
    pub fn value_by_rating(&self) -> BTreeMap<CreditRating, Decimal> {
        let mut out = BTreeMap::new();
        for bond in &self.bonds {
            *out.entry(bond.credit_rating().clone())
                .or_insert(Decimal::ZERO) += bond.market_value();
        }
        out
    }

    /// Market value grouped by bond type.
    pub fn value_by_type(&self) -> BTreeMap<BondType, Decimal> {
        let mut out = BTreeMap::new();
        for bond in &self.bonds {
            *out.entry(bond.bond_type().clone())
                .or_insert(Decimal::ZERO) += bond.market_value();
        }
        out
    }
}

impl FromIterator<Bond> for CollateralInventory {
    fn from_iter<T: IntoIterator<Item = Bond>>(iter: T) -> Self {
        Self {
            bonds: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CollateralInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Collateral Inventory ===")?;
        for bond in &self.bonds {
            writeln!(f, "  {}", bond)?;
        }
        writeln!(f, "Bonds:        {}", self.len())?;
        writeln!(f, "Market Value: {}", self.total_market_value())?;

        writeln!(f, "\nBy Rating:")?;
        for (rating, value) in self.value_by_rating() {
            writeln!(f, "  {}: {}", rating, value)?;
        }
        writeln!(f, "\nBy Type:")?;
        for (bond_type, value) in self.value_by_type() {
            writeln!(f, "  {}: {}", bond_type, value)?;
        }
        Ok(())
    }
}
