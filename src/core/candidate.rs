use crate::core::label::{BondType, CreditRating};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest borrow rate accepted, in percent.
pub const MAX_BORROW_RATE: Decimal = dec!(1_000_000);

/// A bond that can be borrowed from the external market.
///
/// `borrow_rate` is a percentage per 100 of borrowed value: `1.75`
/// means borrowing $100 costs $1.75. Candidates carry no capacity; the
/// market is assumed to lend any amount at the quoted rate.
///
/// # Examples
///
/// ```
/// use repo_borrow_engine::core::candidate::BorrowCandidate;
/// use repo_borrow_engine::core::label::{BondType, CreditRating};
/// use rust_decimal_macros::dec;
///
/// let candidate = BorrowCandidate::new(
///     "M-17",
///     BondType::new("Municipal"),
///     CreditRating::new("AA"),
///     dec!(1.75),
/// );
///
/// assert_eq!(candidate.cost_of(dec!(10_000)), dec!(175));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BorrowCandidateRecord")]
pub struct BorrowCandidate {
    id: String,
    bond_type: BondType,
    credit_rating: CreditRating,
    borrow_rate: Decimal,
}

impl BorrowCandidate {
    /// Create a new borrow candidate.
    ///
    /// # Panics
    ///
    /// Panics if `borrow_rate` is negative or above [`MAX_BORROW_RATE`].
    pub fn new(
        id: impl Into<String>,
        bond_type: BondType,
        credit_rating: CreditRating,
        borrow_rate: Decimal,
    ) -> Self {
        assert!(
            borrow_rate >= Decimal::ZERO,
            "Borrow rate must be non-negative, got {}",
            borrow_rate
        );
        assert!(
            borrow_rate <= MAX_BORROW_RATE,
            "Borrow rate must not exceed {}%, got {}",
            MAX_BORROW_RATE,
            borrow_rate
        );
        Self {
            id: id.into(),
            bond_type,
            credit_rating,
            borrow_rate,
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

    pub fn borrow_rate(&self) -> Decimal {
        self.borrow_rate
    }

    /// Cost of borrowing `amount` of this bond: `rate / 100 * amount`.
    pub fn cost_of(&self, amount: Decimal) -> Decimal {
        self.borrow_rate / Decimal::ONE_HUNDRED * amount
    }
}

/// Check a borrow rate without panicking.
pub fn validate_borrow_rate(borrow_rate: Decimal) -> Result<(), String> {
    if borrow_rate < Decimal::ZERO {
        return Err(format!("borrow rate must be non-negative, got {}", borrow_rate));
    }
    if borrow_rate > MAX_BORROW_RATE {
        return Err(format!(
            "borrow rate must not exceed {}%, got {}",
            MAX_BORROW_RATE, borrow_rate
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
struct BorrowCandidateRecord {
    id: String,
    bond_type: BondType,
    credit_rating: CreditRating,
    borrow_rate: Decimal,
}

impl TryFrom<BorrowCandidateRecord> for BorrowCandidate {
    type Error = String;

    fn try_from(record: BorrowCandidateRecord) -> Result<Self, Self::Error> {
        validate_borrow_rate(record.borrow_rate)?;
        Ok(BorrowCandidate::new(
            record.id,
            record.bond_type,
            record.credit_rating,
            record.borrow_rate,
        ))
    }
}

impl fmt::Display for BorrowCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BorrowCandidate {} ({}/{}) @ {}%",
            self.id, self.credit_rating, self.bond_type, self.borrow_rate
        )
    }
}

/// Lowest-rate candidate among `candidates` accepted by `filter`.
///
/// Ties go to the candidate declared first.
pub fn cheapest_where<'a, F>(candidates: &'a [BorrowCandidate], filter: F) -> Option<&'a BorrowCandidate>
where
    F: Fn(&BorrowCandidate) -> bool,
{
    // `min_by_key` keeps the first of several equal minima.
    candidates
        .iter()
        .filter(|&c| filter(c))
        .min_by_key(|c| c.borrow_rate())
}

/// The borrowable market, in declaration order.
///
/// Order matters: every "cheapest" lookup breaks rate ties in favour of
/// the candidate declared first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BorrowMarket {
    candidates: Vec<BorrowCandidate>,
}

impl BorrowMarket {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    pub fn add(&mut self, candidate: BorrowCandidate) {
        self.candidates.push(candidate);
    }

    pub fn candidates(&self) -> &[BorrowCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Globally cheapest candidate.
    pub fn cheapest(&self) -> Option<&BorrowCandidate> {
        cheapest_where(&self.candidates, |_| true)
    }

    /// Cheapest candidate bearing `rating`.
    pub fn cheapest_with_rating(&self, rating: &CreditRating) -> Option<&BorrowCandidate> {
        cheapest_where(&self.candidates, |c| c.credit_rating() == rating)
    }

    /// Cheapest candidate of `bond_type` (case-insensitive).
    pub fn cheapest_with_type(&self, bond_type: &BondType) -> Option<&BorrowCandidate> {
        cheapest_where(&self.candidates, |c| c.bond_type().matches(bond_type))
    }

    /// All distinct ratings on offer, sorted.
    pub fn ratings(&self) -> Vec<CreditRating> {
        let mut ratings: Vec<CreditRating> = self
            .candidates
            .iter()
            .map(|c| c.credit_rating().clone())
            .collect();
        ratings.sort();
        ratings.dedup();
        ratings
    }

    /// All distinct bond types on offer, sorted.
    pub fn bond_types(&self) -> Vec<BondType> {
        let mut types: Vec<BondType> = self
            .candidates
            .iter()
            .map(|c| c.bond_type().clone())
            .collect();
        types.sort();
        types.dedup();
        types
    }
}

impl FromIterator<BorrowCandidate> for BorrowMarket {
    fn from_iter<T: IntoIterator<Item = BorrowCandidate>>(iter: T) -> Self {
        Self {
            candidates: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for BorrowMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Borrow Market ===")?;
        for candidate in &self.candidates {
            writeln!(f, "  {}", candidate)?;
        }
        writeln!(f, "Candidates: {}", self.len())
    }
}
