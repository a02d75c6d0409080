use crate::core::candidate::BorrowCandidate;
use crate::core::deal::RepoDeal;
use crate::core::label::{BondType, CreditRating};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running totals for one allocation attempt against one deal.
///
/// The tally is the call-scoped replacement for per-deal fulfilment
/// fields: every strategy builds a fresh one, so nothing leaks from one
/// engine call into the next.
///
/// Only labels the deal actually constrains are tracked. Allocated value
/// counts towards every tracked label the candidate matches, so one
/// allocation can advance a rating quota and a type quota at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentTally {
    total_required: Decimal,
    total_allocated: Decimal,
    total_cost: Decimal,
    rating_fulfilled: BTreeMap<CreditRating, Decimal>,
    type_fulfilled: BTreeMap<BondType, Decimal>,
}

impl FulfillmentTally {
    /// Start an empty tally with a zero entry for every requirement label.
    pub fn new(deal: &RepoDeal) -> Self {
        Self {
            total_required: deal.total_value_required(),
            total_allocated: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            rating_fulfilled: deal
                .rating_requirements()
                .keys()
                .map(|r| (r.clone(), Decimal::ZERO))
                .collect(),
            type_fulfilled: deal
                .type_requirements()
                .keys()
                .map(|t| (t.clone(), Decimal::ZERO))
                .collect(),
        }
    }

    /// Credit `amount` of `candidate` to every label it matches.
    pub fn record(&mut self, candidate: &BorrowCandidate, amount: Decimal) {
        self.apply(candidate, amount);
    }

    /// Undo a previous [`record`](Self::record) of the same amount.
    pub fn revert(&mut self, candidate: &BorrowCandidate, amount: Decimal) {
        self.apply(candidate, -amount);
    }

    fn apply(&mut self, candidate: &BorrowCandidate, amount: Decimal) {
        self.total_allocated += amount;
        self.total_cost += candidate.cost_of(amount);
        if let Some(fulfilled) = self.rating_fulfilled.get_mut(candidate.credit_rating()) {
            *fulfilled += amount;
        }
        for (bond_type, fulfilled) in self.type_fulfilled.iter_mut() {
            if bond_type.matches(candidate.bond_type()) {
                *fulfilled += amount;
            }
        }
    }

    // --- Accessors ---

    pub fn total_required(&self) -> Decimal {
        self.total_required
    }

    pub fn total_allocated(&self) -> Decimal {
        self.total_allocated
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    /// Deal value not yet covered. Never negative.
    pub fn shortfall(&self) -> Decimal {
        (self.total_required - self.total_allocated).max(Decimal::ZERO)
    }

    /// Whether more value was allocated than the deal requires.
    pub fn is_overcommitted(&self) -> bool {
        self.total_allocated > self.total_required
    }

    pub fn rating_fulfilled(&self, rating: &CreditRating) -> Decimal {
        self.rating_fulfilled
            .get(rating)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn type_fulfilled(&self, bond_type: &BondType) -> Decimal {
        self.type_fulfilled
            .get(bond_type)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn all_rating_fulfilled(&self) -> &BTreeMap<CreditRating, Decimal> {
        &self.rating_fulfilled
    }

    pub fn all_type_fulfilled(&self) -> &BTreeMap<BondType, Decimal> {
        &self.type_fulfilled
    }
}
