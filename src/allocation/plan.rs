use crate::allocation::tally::FulfillmentTally;
use crate::core::candidate::BorrowCandidate;
use crate::core::label::{BondType, CreditRating, RequirementLabel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which strategy produced a plan (or failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Low-to-high rating greedy fill.
    Greedy,
    /// Quantised exhaustive search.
    Backtracking,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Greedy => write!(f, "greedy"),
            Strategy::Backtracking => write!(f, "backtracking"),
        }
    }
}

/// An amount borrowed from one candidate, and the requirements it was
/// credited against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub candidate_id: String,
    pub bond_type: BondType,
    pub credit_rating: CreditRating,
    /// Borrow rate, percent per 100.
    pub rate: Decimal,
    pub amount: Decimal,
    pub credited: Vec<RequirementLabel>,
}

impl Allocation {
    pub fn new(candidate: &BorrowCandidate, amount: Decimal, credited: Vec<RequirementLabel>) -> Self {
        Self {
            candidate_id: candidate.id().to_string(),
            bond_type: candidate.bond_type().clone(),
            credit_rating: candidate.credit_rating().clone(),
            rate: candidate.borrow_rate(),
            amount,
            credited,
        }
    }

    /// Borrow cost of this allocation.
    pub fn cost(&self) -> Decimal {
        self.rate / Decimal::ONE_HUNDRED * self.amount
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credited: Vec<String> = self.credited.iter().map(|l| l.to_string()).collect();
        write!(
            f,
            "Bond {} ({}/{} @ {}%) -> ${} used for [{}]",
            self.candidate_id,
            self.credit_rating,
            self.bond_type,
            self.rate,
            self.amount.round_dp(2),
            credited.join(", ")
        )
    }
}

/// A complete, validated borrowing plan for one deal.
///
/// The plan is the engine's side artifact: `total_cost` is the answer,
/// the allocations and fulfilment maps explain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    deal_id: String,
    strategy: Strategy,
    allocations: Vec<Allocation>,
    tally: FulfillmentTally,
    /// Search nodes visited; zero for greedy plans.
    nodes_explored: u64,
}

impl AllocationPlan {
    pub(crate) fn new(
        deal_id: impl Into<String>,
        strategy: Strategy,
        allocations: Vec<Allocation>,
        tally: FulfillmentTally,
        nodes_explored: u64,
    ) -> Self {
        Self {
            deal_id: deal_id.into(),
            strategy,
            allocations,
            tally,
            nodes_explored,
        }
    }

    pub fn deal_id(&self) -> &str {
        &self.deal_id
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// Total borrow cost: sum of `rate / 100 * amount`.
    pub fn total_cost(&self) -> Decimal {
        self.tally.total_cost()
    }

    pub fn total_allocated(&self) -> Decimal {
        self.tally.total_allocated()
    }

    /// Remaining uncovered deal value; zero for every plan the engine returns.
    pub fn shortfall(&self) -> Decimal {
        self.tally.shortfall()
    }

    pub fn rating_fulfilled(&self) -> &BTreeMap<CreditRating, Decimal> {
        self.tally.all_rating_fulfilled()
    }

    pub fn type_fulfilled(&self) -> &BTreeMap<BondType, Decimal> {
        self.tally.all_type_fulfilled()
    }

    pub fn nodes_explored(&self) -> u64 {
        self.nodes_explored
    }

    /// Amount allocated to a candidate, summed across allocations.
    pub fn amount_for(&self, candidate_id: &str) -> Decimal {
        self.allocations
            .iter()
            .filter(|a| a.candidate_id == candidate_id)
            .map(|a| a.amount)
            .sum()
    }
}

impl fmt::Display for AllocationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---- Allocation Breakdown for Deal {} ----", self.deal_id)?;
        for allocation in &self.allocations {
            writeln!(f, "{}", allocation)?;
        }
        writeln!(f, "Strategy:          {}", self.strategy)?;
        if self.strategy == Strategy::Backtracking {
            writeln!(f, "Nodes Explored:    {}", self.nodes_explored)?;
        }
        writeln!(f, "Total Allocated:   ${}", self.total_allocated().round_dp(2))?;
        writeln!(f, "Total Borrow Cost: ${}", self.total_cost().round_dp(2))?;

        if !self.rating_fulfilled().is_empty() || !self.type_fulfilled().is_empty() {
            writeln!(f, "\nFulfilled:")?;
            for (rating, amount) in self.rating_fulfilled() {
                writeln!(f, "  {}: ${}", rating, amount.round_dp(2))?;
            }
            for (bond_type, amount) in self.type_fulfilled() {
                writeln!(f, "  {}: ${}", bond_type, amount.round_dp(2))?;
            }
        }
        write!(f, "--------------------------------------------")
    }
}
