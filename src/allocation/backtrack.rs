//! Quantised backtracking search.
//!
//! The fallback strategy. Amounts are borrowed in fixed steps of the
//! deal value (20% by default). Candidates are visited in declaration
//! order and every candidate branches over `0, step, 2 * step, ...` up to
//! the value still uncovered, the last branch clamped so the running
//! total lands exactly on the deal value. Each combination that covers
//! the deal is checked against its own rating and type thresholds;
//! the cheapest valid one wins, the first found among equals.
//!
//! The search is exhaustive within its granularity and exponential in the
//! number of candidates, so it runs under a node budget.

use crate::allocation::config::EngineConfig;
use crate::allocation::error::{AllocationError, AllocationResult};
use crate::allocation::plan::{Allocation, AllocationPlan, Strategy};
use crate::allocation::tally::FulfillmentTally;
use crate::allocation::validator::is_valid_allocation;
use crate::core::candidate::BorrowCandidate;
use crate::core::deal::RepoDeal;
use crate::core::label::RequirementLabel;
use log::{debug, info, warn};
use rust_decimal::Decimal;

/// Search for the cheapest valid step-quantised allocation.
pub fn allocate(
    deal: &RepoDeal,
    candidates: &[BorrowCandidate],
    config: &EngineConfig,
) -> AllocationResult<AllocationPlan> {
    let step = deal.percentage_to_value(config.step_percent);
    let mut search = Search {
        deal,
        candidates,
        step,
        budget: config.search_budget,
        nodes: 0,
        amounts: vec![Decimal::ZERO; candidates.len()],
        tally: FulfillmentTally::new(deal),
        best: None,
    };

    if let Err(err) = search.explore(0) {
        warn!(
            "deal {}: backtracking stopped after {} nodes: {}",
            deal.id(),
            search.nodes,
            err
        );
        return Err(err);
    }

    let nodes = search.nodes;
    let best = search.best.ok_or_else(|| AllocationError::UnfulfillableConstraint {
        strategy: Strategy::Backtracking,
        reason: format!(
            "no combination in {}% steps meets every requirement ({} nodes explored)",
            config.step_percent, nodes
        ),
    })?;

    info!(
        "deal {}: backtracking found cost {} after {} nodes",
        deal.id(),
        best.cost,
        nodes
    );
    Ok(build_plan(deal, candidates, &best.amounts, nodes))
}

struct Best {
    amounts: Vec<Decimal>,
    cost: Decimal,
}

struct Search<'a> {
    deal: &'a RepoDeal,
    candidates: &'a [BorrowCandidate],
    step: Decimal,
    budget: u64,
    nodes: u64,
    /// Amount currently assigned to each candidate on the search path.
    amounts: Vec<Decimal>,
    tally: FulfillmentTally,
    best: Option<Best>,
}

impl<'a> Search<'a> {
    fn explore(&mut self, index: usize) -> AllocationResult<()> {
        self.nodes += 1;
        if self.nodes > self.budget {
            return Err(AllocationError::SearchBudgetExceeded {
                budget: self.budget,
            });
        }

        let remaining = self.deal.total_value_required() - self.tally.total_allocated();
        if remaining <= Decimal::ZERO {
            self.consider_complete();
            return Ok(());
        }
        if index == self.candidates.len() {
            return Ok(());
        }
        // Costs only grow deeper down, so a branch already at the best
        // cost can never strictly beat it.
        if let Some(best) = &self.best {
            if self.tally.total_cost() >= best.cost {
                return Ok(());
            }
        }

        let candidates = self.candidates;
        let candidate = &candidates[index];
        let mut amount = Decimal::ZERO;
        loop {
            if amount > Decimal::ZERO {
                self.tally.record(candidate, amount);
                self.amounts[index] = amount;
            }
            let outcome = self.explore(index + 1);
            if amount > Decimal::ZERO {
                self.tally.revert(candidate, amount);
                self.amounts[index] = Decimal::ZERO;
            }
            outcome?;

            if amount >= remaining {
                break;
            }
            amount = (amount + self.step).min(remaining);
        }
        Ok(())
    }

    fn consider_complete(&mut self) {
        if !is_valid_allocation(self.deal, &self.tally) {
            return;
        }
        let cost = self.tally.total_cost();
        let improves = self.best.as_ref().map_or(true, |best| cost < best.cost);
        if improves {
            debug!(
                "deal {}: new best cost {} at node {}",
                self.deal.id(),
                cost,
                self.nodes
            );
            self.best = Some(Best {
                amounts: self.amounts.clone(),
                cost,
            });
        }
    }
}

/// Requirement labels a candidate's value counts towards in `deal`.
fn credited_labels(deal: &RepoDeal, candidate: &BorrowCandidate) -> Vec<RequirementLabel> {
    let mut labels = Vec::new();
    if deal
        .rating_requirements()
        .get(candidate.credit_rating())
        .map_or(false, |pct| *pct > Decimal::ZERO)
    {
        labels.push(RequirementLabel::Rating(candidate.credit_rating().clone()));
    }
    for (bond_type, pct) in deal.type_requirements() {
        if *pct > Decimal::ZERO && bond_type.matches(candidate.bond_type()) {
            labels.push(RequirementLabel::Type(bond_type.clone()));
        }
    }
    if labels.is_empty() {
        labels.push(RequirementLabel::Unconstrained);
    }
    labels
}

fn build_plan(
    deal: &RepoDeal,
    candidates: &[BorrowCandidate],
    amounts: &[Decimal],
    nodes: u64,
) -> AllocationPlan {
    let mut tally = FulfillmentTally::new(deal);
    let mut allocations = Vec::new();
    for (candidate, amount) in candidates.iter().zip(amounts) {
        if *amount <= Decimal::ZERO {
            continue;
        }
        tally.record(candidate, *amount);
        allocations.push(Allocation::new(
            candidate,
            *amount,
            credited_labels(deal, candidate),
        ));
    }
    AllocationPlan::new(deal.id(), Strategy::Backtracking, allocations, tally, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::label::{BondType, CreditRating};
    use rust_decimal_macros::dec;

    fn candidate(id: &str, bond_type: &str, rating: &str, rate: Decimal) -> BorrowCandidate {
        BorrowCandidate::new(id, BondType::new(bond_type), CreditRating::new(rating), rate)
    }

    fn deal(
        total: Decimal,
        ratings: &[(&str, Decimal)],
        types: &[(&str, Decimal)],
    ) -> RepoDeal {
        RepoDeal::new(
            "D1",
            total,
            ratings.iter().map(|(r, p)| (CreditRating::new(*r), *p)).collect(),
            types.iter().map(|(t, p)| (BondType::new(*t), *p)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_unconstrained_picks_cheapest() {
        let candidates = vec![
            candidate("A", "Corporate", "BBB", dec!(2)),
            candidate("B", "Corporate", "A", dec!(1)),
        ];
        let deal = deal(dec!(1000), &[], &[]);
        let plan = allocate(&deal, &candidates, &EngineConfig::default()).unwrap();
        assert_eq!(plan.amount_for("B"), dec!(1000));
        assert_eq!(plan.total_cost(), dec!(10));
        assert_eq!(plan.strategy(), Strategy::Backtracking);
        assert!(plan.nodes_explored() > 0);
    }

    #[test]
    fn test_finds_shared_dollars_for_disjoint_quotas() {
        // 60% AAA and 60% Corporate: only an AAA Corporate bond can serve
        // both, and the search must discover that it needs 20% of it.
        let candidates = vec![
            candidate("M", "Municipal", "AAA", dec!(1.0)),
            candidate("C", "Corporate", "BBB", dec!(1.0)),
            candidate("X", "Corporate", "AAA", dec!(3.0)),
        ];
        let deal = deal(dec!(1000), &[("AAA", dec!(60))], &[("Corporate", dec!(60))]);
        let plan = allocate(&deal, &candidates, &EngineConfig::default()).unwrap();

        assert_eq!(plan.total_allocated(), dec!(1000));
        assert_eq!(plan.amount_for("M"), dec!(400));
        assert_eq!(plan.amount_for("C"), dec!(400));
        assert_eq!(plan.amount_for("X"), dec!(200));
        assert_eq!(plan.total_cost(), dec!(14));
        assert_eq!(plan.rating_fulfilled()[&CreditRating::new("AAA")], dec!(600));
        assert_eq!(plan.type_fulfilled()[&BondType::new("Corporate")], dec!(600));
    }

    #[test]
    fn test_ties_keep_first_found() {
        let candidates = vec![
            candidate("First", "Corporate", "A", dec!(1)),
            candidate("Second", "Corporate", "A", dec!(1)),
        ];
        let deal = deal(dec!(500), &[], &[]);
        let plan = allocate(&deal, &candidates, &EngineConfig::default()).unwrap();
        // Depth-first with ascending amounts: the zero branch for "First"
        // is explored first, so "Second" takes the whole deal.
        assert_eq!(plan.amount_for("Second"), dec!(500));
        assert_eq!(plan.allocations().len(), 1);
    }

    #[test]
    fn test_unreachable_threshold_is_unfulfillable() {
        // No bond is both AAA and Corporate, so 50% + 60% cannot fit.
        let candidates = vec![
            candidate("M", "Municipal", "AAA", dec!(1)),
            candidate("C", "Corporate", "BBB", dec!(1)),
        ];
        let deal = deal(dec!(1000), &[("AAA", dec!(50))], &[("Corporate", dec!(60))]);
        let err = allocate(&deal, &candidates, &EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::UnfulfillableConstraint {
                strategy: Strategy::Backtracking,
                ..
            }
        ));
    }

    #[test]
    fn test_uneven_step_lands_exactly_on_total() {
        let candidates = vec![
            candidate("A", "Corporate", "AAA", dec!(2)),
            candidate("B", "Municipal", "BBB", dec!(1)),
        ];
        let deal = deal(dec!(900), &[("AAA", dec!(10))], &[]);
        let config = EngineConfig::default().with_step_percent(dec!(30));
        let plan = allocate(&deal, &candidates, &config).unwrap();
        assert_eq!(plan.total_allocated(), dec!(900));
        assert!(plan.rating_fulfilled()[&CreditRating::new("AAA")] >= dec!(90));
    }

    #[test]
    fn test_budget_exceeded() {
        let candidates: Vec<BorrowCandidate> = (0..8)
            .map(|i| candidate(&format!("C{}", i), "Corporate", "A", Decimal::from(8 - i)))
            .collect();
        let deal = deal(dec!(1000), &[], &[]);
        let config = EngineConfig::default().with_search_budget(5);
        let err = allocate(&deal, &candidates, &config).unwrap_err();
        assert_eq!(err, AllocationError::SearchBudgetExceeded { budget: 5 });
    }

    #[test]
    fn test_empty_market_is_unfulfillable() {
        let deal = deal(dec!(1000), &[], &[]);
        let err = allocate(&deal, &[], &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, AllocationError::UnfulfillableConstraint { .. }));
    }

    #[test]
    fn test_unconstrained_label_for_untracked_bonds() {
        let candidates = vec![
            candidate("M", "Municipal", "AAA", dec!(2)),
            candidate("C", "Corporate", "BBB", dec!(1)),
        ];
        let deal = deal(dec!(1000), &[("AAA", dec!(20))], &[]);
        let plan = allocate(&deal, &candidates, &EngineConfig::default()).unwrap();
        let c = plan
            .allocations()
            .iter()
            .find(|a| a.candidate_id == "C")
            .unwrap();
        assert_eq!(c.credited, vec![RequirementLabel::Unconstrained]);
        assert_eq!(plan.amount_for("M"), dec!(200));
        assert_eq!(plan.total_cost(), dec!(12));
    }
}
