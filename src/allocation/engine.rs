use crate::allocation::backtrack;
use crate::allocation::config::EngineConfig;
use crate::allocation::error::{AllocationError, AllocationResult};
use crate::allocation::greedy;
use crate::allocation::plan::AllocationPlan;
use crate::core::candidate::BorrowCandidate;
use crate::core::deal::RepoDeal;
use log::{info, warn};
use rust_decimal::Decimal;

/// Where an engine call currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Running the greedy fill.
    Primary,
    /// Greedy proved infeasible; running the backtracking search.
    Fallback,
    /// Terminal: the error is returned to the caller.
    Failed,
}

impl EngineState {
    /// State after a strategy failed with `err`.
    ///
    /// Only a greedy `UnfulfillableConstraint` moves Primary to Fallback.
    /// Everything else, and any failure in Fallback, is final.
    pub fn on_failure(self, err: &AllocationError) -> EngineState {
        match self {
            EngineState::Primary if err.triggers_fallback() => EngineState::Fallback,
            _ => EngineState::Failed,
        }
    }
}

/// The allocation engine.
///
/// Computes the cheapest way to borrow a deal's collateral from the
/// market while meeting its rating and type quotas. Each call is
/// independent: the engine holds configuration only, never allocation
/// state, and it does not modify the deal or the candidates.
///
/// # Examples
///
/// ```
/// use repo_borrow_engine::allocation::engine::AllocationEngine;
/// use repo_borrow_engine::core::candidate::BorrowCandidate;
/// use repo_borrow_engine::core::deal::RepoDeal;
/// use repo_borrow_engine::core::label::{BondType, CreditRating};
/// use rust_decimal_macros::dec;
/// use std::collections::BTreeMap;
///
/// let deal = RepoDeal::new(
///     "D-1",
///     dec!(1_000_000),
///     BTreeMap::from([(CreditRating::new("AAA"), dec!(30))]),
///     BTreeMap::from([(BondType::new("Municipal"), dec!(20))]),
/// ).unwrap();
/// let market = vec![
///     BorrowCandidate::new("A1", BondType::new("Municipal"), CreditRating::new("AAA"), dec!(1.5)),
///     BorrowCandidate::new("A2", BondType::new("Corporate"), CreditRating::new("BBB"), dec!(2.0)),
///     BorrowCandidate::new("A3", BondType::new("Municipal"), CreditRating::new("A"), dec!(1.0)),
/// ];
///
/// let engine = AllocationEngine::default();
/// let cost = engine.calculate_external_borrow_cost(&deal, &market).unwrap();
/// assert_eq!(cost, dec!(11_500));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AllocationEngine {
    config: EngineConfig,
}

impl AllocationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Total borrow cost of the cheapest plan found for `deal`.
    pub fn calculate_external_borrow_cost(
        &self,
        deal: &RepoDeal,
        candidates: &[BorrowCandidate],
    ) -> AllocationResult<Decimal> {
        self.allocate(deal, candidates).map(|plan| plan.total_cost())
    }

    /// Build a borrowing plan for `deal`.
    ///
    /// Runs the greedy fill first. If greedy cannot certify its result,
    /// the backtracking search runs once; its failure is final. Missing
    /// supply and configuration errors are returned immediately.
    pub fn allocate(
        &self,
        deal: &RepoDeal,
        candidates: &[BorrowCandidate],
    ) -> AllocationResult<AllocationPlan> {
        self.config.validate()?;

        let mut state = EngineState::Primary;
        loop {
            let outcome = if state == EngineState::Primary {
                greedy::allocate(deal, candidates, &self.config)
            } else {
                backtrack::allocate(deal, candidates, &self.config)
            };

            match outcome {
                Ok(plan) => {
                    info!(
                        "deal {}: {} plan costs {} across {} allocations",
                        deal.id(),
                        plan.strategy(),
                        plan.total_cost(),
                        plan.allocations().len()
                    );
                    return Ok(plan);
                }
                Err(err) => {
                    state = state.on_failure(&err);
                    if state == EngineState::Failed {
                        warn!("deal {}: allocation failed: {}", deal.id(), err);
                        return Err(err);
                    }
                    warn!("deal {}: {}; falling back to backtracking", deal.id(), err);
                }
            }
        }
    }
}

/// Total borrow cost for `deal` under the default engine configuration.
pub fn calculate_external_borrow_cost(
    deal: &RepoDeal,
    candidates: &[BorrowCandidate],
) -> AllocationResult<Decimal> {
    AllocationEngine::default().calculate_external_borrow_cost(deal, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::plan::Strategy;
    use crate::core::label::{BondType, CreditRating, RequirementLabel};
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
    fn test_state_transitions() {
        let greedy_fail = AllocationError::UnfulfillableConstraint {
            strategy: Strategy::Greedy,
            reason: String::new(),
        };
        let search_fail = AllocationError::UnfulfillableConstraint {
            strategy: Strategy::Backtracking,
            reason: String::new(),
        };
        let missing = AllocationError::MissingSupply {
            label: RequirementLabel::Unconstrained,
        };
        assert_eq!(EngineState::Primary.on_failure(&greedy_fail), EngineState::Fallback);
        assert_eq!(EngineState::Primary.on_failure(&missing), EngineState::Failed);
        assert_eq!(EngineState::Fallback.on_failure(&search_fail), EngineState::Failed);
        assert_eq!(EngineState::Fallback.on_failure(&greedy_fail), EngineState::Failed);
    }

    #[test]
    fn test_greedy_plan_returned_directly() {
        let market = vec![
            candidate("A1", "Municipal", "AAA", dec!(1.5)),
            candidate("A3", "Municipal", "A", dec!(1.0)),
        ];
        let deal = deal(dec!(1000), &[("AAA", dec!(30))], &[]);
        let plan = AllocationEngine::default().allocate(&deal, &market).unwrap();
        assert_eq!(plan.strategy(), Strategy::Greedy);
        assert_eq!(plan.total_cost(), dec!(11.5));
    }

    #[test]
    fn test_falls_back_on_overcommitment() {
        let market = vec![
            candidate("M", "Municipal", "AAA", dec!(1.0)),
            candidate("C", "Corporate", "BBB", dec!(1.0)),
            candidate("X", "Corporate", "AAA", dec!(3.0)),
        ];
        let deal = deal(dec!(1000), &[("AAA", dec!(60))], &[("Corporate", dec!(60))]);
        let plan = AllocationEngine::default().allocate(&deal, &market).unwrap();
        assert_eq!(plan.strategy(), Strategy::Backtracking);
        assert_eq!(plan.total_allocated(), dec!(1000));
        assert_eq!(plan.total_cost(), dec!(14));
    }

    #[test]
    fn test_missing_supply_skips_fallback() {
        let market = vec![candidate("A1", "Municipal", "AAA", dec!(1.5))];
        let deal = deal(dec!(1000), &[("BB", dec!(10))], &[]);
        let err = calculate_external_borrow_cost(&deal, &market).unwrap_err();
        assert!(matches!(err, AllocationError::MissingSupply { .. }));
    }

    #[test]
    fn test_fallback_failure_is_final() {
        let market = vec![
            candidate("M", "Municipal", "AAA", dec!(1)),
            candidate("C", "Corporate", "BBB", dec!(1)),
        ];
        let deal = deal(dec!(1000), &[("AAA", dec!(50))], &[("Corporate", dec!(60))]);
        let err = AllocationEngine::default().allocate(&deal, &market).unwrap_err();
        assert!(matches!(
            err,
            AllocationError::UnfulfillableConstraint {
                strategy: Strategy::Backtracking,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_search() {
        let market = vec![candidate("A1", "Municipal", "AAA", dec!(1.5))];
        let deal = deal(dec!(1000), &[], &[]);
        let engine = AllocationEngine::new(EngineConfig::default().with_search_budget(0));
        let err = engine.allocate(&deal, &market).unwrap_err();
        assert!(matches!(err, AllocationError::InvalidConfig(_)));
    }

    #[test]
    fn test_largest_deal_allocates_without_overflow() {
        use crate::core::candidate::MAX_BORROW_RATE;
        use crate::core::deal::MAX_TOTAL_VALUE;

        let market = vec![
            candidate("M", "Municipal", "AAA", MAX_BORROW_RATE),
            candidate("C", "Corporate", "BBB", MAX_BORROW_RATE),
        ];
        let deal = deal(MAX_TOTAL_VALUE, &[("AAA", dec!(60))], &[("Corporate", dec!(60))]);
        // Greedy over-commits to 1.2x the total before falling back.
        let err = AllocationEngine::default().allocate(&deal, &market).unwrap_err();
        assert!(matches!(err, AllocationError::UnfulfillableConstraint { .. }));

        let cheap = vec![candidate("A1", "Municipal", "AAA", dec!(1.5))];
        let deal = RepoDeal::new(
            "D2",
            MAX_TOTAL_VALUE,
            [(CreditRating::new("AAA"), dec!(30))].into_iter().collect(),
            Default::default(),
        )
        .unwrap();
        let cost = calculate_external_borrow_cost(&deal, &cheap).unwrap();
        assert_eq!(cost, dec!(15_000_000_000_000_000));
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let market = vec![
            candidate("M", "Municipal", "AAA", dec!(1.0)),
            candidate("C", "Corporate", "BBB", dec!(1.0)),
            candidate("X", "Corporate", "AAA", dec!(3.0)),
        ];
        let deal = deal(dec!(1000), &[("AAA", dec!(60))], &[("Corporate", dec!(60))]);
        let engine = AllocationEngine::default();
        let first = engine.allocate(&deal, &market).unwrap();
        let second = engine.allocate(&deal, &market).unwrap();
        assert_eq!(first, second);
    }
}
