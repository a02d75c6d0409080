use crate::allocation::error::{AllocationError, AllocationResult};
use crate::core::label::CreditRating;
use rust_decimal::Decimal;

/// Default quantisation step of the backtracking search, in percent of
/// the deal's total value.
pub const DEFAULT_STEP_PERCENT: u32 = 20;

/// Default cap on nodes visited by the backtracking search.
pub const DEFAULT_SEARCH_BUDGET: u64 = 2_000_000;

/// Tunables for the allocation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Order in which the greedy pass fills rating quotas, weakest first.
    /// Required ratings missing from this list are filled afterwards in
    /// label order.
    pub rating_order: Vec<CreditRating>,
    /// Backtracking amount increment as a percentage of the deal value.
    pub step_percent: Decimal,
    /// Maximum number of search nodes before giving up.
    pub search_budget: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rating_order: CreditRating::standard_ladder(),
            step_percent: Decimal::from(DEFAULT_STEP_PERCENT),
            search_budget: DEFAULT_SEARCH_BUDGET,
        }
    }
}

impl EngineConfig {
    pub fn with_step_percent(mut self, step_percent: Decimal) -> Self {
        self.step_percent = step_percent;
        self
    }

    pub fn with_search_budget(mut self, search_budget: u64) -> Self {
        self.search_budget = search_budget;
        self
    }

    pub fn with_rating_order(mut self, rating_order: Vec<CreditRating>) -> Self {
        self.rating_order = rating_order;
        self
    }

    pub fn validate(&self) -> AllocationResult<()> {
        if self.step_percent <= Decimal::ZERO || self.step_percent > Decimal::ONE_HUNDRED {
            return Err(AllocationError::InvalidConfig(format!(
                "step percent must be within (0, 100], got {}",
                self.step_percent
            )));
        }
        if self.search_budget == 0 {
            return Err(AllocationError::InvalidConfig(
                "search budget must be at least one node".to_string(),
            ));
        }
        Ok(())
    }
}
