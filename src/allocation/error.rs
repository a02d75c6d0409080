use crate::allocation::plan::Strategy;
use crate::core::label::RequirementLabel;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result alias for allocation operations.
pub type AllocationResult<T> = Result<T, AllocationError>;

/// Errors raised by the allocation engine.
///
/// Only [`AllocationError::UnfulfillableConstraint`] coming out of the
/// greedy pass is recoverable: the engine answers it by running the
/// backtracking search. Every other variant is final.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// No candidate in the market bears a required rating or type.
    #[error("no borrowable bond available for requirement {label}")]
    MissingSupply { label: RequirementLabel },

    /// A strategy ran to completion but could not produce a valid,
    /// non-overcommitted allocation.
    #[error("{strategy} strategy could not satisfy the deal: {reason}")]
    UnfulfillableConstraint { strategy: Strategy, reason: String },

    /// The backtracking search visited more nodes than allowed.
    #[error("backtracking search exceeded its budget of {budget} nodes")]
    SearchBudgetExceeded { budget: u64 },

    /// Value is left to fill and the market is empty.
    #[error("borrow market is empty, {remaining} left unallocated")]
    EmptyMarket { remaining: Decimal },

    /// Engine configuration is unusable.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

impl AllocationError {
    /// Whether the engine may retry this failure with the fallback search.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            AllocationError::UnfulfillableConstraint {
                strategy: Strategy::Greedy,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::label::CreditRating;

    #[test]
    fn test_only_greedy_unfulfillable_triggers_fallback() {
        let greedy = AllocationError::UnfulfillableConstraint {
            strategy: Strategy::Greedy,
            reason: "over-allocated".to_string(),
        };
        let search = AllocationError::UnfulfillableConstraint {
            strategy: Strategy::Backtracking,
            reason: "no combination".to_string(),
        };
        let missing = AllocationError::MissingSupply {
            label: RequirementLabel::Rating(CreditRating::new("B")),
        };
        assert!(greedy.triggers_fallback());
        assert!(!search.triggers_fallback());
        assert!(!missing.triggers_fallback());
    }

    #[test]
    fn test_error_messages() {
        let missing = AllocationError::MissingSupply {
            label: RequirementLabel::Rating(CreditRating::new("BB")),
        };
        assert_eq!(
            missing.to_string(),
            "no borrowable bond available for requirement BB"
        );
        let budget = AllocationError::SearchBudgetExceeded { budget: 10 };
        assert_eq!(
            budget.to_string(),
            "backtracking search exceeded its budget of 10 nodes"
        );
    }
}
