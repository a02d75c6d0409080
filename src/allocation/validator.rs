use crate::allocation::tally::FulfillmentTally;
use crate::core::deal::RepoDeal;
use crate::core::label::RequirementLabel;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A requirement whose dollar threshold an allocation did not reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetRequirement {
    pub label: RequirementLabel,
    pub required: Decimal,
    pub fulfilled: Decimal,
}

impl UnmetRequirement {
    pub fn missing(&self) -> Decimal {
        self.required - self.fulfilled
    }
}

impl fmt::Display for UnmetRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} needs {} but got {}",
            self.label, self.required, self.fulfilled
        )
    }
}

/// Compare a tally against the deal's percentage requirements.
///
/// Thresholds are recomputed from the deal itself, never from any
/// remaining-need map a strategy mutated along the way.
pub fn unmet_requirements(deal: &RepoDeal, tally: &FulfillmentTally) -> Vec<UnmetRequirement> {
    let ratings = deal.rating_requirements().keys().map(|rating| UnmetRequirement {
        label: RequirementLabel::Rating(rating.clone()),
        required: deal.required_value_for_rating(rating),
        fulfilled: tally.rating_fulfilled(rating),
    });
    let types = deal.type_requirements().iter().map(|(bond_type, pct)| UnmetRequirement {
        label: RequirementLabel::Type(bond_type.clone()),
        required: deal.percentage_to_value(*pct),
        fulfilled: tally.type_fulfilled(bond_type),
    });
    ratings
        .chain(types)
        .filter(|r| r.fulfilled < r.required)
        .collect()
}

/// Whether a tally describes a complete, valid allocation: every
/// threshold met and exactly the required value allocated.
pub fn is_valid_allocation(deal: &RepoDeal, tally: &FulfillmentTally) -> bool {
    tally.total_allocated() == deal.total_value_required()
        && unmet_requirements(deal, tally).is_empty()
}

/// Render unmet requirements as a single human-readable reason.
pub fn describe_unmet(unmet: &[UnmetRequirement]) -> String {
    unmet
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
