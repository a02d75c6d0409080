//! Low-to-high rating greedy fill.
//!
//! The primary strategy. It walks the rating ladder from the weakest
//! rating up, borrowing each rating quota in full from the cheapest bond
//! carrying that rating, then tops up any type quota still open, then
//! fills whatever deal value is left from the cheapest bond overall.
//!
//! The pass is fast and usually optimal for realistic deals, but it
//! cannot see that a rating quota and a type quota could have been met by
//! the same dollars. When its choices overshoot the deal value the result
//! is rejected with [`AllocationError::UnfulfillableConstraint`] and the
//! engine falls back to the backtracking search.

use crate::allocation::config::EngineConfig;
use crate::allocation::error::{AllocationError, AllocationResult};
use crate::allocation::plan::{Allocation, AllocationPlan, Strategy};
use crate::allocation::tally::FulfillmentTally;
use crate::allocation::validator::{describe_unmet, unmet_requirements};
use crate::core::candidate::{cheapest_where, BorrowCandidate};
use crate::core::deal::RepoDeal;
use crate::core::label::{BondType, CreditRating, RequirementLabel};
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Run the greedy fill for one deal.
///
/// # Algorithm
///
/// 1. Convert every rating and type percentage into a dollar need.
/// 2. For each rating in fill order with need > 0, borrow the whole need
///    from the cheapest bond with that rating. If that bond's type also
///    has an open need, reduce it by the same amount (floored at zero).
/// 3. For each type with need left, borrow it from the cheapest bond of
///    that type.
/// 4. Borrow any uncovered deal value from the cheapest bond overall.
/// 5. Reject the result if a requirement is still unmet once the deal
///    value is exhausted, or if more than the deal value was borrowed.
///
/// Rate ties go to the candidate declared first.
pub fn allocate(
    deal: &RepoDeal,
    candidates: &[BorrowCandidate],
    config: &EngineConfig,
) -> AllocationResult<AllocationPlan> {
    let mut remaining = deal.total_value_required();
    let mut tally = FulfillmentTally::new(deal);
    let mut allocations = Vec::new();

    let mut rating_left: BTreeMap<CreditRating, Decimal> = deal
        .rating_requirements()
        .iter()
        .map(|(rating, pct)| (rating.clone(), deal.percentage_to_value(*pct)))
        .collect();
    let mut type_left: BTreeMap<BondType, Decimal> = deal
        .type_requirements()
        .iter()
        .map(|(bond_type, pct)| (bond_type.clone(), deal.percentage_to_value(*pct)))
        .collect();

    // 1. Rating quotas, weakest first
    for rating in rating_fill_order(deal, &config.rating_order) {
        let needed = rating_left.get(&rating).copied().unwrap_or(Decimal::ZERO);
        if needed <= Decimal::ZERO {
            continue;
        }

        let candidate = cheapest_where(candidates, |c| c.credit_rating() == &rating)
            .ok_or_else(|| AllocationError::MissingSupply {
                label: RequirementLabel::Rating(rating.clone()),
            })?;

        remaining -= needed;
        rating_left.insert(rating.clone(), Decimal::ZERO);

        // Overlap credit: the same dollars count towards the bond's type.
        let mut credited = vec![RequirementLabel::Rating(rating.clone())];
        for (bond_type, left) in type_left.iter_mut() {
            if *left > Decimal::ZERO && bond_type.matches(candidate.bond_type()) {
                *left = (*left - needed).max(Decimal::ZERO);
                credited.push(RequirementLabel::Type(bond_type.clone()));
            }
        }

        debug!(
            "deal {}: rating {} takes {} from {} @ {}%",
            deal.id(),
            rating,
            needed,
            candidate.id(),
            candidate.borrow_rate()
        );
        tally.record(candidate, needed);
        allocations.push(Allocation::new(candidate, needed, credited));
    }

    // 2. Type quotas still open
    for (bond_type, left) in type_left.iter_mut() {
        let needed = *left;
        if needed <= Decimal::ZERO {
            continue;
        }

        let candidate = cheapest_where(candidates, |c| c.bond_type().matches(bond_type))
            .ok_or_else(|| AllocationError::MissingSupply {
                label: RequirementLabel::Type(bond_type.clone()),
            })?;

        remaining -= needed;
        *left = Decimal::ZERO;

        debug!(
            "deal {}: type {} takes {} from {} @ {}%",
            deal.id(),
            bond_type,
            needed,
            candidate.id(),
            candidate.borrow_rate()
        );
        tally.record(candidate, needed);
        allocations.push(Allocation::new(
            candidate,
            needed,
            vec![RequirementLabel::Type(bond_type.clone())],
        ));
    }

    // 3. Unconstrained fill
    if remaining > Decimal::ZERO {
        let candidate = cheapest_where(candidates, |_| true)
            .ok_or(AllocationError::EmptyMarket { remaining })?;

        debug!(
            "deal {}: unconstrained fill of {} from {} @ {}%",
            deal.id(),
            remaining,
            candidate.id(),
            candidate.borrow_rate()
        );
        tally.record(candidate, remaining);
        allocations.push(Allocation::new(
            candidate,
            remaining,
            vec![RequirementLabel::Unconstrained],
        ));
        remaining = Decimal::ZERO;
    }

    // 4. Validate against the deal's own thresholds
    if tally.is_overcommitted() {
        return Err(AllocationError::UnfulfillableConstraint {
            strategy: Strategy::Greedy,
            reason: format!(
                "allocated {} against {} required",
                tally.total_allocated(),
                deal.total_value_required()
            ),
        });
    }
    let unmet = unmet_requirements(deal, &tally);
    if !unmet.is_empty() && remaining <= Decimal::ZERO {
        return Err(AllocationError::UnfulfillableConstraint {
            strategy: Strategy::Greedy,
            reason: describe_unmet(&unmet),
        });
    }

    Ok(AllocationPlan::new(
        deal.id(),
        Strategy::Greedy,
        allocations,
        tally,
        0,
    ))
}

/// Ratings in the order the greedy pass visits them: the configured
/// ladder first, then any other rating the deal constrains, by label.
fn rating_fill_order(deal: &RepoDeal, ladder: &[CreditRating]) -> Vec<CreditRating> {
    let mut order: Vec<CreditRating> = ladder.to_vec();
    for rating in deal.rating_requirements().keys() {
        if !order.contains(rating) {
            order.push(rating.clone());
        }
    }
    order
}
