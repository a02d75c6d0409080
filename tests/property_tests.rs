use repo_borrow_engine::allocation::engine::AllocationEngine;
use repo_borrow_engine::allocation::error::AllocationError;
use repo_borrow_engine::allocation::plan::AllocationPlan;
use repo_borrow_engine::core::candidate::BorrowCandidate;
use repo_borrow_engine::core::deal::RepoDeal;
use repo_borrow_engine::core::label::{BondType, CreditRating, RequirementLabel};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Ratings drawn from the standard ladder.
fn arb_rating() -> impl Strategy<Value = CreditRating> {
    prop::sample::select(CreditRating::standard_ladder())
}

/// Bond type from a small pool (to increase overlap between quotas).
fn arb_bond_type() -> impl Strategy<Value = BondType> {
    prop::sample::select(vec![
        BondType::new("Treasury"),
        BondType::new("Municipal"),
        BondType::new("Corporate"),
    ])
}

/// Borrow rate between 0.01% and 5.00%.
fn arb_rate() -> impl Strategy<Value = Decimal> {
    (1i64..=500i64).prop_map(|bps| Decimal::new(bps, 2))
}

/// A market of 1..12 candidates with sequential ids.
fn arb_market() -> impl Strategy<Value = Vec<BorrowCandidate>> {
    prop::collection::vec((arb_bond_type(), arb_rating(), arb_rate()), 1..12).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (bond_type, rating, rate))| {
                BorrowCandidate::new(format!("C{}", i), bond_type, rating, rate)
            })
            .collect()
    })
}

/// A deal whose rating and type quotas each sum to at most 100%.
fn arb_deal() -> impl Strategy<Value = RepoDeal> {
    (
        1u64..=100u64,
        prop::collection::btree_map(arb_rating(), 0u32..=4u32, 0..3),
        prop::collection::btree_map(arb_bond_type(), 0u32..=4u32, 0..2),
    )
        .prop_filter_map("quotas must fit in the total", |(millions, ratings, types)| {
            let ratings: BTreeMap<CreditRating, Decimal> = ratings
                .into_iter()
                .map(|(r, tenths)| (r, Decimal::from(tenths * 10)))
                .collect();
            let types: BTreeMap<BondType, Decimal> = types
                .into_iter()
                .map(|(t, tenths)| (t, Decimal::from(tenths * 10)))
                .collect();
            RepoDeal::new(
                "P-1",
                Decimal::from(millions * 1_000_000),
                ratings,
                types,
            )
            .ok()
        })
}

fn quotas_met(plan: &AllocationPlan, deal: &RepoDeal) -> bool {
    let ratings_ok = deal.rating_requirements().iter().all(|(rating, pct)| {
        plan.rating_fulfilled().get(rating).copied().unwrap_or_default()
            >= deal.percentage_to_value(*pct)
    });
    let types_ok = deal.type_requirements().iter().all(|(bond_type, pct)| {
        plan.type_fulfilled().get(bond_type).copied().unwrap_or_default()
            >= deal.percentage_to_value(*pct)
    });
    ratings_ok && types_ok
}

proptest! {
    // ===================================================================
    // INVARIANT 1: A returned plan covers the deal exactly.
    //
    // Allocated amounts sum to the deal's required value. Never more,
    // never less.
    // ===================================================================
    #[test]
    fn plan_sums_to_required_value(deal in arb_deal(), market in arb_market()) {
        if let Ok(plan) = AllocationEngine::default().allocate(&deal, &market) {
            let sum: Decimal = plan.allocations().iter().map(|a| a.amount).sum();
            prop_assert_eq!(sum, deal.total_value_required());
            prop_assert_eq!(plan.shortfall(), Decimal::ZERO);
        }
    }

    // ===================================================================
    // INVARIANT 2: A returned plan meets every quota.
    //
    // Each rating and type reaches its required value.
    // ===================================================================
    #[test]
    fn plan_meets_every_quota(deal in arb_deal(), market in arb_market()) {
        if let Ok(plan) = AllocationEngine::default().allocate(&deal, &market) {
            prop_assert!(quotas_met(&plan, &deal), "quota missed in {}", plan);
        }
    }

    // ===================================================================
    // INVARIANT 3: Cost is non-negative and equals the sum of parts.
    //
    // Total cost is exactly Σ rate / 100 × amount over the allocations.
    // ===================================================================
    #[test]
    fn cost_is_sum_of_allocation_costs(deal in arb_deal(), market in arb_market()) {
        if let Ok(plan) = AllocationEngine::default().allocate(&deal, &market) {
            let manual: Decimal = plan
                .allocations()
                .iter()
                .map(|a| a.rate / Decimal::ONE_HUNDRED * a.amount)
                .sum();
            prop_assert!(plan.total_cost() >= Decimal::ZERO);
            prop_assert_eq!(plan.total_cost(), manual);
            for allocation in plan.allocations() {
                prop_assert!(allocation.amount > Decimal::ZERO);
            }
        }
    }

    // ===================================================================
    // INVARIANT 4: Allocation is deterministic.
    //
    // The same deal against the same market gives the same outcome,
    // plan or error. No randomness, no hidden state.
    // ===================================================================
    #[test]
    fn allocation_is_deterministic(deal in arb_deal(), market in arb_market()) {
        let engine = AllocationEngine::default();
        let first = engine.allocate(&deal, &market);
        let second = engine.allocate(&deal, &market);
        prop_assert_eq!(first, second);
    }

    // ===================================================================
    // INVARIANT 5: An unquoted required rating is MissingSupply.
    //
    // If a deal requires a positive share of a rating nobody quotes,
    // allocation fails with MissingSupply for that rating.
    // ===================================================================
    #[test]
    fn absent_rating_is_missing_supply(market in arb_market(), millions in 1u64..=100u64) {
        let absent = CreditRating::new("CCC");
        let deal = RepoDeal::new(
            "P-2",
            Decimal::from(millions * 1_000_000),
            BTreeMap::from([(absent.clone(), Decimal::from(10))]),
            BTreeMap::new(),
        )
        .unwrap();
        let err = AllocationEngine::default().allocate(&deal, &market).unwrap_err();
        prop_assert_eq!(err, AllocationError::MissingSupply {
            label: RequirementLabel::Rating(absent),
        });
    }

    // ===================================================================
    // INVARIANT 6: An unconstrained deal costs the cheapest rate.
    //
    // With no quotas, the whole value is borrowed at the lowest quote.
    // ===================================================================
    #[test]
    fn unconstrained_deal_uses_cheapest_rate(market in arb_market(), millions in 1u64..=100u64) {
        let total = Decimal::from(millions * 1_000_000);
        let deal = RepoDeal::new("P-3", total, BTreeMap::new(), BTreeMap::new()).unwrap();
        let plan = AllocationEngine::default().allocate(&deal, &market).unwrap();
        let cheapest = market.iter().map(|c| c.borrow_rate()).min().unwrap();
        prop_assert_eq!(plan.total_cost(), cheapest / Decimal::ONE_HUNDRED * total);
    }
}
