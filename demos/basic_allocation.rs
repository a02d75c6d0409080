//! Basic greedy allocation example.
//!
//! Borrows collateral for a repo deal with rating and type quotas and
//! shows how overlap credit lets one slice satisfy both.

use repo_borrow_engine::allocation::engine::AllocationEngine;
use repo_borrow_engine::core::candidate::{BorrowCandidate, BorrowMarket};
use repo_borrow_engine::core::deal::RepoDeal;
use repo_borrow_engine::core::label::{BondType, CreditRating};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

fn main() {
    println!("╔══════════════════════════════════════════════╗");
    println!("║  repo-borrow-engine: Basic Allocation Example ║");
    println!("╚══════════════════════════════════════════════╝\n");

    let market: BorrowMarket = vec![
        BorrowCandidate::new("A1", BondType::new("Municipal"), CreditRating::new("AAA"), dec!(1.5)),
        BorrowCandidate::new("A2", BondType::new("Corporate"), CreditRating::new("BBB"), dec!(2.0)),
        BorrowCandidate::new("A3", BondType::new("Municipal"), CreditRating::new("A"), dec!(1.0)),
    ]
    .into_iter()
    .collect();

    println!("{}", market);

    // --- Scenario 1: rating and type quotas ---
    println!("━━━ Scenario 1: AAA ≥ 30%, Municipal ≥ 20% ━━━\n");

    let deal = match RepoDeal::new(
        "REPO-001",
        dec!(1_000_000),
        BTreeMap::from([(CreditRating::new("AAA"), dec!(30))]),
        BTreeMap::from([(BondType::new("Municipal"), dec!(20))]),
    ) {
        Ok(deal) => deal,
        Err(e) => {
            eprintln!("invalid deal: {}", e);
            return;
        }
    };
    println!("{}\n", deal);

    let engine = AllocationEngine::default();
    match engine.allocate(&deal, market.candidates()) {
        Ok(plan) => println!("{}", plan),
        Err(e) => println!("Allocation failed: {}", e),
    }

    // --- Scenario 2: no quotas ---
    println!("━━━ Scenario 2: Unconstrained ━━━\n");

    let open = match RepoDeal::new("REPO-002", dec!(250_000), BTreeMap::new(), BTreeMap::new()) {
        Ok(deal) => deal,
        Err(e) => {
            eprintln!("invalid deal: {}", e);
            return;
        }
    };
    match engine.calculate_external_borrow_cost(&open, market.candidates()) {
        Ok(cost) => println!("{} costs ${} at the cheapest quote\n", open.id(), cost),
        Err(e) => println!("Allocation failed: {}\n", e),
    }

    // --- Scenario 3: a rating nobody quotes ---
    println!("━━━ Scenario 3: Missing Supply ━━━\n");

    let junk = match RepoDeal::new(
        "REPO-003",
        dec!(100_000),
        BTreeMap::from([(CreditRating::new("BB"), dec!(10))]),
        BTreeMap::new(),
    ) {
        Ok(deal) => deal,
        Err(e) => {
            eprintln!("invalid deal: {}", e);
            return;
        }
    };
    match engine.allocate(&junk, market.candidates()) {
        Ok(plan) => println!("{}", plan),
        Err(e) => println!("{}: {}", junk.id(), e),
    }
}
