//! Backtracking fallback example.
//!
//! The greedy fill reserves the AAA quota and the Corporate quota
//! separately. When they cannot be satisfied by disjoint slices the
//! engine searches the discretised allocation space instead.

use repo_borrow_engine::allocation::config::EngineConfig;
use repo_borrow_engine::allocation::engine::AllocationEngine;
use repo_borrow_engine::allocation::greedy;
use repo_borrow_engine::core::candidate::BorrowCandidate;
use repo_borrow_engine::core::deal::RepoDeal;
use repo_borrow_engine::core::label::{BondType, CreditRating};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

fn main() {
    println!("╔═══════════════════════════════════════════════╗");
    println!("║  repo-borrow-engine: Backtracking Fallback    ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    let market = vec![
        BorrowCandidate::new("MUNI-AAA", BondType::new("Municipal"), CreditRating::new("AAA"), dec!(1.0)),
        BorrowCandidate::new("CORP-BBB", BondType::new("Corporate"), CreditRating::new("BBB"), dec!(1.0)),
        BorrowCandidate::new("CORP-AAA", BondType::new("Corporate"), CreditRating::new("AAA"), dec!(3.0)),
    ];

    println!("Market:");
    for candidate in &market {
        println!("  {}", candidate);
    }
    println!();

    let deal = match RepoDeal::new(
        "REPO-F1",
        dec!(1_000_000),
        BTreeMap::from([(CreditRating::new("AAA"), dec!(60))]),
        BTreeMap::from([(BondType::new("Corporate"), dec!(60))]),
    ) {
        Ok(deal) => deal,
        Err(e) => {
            eprintln!("invalid deal: {}", e);
            return;
        }
    };
    println!("{}\n", deal);

    // Greedy alone over-commits: 600k AAA + 600k Corporate > 1M.
    println!("━━━ Greedy only ━━━\n");
    match greedy::allocate(&deal, &market, &EngineConfig::default()) {
        Ok(plan) => println!("{}", plan),
        Err(e) => println!("  {}\n", e),
    }

    // The engine falls back and overlaps the quotas on CORP-AAA.
    for step in [dec!(20), dec!(10), dec!(5)] {
        println!("━━━ Engine, {}% search step ━━━\n", step);
        let engine = AllocationEngine::new(EngineConfig::default().with_step_percent(step));
        match engine.allocate(&deal, &market) {
            Ok(plan) => {
                println!("{}", plan);
                println!("  nodes explored: {}\n", plan.nodes_explored());
            }
            Err(e) => println!("  {}\n", e),
        }
    }
}
