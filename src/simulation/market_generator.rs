//! Random borrow markets and deals for stress testing.
//!
//! Used by the benchmarks and the `generate` CLI command to produce
//! inputs of a chosen size.

use crate::core::candidate::{BorrowCandidate, BorrowMarket, MAX_BORROW_RATE};
use crate::core::deal::{DealError, RepoDeal};
use crate::core::label::{BondType, CreditRating};
use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Configuration for generating a random borrow market.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Number of candidates in the market.
    pub candidate_count: usize,
    /// Ratings to draw from.
    pub ratings: Vec<CreditRating>,
    /// Bond types to draw from.
    pub bond_types: Vec<BondType>,
    /// Lowest borrow rate, percent.
    pub min_rate: Decimal,
    /// Highest borrow rate, percent.
    pub max_rate: Decimal,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            candidate_count: 10,
            ratings: CreditRating::standard_ladder(),
            bond_types: vec![
                BondType::new("Treasury"),
                BondType::new("Municipal"),
                BondType::new("Corporate"),
                BondType::new("Agency"),
            ],
            min_rate: Decimal::new(25, 2),
            max_rate: Decimal::new(450, 2),
        }
    }
}

/// Generate a random market using the thread-local RNG.
pub fn generate_random_market(config: &MarketConfig) -> BorrowMarket {
    generate_random_market_with(&mut rand::thread_rng(), config)
}

/// Generate a random market from a caller-supplied RNG.
///
/// Rates are drawn in whole basis points between `min_rate` and
/// `max_rate`, both clamped to `[0, MAX_BORROW_RATE]`. Empty rating or
/// type pools yield an empty market.
pub fn generate_random_market_with<R: Rng + ?Sized>(
    rng: &mut R,
    config: &MarketConfig,
) -> BorrowMarket {
    let mut market = BorrowMarket::new();
    if config.ratings.is_empty() || config.bond_types.is_empty() {
        return market;
    }

    let min_bps = to_basis_points(config.min_rate);
    let max_bps = to_basis_points(config.max_rate).max(min_bps);

    for i in 0..config.candidate_count {
        let rating = config.ratings[rng.gen_range(0..config.ratings.len())].clone();
        let bond_type = config.bond_types[rng.gen_range(0..config.bond_types.len())].clone();
        let bps = rng.gen_range(min_bps..=max_bps);
        market.add(BorrowCandidate::new(
            format!("MKT-{:04}", i),
            bond_type,
            rating,
            Decimal::new(bps, 2),
        ));
    }
    market
}

/// Generate a deal whose requirements the market can always supply.
///
/// Picks up to two ratings and one type that exist in `market`, with
/// percentages in 10% steps, and a total between 1M and 50M.
pub fn generate_random_deal<R: Rng + ?Sized>(
    rng: &mut R,
    id: impl Into<String>,
    market: &BorrowMarket,
) -> Result<RepoDeal, DealError> {
    let total = Decimal::from(rng.gen_range(1u64..=50) * 1_000_000);

    let mut ratings = market.ratings();
    ratings.shuffle(rng);
    let mut rating_requirements = BTreeMap::new();
    let mut budget = 100u32;
    for rating in ratings.into_iter().take(2) {
        let pct = rng.gen_range(0..=budget / 20) * 10;
        budget -= pct;
        rating_requirements.insert(rating, Decimal::from(pct));
    }

    let mut type_requirements = BTreeMap::new();
    if let Some(bond_type) = market.bond_types().choose(rng) {
        let pct = rng.gen_range(0..=5u32) * 10;
        type_requirements.insert(bond_type.clone(), Decimal::from(pct));
    }

    RepoDeal::new(id, total, rating_requirements, type_requirements)
}

fn to_basis_points(rate: Decimal) -> i64 {
    let clamped = rate.max(Decimal::ZERO).min(MAX_BORROW_RATE);
    (clamped * Decimal::ONE_HUNDRED).round().to_i64().unwrap_or(0)
}
