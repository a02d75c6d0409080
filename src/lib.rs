//! # repo-borrow-engine
//!
//! Cheapest-cost collateral borrowing for repo agreements.
//!
//! Given a deal's required value, its minimum proportions by credit
//! rating and by bond type, and a market of borrowable bonds quoted at a
//! borrow rate, this engine finds the cheapest set of borrowed amounts
//! that covers the deal and meets every quota.
//!
//! ## Architecture
//!
//! - **core**: rating and type labels, owned collateral, borrow candidates, deals
//! - **allocation**: Greedy fill, backtracking fallback, validation and orchestration
//! - **io**: Loading of CSV bond files and JSON deal files
//! - **simulation**: Random market and deal generation for stress testing

pub mod allocation;
pub mod core;
pub mod io;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::allocation::config::EngineConfig;
    pub use crate::allocation::engine::{calculate_external_borrow_cost, AllocationEngine};
    pub use crate::allocation::error::{AllocationError, AllocationResult};
    pub use crate::allocation::plan::{Allocation, AllocationPlan, Strategy};
    pub use crate::core::bond::{Bond, CollateralInventory};
    pub use crate::core::candidate::{BorrowCandidate, BorrowMarket};
    pub use crate::core::deal::{DealError, RepoDeal};
    pub use crate::core::label::{BondType, CreditRating, RequirementLabel};
}
