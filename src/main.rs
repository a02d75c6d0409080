//! repo-borrow-engine CLI
//!
//! Price the collateral borrowing for repo deals from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Allocate every deal in a file against a borrow market
//! repo-borrow-engine allocate --market borrow_market.csv --deals deals.json
//!
//! # Output as JSON, with a finer fallback search
//! repo-borrow-engine allocate --market borrow_market.csv --deals deals.json --format json --step-percent 10
//!
//! # Summarise owned collateral
//! repo-borrow-engine inventory --input collateral.csv
//!
//! # Generate a random borrow market for testing
//! repo-borrow-engine generate --candidates 12 --output market.csv
//! ```

use repo_borrow_engine::allocation::config::EngineConfig;
use repo_borrow_engine::allocation::engine::AllocationEngine;
use repo_borrow_engine::allocation::plan::AllocationPlan;
use repo_borrow_engine::io::loader::{load_borrow_market, load_collateral, load_deals, write_borrow_market};
use repo_borrow_engine::simulation::market_generator::{generate_random_market, MarketConfig};
use rust_decimal::Decimal;
use std::fs::File;
use std::process;

fn print_usage() {
    eprintln!(
        r#"repo-borrow-engine: cheapest collateral borrowing for repo deals

USAGE:
    repo-borrow-engine <COMMAND> [OPTIONS]

COMMANDS:
    allocate    Compute the cheapest borrowing plan for each deal
    inventory   Summarise owned collateral
    generate    Generate a random borrow market (for testing)
    help        Show this message

OPTIONS (allocate):
    --market <FILE>         Borrow market CSV (id,bondType,creditRating,borrowRate)
    --deals <FILE>          Deals JSON file
    --format <FORMAT>       Output format: text (default) or json
    --step-percent <N>      Fallback search step, percent of deal value (default: 20)
    --search-budget <N>     Fallback search node budget (default: 2000000)

OPTIONS (inventory):
    --input <FILE>          Collateral CSV (id,bondType,creditRating,quantity,price)
    --format <FORMAT>       Output format: text (default) or json

OPTIONS (generate):
    --candidates <N>        Number of market candidates (default: 10)
    --output <FILE>         Write to file instead of stdout

Set RUST_LOG=info (or debug) to trace allocation decisions.

EXAMPLES:
    repo-borrow-engine allocate --market borrow_market.csv --deals deals.json
    repo-borrow-engine allocate --market borrow_market.csv --deals deals.json --format json
    repo-borrow-engine inventory --input collateral.csv
    repo-borrow-engine generate --candidates 20 --output market.csv"#
    );
}

/// JSON output schema for one deal.
#[derive(serde::Serialize)]
struct DealOutput {
    deal: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_cost: Option<String>,
    allocations: Vec<AllocationOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(serde::Serialize)]
struct AllocationOutput {
    candidate: String,
    bond_type: String,
    credit_rating: String,
    rate: String,
    amount: String,
    credited: Vec<String>,
}

#[derive(serde::Serialize)]
struct InventoryOutput {
    bonds: usize,
    market_value: String,
    by_rating: Vec<(String, String)>,
    by_type: Vec<(String, String)>,
}

fn plan_output(plan: &AllocationPlan) -> DealOutput {
    DealOutput {
        deal: plan.deal_id().to_string(),
        status: "OK".to_string(),
        strategy: Some(plan.strategy().to_string()),
        total_cost: Some(plan.total_cost().to_string()),
        allocations: plan
            .allocations()
            .iter()
            .map(|a| AllocationOutput {
                candidate: a.candidate_id.clone(),
                bond_type: a.bond_type.to_string(),
                credit_rating: a.credit_rating.to_string(),
                rate: a.rate.to_string(),
                amount: a.amount.to_string(),
                credited: a.credited.iter().map(|l| l.to_string()).collect(),
            })
            .collect(),
        error: None,
    }
}

fn next_value(args: &[String], i: usize, flag: &str, what: &str) -> String {
    args.get(i).cloned().unwrap_or_else(|| {
        eprintln!("{} requires {}", flag, what);
        process::exit(1);
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_allocate(args: &[String]) {
    let mut market_path = None;
    let mut deals_path = None;
    let mut format = "text".to_string();
    let mut config = EngineConfig::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--market" => {
                i += 1;
                market_path = Some(next_value(args, i, "--market", "a file path"));
            }
            "--deals" => {
                i += 1;
                deals_path = Some(next_value(args, i, "--deals", "a file path"));
            }
            "--format" => {
                i += 1;
                format = next_value(args, i, "--format", "'text' or 'json'");
            }
            "--step-percent" => {
                i += 1;
                let raw = next_value(args, i, "--step-percent", "a number");
                let step: Decimal = raw.parse().unwrap_or_else(|e| {
                    eprintln!("Invalid step percent '{}': {}", raw, e);
                    process::exit(1);
                });
                config = config.with_step_percent(step);
            }
            "--search-budget" => {
                i += 1;
                let raw = next_value(args, i, "--search-budget", "a number");
                let budget: u64 = raw.parse().unwrap_or_else(|e| {
                    eprintln!("Invalid search budget '{}': {}", raw, e);
                    process::exit(1);
                });
                config = config.with_search_budget(budget);
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let market_path = market_path.unwrap_or_else(|| {
        eprintln!("Error: --market <FILE> is required");
        process::exit(1);
    });
    let deals_path = deals_path.unwrap_or_else(|| {
        eprintln!("Error: --deals <FILE> is required");
        process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let market = load_borrow_market(&market_path).unwrap_or_else(|e| {
        eprintln!("Error loading borrow market: {}", e);
        process::exit(1);
    });
    let deals = load_deals(&deals_path).unwrap_or_else(|e| {
        eprintln!("Error loading deals: {}", e);
        process::exit(1);
    });

    let engine = AllocationEngine::new(config);

    if format == "json" {
        let outputs: Vec<DealOutput> = deals
            .iter()
            .map(|deal| match engine.allocate(deal, market.candidates()) {
                Ok(plan) => plan_output(&plan),
                Err(e) => DealOutput {
                    deal: deal.id().to_string(),
                    status: "FAILED".to_string(),
                    strategy: None,
                    total_cost: None,
                    allocations: Vec::new(),
                    error: Some(e.to_string()),
                },
            })
            .collect();
        print_json(&outputs);
    } else {
        println!("{}", market);
        println!("Loaded {} repo deals.\n", deals.len());
        for deal in &deals {
            println!("{}", deal);
            match engine.allocate(deal, market.candidates()) {
                Ok(plan) => println!("{}\n", plan),
                Err(e) => println!("  Allocation failed: {}\n", e),
            }
        }
    }
}

fn cmd_inventory(args: &[String]) {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(next_value(args, i, "--input", "a file path"));
            }
            "--format" => {
                i += 1;
                format = next_value(args, i, "--format", "'text' or 'json'");
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let inventory = load_collateral(&path).unwrap_or_else(|e| {
        eprintln!("Error loading collateral: {}", e);
        process::exit(1);
    });

    if format == "json" {
        let output = InventoryOutput {
            bonds: inventory.len(),
            market_value: inventory.total_market_value().to_string(),
            by_rating: inventory
                .value_by_rating()
                .into_iter()
                .map(|(r, v)| (r.to_string(), v.to_string()))
                .collect(),
            by_type: inventory
                .value_by_type()
                .into_iter()
                .map(|(t, v)| (t.to_string(), v.to_string()))
                .collect(),
        };
        print_json(&output);
    } else {
        println!("{}", inventory);
    }
}

fn cmd_generate(args: &[String]) {
    let mut candidates = 10usize;
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--candidates" => {
                i += 1;
                candidates = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--candidates requires a number");
                        process::exit(1);
                    });
            }
            "--output" => {
                i += 1;
                output_path = Some(next_value(args, i, "--output", "a file path"));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = MarketConfig {
        candidate_count: candidates,
        ..Default::default()
    };
    let market = generate_random_market(&config);

    let written = match &output_path {
        Some(path) => File::create(path)
            .map_err(|e| e.to_string())
            .and_then(|file| write_borrow_market(&market, file).map_err(|e| e.to_string())),
        None => write_borrow_market(&market, std::io::stdout()).map_err(|e| e.to_string()),
    };
    if let Err(e) = written {
        eprintln!("Error writing market: {}", e);
        process::exit(1);
    }
    if let Some(path) = output_path {
        eprintln!("Generated {} borrow candidates → {}", market.len(), path);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "allocate" => cmd_allocate(rest),
        "inventory" => cmd_inventory(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
