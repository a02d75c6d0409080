//! Loading of collateral, borrow-market and deal files.
//!
//! Bond files are CSV with a header row:
//!
//! ```text
//! id,bondType,creditRating,quantity,price        (collateral)
//! id,bondType,creditRating,borrowRate            (borrow market)
//! ```
//!
//! Deals are JSON, percentages and values written as strings so they
//! parse exactly:
//!
//! ```text
//! {
//!   "deals": [
//!     {
//!       "id": "D-1",
//!       "total_value_required": "1000000",
//!       "rating_requirements": { "AAA": "30" },
//!       "type_requirements": { "Municipal": "20" }
//!     }
//!   ]
//! }
//! ```
//!
//! Every record is validated here, before it reaches the engine.

use crate::core::bond::{Bond, CollateralInventory};
use crate::core::candidate::{validate_borrow_rate, BorrowCandidate, BorrowMarket};
use crate::core::deal::{DealError, RepoDeal};
use crate::core::label::{BondType, CreditRating};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading input files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record '{record}': invalid {field} '{value}': {reason}")]
    InvalidRecord {
        record: String,
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Deal(#[from] DealError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollateralRow {
    id: String,
    bond_type: String,
    credit_rating: String,
    quantity: String,
    price: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketRow {
    id: String,
    bond_type: String,
    credit_rating: String,
    borrow_rate: String,
}

#[derive(Debug, Deserialize)]
struct DealInput {
    id: String,
    total_value_required: String,
    #[serde(default)]
    rating_requirements: BTreeMap<String, String>,
    #[serde(default)]
    type_requirements: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct DealsFile {
    deals: Vec<DealInput>,
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .has_headers(true)
        .from_reader(reader)
}

fn require_label(record: &str, field: &'static str, value: &str) -> Result<(), LoadError> {
    if value.trim().is_empty() {
        return Err(LoadError::InvalidRecord {
            record: record.to_string(),
            field,
            value: value.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn parse_decimal(record: &str, field: &'static str, value: &str) -> Result<Decimal, LoadError> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| LoadError::InvalidRecord {
            record: record.to_string(),
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

fn parse_non_negative(record: &str, field: &'static str, value: &str) -> Result<Decimal, LoadError> {
    let parsed = parse_decimal(record, field, value)?;
    if parsed < Decimal::ZERO {
        return Err(LoadError::InvalidRecord {
            record: record.to_string(),
            field,
            value: value.to_string(),
            reason: "must be non-negative".to_string(),
        });
    }
    Ok(parsed)
}

/// Read owned collateral from a CSV file.
pub fn load_collateral(path: impl AsRef<Path>) -> Result<CollateralInventory, LoadError> {
    collateral_from_reader(open(path.as_ref())?)
}

/// Read owned collateral from any CSV source.
pub fn collateral_from_reader<R: Read>(reader: R) -> Result<CollateralInventory, LoadError> {
    let mut inventory = CollateralInventory::new();
    for row in csv_reader(reader).deserialize::<CollateralRow>() {
        let row = row?;
        require_label(&row.id, "id", &row.id)?;
        require_label(&row.id, "bondType", &row.bond_type)?;
        require_label(&row.id, "creditRating", &row.credit_rating)?;
        let quantity = row
            .quantity
            .trim()
            .parse::<u64>()
            .map_err(|e| LoadError::InvalidRecord {
                record: row.id.clone(),
                field: "quantity",
                value: row.quantity.clone(),
                reason: e.to_string(),
            })?;
        let price = parse_non_negative(&row.id, "price", &row.price)?;

        inventory.add(Bond::new(
            row.id.as_str(),
            BondType::new(row.bond_type.as_str()),
            CreditRating::new(row.credit_rating.as_str()),
            quantity,
            price,
        ));
    }
    Ok(inventory)
}

/// Read the borrowable market from a CSV file.
pub fn load_borrow_market(path: impl AsRef<Path>) -> Result<BorrowMarket, LoadError> {
    borrow_market_from_reader(open(path.as_ref())?)
}

/// Read the borrowable market from any CSV source, keeping row order.
pub fn borrow_market_from_reader<R: Read>(reader: R) -> Result<BorrowMarket, LoadError> {
    let mut market = BorrowMarket::new();
    for row in csv_reader(reader).deserialize::<MarketRow>() {
        let row = row?;
        require_label(&row.id, "id", &row.id)?;
        require_label(&row.id, "bondType", &row.bond_type)?;
        require_label(&row.id, "creditRating", &row.credit_rating)?;
        let rate = parse_decimal(&row.id, "borrowRate", &row.borrow_rate)?;
        validate_borrow_rate(rate).map_err(|reason| LoadError::InvalidRecord {
            record: row.id.clone(),
            field: "borrowRate",
            value: row.borrow_rate.clone(),
            reason,
        })?;

        market.add(BorrowCandidate::new(
            row.id.as_str(),
            BondType::new(row.bond_type.as_str()),
            CreditRating::new(row.credit_rating.as_str()),
            rate,
        ));
    }
    Ok(market)
}

/// Write a borrow market as CSV in the format [`load_borrow_market`] reads.
pub fn write_borrow_market<W: Write>(market: &BorrowMarket, writer: W) -> Result<(), LoadError> {
    let mut out = csv::Writer::from_writer(writer);
    for candidate in market.candidates() {
        out.serialize(MarketRow {
            id: candidate.id().to_string(),
            bond_type: candidate.bond_type().to_string(),
            credit_rating: candidate.credit_rating().to_string(),
            borrow_rate: candidate.borrow_rate().to_string(),
        })?;
    }
    out.flush().map_err(|source| LoadError::Io {
        path: "<output>".to_string(),
        source,
    })?;
    Ok(())
}

/// Read and validate repo deals from a JSON file.
pub fn load_deals(path: impl AsRef<Path>) -> Result<Vec<RepoDeal>, LoadError> {
    deals_from_reader(open(path.as_ref())?)
}

/// Read and validate repo deals from any JSON source.
pub fn deals_from_reader<R: Read>(reader: R) -> Result<Vec<RepoDeal>, LoadError> {
    let file: DealsFile = serde_json::from_reader(reader)?;
    file.deals.into_iter().map(build_deal).collect()
}

fn duplicate_label(record: &str, field: &'static str, label: &str) -> LoadError {
    LoadError::InvalidRecord {
        record: record.to_string(),
        field,
        value: label.to_string(),
        reason: "duplicates another requirement label".to_string(),
    }
}

fn build_deal(input: DealInput) -> Result<RepoDeal, LoadError> {
    require_label(&input.id, "id", &input.id)?;
    let total = parse_decimal(&input.id, "total_value_required", &input.total_value_required)?;

    let mut ratings = BTreeMap::new();
    for (label, pct) in &input.rating_requirements {
        require_label(&input.id, "rating_requirements", label)?;
        let rating = CreditRating::new(label.as_str());
        if ratings.contains_key(&rating) {
            return Err(duplicate_label(&input.id, "rating_requirements", label));
        }
        ratings.insert(rating, parse_decimal(&input.id, "rating_requirements", pct)?);
    }

    let mut types = BTreeMap::new();
    for (label, pct) in &input.type_requirements {
        require_label(&input.id, "type_requirements", label)?;
        let bond_type = BondType::new(label.as_str());
        if types.keys().any(|existing: &BondType| existing.matches(&bond_type)) {
            return Err(duplicate_label(&input.id, "type_requirements", label));
        }
        types.insert(bond_type, parse_decimal(&input.id, "type_requirements", pct)?);
    }

    Ok(RepoDeal::new(input.id, total, ratings, types)?)
}
