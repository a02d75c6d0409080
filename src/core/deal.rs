use crate::core::label::{BondType, CreditRating};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Largest deal value the engine accepts, in currency units (10^18).
///
/// Keeps every intermediate amount and cost well inside `Decimal`'s
/// range, even when a strategy over-commits before validation.
pub const MAX_TOTAL_VALUE: Decimal = dec!(1_000_000_000_000_000_000);

/// Which requirement map a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementKind {
    Rating,
    Type,
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementKind::Rating => write!(f, "rating"),
            RequirementKind::Type => write!(f, "type"),
        }
    }
}

/// Errors raised while defining a repo deal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealError {
    #[error("deal {deal}: total value required must be positive, got {value}")]
    NonPositiveTotal { deal: String, value: Decimal },
    #[error("deal {deal}: total value required {value} exceeds the maximum of {max}")]
    TotalTooLarge {
        deal: String,
        value: Decimal,
        max: Decimal,
    },
    #[error("deal {deal}: {kind} requirement {label} must be within [0, 100], got {value}")]
    PercentageOutOfRange {
        deal: String,
        kind: RequirementKind,
        label: String,
        value: Decimal,
    },
    #[error("deal {deal}: {kind} requirements sum to {sum}%, exceeding 100%")]
    RequirementsExceedTotal {
        deal: String,
        kind: RequirementKind,
        sum: Decimal,
    },
}

/// A repo agreement and the collateral mix it demands.
///
/// Requirements are minimum percentages of `total_value_required` that
/// must come from bonds of a given rating or type. The two maps are
/// independent: a single bond may count towards both a rating quota and
/// a type quota.
///
/// A `RepoDeal` is immutable and carries no allocation progress. The
/// engine keeps its fulfilment bookkeeping per call and reports it on
/// the returned plan.
///
/// # Examples
///
/// ```
/// use repo_borrow_engine::core::deal::RepoDeal;
/// use repo_borrow_engine::core::label::{BondType, CreditRating};
/// use rust_decimal_macros::dec;
/// use std::collections::BTreeMap;
///
/// let deal = RepoDeal::new(
///     "D-1",
///     dec!(1_000_000),
///     BTreeMap::from([(CreditRating::new("AAA"), dec!(30))]),
///     BTreeMap::from([(BondType::new("Municipal"), dec!(20))]),
/// ).unwrap();
///
/// assert_eq!(deal.required_value_for_rating(&CreditRating::new("AAA")), dec!(300_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RepoDealRecord")]
pub struct RepoDeal {
    id: String,
    total_value_required: Decimal,
    rating_requirements: BTreeMap<CreditRating, Decimal>,
    type_requirements: BTreeMap<BondType, Decimal>,
}

impl RepoDeal {
    /// Define a deal, validating its requirement maps.
    pub fn new(
        id: impl Into<String>,
        total_value_required: Decimal,
        rating_requirements: BTreeMap<CreditRating, Decimal>,
        type_requirements: BTreeMap<BondType, Decimal>,
    ) -> Result<Self, DealError> {
        let id = id.into();
        if total_value_required <= Decimal::ZERO {
            return Err(DealError::NonPositiveTotal {
                deal: id,
                value: total_value_required,
            });
        }
        if total_value_required > MAX_TOTAL_VALUE {
            return Err(DealError::TotalTooLarge {
                deal: id,
                value: total_value_required,
                max: MAX_TOTAL_VALUE,
            });
        }
        validate_percentages(
            &id,
            RequirementKind::Rating,
            rating_requirements.iter().map(|(k, v)| (k.as_str(), *v)),
        )?;
        validate_percentages(
            &id,
            RequirementKind::Type,
            type_requirements.iter().map(|(k, v)| (k.as_str(), *v)),
        )?;
        Ok(Self {
            id,
            total_value_required,
            rating_requirements,
            type_requirements,
        })
    }

    // --- Accessors ---

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn total_value_required(&self) -> Decimal {
        self.total_value_required
    }

    pub fn rating_requirements(&self) -> &BTreeMap<CreditRating, Decimal> {
        &self.rating_requirements
    }

    pub fn type_requirements(&self) -> &BTreeMap<BondType, Decimal> {
        &self.type_requirements
    }

    /// Convert a percentage of the deal into currency units.
    pub fn percentage_to_value(&self, percentage: Decimal) -> Decimal {
        self.total_value_required * percentage / Decimal::ONE_HUNDRED
    }

    /// Dollar amount that must come from bonds rated `rating`.
    pub fn required_value_for_rating(&self, rating: &CreditRating) -> Decimal {
        self.rating_requirements
            .get(rating)
            .map(|pct| self.percentage_to_value(*pct))
            .unwrap_or(Decimal::ZERO)
    }

    /// Dollar amount that must come from bonds of `bond_type`.
    pub fn required_value_for_type(&self, bond_type: &BondType) -> Decimal {
        self.type_requirements
            .iter()
            .filter(|(t, _)| t.matches(bond_type))
            .map(|(_, pct)| self.percentage_to_value(*pct))
            .sum()
    }

    /// Whether the deal has any rating or type constraint with a
    /// positive percentage.
    pub fn has_constraints(&self) -> bool {
        self.rating_requirements
            .values()
            .chain(self.type_requirements.values())
            .any(|pct| *pct > Decimal::ZERO)
    }
}

/// Wire shape of a deal; deserialization goes through [`RepoDeal::new`].
#[derive(Deserialize)]
struct RepoDealRecord {
    id: String,
    total_value_required: Decimal,
    #[serde(default)]
    rating_requirements: BTreeMap<CreditRating, Decimal>,
    #[serde(default)]
    type_requirements: BTreeMap<BondType, Decimal>,
}

impl TryFrom<RepoDealRecord> for RepoDeal {
    type Error = DealError;

    fn try_from(record: RepoDealRecord) -> Result<Self, Self::Error> {
        RepoDeal::new(
            record.id,
            record.total_value_required,
            record.rating_requirements,
            record.type_requirements,
        )
    }
}

fn validate_percentages<'a>(
    deal: &str,
    kind: RequirementKind,
    entries: impl Iterator<Item = (&'a str, Decimal)>,
) -> Result<(), DealError> {
    let mut sum = Decimal::ZERO;
    for (label, pct) in entries {
        if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
            return Err(DealError::PercentageOutOfRange {
                deal: deal.to_string(),
                kind,
                label: label.to_string(),
                value: pct,
            });
        }
        sum += pct;
    }
    if sum > Decimal::ONE_HUNDRED {
        return Err(DealError::RequirementsExceedTotal {
            deal: deal.to_string(),
            kind,
            sum,
        });
    }
    Ok(())
}

impl fmt::Display for RepoDeal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoDeal {} requires {}", self.id, self.total_value_required)?;
        let labels: Vec<String> = self
            .rating_requirements
            .iter()
            .map(|(r, pct)| format!("{}>={}%", r, pct))
            .chain(
                self.type_requirements
                    .iter()
                    .map(|(t, pct)| format!("{}>={}%", t, pct)),
            )
            .collect();
        if !labels.is_empty() {
            write!(f, " [{}]", labels.join(", "))?;
        }
        Ok(())
    }
}
