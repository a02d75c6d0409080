use serde::{Deserialize, Serialize};
use std::fmt;

/// The standard credit-quality ladder, weakest first.
pub const STANDARD_RATING_LADDER: [&str; 6] = ["B", "BB", "BBB", "A", "AA", "AAA"];

/// Credit rating label attached to a bond (e.g. "AAA", "BBB").
///
/// Ratings are normalised on construction: surrounding whitespace is
/// removed and the label is upper-cased, so `"aa "` and `"AA"` compare
/// equal.
///
/// # Examples
///
/// ```
/// use repo_borrow_engine::core::label::CreditRating;
///
/// let a = CreditRating::new("aaa");
/// let b = CreditRating::new("AAA");
/// assert_eq!(a, b);
/// assert_eq!(a.ladder_rank(), Some(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CreditRating(String);

impl CreditRating {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Position on [`STANDARD_RATING_LADDER`], 0 being the weakest.
    /// Returns `None` for labels that are not on the ladder (e.g. "CCC").
    pub fn ladder_rank(&self) -> Option<usize> {
        STANDARD_RATING_LADDER
            .iter()
            .position(|rung| *rung == self.0)
    }

    /// The standard ladder as rating values, weakest first.
    pub fn standard_ladder() -> Vec<CreditRating> {
        STANDARD_RATING_LADDER
            .iter()
            .map(|r| CreditRating::new(*r))
            .collect()
    }
}

impl fmt::Display for CreditRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CreditRating {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CreditRating {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CreditRating> for String {
    fn from(label: CreditRating) -> Self {
        label.0
    }
}

/// Bond category label (e.g. "Municipal", "Corporate", "Treasury").
///
/// The label keeps its original casing for display. Matching a bond
/// against a type requirement goes through [`BondType::matches`], which
/// ignores ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BondType(String);

impl BondType {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive label comparison.
    pub fn matches(&self, other: &BondType) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for BondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BondType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BondType {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<BondType> for String {
    fn from(label: BondType) -> Self {
        label.0
    }
}

/// A requirement label an allocation can be credited against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequirementLabel {
    Rating(CreditRating),
    Type(BondType),
    /// Value allocated with no rating or type target.
    Unconstrained,
}

impl fmt::Display for RequirementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementLabel::Rating(r) => write!(f, "{}", r),
            RequirementLabel::Type(t) => write!(f, "{}", t),
            RequirementLabel::Unconstrained => write!(f, "Unconstrained"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_normalisation() {
        assert_eq!(CreditRating::new(" bbb "), CreditRating::new("BBB"));
        assert_eq!(CreditRating::new("aa").as_str(), "AA");
    }

    #[test]
    fn test_ladder_rank() {
        assert_eq!(CreditRating::new("B").ladder_rank(), Some(0));
        assert_eq!(CreditRating::new("AAA").ladder_rank(), Some(5));
        assert_eq!(CreditRating::new("CCC").ladder_rank(), None);
    }

    #[test]
    fn test_standard_ladder_order() {
        let ladder = CreditRating::standard_ladder();
        assert_eq!(ladder.first().map(|r| r.as_str()), Some("B"));
        assert_eq!(ladder.last().map(|r| r.as_str()), Some("AAA"));
    }

    #[test]
    fn test_bond_type_matches_ignoring_case() {
        let a = BondType::new("Municipal");
        let b = BondType::new("MUNICIPAL");
        assert!(a.matches(&b));
        assert_ne!(a, b);
        assert_eq!(format!("{}", a), "Municipal");
    }

    #[test]
    fn test_deserialize_normalises_labels() {
        let rating: CreditRating = serde_json::from_str(r#"" aaa ""#).unwrap();
        assert_eq!(rating, CreditRating::new("AAA"));
        assert_eq!(serde_json::to_string(&rating).unwrap(), r#""AAA""#);

        let bond_type: BondType = serde_json::from_str(r#""Municipal ""#).unwrap();
        assert_eq!(bond_type.as_str(), "Municipal");
    }

    #[test]
    fn test_requirement_label_display() {
        assert_eq!(
            RequirementLabel::Rating(CreditRating::new("AAA")).to_string(),
            "AAA"
        );
        assert_eq!(
            RequirementLabel::Type(BondType::new("Corporate")).to_string(),
            "Corporate"
        );
        assert_eq!(RequirementLabel::Unconstrained.to_string(), "Unconstrained");
    }
}
