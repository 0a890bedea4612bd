// stockaudit-core/src/domain/market/mod.rs

pub mod brokerage;
pub mod company;
pub mod stock_rating;

pub use brokerage::Brokerage;
pub use company::Company;
pub use stock_rating::{ActionDirection, RatingPayload, StockRating};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three entity kinds the engine audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Company,
    Brokerage,
    StockRating,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Brokerage => "brokerage",
            Self::StockRating => "stock_rating",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Business-key normalization: trimmed, case-folded, inner whitespace collapsed.
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// True when the value carries leading or trailing whitespace.
pub fn has_surrounding_whitespace(raw: &str) -> bool {
    raw.trim().len() != raw.len()
}
