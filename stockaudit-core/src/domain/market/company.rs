// stockaudit-core/src/domain/market/company.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::normalize_key;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    /// Unique business key, compared case-insensitively.
    pub ticker: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.into(),
            name: name.into(),
            sector: None,
            exchange: None,
            created_at: Utc::now(),
        }
    }

    pub fn normalized_ticker(&self) -> String {
        normalize_key(&self.ticker)
    }
}
