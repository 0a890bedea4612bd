// stockaudit-core/src/domain/market/stock_rating.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::normalize_key;

/// A brokerage's rating event on a company. Owned by the (Company, Brokerage)
/// pair it references, but owns neither of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRating {
    pub id: Uuid,
    pub company_id: Uuid,
    pub brokerage_id: Uuid,
    pub action: String,
    pub rating_from: String,
    pub rating_to: String,
    #[serde(default)]
    pub target_from: Option<f64>,
    #[serde(default)]
    pub target_to: Option<f64>,
    /// Event time, as reported by the source.
    pub time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Price movement implied by a rating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionDirection {
    Up,
    Down,
}

/// The comparable content of a rating, used to tell exact duplicates
/// from ambiguous ones.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingPayload {
    pub action: String,
    pub rating_from: String,
    pub rating_to: String,
    pub target_from: Option<f64>,
    pub target_to: Option<f64>,
}

impl StockRating {
    pub fn new(
        company_id: Uuid,
        brokerage_id: Uuid,
        action: impl Into<String>,
        rating_from: impl Into<String>,
        rating_to: impl Into<String>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            brokerage_id,
            action: action.into(),
            rating_from: rating_from.into(),
            rating_to: rating_to.into(),
            target_from: None,
            target_to: None,
            time,
            created_at: Utc::now(),
        }
    }

    pub fn with_targets(mut self, from: Option<f64>, to: Option<f64>) -> Self {
        self.target_from = from;
        self.target_to = to;
        self
    }

    pub fn normalized_action(&self) -> String {
        normalize_key(&self.action)
    }

    /// Direction the targets are expected to move for this action, if any.
    pub fn expected_direction(&self) -> Option<ActionDirection> {
        match self.normalized_action().as_str() {
            "upgraded by" | "target raised by" => Some(ActionDirection::Up),
            "downgraded by" | "target lowered by" => Some(ActionDirection::Down),
            _ => None,
        }
    }

    pub fn payload(&self) -> RatingPayload {
        RatingPayload {
            action: self.normalized_action(),
            rating_from: normalize_key(&self.rating_from),
            rating_to: normalize_key(&self.rating_to),
            target_from: self.target_from,
            target_to: self.target_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(action: &str) -> StockRating {
        StockRating::new(Uuid::new_v4(), Uuid::new_v4(), action, "Hold", "Buy", Utc::now())
    }

    #[test]
    fn test_expected_direction() {
        assert_eq!(
            rating("Upgraded By").expected_direction(),
            Some(ActionDirection::Up)
        );
        assert_eq!(
            rating(" target lowered by ").expected_direction(),
            Some(ActionDirection::Down)
        );
        assert_eq!(rating("reiterated by").expected_direction(), None);
    }

    #[test]
    fn test_payload_ignores_case_and_padding() {
        let a = rating("upgraded by").with_targets(Some(10.0), Some(12.0));
        let mut b = a.clone();
        b.action = "Upgraded by ".into();
        b.rating_to = "buy".into();
        assert_eq!(a.payload(), b.payload());

        b.target_to = Some(13.0);
        assert_ne!(a.payload(), b.payload());
    }
}
