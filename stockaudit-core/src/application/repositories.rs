// stockaudit-core/src/application/repositories.rs

use std::sync::Arc;

use crate::ports::repository::{BrokerageRepository, CompanyRepository, StockRatingRepository};

/// The three repository ports, injected together.
#[derive(Clone)]
pub struct Repositories {
    pub companies: Arc<dyn CompanyRepository>,
    pub brokerages: Arc<dyn BrokerageRepository>,
    pub ratings: Arc<dyn StockRatingRepository>,
}

impl Repositories {
    pub fn new(
        companies: Arc<dyn CompanyRepository>,
        brokerages: Arc<dyn BrokerageRepository>,
        ratings: Arc<dyn StockRatingRepository>,
    ) -> Self {
        Self {
            companies,
            brokerages,
            ratings,
        }
    }

    /// Wires a single store that implements all three ports.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CompanyRepository + BrokerageRepository + StockRatingRepository + 'static,
    {
        Self {
            companies: store.clone(),
            brokerages: store.clone(),
            ratings: store,
        }
    }
}
