// stockaudit-core/src/ports/mod.rs

pub mod logger;
pub mod repository;

pub use logger::{ValidationEvent, ValidationLogger};
pub use repository::{
    BrokerageRepository, CompanyRepository, RepositoryError, StockRatingRepository,
};
