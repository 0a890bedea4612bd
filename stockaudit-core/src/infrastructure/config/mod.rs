// stockaudit-core/src/infrastructure/config/mod.rs

pub mod validation;

pub use validation::load_validation_config;
