pub mod alpha_vantage;
pub mod collect;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod types;
