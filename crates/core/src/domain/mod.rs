pub mod chart;
pub mod instrument;
pub mod recommendation;
pub mod risk;
pub mod scoring;
pub mod suggestion;
pub mod tickers;
