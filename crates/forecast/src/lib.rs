//! `stocksense-forecast`
//!
//! **Responsibility:** demand estimation from daily sales series.
//!
//! This crate is intentionally **pure**:
//! - It must not depend on the store or any runtime.
//! - It consumes a [`DailySeries`] and produces point forecasts.
//! - Model-fit failures degrade to "unavailable" (`None`), never to errors.

pub mod decomposition;
pub mod hybrid;
mod linalg;
pub mod model;
pub mod seasonal;
pub mod series;

pub use decomposition::SeasonalDecomposition;
pub use hybrid::{Forecast, ForecastConfig, ForecastLabel, HybridForecaster};
pub use model::{DemandModel, FittedModel};
pub use seasonal::SeasonalArima;
pub use series::DailySeries;
