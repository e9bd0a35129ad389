use serde::{Deserialize, Serialize};

use crate::decomposition::SeasonalDecomposition;
use crate::model::DemandModel;
use crate::seasonal::SeasonalArima;
use crate::series::DailySeries;

/// Which estimator produced a stored forecast.
///
/// The string forms are stable: they are persisted with every forecast point
/// and read back for observability, so renaming a variant must keep
/// `as_str` unchanged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastLabel {
    /// No sales history at all; the forecast is all zeros.
    NoHistory,
    /// Neither model was available; historical mean repeated.
    AvgFallback,
    /// Only the decomposition model was available.
    DecompositionOnly,
    /// Only the seasonal model was available.
    SeasonalOnly,
    /// Elementwise mean of both model predictions.
    Hybrid,
}

impl ForecastLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastLabel::NoHistory => "none",
            ForecastLabel::AvgFallback => "avg_fallback",
            ForecastLabel::DecompositionOnly => "decomposition_only",
            ForecastLabel::SeasonalOnly => "seasonal_only",
            ForecastLabel::Hybrid => "hybrid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ForecastLabel::NoHistory),
            "avg_fallback" => Some(ForecastLabel::AvgFallback),
            "decomposition_only" => Some(ForecastLabel::DecompositionOnly),
            "seasonal_only" => Some(ForecastLabel::SeasonalOnly),
            "hybrid" => Some(ForecastLabel::Hybrid),
            _ => None,
        }
    }
}

impl core::fmt::Display for ForecastLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A horizon of daily point forecasts plus the label that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub values: Vec<f64>,
    pub label: ForecastLabel,
}

/// Forecasting knobs, passed explicitly to the forecaster at construction.
///
/// Defaults: 14-day horizon, 7-day seasonal period, 10 observations minimum
/// for the seasonal model, 6 for the decomposition model, ridge smoothing
/// `1e-3` on the decomposition's seasonal terms.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ForecastConfig {
    pub horizon_days: usize,
    pub seasonal_period: usize,
    pub seasonal_min_obs: usize,
    pub decomposition_min_obs: usize,
    pub smoothing: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 14,
            seasonal_period: 7,
            seasonal_min_obs: 10,
            decomposition_min_obs: 6,
            smoothing: 1e-3,
        }
    }
}

impl ForecastConfig {
    pub fn with_horizon_days(mut self, horizon_days: usize) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period;
        self
    }

    pub fn with_seasonal_min_obs(mut self, min_obs: usize) -> Self {
        self.seasonal_min_obs = min_obs;
        self
    }

    pub fn with_decomposition_min_obs(mut self, min_obs: usize) -> Self {
        self.decomposition_min_obs = min_obs;
        self
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }
}

/// Blends the two demand models with a fixed fallback ladder.
///
/// `forecast` always succeeds and always returns exactly `horizon` values;
/// model unavailability only moves the result down the ladder.
#[derive(Debug, Clone)]
pub struct HybridForecaster {
    config: ForecastConfig,
    seasonal: SeasonalArima,
    decomposition: SeasonalDecomposition,
}

impl Default for HybridForecaster {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

impl HybridForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            seasonal: SeasonalArima::new(config.seasonal_period, config.seasonal_min_obs),
            decomposition: SeasonalDecomposition::default()
                .with_min_obs(config.decomposition_min_obs)
                .with_smoothing(config.smoothing),
            config,
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast over the configured horizon.
    pub fn forecast(&self, series: &DailySeries) -> Forecast {
        self.forecast_with_horizon(series, self.config.horizon_days)
    }

    /// Forecast over an explicit horizon. Ladder, in order:
    /// 1. no history → zeros (`none`)
    /// 2. both models unavailable → mean repeated (`avg_fallback`)
    /// 3. decomposition only (`decomposition_only`)
    /// 4. seasonal only (`seasonal_only`)
    /// 5. both → elementwise mean (`hybrid`)
    pub fn forecast_with_horizon(&self, series: &DailySeries, horizon: usize) -> Forecast {
        if series.is_empty() {
            return Forecast {
                values: vec![0.0; horizon],
                label: ForecastLabel::NoHistory,
            };
        }

        let seasonal = self.seasonal.fit(series).map(|m| m.forecast(horizon));
        let decomposition = self.decomposition.fit(series).map(|m| m.forecast(horizon));

        let (values, label) = match (seasonal, decomposition) {
            (None, None) => (vec![series.mean(); horizon], ForecastLabel::AvgFallback),
            (None, Some(d)) => (d, ForecastLabel::DecompositionOnly),
            (Some(s), None) => (s, ForecastLabel::SeasonalOnly),
            (Some(s), Some(d)) => (
                s.iter().zip(&d).map(|(a, b)| (a + b) / 2.0).collect(),
                ForecastLabel::Hybrid,
            ),
        };
        debug_assert_eq!(values.len(), horizon);
        Forecast { values, label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DemandModel;
    use chrono::{Days, NaiveDate};

    fn daily(values: &[f64]) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        DailySeries::from_points(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (start + Days::new(i as u64), v)),
        )
    }

    #[test]
    fn empty_history_yields_zeros_under_the_none_label() {
        let forecaster = HybridForecaster::default();
        let fc = forecaster.forecast(&DailySeries::default());
        assert_eq!(fc.label, ForecastLabel::NoHistory);
        assert_eq!(fc.values, vec![0.0; 14]);
    }

    #[test]
    fn short_history_falls_back_to_the_mean() {
        let forecaster = HybridForecaster::default();
        let fc = forecaster.forecast(&daily(&[4.0, 6.0, 8.0]));
        assert_eq!(fc.label, ForecastLabel::AvgFallback);
        assert_eq!(fc.values, vec![6.0; 14]);
    }

    #[test]
    fn mid_history_uses_the_decomposition_model_alone() {
        let forecaster = HybridForecaster::default();
        let fc = forecaster.forecast(&daily(&[5.0; 7]));
        assert_eq!(fc.label, ForecastLabel::DecompositionOnly);
        assert_eq!(fc.values.len(), 14);
    }

    #[test]
    fn unavailable_decomposition_leaves_the_seasonal_model_alone() {
        let config = ForecastConfig::default().with_decomposition_min_obs(1000);
        let forecaster = HybridForecaster::new(config);
        let fc = forecaster.forecast(&daily(&[12.0; 30]));
        assert_eq!(fc.label, ForecastLabel::SeasonalOnly);
        assert_eq!(fc.values.len(), 14);
    }

    #[test]
    fn long_history_blends_both_models_elementwise() {
        let forecaster = HybridForecaster::default();
        let values: Vec<f64> = (0..40).map(|t| 10.0 + (t % 7) as f64).collect();
        let series = daily(&values);

        let fc = forecaster.forecast(&series);
        assert_eq!(fc.label, ForecastLabel::Hybrid);
        assert_eq!(fc.values.len(), 14);

        let s = forecaster.seasonal.fit(&series).unwrap().forecast(14);
        let d = forecaster.decomposition.fit(&series).unwrap().forecast(14);
        for h in 0..14 {
            let expected = (s[h] + d[h]) / 2.0;
            assert!((fc.values[h] - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn every_tier_returns_exactly_the_horizon() {
        let forecaster = HybridForecaster::default();
        for series in [
            DailySeries::default(),
            daily(&[1.0, 2.0]),
            daily(&[5.0; 8]),
            daily(&[5.0; 40]),
        ] {
            for horizon in [1usize, 7, 14, 30] {
                let fc = forecaster.forecast_with_horizon(&series, horizon);
                assert_eq!(fc.values.len(), horizon);
            }
        }
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: whatever tier the ladder lands on, the output is
            /// exactly `horizon` finite values.
            #[test]
            fn ladder_always_returns_exactly_the_horizon(
                values in proptest::collection::vec(0.0f64..500.0, 0..48),
                horizon in 1usize..30,
            ) {
                let forecaster = HybridForecaster::default();
                let fc = forecaster.forecast_with_horizon(&daily(&values), horizon);
                prop_assert_eq!(fc.values.len(), horizon);
                prop_assert!(fc.values.iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn labels_round_trip_through_their_string_form() {
        for label in [
            ForecastLabel::NoHistory,
            ForecastLabel::AvgFallback,
            ForecastLabel::DecompositionOnly,
            ForecastLabel::SeasonalOnly,
            ForecastLabel::Hybrid,
        ] {
            assert_eq!(ForecastLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(ForecastLabel::parse("prophet"), None);
    }
}
