use chrono::{Datelike, Days, NaiveDate};

use crate::linalg::solve_least_squares;
use crate::model::{DemandModel, FittedModel};
use crate::series::DailySeries;

/// Additive trend/seasonality decomposition model.
///
/// Fits `level + trend + weekly + yearly` jointly by ridge-regularized least
/// squares on the (possibly irregular) daily series; seasonal terms are
/// low-order harmonics over the 7-day and 365.25-day cycles. On a
/// date-indexed series the sub-daily cycle collapses into the level term.
/// Prediction extends the timeline past the last observed date and evaluates
/// the fitted components on the forecasted tail only.
#[derive(Debug, Copy, Clone)]
pub struct SeasonalDecomposition {
    min_obs: usize,
    weekly: bool,
    yearly: bool,
    weekly_order: usize,
    yearly_order: usize,
    /// Ridge penalty applied to the seasonal coefficients.
    smoothing: f64,
}

impl Default for SeasonalDecomposition {
    fn default() -> Self {
        Self {
            min_obs: 6,
            weekly: true,
            yearly: true,
            weekly_order: 3,
            yearly_order: 2,
            smoothing: 1e-3,
        }
    }
}

impl SeasonalDecomposition {
    pub fn with_min_obs(mut self, min_obs: usize) -> Self {
        self.min_obs = min_obs;
        self
    }

    pub fn with_weekly(mut self, enabled: bool) -> Self {
        self.weekly = enabled;
        self
    }

    pub fn with_yearly(mut self, enabled: bool) -> Self {
        self.yearly = enabled;
        self
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    fn design_row(&self, origin: NaiveDate, date: NaiveDate) -> Vec<f64> {
        let t = (date - origin).num_days() as f64;
        let day = date.num_days_from_ce() as f64;
        let tau = std::f64::consts::TAU;

        let mut row = vec![1.0, t];
        if self.weekly {
            for k in 1..=self.weekly_order {
                let angle = tau * k as f64 * day / 7.0;
                row.push(angle.sin());
                row.push(angle.cos());
            }
        }
        if self.yearly {
            for k in 1..=self.yearly_order {
                let angle = tau * k as f64 * day / 365.25;
                row.push(angle.sin());
                row.push(angle.cos());
            }
        }
        row
    }
}

impl DemandModel for SeasonalDecomposition {
    fn fit(&self, series: &DailySeries) -> Option<Box<dyn FittedModel>> {
        if series.len() < self.min_obs {
            return None;
        }
        let origin = series.first_date()?;
        let last = series.last_date()?;

        let mut rows = Vec::with_capacity(series.len());
        let mut y = Vec::with_capacity(series.len());
        for (date, value) in series.points() {
            rows.push(self.design_row(origin, date));
            y.push(value);
        }

        // Level and trend are unpenalized; harmonics carry the smoothing.
        let k = rows[0].len();
        let mut ridge = vec![self.smoothing; k];
        ridge[0] = 0.0;
        ridge[1] = 0.0;

        let coef = solve_least_squares(&rows, &y, &ridge)?;
        Some(Box::new(FittedDecomposition {
            model: *self,
            coef,
            origin,
            last,
        }))
    }
}

/// A fitted decomposition, ready to extend the timeline.
#[derive(Debug, Clone)]
pub struct FittedDecomposition {
    model: SeasonalDecomposition,
    coef: Vec<f64>,
    origin: NaiveDate,
    last: NaiveDate,
}

impl FittedModel for FittedDecomposition {
    fn forecast(&self, horizon: usize) -> Vec<f64> {
        (1..=horizon)
            .map(|h| {
                let date = self.last + Days::new(h as u64);
                self.model
                    .design_row(self.origin, date)
                    .iter()
                    .zip(&self.coef)
                    .map(|(x, c)| x * c)
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn too_few_observations_is_unavailable() {
        let model = SeasonalDecomposition::default();
        assert!(model.fit(&daily(&[3.0; 5])).is_none());
        assert!(model.fit(&daily(&[3.0; 6])).is_some());
    }

    #[test]
    fn constant_series_forecasts_the_constant() {
        let model = SeasonalDecomposition::default();
        let fitted = model.fit(&daily(&[10.0; 20])).unwrap();
        for v in fitted.forecast(7) {
            assert!((v - 10.0).abs() < 0.5, "forecast {v} should stay near 10");
        }
    }

    #[test]
    fn linear_trend_is_continued() {
        let model = SeasonalDecomposition::default();
        let values: Vec<f64> = (0..30).map(|t| 2.0 + 0.5 * t as f64).collect();
        let fitted = model.fit(&daily(&values)).unwrap();
        let fc = fitted.forecast(5);
        for (h, v) in fc.iter().enumerate() {
            let expected = 2.0 + 0.5 * (30 + h) as f64;
            assert!(
                (v - expected).abs() < 1.0,
                "h={h}: forecast {v} too far from {expected}"
            );
        }
    }

    #[test]
    fn weekly_cycle_is_learned() {
        let model = SeasonalDecomposition::default();
        let tau = std::f64::consts::TAU;
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let wave = |date: NaiveDate| 10.0 + 5.0 * (tau * date.num_days_from_ce() as f64 / 7.0).sin();
        let series = DailySeries::from_points(
            (0..56).map(|i| {
                let d = start + Days::new(i);
                (d, wave(d))
            }),
        );
        let fitted = model.fit(&series).unwrap();
        let fc = fitted.forecast(7);
        for (h, v) in fc.iter().enumerate() {
            let expected = wave(start + Days::new(56 + h as u64));
            assert!(
                (v - expected).abs() < 1.0,
                "h={h}: forecast {v} too far from {expected}"
            );
        }
    }

    #[test]
    fn irregular_series_is_tolerated() {
        let model = SeasonalDecomposition::default();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        // 8 active days spread over three weeks.
        let series = DailySeries::from_points(
            [0u64, 2, 5, 9, 10, 14, 17, 20]
                .into_iter()
                .map(|off| (start + Days::new(off), 5.0)),
        );
        let fitted = model.fit(&series).unwrap();
        let fc = fitted.forecast(14);
        assert_eq!(fc.len(), 14);
        for v in fc {
            assert!((v - 5.0).abs() < 1.0, "forecast {v} should stay near 5");
        }
    }
}
