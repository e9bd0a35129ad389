use crate::linalg::solve_least_squares;
use crate::model::{DemandModel, FittedModel};
use crate::series::DailySeries;

/// Non-seasonal `(p, d, q)` order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal `(P, D, Q)` order with its period in days.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

/// Seasonal autoregressive-moving-average demand model.
///
/// Order selection walks a small candidate grid and keeps the lowest-AIC
/// fit; when no candidate fits, the fixed default orders `(1,1,1)` /
/// `(0,1,1,period)` are tried last. Estimation is conditional least squares
/// seeded with long-AR residuals (Hannan–Rissanen); no stationarity or
/// invertibility constraints are imposed on the estimated coefficients.
#[derive(Debug, Copy, Clone)]
pub struct SeasonalArima {
    period: usize,
    min_obs: usize,
}

impl Default for SeasonalArima {
    fn default() -> Self {
        Self {
            period: 7,
            min_obs: 10,
        }
    }
}

impl SeasonalArima {
    pub fn new(period: usize, min_obs: usize) -> Self {
        Self { period, min_obs }
    }

    pub fn with_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }

    pub fn with_min_obs(mut self, min_obs: usize) -> Self {
        self.min_obs = min_obs;
        self
    }

    /// Candidate grid walked during automatic order selection.
    fn candidates(&self) -> Vec<(ArimaOrder, SeasonalOrder)> {
        let m = self.period;
        let ns = |p, d, q| ArimaOrder { p, d, q };
        let s = |p, d, q| SeasonalOrder { p, d, q, period: m };
        vec![
            (ns(0, 1, 0), s(0, 0, 0)),
            (ns(1, 1, 0), s(0, 0, 0)),
            (ns(0, 1, 1), s(0, 0, 0)),
            (ns(1, 1, 1), s(0, 0, 0)),
            (ns(2, 1, 2), s(0, 0, 0)),
            (ns(1, 1, 0), s(1, 0, 0)),
            (ns(0, 1, 1), s(0, 0, 1)),
            (ns(1, 1, 1), s(1, 0, 1)),
            (ns(1, 1, 0), s(1, 1, 0)),
            (ns(0, 1, 1), s(0, 1, 1)),
            (ns(1, 1, 1), s(0, 1, 1)),
        ]
    }

    fn default_orders(&self) -> (ArimaOrder, SeasonalOrder) {
        (
            ArimaOrder { p: 1, d: 1, q: 1 },
            SeasonalOrder {
                p: 0,
                d: 1,
                q: 1,
                period: self.period,
            },
        )
    }
}

impl DemandModel for SeasonalArima {
    fn fit(&self, series: &DailySeries) -> Option<Box<dyn FittedModel>> {
        if series.len() < self.min_obs {
            return None;
        }
        let values = series.values();

        let mut best: Option<FittedSeasonalArima> = None;
        for (order, seasonal) in self.candidates() {
            if let Some(fitted) = FittedSeasonalArima::estimate(&values, order, seasonal) {
                if best.as_ref().is_none_or(|b| fitted.aic < b.aic) {
                    best = Some(fitted);
                }
            }
        }

        let fitted = match best {
            Some(f) => f,
            None => {
                let (order, seasonal) = self.default_orders();
                FittedSeasonalArima::estimate(&values, order, seasonal)?
            }
        };
        Some(Box::new(fitted))
    }
}

/// A fitted seasonal ARMA model over the differenced series.
#[derive(Debug, Clone)]
pub struct FittedSeasonalArima {
    /// Series before each differencing step; `stages[0]` is the original.
    stages: Vec<Vec<f64>>,
    /// Lag of each differencing step, in application order.
    ops: Vec<usize>,
    /// Fully differenced, centered working series.
    w: Vec<f64>,
    /// Mean removed from `w` (non-zero only when no differencing applied).
    mu: f64,
    phi: Vec<f64>,
    big_phi: Vec<f64>,
    theta: Vec<f64>,
    big_theta: Vec<f64>,
    period: usize,
    /// In-sample one-step residuals aligned to `w`.
    resid: Vec<f64>,
    aic: f64,
}

impl FittedSeasonalArima {
    pub fn aic(&self) -> f64 {
        self.aic
    }

    fn estimate(values: &[f64], order: ArimaOrder, seasonal: SeasonalOrder) -> Option<Self> {
        let period = seasonal.period;
        let mut ops = Vec::with_capacity(order.d + seasonal.d);
        ops.extend(std::iter::repeat_n(1usize, order.d));
        ops.extend(std::iter::repeat_n(period, seasonal.d));

        let mut stages: Vec<Vec<f64>> = vec![values.to_vec()];
        for &lag in &ops {
            let prev = stages.last()?;
            if prev.len() <= lag {
                return None;
            }
            let next: Vec<f64> = (lag..prev.len()).map(|t| prev[t] - prev[t - lag]).collect();
            stages.push(next);
        }

        let mut w = stages.last()?.clone();
        let n = w.len();
        if n == 0 {
            return None;
        }
        let mu = if ops.is_empty() {
            w.iter().sum::<f64>() / n as f64
        } else {
            0.0
        };
        for v in &mut w {
            *v -= mu;
        }

        let (p, q) = (order.p, order.q);
        let (bp, bq) = (seasonal.p, seasonal.q);
        let k = p + bp + q + bq;
        let ar_span = (p).max(bp * period);
        let ma_span = (q).max(bq * period);

        if k == 0 {
            let sigma2 = w.iter().map(|v| v * v).sum::<f64>() / n as f64;
            if !sigma2.is_finite() {
                return None;
            }
            let aic = n as f64 * sigma2.max(1e-12).ln() + 2.0;
            return Some(Self {
                stages,
                ops,
                resid: w.clone(),
                w,
                mu,
                phi: vec![],
                big_phi: vec![],
                theta: vec![],
                big_theta: vec![],
                period,
                aic,
            });
        }

        // Long-AR pass: residual estimates for the moving-average lags.
        let mut e = vec![0.0f64; n];
        let mut long_ar = 0usize;
        if q + bq > 0 {
            let mut m = (ar_span + ma_span).max(2);
            while m > 0 && n < 2 * m + 2 {
                m -= 1;
            }
            if m == 0 {
                return None;
            }
            let rows: Vec<Vec<f64>> = (m..n)
                .map(|t| (1..=m).map(|l| w[t - l]).collect())
                .collect();
            let beta = solve_least_squares(&rows, &w[m..], &vec![1e-8; m])?;
            for t in m..n {
                let pred: f64 = (1..=m).map(|l| beta[l - 1] * w[t - l]).sum();
                e[t] = w[t] - pred;
            }
            long_ar = m;
        }

        let t0 = if q + bq > 0 {
            ar_span.max(long_ar + ma_span)
        } else {
            ar_span
        };
        if t0 >= n || n - t0 < k + 1 {
            return None;
        }

        let rows: Vec<Vec<f64>> = (t0..n)
            .map(|t| {
                let mut row = Vec::with_capacity(k);
                row.extend((1..=p).map(|i| w[t - i]));
                row.extend((1..=bp).map(|i| w[t - i * period]));
                row.extend((1..=q).map(|i| e[t - i]));
                row.extend((1..=bq).map(|i| e[t - i * period]));
                row
            })
            .collect();
        let coef = solve_least_squares(&rows, &w[t0..], &vec![1e-8; k])?;

        let phi = coef[..p].to_vec();
        let big_phi = coef[p..p + bp].to_vec();
        let theta = coef[p + bp..p + bp + q].to_vec();
        let big_theta = coef[p + bp + q..].to_vec();

        // One-step in-sample residuals under the fitted recursion.
        let mut resid = e.clone();
        let mut sse = 0.0f64;
        for t in t0..n {
            let mut pred = 0.0;
            for (i, c) in phi.iter().enumerate() {
                pred += c * w[t - (i + 1)];
            }
            for (i, c) in big_phi.iter().enumerate() {
                pred += c * w[t - (i + 1) * period];
            }
            for (i, c) in theta.iter().enumerate() {
                pred += c * resid[t - (i + 1)];
            }
            for (i, c) in big_theta.iter().enumerate() {
                pred += c * resid[t - (i + 1) * period];
            }
            resid[t] = w[t] - pred;
            sse += resid[t] * resid[t];
        }
        let rows_n = (n - t0) as f64;
        let sigma2 = sse / rows_n;
        if !sigma2.is_finite() {
            return None;
        }
        let aic = rows_n * sigma2.max(1e-12).ln() + 2.0 * (k as f64 + 1.0);

        Some(Self {
            stages,
            ops,
            w,
            mu,
            phi,
            big_phi,
            theta,
            big_theta,
            period,
            resid,
            aic,
        })
    }
}

impl FittedModel for FittedSeasonalArima {
    fn forecast(&self, horizon: usize) -> Vec<f64> {
        let n = self.w.len();
        let period = self.period;
        let resid_at = |idx: usize| {
            if idx < self.resid.len() {
                self.resid[idx]
            } else {
                0.0
            }
        };

        // Recurse forward in the differenced space; future shocks are zero.
        let mut w_ext = self.w.clone();
        for _ in 0..horizon {
            let t = w_ext.len();
            let mut pred = 0.0;
            for (i, c) in self.phi.iter().enumerate() {
                pred += c * w_ext[t - (i + 1)];
            }
            for (i, c) in self.big_phi.iter().enumerate() {
                pred += c * w_ext[t - (i + 1) * period];
            }
            for (i, c) in self.theta.iter().enumerate() {
                pred += c * resid_at(t - (i + 1));
            }
            for (i, c) in self.big_theta.iter().enumerate() {
                pred += c * resid_at(t - (i + 1) * period);
            }
            w_ext.push(pred);
        }
        let mut fc: Vec<f64> = w_ext[n..].iter().map(|v| v + self.mu).collect();

        // Undo the differencing steps, innermost first.
        for (stage_idx, &lag) in self.ops.iter().enumerate().rev() {
            let mut ext = self.stages[stage_idx].clone();
            let mut out = Vec::with_capacity(fc.len());
            for v in fc {
                let prev = ext[ext.len() - lag];
                let next = v + prev;
                ext.push(next);
                out.push(next);
            }
            fc = out;
        }
        fc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn daily(values: &[f64]) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        DailySeries::from_points(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (start + chrono::Days::new(i as u64), v)),
        )
    }

    #[test]
    fn too_few_observations_is_unavailable() {
        let model = SeasonalArima::default();
        let series = daily(&[1.0; 9]);
        assert!(model.fit(&series).is_none());
    }

    #[test]
    fn linear_trend_is_continued() {
        let model = SeasonalArima::default();
        let values: Vec<f64> = (1..=60).map(|t| t as f64).collect();
        let fitted = model.fit(&daily(&values)).unwrap();
        let fc = fitted.forecast(5);
        assert_eq!(fc.len(), 5);
        for (h, v) in fc.iter().enumerate() {
            let expected = 61.0 + h as f64;
            assert!(
                (v - expected).abs() < 0.5,
                "h={h}: forecast {v} too far from {expected}"
            );
        }
    }

    #[test]
    fn weekly_pattern_is_continued() {
        let model = SeasonalArima::default();
        let pattern = [0.0, 0.0, 5.0, 10.0, 20.0, 30.0, 10.0];
        let values: Vec<f64> = (0..56).map(|t| pattern[t % 7]).collect();
        let fitted = model.fit(&daily(&values)).unwrap();
        let fc = fitted.forecast(7);
        assert_eq!(fc.len(), 7);
        for (h, v) in fc.iter().enumerate() {
            let expected = pattern[(56 + h) % 7];
            assert!(
                (v - expected).abs() < 1e-3,
                "h={h}: forecast {v} too far from {expected}"
            );
        }
    }

    #[test]
    fn noisy_series_produces_finite_forecasts() {
        let model = SeasonalArima::default();
        // Deterministic pseudo-noise around a level of 20.
        let values: Vec<f64> = (0..40)
            .map(|t| 20.0 + ((t * 7919 % 13) as f64 - 6.0))
            .collect();
        let fitted = model.fit(&daily(&values)).unwrap();
        let fc = fitted.forecast(14);
        assert_eq!(fc.len(), 14);
        assert!(fc.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn constant_series_forecasts_the_constant() {
        let model = SeasonalArima::default();
        let fitted = model.fit(&daily(&[12.0; 30])).unwrap();
        let fc = fitted.forecast(3);
        for v in fc {
            assert!((v - 12.0).abs() < 1e-6, "forecast {v} should stay at 12");
        }
    }
}
