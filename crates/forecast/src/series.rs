use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

/// Daily demand series for one product.
///
/// One `(date, total_quantity)` point per calendar day that had at least one
/// sale, ascending by date. Days without sales are not materialized, so the
/// series is irregular; models must tolerate the gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    points: Vec<(NaiveDate, f64)>,
}

impl DailySeries {
    /// Aggregate raw sale events into daily totals.
    ///
    /// Pure transform: quantities sold on the same UTC calendar day are
    /// summed; the result is sorted ascending. An empty input yields an
    /// empty series.
    pub fn from_sales(events: impl IntoIterator<Item = (DateTime<Utc>, u32)>) -> Self {
        let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (sold_at, quantity) in events {
            *days.entry(sold_at.date_naive()).or_insert(0.0) += f64::from(quantity);
        }
        Self {
            points: days.into_iter().collect(),
        }
    }

    /// Build a series from pre-aggregated daily points (sorted and summed).
    pub fn from_points(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let mut days: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (date, quantity) in points {
            *days.entry(date).or_insert(0.0) += quantity;
        }
        Self {
            points: days.into_iter().collect(),
        }
    }

    /// Restartable iteration over the daily points, ascending by date.
    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().copied()
    }

    /// Daily totals in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Arithmetic mean of the daily totals; 0.0 for an empty series.
    pub fn mean(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|(_, v)| v).sum::<f64>() / self.points.len() as f64
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(date: &str, hour: u32) -> DateTime<Utc> {
        let d: NaiveDate = date.parse().unwrap();
        Utc.from_utc_datetime(&d.and_hms_opt(hour, 0, 0).unwrap())
    }

    #[test]
    fn empty_input_yields_empty_series() {
        let series = DailySeries::from_sales(std::iter::empty());
        assert!(series.is_empty());
        assert_eq!(series.mean(), 0.0);
        assert_eq!(series.points().count(), 0);
    }

    #[test]
    fn same_day_sales_are_summed() {
        let series = DailySeries::from_sales(vec![
            (at("2024-03-01", 9), 2),
            (at("2024-03-01", 17), 3),
            (at("2024-03-02", 12), 1),
        ]);
        let points: Vec<_> = series.points().collect();
        assert_eq!(
            points,
            vec![
                ("2024-03-01".parse().unwrap(), 5.0),
                ("2024-03-02".parse().unwrap(), 1.0),
            ]
        );
    }

    #[test]
    fn gap_days_are_not_materialized() {
        let series = DailySeries::from_sales(vec![
            (at("2024-03-01", 9), 1),
            (at("2024-03-05", 9), 4),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), Some("2024-03-01".parse().unwrap()));
        assert_eq!(series.last_date(), Some("2024-03-05".parse().unwrap()));
    }

    #[test]
    fn out_of_order_events_come_back_sorted() {
        let series = DailySeries::from_sales(vec![
            (at("2024-03-07", 9), 1),
            (at("2024-03-02", 9), 2),
            (at("2024-03-04", 9), 3),
        ]);
        let dates: Vec<_> = series.points().map(|(d, _)| d).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn iteration_is_restartable() {
        let series = DailySeries::from_sales(vec![(at("2024-03-01", 9), 2)]);
        assert_eq!(series.points().count(), 1);
        assert_eq!(series.points().count(), 1);
    }

    #[test]
    fn mean_is_over_active_days_only() {
        let series = DailySeries::from_points(vec![
            ("2024-03-01".parse().unwrap(), 4.0),
            ("2024-03-09".parse().unwrap(), 8.0),
        ]);
        assert_eq!(series.mean(), 6.0);
    }
}
