use crate::series::DailySeries;

/// A demand estimator that can be trained on a daily series.
///
/// `fit` returns `None` when the model is unavailable for the given series
/// (too few observations, or estimation failed). Unavailability is data, not
/// an error: the hybrid ladder decides what to do with it.
pub trait DemandModel {
    fn fit(&self, series: &DailySeries) -> Option<Box<dyn FittedModel>>;
}

/// A trained model, able to produce a fixed-horizon point forecast.
pub trait FittedModel {
    /// Forecast the next `horizon` daily quantities, one value per day.
    fn forecast(&self, horizon: usize) -> Vec<f64>;
}
