//! Alert dispatch boundary.
//!
//! Outbound notification is an external collaborator: the sink must never
//! raise into the caller. Delivery failures are reported as `false`, logged,
//! and never roll back the mutation or forecast write that triggered them.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::store::ForecastPoint;

/// Outbound notification sink.
pub trait AlertSink: Send + Sync + 'static {
    /// Deliver one notification. Returns `false` on failure; must not panic.
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> bool;
}

/// Sink that only logs. Default for deployments without a configured
/// transport.
#[derive(Debug, Default, Copy, Clone)]
pub struct LoggingAlertSink;

impl AlertSink for LoggingAlertSink {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> bool {
        info!(recipient, subject, body, "alert notification");
        true
    }
}

/// A captured notification (test sink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// In-memory sink for tests/dev; optionally simulates delivery failure.
#[derive(Debug, Default)]
pub struct InMemoryAlertSink {
    inner: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl InMemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.captured().clone()
    }

    /// Make subsequent deliveries report failure (they are still captured).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Recover the guard even when poisoned: the sink must keep honoring
    /// the no-panic contract, and the captured list stays usable.
    fn captured(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AlertSink for InMemoryAlertSink {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> bool {
        self.captured().push(Notification {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        !self.failing.load(Ordering::SeqCst)
    }
}

/// Human-readable per-day forecast summary for the early-warning body.
pub fn forecast_summary(points: &[ForecastPoint]) -> String {
    if points.is_empty() {
        return "no forecast available.".to_string();
    }
    points
        .iter()
        .map(|p| format!("{} -> {:.2}", p.target_date, p.quantity))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Early-warning notification body.
pub fn early_warning_body(
    product_name: &str,
    current_stock: u32,
    early_warning: u32,
    summary: &str,
) -> String {
    format!(
        "Product: {product_name}\n\
         Current stock: {current_stock}\n\
         Early warning level: {early_warning}\n\
         \n\
         Forecast:\n\
         {summary}\n\
         \n\
         Stock is nearing the minimum level. Please restock soon.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stocksense_core::ProductId;
    use stocksense_forecast::ForecastLabel;

    #[test]
    fn empty_forecast_yields_the_notice() {
        assert_eq!(forecast_summary(&[]), "no forecast available.");
    }

    #[test]
    fn summary_has_one_line_per_point() {
        let id = ProductId::new();
        let points: Vec<ForecastPoint> = (1..=3)
            .map(|i| ForecastPoint {
                product_id: id,
                target_date: NaiveDate::from_ymd_opt(2024, 3, i).unwrap(),
                quantity: 1.5 * i as f64,
                model: ForecastLabel::Hybrid,
            })
            .collect();
        let summary = forecast_summary(&points);
        assert_eq!(summary.lines().count(), 3);
        assert!(summary.starts_with("2024-03-01 -> 1.50"));
    }

    #[test]
    fn failing_sink_still_captures_the_notification() {
        let sink = InMemoryAlertSink::new();
        sink.set_failing(true);
        assert!(!sink.notify("ops@example.com", "subject", "body"));
        assert_eq!(sink.all().len(), 1);
    }
}
