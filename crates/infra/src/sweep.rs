//! Periodic alert sweep.
//!
//! An explicit background task that owns its own service handle (and with it
//! its own store connection scope). Every tick it walks all products and
//! evaluates alerts one product at a time; a failure for one product is
//! collected and never blocks the others, and the sweep never touches the
//! interactive mutation path.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use stocksense_core::ProductId;

use crate::alert::AlertSink;
use crate::service::InventoryService;
use crate::store::InventoryStore;

/// Sweep configuration.
#[derive(Debug, Copy, Clone)]
pub struct AlertSweep {
    pub interval: Duration,
}

impl Default for AlertSweep {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
        }
    }
}

/// One failed evaluation inside a pass. `product_id` is `None` when the
/// product listing itself failed.
#[derive(Debug, Clone)]
pub struct SweepFailure {
    pub product_id: Option<ProductId>,
    pub error: String,
}

/// Outcome of one sweep pass, sent on the result channel.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub evaluated: usize,
    pub failures: Vec<SweepFailure>,
}

/// Handle to the running sweep task: graceful shutdown + join.
#[derive(Debug)]
pub struct AlertSweepHandle {
    shutdown: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl AlertSweepHandle {
    /// Request shutdown and wait for the task to stop.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl AlertSweep {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the sweep task.
    ///
    /// Returns the lifecycle handle and the per-pass report channel. Report
    /// delivery is lossy: if the receiver lags or is dropped, passes keep
    /// running and only the report is lost.
    pub fn spawn<S, K>(
        &self,
        service: InventoryService<S, K>,
    ) -> (AlertSweepHandle, mpsc::Receiver<SweepReport>)
    where
        S: InventoryStore + 'static,
        K: AlertSink + 'static,
    {
        let (report_tx, report_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let interval = self.interval;

        let join = tokio::spawn(sweep_loop(service, interval, shutdown_rx, report_tx));

        (
            AlertSweepHandle {
                shutdown: shutdown_tx,
                join: Some(join),
            },
            report_rx,
        )
    }
}

async fn sweep_loop<S, K>(
    service: InventoryService<S, K>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    reports: mpsc::Sender<SweepReport>,
) where
    S: InventoryStore,
    K: AlertSink,
{
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first interval tick fires immediately; consume it so passes start
    // one full interval after spawn.
    tick.tick().await;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let report = run_pass(&service).await;
                debug!(evaluated = report.evaluated, failures = report.failures.len(), "alert sweep pass finished");
                let _ = reports.try_send(report);
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

async fn run_pass<S, K>(service: &InventoryService<S, K>) -> SweepReport
where
    S: InventoryStore,
    K: AlertSink,
{
    let snapshots = match service.list_products().await {
        Ok(snapshots) => snapshots,
        Err(e) => {
            warn!(error = %e, "alert sweep could not list products");
            return SweepReport {
                evaluated: 0,
                failures: vec![SweepFailure {
                    product_id: None,
                    error: e.to_string(),
                }],
            };
        }
    };

    let mut report = SweepReport::default();
    for snapshot in snapshots {
        let id = snapshot.product.id;
        match service.evaluate_alerts(id).await {
            Ok(()) => report.evaluated += 1,
            Err(e) => {
                warn!(product_id = %id, error = %e, "alert sweep evaluation failed");
                report.failures.push(SweepFailure {
                    product_id: Some(id),
                    error: e.to_string(),
                });
            }
        }
    }
    report
}
