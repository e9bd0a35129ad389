//! Service facade over the store, the forecaster and the alert sink.
//!
//! This is the call surface the UI/importer layers consume. Stock mutations
//! run as one store transaction; on success, forecast regeneration and alert
//! evaluation run synchronously on the same call path, with model fitting
//! kept outside any store transaction.

use std::sync::Arc;

use chrono::{Days, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use stocksense_core::{DomainError, ProductId};
use stocksense_forecast::{DailySeries, ForecastConfig, HybridForecaster};
use stocksense_inventory::{AlertKind, Product, StockOutcome, Thresholds};

use crate::alert::{self, AlertSink};
use crate::store::{ForecastPoint, InventoryStore, NewProduct, ProductSnapshot, StoreError};

/// Error surface of the service operations.
///
/// Validation problems are `Domain`; store failures are `Store` and mean the
/// operation did not commit.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub forecast: ForecastConfig,
    /// Recipient of early-warning notifications.
    pub alert_recipient: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            forecast: ForecastConfig::default(),
            alert_recipient: "inventory@localhost".to_string(),
        }
    }
}

/// The stock-mutation and forecasting core.
pub struct InventoryService<S, K> {
    store: Arc<S>,
    sink: Arc<K>,
    forecaster: HybridForecaster,
    config: ServiceConfig,
}

impl<S, K> Clone for InventoryService<S, K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.sink),
            forecaster: self.forecaster.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, K> InventoryService<S, K>
where
    S: InventoryStore,
    K: AlertSink,
{
    pub fn new(store: Arc<S>, sink: Arc<K>, config: ServiceConfig) -> Self {
        Self {
            forecaster: HybridForecaster::new(config.forecast),
            store,
            sink,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Create-or-update a product (bulk import path).
    pub async fn register_product(&self, new: NewProduct) -> Result<Product, ServiceError> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty").into());
        }
        Ok(self.store.register_product(new, Utc::now()).await?)
    }

    /// Product+stock snapshots, ordered by name.
    pub async fn list_products(&self) -> Result<Vec<ProductSnapshot>, ServiceError> {
        Ok(self.store.list_products().await?)
    }

    /// Validate and persist both thresholds. Rejects out-of-range values
    /// and unknown products without mutating anything.
    pub async fn set_thresholds(
        &self,
        id: ProductId,
        min_stock: Option<u32>,
        early_warning: Option<u32>,
    ) -> Result<(), ServiceError> {
        let thresholds = Thresholds::new(min_stock, early_warning)?;
        self.store.set_thresholds(id, thresholds).await?;
        Ok(())
    }

    /// Apply a signed stock delta.
    ///
    /// On `Applied`, regenerates the forecast and evaluates alerts before
    /// returning; rejections trigger no side effects.
    pub async fn apply_delta(
        &self,
        id: ProductId,
        delta: i64,
    ) -> Result<StockOutcome, ServiceError> {
        let outcome = self.store.apply_stock_delta(id, delta, Utc::now()).await?;
        match outcome {
            StockOutcome::Applied(new_stock) => {
                info!(product_id = %id, delta, new_stock, "stock updated");
                self.refresh(id).await?;
            }
            rejected => debug!(product_id = %id, delta, ?rejected, "stock update rejected"),
        }
        Ok(outcome)
    }

    /// Record a sale of `quantity` units.
    ///
    /// The stock decrement and the sale event commit in one transaction;
    /// forecast and alert side effects follow on success.
    pub async fn apply_sale(
        &self,
        id: ProductId,
        quantity: u32,
        unit_price: Option<f64>,
    ) -> Result<StockOutcome, ServiceError> {
        if quantity == 0 {
            return Err(DomainError::validation("sale quantity must be positive").into());
        }
        let outcome = self
            .store
            .record_sale(id, quantity, unit_price, Utc::now())
            .await?;
        match outcome {
            StockOutcome::Applied(new_stock) => {
                info!(product_id = %id, quantity, new_stock, "sale recorded");
                self.refresh(id).await?;
            }
            rejected => debug!(product_id = %id, quantity, ?rejected, "sale rejected"),
        }
        Ok(outcome)
    }

    async fn refresh(&self, id: ProductId) -> Result<(), ServiceError> {
        self.generate_forecast(id, self.config.forecast.horizon_days)
            .await?;
        self.evaluate_alerts(id).await
    }

    /// Regenerate and store the demand forecast for a product.
    ///
    /// Model fitting is CPU-bound and runs between store calls, never
    /// inside a store transaction. The stored set is replaced atomically:
    /// `horizon` consecutive days starting tomorrow, tagged with the label
    /// the ladder selected.
    pub async fn generate_forecast(
        &self,
        id: ProductId,
        horizon: usize,
    ) -> Result<Vec<f64>, ServiceError> {
        let sales = self.store.sales_for(id).await?;
        let series = DailySeries::from_sales(sales.iter().map(|s| (s.sold_at, s.quantity)));

        let forecast = self.forecaster.forecast_with_horizon(&series, horizon);

        let start = Utc::now().date_naive() + Days::new(1);
        let points: Vec<ForecastPoint> = forecast
            .values
            .iter()
            .enumerate()
            .map(|(offset, &quantity)| ForecastPoint {
                product_id: id,
                target_date: start + Days::new(offset as u64),
                quantity,
                model: forecast.label,
            })
            .collect();
        self.store.replace_forecast(id, &points).await?;

        info!(product_id = %id, label = %forecast.label, horizon, observations = series.len(), "forecast regenerated");
        Ok(forecast.values)
    }

    /// Evaluate both alert rules for a product. Side effects only.
    ///
    /// Missing products are a no-op. Both rules compare with `<=` and are
    /// skipped when the corresponding threshold is unset. Every qualifying
    /// evaluation fires; no cooldown is kept.
    pub async fn evaluate_alerts(&self, id: ProductId) -> Result<(), ServiceError> {
        let Some(product) = self.store.product(id).await? else {
            return Ok(());
        };
        let current = self
            .store
            .stock_level(id)
            .await?
            .map(|s| s.current_stock)
            .unwrap_or(0);

        if let Some(early) = product.thresholds.early_warning {
            if current <= early {
                let points = self
                    .store
                    .latest_forecast(id, self.config.forecast.horizon_days)
                    .await?;
                let summary = alert::forecast_summary(&points);
                let subject = format!("Early stock warning - {}", product.name);
                let body = alert::early_warning_body(&product.name, current, early, &summary);

                let delivered = self.sink.notify(&self.config.alert_recipient, &subject, &body);
                if !delivered {
                    warn!(product_id = %id, "early-warning notification was not delivered");
                }

                let message = format!("Early warning: {} => {}", product.name, current);
                self.store
                    .record_alert(id, AlertKind::EarlyWarning, &message, Utc::now())
                    .await?;
            }
        }

        if let Some(min) = product.thresholds.min_stock {
            if current <= min {
                let message = format!("Critical: {} => {}", product.name, current);
                self.store
                    .record_alert(id, AlertKind::LowStock, &message, Utc::now())
                    .await?;
            }
        }

        Ok(())
    }
}
