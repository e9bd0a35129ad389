use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stocksense_core::{AlertId, ProductId, SaleId};
use stocksense_inventory::{
    Alert, AlertKind, Product, SaleEvent, StockLevel, StockOutcome, Thresholds, checked_apply,
};

use super::{ForecastPoint, InventoryStore, NewProduct, ProductSnapshot, StoreError};

#[derive(Debug, Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    stock: HashMap<ProductId, StockLevel>,
    sales: Vec<SaleEvent>,
    forecasts: HashMap<ProductId, Vec<ForecastPoint>>,
    alerts: Vec<Alert>,
}

/// In-memory store.
///
/// Intended for tests/dev. One write-lock scope per mutation is the
/// transaction boundary: readers never observe a partially applied
/// mutation, and rejected mutations change nothing.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Query("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Query("lock poisoned".to_string()))
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn register_product(
        &self,
        new: NewProduct,
        at: DateTime<Utc>,
    ) -> Result<Product, StoreError> {
        let mut inner = self.write()?;

        let existing = inner
            .products
            .values()
            .find(|p| p.name == new.name)
            .cloned();
        let product = match existing {
            Some(product) => product,
            None => {
                let product = Product::new(ProductId::new(), new.name, new.category, new.price);
                inner.products.insert(product.id, product.clone());
                product
            }
        };

        if let Some(seed) = new.initial_stock {
            inner.stock.insert(
                product.id,
                StockLevel {
                    product_id: product.id,
                    current_stock: seed,
                    last_updated: at,
                },
            );
        }
        Ok(product)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<ProductSnapshot>, StoreError> {
        let inner = self.read()?;
        let mut snapshots: Vec<ProductSnapshot> = inner
            .products
            .values()
            .map(|product| {
                let stock = inner.stock.get(&product.id);
                ProductSnapshot {
                    product: product.clone(),
                    current_stock: stock.map(|s| s.current_stock).unwrap_or(0),
                    last_updated: stock.map(|s| s.last_updated),
                }
            })
            .collect();
        snapshots.sort_by(|a, b| a.product.name.cmp(&b.product.name));
        Ok(snapshots)
    }

    async fn set_thresholds(&self, id: ProductId, thresholds: Thresholds) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let product = inner
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound)?;
        product.thresholds = thresholds;
        Ok(())
    }

    async fn stock_level(&self, id: ProductId) -> Result<Option<StockLevel>, StoreError> {
        Ok(self.read()?.stock.get(&id).cloned())
    }

    async fn apply_stock_delta(
        &self,
        id: ProductId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<StockOutcome, StoreError> {
        let mut inner = self.write()?;
        if !inner.products.contains_key(&id) {
            return Err(StoreError::ProductNotFound);
        }

        let current = inner.stock.get(&id).map(|s| s.current_stock).unwrap_or(0);
        let outcome = checked_apply(current, delta);
        if let StockOutcome::Applied(next) = outcome {
            inner.stock.insert(
                id,
                StockLevel {
                    product_id: id,
                    current_stock: next,
                    last_updated: at,
                },
            );
        }
        Ok(outcome)
    }

    async fn record_sale(
        &self,
        id: ProductId,
        quantity: u32,
        unit_price: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<StockOutcome, StoreError> {
        let mut inner = self.write()?;
        if !inner.products.contains_key(&id) {
            return Err(StoreError::ProductNotFound);
        }

        let current = inner.stock.get(&id).map(|s| s.current_stock).unwrap_or(0);
        let outcome = checked_apply(current, -i64::from(quantity));
        if let StockOutcome::Applied(next) = outcome {
            inner.stock.insert(
                id,
                StockLevel {
                    product_id: id,
                    current_stock: next,
                    last_updated: at,
                },
            );
            inner.sales.push(SaleEvent {
                id: SaleId::new(),
                product_id: id,
                quantity,
                sold_at: at,
                unit_price,
            });
        }
        Ok(outcome)
    }

    async fn sales_for(&self, id: ProductId) -> Result<Vec<SaleEvent>, StoreError> {
        let inner = self.read()?;
        let mut sales: Vec<SaleEvent> = inner
            .sales
            .iter()
            .filter(|s| s.product_id == id)
            .cloned()
            .collect();
        sales.sort_by_key(|s| s.sold_at);
        Ok(sales)
    }

    async fn replace_forecast(
        &self,
        id: ProductId,
        points: &[ForecastPoint],
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.products.contains_key(&id) {
            return Err(StoreError::ProductNotFound);
        }
        inner.forecasts.insert(id, points.to_vec());
        Ok(())
    }

    async fn latest_forecast(
        &self,
        id: ProductId,
        limit: usize,
    ) -> Result<Vec<ForecastPoint>, StoreError> {
        let inner = self.read()?;
        let mut points = inner.forecasts.get(&id).cloned().unwrap_or_default();
        points.sort_by_key(|p| p.target_date);
        points.truncate(limit);
        Ok(points)
    }

    async fn record_alert(
        &self,
        id: ProductId,
        kind: AlertKind,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let mut inner = self.write()?;
        if !inner.products.contains_key(&id) {
            return Err(StoreError::ProductNotFound);
        }
        let alert = Alert {
            id: AlertId::new(),
            product_id: id,
            kind,
            message: message.to_string(),
            recorded_at: at,
        };
        inner.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn alerts_for(&self, id: ProductId) -> Result<Vec<Alert>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .alerts
            .iter()
            .filter(|a| a.product_id == id)
            .cloned()
            .collect())
    }
}
