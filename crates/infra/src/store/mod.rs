//! Persistent store boundary.
//!
//! The store owns every table of the data model and the transactional
//! guarantees around them: stock mutations are a read-modify-write inside a
//! single transaction scope, forecast replacement is delete+insert as one
//! atomic unit, and sale/alert tables are append-only.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stocksense_core::ProductId;
use stocksense_forecast::ForecastLabel;
use stocksense_inventory::{Alert, AlertKind, Product, SaleEvent, StockLevel, StockOutcome, Thresholds};

mod in_memory;
mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Input for product registration (bulk import or manual insert).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    /// Unique display name; registration is keyed by it.
    pub name: String,
    pub category: String,
    pub price: f64,
    /// When present, seeds (or resets) the stock row.
    pub initial_stock: Option<u32>,
}

/// Product joined with its current stock, for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product: Product,
    /// 0 when no stock row exists yet.
    pub current_stock: u32,
    pub last_updated: Option<DateTime<Utc>>,
}

/// One stored forecast point.
///
/// The full horizon set for a product is replaced atomically on each
/// regeneration; at most one set is current at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub product_id: ProductId,
    pub target_date: NaiveDate,
    pub quantity: f64,
    pub model: ForecastLabel,
}

/// Store operation error.
///
/// These are infrastructure failures: when a mutation returns an error,
/// nothing is considered committed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// A query failed (connection, transaction, constraint).
    #[error("store query failed: {0}")]
    Query(String),

    /// A stored row could not be decoded back into its domain type.
    #[error("store row was malformed: {0}")]
    Corrupt(String),
}

/// Product/stock/sales/forecast/alert store.
///
/// Implementations must make `apply_stock_delta` and `record_sale` a single
/// read-modify-write transaction per invocation (no lost updates under
/// concurrent callers), reject before any write when the bounds policy
/// rejects, and replace forecast sets atomically with respect to readers.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Create-or-update a product, keyed by its unique name.
    ///
    /// New products start with both thresholds unset. `initial_stock`
    /// seeds the stock row (and overwrites it for an existing product).
    async fn register_product(
        &self,
        new: NewProduct,
        at: DateTime<Utc>,
    ) -> Result<Product, StoreError>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// All products with their current stock, ordered by name.
    async fn list_products(&self) -> Result<Vec<ProductSnapshot>, StoreError>;

    /// Overwrite both thresholds. Values are pre-validated by the caller.
    async fn set_thresholds(&self, id: ProductId, thresholds: Thresholds) -> Result<(), StoreError>;

    async fn stock_level(&self, id: ProductId) -> Result<Option<StockLevel>, StoreError>;

    /// Transactional stock mutation: read current (0 if absent), apply the
    /// bounds policy, and upsert only when the outcome is `Applied`.
    async fn apply_stock_delta(
        &self,
        id: ProductId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<StockOutcome, StoreError>;

    /// Transactional sale: stock mutation with `delta = -qty` plus exactly
    /// one appended sale event, in the same transaction.
    async fn record_sale(
        &self,
        id: ProductId,
        quantity: u32,
        unit_price: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<StockOutcome, StoreError>;

    /// All sale events for a product, ascending by time.
    async fn sales_for(&self, id: ProductId) -> Result<Vec<SaleEvent>, StoreError>;

    /// Atomically replace the stored forecast set for a product.
    async fn replace_forecast(
        &self,
        id: ProductId,
        points: &[ForecastPoint],
    ) -> Result<(), StoreError>;

    /// Up to `limit` stored forecast points, ascending by target date.
    async fn latest_forecast(
        &self,
        id: ProductId,
        limit: usize,
    ) -> Result<Vec<ForecastPoint>, StoreError>;

    /// Append one alert log entry.
    async fn record_alert(
        &self,
        id: ProductId,
        kind: AlertKind,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError>;

    /// All alert log entries for a product, ascending by time.
    async fn alerts_for(&self, id: ProductId) -> Result<Vec<Alert>, StoreError>;
}
