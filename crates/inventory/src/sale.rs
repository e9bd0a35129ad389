use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocksense_core::{ProductId, SaleId};

/// One recorded sale.
///
/// Append-only: sale events are never updated or deleted, and they are the
/// sole input of the demand series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub id: SaleId,
    pub product_id: ProductId,
    /// Units sold; always positive.
    pub quantity: u32,
    pub sold_at: DateTime<Utc>,
    pub unit_price: Option<f64>,
}
