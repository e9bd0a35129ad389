//! SQLite-backed store implementation.
//!
//! Uses one sqlx transaction per mutation: the read-modify-write of the
//! stock row and the delete+insert of a forecast set each commit as a unit,
//! so readers never observe a partial update. Bounds rejections return
//! before anything is written (the open transaction is simply dropped).
//!
//! Identifiers are stored as TEXT (uuid), timestamps as RFC 3339 TEXT via
//! the chrono codecs.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use tracing::instrument;

use stocksense_core::{AlertId, ProductId, SaleId};
use stocksense_inventory::{
    Alert, AlertKind, Product, SaleEvent, StockLevel, StockOutcome, Thresholds, checked_apply,
};
use stocksense_forecast::ForecastLabel;

use super::{ForecastPoint, InventoryStore, NewProduct, ProductSnapshot, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    product_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    category TEXT NOT NULL,
    min_stock INTEGER,
    early_warning_stock INTEGER,
    price REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS stock_levels (
    product_id TEXT PRIMARY KEY REFERENCES products(product_id),
    current_stock INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sales (
    sale_id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL REFERENCES products(product_id),
    quantity INTEGER NOT NULL,
    sold_at TEXT NOT NULL,
    unit_price REAL
);

CREATE INDEX IF NOT EXISTS idx_sales_product_date ON sales(product_id, sold_at);

CREATE TABLE IF NOT EXISTS forecasts (
    product_id TEXT NOT NULL REFERENCES products(product_id),
    target_date TEXT NOT NULL,
    quantity REAL NOT NULL,
    model TEXT NOT NULL,
    PRIMARY KEY (product_id, target_date)
);

CREATE TABLE IF NOT EXISTS alerts (
    alert_id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL REFERENCES products(product_id),
    kind TEXT NOT NULL,
    message TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);
"#;

/// SQLite-backed [`InventoryStore`].
///
/// The pool is cheap to clone; all operations check out a connection (or a
/// transaction) per call, so the background sweep and the interactive path
/// never share a transaction scope.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and bootstrap the
    /// schema. WAL mode keeps readers unblocked by the writer.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("connect options", e))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| map_sqlx_error("schema bootstrap", e))?;

        Ok(Self { pool })
    }

    /// Private in-memory database, for dev and smoke testing.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_sqlx_error(op: &str, e: sqlx::Error) -> StoreError {
    StoreError::Query(format!("{op}: {e}"))
}

fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("{what}: invalid id '{raw}'")))
}

fn to_stock(v: i64, what: &str) -> Result<u32, StoreError> {
    u32::try_from(v).map_err(|_| StoreError::Corrupt(format!("{what}: negative value {v}")))
}

fn threshold_from(v: Option<i64>, what: &str) -> Result<Option<u32>, StoreError> {
    v.map(|v| to_stock(v, what)).transpose()
}

fn product_from_row(row: &SqliteRow) -> Result<Product, StoreError> {
    let raw_id: String = row
        .try_get("product_id")
        .map_err(|e| map_sqlx_error("decode product_id", e))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| map_sqlx_error("decode name", e))?;
    let category: String = row
        .try_get("category")
        .map_err(|e| map_sqlx_error("decode category", e))?;
    let min_stock: Option<i64> = row
        .try_get("min_stock")
        .map_err(|e| map_sqlx_error("decode min_stock", e))?;
    let early_warning: Option<i64> = row
        .try_get("early_warning_stock")
        .map_err(|e| map_sqlx_error("decode early_warning_stock", e))?;
    let price: f64 = row
        .try_get("price")
        .map_err(|e| map_sqlx_error("decode price", e))?;

    Ok(Product {
        id: parse_id(&raw_id, "products.product_id")?,
        name,
        category,
        thresholds: Thresholds {
            min_stock: threshold_from(min_stock, "products.min_stock")?,
            early_warning: threshold_from(early_warning, "products.early_warning_stock")?,
        },
        price,
    })
}

const PRODUCT_COLUMNS: &str =
    "product_id, name, category, min_stock, early_warning_stock, price";

#[async_trait]
impl InventoryStore for SqliteStore {
    async fn register_product(
        &self,
        new: NewProduct,
        at: DateTime<Utc>,
    ) -> Result<Product, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("register_product begin", e))?;

        let existing = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE name = ?"
        ))
        .bind(&new.name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("register_product lookup", e))?;

        let product = match existing {
            Some(row) => product_from_row(&row)?,
            None => {
                let product = Product::new(ProductId::new(), new.name, new.category, new.price);
                sqlx::query(
                    "INSERT INTO products (product_id, name, category, min_stock, early_warning_stock, price) \
                     VALUES (?, ?, ?, NULL, NULL, ?)",
                )
                .bind(product.id.to_string())
                .bind(&product.name)
                .bind(&product.category)
                .bind(product.price)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("register_product insert", e))?;
                product
            }
        };

        if let Some(seed) = new.initial_stock {
            sqlx::query(
                "INSERT INTO stock_levels (product_id, current_stock, last_updated) VALUES (?, ?, ?) \
                 ON CONFLICT(product_id) DO UPDATE SET \
                 current_stock = excluded.current_stock, last_updated = excluded.last_updated",
            )
            .bind(product.id.to_string())
            .bind(i64::from(seed))
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("register_product seed stock", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("register_product commit", e))?;
        Ok(product)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn list_products(&self) -> Result<Vec<ProductSnapshot>, StoreError> {
        let rows = sqlx::query(
            "SELECT p.product_id, p.name, p.category, p.min_stock, p.early_warning_stock, p.price, \
                    s.current_stock, s.last_updated \
             FROM products p LEFT JOIN stock_levels s ON p.product_id = s.product_id \
             ORDER BY p.name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for row in &rows {
            let product = product_from_row(row)?;
            let current_stock: Option<i64> = row
                .try_get("current_stock")
                .map_err(|e| map_sqlx_error("decode current_stock", e))?;
            let last_updated: Option<DateTime<Utc>> = row
                .try_get("last_updated")
                .map_err(|e| map_sqlx_error("decode last_updated", e))?;
            snapshots.push(ProductSnapshot {
                product,
                current_stock: current_stock
                    .map(|v| to_stock(v, "stock_levels.current_stock"))
                    .transpose()?
                    .unwrap_or(0),
                last_updated,
            });
        }
        Ok(snapshots)
    }

    async fn set_thresholds(&self, id: ProductId, thresholds: Thresholds) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE products SET min_stock = ?, early_warning_stock = ? WHERE product_id = ?",
        )
        .bind(thresholds.min_stock.map(i64::from))
        .bind(thresholds.early_warning.map(i64::from))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_thresholds", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound);
        }
        Ok(())
    }

    async fn stock_level(&self, id: ProductId) -> Result<Option<StockLevel>, StoreError> {
        let row = sqlx::query(
            "SELECT current_stock, last_updated FROM stock_levels WHERE product_id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_level", e))?;

        row.map(|row| {
            let current: i64 = row
                .try_get("current_stock")
                .map_err(|e| map_sqlx_error("decode current_stock", e))?;
            let last_updated: DateTime<Utc> = row
                .try_get("last_updated")
                .map_err(|e| map_sqlx_error("decode last_updated", e))?;
            Ok(StockLevel {
                product_id: id,
                current_stock: to_stock(current, "stock_levels.current_stock")?,
                last_updated,
            })
        })
        .transpose()
    }

    #[instrument(skip_all, fields(product_id = %id, delta), err)]
    async fn apply_stock_delta(
        &self,
        id: ProductId,
        delta: i64,
        at: DateTime<Utc>,
    ) -> Result<StockOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("apply_stock_delta begin", e))?;

        let current = read_current_stock(&mut tx, id).await?;
        let outcome = checked_apply(current, delta);
        if let StockOutcome::Applied(next) = outcome {
            upsert_stock(&mut tx, id, next, at).await?;
            tx.commit()
                .await
                .map_err(|e| map_sqlx_error("apply_stock_delta commit", e))?;
        }
        // Rejections wrote nothing; dropping the transaction rolls back.
        Ok(outcome)
    }

    #[instrument(skip_all, fields(product_id = %id, quantity), err)]
    async fn record_sale(
        &self,
        id: ProductId,
        quantity: u32,
        unit_price: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<StockOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("record_sale begin", e))?;

        let current = read_current_stock(&mut tx, id).await?;
        let outcome = checked_apply(current, -i64::from(quantity));
        if let StockOutcome::Applied(next) = outcome {
            upsert_stock(&mut tx, id, next, at).await?;
            sqlx::query(
                "INSERT INTO sales (sale_id, product_id, quantity, sold_at, unit_price) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(SaleId::new().to_string())
            .bind(id.to_string())
            .bind(i64::from(quantity))
            .bind(at)
            .bind(unit_price)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("record_sale insert", e))?;
            tx.commit()
                .await
                .map_err(|e| map_sqlx_error("record_sale commit", e))?;
        }
        Ok(outcome)
    }

    async fn sales_for(&self, id: ProductId) -> Result<Vec<SaleEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT sale_id, quantity, sold_at, unit_price FROM sales \
             WHERE product_id = ? ORDER BY sold_at",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("sales_for", e))?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw_id: String = row
                .try_get("sale_id")
                .map_err(|e| map_sqlx_error("decode sale_id", e))?;
            let quantity: i64 = row
                .try_get("quantity")
                .map_err(|e| map_sqlx_error("decode quantity", e))?;
            let sold_at: DateTime<Utc> = row
                .try_get("sold_at")
                .map_err(|e| map_sqlx_error("decode sold_at", e))?;
            let unit_price: Option<f64> = row
                .try_get("unit_price")
                .map_err(|e| map_sqlx_error("decode unit_price", e))?;
            sales.push(SaleEvent {
                id: parse_id(&raw_id, "sales.sale_id")?,
                product_id: id,
                quantity: to_stock(quantity, "sales.quantity")?,
                sold_at,
                unit_price,
            });
        }
        Ok(sales)
    }

    #[instrument(skip_all, fields(product_id = %id, points = points.len()), err)]
    async fn replace_forecast(
        &self,
        id: ProductId,
        points: &[ForecastPoint],
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("replace_forecast begin", e))?;

        sqlx::query("DELETE FROM forecasts WHERE product_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace_forecast delete", e))?;

        for point in points {
            sqlx::query(
                "INSERT INTO forecasts (product_id, target_date, quantity, model) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(id.to_string())
            .bind(point.target_date)
            .bind(point.quantity)
            .bind(point.model.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace_forecast insert", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("replace_forecast commit", e))
    }

    async fn latest_forecast(
        &self,
        id: ProductId,
        limit: usize,
    ) -> Result<Vec<ForecastPoint>, StoreError> {
        let rows = sqlx::query(
            "SELECT target_date, quantity, model FROM forecasts \
             WHERE product_id = ? ORDER BY target_date LIMIT ?",
        )
        .bind(id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("latest_forecast", e))?;

        let mut points = Vec::with_capacity(rows.len());
        for row in &rows {
            let target_date: NaiveDate = row
                .try_get("target_date")
                .map_err(|e| map_sqlx_error("decode target_date", e))?;
            let quantity: f64 = row
                .try_get("quantity")
                .map_err(|e| map_sqlx_error("decode quantity", e))?;
            let model: String = row
                .try_get("model")
                .map_err(|e| map_sqlx_error("decode model", e))?;
            points.push(ForecastPoint {
                product_id: id,
                target_date,
                quantity,
                model: ForecastLabel::parse(&model).ok_or_else(|| {
                    StoreError::Corrupt(format!("forecasts.model: unknown label '{model}'"))
                })?,
            });
        }
        Ok(points)
    }

    async fn record_alert(
        &self,
        id: ProductId,
        kind: AlertKind,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let alert = Alert {
            id: AlertId::new(),
            product_id: id,
            kind,
            message: message.to_string(),
            recorded_at: at,
        };
        sqlx::query(
            "INSERT INTO alerts (alert_id, product_id, kind, message, recorded_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(alert.id.to_string())
        .bind(id.to_string())
        .bind(kind.as_str())
        .bind(message)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_alert", e))?;
        Ok(alert)
    }

    async fn alerts_for(&self, id: ProductId) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query(
            "SELECT alert_id, kind, message, recorded_at FROM alerts \
             WHERE product_id = ? ORDER BY recorded_at",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("alerts_for", e))?;

        let mut alerts = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw_id: String = row
                .try_get("alert_id")
                .map_err(|e| map_sqlx_error("decode alert_id", e))?;
            let kind: String = row
                .try_get("kind")
                .map_err(|e| map_sqlx_error("decode kind", e))?;
            let message: String = row
                .try_get("message")
                .map_err(|e| map_sqlx_error("decode message", e))?;
            let recorded_at: DateTime<Utc> = row
                .try_get("recorded_at")
                .map_err(|e| map_sqlx_error("decode recorded_at", e))?;
            alerts.push(Alert {
                id: parse_id(&raw_id, "alerts.alert_id")?,
                product_id: id,
                kind: AlertKind::parse(&kind).ok_or_else(|| {
                    StoreError::Corrupt(format!("alerts.kind: unknown kind '{kind}'"))
                })?,
                message,
                recorded_at,
            });
        }
        Ok(alerts)
    }
}

/// Current stock inside an open transaction; verifies the product exists.
async fn read_current_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: ProductId,
) -> Result<u32, StoreError> {
    let exists = sqlx::query("SELECT 1 FROM products WHERE product_id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("product existence check", e))?;
    if exists.is_none() {
        return Err(StoreError::ProductNotFound);
    }

    let row = sqlx::query("SELECT current_stock FROM stock_levels WHERE product_id = ?")
        .bind(id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("read current stock", e))?;
    match row {
        Some(row) => {
            let current: i64 = row
                .try_get("current_stock")
                .map_err(|e| map_sqlx_error("decode current_stock", e))?;
            to_stock(current, "stock_levels.current_stock")
        }
        None => Ok(0),
    }
}

async fn upsert_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: ProductId,
    next: u32,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO stock_levels (product_id, current_stock, last_updated) VALUES (?, ?, ?) \
         ON CONFLICT(product_id) DO UPDATE SET \
         current_stock = excluded.current_stock, last_updated = excluded.last_updated",
    )
    .bind(id.to_string())
    .bind(i64::from(next))
    .bind(at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("upsert stock", e))?;
    Ok(())
}
