use serde::{Deserialize, Serialize};

use stocksense_core::{DomainError, DomainResult, ProductId};

use crate::stock::MAX_STOCK;

/// Restock thresholds for a product.
///
/// Both levels are optional; `None` disables the corresponding alert rule.
/// `min_stock` is the hard ("low stock") level, `early_warning` the soft
/// level that additionally triggers an outbound notification.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_stock: Option<u32>,
    pub early_warning: Option<u32>,
}

impl Thresholds {
    /// Validate and build a threshold pair.
    ///
    /// Each set level must lie in `0..=9999`; out-of-range values are
    /// rejected without any side effect.
    pub fn new(min_stock: Option<u32>, early_warning: Option<u32>) -> DomainResult<Self> {
        if let Some(min) = min_stock {
            if min > MAX_STOCK {
                return Err(DomainError::validation(format!(
                    "min_stock must be between 0 and {MAX_STOCK}"
                )));
            }
        }
        if let Some(early) = early_warning {
            if early > MAX_STOCK {
                return Err(DomainError::validation(format!(
                    "early_warning must be between 0 and {MAX_STOCK}"
                )));
            }
        }
        Ok(Self {
            min_stock,
            early_warning,
        })
    }
}

/// Product master record.
///
/// Created on registration/import; thresholds are mutated only through the
/// threshold-setting operation. Products are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Display name; unique across all products.
    pub name: String,
    pub category: String,
    pub thresholds: Thresholds,
    /// Unit list price.
    pub price: f64,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, category: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            thresholds: Thresholds::default(),
            price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_accept_full_range() {
        let t = Thresholds::new(Some(0), Some(MAX_STOCK)).unwrap();
        assert_eq!(t.min_stock, Some(0));
        assert_eq!(t.early_warning, Some(MAX_STOCK));
    }

    #[test]
    fn thresholds_accept_unset_levels() {
        let t = Thresholds::new(None, None).unwrap();
        assert_eq!(t, Thresholds::default());
    }

    #[test]
    fn min_stock_above_limit_is_rejected() {
        let err = Thresholds::new(Some(10_000), None).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("min_stock")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn early_warning_above_limit_is_rejected() {
        let err = Thresholds::new(Some(5), Some(10_000)).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("early_warning")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
