use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stocksense_core::{AlertId, ProductId};

/// Alert severity class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Soft threshold crossed; an outbound notification is dispatched.
    EarlyWarning,
    /// Hard threshold crossed; log-only at this severity.
    LowStock,
}

impl AlertKind {
    /// Stable string form used by the alert log.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::EarlyWarning => "early_warning",
            AlertKind::LowStock => "low_stock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "early_warning" => Some(AlertKind::EarlyWarning),
            "low_stock" => Some(AlertKind::LowStock),
            _ => None,
        }
    }
}

impl core::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only alert log entry. Write-once; no suppression state is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub product_id: ProductId,
    pub kind: AlertKind,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_its_string_form() {
        for kind in [AlertKind::EarlyWarning, AlertKind::LowStock] {
            assert_eq!(AlertKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AlertKind::parse("critical"), None);
    }
}
