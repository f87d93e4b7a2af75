//! Cosmetic products and their period-after-opening expiry.
//!
//! Expiry is always derived from `date_opened` and `pao_months`; it is never
//! stored. A "month" is a flat 30 days. The PAO is a plain number, since
//! stored documents may carry fractional values.

use serde::{Deserialize, Serialize};

use super::{CosmeticCategory, CosmeticId};

/// Milliseconds in one 30-day month.
pub const MS_PER_MONTH: i64 = 1000 * 60 * 60 * 24 * 30;

/// Share of the PAO after which a product is flagged as close to expiry.
const WARNING_PERCENT: f64 = 75.0;

/// Share of the PAO after which a product is treated as expired.
const EXPIRED_PERCENT: f64 = 90.0;

/// An opened cosmetic product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmeticProduct {
    pub id: CosmeticId,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub name: String,
    pub category: CosmeticCategory,
    /// Period after opening, in months.
    #[serde(default, deserialize_with = "super::lenient::number")]
    pub pao_months: f64,
    /// When the product was first opened, milliseconds since the epoch.
    #[serde(default, deserialize_with = "super::lenient::millis")]
    pub date_opened: i64,
    /// Optional image reference (URL or data URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Input for registering a product.
///
/// `id` and `date_opened` are assigned at insertion when absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCosmetic {
    #[serde(default)]
    pub id: Option<CosmeticId>,
    pub brand: String,
    pub name: String,
    pub category: CosmeticCategory,
    pub pao_months: f64,
    #[serde(default)]
    pub date_opened: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewCosmetic {
    /// Materialize the product, filling in missing fields.
    #[must_use]
    pub fn into_product(self, now_ms: i64) -> CosmeticProduct {
        CosmeticProduct {
            id: self.id.unwrap_or_else(CosmeticId::generate),
            brand: self.brand,
            name: self.name,
            category: self.category,
            pao_months: self.pao_months,
            date_opened: self.date_opened.unwrap_or(now_ms),
            image_url: self.image_url.filter(|u| !u.is_empty()),
        }
    }
}

/// Freshness bucket of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Fresh,
    Warning,
    Expired,
}

impl std::fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Warning => write!(f, "warning"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Derived expiry information for a product at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expiry {
    /// Months since opening (never negative).
    pub months_elapsed: f64,
    /// Share of the PAO used up, capped at 100.
    pub percent: f64,
    pub status: ExpiryStatus,
    /// Instant at which the full PAO runs out.
    pub expires_at: i64,
}

impl CosmeticProduct {
    /// Create a product with a fresh identifier.
    #[must_use]
    pub fn new(
        brand: impl Into<String>,
        name: impl Into<String>,
        category: CosmeticCategory,
        pao_months: f64,
        date_opened: i64,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: CosmeticId::generate(),
            brand: brand.into(),
            name: name.into(),
            category,
            pao_months,
            date_opened,
            image_url,
        }
    }

    /// Whether the PAO is a positive, finite number of months.
    #[must_use]
    pub fn has_usable_pao(&self) -> bool {
        self.pao_months.is_finite() && self.pao_months > 0.0
    }

    /// Instant at which the full period after opening has elapsed.
    ///
    /// Equals `date_opened` when the PAO is not usable.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn expires_at(&self) -> i64 {
        if !self.has_usable_pao() {
            return self.date_opened;
        }
        // Float to int `as` saturates
        let span = (self.pao_months * MS_PER_MONTH as f64) as i64;
        self.date_opened.saturating_add(span)
    }

    /// Compute the product's expiry state at `now_ms`.
    ///
    /// A zero, negative or non-numeric PAO counts as already expired.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Millisecond spans stay far below 2^52
    pub fn expiry(&self, now_ms: i64) -> Expiry {
        let elapsed_ms = now_ms.saturating_sub(self.date_opened).max(0);
        let months_elapsed = elapsed_ms as f64 / MS_PER_MONTH as f64;
        let usable = self.has_usable_pao();

        let percent = if usable {
            (months_elapsed / self.pao_months * 100.0).min(100.0)
        } else {
            100.0
        };

        let status = if !usable || percent > EXPIRED_PERCENT {
            ExpiryStatus::Expired
        } else if percent > WARNING_PERCENT {
            ExpiryStatus::Warning
        } else {
            ExpiryStatus::Fresh
        };

        Expiry {
            months_elapsed,
            percent,
            status,
            expires_at: self.expires_at(),
        }
    }
}
