//! Read-side stock views: per-product levels and the annotated FEFO list.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use wareflow_catalog::{Brand, Product, ProductId};

use crate::fefo::fefo_lots;
use crate::lot::{Lot, LotId, LotStatus};

/// Thresholds the stock views classify against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockThresholds {
    /// Available stock strictly below this (and above zero) raises a low-stock alert.
    pub low_stock: i64,
    pub expiry_critical_days: i64,
    pub expiry_approaching_days: i64,
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            low_stock: 10,
            expiry_critical_days: 30,
            expiry_approaching_days: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryAlert {
    Expired,
    Critical,
    Approaching,
}

impl ExpiryAlert {
    pub fn classify(days_until_expiry: i64, thresholds: &StockThresholds) -> Option<Self> {
        if days_until_expiry < 0 {
            Some(ExpiryAlert::Expired)
        } else if days_until_expiry < thresholds.expiry_critical_days {
            Some(ExpiryAlert::Critical)
        } else if days_until_expiry < thresholds.expiry_approaching_days {
            Some(ExpiryAlert::Approaching)
        } else {
            None
        }
    }
}

/// Stock summary for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub brand: Brand,
    pub category: String,
    pub total: i64,
    pub available: i64,
    pub reserved: i64,
    pub low_stock_alert: bool,
    pub expiration_warning: bool,
}

impl StockLevel {
    /// Summarise `lots` (all lots of `product`, any status).
    pub fn summarize(
        product: &Product,
        lots: &[Lot],
        today: NaiveDate,
        thresholds: &StockThresholds,
    ) -> Self {
        let mut total = 0;
        let mut available = 0;
        let mut reserved = 0;
        let mut expiration_warning = false;

        for lot in lots {
            total += lot.quantity;
            match lot.status {
                LotStatus::Available => available += lot.quantity,
                LotStatus::Reserved => reserved += lot.quantity,
                _ => {}
            }
            if lot
                .days_until_expiry(today)
                .is_some_and(|days| days < thresholds.expiry_critical_days)
            {
                expiration_warning = true;
            }
        }

        Self {
            product_id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            total,
            available,
            reserved,
            low_stock_alert: available > 0 && available < thresholds.low_stock,
            expiration_warning,
        }
    }
}

/// One entry of the FEFO list shown to pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FefoLotView {
    pub lot_id: LotId,
    pub lot_number: String,
    pub quantity: i64,
    pub expiration_date: Option<NaiveDate>,
    pub days_until_expiry: Option<i64>,
    pub location: String,
    pub alert: Option<ExpiryAlert>,
}

pub fn fefo_view(
    lots: impl IntoIterator<Item = Lot>,
    today: NaiveDate,
    thresholds: &StockThresholds,
) -> Vec<FefoLotView> {
    fefo_lots(lots)
        .into_iter()
        .map(|lot| {
            let days = lot.days_until_expiry(today);
            FefoLotView {
                lot_id: lot.id,
                alert: days.and_then(|d| ExpiryAlert::classify(d, thresholds)),
                days_until_expiry: days,
                lot_number: lot.lot_number,
                quantity: lot.quantity,
                expiration_date: lot.expiration_date,
                location: lot.location,
            }
        })
        .collect()
}
