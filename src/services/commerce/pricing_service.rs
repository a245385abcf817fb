use super::checkout_validator::ValidatedLines;
use super::money;
use crate::{config::AppConfig, errors::ServiceError};
use serde::{Deserialize, Serialize};

/// Flat shipping and tax rate applied to every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub shipping_flat_cents: i64,
    pub tax_rate_bps: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            shipping_flat_cents: 1000,
            tax_rate_bps: 800,
        }
    }
}

impl From<&AppConfig> for PricingPolicy {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            shipping_flat_cents: cfg.shipping_flat_cents,
            tax_rate_bps: cfg.tax_rate_bps,
        }
    }
}

/// Amounts for one checkout, all in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

/// Pure pricing over validated cart lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    policy: PricingPolicy,
}

impl PricingEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    /// Tax is charged on subtotal plus shipping.
    pub fn price(&self, lines: &ValidatedLines) -> Result<PricingResult, ServiceError> {
        let subtotal_cents = lines.iter().try_fold(0i64, |acc, line| {
            money::line_total(line.unit_price_cents, line.quantity)
                .and_then(|total| money::add(acc, total))
                .ok_or(ServiceError::PricingOverflow)
        })?;

        let shipping_cents = self.policy.shipping_flat_cents;
        let pre_tax = money::add(subtotal_cents, shipping_cents).ok_or(ServiceError::PricingOverflow)?;
        let tax_cents =
            money::apply_rate_bps(pre_tax, self.policy.tax_rate_bps).ok_or(ServiceError::PricingOverflow)?;
        let total_cents = money::add(pre_tax, tax_cents).ok_or(ServiceError::PricingOverflow)?;

        Ok(PricingResult {
            subtotal_cents,
            shipping_cents,
            tax_cents,
            total_cents,
        })
    }
}
