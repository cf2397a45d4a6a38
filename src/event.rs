use {
    crate::catalog::Product,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// One simulated competitor price observation
///
/// Created by the emitter, consumed once by the evaluator. When the evaluator
/// promotes it, `alert_details` is filled in and the same value is forwarded
/// to the outbound queue; an alert is just a `PriceEvent` with details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEvent {
    /// Emission sequence number, unique per emitter
    pub seq: u64,
    pub product_id: u32,
    pub product_name: String,
    pub category: String,
    pub our_price: f64,
    pub competitor_price: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_details: Option<String>,
}

impl PriceEvent {
    pub fn new(seq: u64, product: &Product, competitor_price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            seq,
            product_id: product.id,
            product_name: product.name.clone(),
            category: product.category.clone(),
            our_price: product.our_price,
            competitor_price,
            timestamp,
            alert_details: None,
        }
    }

    /// Attach evaluator output, turning the observation into an alert
    pub fn into_alert(mut self, details: String) -> Self {
        self.alert_details = Some(details);
        self
    }

    pub fn is_alert(&self) -> bool {
        self.alert_details.is_some()
    }

    /// Percentage by which the competitor undercuts us (negative when they are dearer)
    pub fn price_diff_pct(&self) -> f64 {
        if self.our_price == 0.0 {
            return 0.0;
        }
        (self.our_price - self.competitor_price) / self.our_price * 100.0
    }
}

/// Round a price to cents, half away from zero
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
