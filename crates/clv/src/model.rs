//! Input and output rows of the CLV model.

use crate::params::{ClvParams, TierThresholds, ValueThresholds};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One completed order from `fact_customer_orders`.
///
/// Identifiers accept JSON strings or integers; integers are kept as their
/// decimal text. Upper-case column names, as returned by warehouse exports,
/// are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFact {
    /// Customer the order belongs to. Rows without one are excluded.
    #[serde(
        default,
        alias = "CUSTOMER_KEY",
        deserialize_with = "deserialize_identifier"
    )]
    pub customer_key: Option<String>,

    /// Order identifier. Not validated.
    #[serde(
        default,
        alias = "ORDER_KEY",
        deserialize_with = "deserialize_identifier"
    )]
    pub order_key: Option<String>,

    /// Net revenue of the order. Null sums as zero.
    #[serde(default, alias = "TOTAL_NET_REVENUE")]
    pub total_net_revenue: Option<f64>,
}

impl OrderFact {
    /// Convenience constructor for a fully populated row.
    #[must_use]
    pub fn new(customer_key: impl Into<String>, order_key: impl Into<String>, revenue: f64) -> Self {
        Self {
            customer_key: Some(customer_key.into()),
            order_key: Some(order_key.into()),
            total_net_revenue: Some(revenue),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

fn deserialize_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<RawIdentifier>::deserialize(deserializer)?.map(|raw| match raw {
            RawIdentifier::Text(text) => text,
            RawIdentifier::Signed(n) => n.to_string(),
            RawIdentifier::Unsigned(n) => n.to_string(),
        }),
    )
}

/// Revenue band of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CustomerTier {
    /// Below the silver threshold
    Bronze,
    /// Below the gold threshold
    Silver,
    /// Below the platinum threshold
    Gold,
    /// Everything else
    Platinum,
}

impl CustomerTier {
    /// Band `total_revenue`. Each threshold is the inclusive lower bound of its tier.
    #[must_use]
    pub fn classify(total_revenue: f64, thresholds: &TierThresholds) -> Self {
        if total_revenue < thresholds.silver {
            Self::Bronze
        } else if total_revenue < thresholds.gold {
            Self::Silver
        } else if total_revenue < thresholds.platinum {
            Self::Gold
        } else {
            Self::Platinum
        }
    }

    /// Display label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        }
    }
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value band of a customer, based on `simple_clv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueCategory {
    /// Below the medium threshold
    #[serde(rename = "Low Value")]
    Low,
    /// Below the high threshold
    #[serde(rename = "Medium Value")]
    Medium,
    /// Below the premium threshold
    #[serde(rename = "High Value")]
    High,
    /// Everything else
    #[serde(rename = "Premium Value")]
    Premium,
}

impl ValueCategory {
    /// Band `simple_clv`. Each threshold is the inclusive lower bound of its category.
    #[must_use]
    pub fn classify(simple_clv: f64, thresholds: &ValueThresholds) -> Self {
        if simple_clv < thresholds.medium {
            Self::Low
        } else if simple_clv < thresholds.high {
            Self::Medium
        } else if simple_clv < thresholds.premium {
            Self::High
        } else {
            Self::Premium
        }
    }

    /// Display label, identical to the serialized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low Value",
            Self::Medium => "Medium Value",
            Self::High => "High Value",
            Self::Premium => "Premium Value",
        }
    }
}

impl fmt::Display for ValueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the `customer_lifetime_value` mart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerMetrics {
    /// Group key, unique in the output.
    pub customer_key: String,
    /// Sum of `total_net_revenue` over the customer's orders.
    pub total_revenue: f64,
    /// Number of order rows for the customer.
    pub total_orders: u64,
    /// `total_revenue / total_orders`.
    pub avg_order_value: f64,
    /// `total_orders / window`.
    pub orders_per_year: f64,
    /// `avg_order_value * orders_per_year * window`. This reduces to
    /// `total_revenue` algebraically; the formula is kept as-is so the
    /// column stays compatible with existing consumers.
    pub simple_clv: f64,
    /// Band of `total_revenue`.
    pub customer_tier: CustomerTier,
    /// Band of `simple_clv`.
    pub value_category: ValueCategory,
    /// `total_revenue` above the high-value threshold.
    pub is_high_value: bool,
    /// `total_orders` above the frequency threshold.
    pub is_frequent: bool,
    /// `avg_order_value` above the AOV threshold.
    pub is_high_aov: bool,
    /// `total_revenue` times the flat margin.
    pub estimated_profit: f64,
    /// The flat margin, in percent. Same for every row.
    pub profit_margin_pct: f64,
    /// Same formula as `avg_order_value`.
    pub revenue_per_order: f64,
    /// `total_revenue / window`.
    pub revenue_per_year: f64,
}

impl CustomerMetrics {
    /// Derive every metric from a customer's two aggregates.
    ///
    /// `total_orders` must be at least one; grouping over existing order rows
    /// guarantees it.
    #[must_use]
    pub fn derive(
        customer_key: String,
        total_revenue: f64,
        total_orders: u64,
        params: &ClvParams,
    ) -> Self {
        debug_assert!(total_orders > 0, "customer without orders");

        #[allow(clippy::cast_precision_loss)]
        let orders = total_orders as f64;
        let window = params.observation_window_years;

        let avg_order_value = total_revenue / orders;
        let orders_per_year = orders / window;
        let simple_clv = avg_order_value * orders_per_year * window;

        Self {
            customer_tier: CustomerTier::classify(total_revenue, &params.tiers),
            value_category: ValueCategory::classify(simple_clv, &params.value_categories),
            is_high_value: total_revenue > params.flags.high_value_revenue,
            is_frequent: total_orders > params.flags.frequent_orders,
            is_high_aov: avg_order_value > params.flags.high_aov,
            estimated_profit: total_revenue * params.profit_margin(),
            profit_margin_pct: params.profit_margin_pct,
            revenue_per_order: total_revenue / orders,
            revenue_per_year: total_revenue / window,
            customer_key,
            total_revenue,
            total_orders,
            avg_order_value,
            orders_per_year,
            simple_clv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries_fall_into_upper_band() {
        let t = TierThresholds::default();
        assert_eq!(CustomerTier::classify(0.0, &t), CustomerTier::Bronze);
        assert_eq!(CustomerTier::classify(9_999.99, &t), CustomerTier::Bronze);
        assert_eq!(CustomerTier::classify(10_000.0, &t), CustomerTier::Silver);
        assert_eq!(CustomerTier::classify(50_000.0, &t), CustomerTier::Gold);
        assert_eq!(CustomerTier::classify(100_000.0, &t), CustomerTier::Platinum);
        assert_eq!(CustomerTier::classify(-5.0, &t), CustomerTier::Bronze);
    }

    #[test]
    fn test_value_category_boundaries() {
        let v = ValueThresholds::default();
        assert_eq!(ValueCategory::classify(4_999.0, &v), ValueCategory::Low);
        assert_eq!(ValueCategory::classify(5_000.0, &v), ValueCategory::Medium);
        assert_eq!(ValueCategory::classify(20_000.0, &v), ValueCategory::High);
        assert_eq!(ValueCategory::classify(50_000.0, &v), ValueCategory::Premium);
    }

    #[test]
    fn test_labels_serialize_as_display_strings() {
        assert_eq!(
            serde_json::to_string(&ValueCategory::Medium).unwrap(),
            "\"Medium Value\""
        );
        assert_eq!(
            serde_json::to_string(&CustomerTier::Platinum).unwrap(),
            "\"Platinum\""
        );
        assert_eq!(ValueCategory::Premium.to_string(), "Premium Value");
    }

    #[test]
    fn test_order_fact_accepts_numeric_and_uppercase_keys() {
        let row: OrderFact = serde_json::from_str(
            r#"{"CUSTOMER_KEY": 42, "ORDER_KEY": "A-1", "TOTAL_NET_REVENUE": 10.5}"#,
        )
        .unwrap();
        assert_eq!(row.customer_key.as_deref(), Some("42"));
        assert_eq!(row.order_key.as_deref(), Some("A-1"));
        assert_eq!(row.total_net_revenue, Some(10.5));
    }

    #[test]
    fn test_order_fact_nulls_and_missing_columns() {
        let row: OrderFact =
            serde_json::from_str(r#"{"customer_key": null, "extra": true}"#).unwrap();
        assert_eq!(row.customer_key, None);
        assert_eq!(row.order_key, None);
        assert_eq!(row.total_net_revenue, None);
    }

    #[test]
    fn test_derive_scenario_three_orders() {
        let m = CustomerMetrics::derive("A".to_string(), 12_000.0, 3, &ClvParams::default());

        assert_eq!(m.avg_order_value, 4_000.0);
        assert_eq!(m.orders_per_year, 1.5);
        assert_eq!(m.simple_clv, 12_000.0);
        assert_eq!(m.customer_tier, CustomerTier::Silver);
        assert_eq!(m.value_category, ValueCategory::Medium);
        assert!(!m.is_high_value);
        assert!(!m.is_frequent);
        // 4000 average order value is above the 1000 high-AOV threshold
        assert!(m.is_high_aov);
        assert_eq!(m.estimated_profit, 2_400.0);
        assert_eq!(m.profit_margin_pct, 20.0);
        assert_eq!(m.revenue_per_order, m.avg_order_value);
        assert_eq!(m.revenue_per_year, 6_000.0);
    }

    #[test]
    fn test_derive_scenario_eight_orders() {
        let m = CustomerMetrics::derive("B".to_string(), 120_000.0, 8, &ClvParams::default());

        assert_eq!(m.total_orders, 8);
        assert_eq!(m.avg_order_value, 15_000.0);
        assert_eq!(m.simple_clv, 120_000.0);
        assert_eq!(m.customer_tier, CustomerTier::Platinum);
        assert_eq!(m.value_category, ValueCategory::Premium);
        assert!(m.is_high_value);
        assert!(m.is_frequent);
        assert!(m.is_high_aov);
    }

    #[test]
    fn test_flags_are_strictly_greater_than() {
        let m = CustomerMetrics::derive("C".to_string(), 50_000.0, 5, &ClvParams::default());
        assert!(!m.is_high_value);
        assert!(!m.is_frequent);
        // 10_000 per order is above the AOV threshold
        assert!(m.is_high_aov);

        let m = CustomerMetrics::derive("D".to_string(), 1_000.0, 1, &ClvParams::default());
        assert!(!m.is_high_aov);
    }
}
