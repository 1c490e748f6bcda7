//! Business constants of the CLV model.
//!
//! Every threshold the model bands on is a named parameter. The defaults are
//! the values the customer analytics mart has always used; a configuration
//! file may override any of them.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Length of the observation window, in years.
pub const DEFAULT_OBSERVATION_WINDOW_YEARS: f64 = 2.0;

/// Flat profit margin applied to revenue, in percent.
pub const DEFAULT_PROFIT_MARGIN_PCT: f64 = 20.0;

/// Parameters of the CLV model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ClvParams {
    /// Years of order history the fact table covers.
    pub observation_window_years: f64,
    /// Flat margin used for `estimated_profit`, in percent.
    pub profit_margin_pct: f64,
    /// Revenue bands for `customer_tier`.
    pub tiers: TierThresholds,
    /// CLV bands for `value_category`.
    pub value_categories: ValueThresholds,
    /// Thresholds for the boolean activity flags.
    pub flags: FlagThresholds,
}

impl Default for ClvParams {
    fn default() -> Self {
        Self {
            observation_window_years: DEFAULT_OBSERVATION_WINDOW_YEARS,
            profit_margin_pct: DEFAULT_PROFIT_MARGIN_PCT,
            tiers: TierThresholds::default(),
            value_categories: ValueThresholds::default(),
            flags: FlagThresholds::default(),
        }
    }
}

impl ClvParams {
    /// Profit margin as a fraction.
    #[must_use]
    pub fn profit_margin(&self) -> f64 {
        self.profit_margin_pct / 100.0
    }

    /// Check that the parameters describe a usable model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the window is not a positive
    /// finite number, the margin or a flag threshold is not finite, or any
    /// set of band thresholds is not strictly increasing.
    pub fn validate(&self) -> Result<()> {
        if !(self.observation_window_years.is_finite() && self.observation_window_years > 0.0) {
            return Err(Error::configuration(format!(
                "observationWindowYears must be a positive number, got {}",
                self.observation_window_years
            )));
        }
        if !self.profit_margin_pct.is_finite() {
            return Err(Error::configuration("profitMarginPct must be finite"));
        }
        check_increasing(
            "tiers",
            &[self.tiers.silver, self.tiers.gold, self.tiers.platinum],
        )?;
        check_increasing(
            "valueCategories",
            &[
                self.value_categories.medium,
                self.value_categories.high,
                self.value_categories.premium,
            ],
        )?;
        for (name, value) in [
            ("flags.highValueRevenue", self.flags.high_value_revenue),
            ("flags.highAov", self.flags.high_aov),
        ] {
            if !value.is_finite() {
                return Err(Error::configuration(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn check_increasing(section: &str, bounds: &[f64]) -> Result<()> {
    let increasing = bounds.iter().all(|b| b.is_finite())
        && bounds.windows(2).all(|pair| pair[0] < pair[1]);
    if increasing {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "{section} thresholds must be finite and strictly increasing, got {bounds:?}"
        )))
    }
}

/// Lower bounds of the revenue tiers. Anything below `silver` is Bronze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierThresholds {
    /// Start of Silver.
    pub silver: f64,
    /// Start of Gold.
    pub gold: f64,
    /// Start of Platinum.
    pub platinum: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            silver: 10_000.0,
            gold: 50_000.0,
            platinum: 100_000.0,
        }
    }
}

/// Lower bounds of the value categories. Anything below `medium` is Low Value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValueThresholds {
    /// Start of Medium Value.
    pub medium: f64,
    /// Start of High Value.
    pub high: f64,
    /// Start of Premium Value.
    pub premium: f64,
}

impl Default for ValueThresholds {
    fn default() -> Self {
        Self {
            medium: 5_000.0,
            high: 20_000.0,
            premium: 50_000.0,
        }
    }
}

/// Strict lower bounds (exclusive) of the boolean flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct FlagThresholds {
    /// `is_high_value` when `total_revenue` exceeds this.
    pub high_value_revenue: f64,
    /// `is_frequent` when `total_orders` exceeds this.
    pub frequent_orders: u64,
    /// `is_high_aov` when `avg_order_value` exceeds this.
    pub high_aov: f64,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            high_value_revenue: 50_000.0,
            frequent_orders: 5,
            high_aov: 1_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let params = ClvParams::default();
        assert!(params.validate().is_ok());
        assert!((params.profit_margin() - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_window_rejected() {
        let params = ClvParams {
            observation_window_years: 0.0,
            ..ClvParams::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("observationWindowYears"));
    }

    #[test]
    fn test_unordered_tiers_rejected() {
        let params = ClvParams {
            tiers: TierThresholds {
                silver: 60_000.0,
                gold: 50_000.0,
                platinum: 100_000.0,
            },
            ..ClvParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_non_finite_flag_thresholds_rejected() {
        let params = ClvParams {
            flags: FlagThresholds {
                high_aov: f64::NAN,
                ..FlagThresholds::default()
            },
            ..ClvParams::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("flags.highAov"));

        let params = ClvParams {
            flags: FlagThresholds {
                high_value_revenue: f64::INFINITY,
                ..FlagThresholds::default()
            },
            ..ClvParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(serde_json::from_str::<ClvParams>(r#"{"profit_margin_pct": 50.0}"#).is_err());
        assert!(serde_json::from_str::<ClvParams>(r#"{"flags": {"highAOV": 1.0}}"#).is_err());
        assert!(serde_json::from_str::<ClvParams>(r#"{"tiers": {"diamond": 1.0}}"#).is_err());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let params: ClvParams = serde_json::from_str(
            r#"{"profitMarginPct": 25.0, "flags": {"frequentOrders": 10}}"#,
        )
        .unwrap();

        assert_eq!(params.profit_margin_pct, 25.0);
        assert_eq!(params.flags.frequent_orders, 10);
        assert_eq!(params.flags.high_aov, 1_000.0);
        assert_eq!(params.observation_window_years, 2.0);
        assert_eq!(params.tiers, TierThresholds::default());
    }
}
