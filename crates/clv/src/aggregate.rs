//! In-process CLV aggregation.

use crate::model::{CustomerMetrics, OrderFact};
use crate::params::ClvParams;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Counters describing one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregationStats {
    /// Input rows seen.
    pub rows_read: usize,
    /// Rows dropped because `customer_key` was null or missing.
    pub rows_excluded_missing_key: usize,
    /// Rows whose `total_net_revenue` was null and summed as zero.
    pub null_revenue_rows: usize,
    /// Output rows produced.
    pub customers: usize,
}

/// Output of [`ClvModel::aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// One row per distinct customer, ordered by `customer_key`.
    pub customers: Vec<CustomerMetrics>,
    /// Counters for logging and reporting.
    pub stats: AggregationStats,
}

/// The CLV transformation with a validated parameter set.
#[derive(Debug, Clone, Default)]
pub struct ClvModel {
    params: ClvParams,
}

impl ClvModel {
    /// Create a model after validating `params`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the parameters are unusable.
    pub fn new(params: ClvParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// The parameters this model derives metrics with.
    #[must_use]
    pub fn params(&self) -> &ClvParams {
        &self.params
    }

    /// Group order rows by customer and derive one metrics row per customer.
    ///
    /// Rows without a `customer_key` are excluded. Null revenue counts as
    /// zero. Revenue is summed in input order, so the same input always
    /// yields bit-identical output.
    pub fn aggregate<I>(&self, rows: I) -> Aggregation
    where
        I: IntoIterator<Item = OrderFact>,
    {
        let mut stats = AggregationStats::default();
        let mut groups: BTreeMap<String, (f64, u64)> = BTreeMap::new();

        for row in rows {
            stats.rows_read += 1;

            let Some(customer_key) = row.customer_key else {
                stats.rows_excluded_missing_key += 1;
                continue;
            };

            let revenue = row.total_net_revenue.unwrap_or_else(|| {
                stats.null_revenue_rows += 1;
                0.0
            });

            let entry = groups.entry(customer_key).or_insert((0.0, 0));
            entry.0 += revenue;
            entry.1 += 1;
        }

        if stats.rows_excluded_missing_key > 0 {
            warn!(
                excluded = stats.rows_excluded_missing_key,
                "Excluded order rows without a customer_key"
            );
        }

        let customers: Vec<CustomerMetrics> = groups
            .into_iter()
            .map(|(customer_key, (total_revenue, total_orders))| {
                CustomerMetrics::derive(customer_key, total_revenue, total_orders, &self.params)
            })
            .collect();
        stats.customers = customers.len();

        debug!(
            rows_read = stats.rows_read,
            customers = stats.customers,
            null_revenue_rows = stats.null_revenue_rows,
            "Aggregated customer lifetime value"
        );

        Aggregation { customers, stats }
    }
}
