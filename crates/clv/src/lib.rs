// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! Customer lifetime value (CLV) metrics for the customer analytics mart.
//!
//! The crate turns per-order fact rows (`fact_customer_orders`) into one
//! metrics row per customer. Everything is derived from two aggregates per
//! customer, total revenue and order count, using fixed absolute thresholds
//! held in [`ClvParams`].
//!
//! Two execution paths produce the same relation:
//!
//! - [`ClvModel::aggregate`] computes it in-process
//! - [`render_clv_sql`] renders a single statement for warehouse pushdown
//!
//! # Example
//!
//! ```
//! use martflow_clv::{ClvModel, CustomerTier, OrderFact};
//!
//! let rows = vec![
//!     OrderFact::new("c-1", "o-1", 7000.0),
//!     OrderFact::new("c-1", "o-2", 5000.0),
//! ];
//!
//! let aggregation = ClvModel::default().aggregate(rows);
//! assert_eq!(aggregation.customers.len(), 1);
//! assert_eq!(aggregation.customers[0].customer_tier, CustomerTier::Silver);
//! ```

mod aggregate;
mod error;
pub mod io;
mod model;
mod params;
pub mod sql;

pub use aggregate::{Aggregation, AggregationStats, ClvModel};
pub use error::{Error, Result};
pub use io::DataFormat;
pub use model::{CustomerMetrics, CustomerTier, OrderFact, ValueCategory};
pub use params::{
    ClvParams, DEFAULT_OBSERVATION_WINDOW_YEARS, DEFAULT_PROFIT_MARGIN_PCT, FlagThresholds,
    TierThresholds, ValueThresholds,
};
pub use sql::{SqlDialect, render_clv_sql};
