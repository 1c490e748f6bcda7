//! Warehouse pushdown of the CLV relation.
//!
//! [`clv_select`] builds the whole model as one `SELECT` over the order fact
//! table so it can run where the data lives. The statement nests three
//! levels: per-customer aggregates, derived ratios, then bands and flags.
//! Threshold constants are inlined as literals from [`ClvParams`].

use crate::params::ClvParams;
use crate::{Error, Result};
use sea_query::{
    Alias, CaseStatement, Expr, Func, Iden, IntoTableRef, MysqlQueryBuilder, Order,
    PostgresQueryBuilder, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder, TableRef,
};
use std::fmt;
use std::str::FromStr;

/// Columns read from the fact table and produced by the model.
#[derive(Iden, Clone, Copy)]
enum Clv {
    #[iden = "customer_key"]
    CustomerKey,
    #[iden = "total_net_revenue"]
    TotalNetRevenue,
    #[iden = "total_revenue"]
    TotalRevenue,
    #[iden = "total_orders"]
    TotalOrders,
    #[iden = "avg_order_value"]
    AvgOrderValue,
    #[iden = "orders_per_year"]
    OrdersPerYear,
    #[iden = "simple_clv"]
    SimpleClv,
    #[iden = "customer_tier"]
    CustomerTier,
    #[iden = "value_category"]
    ValueCategory,
    #[iden = "is_high_value"]
    IsHighValue,
    #[iden = "is_frequent"]
    IsFrequent,
    #[iden = "is_high_aov"]
    IsHighAov,
    #[iden = "estimated_profit"]
    EstimatedProfit,
    #[iden = "profit_margin_pct"]
    ProfitMarginPct,
    #[iden = "revenue_per_order"]
    RevenuePerOrder,
    #[iden = "revenue_per_year"]
    RevenuePerYear,
}

/// SQL dialect to render for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SqlDialect {
    /// PostgreSQL and wire-compatible warehouses
    #[default]
    Postgres,
    /// MySQL / MariaDB
    MySql,
    /// SQLite
    Sqlite,
}

impl SqlDialect {
    /// Render a statement in this dialect with values inlined.
    #[must_use]
    pub fn render(self, statement: &SelectStatement) -> String {
        match self {
            Self::Postgres => statement.to_string(PostgresQueryBuilder),
            Self::MySql => statement.to_string(MysqlQueryBuilder),
            Self::Sqlite => statement.to_string(SqliteQueryBuilder),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(format!("Unknown SQL dialect: {s}")),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => f.write_str("postgres"),
            Self::MySql => f.write_str("mysql"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Render the CLV model as a single statement over `source_table`.
///
/// `source_table` is a table name, optionally qualified with a schema
/// (`analytics.fact_customer_orders`).
///
/// # Errors
///
/// Returns a configuration error if the table name is malformed or the
/// parameters do not validate.
pub fn render_clv_sql(source_table: &str, params: &ClvParams, dialect: SqlDialect) -> Result<String> {
    let statement = clv_select(source_table, params)?;
    Ok(dialect.render(&statement))
}

/// Build the CLV model as a `sea-query` statement.
///
/// # Errors
///
/// Same as [`render_clv_sql`].
pub fn clv_select(source_table: &str, params: &ClvParams) -> Result<SelectStatement> {
    params.validate()?;
    let source = table_ref(source_table)?;

    let window = float(params.observation_window_years);

    let revenue: SimpleExpr = Expr::col(Clv::TotalNetRevenue).into();
    let customer_orders = Query::select()
        .column(Clv::CustomerKey)
        .expr_as(Func::sum(Func::coalesce([revenue, float(0.0)])), Clv::TotalRevenue)
        .expr_as(Func::count(Expr::cust("*")), Clv::TotalOrders)
        .from(source)
        .and_where(Expr::col(Clv::CustomerKey).is_not_null())
        .group_by_col(Clv::CustomerKey)
        .to_owned();

    let avg_order_value = ratio(Expr::col(Clv::TotalRevenue).into(), Expr::col(Clv::TotalOrders).into());
    let orders_per_year = ratio(Expr::col(Clv::TotalOrders).into(), window.clone());
    let simple_clv = Expr::expr(avg_order_value.clone())
        .mul(orders_per_year.clone())
        .mul(window.clone());

    let customer_metrics = Query::select()
        .columns([Clv::CustomerKey, Clv::TotalRevenue, Clv::TotalOrders])
        .expr_as(avg_order_value.clone(), Clv::AvgOrderValue)
        .expr_as(orders_per_year, Clv::OrdersPerYear)
        .expr_as(simple_clv, Clv::SimpleClv)
        .expr_as(avg_order_value, Clv::RevenuePerOrder)
        .expr_as(ratio(Expr::col(Clv::TotalRevenue).into(), window), Clv::RevenuePerYear)
        .from_subquery(customer_orders, Alias::new("customer_orders"))
        .to_owned();

    let tiers = &params.tiers;
    let customer_tier = bands(
        Clv::TotalRevenue,
        [
            (tiers.silver, "Bronze"),
            (tiers.gold, "Silver"),
            (tiers.platinum, "Gold"),
        ],
        "Platinum",
    );

    let values = &params.value_categories;
    let value_category = bands(
        Clv::SimpleClv,
        [
            (values.medium, "Low Value"),
            (values.high, "Medium Value"),
            (values.premium, "High Value"),
        ],
        "Premium Value",
    );

    let flags = &params.flags;
    let statement = Query::select()
        .columns([
            Clv::CustomerKey,
            Clv::TotalRevenue,
            Clv::TotalOrders,
            Clv::AvgOrderValue,
            Clv::OrdersPerYear,
            Clv::SimpleClv,
        ])
        .expr_as(customer_tier, Clv::CustomerTier)
        .expr_as(value_category, Clv::ValueCategory)
        .expr_as(
            Expr::col(Clv::TotalRevenue).gt(float(flags.high_value_revenue)),
            Clv::IsHighValue,
        )
        .expr_as(
            Expr::col(Clv::TotalOrders).gt(flags.frequent_orders),
            Clv::IsFrequent,
        )
        .expr_as(
            Expr::col(Clv::AvgOrderValue).gt(float(flags.high_aov)),
            Clv::IsHighAov,
        )
        .expr_as(
            Expr::col(Clv::TotalRevenue).mul(float(params.profit_margin())),
            Clv::EstimatedProfit,
        )
        .expr_as(float(params.profit_margin_pct), Clv::ProfitMarginPct)
        .columns([Clv::RevenuePerOrder, Clv::RevenuePerYear])
        .from_subquery(customer_metrics, Alias::new("customer_metrics"))
        .order_by(Clv::CustomerKey, Order::Asc)
        .to_owned();

    Ok(statement)
}

/// `CASE WHEN col < b1 THEN l1 WHEN col < b2 THEN l2 ... ELSE top END`
fn bands<const N: usize>(column: Clv, bounds: [(f64, &str); N], top: &str) -> SimpleExpr {
    bounds
        .into_iter()
        .fold(CaseStatement::new(), |case, (bound, label)| {
            case.case(Expr::col(column).lt(float(bound)), Expr::val(label))
        })
        .finally(Expr::val(top))
        .into()
}

/// `num * 1.0 / den`, forcing floating point division on every backend.
fn ratio(numerator: SimpleExpr, denominator: SimpleExpr) -> SimpleExpr {
    Expr::expr(numerator).mul(float(1.0)).div(denominator)
}

/// Float literal that keeps its decimal point when rendered.
fn float(value: f64) -> SimpleExpr {
    Expr::cust(format!("{value:?}"))
}

fn table_ref(name: &str) -> Result<TableRef> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.iter().any(|p| p.trim().is_empty()) {
        return Err(Error::configuration(format!(
            "invalid source table name: {name:?}"
        )));
    }
    match parts.as_slice() {
        [table] => Ok(Alias::new(*table).into_table_ref()),
        [schema, table] => Ok((Alias::new(*schema), Alias::new(*table)).into_table_ref()),
        _ => Err(Error::configuration(format!(
            "source table must be `table` or `schema.table`, got {name:?}"
        ))),
    }
}
