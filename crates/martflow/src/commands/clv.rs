//! `martflow clv` commands.

use super::CommandOutput;
use crate::cli::CliError;
use martflow_clv::io::{read_orders, write_metrics, write_metrics_to};
use martflow_clv::{ClvModel, ClvParams, DataFormat, SqlDialect, render_clv_sql};
use serde_json::json;
use std::path::Path;
use tracing::info;

/// Aggregate an order fact file into customer metrics.
///
/// Metrics go to `output` when given, otherwise they become the command's
/// text output (JSON Lines unless `output_format` says otherwise).
///
/// # Errors
///
/// Returns an error if the parameters are invalid or the input cannot be
/// read, or if the output cannot be written.
pub fn execute_run(
    input: &Path,
    output: Option<&Path>,
    input_format: Option<DataFormat>,
    output_format: Option<DataFormat>,
    params: &ClvParams,
) -> Result<CommandOutput, CliError> {
    let model = ClvModel::new(params.clone())?;
    let rows = read_orders(input, input_format)?;
    let aggregation = model.aggregate(rows);
    let stats = aggregation.stats;

    info!(
        input = %input.display(),
        rows_read = stats.rows_read,
        customers = stats.customers,
        "Computed customer lifetime value"
    );

    if let Some(path) = output {
        write_metrics(path, &aggregation.customers, output_format)?;
        let text = format!(
            "Wrote {} customer rows to {} ({} order rows read, {} without customer_key)",
            stats.customers,
            path.display(),
            stats.rows_read,
            stats.rows_excluded_missing_key
        );
        let data = json!({
            "output": path.display().to_string(),
            "stats": stats,
        });
        return Ok(CommandOutput::ok(text, data));
    }

    let mut buf = Vec::new();
    write_metrics_to(
        &mut buf,
        &aggregation.customers,
        output_format.unwrap_or(DataFormat::JsonLines),
    )?;
    let text = String::from_utf8(buf)
        .map_err(|e| CliError::other(format!("Metrics output is not UTF-8: {e}")))?;
    let data = json!({
        "stats": stats,
        "customers": aggregation.customers,
    });
    Ok(CommandOutput::ok(text, data))
}

/// Render the model as SQL over `table`.
///
/// # Errors
///
/// Returns an error if the table name is malformed or the parameters are
/// invalid.
pub fn execute_sql(
    table: &str,
    dialect: SqlDialect,
    params: &ClvParams,
) -> Result<CommandOutput, CliError> {
    let sql = render_clv_sql(table, params, dialect)?;
    let data = json!({
        "table": table,
        "dialect": dialect.to_string(),
        "sql": sql,
    });
    Ok(CommandOutput::ok(sql, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::EXIT_OK;

    const ORDERS: &str = "\
{\"customer_key\":\"A\",\"order_key\":\"1\",\"total_net_revenue\":4000}
{\"customer_key\":\"A\",\"order_key\":\"2\",\"total_net_revenue\":4000}
{\"customer_key\":\"A\",\"order_key\":\"3\",\"total_net_revenue\":4000}
{\"customer_key\":null,\"order_key\":\"4\",\"total_net_revenue\":10}
";

    #[test]
    fn test_run_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("orders.jsonl");
        std::fs::write(&input, ORDERS).unwrap();

        let output = execute_run(&input, None, None, None, &ClvParams::default()).unwrap();

        assert_eq!(output.exit_code, EXIT_OK);
        assert_eq!(output.text.lines().count(), 1);
        let row: serde_json::Value = serde_json::from_str(output.text.trim()).unwrap();
        assert_eq!(row["customer_tier"], "Silver");
        assert_eq!(row["value_category"], "Medium Value");
        assert_eq!(output.data["stats"]["rows_excluded_missing_key"], 1);
    }

    #[test]
    fn test_run_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("orders.jsonl");
        let out = dir.path().join("clv.json");
        std::fs::write(&input, ORDERS).unwrap();

        let output =
            execute_run(&input, Some(&out), None, None, &ClvParams::default()).unwrap();

        assert!(output.text.starts_with("Wrote 1 customer rows"));
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written[0]["total_orders"], 3);
    }

    #[test]
    fn test_missing_input_is_other_error() {
        let err = execute_run(
            Path::new("/nonexistent/orders.jsonl"),
            None,
            None,
            None,
            &ClvParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Other { .. }));
    }

    #[test]
    fn test_sql_output() {
        let output = execute_sql("fact_customer_orders", SqlDialect::Sqlite, &ClvParams::default())
            .unwrap();
        assert!(output.text.starts_with("SELECT"));
        assert_eq!(output.data["dialect"], "sqlite");
    }
}
