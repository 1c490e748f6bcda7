//! Reading order facts and writing customer metrics.
//!
//! Two encodings are supported: a JSON array of objects, and JSON Lines (one
//! object per line, blank lines ignored).

use crate::model::{CustomerMetrics, OrderFact};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Encoding of a relation on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// A single JSON array of row objects
    Json,
    /// One JSON object per line
    JsonLines,
}

impl DataFormat {
    /// Infer the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    fn resolve(explicit: Option<Self>, path: &Path) -> Result<Self> {
        explicit
            .or_else(|| Self::from_path(path))
            .ok_or_else(|| Error::UnknownFormat { path: path.into() })
    }
}

impl FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "ndjson" | "json-lines" => Ok(Self::JsonLines),
            _ => Err(format!("Unknown data format: {s}")),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::JsonLines => f.write_str("jsonl"),
        }
    }
}

/// Read order facts from a file.
///
/// The format is taken from `format`, or inferred from the extension.
///
/// # Errors
///
/// Returns an error if the format cannot be determined, the file cannot be
/// read, or a row fails to decode.
pub fn read_orders(path: &Path, format: Option<DataFormat>) -> Result<Vec<OrderFact>> {
    let format = DataFormat::resolve(format, path)?;
    let file = File::open(path).map_err(|e| Error::io(e, path, "read"))?;
    read_orders_from(BufReader::new(file), format).map_err(|e| with_path(e, path))
}

/// Read order facts from any buffered reader.
///
/// # Errors
///
/// Returns an error if reading fails or a row fails to decode.
pub fn read_orders_from<R: BufRead>(mut reader: R, format: DataFormat) -> Result<Vec<OrderFact>> {
    match format {
        DataFormat::Json => {
            let mut buf = String::new();
            reader
                .read_to_string(&mut buf)
                .map_err(|e| Error::io_no_path(e, "read"))?;
            serde_json::from_str(&buf).map_err(|source| Error::Parse {
                source,
                path: None,
                line: None,
            })
        }
        DataFormat::JsonLines => {
            let mut rows = Vec::new();
            for (idx, line) in reader.lines().enumerate() {
                let line = line.map_err(|e| Error::io_no_path(e, "read"))?;
                if line.trim().is_empty() {
                    continue;
                }
                let row = serde_json::from_str(&line).map_err(|source| Error::Parse {
                    source,
                    path: None,
                    line: Some(idx + 1),
                })?;
                rows.push(row);
            }
            Ok(rows)
        }
    }
}

/// Write customer metrics to a file, replacing its contents.
///
/// # Errors
///
/// Returns an error if the format cannot be determined or writing fails.
pub fn write_metrics(
    path: &Path,
    rows: &[CustomerMetrics],
    format: Option<DataFormat>,
) -> Result<()> {
    let format = DataFormat::resolve(format, path)?;
    let file = File::create(path).map_err(|e| Error::io(e, path, "create"))?;
    let mut writer = BufWriter::new(file);
    write_rows_to(&mut writer, rows, format).map_err(|e| with_path(e, path))?;
    writer.flush().map_err(|e| Error::io(e, path, "write"))
}

/// Write customer metrics to any writer.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn write_metrics_to<W: Write>(
    writer: W,
    rows: &[CustomerMetrics],
    format: DataFormat,
) -> Result<()> {
    write_rows_to(writer, rows, format)
}

fn write_rows_to<W: Write, T: Serialize>(mut writer: W, rows: &[T], format: DataFormat) -> Result<()> {
    match format {
        DataFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, rows)
                .map_err(|e| Error::serialization(e.to_string()))?;
            writeln!(writer).map_err(|e| Error::io_no_path(e, "write"))?;
        }
        DataFormat::JsonLines => {
            for row in rows {
                serde_json::to_writer(&mut writer, row)
                    .map_err(|e| Error::serialization(e.to_string()))?;
                writeln!(writer).map_err(|e| Error::io_no_path(e, "write"))?;
            }
        }
    }
    Ok(())
}

fn with_path(error: Error, path: &Path) -> Error {
    match error {
        Error::Io {
            source,
            path: None,
            operation,
        } => Error::Io {
            source,
            path: Some(path.into()),
            operation,
        },
        Error::Parse {
            source,
            path: None,
            line,
        } => Error::Parse {
            source,
            path: Some(path.into()),
            line,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClvModel;
    use std::io::Cursor;

    #[test]
    fn test_format_inference() {
        assert_eq!(
            DataFormat::from_path(Path::new("orders.JSONL")),
            Some(DataFormat::JsonLines)
        );
        assert_eq!(
            DataFormat::from_path(Path::new("out/metrics.json")),
            Some(DataFormat::Json)
        );
        assert_eq!(DataFormat::from_path(Path::new("orders.csv")), None);
        assert_eq!("ndjson".parse::<DataFormat>(), Ok(DataFormat::JsonLines));
        assert!("parquet".parse::<DataFormat>().is_err());
    }

    #[test]
    fn test_read_json_lines_skips_blank_lines() {
        let input = "{\"customer_key\":\"a\",\"order_key\":\"1\",\"total_net_revenue\":5.0}\n\n\
                     {\"customer_key\":\"b\",\"order_key\":\"2\",\"total_net_revenue\":7.5}\n";
        let rows = read_orders_from(Cursor::new(input), DataFormat::JsonLines).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].total_net_revenue, Some(7.5));
    }

    #[test]
    fn test_parse_error_reports_line_number() {
        let input = "{\"customer_key\":\"a\"}\nnot json\n";
        let err = read_orders_from(Cursor::new(input), DataFormat::JsonLines).unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, Some(2)),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_json_array() {
        let input = r#"[{"customer_key": 1, "order_key": 10, "total_net_revenue": 1.5}]"#;
        let rows = read_orders_from(Cursor::new(input), DataFormat::Json).unwrap();
        assert_eq!(rows, vec![OrderFact::new("1", "10", 1.5)]);
    }

    #[test]
    fn test_write_json_lines() {
        let aggregation = ClvModel::default().aggregate(vec![
            OrderFact::new("a", "1", 10.0),
            OrderFact::new("b", "2", 20.0),
        ]);

        let mut out = Vec::new();
        write_metrics_to(&mut out, &aggregation.customers, DataFormat::JsonLines).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["customer_key"], "a");
        assert_eq!(first["customer_tier"], "Bronze");
        assert_eq!(first["value_category"], "Low Value");
        assert_eq!(first["profit_margin_pct"], 20.0);
    }

    #[test]
    fn test_file_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("orders.jsonl");
        std::fs::write(
            &input,
            "{\"customer_key\":\"a\",\"order_key\":\"1\",\"total_net_revenue\":12000}\n",
        )
        .unwrap();

        let rows = read_orders(&input, None).unwrap();
        let aggregation = ClvModel::default().aggregate(rows);

        let output = dir.path().join("clv.json");
        write_metrics(&output, &aggregation.customers, None).unwrap();

        let written: Vec<CustomerMetrics> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, aggregation.customers);
    }

    #[test]
    fn test_unknown_extension_without_format_fails() {
        let err = read_orders(Path::new("orders.parquet"), None).unwrap_err();
        assert!(matches!(err, Error::UnknownFormat { .. }));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_orders(Path::new("/nonexistent/orders.jsonl"), None).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/orders.jsonl"));
    }
}
