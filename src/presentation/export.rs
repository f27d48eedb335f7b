//! CSV export of scan reports.
//!
//! Layout: a header row of an empty index cell followed by the timeframe
//! labels, then one row per symbol in report order. Values are written
//! with Rust's shortest round-trip float formatting, so parsing the export
//! back reproduces them exactly.

use anyhow::{bail, Context, Result};

use crate::types::{ExpResult, ScanReport, SymbolResult, Timeframe};

/// Suggested file name for downloads.
pub const EXPORT_FILE_NAME: &str = "exp_btc_scan.csv";

/// Serialize the report's results as UTF-8 CSV.
pub fn to_csv(report: &ScanReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![String::new()];
    header.extend(Timeframe::ALL.iter().map(|tf| tf.label().to_string()));
    writer.write_record(&header).context("Failed to write CSV header")?;

    for row in report.results() {
        let mut record = vec![row.symbol.clone()];
        record.extend(row.exp.iter().map(|(_, v)| v.to_string()));
        writer
            .write_record(&record)
            .with_context(|| format!("Failed to write CSV row for {}", row.symbol))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {e}"))?;
    String::from_utf8(bytes).context("CSV export is not valid UTF-8")
}

/// Parse a CSV export back into symbol results, in file order.
pub fn from_csv(data: &str) -> Result<Vec<SymbolResult>> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());

    let header = reader.headers().context("Failed to read CSV header")?.clone();
    let expected: Vec<&str> = Timeframe::ALL.iter().map(|tf| tf.label()).collect();
    let labels: Vec<&str> = header.iter().skip(1).collect();
    if labels != expected {
        bail!("Unexpected CSV header: {:?}", header);
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV row {}", line + 1))?;
        let symbol = record
            .get(0)
            .filter(|s| !s.is_empty())
            .with_context(|| format!("Missing symbol in CSV row {}", line + 1))?
            .to_string();

        let mut values = [0.0; Timeframe::COUNT];
        for (i, slot) in values.iter_mut().enumerate() {
            let raw = record
                .get(i + 1)
                .with_context(|| format!("Missing {} value for {symbol}", Timeframe::ALL[i]))?;
            *slot = raw
                .parse::<f64>()
                .with_context(|| format!("Invalid {} value for {symbol}: {raw:?}", Timeframe::ALL[i]))?;
        }

        rows.push(SymbolResult {
            symbol,
            exp: ExpResult::from_values(values),
        });
    }

    Ok(rows)
}
