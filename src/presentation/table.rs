//! Console table rendering.

use tabled::builder::Builder;
use tabled::settings::Style;

use super::CellStyle;
use crate::types::{ScanReport, Timeframe};

const ANSI_RESET: &str = "\x1b[0m";

/// Format one EXP value, colored by its classification when `color` is set.
pub fn format_cell(value: f64, color: bool) -> String {
    let text = format!("{value:+.2}%");
    if color {
        format!("{}{text}{ANSI_RESET}", CellStyle::classify(value).ansi_prefix())
    } else {
        text
    }
}

/// Render the report's successful symbols as a table, in report order.
pub fn render(report: &ScanReport, color: bool) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["Symbol".to_string()];
    header.extend(Timeframe::ALL.iter().map(|tf| {
        if *tf == report.sort_timeframe() {
            format!("{tf} ▼")
        } else {
            tf.to_string()
        }
    }));
    builder.push_record(header);

    for row in report.results() {
        let mut record = vec![row.symbol.clone()];
        record.extend(row.exp.iter().map(|(_, v)| format_cell(v, color)));
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}
