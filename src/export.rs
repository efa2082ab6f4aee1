//! Alert list export as plain text, CSV, or JSON.
//!
//! Used by `list --format` for piping into other tools and screen readers.

use crate::reconcile::AlertRow;
use num_format::{Locale, ToFormattedString};

/// Export format type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Text,
    Csv,
    Json,
}

/// Export rows in the specified format.
pub fn export_rows(rows: &[AlertRow], format: ExportFormat) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Text => Ok(export_text(rows)),
        ExportFormat::Csv => Ok(export_csv(rows)),
        ExportFormat::Json => export_json(rows),
    }
}

/// Fixed-width table, one alert per line.
fn export_text(rows: &[AlertRow]) -> String {
    if rows.is_empty() {
        return "No alerts found.\n".to_string();
    }

    let mut output = format!(
        "{:>3} {:>6} {:<8} {:>12} {:<9} {:<8} {:<19}\n",
        "#", "ID", "TICKER", "PRICE", "DIRECTION", "NOTIFIED", "CREATED AT"
    );
    output.push_str(&"-".repeat(71));
    output.push('\n');

    for row in rows {
        output.push_str(&format!(
            "{:>3} {:>6} {:<8} {:>12} {:<9} {:<8} {:<19}\n",
            row.index,
            row.id,
            row.ticker,
            format_price(row.limit_price),
            row.direction,
            row.notified,
            row.created_at
        ));
    }

    output
}

fn export_csv(rows: &[AlertRow]) -> String {
    let mut output = String::from("Index,Id,Ticker,LimitPrice,Direction,Notified,CreatedAt\n");

    for row in rows {
        output.push_str(&format!(
            "{},{},\"{}\",{:.2},{},{},\"{}\"\n",
            row.index,
            row.id,
            row.ticker.replace('"', "\"\""),
            row.limit_price,
            row.direction,
            row.notified,
            row.created_at
        ));
    }

    output
}

fn export_json(rows: &[AlertRow]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rows)
}

/// Format a price with thousands separators and cents.
pub fn format_price(price: f64) -> String {
    let cents = (price.abs() * 100.0).round() as u64;
    let sign = if price < 0.0 { "-" } else { "" };
    format!(
        "{}${}.{:02}",
        sign,
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}
