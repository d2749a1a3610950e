//! Comma-delimited quote report.
//!
//! Layout:
//!
//! ```text
//! Material Type,Size,Labor Class,Total (in),Total (ft),Weight (lb),Item Count,Material Cost,Labor Cost,Subtotal
//! Channel,C10X30,ShopFab,120.00,10.00,300.0,1,20.00,10.00,30.00
//!
//! Rates:,Material $/ft,2.00
//! ,Labor $/ft,1.00
//! ,Markup %,10.00
//!
//! Subtotal:,$30.00
//! Total:,$33.00
//! Total Weight:,300.0 lb
//! ```

use super::{GroupKey, GroupingMode, PricingConfig, QuoteLineGroup, QuoteSummary};

const VALUE_COLUMNS: [&str; 7] = [
    "Total (in)",
    "Total (ft)",
    "Weight (lb)",
    "Item Count",
    "Material Cost",
    "Labor Cost",
    "Subtotal",
];

/// Quote a field if it contains a delimiter, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn key_columns(mode: GroupingMode) -> &'static [&'static str] {
    match mode {
        GroupingMode::Classification => &["Material Type", "Size", "Labor Class"],
        GroupingMode::Designation => &["Designation"],
    }
}

fn key_fields(key: &GroupKey) -> Vec<String> {
    match key {
        GroupKey::Classification {
            material_type,
            size,
            labor_class,
        } => vec![
            material_type.as_str().to_string(),
            size.clone(),
            labor_class.as_str().to_string(),
        ],
        GroupKey::Designation { designation } => vec![designation.clone()],
    }
}

fn line_row(line: &QuoteLineGroup) -> String {
    let mut fields: Vec<String> = key_fields(&line.key).iter().map(|f| escape_field(f)).collect();
    fields.push(format!("{:.2}", line.total_length_inches));
    fields.push(format!("{:.2}", line.total_length_feet));
    fields.push(format!("{:.1}", line.total_weight_lb));
    fields.push(line.item_count.to_string());
    fields.push(format!("{:.2}", line.material_cost));
    fields.push(format!("{:.2}", line.labor_cost));
    fields.push(format!("{:.2}", line.subtotal));
    fields.join(",")
}

/// Render a summary as comma-delimited text.
///
/// `pricing` must be the configuration the summary was computed with; its
/// grouping mode selects the key columns and its rates fill the rates block.
pub fn write_report(summary: &QuoteSummary, pricing: &PricingConfig) -> String {
    let header: Vec<&str> = key_columns(pricing.grouping)
        .iter()
        .chain(VALUE_COLUMNS.iter())
        .copied()
        .collect();

    let mut rows = vec![header.join(",")];
    rows.extend(summary.lines.iter().map(line_row));

    rows.push(String::new());
    match pricing.grouping {
        GroupingMode::Classification => {
            rows.push(format!("Rates:,Material $/ft,{:.2}", pricing.material_rate_per_ft));
            rows.push(format!(",Labor $/ft,{:.2}", pricing.labor_rate_per_ft));
        }
        GroupingMode::Designation => {
            rows.push(format!("Rates:,Price $/lb,{:.2}", pricing.price_per_lb));
        }
    }
    rows.push(format!(",Markup %,{:.2}", pricing.markup_percent));

    rows.push(String::new());
    rows.push(format!("Subtotal:,${:.2}", summary.grand_subtotal));
    rows.push(format!("Total:,${:.2}", summary.grand_total));
    rows.push(format!("Total Weight:,{:.1} lb", summary.grand_total_weight_lb));

    let mut out = rows.join("\n");
    out.push('\n');
    out
}

/// Write the report to `path` with the atomic save used for catalog files.
#[cfg(not(target_arch = "wasm32"))]
pub fn save_report(
    summary: &QuoteSummary,
    pricing: &PricingConfig,
    path: &std::path::Path,
) -> crate::errors::TakeoffResult<()> {
    let text = write_report(summary, pricing);
    crate::file_io::write_atomic(path, text.as_bytes())?;
    log::info!("Wrote quote report with {} lines to {}", summary.line_count(), path.display());
    Ok(())
}
