//! # Tabular Import
//!
//! Loads shape tables into the [`Catalog`]. Two sources are supported:
//!
//! - **CSV text**: the first line is the header. Splitting is naive (on every
//!   comma); quoted commas are not supported. Cells are trimmed and stripped of
//!   surrounding double quotes.
//! - **Spreadsheet rows**: a rows-of-cells grid, read from the first worksheet
//!   of a workbook file by [`import_xlsx_file`] or supplied directly. Exports
//!   often carry title or notes rows above the real header, so the header is
//!   the first row within the scan window that has at least
//!   [`ImportOptions::min_header_cells`] non-empty cells.
//!
//! [`import_file`] picks the reader from the file extension.
//!
//! ## Column resolution
//!
//! The label column and the alternate-name column are found by exact,
//! case-insensitive match against [`LABEL_COLUMN_NAMES`] and
//! [`ALTERNATE_COLUMN_NAMES`]. When several header cells match, the rightmost
//! one wins. When no label column exists, [`LabelColumnPolicy`] decides
//! between treating column 0 as the label (default) and refusing the import.
//!
//! ## Atomicity
//!
//! Every row is resolved into a [`ShapeUpsert`] before the catalog is touched.
//! Input errors therefore leave the catalog unchanged, and a successful import
//! is applied in a single pass that cannot fail part-way.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::catalog::Catalog;
//! use takeoff_core::import::{import_csv_str, ImportOptions};
//!
//! let mut catalog = Catalog::new();
//! let csv = "Label,W,Type\nW14X90,90.0,W\nHSS4X4X.25,6.87,HSS\n";
//! let report = import_csv_str(&mut catalog, csv, &ImportOptions::default()).unwrap();
//!
//! assert_eq!(report.imported, 2);
//! assert_eq!(catalog.len(), 2);
//! ```

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::catalog::{classify, Catalog, ShapeUpsert};
use crate::errors::{TakeoffError, TakeoffResult};

/// File extensions imported as workbooks rather than CSV
pub const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Header names accepted for the primary label column
pub const LABEL_COLUMN_NAMES: [&str; 4] = ["AISC_Manual_Label", "AISC Manual Label", "Label", "Shape"];

/// Header names accepted for the alternate-name column
pub const ALTERNATE_COLUMN_NAMES: [&str; 4] = ["EDI_Std_Nomenclature", "EDI Name", "EDI", "Nomenclature"];

/// What to do when no header matches [`LABEL_COLUMN_NAMES`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelColumnPolicy {
    /// Treat column 0 as the label column
    #[default]
    FallbackToFirstColumn,
    /// Fail the import with [`TakeoffError::MissingColumn`]
    Strict,
}

/// Import tuning, normally loaded as part of the settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub label_policy: LabelColumnPolicy,
    /// Number of leading spreadsheet rows searched for the header
    pub header_scan_rows: usize,
    /// Minimum non-empty cells for a spreadsheet row to count as the header
    pub min_header_cells: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            label_policy: LabelColumnPolicy::default(),
            header_scan_rows: 10,
            min_header_cells: 5,
        }
    }
}

/// Outcome of a successful import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Rows that produced a shape upsert (a repeated key counts each time)
    pub imported: usize,
    /// Data rows skipped because neither label nor alternate name was present
    pub skipped: usize,
    /// Zero-based index of the header row in the source
    pub header_row: usize,
    /// Zero-based label column
    pub label_column: usize,
    /// Zero-based alternate-name column, if one was found
    pub alternate_column: Option<usize>,
    /// True when no label header matched and column 0 was used
    pub label_fallback_used: bool,
}

/// Resolved positions of the identity columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub label: usize,
    pub alternate: Option<usize>,
    pub label_fallback_used: bool,
}

/// Trim a cell and strip surrounding double quotes
pub fn normalize_cell(cell: &str) -> String {
    cell.trim().trim_matches('"').trim().to_string()
}

/// Rightmost header cell matching any of `names`
fn find_column(header: &[String], names: &[&str]) -> Option<usize> {
    header
        .iter()
        .rposition(|h| names.iter().any(|name| h.eq_ignore_ascii_case(name)))
}

/// Locate the label and alternate-name columns in a normalized header row.
pub fn resolve_columns(header: &[String], policy: LabelColumnPolicy) -> TakeoffResult<ColumnMap> {
    let alternate = find_column(header, &ALTERNATE_COLUMN_NAMES);

    match find_column(header, &LABEL_COLUMN_NAMES) {
        Some(label) => Ok(ColumnMap {
            label,
            alternate,
            label_fallback_used: false,
        }),
        None => match policy {
            LabelColumnPolicy::FallbackToFirstColumn => {
                warn!(
                    "No label column among [{}]; using column 0 ('{}')",
                    LABEL_COLUMN_NAMES.join(", "),
                    header.first().map(String::as_str).unwrap_or("")
                );
                Ok(ColumnMap {
                    label: 0,
                    alternate,
                    label_fallback_used: true,
                })
            }
            LabelColumnPolicy::Strict => Err(TakeoffError::missing_column(&LABEL_COLUMN_NAMES)),
        },
    }
}

/// Resolve one data row into a staged upsert, or `None` if it has no key.
fn stage_row(header: &[String], row: &[String], columns: &ColumnMap) -> Option<ShapeUpsert> {
    let cell = |idx: usize| row.get(idx).map(|c| c.trim()).unwrap_or("");

    let label = cell(columns.label);
    let alternate = columns.alternate.map(cell).unwrap_or("");

    let shape_key = if alternate.is_empty() { label } else { alternate };
    if shape_key.is_empty() {
        return None;
    }

    let classification = classify(if label.is_empty() { alternate } else { label });

    let properties = header
        .iter()
        .zip(row.iter())
        .filter(|(key, value)| !key.is_empty() && !value.trim().is_empty())
        .map(|(key, value)| (key.clone(), value.trim().to_string()))
        .collect();

    Some(ShapeUpsert {
        shape_key: shape_key.to_string(),
        primary_label: label.to_string(),
        alternate_name: alternate.to_string(),
        classification,
        properties,
    })
}

fn import_with_header(
    catalog: &mut Catalog,
    header: &[String],
    header_row: usize,
    rows: &[Vec<String>],
    options: &ImportOptions,
) -> TakeoffResult<ImportReport> {
    let header: Vec<String> = header.iter().map(|h| normalize_cell(h)).collect();
    let columns = resolve_columns(&header, options.label_policy)?;
    debug!(
        "Resolved columns: label={} alternate={:?} (fallback: {})",
        columns.label, columns.alternate, columns.label_fallback_used
    );

    let mut batch = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for (offset, row) in rows.iter().enumerate() {
        match stage_row(&header, row, &columns) {
            Some(upsert) => batch.push(upsert),
            None => {
                skipped += 1;
                debug!("Skipping row {}: no label or alternate name", header_row + 1 + offset);
            }
        }
    }

    let imported = catalog.apply_batch(batch);
    info!("Imported {} shapes ({} rows skipped)", imported, skipped);

    Ok(ImportReport {
        imported,
        skipped,
        header_row,
        label_column: columns.label,
        alternate_column: columns.alternate,
        label_fallback_used: columns.label_fallback_used,
    })
}

/// Import a header row and data rows that are already split into cells.
///
/// Fails with [`TakeoffError::EmptyInput`] when there is neither a header
/// nor any data. A header with no data rows imports nothing and succeeds.
pub fn import_table(
    catalog: &mut Catalog,
    header: &[String],
    rows: &[Vec<String>],
    options: &ImportOptions,
) -> TakeoffResult<ImportReport> {
    if header.iter().all(|h| h.trim().is_empty()) && rows.is_empty() {
        return Err(TakeoffError::empty_input("table"));
    }
    import_with_header(catalog, header, 0, rows, options)
}

/// Split CSV text into a header row and data rows.
///
/// Blank lines are dropped. A leading UTF-8 byte-order mark is ignored.
pub fn parse_csv(text: &str) -> TakeoffResult<(Vec<String>, Vec<Vec<String>>)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header_line = lines
        .next()
        .ok_or_else(|| TakeoffError::empty_input("CSV input"))?;
    let header = header_line.split(',').map(normalize_cell).collect();
    let rows = lines
        .map(|line| line.split(',').map(normalize_cell).collect())
        .collect();

    Ok((header, rows))
}

/// Import CSV text. The first non-blank line is the header.
pub fn import_csv_str(catalog: &mut Catalog, text: &str, options: &ImportOptions) -> TakeoffResult<ImportReport> {
    let (header, rows) = parse_csv(text)?;
    import_with_header(catalog, &header, 0, &rows, options)
}

/// Import a CSV file from disk.
pub fn import_csv_file(catalog: &mut Catalog, path: &Path, options: &ImportOptions) -> TakeoffResult<ImportReport> {
    let bytes = fs::read(path)
        .map_err(|e| TakeoffError::file_error("read", path.display().to_string(), e.to_string()))?;
    let text = String::from_utf8_lossy(&bytes);

    let (header, rows) = parse_csv(&text).map_err(|e| match e {
        TakeoffError::EmptyInput { .. } => TakeoffError::empty_input(path.display().to_string()),
        other => other,
    })?;

    info!("Importing shapes from {}", path.display());
    import_with_header(catalog, &header, 0, &rows, options)
}

/// Find the header row of a spreadsheet grid.
///
/// Returns the index of the first row, within the first
/// `options.header_scan_rows` rows, having at least `options.min_header_cells`
/// non-empty cells.
pub fn locate_header_row(rows: &[Vec<String>], options: &ImportOptions) -> TakeoffResult<usize> {
    rows.iter()
        .take(options.header_scan_rows)
        .position(|row| row.iter().filter(|c| !c.trim().is_empty()).count() >= options.min_header_cells)
        .ok_or(TakeoffError::HeaderNotFound {
            scanned_rows: options.header_scan_rows,
            min_cells: options.min_header_cells,
        })
}

/// Import a spreadsheet grid, auto-detecting the header row.
pub fn import_spreadsheet_rows(
    catalog: &mut Catalog,
    rows: &[Vec<String>],
    options: &ImportOptions,
) -> TakeoffResult<ImportReport> {
    if rows.is_empty() {
        return Err(TakeoffError::empty_input("spreadsheet"));
    }

    let header_row = locate_header_row(rows, options)?;
    let data: Vec<Vec<String>> = rows[header_row + 1..]
        .iter()
        .map(|row| row.iter().map(|c| c.trim().to_string()).collect())
        .collect();

    import_with_header(catalog, &rows[header_row], header_row, &data, options)
}

/// Text of a worksheet cell as a CSV export would show it
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Flatten a worksheet range into rows of cell text
pub fn range_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

/// Import the first worksheet of a workbook (.xlsx, .xlsm, .xls, .ods).
pub fn import_xlsx_file(catalog: &mut Catalog, path: &Path, options: &ImportOptions) -> TakeoffResult<ImportReport> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| TakeoffError::file_error("open workbook", path.display().to_string(), e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TakeoffError::empty_input(path.display().to_string()))?
        .map_err(|e| TakeoffError::file_error("read worksheet", path.display().to_string(), e.to_string()))?;

    let rows = range_rows(&range);
    info!("Importing shapes from {} ({} worksheet rows)", path.display(), rows.len());

    import_spreadsheet_rows(catalog, &rows, options).map_err(|e| match e {
        TakeoffError::EmptyInput { .. } => TakeoffError::empty_input(path.display().to_string()),
        other => other,
    })
}

/// Import a shape table, reading workbooks by extension and anything else as CSV.
pub fn import_file(catalog: &mut Catalog, path: &Path, options: &ImportOptions) -> TakeoffResult<ImportReport> {
    let is_workbook = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WORKBOOK_EXTENSIONS.contains(&ext))
        .unwrap_or(false);

    if is_workbook {
        import_xlsx_file(catalog, path, options)
    } else {
        import_csv_file(catalog, path, options)
    }
}
