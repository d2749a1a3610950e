//! # Shape Catalog
//!
//! Generic property store for structural steel shapes. Each shape has a small
//! identity row (key, label, alternate name, classification) and an open-ended
//! map of properties taken verbatim from whatever spreadsheet it was imported
//! from. Vendors disagree on column sets, so nothing beyond the identity is a
//! fixed field; typed access goes through [`Catalog::property`].
//!
//! ## Lookup policy
//!
//! [`Catalog::property`] returns `0.0` for an unknown shape, an unknown
//! property, or a property whose text did not parse as a number. Costing code
//! relies on this: a shape with no weight data contributes nothing to a
//! summary instead of failing it.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::catalog::{Catalog, ShapeClass};
//!
//! let mut catalog = Catalog::new();
//! let id = catalog.upsert_shape("W14X90", "W14X90", "", ShapeClass::W).unwrap();
//! catalog.upsert_property(id, "W", "90").unwrap();
//!
//! assert_eq!(catalog.property(id, "W"), 90.0);
//! assert_eq!(catalog.property(id, "missing"), 0.0);
//! assert_eq!(catalog.label(id), "W14X90");
//! ```

pub mod classify;
pub mod query;

pub use classify::{classify, ShapeClass};
pub use query::{DisplayRow, ShapeQuery, DEFAULT_QUERY_LIMIT};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{TakeoffError, TakeoffResult};

/// Property key holding weight per linear foot (lb/ft)
pub const WEIGHT_PROP: &str = "W";

/// Property key holding overall depth (in)
pub const DEPTH_PROP: &str = "d";

/// Property key holding flange width (in)
pub const FLANGE_WIDTH_PROP: &str = "bf";

/// Stable catalog identity of a shape. Assigned on first insert, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub u32);

impl std::fmt::Display for ShapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A property as imported: the original cell text plus its numeric reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    /// Cell text exactly as imported
    pub text: String,
    /// Parsed value, `None` when the text is not a finite decimal number
    pub numeric: Option<f64>,
}

impl PropertyValue {
    /// Build a value from cell text, parsing it as a number when possible
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let numeric = parse_numeric(&text);
        PropertyValue { text, numeric }
    }
}

/// Parse a spreadsheet cell as a decimal number.
///
/// Returns `None` for empty cells, dash placeholders, non-numeric text and
/// non-finite results ("inf", "NaN").
pub fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed == "—" {
        return None;
    }
    f64::from_str(trimmed).ok().filter(|v| v.is_finite())
}

/// One shape in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    /// Stable identity
    pub id: ShapeId,
    /// De-duplication key: alternate name when present, else the label. Never empty.
    pub shape_key: String,
    /// Human-facing designation (e.g. "W14X90"); may be empty
    pub primary_label: String,
    /// Secondary nomenclature (e.g. EDI standard name); may be empty
    pub alternate_name: String,
    /// Family computed at import time
    pub classification: ShapeClass,
    /// Imported properties keyed by header text (case-sensitive)
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ShapeRecord {
    /// Label for display: the primary label, or the shape key when no label was imported
    pub fn display_label(&self) -> &str {
        if self.primary_label.is_empty() {
            &self.shape_key
        } else {
            &self.primary_label
        }
    }

    /// Numeric property value with the catalog's silent-zero policy
    pub fn numeric(&self, key: &str) -> f64 {
        self.properties
            .get(key)
            .and_then(|v| v.numeric)
            .unwrap_or(0.0)
    }
}

/// A fully-resolved shape upsert, staged by the importer and applied in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeUpsert {
    pub shape_key: String,
    pub primary_label: String,
    pub alternate_name: String,
    pub classification: ShapeClass,
    /// (header, cell text) pairs; empty headers and empty cells already removed
    pub properties: Vec<(String, String)>,
}

/// Read access the costing engine needs from a shape store.
///
/// Implemented by [`Catalog`]; summaries take the store as an explicit
/// parameter so tests and callers can substitute their own.
pub trait PropertyLookup {
    /// Numeric property value, `0.0` when the shape or property is unknown
    fn property(&self, id: ShapeId, key: &str) -> f64;

    /// Primary label of a shape, empty when unknown
    fn label(&self, id: ShapeId) -> &str;
}

/// In-memory shape catalog.
///
/// Shapes are held in id order, with a key index for the import path's upserts.
#[derive(Debug, Clone)]
pub struct Catalog {
    shapes: BTreeMap<ShapeId, ShapeRecord>,
    by_key: HashMap<String, ShapeId>,
    next_id: u32,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Catalog {
            shapes: BTreeMap::new(),
            by_key: HashMap::new(),
            next_id: 1,
        }
    }

    /// Rebuild a catalog from persisted records.
    ///
    /// `next_id` is raised past the largest stored id so ids are never reused.
    pub fn from_records(records: Vec<ShapeRecord>, next_id: u32) -> TakeoffResult<Self> {
        let mut catalog = Catalog::new();
        for record in records {
            if record.shape_key.is_empty() {
                return Err(TakeoffError::invalid_input(
                    "shape_key",
                    record.id.to_string(),
                    "Stored shape has an empty key",
                ));
            }
            if catalog.by_key.contains_key(&record.shape_key) || catalog.shapes.contains_key(&record.id) {
                return Err(TakeoffError::invalid_input(
                    "shape_key",
                    record.shape_key.clone(),
                    "Stored shape key or id is duplicated",
                ));
            }
            catalog.by_key.insert(record.shape_key.clone(), record.id);
            catalog.shapes.insert(record.id, record);
        }
        let max_id = catalog.shapes.keys().next_back().map(|id| id.0).unwrap_or(0);
        catalog.next_id = next_id.max(max_id + 1).max(1);
        Ok(catalog)
    }

    /// Id the next new shape will receive
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Create or replace a shape's identity row.
    ///
    /// Returns the shape's id; an existing key keeps its id. Properties of an
    /// existing shape are left in place (they are replaced one at a time by
    /// [`Catalog::upsert_property`]).
    pub fn upsert_shape(
        &mut self,
        shape_key: &str,
        primary_label: &str,
        alternate_name: &str,
        classification: ShapeClass,
    ) -> TakeoffResult<ShapeId> {
        if shape_key.is_empty() {
            return Err(TakeoffError::invalid_input(
                "shape_key",
                "",
                "Shape key must not be empty",
            ));
        }

        if let Some(id) = self.by_key.get(shape_key).copied() {
            if let Some(record) = self.shapes.get_mut(&id) {
                record.primary_label = primary_label.to_string();
                record.alternate_name = alternate_name.to_string();
                record.classification = classification;
                return Ok(id);
            }
        }

        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.by_key.insert(shape_key.to_string(), id);
        self.shapes.insert(
            id,
            ShapeRecord {
                id,
                shape_key: shape_key.to_string(),
                primary_label: primary_label.to_string(),
                alternate_name: alternate_name.to_string(),
                classification,
                properties: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    /// Store a property, overwriting any previous value for `(id, key)`.
    pub fn upsert_property(&mut self, id: ShapeId, key: &str, text: &str) -> TakeoffResult<()> {
        let record = self
            .shapes
            .get_mut(&id)
            .ok_or_else(|| TakeoffError::shape_not_found(format!("id {}", id)))?;
        record
            .properties
            .insert(key.to_string(), PropertyValue::parse(text));
        Ok(())
    }

    /// Apply a staged batch of upserts in order. Returns the number applied.
    ///
    /// Entries with an empty key are dropped, so applying never fails and a
    /// batch is either not started or fully applied.
    pub fn apply_batch(&mut self, batch: Vec<ShapeUpsert>) -> usize {
        let mut applied = 0;
        for upsert in batch {
            let Ok(id) = self.upsert_shape(
                &upsert.shape_key,
                &upsert.primary_label,
                &upsert.alternate_name,
                upsert.classification,
            ) else {
                continue;
            };
            if let Some(record) = self.shapes.get_mut(&id) {
                for (key, text) in upsert.properties {
                    record.properties.insert(key, PropertyValue::parse(text));
                }
            }
            applied += 1;
        }
        applied
    }

    /// Numeric property value, `0.0` if the shape, the property, or a numeric reading is absent
    pub fn property(&self, id: ShapeId, key: &str) -> f64 {
        self.shapes.get(&id).map(|s| s.numeric(key)).unwrap_or(0.0)
    }

    /// Full property value (text and numeric reading)
    pub fn property_value(&self, id: ShapeId, key: &str) -> Option<&PropertyValue> {
        self.shapes.get(&id).and_then(|s| s.properties.get(key))
    }

    /// Primary label, empty if the shape is unknown
    pub fn label(&self, id: ShapeId) -> &str {
        self.shapes
            .get(&id)
            .map(|s| s.primary_label.as_str())
            .unwrap_or("")
    }

    /// Look up a shape by id
    pub fn get(&self, id: ShapeId) -> Option<&ShapeRecord> {
        self.shapes.get(&id)
    }

    /// Look up a shape by its exact de-duplication key
    pub fn get_by_key(&self, shape_key: &str) -> Option<&ShapeRecord> {
        self.by_key.get(shape_key).and_then(|id| self.shapes.get(id))
    }

    /// Resolve a designation typed by a user to a shape.
    ///
    /// Tries the exact key first, then a case-insensitive match on label,
    /// alternate name or key. The lowest id wins among several matches.
    pub fn find_by_designation(&self, designation: &str) -> Option<&ShapeRecord> {
        let designation = designation.trim();
        if designation.is_empty() {
            return None;
        }
        self.get_by_key(designation).or_else(|| {
            self.shapes.values().find(|s| {
                s.primary_label.eq_ignore_ascii_case(designation)
                    || s.alternate_name.eq_ignore_ascii_case(designation)
                    || s.shape_key.eq_ignore_ascii_case(designation)
            })
        })
    }

    /// Distinct classifications present, sorted by code
    pub fn classifications(&self) -> Vec<String> {
        self.shapes
            .values()
            .map(|s| s.classification.as_str().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Iterate shapes in id order
    pub fn iter(&self) -> impl Iterator<Item = &ShapeRecord> {
        self.shapes.values()
    }

    /// Number of shapes
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Remove every shape and property. Ids handed out before are not reissued.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.by_key.clear();
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new()
    }
}

impl PropertyLookup for Catalog {
    fn property(&self, id: ShapeId, key: &str) -> f64 {
        Catalog::property(self, id, key)
    }

    fn label(&self, id: ShapeId) -> &str {
        Catalog::label(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w14x90(catalog: &mut Catalog) -> ShapeId {
        let id = catalog
            .upsert_shape("W14X90", "W14X90", "", ShapeClass::W)
            .unwrap();
        catalog.upsert_property(id, "W", "90.0").unwrap();
        catalog.upsert_property(id, "d", "14.0").unwrap();
        id
    }

    #[test]
    fn test_upsert_assigns_stable_ids() {
        let mut catalog = Catalog::new();
        let a = w14x90(&mut catalog);
        let b = catalog
            .upsert_shape("HSS4X4X.25", "HSS4X4X1/4", "HSS4X4X.25", ShapeClass::HSS)
            .unwrap();
        assert_ne!(a, b);

        // Re-upserting the same key keeps the id and replaces identity fields
        let again = catalog
            .upsert_shape("W14X90", "W14x90", "alt", ShapeClass::W)
            .unwrap();
        assert_eq!(again, a);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label(a), "W14x90");
        assert_eq!(catalog.get(a).unwrap().alternate_name, "alt");
    }

    #[test]
    fn test_upsert_property_overwrites() {
        let mut catalog = Catalog::new();
        let id = w14x90(&mut catalog);
        catalog.upsert_property(id, "W", "91.5").unwrap();
        assert_eq!(catalog.property(id, "W"), 91.5);
        assert_eq!(catalog.get(id).unwrap().properties.len(), 2);
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut catalog = Catalog::new();
        let err = catalog.upsert_shape("", "W14X90", "", ShapeClass::W).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_property_on_unknown_shape_errors() {
        let mut catalog = Catalog::new();
        let err = catalog.upsert_property(ShapeId(42), "W", "1").unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_NOT_FOUND");
    }

    #[test]
    fn test_silent_zero_lookups() {
        let mut catalog = Catalog::new();
        let id = w14x90(&mut catalog);
        catalog.upsert_property(id, "Type", "W").unwrap();

        assert_eq!(catalog.property(ShapeId(999), "W"), 0.0);
        assert_eq!(catalog.property(id, "nope"), 0.0);
        // Text-only property has no numeric reading
        assert_eq!(catalog.property(id, "Type"), 0.0);
        assert_eq!(catalog.property_value(id, "Type").unwrap().text, "W");
        assert_eq!(catalog.label(ShapeId(999)), "");
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("123.45"), Some(123.45));
        assert_eq!(parse_numeric("  456  "), Some(456.0));
        assert_eq!(parse_numeric(".25"), Some(0.25));
        assert_eq!(parse_numeric("1e3"), Some(1000.0));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("-"), None);
        assert_eq!(parse_numeric("—"), None);
        assert_eq!(parse_numeric("1/2"), None);
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric("inf"), None);
    }

    #[test]
    fn test_classifications_sorted_and_distinct() {
        let mut catalog = Catalog::new();
        catalog.upsert_shape("W14X90", "W14X90", "", ShapeClass::W).unwrap();
        catalog.upsert_shape("W12X26", "W12X26", "", ShapeClass::W).unwrap();
        catalog.upsert_shape("HSS4X4", "HSS4X4", "", ShapeClass::HSS).unwrap();
        catalog.upsert_shape("C10X30", "C10X30", "", ShapeClass::C).unwrap();
        assert_eq!(catalog.classifications(), vec!["C", "HSS", "W"]);
    }

    #[test]
    fn test_clear_does_not_reuse_ids() {
        let mut catalog = Catalog::new();
        let first = w14x90(&mut catalog);
        catalog.clear();
        assert!(catalog.is_empty());
        assert_eq!(catalog.property(first, "W"), 0.0);

        let second = w14x90(&mut catalog);
        assert!(second > first);
    }

    #[test]
    fn test_find_by_designation() {
        let mut catalog = Catalog::new();
        catalog
            .upsert_shape("HSS4X4X.250", "HSS4X4X1/4", "HSS4X4X.250", ShapeClass::HSS)
            .unwrap();
        let w = w14x90(&mut catalog);

        assert_eq!(catalog.find_by_designation("w14x90").unwrap().id, w);
        assert_eq!(
            catalog.find_by_designation("HSS4X4X1/4").unwrap().shape_key,
            "HSS4X4X.250"
        );
        assert!(catalog.find_by_designation("").is_none());
        assert!(catalog.find_by_designation("W99X1").is_none());
    }

    #[test]
    fn test_from_records_keeps_ids_monotonic() {
        let mut catalog = Catalog::new();
        w14x90(&mut catalog);
        let records: Vec<ShapeRecord> = catalog.iter().cloned().collect();

        let restored = Catalog::from_records(records, 0).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.next_id(), 2);
        assert_eq!(restored.get_by_key("W14X90").unwrap().numeric("W"), 90.0);
    }

    #[test]
    fn test_from_records_rejects_duplicate_keys() {
        let mut catalog = Catalog::new();
        w14x90(&mut catalog);
        let record = catalog.iter().next().unwrap().clone();
        let mut dup = record.clone();
        dup.id = ShapeId(7);
        assert!(Catalog::from_records(vec![record, dup], 1).is_err());
    }

    #[test]
    fn test_apply_batch_counts_and_upserts_per_property() {
        let mut catalog = Catalog::new();
        let id = w14x90(&mut catalog);

        let applied = catalog.apply_batch(vec![
            ShapeUpsert {
                shape_key: "W14X90".to_string(),
                primary_label: "W14X90".to_string(),
                alternate_name: String::new(),
                classification: ShapeClass::W,
                properties: vec![("W".to_string(), "90.5".to_string())],
            },
            ShapeUpsert {
                shape_key: String::new(),
                primary_label: String::new(),
                alternate_name: String::new(),
                classification: ShapeClass::Other,
                properties: vec![],
            },
        ]);

        assert_eq!(applied, 1);
        assert_eq!(catalog.property(id, "W"), 90.5);
        // Depth from the first import survives
        assert_eq!(catalog.property(id, "d"), 14.0);
    }
}
