//! # Quote Summaries
//!
//! Groups takeoff records into priced quote lines. A summary is recomputed
//! from scratch on every call and never cached or stored.
//!
//! ## Grouping modes
//!
//! | Mode | Key | Length per record | Count per record | Material cost | Labor cost |
//! |------|-----|-------------------|------------------|---------------|------------|
//! | [`GroupingMode::Classification`] | material type, size, labor class | `length` | 1 | feet × $/ft | feet × $/ft |
//! | [`GroupingMode::Designation`] | designation or `(Unassigned)` | `length × qty` | qty | lb × $/lb | 0 |
//!
//! ## Weight
//!
//! Records in one group may reference different shapes, so length is also
//! tracked per shape within the group. Group weight is the sum over those
//! shapes of feet × the shape's `"W"` property. Shapes missing from the
//! catalog weigh nothing.
//!
//! ## Determinism
//!
//! Groups are ordered by key, and each group's contributions are summed in a
//! canonical order, so any permutation of the same records yields
//! bit-identical totals.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::catalog::Catalog;
//! use takeoff_core::quote::{summarize, PricingConfig};
//! use takeoff_core::takeoff::TakeoffRecord;
//!
//! let records = vec![TakeoffRecord::line(1, 120.0).with_designation("C10X30")];
//! let pricing = PricingConfig {
//!     material_rate_per_ft: 2.0,
//!     labor_rate_per_ft: 1.0,
//!     markup_percent: 10.0,
//!     ..PricingConfig::default()
//! };
//!
//! let summary = summarize(&records, &pricing, &Catalog::new());
//! assert_eq!(summary.grand_subtotal, 30.0);
//! assert!((summary.grand_total - 33.0).abs() < 1e-9);
//! ```

pub mod report;

pub use report::write_report;
#[cfg(not(target_arch = "wasm32"))]
pub use report::save_report;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{PropertyLookup, ShapeId, WEIGHT_PROP};
use crate::takeoff::{LaborClass, MaterialType, TakeoffRecord};
use crate::units::{Feet, Inches, PlF, Pounds};

/// Designation-mode bucket for records with no designation
pub const UNASSIGNED_GROUP: &str = "(Unassigned)";

/// How records are bucketed into quote lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupingMode {
    /// Key on (material type, size, labor class); price by length
    #[default]
    Classification,
    /// Key on designation; price by weight
    Designation,
}

impl GroupingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingMode::Classification => "classification",
            GroupingMode::Designation => "designation",
        }
    }
}

/// Rates applied to a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub grouping: GroupingMode,
    /// $ per linear foot of material (classification mode)
    pub material_rate_per_ft: f64,
    /// $ per linear foot of labor (classification mode)
    pub labor_rate_per_ft: f64,
    /// $ per pound of material (designation mode)
    pub price_per_lb: f64,
    /// Uplift on material + labor, in percent
    pub markup_percent: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            grouping: GroupingMode::Classification,
            material_rate_per_ft: 0.0,
            labor_rate_per_ft: 0.0,
            price_per_lb: 0.0,
            markup_percent: 0.0,
        }
    }
}

impl PricingConfig {
    /// Multiplier applied to the subtotal
    pub fn markup_factor(&self) -> f64 {
        1.0 + self.markup_percent / 100.0
    }
}

/// Composite key of a quote line
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum GroupKey {
    Classification {
        material_type: MaterialType,
        size: String,
        labor_class: LaborClass,
    },
    Designation {
        designation: String,
    },
}

impl GroupKey {
    /// Key of a record under the given mode
    pub fn for_record(record: &TakeoffRecord, mode: GroupingMode) -> Self {
        match mode {
            GroupingMode::Classification => GroupKey::Classification {
                material_type: record.material_type,
                size: record.designation.clone(),
                labor_class: record.labor_class,
            },
            GroupingMode::Designation => GroupKey::Designation {
                designation: if record.designation.trim().is_empty() {
                    UNASSIGNED_GROUP.to_string()
                } else {
                    record.designation.clone()
                },
            },
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKey::Classification {
                material_type,
                size,
                labor_class,
            } => write!(f, "{} | {} | {}", material_type, size, labor_class),
            GroupKey::Designation { designation } => f.write_str(designation),
        }
    }
}

/// One aggregated line of a quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLineGroup {
    pub key: GroupKey,
    pub total_length_inches: f64,
    pub total_length_feet: f64,
    pub item_count: u64,
    pub total_weight_lb: f64,
    pub material_cost: f64,
    pub labor_cost: f64,
    pub subtotal: f64,
}

/// Grouped lines plus grand totals
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub lines: Vec<QuoteLineGroup>,
    pub total_material_cost: f64,
    pub total_labor_cost: f64,
    /// Material + labor, before markup
    pub grand_subtotal: f64,
    /// Subtotal after markup
    pub grand_total: f64,
    pub grand_total_weight_lb: f64,
}

impl QuoteSummary {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Find a line by key
    pub fn line(&self, key: &GroupKey) -> Option<&QuoteLineGroup> {
        self.lines.iter().find(|l| &l.key == key)
    }
}

/// One record's contribution to a group
#[derive(Debug, Clone, Copy)]
struct Contribution {
    inches: f64,
    count: u32,
    shape: Option<ShapeId>,
}

impl Contribution {
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.inches
            .total_cmp(&other.inches)
            .then(self.shape.cmp(&other.shape))
            .then(self.count.cmp(&other.count))
    }
}

fn contribution(record: &TakeoffRecord, mode: GroupingMode) -> Contribution {
    match mode {
        GroupingMode::Classification => Contribution {
            inches: record.length_inches,
            count: 1,
            shape: record.shape_id,
        },
        GroupingMode::Designation => Contribution {
            inches: record.total_length_inches(),
            count: record.quantity,
            shape: record.shape_id,
        },
    }
}

fn price_group<L>(key: GroupKey, mut entries: Vec<Contribution>, pricing: &PricingConfig, lookup: &L) -> QuoteLineGroup
where
    L: PropertyLookup + ?Sized,
{
    entries.sort_by(Contribution::canonical_cmp);

    let mut total = Inches(0.0);
    let mut item_count: u64 = 0;
    let mut shape_feet: BTreeMap<ShapeId, Feet> = BTreeMap::new();

    for entry in &entries {
        total += Inches(entry.inches);
        item_count += u64::from(entry.count);
        if let Some(shape) = entry.shape {
            *shape_feet.entry(shape).or_default() += Feet::from(Inches(entry.inches));
        }
    }

    let total_feet = Feet::from(total);
    let weight = shape_feet
        .iter()
        .fold(Pounds(0.0), |acc, (shape, feet)| {
            acc + *feet * PlF(lookup.property(*shape, WEIGHT_PROP))
        });

    let (material_cost, labor_cost) = match pricing.grouping {
        GroupingMode::Classification => (
            total_feet.value() * pricing.material_rate_per_ft,
            total_feet.value() * pricing.labor_rate_per_ft,
        ),
        GroupingMode::Designation => (weight.value() * pricing.price_per_lb, 0.0),
    };

    QuoteLineGroup {
        key,
        total_length_inches: total.value(),
        total_length_feet: total_feet.value(),
        item_count,
        total_weight_lb: weight.value(),
        material_cost,
        labor_cost,
        subtotal: material_cost + labor_cost,
    }
}

/// Group and price takeoff records.
///
/// Records are not validated here; negative lengths or zero quantities are
/// summed as given.
pub fn summarize<L>(records: &[TakeoffRecord], pricing: &PricingConfig, lookup: &L) -> QuoteSummary
where
    L: PropertyLookup + ?Sized,
{
    let mut groups: BTreeMap<GroupKey, Vec<Contribution>> = BTreeMap::new();
    for record in records {
        groups
            .entry(GroupKey::for_record(record, pricing.grouping))
            .or_default()
            .push(contribution(record, pricing.grouping));
    }

    let lines: Vec<QuoteLineGroup> = groups
        .into_iter()
        .map(|(key, entries)| price_group(key, entries, pricing, lookup))
        .collect();

    let total_material_cost: f64 = lines.iter().map(|l| l.material_cost).sum();
    let total_labor_cost: f64 = lines.iter().map(|l| l.labor_cost).sum();
    let grand_total_weight_lb: f64 = lines.iter().map(|l| l.total_weight_lb).sum();
    let grand_subtotal = total_material_cost + total_labor_cost;

    log::debug!(
        "Summarized {} records into {} {} lines",
        records.len(),
        lines.len(),
        pricing.grouping.as_str()
    );

    QuoteSummary {
        lines,
        total_material_cost,
        total_labor_cost,
        grand_subtotal,
        grand_total: grand_subtotal * pricing.markup_factor(),
        grand_total_weight_lb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{classify, Catalog};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn catalog_with(shapes: &[(&str, &str)]) -> (Catalog, Vec<ShapeId>) {
        let mut catalog = Catalog::new();
        let ids = shapes
            .iter()
            .map(|(label, w)| {
                let id = catalog
                    .upsert_shape(label, label, "", classify(label))
                    .unwrap();
                catalog.upsert_property(id, "W", w).unwrap();
                id
            })
            .collect();
        (catalog, ids)
    }

    #[test]
    fn test_same_designation_accumulates_length_and_weight() {
        let (catalog, ids) = catalog_with(&[("W14X90", "90")]);
        let records = vec![
            TakeoffRecord::line(1, 120.0).with_designation("W14X90").with_shape(ids[0]),
            TakeoffRecord::line(2, 60.0).with_designation("W14X90").with_shape(ids[0]),
        ];

        for mode in [GroupingMode::Classification, GroupingMode::Designation] {
            let pricing = PricingConfig {
                grouping: mode,
                ..PricingConfig::default()
            };
            let summary = summarize(&records, &pricing, &catalog);
            assert_eq!(summary.line_count(), 1);
            let line = &summary.lines[0];
            assert_eq!(line.total_length_inches, 180.0);
            assert_eq!(line.total_length_feet, 15.0);
            assert_eq!(line.total_weight_lb, 1350.0);
            assert_eq!(line.item_count, 2);
            assert_eq!(summary.grand_total_weight_lb, 1350.0);
        }
    }

    #[test]
    fn test_classification_pricing_with_markup() {
        let records = vec![TakeoffRecord::line(1, 120.0)
            .with_designation("HSS4X4")
            .with_material_type(MaterialType::Tube)];
        let pricing = PricingConfig {
            material_rate_per_ft: 2.0,
            labor_rate_per_ft: 1.0,
            markup_percent: 10.0,
            ..PricingConfig::default()
        };

        let summary = summarize(&records, &pricing, &Catalog::new());
        let line = &summary.lines[0];
        assert_eq!(line.material_cost, 20.0);
        assert_eq!(line.labor_cost, 10.0);
        assert_eq!(line.subtotal, 30.0);
        assert_eq!(summary.grand_subtotal, 30.0);
        assert!(approx(summary.grand_total, 33.0));
    }

    #[test]
    fn test_classification_mode_ignores_quantity() {
        let records = vec![TakeoffRecord::line(1, 24.0).with_quantity(5)];
        let summary = summarize(&records, &PricingConfig::default(), &Catalog::new());
        assert_eq!(summary.lines[0].total_length_inches, 24.0);
        assert_eq!(summary.lines[0].item_count, 1);
    }

    #[test]
    fn test_designation_mode_uses_quantity_and_weight_pricing() {
        let (catalog, ids) = catalog_with(&[("C10X30", "30")]);
        let records = vec![TakeoffRecord::line(1, 24.0)
            .with_quantity(5)
            .with_designation("C10X30")
            .with_shape(ids[0])];
        let pricing = PricingConfig {
            grouping: GroupingMode::Designation,
            price_per_lb: 0.5,
            labor_rate_per_ft: 100.0,
            ..PricingConfig::default()
        };

        let summary = summarize(&records, &pricing, &catalog);
        let line = &summary.lines[0];
        assert_eq!(line.total_length_inches, 120.0);
        assert_eq!(line.item_count, 5);
        assert_eq!(line.total_weight_lb, 300.0);
        assert_eq!(line.material_cost, 150.0);
        assert_eq!(line.labor_cost, 0.0);
    }

    #[test]
    fn test_designation_mode_unassigned_bucket() {
        let records = vec![
            TakeoffRecord::line(1, 12.0),
            TakeoffRecord::line(2, 12.0).with_designation("  "),
            TakeoffRecord::line(3, 12.0).with_designation("L4X4X1/2"),
        ];
        let pricing = PricingConfig {
            grouping: GroupingMode::Designation,
            ..PricingConfig::default()
        };

        let summary = summarize(&records, &pricing, &Catalog::new());
        assert_eq!(summary.line_count(), 2);
        let unassigned = summary
            .line(&GroupKey::Designation {
                designation: UNASSIGNED_GROUP.to_string(),
            })
            .unwrap();
        assert_eq!(unassigned.item_count, 2);
    }

    #[test]
    fn test_mixed_shapes_in_one_group() {
        let (catalog, ids) = catalog_with(&[("W14X90", "90"), ("W12X26", "26")]);
        // Same size text and tags, different shapes
        let records = vec![
            TakeoffRecord::line(1, 120.0).with_designation("beam").with_shape(ids[0]),
            TakeoffRecord::line(2, 120.0).with_designation("beam").with_shape(ids[1]),
            TakeoffRecord::line(3, 120.0).with_designation("beam"),
        ];

        let summary = summarize(&records, &PricingConfig::default(), &catalog);
        assert_eq!(summary.line_count(), 1);
        assert_eq!(summary.lines[0].total_length_feet, 30.0);
        assert_eq!(summary.lines[0].total_weight_lb, 900.0 + 260.0);
    }

    #[test]
    fn test_unknown_shape_weighs_nothing() {
        let records = vec![TakeoffRecord::line(1, 120.0).with_shape(ShapeId(77))];
        let summary = summarize(&records, &PricingConfig::default(), &Catalog::new());
        assert_eq!(summary.lines[0].total_weight_lb, 0.0);
        assert_eq!(summary.lines[0].total_length_feet, 10.0);
    }

    #[test]
    fn test_groups_split_by_material_and_labor() {
        let records = vec![
            TakeoffRecord::line(1, 12.0).with_designation("L2X2").with_material_type(MaterialType::Angle),
            TakeoffRecord::line(2, 12.0)
                .with_designation("L2X2")
                .with_material_type(MaterialType::Angle)
                .with_labor_class(LaborClass::FieldWeld),
            TakeoffRecord::line(3, 12.0).with_designation("L2X2").with_material_type(MaterialType::Plate),
        ];
        let summary = summarize(&records, &PricingConfig::default(), &Catalog::new());
        assert_eq!(summary.line_count(), 3);
        // Ordered by key: Angle/ShopFab, Angle/FieldWeld, Plate/ShopFab
        let keys: Vec<String> = summary.lines.iter().map(|l| l.key.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "Angle | L2X2 | ShopFab",
                "Angle | L2X2 | FieldWeld",
                "Plate | L2X2 | ShopFab",
            ]
        );
    }

    #[test]
    fn test_order_independent_bit_identical() {
        let (catalog, ids) = catalog_with(&[("W14X90", "90.1"), ("HSS4X4X.25", "6.87")]);
        let mut records: Vec<TakeoffRecord> = (0..40)
            .map(|i| {
                let shape = ids[i % 2];
                TakeoffRecord::line(i as i64, 0.1 + (i as f64) * 3.7)
                    .with_designation(if i % 2 == 0 { "W14X90" } else { "HSS4X4X.25" })
                    .with_shape(shape)
                    .with_quantity((i % 3 + 1) as u32)
            })
            .collect();

        for mode in [GroupingMode::Classification, GroupingMode::Designation] {
            let pricing = PricingConfig {
                grouping: mode,
                material_rate_per_ft: 1.3,
                labor_rate_per_ft: 0.7,
                price_per_lb: 0.11,
                markup_percent: 12.5,
            };
            let forward = summarize(&records, &pricing, &catalog);
            records.reverse();
            let reversed = summarize(&records, &pricing, &catalog);
            records.rotate_left(7);
            let rotated = summarize(&records, &pricing, &catalog);

            assert_eq!(forward, reversed);
            assert_eq!(forward, rotated);
        }
    }

    #[test]
    fn test_empty_input() {
        let summary = summarize(&[], &PricingConfig::default(), &Catalog::new());
        assert_eq!(summary, QuoteSummary::default());
    }

    #[test]
    fn test_custom_lookup() {
        struct Flat;
        impl PropertyLookup for Flat {
            fn property(&self, _id: ShapeId, key: &str) -> f64 {
                if key == "W" { 10.0 } else { 0.0 }
            }
            fn label(&self, _id: ShapeId) -> &str {
                "flat"
            }
        }

        let records = vec![TakeoffRecord::line(1, 12.0).with_shape(ShapeId(1))];
        let summary = summarize(&records, &PricingConfig::default(), &Flat);
        assert_eq!(summary.grand_total_weight_lb, 10.0);
    }
}
