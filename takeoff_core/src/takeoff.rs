//! # Takeoff Records
//!
//! Measurements as the project store hands them to the costing engine: the
//! drawing geometry is already reduced to a length in inches, and the record
//! carries whatever tagging the estimator applied (shape, designation,
//! material type, labor class).
//!
//! Records are owned by the project store. The engine only reads them and
//! does not validate them; [`TakeoffRecord::validate`] is provided for the
//! store to call before handing records over.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::takeoff::{TakeoffRecord, MaterialType};
//!
//! let record = TakeoffRecord::line(1, 120.0)
//!     .with_designation("W14X90")
//!     .with_quantity(2)
//!     .with_material_type(MaterialType::Channel);
//!
//! assert_eq!(record.length_feet(), 10.0);
//! assert_eq!(record.total_length_feet(), 20.0);
//! assert_eq!(record.weight_lb(90.0), 1800.0);
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::ShapeId;
use crate::errors::{TakeoffError, TakeoffResult};
use crate::units::{Feet, Inches, PlF};

/// Geometry the length was measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryKind {
    /// Single segment
    #[default]
    Line,
    /// Multiple connected segments
    Polyline,
}

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Line => "Line",
            GeometryKind::Polyline => "Polyline",
        }
    }
}

/// Material family used for classification-mode grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum MaterialType {
    Tube,
    Angle,
    Channel,
    FlatBar,
    Plate,
    #[default]
    Other,
}

impl MaterialType {
    pub const ALL: [MaterialType; 6] = [
        MaterialType::Tube,
        MaterialType::Angle,
        MaterialType::Channel,
        MaterialType::FlatBar,
        MaterialType::Plate,
        MaterialType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Tube => "Tube",
            MaterialType::Angle => "Angle",
            MaterialType::Channel => "Channel",
            MaterialType::FlatBar => "FlatBar",
            MaterialType::Plate => "Plate",
            MaterialType::Other => "Other",
        }
    }

    /// Parse a stored name; anything unrecognized is `Other`
    pub fn from_name(s: &str) -> Self {
        MaterialType::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .unwrap_or(MaterialType::Other)
    }
}

/// Labor category used for classification-mode grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum LaborClass {
    #[default]
    ShopFab,
    FieldInstall,
    FieldWeld,
}

impl LaborClass {
    pub const ALL: [LaborClass; 3] = [LaborClass::ShopFab, LaborClass::FieldInstall, LaborClass::FieldWeld];

    pub fn as_str(&self) -> &'static str {
        match self {
            LaborClass::ShopFab => "ShopFab",
            LaborClass::FieldInstall => "FieldInstall",
            LaborClass::FieldWeld => "FieldWeld",
        }
    }

    /// Parse a stored name; anything unrecognized is `ShopFab`
    pub fn from_name(s: &str) -> Self {
        LaborClass::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .unwrap_or(LaborClass::ShopFab)
    }
}

impl std::fmt::Display for MaterialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for LaborClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_quantity() -> u32 {
    1
}

/// Accept the project store's "-1 means unassigned" convention.
fn deserialize_shape_id<'de, D>(deserializer: D) -> Result<Option<ShapeId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<i64> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|id| *id > 0)
        .and_then(|id| u32::try_from(id).ok())
        .map(ShapeId))
}

/// One measured item from the project store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeoffRecord {
    pub id: i64,
    /// Opaque page reference; not used by the engine
    #[serde(default)]
    pub page_id: String,
    #[serde(default)]
    pub kind: GeometryKind,
    pub length_inches: f64,
    #[serde(default = "default_quantity", alias = "qty")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "deserialize_shape_id")]
    pub shape_id: Option<ShapeId>,
    /// Free-text designation, also used as the "size" in classification mode
    #[serde(default, alias = "size")]
    pub designation: String,
    #[serde(default)]
    pub material_type: MaterialType,
    #[serde(default)]
    pub labor_class: LaborClass,
    #[serde(default)]
    pub notes: String,
}

impl TakeoffRecord {
    /// Create a single-segment record with quantity 1 and no tagging
    pub fn line(id: i64, length_inches: f64) -> Self {
        TakeoffRecord {
            id,
            page_id: String::new(),
            kind: GeometryKind::Line,
            length_inches,
            quantity: 1,
            shape_id: None,
            designation: String::new(),
            material_type: MaterialType::Other,
            labor_class: LaborClass::ShopFab,
            notes: String::new(),
        }
    }

    /// Create a multi-segment record with quantity 1 and no tagging
    pub fn polyline(id: i64, length_inches: f64) -> Self {
        TakeoffRecord {
            kind: GeometryKind::Polyline,
            ..TakeoffRecord::line(id, length_inches)
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_shape(mut self, shape_id: ShapeId) -> Self {
        self.shape_id = Some(shape_id);
        self
    }

    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designation = designation.into();
        self
    }

    pub fn with_material_type(mut self, material_type: MaterialType) -> Self {
        self.material_type = material_type;
        self
    }

    pub fn with_labor_class(mut self, labor_class: LaborClass) -> Self {
        self.labor_class = labor_class;
        self
    }

    pub fn with_page(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = page_id.into();
        self
    }

    /// Single-piece length in feet
    pub fn length_feet(&self) -> f64 {
        Feet::from(Inches(self.length_inches)).value()
    }

    /// Length times quantity, in inches
    pub fn total_length_inches(&self) -> f64 {
        self.length_inches * f64::from(self.quantity)
    }

    /// Length times quantity, in feet
    pub fn total_length_feet(&self) -> f64 {
        self.length_feet() * f64::from(self.quantity)
    }

    /// Total weight for a given weight per foot; zero when the weight is not positive
    pub fn weight_lb(&self, w_lb_per_ft: f64) -> f64 {
        if w_lb_per_ft <= 0.0 {
            return 0.0;
        }
        (Feet(self.total_length_feet()) * PlF(w_lb_per_ft)).value()
    }

    /// Material cost priced by weight
    pub fn material_cost(&self, w_lb_per_ft: f64, price_per_lb: f64) -> f64 {
        self.weight_lb(w_lb_per_ft) * price_per_lb
    }

    /// True when both a catalog shape and a designation are assigned
    pub fn has_material(&self) -> bool {
        self.shape_id.is_some() && !self.designation.is_empty()
    }

    /// Short description, e.g. "Line - W14X90 (10.00 ft x2)"
    pub fn display_string(&self) -> String {
        let mut result = self.kind.as_str().to_string();
        if !self.designation.is_empty() {
            result.push_str(&format!(" - {}", self.designation));
        }
        result.push_str(&format!(" ({:.2} ft", self.length_feet()));
        if self.quantity > 1 {
            result.push_str(&format!(" x{}", self.quantity));
        }
        result.push(')');
        result
    }

    /// Check the record against the engine's input contract.
    ///
    /// The engine itself never calls this; the project store should.
    pub fn validate(&self) -> TakeoffResult<()> {
        if !self.length_inches.is_finite() || self.length_inches < 0.0 {
            return Err(TakeoffError::invalid_input(
                "length_inches",
                self.length_inches.to_string(),
                "Length must be a non-negative number",
            ));
        }
        if self.quantity == 0 {
            return Err(TakeoffError::invalid_input(
                "quantity",
                "0",
                "Quantity must be at least 1",
            ));
        }
        Ok(())
    }
}
