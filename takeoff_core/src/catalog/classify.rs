//! Shape classification from designation prefixes.
//!
//! Steel designations carry their family in the prefix: `W14X90` is a wide
//! flange, `WT7X45` a tee cut from one, `HSS6X6X1/4` a hollow section. Several
//! prefixes are prefixes of each other (`W`/`WT`, `M`/`MC`/`MT`, `S`/`ST`), so
//! the rules are tried in a fixed order and the single-letter families carry
//! explicit exclusions.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::catalog::classify::{classify, ShapeClass};
//!
//! assert_eq!(classify("W14X90"), ShapeClass::W);
//! assert_eq!(classify("WT4X5"), ShapeClass::WT);
//! assert_eq!(classify("hp12x53"), ShapeClass::HP);
//! assert_eq!(classify(""), ShapeClass::Other);
//! ```

use serde::{Deserialize, Serialize};

/// Coarse shape family derived from a designation prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShapeClass {
    /// Wide flange beam (W-shape)
    W,
    /// Miscellaneous shape (M-shape)
    M,
    /// American Standard beam (S-shape)
    S,
    /// H-pile (HP-shape)
    HP,
    /// American Standard channel (C-shape)
    C,
    /// Miscellaneous channel (MC-shape)
    MC,
    /// Single angle (L-shape)
    L,
    /// Double angle (2L-shape)
    #[serde(rename = "2L")]
    TwoL,
    /// Structural tee cut from W-shape
    WT,
    /// Structural tee cut from M-shape
    MT,
    /// Structural tee cut from S-shape
    ST,
    /// Hollow structural section (rectangular, square or round)
    HSS,
    /// Pipe (standard, extra strong, double extra strong)
    #[serde(rename = "PIPE")]
    Pipe,
    /// Empty or unrecognized designation
    Other,
}

/// One prefix rule: the prefix, prefixes that veto it, and the result.
type PrefixRule = (&'static str, &'static [&'static str], ShapeClass);

/// Ordered prefix rules. Longer, more specific prefixes come first so that
/// e.g. `MC8X20` never reaches the `M` or `C` rules.
const PREFIX_RULES: [PrefixRule; 13] = [
    ("HSS", &[], ShapeClass::HSS),
    ("PIPE", &[], ShapeClass::Pipe),
    ("2L", &[], ShapeClass::TwoL),
    ("WT", &[], ShapeClass::WT),
    ("MT", &[], ShapeClass::MT),
    ("ST", &[], ShapeClass::ST),
    ("HP", &[], ShapeClass::HP),
    ("MC", &[], ShapeClass::MC),
    ("W", &["WT", "WP"], ShapeClass::W),
    ("M", &["MC", "MT"], ShapeClass::M),
    ("S", &["ST"], ShapeClass::S),
    ("C", &[], ShapeClass::C),
    ("L", &[], ShapeClass::L),
];

/// Classify a designation label into its shape family.
///
/// The label is uppercased, then matched against the ordered prefix rules.
/// Labels that are empty or match nothing (including `WP...` labels, which
/// are excluded from `W`) fall back to [`ShapeClass::Other`].
pub fn classify(label: &str) -> ShapeClass {
    let upper = label.trim().to_uppercase();
    if upper.is_empty() {
        return ShapeClass::Other;
    }

    PREFIX_RULES
        .iter()
        .find(|(prefix, excluded, _)| {
            upper.starts_with(prefix) && !excluded.iter().any(|x| upper.starts_with(x))
        })
        .map(|(_, _, class)| *class)
        .unwrap_or(ShapeClass::Other)
}

impl ShapeClass {
    /// All classes for iteration
    pub const ALL: [ShapeClass; 14] = [
        ShapeClass::W,
        ShapeClass::M,
        ShapeClass::S,
        ShapeClass::HP,
        ShapeClass::C,
        ShapeClass::MC,
        ShapeClass::L,
        ShapeClass::TwoL,
        ShapeClass::WT,
        ShapeClass::MT,
        ShapeClass::ST,
        ShapeClass::HSS,
        ShapeClass::Pipe,
        ShapeClass::Other,
    ];

    /// Short category code as stored in the catalog ("W", "2L", "PIPE", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeClass::W => "W",
            ShapeClass::M => "M",
            ShapeClass::S => "S",
            ShapeClass::HP => "HP",
            ShapeClass::C => "C",
            ShapeClass::MC => "MC",
            ShapeClass::L => "L",
            ShapeClass::TwoL => "2L",
            ShapeClass::WT => "WT",
            ShapeClass::MT => "MT",
            ShapeClass::ST => "ST",
            ShapeClass::HSS => "HSS",
            ShapeClass::Pipe => "PIPE",
            ShapeClass::Other => "Other",
        }
    }

    /// Parse from a category code (case-insensitive)
    pub fn from_code(s: &str) -> Option<Self> {
        let code = s.trim();
        ShapeClass::ALL
            .iter()
            .copied()
            .find(|class| class.as_str().eq_ignore_ascii_case(code))
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ShapeClass::W => "Wide Flange (W)",
            ShapeClass::M => "Miscellaneous (M)",
            ShapeClass::S => "American Standard (S)",
            ShapeClass::HP => "H-Pile (HP)",
            ShapeClass::C => "Channel (C)",
            ShapeClass::MC => "Miscellaneous Channel (MC)",
            ShapeClass::L => "Angle (L)",
            ShapeClass::TwoL => "Double Angle (2L)",
            ShapeClass::WT => "Tee (WT)",
            ShapeClass::MT => "Tee (MT)",
            ShapeClass::ST => "Tee (ST)",
            ShapeClass::HSS => "Hollow Structural Section (HSS)",
            ShapeClass::Pipe => "Pipe",
            ShapeClass::Other => "Other",
        }
    }

    /// Check if the family has flanges (bf, tf properties)
    pub fn has_flanges(&self) -> bool {
        matches!(
            self,
            ShapeClass::W
                | ShapeClass::M
                | ShapeClass::S
                | ShapeClass::HP
                | ShapeClass::C
                | ShapeClass::MC
                | ShapeClass::WT
                | ShapeClass::MT
                | ShapeClass::ST
        )
    }

    /// Check if the family is hollow (HSS or Pipe)
    pub fn is_hollow(&self) -> bool {
        matches!(self, ShapeClass::HSS | ShapeClass::Pipe)
    }
}

impl std::fmt::Display for ShapeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
