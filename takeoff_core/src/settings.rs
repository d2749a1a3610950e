//! # Settings
//!
//! Pricing and import defaults stored as JSON next to the catalog. Every
//! field has a default, so a partial file (or `{}`) is valid.
//!
//! ```rust
//! use takeoff_core::settings::TakeoffSettings;
//! use takeoff_core::quote::GroupingMode;
//!
//! let settings: TakeoffSettings =
//!     serde_json::from_str(r#"{"pricing": {"markup_percent": 15.0}}"#).unwrap();
//! assert_eq!(settings.pricing.markup_percent, 15.0);
//! assert_eq!(settings.pricing.grouping, GroupingMode::Classification);
//! assert_eq!(settings.query_limit, 100);
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_QUERY_LIMIT;
use crate::import::ImportOptions;
use crate::quote::PricingConfig;

/// Current schema version for catalog and settings files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// User-adjustable defaults for pricing, import and queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeoffSettings {
    /// Schema version of the file this was read from
    pub version: String,
    pub pricing: PricingConfig,
    pub import: ImportOptions,
    /// Row cap for shape listings
    pub query_limit: usize,
}

impl Default for TakeoffSettings {
    fn default() -> Self {
        TakeoffSettings {
            version: SCHEMA_VERSION.to_string(),
            pricing: PricingConfig::default(),
            import: ImportOptions::default(),
            query_limit: DEFAULT_QUERY_LIMIT,
        }
    }
}
