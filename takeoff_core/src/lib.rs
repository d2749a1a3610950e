//! # takeoff_core - Shape Catalog and Quote Engine
//!
//! `takeoff_core` turns measured takeoff records into priced quote lines. It
//! owns a generic property store of structural steel shapes imported from
//! vendor spreadsheets, and an aggregation engine that groups records and
//! prices them from those shape properties. All inputs and outputs are
//! JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Explicit handles**: The catalog is passed to every operation that reads it
//! - **Tolerant input**: Header rows are located and columns resolved by synonym
//! - **Deterministic totals**: Summaries do not depend on record order
//! - **Rich Errors**: Structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use takeoff_core::catalog::Catalog;
//! use takeoff_core::import::{import_csv_str, ImportOptions};
//! use takeoff_core::quote::{summarize, PricingConfig};
//! use takeoff_core::takeoff::TakeoffRecord;
//!
//! let mut catalog = Catalog::new();
//! let csv = "AISC_Manual_Label,Type,W,d,bf\nW14X90,W,90,14.0,14.5\n";
//! let report = import_csv_str(&mut catalog, csv, &ImportOptions::default()).unwrap();
//! assert_eq!(report.imported, 1);
//!
//! let shape = catalog.find_by_designation("W14X90").unwrap().id;
//! let records = vec![TakeoffRecord::line(1, 120.0).with_designation("W14X90").with_shape(shape)];
//! let summary = summarize(&records, &PricingConfig::default(), &catalog);
//! assert_eq!(summary.grand_total_weight_lb, 900.0);
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - Shape store, classification and filtered listing
//! - [`import`] - CSV / spreadsheet import with header detection
//! - [`takeoff`] - Measurement records from the drawing surface
//! - [`quote`] - Grouping, pricing and report export
//! - [`settings`] - Pricing and import defaults
//! - [`units`] - Type-safe unit wrappers
//! - [`errors`] - Structured error types
//! - [`file_io`] - Catalog persistence with atomic saves and locking

pub mod catalog;
pub mod errors;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod import;
pub mod quote;
pub mod settings;
pub mod takeoff;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use catalog::{classify, Catalog, PropertyLookup, ShapeClass, ShapeId, ShapeQuery};
pub use errors::{TakeoffError, TakeoffResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{load_catalog, save_catalog, FileLock};
pub use import::{ImportOptions, ImportReport};
pub use quote::{summarize, GroupingMode, PricingConfig, QuoteSummary};
pub use settings::TakeoffSettings;
pub use takeoff::TakeoffRecord;
