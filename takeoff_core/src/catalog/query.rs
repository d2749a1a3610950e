//! Filtered listing of catalog shapes for shape pickers.

use serde::{Deserialize, Serialize};

use super::{Catalog, ShapeId, DEPTH_PROP, FLANGE_WIDTH_PROP, WEIGHT_PROP};

/// Row cap applied when the caller does not pass one
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Filter for [`Catalog::query`].
///
/// An empty classification or search string means "no filter".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeQuery {
    /// Exact classification code ("W", "HSS", ...)
    #[serde(default)]
    pub classification: String,
    /// Case-insensitive substring of label, alternate name or key
    #[serde(default)]
    pub search: String,
    /// Maximum number of rows returned
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}

impl Default for ShapeQuery {
    fn default() -> Self {
        ShapeQuery {
            classification: String::new(),
            search: String::new(),
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl ShapeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classification(mut self, code: impl Into<String>) -> Self {
        self.classification = code.into();
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Denormalized listing row: identity plus the three properties pickers show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub id: ShapeId,
    pub shape_key: String,
    pub label: String,
    pub alternate_name: String,
    pub classification: String,
    /// "W" property (lb/ft), 0.0 when absent
    pub weight_per_ft: f64,
    /// "d" property (in), 0.0 when absent
    pub depth: f64,
    /// "bf" property (in), 0.0 when absent
    pub flange_width: f64,
}

impl Catalog {
    /// List shapes matching a query, ordered by label, capped at `query.limit`.
    ///
    /// Use [`Catalog::len`] for the unfiltered total ("showing N of M").
    pub fn query(&self, query: &ShapeQuery) -> Vec<DisplayRow> {
        let class_filter = query.classification.trim();
        let needle = query.search.trim().to_lowercase();

        let mut matches: Vec<_> = self
            .iter()
            .filter(|s| class_filter.is_empty() || s.classification.as_str() == class_filter)
            .filter(|s| {
                needle.is_empty()
                    || s.primary_label.to_lowercase().contains(&needle)
                    || s.alternate_name.to_lowercase().contains(&needle)
                    || s.shape_key.to_lowercase().contains(&needle)
            })
            .collect();

        matches.sort_by(|a, b| a.primary_label.cmp(&b.primary_label).then(a.id.cmp(&b.id)));

        matches
            .into_iter()
            .take(query.limit)
            .map(|s| DisplayRow {
                id: s.id,
                shape_key: s.shape_key.clone(),
                label: s.primary_label.clone(),
                alternate_name: s.alternate_name.clone(),
                classification: s.classification.as_str().to_string(),
                weight_per_ft: s.numeric(WEIGHT_PROP),
                depth: s.numeric(DEPTH_PROP),
                flange_width: s.numeric(FLANGE_WIDTH_PROP),
            })
            .collect()
    }

    /// Positional form of [`Catalog::query`]
    pub fn query_shapes(&self, classification: &str, search: &str, limit: usize) -> Vec<DisplayRow> {
        self.query(
            &ShapeQuery::new()
                .classification(classification)
                .search(search)
                .limit(limit),
        )
    }
}
