//! Data types used by the aggregation pipeline.

use serde::Serialize;

/// Columns every export must provide, after header normalization.
pub const REQUIRED_COLUMNS: [&str; 6] = ["query", "page", "clicks", "impressions", "ctr", "position"];

/// One (query, page) impression record from a search-console export.
///
/// `ctr` is carried exactly as exported. Aggregates recompute their own CTR
/// from summed clicks and impressions and never read this field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    pub query: String,
    pub page: String,
    pub clicks: f64,
    pub impressions: f64,
    pub ctr: f64,
    pub position: f64,
}

/// An immutable, ordered set of normalized rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl From<Vec<Row>> for Table {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Site-level totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub total_clicks: f64,
    pub total_impressions: f64,
    pub weighted_ctr: f64,
    pub weighted_position: f64,
}

/// Clicks and impressions summed per query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAggregate {
    pub query: String,
    pub clicks: f64,
    pub impressions: f64,
    pub ctr: f64,
}

/// Per-page totals with the unweighted mean position of the page's rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageAggregate {
    pub page: String,
    pub clicks: f64,
    pub impressions: f64,
    pub avg_position: f64,
    pub ctr: f64,
}

/// Tuning for [`top_queries`](crate::analyzers::aggregate::top_queries).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryParams {
    pub limit: usize,
    pub min_impressions: f64,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            limit: 10,
            min_impressions: 0.0,
        }
    }
}

/// Tuning for [`page_opportunities`](crate::analyzers::aggregate::page_opportunities).
///
/// Both position bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpportunityParams {
    pub min_impressions: f64,
    pub min_position: f64,
    pub max_position: f64,
    pub limit: usize,
}

impl Default for OpportunityParams {
    fn default() -> Self {
        Self {
            min_impressions: 100.0,
            min_position: 5.0,
            max_position: 20.0,
            limit: 20,
        }
    }
}
