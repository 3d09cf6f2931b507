//! Search-console aggregation.
//!
//! Computes site totals, ranks queries by clicks, and finds pages with high
//! impressions but a middling average position.

pub mod aggregate;
pub mod types;
pub mod utility;
