//! Tool catalogue and dispatch for external hosts.
//!
//! Each tool resolves the caller's path, loads the export fresh, runs one
//! aggregation, and returns a JSON value. Nothing is cached between calls.

use crate::analyzers::aggregate::{page_opportunities, summarize, top_queries};
use crate::analyzers::types::{OpportunityParams, PageAggregate, QueryAggregate, QueryParams, Summary};
use crate::config::Settings;
use crate::error::GscError;
use crate::loader::load;
use crate::paths::resolve_path;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Value, json};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

pub const SUMMARY_TOOL: &str = "gsc_summary";
pub const TOP_QUERIES_TOOL: &str = "gsc_top_queries";
pub const PAGE_OPPORTUNITIES_TOOL: &str = "gsc_page_opportunities";

/// Tool metadata as advertised to the host.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Returns the three analysis tools with their JSON input schemas.
pub fn definitions() -> Vec<ToolDefinition> {
    let defaults = OpportunityParams::default();
    vec![
        ToolDefinition {
            name: SUMMARY_TOOL,
            description: "Return site-level SEO metrics from a GSC export file (CSV/JSON).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                },
                "required": ["path"]
            }),
        },
        ToolDefinition {
            name: TOP_QUERIES_TOOL,
            description: "Return top query opportunities from a GSC export file.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "limit": { "type": "integer", "default": QueryParams::default().limit },
                    "min_impressions": { "type": "number", "default": 0 }
                },
                "required": ["path"]
            }),
        },
        ToolDefinition {
            name: PAGE_OPPORTUNITIES_TOOL,
            description: "Find pages with traffic potential from GSC export data.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "min_impressions": { "type": "number", "default": defaults.min_impressions },
                    "min_position": { "type": "number", "default": defaults.min_position },
                    "max_position": { "type": "number", "default": defaults.max_position },
                    "limit": { "type": "integer", "default": defaults.limit }
                },
                "required": ["path"]
            }),
        },
    ]
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Analysis(#[from] GscError),

    #[error("failed to serialize result: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct SummaryArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct TopQueriesArgs {
    path: String,
    #[serde(default = "default_query_limit", deserialize_with = "whole_number")]
    limit: i64,
    #[serde(default, alias = "minImpressions")]
    min_impressions: f64,
}

#[derive(Debug, Deserialize)]
struct PageOpportunitiesArgs {
    path: String,
    #[serde(default = "default_page_min_impressions", alias = "minImpressions")]
    min_impressions: f64,
    #[serde(default = "default_min_position", alias = "minPosition")]
    min_position: f64,
    #[serde(default = "default_max_position", alias = "maxPosition")]
    max_position: f64,
    #[serde(default = "default_page_limit", deserialize_with = "whole_number")]
    limit: i64,
}

fn default_query_limit() -> i64 {
    QueryParams::default().limit as i64
}

fn default_page_min_impressions() -> f64 {
    OpportunityParams::default().min_impressions
}

fn default_min_position() -> f64 {
    OpportunityParams::default().min_position
}

fn default_max_position() -> f64 {
    OpportunityParams::default().max_position
}

fn default_page_limit() -> i64 {
    OpportunityParams::default().limit as i64
}

/// Accepts integers and integral floats such as `5.0`.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value.fract() == 0.0 {
        Ok(value as i64)
    } else {
        Err(de::Error::custom(format!("expected a whole number, found {value}")))
    }
}

/// Zero and negative limits select nothing.
fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

/// Runs analysis tools against files on disk.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutor {
    data_dir: Option<PathBuf>,
}

impl ToolExecutor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            data_dir: settings.data_dir.clone(),
        }
    }

    pub fn summary(&self, path: &str) -> Result<Summary, GscError> {
        let table = load(resolve_path(path, self.data_dir.as_deref())?)?;
        Ok(summarize(&table))
    }

    pub fn top_queries(&self, path: &str, params: &QueryParams) -> Result<Vec<QueryAggregate>, GscError> {
        let table = load(resolve_path(path, self.data_dir.as_deref())?)?;
        Ok(top_queries(&table, params))
    }

    pub fn page_opportunities(
        &self,
        path: &str,
        params: &OpportunityParams,
    ) -> Result<Vec<PageAggregate>, GscError> {
        let table = load(resolve_path(path, self.data_dir.as_deref())?)?;
        Ok(page_opportunities(&table, params))
    }

    /// Executes the tool called `name` with JSON `arguments`.
    ///
    /// Missing arguments (`null`) are treated as an empty object so the
    /// caller gets a "missing field" message rather than a type error.
    #[tracing::instrument(skip(self, arguments))]
    pub fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let arguments = if arguments.is_null() {
            Value::Object(Default::default())
        } else {
            arguments
        };
        let invalid = |source| ToolError::InvalidArguments {
            tool: name.to_string(),
            source,
        };

        let result = match name {
            SUMMARY_TOOL => {
                let args: SummaryArgs = serde_json::from_value(arguments).map_err(invalid)?;
                serde_json::to_value(self.summary(&args.path)?)
            }
            TOP_QUERIES_TOOL => {
                let args: TopQueriesArgs = serde_json::from_value(arguments).map_err(invalid)?;
                let params = QueryParams {
                    limit: clamp_limit(args.limit),
                    min_impressions: args.min_impressions,
                };
                serde_json::to_value(self.top_queries(&args.path, &params)?)
            }
            PAGE_OPPORTUNITIES_TOOL => {
                let args: PageOpportunitiesArgs =
                    serde_json::from_value(arguments).map_err(invalid)?;
                let params = OpportunityParams {
                    min_impressions: args.min_impressions,
                    min_position: args.min_position,
                    max_position: args.max_position,
                    limit: clamp_limit(args.limit),
                };
                serde_json::to_value(self.page_opportunities(&args.path, &params)?)
            }
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };

        info!("Tool completed");
        result.map_err(ToolError::Serialize)
    }
}
