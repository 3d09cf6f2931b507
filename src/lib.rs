//! Site metrics, top queries, and page opportunities from search-console exports.

pub mod analyzers;
pub mod config;
pub mod error;
pub mod loader;
pub mod mcp;
pub mod output;
pub mod paths;
pub mod tools;
