//! # citegraph
//!
//! Citation graphs for Zotero collections, resolved through Crossref.
//!
//! ## Modules
//!
//! - [`graph`] - Graph builder: collection aggregation and reference resolution
//! - [`paper`] - Paper record normalization
//! - [`dot`] - Graphviz DOT rendering
//! - [`gateway`] - Library and citation gateway traits
//! - [`zotero`] - Zotero Web API client
//! - [`crossref`] - Crossref API client for reference lookup
//! - [`config`] - Environment-derived settings
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use citegraph::{config::Settings, crossref::CrossrefClient, graph::GraphBuilder, zotero::ZoteroClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let library = ZoteroClient::new(&settings.zotero)?;
//!     let citations = CrossrefClient::new(&settings.crossref_mailto, 3)?;
//!
//!     let graph = GraphBuilder::new(library, citations)
//!         .build(&["My Collection"])
//!         .await?;
//!     print!("{}", graph);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crossref;
pub mod dot;
pub mod error;
pub mod gateway;
pub mod graph;
pub mod paper;
pub mod zotero;

#[cfg(test)]
mod test_support;

pub use error::{CitegraphError, Result};
pub use graph::{BuildOptions, CitationGraph, GraphBuilder, UnresolvedCollection};
