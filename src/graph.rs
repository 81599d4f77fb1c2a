//! Citation graph construction.
//!
//! A build runs in three phases:
//!
//! 1. **Aggregation** - every requested collection is resolved and listed; each
//!    paper with a DOI is added to a [`DoiIndex`]. The first title seen for a
//!    DOI wins.
//! 2. **Reference resolution** - every indexed DOI is looked up through the
//!    [`CitationGateway`]; only cited DOIs present in the index become edges.
//! 3. **Serialization** - [`CitationGraph`] renders as DOT via `Display`.
//!
//! ## Failure policy
//!
//! - Unknown collection name: skipped by default, or an error with
//!   [`UnresolvedCollection::Fail`].
//! - Malformed item in a listing: skipped and logged.
//! - Any other listing/resolution error: the build fails.
//! - Reference lookup error: logged, treated as "no references".

use crate::dot;
use crate::error::{CitegraphError, Result};
use crate::gateway::{CitationGateway, LibraryGateway};
use crate::paper::normalize_doi;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// What to do when a collection name does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedCollection {
    /// Log and continue without that collection
    #[default]
    Skip,
    /// Abort the build with [`CitegraphError::CollectionNotFound`]
    Fail,
}

/// Options for a graph build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Policy for collection names the library does not know
    pub unresolved: UnresolvedCollection,
    /// Maximum reference lookups in flight (1 = sequential)
    pub concurrency: usize,
    /// Drop edges from a paper to itself
    pub skip_self_citations: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            unresolved: UnresolvedCollection::Skip,
            concurrency: 1,
            skip_self_citations: false,
        }
    }
}

/// DOI to title map, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct DoiIndex {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl DoiIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `doi` with `title` unless already present.
    ///
    /// Returns `false` (and keeps the existing title) for a known DOI.
    pub fn insert(&mut self, doi: String, title: String) -> bool {
        if self.positions.contains_key(&doi) {
            return false;
        }
        self.positions.insert(doi.clone(), self.entries.len());
        self.entries.push((doi, title));
        true
    }

    pub fn contains(&self, doi: &str) -> bool {
        self.positions.contains_key(doi)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dois(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(d, _)| d.as_str())
    }
}

/// A graph node: one in-library paper with a DOI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub doi: String,
    pub title: String,
}

/// Directed edge: `citing` lists `cited` among its references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CitationEdge {
    pub citing: String,
    pub cited: String,
}

impl CitationEdge {
    pub fn new(citing: impl Into<String>, cited: impl Into<String>) -> Self {
        Self {
            citing: citing.into(),
            cited: cited.into(),
        }
    }

    pub fn is_self_citation(&self) -> bool {
        self.citing == self.cited
    }
}

/// Counters collected during one build. Never part of the DOT output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub collections_requested: usize,
    pub collections_resolved: usize,
    pub collections_skipped: usize,
    pub papers_seen: usize,
    pub papers_without_doi: usize,
    pub malformed_items: usize,
    pub duplicate_dois: usize,
    pub lookups: usize,
    pub failed_lookups: usize,
    pub external_references: usize,
    pub self_citations_skipped: usize,
}

/// Result of a build: nodes in discovery order, edges in discovery order.
#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<CitationEdge>,
    stats: BuildStats,
}

impl CitationGraph {
    fn from_parts(index: DoiIndex, edges: Vec<CitationEdge>, stats: BuildStats) -> Self {
        let nodes = index
            .entries
            .into_iter()
            .map(|(doi, title)| GraphNode { doi, title })
            .collect();

        Self { nodes, edges, stats }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[CitationEdge] {
        &self.edges
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Render as Graphviz DOT text.
    pub fn to_dot(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CitationGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dot::write_dot(f, &self.nodes, &self.edges)
    }
}

/// Builds citation graphs from a library and a citation source.
pub struct GraphBuilder<L, C> {
    library: L,
    citations: C,
    options: BuildOptions,
}

impl<L: LibraryGateway, C: CitationGateway> GraphBuilder<L, C> {
    pub fn new(library: L, citations: C) -> Self {
        Self {
            library,
            citations,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the citation graph for the given collection names.
    pub async fn build<S>(&self, collections: &[S]) -> Result<CitationGraph>
    where
        S: AsRef<str> + Sync,
    {
        if let Some(blank) = collections.iter().position(|c| c.as_ref().trim().is_empty()) {
            return Err(CitegraphError::Validation(format!(
                "collection name at position {} is empty",
                blank
            )));
        }

        let mut stats = BuildStats::default();
        let index = self.collect_index(collections, &mut stats).await?;
        let edges = self.resolve_edges(&index, &mut stats).await;

        info!(
            collections = stats.collections_resolved,
            skipped = stats.collections_skipped,
            nodes = index.len(),
            edges = edges.len(),
            failed_lookups = stats.failed_lookups,
            external = stats.external_references,
            "Citation graph built"
        );

        Ok(CitationGraph::from_parts(index, edges, stats))
    }

    /// Convenience wrapper returning DOT text directly.
    pub async fn build_dot<S>(&self, collections: &[S]) -> Result<String>
    where
        S: AsRef<str> + Sync,
    {
        Ok(self.build(collections).await?.to_dot())
    }

    async fn collect_index<S>(&self, collections: &[S], stats: &mut BuildStats) -> Result<DoiIndex>
    where
        S: AsRef<str> + Sync,
    {
        let mut index = DoiIndex::new();

        for name in collections {
            let name = name.as_ref();
            stats.collections_requested += 1;

            let Some(collection_id) = self.library.resolve_collection(name).await? else {
                match self.options.unresolved {
                    UnresolvedCollection::Skip => {
                        warn!(collection = name, "Collection not found, skipping");
                        stats.collections_skipped += 1;
                        continue;
                    }
                    UnresolvedCollection::Fail => {
                        return Err(CitegraphError::CollectionNotFound(name.to_string()));
                    }
                }
            };
            stats.collections_resolved += 1;
            debug!(collection = name, id = %collection_id, "Listing collection");

            let mut papers = self.library.list_papers(&collection_id);
            while let Some(item) = papers.next().await {
                let paper = match item {
                    Ok(paper) => paper,
                    Err(CitegraphError::MalformedItem(reason)) => {
                        warn!(collection = name, reason = %reason, "Skipping malformed item");
                        stats.malformed_items += 1;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                stats.papers_seen += 1;

                let Some(doi) = paper.doi else {
                    debug!(key = %paper.key, "Paper has no DOI");
                    stats.papers_without_doi += 1;
                    continue;
                };

                if !index.insert(doi, paper.title) {
                    stats.duplicate_dois += 1;
                }
            }
        }

        Ok(index)
    }

    async fn resolve_edges(&self, index: &DoiIndex, stats: &mut BuildStats) -> Vec<CitationEdge> {
        if index.is_empty() {
            return Vec::new();
        }

        // Owned DOIs keep the build future `Send` for any caller lifetime.
        // `buffered` yields in input order, whatever order lookups finish in.
        let dois: Vec<String> = index.dois().map(str::to_owned).collect();
        let lookups: Vec<_> = stream::iter(dois)
            .map(|doi| async move {
                let result = self.citations.get_references(&doi).await;
                (doi, result)
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut edges = Vec::new();
        for (citing, result) in lookups {
            stats.lookups += 1;

            let references = match result {
                Ok(references) => references,
                Err(e) => {
                    warn!(doi = %citing, error = %e, "Reference lookup failed, treating as no references");
                    stats.failed_lookups += 1;
                    continue;
                }
            };

            for cited in references.iter().filter_map(|r| normalize_doi(r)) {
                if !index.contains(&cited) {
                    stats.external_references += 1;
                    continue;
                }

                let edge = CitationEdge::new(citing.as_str(), cited);
                if self.options.skip_self_citations && edge.is_self_citation() {
                    stats.self_citations_skipped += 1;
                    continue;
                }
                edges.push(edge);
            }
        }

        edges
    }
}
