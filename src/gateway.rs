//! Gateway traits the graph builder depends on.
//!
//! Production implementations talk HTTP ([`crate::zotero`], [`crate::crossref`]);
//! tests use in-memory maps.

use crate::error::Result;
use crate::paper::PaperRecord;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Opaque collection identifier (the Zotero collection key).
pub type CollectionId = String;

/// Lazily produced paper listing for one collection.
pub type PaperStream<'a> = BoxStream<'a, Result<PaperRecord>>;

/// Source of collections and the papers they contain.
#[async_trait]
pub trait LibraryGateway: Send + Sync {
    /// Resolve a collection name to its identifier.
    ///
    /// `Ok(None)` means the library has no collection with that name.
    async fn resolve_collection(&self, name: &str) -> Result<Option<CollectionId>>;

    /// Stream every paper in a collection.
    ///
    /// Items that cannot be normalized are yielded as
    /// [`CitegraphError::MalformedItem`](crate::error::CitegraphError::MalformedItem).
    fn list_papers<'a>(&'a self, collection: &'a CollectionId) -> PaperStream<'a>;
}

/// Source of outbound references for a DOI.
#[async_trait]
pub trait CitationGateway: Send + Sync {
    /// DOIs cited by `doi`. Not-found is an empty list.
    async fn get_references(&self, doi: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl<T: CitationGateway + ?Sized> CitationGateway for Arc<T> {
    async fn get_references(&self, doi: &str) -> Result<Vec<String>> {
        (**self).get_references(doi).await
    }
}
