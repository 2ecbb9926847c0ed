//! # contract: interfaces to the external collaborators
//!
//! This module defines the trait seams between the pipeline and the two
//! remote services it talks to: the content source (Notion) and the upload
//! destination (a cloud document service).
//!
//! ## Interface & Extensibility
//! - Implement [`ContentSource`] to plug in a different content backend.
//! - Implement [`DocumentUploader`] to publish the finished document
//!   somewhere else.
//! - All methods are async, returning results and using boxed error types.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests.

use std::path::Path;

use async_trait::async_trait;
use mockall::automock;

use crate::filter::FilterExpression;
use crate::notion::{Block, DatabaseSchema, Page};

/// Error type for content-source operations (simple boxed error).
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for upload operations.
pub type UploadError = Box<dyn std::error::Error + Send + Sync>;

/// Returned after a successful upload: the remote identifier and a link a
/// human can open.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub document_id: String,
    pub view_link: String,
}

/// The ability to retrieve content from the workspace service.
///
/// The implementor owns transport, auth headers and response decoding; the
/// pipeline only sees decoded records. Listing calls return results in the
/// order the service reports them, with all result pages concatenated.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the database's property schema (name -> property type).
    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseSchema, SourceError>;

    /// Query the database for pages, optionally narrowed by a filter.
    async fn query_database(
        &self,
        database_id: &str,
        filter: Option<FilterExpression>,
    ) -> Result<Vec<Page>, SourceError>;

    /// List the direct children of a block or page, in document order.
    async fn list_block_children(&self, block_id: &str) -> Result<Vec<Block>, SourceError>;

    /// Download raw image bytes from a (possibly pre-signed) URL.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// The ability to publish a finished document file to a remote service.
///
/// The implementor is responsible for authentication (including token
/// caching/refreshing) and transport. A failed upload must leave the local
/// file untouched.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentUploader: Send + Sync {
    /// Upload the file at `file_path` under the given remote name.
    async fn upload_document(
        &self,
        file_path: &Path,
        name: &str,
    ) -> Result<UploadedDocument, UploadError>;
}
