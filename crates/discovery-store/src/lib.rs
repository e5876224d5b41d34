//! discovery-store
//!
//! Signed, paginated, retried transport to the two external stores a crawl
//! writes to: the graph API and the full-text search index. Also owns the
//! dual-store write coordination between them.

pub mod dual_write;
pub mod error;
pub mod graph_client;
pub mod paginator;
pub mod search_client;

pub use error::StoreError;
pub use graph_client::GraphStoreClient;
pub use search_client::SearchIndexClient;
