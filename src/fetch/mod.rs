// Page fetch backends.
// Every backend turns a URL into HTML or a FetchError; none of them panic.

pub mod chrome;
pub mod expander;
pub mod http;

use async_trait::async_trait;

pub use crate::error::FetchError;

/// What kind of page is being fetched. Listing pages get expanded before
/// their content is returned, on backends that can do so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Listing,
    Detail,
}

/// Trait that all page fetchers must implement.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Fetch `url` and return its HTML. Timeouts and navigation failures
    /// come back as `FetchError`.
    async fn fetch(&self, url: &str, kind: PageKind) -> Result<String, FetchError>;
}
