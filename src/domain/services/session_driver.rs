//! Session driver capability
//!
//! The extraction core only talks to a rendered document through these
//! traits; it never depends on a specific browser automation protocol.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::locator::Locator;
use crate::infrastructure::extraction_error::ExtractionResult;

/// One live rendering session bound to a single document
///
/// Methods take `&self` but callers drive a session sequentially: concurrent
/// queries against one live document are not coordinated.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Handle to a node found in the rendered document
    type Node: Send + Sync;

    /// Load `url` into the session
    async fn navigate(&self, url: &str) -> ExtractionResult<()>;

    /// Wait up to `timeout` for a node matching `locator`
    ///
    /// Fails with `NotFound` once the timeout elapses.
    async fn query_node(&self, locator: &Locator, timeout: Duration) -> ExtractionResult<Self::Node>;

    /// Scroll the node matching `locator` into view, triggering lazy loading
    async fn scroll_into_view(&self, locator: &Locator) -> ExtractionResult<()>;

    /// Rendered text of a node
    async fn read_text(&self, node: &Self::Node) -> ExtractionResult<String>;

    /// Value of a named attribute, `None` when absent
    async fn read_attribute(&self, node: &Self::Node, name: &str) -> ExtractionResult<Option<String>>;

    /// Click a node
    async fn click(&self, node: &Self::Node) -> ExtractionResult<()>;

    /// Tear down the session
    async fn close(&self) -> ExtractionResult<()>;
}

/// Factory for independent rendering sessions, one per source URL
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Driver: SessionDriver;

    async fn launch(&self) -> ExtractionResult<Self::Driver>;
}
