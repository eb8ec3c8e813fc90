//! In-memory rendering session
//!
//! A scripted document used by tests and benchmarks. Nodes are registered
//! either under a fixed expression or as a positional family; families honor
//! a lazy-loading window that grows when visible nodes are scrolled into view.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::{Locator, LocatorTemplate, SessionDriver, SessionLauncher};
use crate::infrastructure::extraction_error::{ExtractionError, ExtractionResult};

/// A scripted DOM node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryNode {
    pub text: Option<String>,
    pub attributes: HashMap<String, String>,
}

impl MemoryNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            attributes: HashMap::new(),
        }
    }

    /// Node without text carrying a single attribute
    pub fn with_attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut node = Self::default();
        node.attributes.insert(name.into(), value.into());
        node
    }
}

type NodeFactory = Box<dyn Fn(u32) -> Option<MemoryNode> + Send + Sync>;

struct NodeFamily {
    template: LocatorTemplate,
    factory: NodeFactory,
    /// Families outside the window ignore lazy loading
    lazy: bool,
}

/// Counters for the calls a session received
#[derive(Debug, Default)]
pub struct CallCounters {
    pub navigations: AtomicUsize,
    pub queries: AtomicUsize,
    pub scrolls: AtomicUsize,
    pub clicks: AtomicUsize,
}

impl CallCounters {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    /// Total driver calls of any kind
    pub fn total(&self) -> usize {
        self.navigations() + self.queries() + self.scrolls() + self.clicks()
    }
}

#[derive(Default)]
struct DocumentState {
    fixed: HashMap<String, MemoryNode>,
    families: Vec<NodeFamily>,
    /// Highest lazily-loaded position currently rendered
    visible_limit: Option<u32>,
    /// Positions appended per scroll near the window edge
    batch: u32,
    /// Fail every call after this many queries
    fault_after_queries: Option<usize>,
    fail_navigation: bool,
    closed: bool,
    clicked: Vec<String>,
}

/// Scripted [`SessionDriver`] for tests
#[derive(Clone, Default)]
pub struct InMemorySession {
    state: Arc<Mutex<DocumentState>>,
    counters: Arc<CallCounters>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a single node under an exact expression
    pub fn with_node(self, expression: impl Into<String>, node: MemoryNode) -> Self {
        self.state().fixed.insert(expression.into(), node);
        self
    }

    /// Register a positional family that is always fully rendered
    pub fn with_family<F>(self, template: LocatorTemplate, factory: F) -> Self
    where
        F: Fn(u32) -> Option<MemoryNode> + Send + Sync + 'static,
    {
        self.push_family(template, factory, false)
    }

    /// Register a positional family subject to the lazy-loading window
    pub fn with_lazy_family<F>(self, template: LocatorTemplate, factory: F) -> Self
    where
        F: Fn(u32) -> Option<MemoryNode> + Send + Sync + 'static,
    {
        self.push_family(template, factory, true)
    }

    fn push_family<F>(self, template: LocatorTemplate, factory: F, lazy: bool) -> Self
    where
        F: Fn(u32) -> Option<MemoryNode> + Send + Sync + 'static,
    {
        self.state().families.push(NodeFamily {
            template,
            factory: Box::new(factory),
            lazy,
        });
        self
    }

    /// Render only `initial` lazy positions, appending `batch` more whenever a
    /// rendered position is scrolled into view
    pub fn with_lazy_window(self, initial: u32, batch: u32) -> Self {
        {
            let mut state = self.state();
            state.visible_limit = Some(initial);
            state.batch = batch;
        }
        self
    }

    /// Fail every call with a session fault once `queries` queries were served
    pub fn with_fault_after(self, queries: usize) -> Self {
        self.state().fault_after_queries = Some(queries);
        self
    }

    /// Fail navigation with a session fault
    pub fn with_failing_navigation(self) -> Self {
        self.state().fail_navigation = true;
        self
    }

    pub fn counters(&self) -> &CallCounters {
        &self.counters
    }

    /// Expressions of the nodes clicked so far
    pub fn clicked(&self) -> Vec<String> {
        self.state().clicked.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    pub fn visible_limit(&self) -> Option<u32> {
        self.state().visible_limit
    }

    fn check_alive(&self, state: &DocumentState) -> ExtractionResult<()> {
        if state.closed {
            return Err(ExtractionError::session_fault("session already closed"));
        }
        if state
            .fault_after_queries
            .is_some_and(|limit| self.counters.queries() > limit)
        {
            return Err(ExtractionError::session_fault("browser disconnected"));
        }
        Ok(())
    }

    fn lookup(state: &DocumentState, locator: &Locator) -> Option<MemoryNode> {
        if let Some(node) = state.fixed.get(&locator.expression) {
            return Some(node.clone());
        }

        let position = locator.position?;
        state.families.iter().find_map(|family| {
            if family.template.at(position).expression != locator.expression {
                return None;
            }
            let hidden = family.lazy && state.visible_limit.is_some_and(|limit| position > limit);
            if hidden {
                return None;
            }
            (family.factory)(position)
        })
    }
}

/// Handle returned by [`InMemorySession::query_node`]
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    pub expression: String,
    pub node: MemoryNode,
}

#[async_trait]
impl SessionDriver for InMemorySession {
    type Node = MemoryHandle;

    async fn navigate(&self, _url: &str) -> ExtractionResult<()> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        self.check_alive(&state)?;
        if state.fail_navigation {
            return Err(ExtractionError::session_fault("navigation failed: net::ERR_NAME_NOT_RESOLVED"));
        }
        Ok(())
    }

    async fn query_node(&self, locator: &Locator, timeout: Duration) -> ExtractionResult<Self::Node> {
        self.counters.queries.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        self.check_alive(&state)?;
        Self::lookup(&state, locator)
            .map(|node| MemoryHandle {
                expression: locator.expression.clone(),
                node,
            })
            .ok_or_else(|| ExtractionError::not_found_after(locator, timeout))
    }

    async fn scroll_into_view(&self, locator: &Locator) -> ExtractionResult<()> {
        self.counters.scrolls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        self.check_alive(&state)?;
        if Self::lookup(&state, locator).is_none() {
            return Err(ExtractionError::not_found(locator, 0));
        }
        if let (Some(limit), Some(position)) = (state.visible_limit, locator.position) {
            state.visible_limit = Some(limit.max(position + state.batch));
        }
        Ok(())
    }

    async fn read_text(&self, node: &Self::Node) -> ExtractionResult<String> {
        self.check_alive(&self.state())?;
        Ok(node.node.text.clone().unwrap_or_default())
    }

    async fn read_attribute(&self, node: &Self::Node, name: &str) -> ExtractionResult<Option<String>> {
        self.check_alive(&self.state())?;
        Ok(node.node.attributes.get(name).cloned())
    }

    async fn click(&self, node: &Self::Node) -> ExtractionResult<()> {
        self.counters.clicks.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        self.check_alive(&state)?;
        state.clicked.push(node.expression.clone());
        Ok(())
    }

    async fn close(&self) -> ExtractionResult<()> {
        self.state().closed = true;
        Ok(())
    }
}

/// Launcher handing out pre-scripted sessions in order
///
/// Once the script runs out every launch fails with a session fault.
#[derive(Clone, Default)]
pub struct InMemoryLauncher {
    sessions: Arc<Mutex<Vec<InMemorySession>>>,
    launched: Arc<AtomicUsize>,
}

impl InMemoryLauncher {
    pub fn new(sessions: Vec<InMemorySession>) -> Self {
        let mut sessions = sessions;
        sessions.reverse();
        Self {
            sessions: Arc::new(Mutex::new(sessions)),
            launched: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for InMemoryLauncher {
    type Driver = InMemorySession;

    async fn launch(&self) -> ExtractionResult<Self::Driver> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .ok_or_else(|| ExtractionError::session_fault("no browser available"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards() -> LocatorTemplate {
        LocatorTemplate::xpath("//div[@class='card'][{index}]")
    }

    #[tokio::test]
    async fn test_fixed_and_family_lookup() {
        let session = InMemorySession::new()
            .with_node("//h1", MemoryNode::text("Snapchat"))
            .with_family(cards(), |p| (p <= 3).then(|| MemoryNode::text(format!("card {p}"))));

        let title = session.query_node(&Locator::xpath("//h1"), Duration::from_millis(5)).await.unwrap();
        assert_eq!(session.read_text(&title).await.unwrap(), "Snapchat");

        let card = session.query_node(&cards().at(2), Duration::from_millis(5)).await.unwrap();
        assert_eq!(session.read_text(&card).await.unwrap(), "card 2");

        let missing = session.query_node(&cards().at(4), Duration::from_millis(5)).await;
        assert!(matches!(missing, Err(ExtractionError::NotFound { timeout_ms: 5, .. })));
        assert_eq!(session.counters().queries(), 3);
    }

    #[tokio::test]
    async fn test_scrolling_extends_lazy_window() {
        let session = InMemorySession::new()
            .with_lazy_family(cards(), |_| Some(MemoryNode::text("review")))
            .with_lazy_window(5, 5);

        assert!(session.query_node(&cards().at(7), Duration::ZERO).await.is_err());
        session.scroll_into_view(&cards().at(5)).await.unwrap();
        assert_eq!(session.visible_limit(), Some(10));
        assert!(session.query_node(&cards().at(7), Duration::ZERO).await.is_ok());

        // Hidden positions cannot be scrolled to
        assert!(session.scroll_into_view(&cards().at(12)).await.is_err());
    }

    #[tokio::test]
    async fn test_fault_injection_and_close() {
        let session = InMemorySession::new()
            .with_family(cards(), |_| Some(MemoryNode::default()))
            .with_fault_after(1);

        assert!(session.query_node(&cards().at(1), Duration::ZERO).await.is_ok());
        let err = session.query_node(&cards().at(2), Duration::ZERO).await.unwrap_err();
        assert_eq!(err.kind(), "session_fault");

        let fresh = InMemorySession::new();
        fresh.close().await.unwrap();
        assert!(fresh.is_closed());
        assert!(fresh.navigate("https://example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_launcher_hands_out_sessions_in_order() {
        let first = InMemorySession::new().with_node("//h1", MemoryNode::text("first"));
        let second = InMemorySession::new().with_node("//h1", MemoryNode::text("second"));
        let launcher = InMemoryLauncher::new(vec![first, second]);

        let a = launcher.launch().await.unwrap();
        let b = launcher.launch().await.unwrap();
        let node = a.query_node(&Locator::xpath("//h1"), Duration::ZERO).await.unwrap();
        assert_eq!(a.read_text(&node).await.unwrap(), "first");
        let node = b.query_node(&Locator::xpath("//h1"), Duration::ZERO).await.unwrap();
        assert_eq!(b.read_text(&node).await.unwrap(), "second");

        assert!(launcher.launch().await.is_err());
        assert_eq!(launcher.launched(), 3);
    }
}
