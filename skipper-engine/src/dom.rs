//! The host DOM seam.
//!
//! The engine never talks to a browser directly. Everything it needs from the
//! page goes through [`DomHost`] (queries and actions) and [`PageSignals`]
//! (readiness and mutation notifications). A live WebDriver tab and an offline
//! HTML snapshot both implement these traits.
use async_trait::async_trait;
use std::fmt;

/// Failures reported by a DOM host.
#[derive(thiserror::Error, Debug)]
pub enum DomError {
    /// The selector could not be parsed.
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    /// An iframe's document cannot be reached (cross-origin, not loaded, detached).
    #[error("frame document is not accessible: {0}")]
    FrameInaccessible(String),

    /// A handle no longer refers to a live element.
    #[error("stale element handle: {0}")]
    StaleElement(String),

    /// A handle names a document the host does not know.
    #[error("unknown document #{0}")]
    UnknownDocument(usize),

    /// Transport or script failure in the underlying driver.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

/// Read/act access to a page and its frames.
///
/// `Root` is either a document or a shadow root. Documents come from
/// [`DomHost::document`] and [`DomHost::frame_document`]; shadow roots come
/// from [`DomHost::shadow_roots`]. Handles are only valid within one pass.
#[async_trait]
pub trait DomHost: Send + Sync {
    type Root: Clone + fmt::Debug + Send + Sync + 'static;
    type Element: Clone + fmt::Debug + Send + Sync + 'static;
    type Frame: Clone + fmt::Debug + Send + Sync + 'static;

    /// The top-level document of the page.
    fn document(&self) -> Self::Root;

    /// Called once at the start of every pass. Hosts that keep per-pass
    /// handle tables reset them here.
    fn begin_pass(&self) {}

    /// Light-DOM matches of `selector` under `root`, in document order.
    async fn query_all(&self, root: &Self::Root, selector: &str)
        -> Result<Vec<Self::Element>, DomError>;

    /// Open shadow roots attached to light-DOM descendants of `root`, in
    /// document order of their hosts.
    async fn shadow_roots(&self, root: &Self::Root) -> Result<Vec<Self::Root>, DomError>;

    /// `iframe` elements in the light DOM of `document`.
    async fn frames(&self, document: &Self::Root) -> Result<Vec<Self::Frame>, DomError>;

    /// The document inside `frame`, `Ok(None)` when the frame has none.
    async fn frame_document(&self, frame: &Self::Frame) -> Result<Option<Self::Root>, DomError>;

    async fn attribute(&self, element: &Self::Element, name: &str)
        -> Result<Option<String>, DomError>;

    /// Dispatch a synthetic click.
    async fn click(&self, element: &Self::Element) -> Result<(), DomError>;

    async fn set_checked(&self, element: &Self::Element, checked: bool) -> Result<(), DomError>;

    /// The URL of `document`, when it has one.
    async fn location(&self, document: &Self::Root) -> Result<Option<String>, DomError>;
}

/// Readiness and mutation notifications for the top-level document.
#[async_trait]
pub trait PageSignals: Send + Sync {
    /// Whether the document reports `readyState == "complete"`.
    async fn is_loaded(&self) -> Result<bool, DomError>;

    /// Make sure a child-list/subtree mutation observer watches the document
    /// body. Returns `false` while there is no body to observe yet.
    async fn observe_mutations(&self) -> Result<bool, DomError>;

    /// Number of mutation batches delivered since the previous call.
    async fn take_mutation_batches(&self) -> Result<u64, DomError>;
}
