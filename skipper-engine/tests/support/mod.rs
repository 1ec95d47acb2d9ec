use async_trait::async_trait;
use skipper_engine::snapshot::{SnapshotElement, SnapshotFrame, SnapshotHost, SnapshotRoot};
use skipper_engine::{DomError, DomHost};

/// Snapshot host whose clicks fail inside one document.
pub struct DetachedClicks {
    pub inner: SnapshotHost,
    pub document: usize,
}

impl DetachedClicks {
    pub fn new(html: &str, document: usize) -> Self {
        Self {
            inner: SnapshotHost::parse(html),
            document,
        }
    }
}

#[async_trait]
impl DomHost for DetachedClicks {
    type Root = SnapshotRoot;
    type Element = SnapshotElement;
    type Frame = SnapshotFrame;

    fn document(&self) -> SnapshotRoot {
        self.inner.document()
    }

    fn begin_pass(&self) {
        self.inner.begin_pass();
    }

    async fn query_all(
        &self,
        root: &SnapshotRoot,
        selector: &str,
    ) -> Result<Vec<SnapshotElement>, DomError> {
        self.inner.query_all(root, selector).await
    }

    async fn shadow_roots(&self, root: &SnapshotRoot) -> Result<Vec<SnapshotRoot>, DomError> {
        self.inner.shadow_roots(root).await
    }

    async fn frames(&self, document: &SnapshotRoot) -> Result<Vec<SnapshotFrame>, DomError> {
        self.inner.frames(document).await
    }

    async fn frame_document(
        &self,
        frame: &SnapshotFrame,
    ) -> Result<Option<SnapshotRoot>, DomError> {
        self.inner.frame_document(frame).await
    }

    async fn attribute(
        &self,
        element: &SnapshotElement,
        name: &str,
    ) -> Result<Option<String>, DomError> {
        self.inner.attribute(element, name).await
    }

    async fn click(&self, element: &SnapshotElement) -> Result<(), DomError> {
        if element.document == self.document {
            return Err(DomError::StaleElement(format!(
                "element #{} was detached",
                element.ordinal
            )));
        }
        self.inner.click(element).await
    }

    async fn set_checked(&self, element: &SnapshotElement, checked: bool) -> Result<(), DomError> {
        self.inner.set_checked(element, checked).await
    }

    async fn location(&self, document: &SnapshotRoot) -> Result<Option<String>, DomError> {
        self.inner.location(document).await
    }
}
