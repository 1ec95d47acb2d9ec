use crate::skipper_browser::scripts::PageScripts;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use fantoccini::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use skipper_engine::{DomError, DomHost, PageSignals};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::trace;
use webdriver::command::{SwitchToFrameParameters, VoidWebDriverExtensionCommand, WebDriverCommand};
use webdriver::common::FrameId;

/// Route from the top-level browsing context to a nested one, as
/// `window.frames` indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FramePath(Vec<u16>);

impl FramePath {
    pub fn top() -> Self {
        Self::default()
    }

    pub fn child(&self, index: u16) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[u16] {
        &self.0
    }

    /// Frame switches that select this path from any starting context.
    pub fn steps(&self) -> Vec<FrameStep> {
        std::iter::once(FrameStep::Top)
            .chain(self.0.iter().copied().map(FrameStep::Enter))
            .collect()
    }
}

/// One WebDriver frame switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    /// Back to the top-level browsing context.
    Top,
    /// Into child `window.frames[index]` of the current context.
    Enter(u16),
}

impl fmt::Display for FramePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("top")?;
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

/// A document (`shadow_host == None`) or an open shadow root in some frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRoot {
    pub frame: FramePath,
    pub shadow_host: Option<u64>,
}

/// Registry handle of an element in some frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElement {
    pub frame: FramePath,
    pub handle: u64,
}

/// What the parent window knows about one of its iframes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameInfo {
    /// Position in the parent's `window.frames`; `None` for frames without a
    /// browsing context (detached or not yet loaded).
    pub index: Option<u16>,
    /// Whether the parent can read the frame's document (same origin).
    pub accessible: bool,
    pub src: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFrame {
    pub parent: FramePath,
    pub info: FrameInfo,
}

/// [`DomHost`] and [`PageSignals`] over a live WebDriver session.
///
/// WebDriver scopes scripts to the currently selected frame, so every call
/// first switches to the frame its handle belongs to. The mutex serialises
/// calls and remembers the selected frame; `None` means unknown (a switch
/// failed halfway).
pub struct WebDriverHost {
    client: Client,
    selected: Mutex<Option<FramePath>>,
    generation: AtomicU64,
}

impl WebDriverHost {
    /// Wrap a session. The session is assumed to be on the top-level context.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            selected: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Execute `script` in `frame`, switching to it first when needed.
    async fn execute_in(
        &self,
        frame: &FramePath,
        script: &str,
        args: Vec<Value>,
    ) -> anyhow::Result<Value> {
        let mut selected = self.selected.lock().await;
        if selected.as_ref() != Some(frame) {
            *selected = None;
            for step in frame.steps() {
                self.switch(step)
                    .await
                    .with_context(|| format!("failed to select frame {frame} ({step:?})"))?;
            }
            trace!(target: "skipper.driver", %frame, depth = frame.depth(), "switched frame");
            *selected = Some(frame.clone());
        }

        self.client
            .execute(script, args)
            .await
            .with_context(|| format!("page script failed in frame {frame}"))
    }

    async fn switch(&self, step: FrameStep) -> anyhow::Result<()> {
        match step {
            FrameStep::Top => {
                let to_top: WebDriverCommand<VoidWebDriverExtensionCommand> =
                    WebDriverCommand::SwitchToFrame(SwitchToFrameParameters { id: FrameId::Top });
                self.client.issue_cmd(to_top).await?;
            }
            FrameStep::Enter(index) => self.client.enter_frame(index).await?,
        }
        Ok(())
    }

    async fn handles(
        &self,
        frame: &FramePath,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Vec<u64>, DomError> {
        let value = self.execute_in(frame, script, args).await?;
        serde_json::from_value(value)
            .context("page script returned something other than element handles")
            .map_err(DomError::from)
    }
}

#[async_trait]
impl DomHost for WebDriverHost {
    type Root = PageRoot;
    type Element = PageElement;
    type Frame = PageFrame;

    fn document(&self) -> PageRoot {
        PageRoot {
            frame: FramePath::top(),
            shadow_host: None,
        }
    }

    fn begin_pass(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    async fn query_all(
        &self,
        root: &PageRoot,
        selector: &str,
    ) -> Result<Vec<PageElement>, DomError> {
        let handles = self
            .handles(
                &root.frame,
                PageScripts::query_all(),
                vec![json!(self.generation()), json!(root.shadow_host), json!(selector)],
            )
            .await?;
        Ok(handles
            .into_iter()
            .map(|handle| PageElement {
                frame: root.frame.clone(),
                handle,
            })
            .collect())
    }

    async fn shadow_roots(&self, root: &PageRoot) -> Result<Vec<PageRoot>, DomError> {
        let hosts = self
            .handles(
                &root.frame,
                PageScripts::shadow_hosts(),
                vec![json!(self.generation()), json!(root.shadow_host)],
            )
            .await?;
        Ok(hosts
            .into_iter()
            .map(|host| PageRoot {
                frame: root.frame.clone(),
                shadow_host: Some(host),
            })
            .collect())
    }

    async fn frames(&self, document: &PageRoot) -> Result<Vec<PageFrame>, DomError> {
        let value = self
            .execute_in(&document.frame, PageScripts::frames(), vec![])
            .await?;
        let infos: Vec<FrameInfo> =
            serde_json::from_value(value).context("unexpected iframe listing from page")?;
        Ok(infos
            .into_iter()
            .map(|info| PageFrame {
                parent: document.frame.clone(),
                info,
            })
            .collect())
    }

    async fn frame_document(&self, frame: &PageFrame) -> Result<Option<PageRoot>, DomError> {
        let describe = || {
            frame
                .info
                .src
                .clone()
                .unwrap_or_else(|| format!("iframe in {}", frame.parent))
        };
        if !frame.info.accessible {
            return Err(DomError::FrameInaccessible(describe()));
        }
        let Some(index) = frame.info.index else {
            return Ok(None);
        };
        let path = frame.parent.child(index);
        // Entering proves the frame is still there before the walk queries it.
        self.execute_in(&path, PageScripts::ready_state(), vec![])
            .await
            .map_err(|e| DomError::FrameInaccessible(format!("{}: {e:#}", describe())))?;
        Ok(Some(PageRoot {
            frame: path,
            shadow_host: None,
        }))
    }

    async fn attribute(
        &self,
        element: &PageElement,
        name: &str,
    ) -> Result<Option<String>, DomError> {
        let value = self
            .execute_in(
                &element.frame,
                PageScripts::attribute(),
                vec![json!(self.generation()), json!(element.handle), json!(name)],
            )
            .await?;
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(DomError::Driver(anyhow!("attribute `{name}` came back as {other}"))),
        }
    }

    async fn click(&self, element: &PageElement) -> Result<(), DomError> {
        self.execute_in(
            &element.frame,
            PageScripts::click(),
            vec![json!(self.generation()), json!(element.handle)],
        )
        .await?;
        Ok(())
    }

    async fn set_checked(&self, element: &PageElement, checked: bool) -> Result<(), DomError> {
        self.execute_in(
            &element.frame,
            PageScripts::set_checked(),
            vec![json!(self.generation()), json!(element.handle), json!(checked)],
        )
        .await?;
        Ok(())
    }

    async fn location(&self, document: &PageRoot) -> Result<Option<String>, DomError> {
        let value = self
            .execute_in(&document.frame, PageScripts::location(), vec![])
            .await?;
        Ok(value.as_str().map(str::to_string))
    }
}

#[async_trait]
impl PageSignals for WebDriverHost {
    async fn is_loaded(&self) -> Result<bool, DomError> {
        let state = self
            .execute_in(&FramePath::top(), PageScripts::ready_state(), vec![])
            .await?;
        Ok(state.as_str() == Some("complete"))
    }

    async fn observe_mutations(&self) -> Result<bool, DomError> {
        let active = self
            .execute_in(&FramePath::top(), PageScripts::observe_mutations(), vec![])
            .await?;
        Ok(active.as_bool().unwrap_or(false))
    }

    async fn take_mutation_batches(&self) -> Result<u64, DomError> {
        let batches = self
            .execute_in(&FramePath::top(), PageScripts::take_mutation_batches(), vec![])
            .await?;
        Ok(batches.as_u64().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_paths_extend_and_display() {
        let top = FramePath::top();
        let nested = top.child(2).child(0);
        assert_eq!(top.depth(), 0);
        assert_eq!(nested.indices(), &[2, 0]);
        assert_eq!(nested.to_string(), "top/2/0");
    }

    #[test]
    fn frame_selection_always_starts_from_the_top() {
        assert_eq!(FramePath::top().steps(), vec![FrameStep::Top]);
        assert_eq!(
            FramePath::top().child(2).child(0).steps(),
            vec![FrameStep::Top, FrameStep::Enter(2), FrameStep::Enter(0)]
        );
    }

    #[test]
    fn frame_listing_deserializes() {
        let infos: Vec<FrameInfo> = serde_json::from_value(json!([
            { "index": 0, "accessible": true, "src": "/Evaluation/List" },
            { "index": null, "accessible": false, "src": null }
        ]))
        .unwrap();
        assert_eq!(infos[0].index, Some(0));
        assert!(infos[0].accessible);
        assert_eq!(infos[1].index, None);
        assert_eq!(infos[1].src, None);
    }
}
