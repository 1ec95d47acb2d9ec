//! Offline DOM host over saved HTML.
//!
//! A [`SnapshotHost`] answers queries from parsed markup and records the
//! clicks and checkbox changes a pass would make instead of performing them.
//! Two markup conventions stand in for what a live page builds with script:
//!
//! - a `<template shadowrootmode="open">` child is the open shadow root of its
//!   parent element (closed ones are invisible, as in a browser);
//! - `<iframe srcdoc="...">` holds a same-origin nested document, an iframe
//!   with a non-blank `src` is treated as cross-origin and cannot be entered.
//!
//! Documents are re-parsed for every query, so handles stay plain indices and
//! the host is `Send + Sync`.
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::dom::{DomError, DomHost, PageSignals};

/// A document (`shadow_host == None`) or the shadow root of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotRoot {
    pub document: usize,
    pub shadow_host: Option<usize>,
}

/// Element handle: document index and pre-order position in that document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotElement {
    pub document: usize,
    pub ordinal: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotFrame {
    pub document: usize,
    pub ordinal: usize,
}

/// Side effect recorded instead of being performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Click { document: usize, element: String },
    SetChecked { document: usize, element: String, checked: bool },
}

impl Action {
    /// Short element label such as `input#rb40`.
    pub fn element(&self) -> &str {
        match self {
            Action::Click { element, .. } | Action::SetChecked { element, .. } => element,
        }
    }
}

#[derive(Debug)]
struct SnapshotDocument {
    location: Option<String>,
    html: String,
}

#[derive(Debug)]
enum FrameSource {
    Document(usize),
    Unreachable(String),
}

#[derive(Debug)]
struct SnapshotState {
    actions: Vec<Action>,
    checked: BTreeSet<SnapshotElement>,
    loaded: bool,
    pending_batches: u64,
}

pub struct SnapshotHost {
    documents: Vec<SnapshotDocument>,
    frames: HashMap<(usize, usize), FrameSource>,
    state: Mutex<SnapshotState>,
}

impl SnapshotHost {
    /// Parse `html` as the main document.
    pub fn parse(html: &str) -> Self {
        Self::with_location(html, None)
    }

    /// Parse `html` as the main document reported at `location`.
    pub fn with_location(html: &str, location: Option<String>) -> Self {
        let mut documents = vec![SnapshotDocument {
            location,
            html: html.to_string(),
        }];
        let mut frames = HashMap::new();

        let mut next = 0;
        while next < documents.len() {
            for (ordinal, srcdoc, src) in iframe_sources(&documents[next].html) {
                let source = match (srcdoc, src) {
                    (Some(markup), _) => {
                        documents.push(SnapshotDocument {
                            location: Some("about:srcdoc".into()),
                            html: markup,
                        });
                        FrameSource::Document(documents.len() - 1)
                    }
                    (None, Some(src)) if src != "about:blank" && !src.is_empty() => {
                        FrameSource::Unreachable(src)
                    }
                    (None, _) => {
                        documents.push(SnapshotDocument {
                            location: Some("about:blank".into()),
                            html: String::new(),
                        });
                        FrameSource::Document(documents.len() - 1)
                    }
                };
                frames.insert((next, ordinal), source);
            }
            next += 1;
        }

        Self {
            documents,
            frames,
            state: Mutex::new(SnapshotState {
                actions: Vec::new(),
                checked: BTreeSet::new(),
                loaded: true,
                pending_batches: 0,
            }),
        }
    }

    /// Read and parse a saved page; its location is the `file://` URL.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let html = std::fs::read_to_string(path)?;
        let location = std::fs::canonicalize(path)
            .map(|p| format!("file://{}", p.display()))
            .ok();
        Ok(Self::with_location(&html, location))
    }

    /// Number of documents, nested frame documents included.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Every recorded action, oldest first.
    pub fn actions(&self) -> Vec<Action> {
        self.state().actions.clone()
    }

    /// First element with the given `id` in any document or shadow tree.
    pub fn find_by_id(&self, id: &str) -> Option<SnapshotElement> {
        (0..self.documents.len()).find_map(|document| {
            self.with_index(document, |index| {
                Ok(index
                    .elements
                    .iter()
                    .position(|e| e.value().id() == Some(id))
                    .map(|ordinal| SnapshotElement { document, ordinal }))
            })
            .ok()
            .flatten()
        })
    }

    pub fn is_checked(&self, element: &SnapshotElement) -> bool {
        self.state().checked.contains(element)
    }

    /// Make [`PageSignals::is_loaded`] report `loaded`.
    pub fn set_loaded(&self, loaded: bool) {
        self.state().loaded = loaded;
    }

    /// Queue mutation batches for [`PageSignals::take_mutation_batches`].
    pub fn push_mutation_batches(&self, batches: u64) {
        self.state().pending_batches += batches;
    }

    fn state(&self) -> MutexGuard<'_, SnapshotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_index<R>(
        &self,
        document: usize,
        f: impl FnOnce(&Indexed<'_>) -> Result<R, DomError>,
    ) -> Result<R, DomError> {
        let source = self
            .documents
            .get(document)
            .ok_or(DomError::UnknownDocument(document))?;
        let html = Html::parse_document(&source.html);
        let index = Indexed::build(&html);
        f(&index)
    }

    fn label(&self, element: &SnapshotElement) -> Result<String, DomError> {
        self.with_index(element.document, |index| {
            Ok(element_label(index.element(element.ordinal)?))
        })
    }
}

/// Elements of one parsed document in pre-order, with child lists.
struct Indexed<'a> {
    elements: Vec<ElementRef<'a>>,
    children: Vec<Vec<usize>>,
}

impl<'a> Indexed<'a> {
    fn build(html: &'a Html) -> Self {
        let mut index = Self {
            elements: Vec::new(),
            children: Vec::new(),
        };
        index.push(html.root_element());
        index
    }

    fn push(&mut self, element: ElementRef<'a>) -> usize {
        let ordinal = self.elements.len();
        self.elements.push(element);
        self.children.push(Vec::new());
        // Template content lives in a fragment node below the template.
        let direct = element.children().filter_map(ElementRef::wrap);
        let content = element
            .children()
            .filter(|node| node.value().is_fragment())
            .flat_map(|fragment| fragment.children().filter_map(ElementRef::wrap));
        for child in direct.chain(content) {
            let child_ordinal = self.push(child);
            self.children[ordinal].push(child_ordinal);
        }
        ordinal
    }

    fn element(&self, ordinal: usize) -> Result<ElementRef<'a>, DomError> {
        self.elements
            .get(ordinal)
            .copied()
            .ok_or_else(|| DomError::StaleElement(format!("element #{ordinal}")))
    }

    fn shadow_template(&self, host: usize) -> Option<usize> {
        self.children
            .get(host)?
            .iter()
            .copied()
            .find(|&child| is_open_shadow_template(&self.elements[child]))
    }

    /// Top-level nodes of a root's light tree.
    fn scope(&self, shadow_host: Option<usize>) -> Result<Vec<usize>, DomError> {
        match shadow_host {
            None => Ok(vec![0]),
            Some(host) => {
                let template = self.shadow_template(host).ok_or_else(|| {
                    DomError::StaleElement(format!("shadow host #{host} has no open shadow root"))
                })?;
                Ok(self.children[template].clone())
            }
        }
    }

    /// Light-DOM elements reachable from `scope`, in pre-order. Shadow
    /// templates are skipped entirely; other templates are kept but their
    /// content is not part of the tree.
    fn light_tree(&self, scope: Vec<usize>) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = scope.into_iter().rev().collect();
        while let Some(ordinal) = stack.pop() {
            let element = self.elements[ordinal].value();
            if element.name() == "template" {
                if element.attr("shadowrootmode").is_none() {
                    out.push(ordinal);
                }
                continue;
            }
            out.push(ordinal);
            stack.extend(self.children[ordinal].iter().rev().copied());
        }
        out
    }
}

fn is_open_shadow_template(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    value.name() == "template"
        && value
            .attr("shadowrootmode")
            .is_some_and(|mode| mode.eq_ignore_ascii_case("open"))
}

fn element_label(element: ElementRef<'_>) -> String {
    let value = element.value();
    match value.id() {
        Some(id) => format!("{}#{}", value.name(), id),
        None => value.name().to_string(),
    }
}

/// `(ordinal, srcdoc, src)` for every iframe in `html`.
fn iframe_sources(html: &str) -> Vec<(usize, Option<String>, Option<String>)> {
    let parsed = Html::parse_document(html);
    let index = Indexed::build(&parsed);
    index
        .elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.value().name() == "iframe")
        .map(|(ordinal, e)| {
            (
                ordinal,
                e.value().attr("srcdoc").map(str::to_string),
                e.value().attr("src").map(|s| s.trim().to_string()),
            )
        })
        .collect()
}

#[async_trait]
impl DomHost for SnapshotHost {
    type Root = SnapshotRoot;
    type Element = SnapshotElement;
    type Frame = SnapshotFrame;

    fn document(&self) -> SnapshotRoot {
        SnapshotRoot {
            document: 0,
            shadow_host: None,
        }
    }

    async fn query_all(
        &self,
        root: &SnapshotRoot,
        selector: &str,
    ) -> Result<Vec<SnapshotElement>, DomError> {
        let parsed =
            Selector::parse(selector).map_err(|_| DomError::InvalidSelector(selector.into()))?;
        self.with_index(root.document, |index| {
            let scope = index.scope(root.shadow_host)?;
            Ok(index
                .light_tree(scope)
                .into_iter()
                .filter(|&ordinal| parsed.matches(&index.elements[ordinal]))
                .map(|ordinal| SnapshotElement {
                    document: root.document,
                    ordinal,
                })
                .collect())
        })
    }

    async fn shadow_roots(&self, root: &SnapshotRoot) -> Result<Vec<SnapshotRoot>, DomError> {
        self.with_index(root.document, |index| {
            let scope = index.scope(root.shadow_host)?;
            Ok(index
                .light_tree(scope)
                .into_iter()
                .filter(|&ordinal| index.shadow_template(ordinal).is_some())
                .map(|ordinal| SnapshotRoot {
                    document: root.document,
                    shadow_host: Some(ordinal),
                })
                .collect())
        })
    }

    async fn frames(&self, document: &SnapshotRoot) -> Result<Vec<SnapshotFrame>, DomError> {
        self.with_index(document.document, |index| {
            let scope = index.scope(document.shadow_host)?;
            Ok(index
                .light_tree(scope)
                .into_iter()
                .filter(|&ordinal| index.elements[ordinal].value().name() == "iframe")
                .map(|ordinal| SnapshotFrame {
                    document: document.document,
                    ordinal,
                })
                .collect())
        })
    }

    async fn frame_document(
        &self,
        frame: &SnapshotFrame,
    ) -> Result<Option<SnapshotRoot>, DomError> {
        match self.frames.get(&(frame.document, frame.ordinal)) {
            Some(FrameSource::Document(document)) => Ok(Some(SnapshotRoot {
                document: *document,
                shadow_host: None,
            })),
            Some(FrameSource::Unreachable(src)) => Err(DomError::FrameInaccessible(src.clone())),
            None => Ok(None),
        }
    }

    async fn attribute(
        &self,
        element: &SnapshotElement,
        name: &str,
    ) -> Result<Option<String>, DomError> {
        self.with_index(element.document, |index| {
            Ok(index
                .element(element.ordinal)?
                .value()
                .attr(name)
                .map(str::to_string))
        })
    }

    async fn click(&self, element: &SnapshotElement) -> Result<(), DomError> {
        let label = self.label(element)?;
        self.state().actions.push(Action::Click {
            document: element.document,
            element: label,
        });
        Ok(())
    }

    async fn set_checked(&self, element: &SnapshotElement, checked: bool) -> Result<(), DomError> {
        let label = self.label(element)?;
        let mut state = self.state();
        if checked {
            state.checked.insert(*element);
        } else {
            state.checked.remove(element);
        }
        state.actions.push(Action::SetChecked {
            document: element.document,
            element: label,
            checked,
        });
        Ok(())
    }

    async fn location(&self, document: &SnapshotRoot) -> Result<Option<String>, DomError> {
        self.documents
            .get(document.document)
            .map(|d| d.location.clone())
            .ok_or(DomError::UnknownDocument(document.document))
    }
}

#[async_trait]
impl PageSignals for SnapshotHost {
    async fn is_loaded(&self) -> Result<bool, DomError> {
        Ok(self.state().loaded)
    }

    async fn observe_mutations(&self) -> Result<bool, DomError> {
        Ok(true)
    }

    async fn take_mutation_batches(&self) -> Result<u64, DomError> {
        Ok(std::mem::take(&mut self.state().pending_batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srcdoc_and_blank_frames_become_documents() {
        let host = SnapshotHost::parse(
            r#"<body>
                <iframe srcdoc="<p id='inner'>hi</p>"></iframe>
                <iframe></iframe>
                <iframe src="https://other.example/"></iframe>
            </body>"#,
        );
        assert_eq!(host.document_count(), 3);
        assert_eq!(host.find_by_id("inner").map(|e| e.document), Some(1));
    }

    #[test]
    fn template_content_is_not_light_dom() {
        let html = Html::parse_document(
            r#"<div id="a"><template><span id="hidden"></span></template><span id="shown"></span></div>"#,
        );
        let index = Indexed::build(&html);
        let ids: Vec<_> = index
            .light_tree(vec![0])
            .into_iter()
            .filter_map(|o| index.elements[o].value().id())
            .collect();
        assert_eq!(ids, vec!["a", "shown"]);
        assert!(
            index.elements.iter().any(|e| e.value().id() == Some("hidden")),
            "template content is indexed but not light DOM"
        );
    }

    #[test]
    fn open_shadow_content_is_indexed_under_its_template() {
        let html = Html::parse_document(
            r#"<div id="host"><template shadowrootmode="open"><b id="s1"></b><i id="s2"></i></template></div>"#,
        );
        let index = Indexed::build(&html);
        let host = index
            .elements
            .iter()
            .position(|e| e.value().id() == Some("host"))
            .unwrap();
        let scope = index.scope(Some(host)).unwrap();
        let ids: Vec<_> = index
            .light_tree(scope)
            .into_iter()
            .filter_map(|o| index.elements[o].value().id())
            .collect();
        assert_eq!(ids, vec!["s1", "s2"]);

        let light: Vec<_> = index
            .light_tree(vec![0])
            .into_iter()
            .filter_map(|o| index.elements[o].value().id())
            .collect();
        assert_eq!(light, vec!["host"], "shadow content stays out of the light tree");
    }

    #[test]
    fn shadow_content_is_reachable_by_id() {
        let host = SnapshotHost::parse(
            r#"<div><template shadowrootmode="open"><input id="s1"></template></div>"#,
        );
        assert!(host.find_by_id("s1").is_some());
    }

    #[test]
    fn closed_shadow_roots_are_not_exposed() {
        let html = Html::parse_document(
            r#"<div id="host"><template shadowrootmode="closed"><b id="x"></b></template></div>"#,
        );
        let index = Indexed::build(&html);
        let host = index
            .elements
            .iter()
            .position(|e| e.value().id() == Some("host"))
            .unwrap();
        assert!(index.shadow_template(host).is_none());
        assert!(index.elements.iter().any(|e| e.value().id() == Some("x")));
        let light: Vec<_> = index
            .light_tree(vec![0])
            .into_iter()
            .filter_map(|o| index.elements[o].value().id())
            .collect();
        assert_eq!(light, vec!["host"]);
    }
}
