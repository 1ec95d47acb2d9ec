//! Recursive traversal of a document and its reachable iframes.
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dom::{DomError, DomHost};
use crate::form::{process_document, DocumentReport};

/// What one pass over a frame tree did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// One report per visited document, parents before their frames.
    pub documents: Vec<DocumentReport>,
    /// Iframes whose document could not be reached.
    pub frames_skipped: usize,
}

impl PassSummary {
    /// Number of documents whose questionnaire was submitted.
    pub fn submitted(&self) -> usize {
        self.documents.iter().filter(|d| d.submitted()).count()
    }
}

/// Start a new pass and walk the host's main document.
pub async fn process_all_frames<H>(host: &H) -> Result<PassSummary, DomError>
where
    H: DomHost + ?Sized,
{
    host.begin_pass();
    let document = host.document();
    walk_frames(host, &document).await
}

/// Process `document`, then every iframe document reachable from it.
///
/// An iframe whose document cannot be obtained is logged and skipped without
/// affecting its siblings. Errors from processing a document itself are not
/// contained and end the walk.
pub async fn walk_frames<H>(host: &H, document: &H::Root) -> Result<PassSummary, DomError>
where
    H: DomHost + ?Sized,
{
    let mut summary = PassSummary::default();
    walk_into(host, document, &mut summary).await?;
    Ok(summary)
}

fn walk_into<'a, H>(
    host: &'a H,
    document: &'a H::Root,
    summary: &'a mut PassSummary,
) -> BoxFuture<'a, Result<(), DomError>>
where
    H: DomHost + ?Sized,
{
    async move {
        summary.documents.push(process_document(host, document).await?);

        for frame in host.frames(document).await? {
            match host.frame_document(&frame).await {
                Ok(Some(nested)) => walk_into(host, &nested, summary).await?,
                Ok(None) => debug!(target: "skipper.frames", ?frame, "iframe has no document"),
                Err(error) => {
                    summary.frames_skipped += 1;
                    warn!(
                        target: "skipper.frames",
                        ?frame,
                        %error,
                        "cannot access iframe, skipping its subtree"
                    );
                }
            }
        }
        Ok(())
    }
    .boxed()
}
