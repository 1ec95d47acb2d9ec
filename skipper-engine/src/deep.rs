//! Selector queries that descend into shadow trees.
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::dom::{DomError, DomHost};

/// All elements under `root` matching `selector`, including those inside
/// every (nested) open shadow root.
///
/// Light-DOM matches of `root` come first, in document order. Matches from
/// shadow trees follow, grouped per host in document order of the hosts; each
/// group is itself ordered the same way recursively.
pub fn query_all_deep<'a, H>(
    host: &'a H,
    selector: &'a str,
    root: &'a H::Root,
) -> BoxFuture<'a, Result<Vec<H::Element>, DomError>>
where
    H: DomHost + ?Sized,
{
    async move {
        let mut results = host.query_all(root, selector).await?;
        for shadow in host.shadow_roots(root).await? {
            results.extend(query_all_deep(host, selector, &shadow).await?);
        }
        Ok(results)
    }
    .boxed()
}

/// [`query_all_deep`] rooted at the host's main document.
pub async fn query_document_deep<H>(host: &H, selector: &str) -> Result<Vec<H::Element>, DomError>
where
    H: DomHost + ?Sized,
{
    let document = host.document();
    query_all_deep(host, selector, &document).await
}
