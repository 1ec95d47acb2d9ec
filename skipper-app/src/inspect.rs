//! Offline single pass over a saved page.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use skipper_engine::PassSummary;
use skipper_engine::snapshot::{Action, SnapshotHost};
use skipper_engine::walker::process_all_frames;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub file: PathBuf,
    pub summary: PassSummary,
    pub actions: Vec<Action>,
}

pub async fn inspect(path: &Path) -> Result<InspectReport> {
    let host = SnapshotHost::from_file(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let summary = process_all_frames(&host)
        .await
        .with_context(|| format!("pass over {} failed", path.display()))?;
    let actions = host.actions();
    info!(
        documents = summary.documents.len(),
        frames_skipped = summary.frames_skipped,
        submitted = summary.submitted(),
        actions = actions.len(),
        "inspection complete"
    );

    Ok(InspectReport {
        file: path.to_path_buf(),
        summary,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PAGE: &str = r#"<!DOCTYPE html><html><body>
        <input type="button" id="detail-1" class="detail" title="انجام ارزشیابی" onclick="OnDetailClick(this);">
        <input type="radio" id="rb40"><input type="radio" id="rb41">
        <input type="button" id="btnContinue" class="button" name="btnContinue" value="ثبت" onclick="onNewClick()">
    </body></html>"#;

    #[tokio::test]
    async fn report_lists_actions_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PAGE.as_bytes()).unwrap();

        let report = inspect(file.path()).await.unwrap();

        assert_eq!(report.summary.documents.len(), 1);
        assert_eq!(report.summary.submitted(), 1);
        let labels: Vec<_> = report.actions.iter().map(Action::element).collect();
        assert_eq!(labels, vec!["input#detail-1", "input#rb40", "input#rb41", "input#btnContinue"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["actions"][0]["action"], "click");
        assert!(json["summary"]["documents"][0]["location"]
            .as_str()
            .unwrap()
            .starts_with("file://"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(inspect(&dir.path().join("absent.html")).await.is_err());
    }
}
