//! Per-document form handling: open the next pending evaluation, answer every
//! question with the row-4 option and submit.
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::deep::query_all_deep;
use crate::dom::{DomError, DomHost};
use crate::grid::{parse_radio_id, Coordinate, RadioGrid};

/// "Perform evaluation" buttons on the course list page.
pub const DETAIL_BUTTON_SELECTOR: &str =
    r#"input[type="button"].detail[title="انجام ارزشیابی"]"#;
/// Inline handler a detail button must carry, compared verbatim.
pub const DETAIL_BUTTON_HANDLER: &str = "OnDetailClick(this);";
/// The "submit" button on the questionnaire page.
pub const CONTINUE_BUTTON_SELECTOR: &str = r#"input[type="button"]#btnContinue.button[name="btnContinue"][value="ثبت"][onclick="onNewClick()"]"#;
/// Candidate answer inputs; ids are further narrowed to `rb<digit><digit>`.
pub const RADIO_SELECTOR: &str = r#"input[type="radio"][id^="rb"]"#;
/// Grid row whose input gets checked in every column.
pub const SELECTION_ROW: usize = 4;

/// What happened to the radio grid of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RadioOutcome {
    /// No radio input had an `rbXY` id.
    NotFound,
    /// Every column had a row-4 input and all of them were checked.
    Selected {
        rows: usize,
        columns: usize,
        checked: usize,
    },
    /// Row 4 was missing or sparse; columns before `missing_column` were
    /// checked and nothing after it.
    Incomplete {
        rows: usize,
        columns: usize,
        checked: usize,
        missing_column: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The selection did not complete, so no submit was attempted.
    NotAttempted,
    Clicked,
    /// Selection completed but the page has no continue button.
    ButtonMissing,
}

/// Result of one [`process_document`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub location: Option<String>,
    pub detail_buttons: usize,
    pub detail_clicked: bool,
    pub continue_buttons: usize,
    pub radio_inputs: usize,
    pub radios: RadioOutcome,
    pub submit: SubmitOutcome,
}

impl DocumentReport {
    /// Whether the questionnaire on this document was answered and submitted.
    pub fn submitted(&self) -> bool {
        self.submit == SubmitOutcome::Clicked
    }
}

/// Run the click/select/submit sequence on a single document.
///
/// The steps run in a fixed order: click the first matching detail button,
/// look up the continue button, build the radio grid, check row 4 in every
/// column, then click the continue button. A document without `rbXY` radios
/// stops after the detail button.
pub async fn process_document<H>(host: &H, document: &H::Root) -> Result<DocumentReport, DomError>
where
    H: DomHost + ?Sized,
{
    let location = host.location(document).await?;
    let label = location.as_deref().unwrap_or("main document");
    debug!(target: "skipper.form", location = label, "processing document");

    let mut detail_buttons = Vec::new();
    for button in query_all_deep(host, DETAIL_BUTTON_SELECTOR, document).await? {
        let handler = host.attribute(&button, "onclick").await?;
        if handler.as_deref() == Some(DETAIL_BUTTON_HANDLER) {
            detail_buttons.push(button);
        }
    }
    info!(target: "skipper.form", count = detail_buttons.len(), "detail buttons found");

    let detail_clicked = match detail_buttons.first() {
        Some(button) => {
            host.click(button).await?;
            info!(target: "skipper.form", location = label, "clicked detail button");
            true
        }
        None => false,
    };

    let continue_buttons = query_all_deep(host, CONTINUE_BUTTON_SELECTOR, document).await?;
    if continue_buttons.is_empty() {
        info!(target: "skipper.form", "continue button not found");
    } else {
        info!(target: "skipper.form", count = continue_buttons.len(), "continue button found");
    }

    let radios = query_all_deep(host, RADIO_SELECTOR, document).await?;
    let radio_inputs = radios.len();
    info!(target: "skipper.form", count = radio_inputs, "radio inputs found");

    let mut coordinates = Vec::with_capacity(radios.len());
    for radio in radios {
        let id = host.attribute(&radio, "id").await?;
        if let Some((x, y)) = id.as_deref().and_then(parse_radio_id) {
            coordinates.push(Coordinate {
                x,
                y,
                element: radio,
            });
        }
    }

    let mut report = DocumentReport {
        location,
        detail_buttons: detail_buttons.len(),
        detail_clicked,
        continue_buttons: continue_buttons.len(),
        radio_inputs,
        radios: RadioOutcome::NotFound,
        submit: SubmitOutcome::NotAttempted,
    };

    let Some(grid) = RadioGrid::build(coordinates) else {
        info!(target: "skipper.form", "no radio buttons with an rbXY id");
        return Ok(report);
    };

    report.radios = select_row(host, &grid, SELECTION_ROW).await?;
    if !matches!(report.radios, RadioOutcome::Selected { .. }) {
        return Ok(report);
    }
    info!(
        target: "skipper.form",
        rows = grid.rows(),
        columns = grid.columns(),
        "answered radio grid"
    );

    report.submit = match continue_buttons.first() {
        Some(button) => {
            host.click(button).await?;
            info!(
                target: "skipper.form",
                location = report.location.as_deref().unwrap_or("main document"),
                "clicked continue button"
            );
            SubmitOutcome::Clicked
        }
        None => {
            warn!(target: "skipper.form", "radio grid answered but no continue button to submit");
            SubmitOutcome::ButtonMissing
        }
    };

    Ok(report)
}

/// Check `grid[row][i]` for every column `i`, stopping at the first gap.
async fn select_row<H>(
    host: &H,
    grid: &RadioGrid<H::Element>,
    row: usize,
) -> Result<RadioOutcome, DomError>
where
    H: DomHost + ?Sized,
{
    let (rows, columns) = (grid.rows(), grid.columns());
    for column in 0..columns {
        let Some(radio) = grid.get(row, column) else {
            warn!(
                target: "skipper.form",
                row,
                column,
                rows,
                columns,
                "radio grid has no input at the selection row"
            );
            return Ok(RadioOutcome::Incomplete {
                rows,
                columns,
                checked: column,
                missing_column: column,
            });
        };
        host.set_checked(radio, true).await?;
    }
    Ok(RadioOutcome::Selected {
        rows,
        columns,
        checked: columns,
    })
}
