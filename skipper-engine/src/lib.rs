//! Evaluation-form completion engine.
//!
//! The engine walks a page and all of its reachable frames, searching through
//! shadow trees, and on every document it opens the next pending evaluation,
//! answers the questionnaire and submits it. A [`scheduler::Scheduler`] repeats
//! this on a timer once the page is ready and whenever the DOM changes.
//!
//! - [`dom::DomHost`] / [`dom::PageSignals`]: what the engine needs from a page
//! - [`deep::query_all_deep`]: selector search across shadow roots
//! - [`walker::process_all_frames`]: one pass over the frame tree
//! - [`form::process_document`]: the per-document click/select/submit sequence
//! - [`grid::RadioGrid`]: radio inputs laid out by their `rbXY` ids
//! - [`snapshot::SnapshotHost`]: offline host over saved HTML
//!
//! # Examples
//!
//! ```rust
//! use skipper_engine::snapshot::SnapshotHost;
//! use skipper_engine::walker::process_all_frames;
//!
//! # tokio_test_block_on(async {
//! let host = SnapshotHost::parse(r#"<input type="radio" id="rb40"><input type="radio" id="rb41">"#);
//! let summary = process_all_frames(&host).await.unwrap();
//! assert_eq!(summary.documents.len(), 1);
//! assert_eq!(host.actions().len(), 2);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```
pub mod deep;
pub mod dom;
pub mod form;
pub mod grid;
pub mod scheduler;
pub mod snapshot;
pub mod walker;

pub use dom::{DomError, DomHost, PageSignals};
pub use form::{DocumentReport, RadioOutcome, SubmitOutcome};
pub use scheduler::{Scheduler, Trigger, TriggerOutcome};
pub use walker::PassSummary;
