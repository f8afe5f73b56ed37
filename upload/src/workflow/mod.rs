//! The upload workflow state machine.
//!
//! ```text
//!            select_file            begin_preview           finish_preview(Ok)
//!   Idle ───────────────▶ FileSelected ─────────▶ Previewing ─────────────▶ PreviewReady ◀─┐ edit
//!    ▲                        ▲   ▲                   │                      │   │  └──────┘
//!    │                        │   └─────── Failed ◀───┘ finish_preview(Err)  │   │ cancel_preview
//!    │ reset                  └──────────────────────────────────────────────┼───┘
//!    │                                        ▲ finish_save(Err)             │ begin_save
//!    │                                        └──── Saving ◀─────────────────┘
//!    └──────────────────── Done ◀──────────────────┘ finish_save(Ok)
//! ```
//!
//! [`Workflow`] holds no I/O. Network steps are split in two: `begin_*`
//! moves into the busy state and hands out a [`Ticket`] carrying what to
//! send; `finish_*` takes that ticket's id and the call's result. While a
//! step is busy every trigger is ignored, and a result whose ticket is no
//! longer current is dropped.
//!
//! The payload type `F` is whatever the host uses for file contents:
//! bytes on native, a browser `File` handle in WebAssembly.

pub mod edit;

use std::mem;

use crate::config::UploadConfig;
use crate::error::{TransportResult, WorkflowError};
use crate::models::{PreviewRow, RowField, UploadOutcome};
use crate::validation::{validate_file, FileInfo};

pub use edit::{apply_edit, FieldEdit};

// =============================================================================
// Public types
// =============================================================================

/// A file that passed validation, with its contents.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile<F> {
    pub info: FileInfo,
    pub payload: F,
}

impl<F> SelectedFile<F> {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn size(&self) -> u64 {
        self.info.size
    }

    pub fn extension(&self) -> &str {
        &self.info.extension
    }
}

/// Which view the workflow is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    FileSelected,
    Previewing,
    PreviewReady,
    Saving,
    Done,
    Failed,
}

/// Identifies one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketId(u64);

/// What a `begin_*` call hands to the transport.
#[derive(Debug, Clone)]
pub struct Ticket<T> {
    pub id: TicketId,
    pub payload: T,
}

// =============================================================================
// Internal stages
// =============================================================================

/// Where a failed step can be retried from.
#[derive(Debug, Clone)]
enum Resume<F> {
    File(SelectedFile<F>),
    Preview {
        file: SelectedFile<F>,
        rows: Vec<PreviewRow>,
    },
}

#[derive(Debug, Clone)]
enum Stage<F> {
    Idle,
    FileSelected(SelectedFile<F>),
    Previewing(SelectedFile<F>),
    PreviewReady {
        file: SelectedFile<F>,
        rows: Vec<PreviewRow>,
    },
    Saving {
        file: SelectedFile<F>,
        rows: Vec<PreviewRow>,
    },
    Done(UploadOutcome),
    Failed {
        error: WorkflowError,
        resume: Resume<F>,
    },
}

impl<F> Resume<F> {
    fn into_stage(self) -> Stage<F> {
        match self {
            Resume::File(file) => Stage::FileSelected(file),
            Resume::Preview { file, rows } => Stage::PreviewReady { file, rows },
        }
    }
}

// =============================================================================
// Workflow
// =============================================================================

/// One upload, from file selection to save result.
#[derive(Debug, Clone)]
pub struct Workflow<F> {
    config: UploadConfig,
    stage: Stage<F>,
    /// Validation error shown outside of `Failed`.
    notice: Option<WorkflowError>,
    generation: u64,
}

impl<F: Clone> Workflow<F> {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            config,
            stage: Stage::Idle,
            notice: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn state(&self) -> WorkflowState {
        match &self.stage {
            Stage::Idle => WorkflowState::Idle,
            Stage::FileSelected(_) => WorkflowState::FileSelected,
            Stage::Previewing(_) => WorkflowState::Previewing,
            Stage::PreviewReady { .. } => WorkflowState::PreviewReady,
            Stage::Saving { .. } => WorkflowState::Saving,
            Stage::Done(_) => WorkflowState::Done,
            Stage::Failed { .. } => WorkflowState::Failed,
        }
    }

    /// The chosen file, until it is saved or reset.
    pub fn file(&self) -> Option<&SelectedFile<F>> {
        match &self.stage {
            Stage::FileSelected(file) | Stage::Previewing(file) => Some(file),
            Stage::PreviewReady { file, .. } | Stage::Saving { file, .. } => Some(file),
            Stage::Failed { resume: Resume::File(file), .. } => Some(file),
            Stage::Failed { resume: Resume::Preview { file, .. }, .. } => Some(file),
            Stage::Idle | Stage::Done(_) => None,
        }
    }

    /// Previewed rows, including edits. Kept through a failed save.
    pub fn rows(&self) -> Option<&[PreviewRow]> {
        match &self.stage {
            Stage::PreviewReady { rows, .. } | Stage::Saving { rows, .. } => Some(rows),
            Stage::Failed { resume: Resume::Preview { rows, .. }, .. } => Some(rows),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&UploadOutcome> {
        match &self.stage {
            Stage::Done(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// The error banner: a failed step or a rejected file.
    pub fn error(&self) -> Option<&WorkflowError> {
        match &self.stage {
            Stage::Failed { error, .. } => Some(error),
            _ => self.notice.as_ref(),
        }
    }

    /// A request is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.stage, Stage::Previewing(_) | Stage::Saving { .. })
    }

    pub fn can_preview(&self) -> bool {
        matches!(
            self.stage,
            Stage::FileSelected(_) | Stage::Failed { resume: Resume::File(_), .. }
        )
    }

    /// Save needs at least one row and nothing in flight.
    pub fn can_save(&self) -> bool {
        match &self.stage {
            Stage::PreviewReady { rows, .. } => !rows.is_empty(),
            Stage::Failed { resume: Resume::Preview { rows, .. }, .. } => !rows.is_empty(),
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Choose a file (picker or drop).
    ///
    /// Rows and results of the previous selection are dropped before the
    /// new file is validated. On rejection the previously chosen file, if
    /// any, stays selected and the reason is exposed through [`error`].
    /// Returns whether the file was accepted.
    ///
    /// [`error`]: Workflow::error
    pub fn select_file(&mut self, name: &str, size: u64, payload: F) -> bool {
        if self.is_busy() {
            tracing::debug!("ignoring file selection while {:?}", self.state());
            return false;
        }

        let previous = match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::FileSelected(file) | Stage::PreviewReady { file, .. } => Some(file),
            Stage::Failed { resume: Resume::File(file), .. } => Some(file),
            Stage::Failed { resume: Resume::Preview { file, .. }, .. } => Some(file),
            _ => None,
        };
        self.notice = None;

        match validate_file(name, size, &self.config) {
            Ok(info) => {
                tracing::info!("selected {} ({} bytes)", info.name, info.size);
                self.stage = Stage::FileSelected(SelectedFile { info, payload });
                true
            }
            Err(err) => {
                tracing::warn!("rejected {}: {}", name, err);
                self.stage = previous.map_or(Stage::Idle, Stage::FileSelected);
                self.notice = Some(err.into());
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Preview
    // -------------------------------------------------------------------------

    /// Start the preview request. `None` unless a file is waiting to be sent.
    pub fn begin_preview(&mut self) -> Option<Ticket<SelectedFile<F>>> {
        let file = match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::FileSelected(file) => file,
            Stage::Failed { resume: Resume::File(file), .. } => file,
            other => {
                tracing::debug!("preview not available");
                self.stage = other;
                return None;
            }
        };

        self.notice = None;
        let id = self.next_ticket();
        self.stage = Stage::Previewing(file.clone());
        Some(Ticket { id, payload: file })
    }

    /// Record the preview result. An empty row list is a valid preview.
    /// Returns whether the result was applied.
    pub fn finish_preview(&mut self, id: TicketId, result: TransportResult<Vec<PreviewRow>>) -> bool {
        if !self.is_current(id) {
            return false;
        }
        let file = match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Previewing(file) => file,
            other => {
                self.stage = other;
                return false;
            }
        };

        self.stage = match result {
            Ok(rows) => {
                tracing::info!("preview of {} returned {} rows", file.name(), rows.len());
                Stage::PreviewReady { file, rows }
            }
            Err(err) => {
                tracing::error!("preview of {} failed: {}", file.name(), err);
                Stage::Failed {
                    error: WorkflowError::preview(err),
                    resume: Resume::File(file),
                }
            }
        };
        true
    }

    /// Drop the previewed rows and go back to the selected file.
    pub fn cancel_preview(&mut self) -> bool {
        match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::PreviewReady { file, .. } | Stage::Failed { resume: Resume::Preview { file, .. }, .. } => {
                self.stage = Stage::FileSelected(file);
                self.notice = None;
                true
            }
            other => {
                self.stage = other;
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Edits
    // -------------------------------------------------------------------------

    /// Edit one cell from raw editor text.
    pub fn edit(&mut self, index: usize, field: RowField, raw: &str) -> bool {
        self.apply(index, &FieldEdit::parse(field, raw))
    }

    /// Apply a typed edit to one row. After a failed save, editing also
    /// clears the error and returns to the preview.
    pub fn apply(&mut self, index: usize, edit: &FieldEdit) -> bool {
        if let Stage::Failed { resume: Resume::Preview { .. }, .. } = &self.stage {
            self.dismiss_error();
        }
        let Stage::PreviewReady { rows, .. } = &mut self.stage else {
            return false;
        };
        match apply_edit(rows, index, edit) {
            Some(next) => {
                *rows = next;
                true
            }
            None => {
                tracing::warn!("edit to row {} ignored: only {} rows", index, rows.len());
                false
            }
        }
    }

    // -------------------------------------------------------------------------
    // Save
    // -------------------------------------------------------------------------

    /// Start the save request with a snapshot of the edited rows.
    /// `None` while saving, without rows, or outside the preview.
    pub fn begin_save(&mut self) -> Option<Ticket<Vec<PreviewRow>>> {
        if !self.can_save() {
            tracing::debug!("save not available while {:?}", self.state());
            return None;
        }
        let (file, rows) = match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::PreviewReady { file, rows } => (file, rows),
            Stage::Failed { resume: Resume::Preview { file, rows }, .. } => (file, rows),
            other => {
                self.stage = other;
                return None;
            }
        };

        self.notice = None;
        let id = self.next_ticket();
        let snapshot = rows.clone();
        self.stage = Stage::Saving { file, rows };
        Some(Ticket { id, payload: snapshot })
    }

    /// Record the save result. Success clears file and rows; failure keeps
    /// the edited rows so nothing is lost. Returns whether it was applied.
    pub fn finish_save(&mut self, id: TicketId, result: TransportResult<UploadOutcome>) -> bool {
        if !self.is_current(id) {
            return false;
        }
        let (file, rows) = match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::Saving { file, rows } => (file, rows),
            other => {
                self.stage = other;
                return false;
            }
        };

        self.stage = match result {
            Ok(outcome) => {
                tracing::info!(
                    "{} from {} ({} warnings/errors)",
                    outcome.summary(),
                    file.name(),
                    outcome.problem_count()
                );
                Stage::Done(outcome)
            }
            Err(err) => {
                tracing::error!("save of {} rows failed: {}", rows.len(), err);
                Stage::Failed {
                    error: WorkflowError::save(err),
                    resume: Resume::Preview { file, rows },
                }
            }
        };
        true
    }

    // -------------------------------------------------------------------------
    // Recovery
    // -------------------------------------------------------------------------

    /// Close the error banner. A failed step returns to where it can be retried.
    pub fn dismiss_error(&mut self) {
        self.notice = None;
        if let Stage::Failed { .. } = self.stage {
            if let Stage::Failed { resume, .. } = mem::replace(&mut self.stage, Stage::Idle) {
                self.stage = resume.into_stage();
            }
        }
    }

    /// Back to a fresh `Idle` ("Upload another"). Ignored while busy.
    pub fn reset(&mut self) -> bool {
        if self.is_busy() {
            tracing::debug!("ignoring reset while {:?}", self.state());
            return false;
        }
        self.stage = Stage::Idle;
        self.notice = None;
        self.generation += 1;
        true
    }

    fn next_ticket(&mut self) -> TicketId {
        self.generation += 1;
        TicketId(self.generation)
    }

    fn is_current(&self, id: TicketId) -> bool {
        if id.0 == self.generation {
            true
        } else {
            tracing::debug!("dropping stale result for request {}", id.0);
            false
        }
    }
}

impl<F: Clone> Default for Workflow<F> {
    fn default() -> Self {
        Self::new(UploadConfig::default())
    }
}
