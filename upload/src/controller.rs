//! Drives a [`Workflow`] against an [`UploadApi`].
//!
//! The controller owns the workflow and performs the network half of each
//! step. It is what the CLI and the integration tests use; the browser
//! front-end drives the workflow from its own signals instead.

use std::path::Path;

use crate::api::UploadApi;
use crate::config::UploadConfig;
use crate::models::{RowField, UploadOutcome};
use crate::validation::validate_file;
use crate::workflow::{FieldEdit, Workflow, WorkflowState};

type SavedCallback = Box<dyn FnMut(&UploadOutcome)>;

/// One upload session bound to a transport.
pub struct UploadController<A: UploadApi> {
    api: A,
    workflow: Workflow<A::File>,
    on_saved: Option<SavedCallback>,
}

impl<A: UploadApi> UploadController<A> {
    pub fn new(api: A, config: UploadConfig) -> Self {
        Self {
            api,
            workflow: Workflow::new(config),
            on_saved: None,
        }
    }

    /// Called once per successful save, e.g. to refresh a device list.
    pub fn on_saved(mut self, callback: impl FnMut(&UploadOutcome) + 'static) -> Self {
        self.on_saved = Some(Box::new(callback));
        self
    }

    pub fn workflow(&self) -> &Workflow<A::File> {
        &self.workflow
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> WorkflowState {
        self.workflow.state()
    }

    pub fn select_file(&mut self, name: &str, size: u64, payload: A::File) -> bool {
        self.workflow.select_file(name, size, payload)
    }

    /// Send the selected file for preview and wait for the answer.
    ///
    /// A no-op unless a file is waiting to be previewed.
    pub async fn preview(&mut self) -> WorkflowState {
        if let Some(ticket) = self.workflow.begin_preview() {
            let result = self.api.preview(&ticket.payload).await;
            self.workflow.finish_preview(ticket.id, result);
        }
        self.workflow.state()
    }

    pub fn edit(&mut self, index: usize, field: RowField, raw: &str) -> bool {
        self.workflow.edit(index, field, raw)
    }

    pub fn apply(&mut self, index: usize, edit: &FieldEdit) -> bool {
        self.workflow.apply(index, edit)
    }

    pub fn cancel_preview(&mut self) -> bool {
        self.workflow.cancel_preview()
    }

    /// Save the edited rows and wait for the answer.
    ///
    /// The saved callback runs after the workflow reaches `Done`.
    pub async fn save(&mut self) -> WorkflowState {
        if let Some(ticket) = self.workflow.begin_save() {
            let result = self.api.save(&ticket.payload).await;
            self.workflow.finish_save(ticket.id, result);

            if let (Some(outcome), Some(callback)) = (self.workflow.outcome(), self.on_saved.as_mut()) {
                callback(outcome);
            }
        }
        self.workflow.state()
    }

    pub fn dismiss_error(&mut self) {
        self.workflow.dismiss_error();
    }

    pub fn reset(&mut self) -> bool {
        self.workflow.reset()
    }
}

impl<A: UploadApi<File = Vec<u8>>> UploadController<A> {
    /// Select a file from disk. Rejected files are never read.
    pub async fn select_path(&mut self, path: &Path) -> std::io::Result<bool> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let size = tokio::fs::metadata(path).await?.len();

        if validate_file(&name, size, self.workflow.config()).is_err() {
            return Ok(self.workflow.select_file(&name, size, Vec::new()));
        }

        let bytes = tokio::fs::read(path).await?;
        Ok(self.workflow.select_file(&name, size, bytes))
    }
}
