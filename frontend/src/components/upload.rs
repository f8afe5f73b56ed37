//! Smart upload component: file picker with drag & drop, error banner,
//! and the network half of the preview and save steps.
//!
//! All state lives in one `RwSignal<Workflow<File>>`; the child views read
//! it through `with` and change it only through workflow operations.

use hems_upload::{UploadApi, UploadOutcome, Workflow, WorkflowState};
use leptos::*;
use web_sys::{DragEvent, Event, File, HtmlInputElement};

use super::logs::{add_log, LogsPanel};
use super::outcome::{issue_lines, OutcomePanel};
use super::preview::PreviewTable;
use crate::services::BrowserUploadApi;
use crate::{upload_config, LogEntry, LogLevel};

/// The workflow as held by the view.
pub type WorkflowSignal = RwSignal<Workflow<File>>;

#[component]
pub fn SmartUpload(
    /// Called once per successful save (e.g. to refresh device lists)
    #[prop(optional, into)]
    on_saved: Option<Callback<UploadOutcome>>,
) -> impl IntoView {
    let workflow: WorkflowSignal = create_rw_signal(Workflow::new(upload_config()));
    let (logs, set_logs) = create_signal(Vec::<LogEntry>::new());

    let state = move || workflow.with(|wf| wf.state());
    let has_rows = move || workflow.with(|wf| wf.rows().is_some());

    let on_preview = Callback::new(move |_: ()| run_preview(workflow, set_logs));
    let on_save = Callback::new(move |_: ()| run_save(workflow, set_logs, on_saved));
    let on_reset = Callback::new(move |_: ()| {
        if workflow.try_update(|wf| wf.reset()).unwrap_or(false) {
            set_logs.set(Vec::new());
        }
    });

    view! {
        <div class="smart-upload">
            <ErrorBanner workflow=workflow on_preview=on_preview on_save=on_save/>

            <Show
                when=move || !has_rows() && state() != WorkflowState::Done
                fallback=|| view! { }
            >
                <FilePicker workflow=workflow set_logs=set_logs on_preview=on_preview/>
            </Show>

            <Show
                when=has_rows
                fallback=|| view! { }
            >
                <PreviewTable workflow=workflow on_save=on_save/>
            </Show>

            <Show
                when=move || state() == WorkflowState::Done
                fallback=|| view! { }
            >
                <OutcomePanel workflow=workflow on_reset=on_reset/>
            </Show>

            <Show
                when=move || !logs.get().is_empty()
                fallback=|| view! { }
            >
                <LogsPanel logs=logs set_logs=set_logs/>
            </Show>
        </div>
    }
}

// =============================================================================
// Steps
// =============================================================================

fn choose_file(workflow: WorkflowSignal, set_logs: WriteSignal<Vec<LogEntry>>, file: File) {
    let name = file.name();
    let size = file.size() as u64;

    let accepted = workflow
        .try_update(|wf| wf.select_file(&name, size, file))
        .unwrap_or(false);

    if accepted {
        add_log(set_logs, LogLevel::Info, &format!("📄 Selected {} ({})", name, format_size(size)));
    } else if let Some(reason) = workflow.with_untracked(|wf| wf.error().map(ToString::to_string)) {
        add_log(set_logs, LogLevel::Warning, &format!("⚠️ {}", reason));
    }
}

fn run_preview(workflow: WorkflowSignal, set_logs: WriteSignal<Vec<LogEntry>>) {
    let Some(ticket) = workflow.try_update(|wf| wf.begin_preview()).flatten() else {
        return;
    };

    add_log(
        set_logs,
        LogLevel::Info,
        &format!("📤 Uploading {} for preview...", ticket.payload.name()),
    );

    spawn_local(async move {
        let api = BrowserUploadApi::new(upload_config());
        let result = api.preview(&ticket.payload).await;
        let (level, message) = match &result {
            Ok(rows) => (LogLevel::Success, format!("✅ Preview ready: {} devices found", rows.len())),
            Err(e) => (LogLevel::Error, format!("❌ Preview failed: {}", e)),
        };

        let applied = workflow
            .try_update(|wf| wf.finish_preview(ticket.id, result))
            .unwrap_or(false);
        if applied {
            add_log(set_logs, level, &message);
        }
    });
}

fn run_save(
    workflow: WorkflowSignal,
    set_logs: WriteSignal<Vec<LogEntry>>,
    on_saved: Option<Callback<UploadOutcome>>,
) {
    let Some(ticket) = workflow.try_update(|wf| wf.begin_save()).flatten() else {
        return;
    };

    add_log(
        set_logs,
        LogLevel::Info,
        &format!("💾 Saving {} devices...", ticket.payload.len()),
    );

    spawn_local(async move {
        let api = BrowserUploadApi::new(upload_config());
        let result = api.save(&ticket.payload).await;
        if let Err(e) = &result {
            add_log(set_logs, LogLevel::Error, &format!("❌ Save failed: {}", e));
        }

        let applied = workflow
            .try_update(|wf| wf.finish_save(ticket.id, result))
            .unwrap_or(false);
        if !applied {
            return;
        }

        if let Some(outcome) = workflow.with_untracked(|wf| wf.outcome().cloned()) {
            let level = if outcome.has_problems() { LogLevel::Warning } else { LogLevel::Success };
            add_log(set_logs, level, &format!("✅ {}", outcome.summary()));
            for warning in &outcome.warnings {
                add_log(set_logs, LogLevel::Warning, &format!("⚠️ {}", warning));
            }
            if let Some(callback) = on_saved {
                callback.call(outcome);
            }
        }
    });
}

/// `"512 B"`, `"2.0 KB"`, `"1.5 MB"`.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KB {
        format!("{} B", bytes)
    } else if bytes_f < KB * KB {
        format!("{:.1} KB", bytes_f / KB)
    } else {
        format!("{:.1} MB", bytes_f / (KB * KB))
    }
}

// =============================================================================
// File picker
// =============================================================================

#[component]
fn FilePicker(
    workflow: WorkflowSignal,
    set_logs: WriteSignal<Vec<LogEntry>>,
    on_preview: Callback<()>,
) -> impl IntoView {
    let (dragging, set_dragging) = create_signal(false);
    let input_ref = create_node_ref::<html::Input>();

    let (accept, max_mib) = workflow.with_untracked(|wf| {
        (wf.config().accept_attribute(), wf.config().max_file_size_mib())
    });
    let hint = format!("or click to choose a file ({} • max {}MB)", accept, max_mib);

    let busy = move || workflow.with(|wf| wf.is_busy());
    let previewing = move || workflow.with(|wf| wf.state() == WorkflowState::Previewing);
    let can_preview = move || workflow.with(|wf| wf.can_preview());
    let selected = move || {
        workflow.with(|wf| wf.file().map(|f| format!("{} • {}", f.name(), format_size(f.size()))))
    };

    let on_file_change = move |ev: Event| {
        let input: HtmlInputElement = event_target(&ev);
        if let Some(file) = input.files().and_then(|files| files.get(0)) {
            choose_file(workflow, set_logs, file);
        }
        // lets the same file be chosen again
        input.set_value("");
    };

    let on_drop = move |ev: DragEvent| {
        ev.prevent_default();
        set_dragging.set(false);
        if busy() {
            return;
        }
        if let Some(file) = ev.data_transfer().and_then(|dt| dt.files()).and_then(|files| files.get(0)) {
            choose_file(workflow, set_logs, file);
        }
    };

    let trigger_file_input = move |_| {
        if busy() {
            return;
        }
        if let Some(input) = input_ref.get() {
            input.click();
        }
    };

    view! {
        <div
            class="upload-section"
            class:dragging=dragging
            class:busy=busy
            on:click=trigger_file_input
            on:dragover=move |ev: DragEvent| {
                ev.prevent_default();
                set_dragging.set(true);
            }
            on:dragleave=move |_| set_dragging.set(false)
            on:drop=on_drop
        >
            <div class="upload-icon">"📤"</div>
            <div class="upload-text">
                {move || if previewing() {
                    "⏳ Uploading and analysing..."
                } else {
                    "Drop a device spreadsheet here"
                }}
            </div>
            <div class="upload-hint">{hint}</div>

            <Show
                when=move || selected().is_some()
                fallback=|| view! { }
            >
                <div class="selected-file">"📄 " {move || selected().unwrap_or_default()}</div>
            </Show>

            <input
                type="file"
                accept=accept
                style="display:none"
                node_ref=input_ref
                on:click=|ev| ev.stop_propagation()
                on:change=on_file_change
            />

            <button
                class="btn btn-primary upload-button"
                disabled=move || !can_preview()
                on:click=move |ev| {
                    ev.stop_propagation();
                    on_preview.call(());
                }
            >
                {move || if previewing() { "Analysing..." } else { "Preview" }}
            </button>
        </div>
    }
}

// =============================================================================
// Error banner
// =============================================================================

#[component]
fn ErrorBanner(workflow: WorkflowSignal, on_preview: Callback<()>, on_save: Callback<()>) -> impl IntoView {
    let message = move || workflow.with(|wf| wf.error().map(ToString::to_string));
    let details = move || workflow.with(|wf| wf.error().map(|e| issue_lines(e.issues())).unwrap_or_default());
    let failed = move || workflow.with(|wf| wf.state() == WorkflowState::Failed);
    let retry_preview = move || failed() && workflow.with(|wf| wf.can_preview());
    let retry_save = move || failed() && workflow.with(|wf| wf.can_save());

    view! {
        <Show
            when=move || message().is_some()
            fallback=|| view! { }
        >
            <div class="error-message" role="alert">
                <div class="error-text">{move || message().unwrap_or_default()}</div>
                <ul class="error-details">
                    {move || details().into_iter().map(|line| view! { <li>{line}</li> }).collect_view()}
                </ul>
                <div class="error-actions">
                    <Show when=retry_preview fallback=|| view! { }>
                        <button class="btn btn-secondary" on:click=move |_| on_preview.call(())>"Retry preview"</button>
                    </Show>
                    <Show when=retry_save fallback=|| view! { }>
                        <button class="btn btn-secondary" on:click=move |_| on_save.call(())>"Retry save"</button>
                    </Show>
                    <button class="btn btn-link" on:click=move |_| workflow.update(|wf| wf.dismiss_error())>
                        "Dismiss"
                    </button>
                </div>
            </div>
        </Show>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(2 * 1024 * 1024), "2.0 MB");
    }
}
