//! Activity log shown under the upload box.
//!
//! Entries are produced locally by the upload steps; the panel
//! auto-scrolls to the newest one.

use leptos::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::{push_log, LogEntry, LogLevel};

/// Append a log entry and mirror it to the browser console.
pub fn add_log(set_logs: WriteSignal<Vec<LogEntry>>, level: LogLevel, message: &str) {
    match level {
        LogLevel::Error => log::error!("{}", message),
        LogLevel::Warning => log::warn!("{}", message),
        _ => log::info!("{}", message),
    }
    set_logs.update(|logs| push_log(logs, LogEntry::now(level, message)));
}

/// Run `f` on the next animation frame, once the DOM has been updated.
fn request_animation_frame(f: impl FnOnce() + 'static) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(f);
    if window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .is_ok()
    {
        closure.forget();
    }
}

#[component]
pub fn LogsPanel(
    /// Signal for logs data
    logs: ReadSignal<Vec<LogEntry>>,
    /// Set logs signal (for clearing)
    set_logs: WriteSignal<Vec<LogEntry>>,
) -> impl IntoView {
    let logs_container = create_node_ref::<leptos::html::Div>();

    // Auto-scroll to bottom when logs change
    create_effect(move |_| {
        logs.with(|_| ());
        if let Some(container) = logs_container.get() {
            request_animation_frame(move || {
                container.set_scroll_top(container.scroll_height());
            });
        }
    });

    view! {
        <div class="logs-panel">
            <div class="logs-header">
                <span class="logs-title">"📋 Activity"</span>
                <button
                    class="logs-clear"
                    on:click=move |_| set_logs.set(vec![])
                >
                    "Clear"
                </button>
            </div>
            <div class="logs-content" node_ref=logs_container>
                <For
                    each=move || logs.get().into_iter().enumerate()
                    key=|(i, entry)| (*i, entry.timestamp.clone())
                    children=move |(_, entry)| {
                        view! {
                            <div class=format!("log-entry {}", entry.level.css_class())>
                                <span class="log-time">"[" {entry.timestamp.clone()} "] "</span>
                                {entry.message.clone()}
                            </div>
                        }
                    }
                />
            </div>
        </div>
    }
}
