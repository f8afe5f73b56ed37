//! Save outcome summary.

use hems_upload::{group_issues, RowIssue};
use leptos::*;

use super::upload::WorkflowSignal;

/// One line per row: `"Row 3 · quantity: must be >= 1 | general: duplicate"`.
pub fn issue_lines(issues: &[RowIssue]) -> Vec<String> {
    group_issues(issues)
        .into_iter()
        .map(|(row, fields)| {
            let details: Vec<String> = fields
                .into_iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect();
            format!("{} · {}", row, details.join(" | "))
        })
        .collect()
}

#[component]
pub fn OutcomePanel(workflow: WorkflowSignal, on_reset: Callback<()>) -> impl IntoView {
    let outcome = move || workflow.with(|wf| wf.outcome().cloned());

    move || {
        outcome().map(|outcome| {
            let icon = if outcome.has_problems() { "⚠️" } else { "✅" };
            let skipped = (outcome.skipped_count > 0)
                .then(|| view! { <div class="outcome-skipped">{format!("{} rows skipped", outcome.skipped_count)}</div> });

            view! {
                <div class="outcome-section" class:with-problems=outcome.has_problems()>
                    <div class="outcome-title">{icon} " " {outcome.summary()}</div>
                    {skipped}
                    <MessageList title="Warnings" tone="log-warning" items=outcome.warnings.clone()/>
                    <MessageList title="Duplicates" tone="log-warning" items=outcome.duplicates.clone()/>
                    <MessageList title="Errors" tone="log-error" items=outcome.errors.clone()/>
                    <MessageList title="Row issues" tone="log-error" items=issue_lines(&outcome.issues)/>
                    <button class="btn btn-primary" on:click=move |_| on_reset.call(())>
                        "Upload another file"
                    </button>
                </div>
            }
        })
    }
}

#[component]
fn MessageList(title: &'static str, tone: &'static str, items: Vec<String>) -> impl IntoView {
    (!items.is_empty()).then(|| {
        view! {
            <div class=format!("outcome-list {}", tone)>
                <div class="outcome-list-title">{title} " (" {items.len()} ")"</div>
                <ul>
                    {items.into_iter().map(|item| view! { <li>{item}</li> }).collect_view()}
                </ul>
            </div>
        }
    })
}
