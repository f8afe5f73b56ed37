//! Editable preview of the rows returned by the preview step.
//!
//! Each cell commits on `change`; the workflow replaces the row list with
//! the edited copy, so the table always renders what will be saved.

use hems_upload::{check_row, DeviceType, PreviewRow, RowField, Severity, WorkflowState};
use leptos::*;

use super::upload::WorkflowSignal;

#[component]
pub fn PreviewTable(workflow: WorkflowSignal, on_save: Callback<()>) -> impl IntoView {
    let row_count = move || workflow.with(|wf| wf.rows().map_or(0, <[PreviewRow]>::len));
    let busy = move || workflow.with(|wf| wf.is_busy());
    let saving = move || workflow.with(|wf| wf.state() == WorkflowState::Saving);
    let can_save = move || workflow.with(|wf| wf.can_save());
    let total_watts = move || {
        workflow.with(|wf| {
            wf.rows()
                .map_or(0.0, |rows| rows.iter().map(PreviewRow::total_watts).sum::<f64>())
        })
    };
    let blocking = move || {
        workflow.with(|wf| {
            wf.rows().map_or(0, |rows| {
                rows.iter()
                    .filter(|row| check_row(row).iter().any(|i| i.severity == Severity::Error))
                    .count()
            })
        })
    };

    let on_cancel = move |_| {
        workflow.update(|wf| {
            wf.cancel_preview();
        })
    };

    view! {
        <div class="preview-section show">
            <div class="preview-header">
                <div class="preview-title">"📋 Preview: " {row_count} " devices"</div>
                <button class="btn btn-secondary" disabled=busy on:click=on_cancel>
                    "Cancel"
                </button>
            </div>

            <Show
                when=move || { row_count() > 0 }
                fallback=|| view! { <div class="preview-empty">"No devices found in this file."</div> }
            >
                <div class="preview-table-wrapper">
                    <table class="preview-table">
                        <thead>
                            <tr>
                                <th>"#"</th>
                                {RowField::ALL.into_iter().map(|field| view! { <th>{field.label()}</th> }).collect_view()}
                            </tr>
                        </thead>
                        <tbody>
                            <For
                                each=move || 0..row_count()
                                key=|index| *index
                                children=move |index| view! { <RowEditor workflow=workflow index=index/> }
                            />
                        </tbody>
                    </table>
                </div>
            </Show>

            <div class="preview-footer">
                <div class="preview-cost">
                    <strong>{row_count}</strong> " devices • "
                    <strong>{move || format!("{:.0}", total_watts())}</strong> " W rated"
                    <Show when=move || { blocking() > 0 } fallback=|| view! { }>
                        <span class="preview-warning">
                            {move || format!(" • {} rows need attention", blocking())}
                        </span>
                    </Show>
                </div>
                <button class="btn btn-primary" disabled=move || !can_save() on:click=move |_| on_save.call(())>
                    {move || if saving() { "⏳ Saving..." } else { "💾 Save devices" }}
                </button>
            </div>
        </div>
    }
}

#[component]
fn RowEditor(workflow: WorkflowSignal, index: usize) -> impl IntoView {
    let invalid = move || {
        workflow.with(|wf| {
            wf.rows()
                .and_then(|rows| rows.get(index))
                .is_some_and(|row| check_row(row).iter().any(|i| i.severity == Severity::Error))
        })
    };

    view! {
        <tr class:row-invalid=invalid>
            <td class="row-number">{index + 1}</td>
            {RowField::ALL
                .into_iter()
                .map(|field| view! { <td><CellEditor workflow=workflow index=index field=field/></td> })
                .collect_view()}
        </tr>
    }
}

#[component]
fn CellEditor(workflow: WorkflowSignal, index: usize, field: RowField) -> impl IntoView {
    let value = move || {
        workflow.with(|wf| {
            wf.rows()
                .and_then(|rows| rows.get(index))
                .map(|row| row.display_value(field))
                .unwrap_or_default()
        })
    };
    let hints = move || {
        workflow.with(|wf| {
            wf.rows()
                .and_then(|rows| rows.get(index))
                .map(|row| {
                    check_row(row)
                        .into_iter()
                        .filter(|issue| issue.field == field)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })
    };
    let title = move || hints().into_iter().map(|h| h.message).collect::<Vec<_>>().join("\n");
    let invalid = move || hints().iter().any(|h| h.severity == Severity::Error);
    let doubtful = move || hints().iter().any(|h| h.severity == Severity::Warning);
    let disabled = move || workflow.with(|wf| wf.is_busy());

    let commit = move |raw: String| {
        workflow.update(|wf| {
            wf.edit(index, field, &raw);
        })
    };

    if field == RowField::DeviceType {
        return view! {
            <select
                class="cell-input"
                class:invalid=invalid
                title=title
                disabled=disabled
                on:change=move |ev| commit(event_target_value(&ev))
            >
                {move || device_options(&value())}
            </select>
        }
        .into_view();
    }

    let (step, min, max) = input_bounds(field);
    let input_type = if field.is_numeric() { "number" } else { "text" };
    view! {
        <input
            class="cell-input"
            class:invalid=invalid
            class:doubtful=doubtful
            type=input_type
            step=step
            min=min
            max=max
            title=title
            disabled=disabled
            prop:value=value
            on:change=move |ev| commit(event_target_value(&ev))
        />
    }
    .into_view()
}

/// Known device types, plus `current` when it is a custom label.
fn device_options(current: &str) -> View {
    let mut labels: Vec<String> = DeviceType::ALL.iter().map(|d| d.as_str().to_string()).collect();
    if !labels.iter().any(|label| label == current) {
        labels.push(current.to_string());
    }

    labels
        .into_iter()
        .map(|label| {
            let selected = label == current;
            view! { <option value=label.clone() selected=selected>{label}</option> }
        })
        .collect_view()
}

/// `(step, min, max)` for numeric cells.
fn input_bounds(field: RowField) -> (Option<&'static str>, Option<&'static str>, Option<&'static str>) {
    match field {
        RowField::WattRating => (Some("any"), Some("0"), None),
        RowField::StarRating => (Some("1"), Some("1"), Some("5")),
        RowField::Ton => (Some("0.5"), Some("0.5"), None),
        RowField::Quantity => (Some("1"), Some("1"), None),
        RowField::HoursUsedPerDay => (Some("0.5"), Some("0"), Some("24")),
        _ => (None, None, None),
    }
}
