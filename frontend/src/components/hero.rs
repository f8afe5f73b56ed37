//! Hero section component

use leptos::*;

#[component]
pub fn Hero() -> impl IntoView {
    view! {
        <div class="hero">
            <h1>"Smart Upload - Device Inventory"</h1>
            <p class="subtitle">
                "Import a CSV or Excel sheet of your buildings' appliances. "
                "Check and correct every row in the preview, then save them all at once."
            </p>
        </div>
    }
}
