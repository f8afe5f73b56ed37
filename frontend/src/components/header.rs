use leptos::*;

use crate::context::use_app_context;
use crate::services::fetch_device_count;
use crate::types::Theme;
use crate::upload_config;

#[component]
pub fn Header() -> impl IntoView {
    let ctx = use_app_context();

    // Refetched whenever a save bumps the version
    let devices = create_local_resource(
        move || ctx.devices_version.get(),
        |_| async move { fetch_device_count(&upload_config()).await },
    );

    let on_theme_click = move |_| ctx.theme.update(|theme| *theme = theme.toggled());

    view! {
        <header>
            <div class="header-left">
                <a href="#" class="logo">"HEMS"</a>
                <span class="badge">
                    {move || match devices.get() {
                        Some(Ok(count)) => format!("{} devices", count),
                        Some(Err(e)) => {
                            log::warn!("Could not fetch device count: {}", e);
                            "-- devices".to_string()
                        }
                        None => "… devices".to_string(),
                    }}
                </span>
            </div>
            <div class="header-right">
                <button class="theme-toggle" title="Toggle theme" on:click=on_theme_click>
                    {move || match ctx.theme.get() {
                        Theme::Light => "🌙",
                        Theme::Dark => "☀️",
                    }}
                </button>
            </div>
        </header>
    }
}
