//! HEMS Smart Upload - Frontend Rust/Leptos Application
//!
//! A WebAssembly view for importing device inventories from spreadsheets:
//! pick a file, preview and correct the parsed rows, then save them in one
//! batch. The workflow itself lives in `hems_upload`; this crate renders it
//! and performs the requests with `fetch`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        App                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Header (device count, theme)                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  MainContent                                                 │
//! │  ├── Hero (title, description)                              │
//! │  └── SmartUpload                                            │
//! │      ├── ErrorBanner                                        │
//! │      ├── FilePicker or PreviewTable or OutcomePanel         │
//! │      └── LogsPanel                                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Footer                                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`types`] - View-side types (LogEntry, Theme)
//! - [`context`] - Shared reactive state (theme, device refresh)
//! - [`components`] - UI components (Header, SmartUpload, PreviewTable, ...)
//! - [`services`] - Backend communication (preview, save, device count)

use hems_upload::UploadOutcome;
use leptos::*;
use leptos_meta::*;
use leptos_router::*;

// =============================================================================
// Module declarations
// =============================================================================

pub mod config;
pub mod types;
pub mod context;
pub mod components;
pub mod services;

// =============================================================================
// Re-exports
// =============================================================================

// Configuration
pub use config::*;

// Types
pub use types::{push_log, LogEntry, LogLevel, Theme};

// Context
pub use context::{provide_app_context, use_app_context, AppContext};

// Components
pub use components::*;

// Services
pub use services::*;

// =============================================================================
// Application Entry Point
// =============================================================================

/// Set up logging and mount the application.
pub fn start() {
    // Setup panic hook for better error messages
    console_error_panic_hook::set_once();

    // Setup console logging
    _ = console_log::init_with_level(log::Level::Debug);

    log::info!("🦀 HEMS Smart Upload - Starting Leptos App");

    mount_to_body(|| view! { <App/> });
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();
    let ctx = provide_app_context();

    view! {
        <Title text=APP_NAME/>
        <Router>
            <main class=move || ctx.theme.get().css_class()>
                <Routes>
                    <Route path="/" view=MainContent/>
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn MainContent() -> impl IntoView {
    let ctx = use_app_context();

    let on_saved = Callback::new(move |outcome: UploadOutcome| {
        log::info!("🔄 {}; refreshing device list", outcome.summary());
        ctx.refresh_devices();
    });

    view! {
        <Header/>

        <div class="container">
            <Hero/>
            <SmartUpload on_saved=on_saved/>
        </div>

        <Footer/>
    }
}
