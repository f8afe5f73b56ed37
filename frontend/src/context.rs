//! Application-wide reactive state, shared through Leptos context.

use leptos::*;

use crate::types::Theme;

/// State shared by the header and the upload view.
#[derive(Clone, Copy)]
pub struct AppContext {
    pub theme: RwSignal<Theme>,
    /// Bumped after every successful save; device views refetch on change.
    pub devices_version: RwSignal<u32>,
}

impl AppContext {
    pub fn new() -> Self {
        Self {
            theme: create_rw_signal(Theme::default()),
            devices_version: create_rw_signal(0),
        }
    }

    /// Ask device views to reload.
    pub fn refresh_devices(&self) {
        self.devices_version.update(|v| *v = v.wrapping_add(1));
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the context and provide it to the component tree.
pub fn provide_app_context() -> AppContext {
    let ctx = AppContext::new();
    provide_context(ctx);
    ctx
}

/// Context provided by [`provide_app_context`], or a detached one.
pub fn use_app_context() -> AppContext {
    use_context::<AppContext>().unwrap_or_else(|| {
        log::warn!("AppContext not provided; using a detached one");
        AppContext::new()
    })
}
