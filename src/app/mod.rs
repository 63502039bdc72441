use crate::config::AppConfig;
use crate::pages::{ManageShell, PageView};
use crate::router::Url;
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::Router;
use leptos_router::hooks::use_location;

#[component]
pub fn App(config: AppConfig) -> impl IntoView {
    provide_context(AppContext(AppState::new(config)));

    // Matching is done by our own route table, so <Router> only supplies
    // location tracking and client-side link handling.
    view! {
        <Router>
            <LocationDriver />
            <ManageShell>
                <PageView />
            </ManageShell>
        </Router>
    }
}

/// Starts a navigation whenever the browser location changes.
#[component]
fn LocationDriver() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let location = use_location();

    Effect::new(move |_| {
        let path = location.pathname.get();
        let search = location.search.get();
        let search = search.trim_start_matches('?');
        let raw = if search.is_empty() {
            path
        } else {
            format!("{path}?{search}")
        };
        app_state.0.navigate(Url::parse(&raw));
    });
}
