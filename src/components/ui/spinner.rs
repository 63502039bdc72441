use icons::Loader;
use leptos::prelude::*;
use tw_merge::tw_merge;

/// Inline busy indicator for buttons and loading pages.
#[component]
pub fn Spinner(#[prop(into, optional)] class: String) -> impl IntoView {
    let class = tw_merge!("size-4 animate-spin text-muted-foreground", class);

    view! { <Loader class=class attr:role="status" attr:aria-label="Loading" /> }
}
