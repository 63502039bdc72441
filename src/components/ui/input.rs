use leptos::prelude::*;
use tw_merge::tw_merge;

/// Text input bound to a string signal.
#[component]
pub fn Input(
    #[prop(into, optional)] class: String,
    #[prop(into, optional)] id: String,
    #[prop(into, optional)] placeholder: String,
    /// Marks the field as failing validation.
    #[prop(into, default = Signal::stored(false))] invalid: Signal<bool>,
    bind_value: RwSignal<String>,
) -> impl IntoView {
    let class = tw_merge!(
        "border-input placeholder:text-muted-foreground flex h-9 w-full min-w-0 rounded-md border bg-transparent px-3 py-1 text-base shadow-xs outline-none md:text-sm",
        "focus-visible:border-ring focus-visible:ring-2 focus-visible:ring-ring/50",
        "aria-invalid:border-destructive aria-invalid:ring-destructive/20",
        class
    );

    view! {
        <input
            type="text"
            class=class
            id=id
            placeholder=placeholder
            aria-invalid=move || invalid.get().then_some("true")
            prop:value=move || bind_value.get()
            on:input=move |ev| bind_value.set(event_target_value(&ev))
        />
    }
}
