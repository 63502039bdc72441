//! Block editor of one realm.

use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription, CardHeader,
    CardTitle, Input, Label, Spinner,
};
use crate::models::{fields, BlockKind, BlockValues, BlockView, RealmView, RecordId, VideoListOrder};
use crate::router::RouteMatch;
use crate::state::AppContext;
use leptos::prelude::*;
use strum::IntoEnumIterator;

#[component]
pub fn ContentPage(realm: RealmView) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let realm_id = StoredValue::new(realm.id.clone());
    let tick = app_state.0.watch_record(realm.id.clone());

    let blocks = move || {
        tick.get();
        app_state
            .0
            .store
            .with_value(|store| store.record(&realm_id.get_value()))
            .and_then(|r| r.links(fields::BLOCKS).map(<[_]>::to_vec))
            .unwrap_or_default()
    };

    let title = realm.name.clone().unwrap_or_else(|| "Root page".to_string());
    let settings_href = super::href(RouteMatch::RealmSettings { path: realm.path.clone() });

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">{title}</CardTitle>
                <CardDescription class="text-xs">
                    <a class="text-primary underline-offset-4 hover:underline" href=settings_href>
                        {realm.path.clone()}
                    </a>
                </CardDescription>
            </CardHeader>
            <CardContent>
                {move || {
                    let blocks = blocks();
                    let len = blocks.len();
                    let mut rows = Vec::with_capacity(len * 2 + 1);
                    for (index, block) in blocks.into_iter().enumerate() {
                        rows.push(view! { <AddBlockRow realm=realm_id index=index /> }.into_any());
                        rows.push(view! { <BlockItem block=block /> }.into_any());
                    }
                    rows.push(view! { <AddBlockRow realm=realm_id index=len /> }.into_any());
                    rows
                }}
            </CardContent>
        </Card>
    }
}

#[component]
fn AddBlockRow(realm: StoredValue<RecordId>, index: usize) -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    view! {
        <div class="flex items-center gap-1 py-2 text-xs text-muted-foreground">
            <span>"Add"</span>
            {BlockKind::iter()
                .map(|kind| {
                    view! {
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Badge
                            on:click=move |_| app_state.0.insert_block(&realm.get_value(), index, kind)
                        >
                            {kind.label()}
                        </Button>
                    }
                })
                .collect_view()}
        </div>
    }
}

#[component]
fn BlockItem(block: RecordId) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let tick = app_state.0.watch_record(block.clone());
    let id = StoredValue::new(block);

    move || {
        tick.get();
        let record = app_state.0.store.with_value(|store| store.record(&id.get_value()));
        let Some(block_view) = record.as_ref().and_then(BlockView::from_record) else {
            return ().into_any();
        };
        if block_view.edit_mode {
            view! { <BlockEditForm block=id stored=block_view.values /> }.into_any()
        } else {
            view! { <BlockDisplay block=id values=block_view.values /> }.into_any()
        }
    }
}

/// Title of a linked series or event, if it is in the store.
fn linked_title(id: Option<String>) -> Option<String> {
    let app_state = expect_context::<AppContext>();
    let id = RecordId::persisted(id?);
    app_state
        .0
        .store
        .with_value(|store| store.record(&id))
        .and_then(|r| r.str(fields::TITLE).map(str::to_string))
        .or_else(|| Some(id.to_string()))
}

#[component]
fn BlockDisplay(block: StoredValue<RecordId>, values: BlockValues) -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let body = match values {
        BlockValues::Title { content } => view! { <h2 class="text-lg font-semibold">{content}</h2> }.into_any(),
        BlockValues::Text { content } => view! { <p class="text-sm whitespace-pre-wrap">{content}</p> }.into_any(),
        BlockValues::Series { series, order, .. } => {
            let title = linked_title(series).unwrap_or_else(|| "No series selected".to_string());
            let order = match order {
                VideoListOrder::NewToOld => "newest first",
                VideoListOrder::OldToNew => "oldest first",
            };
            view! { <p class="text-sm">{format!("Series: {title} ({order})")}</p> }.into_any()
        }
        BlockValues::Video { event, .. } => {
            let title = linked_title(event).unwrap_or_else(|| "No video selected".to_string());
            view! { <p class="text-sm">{format!("Video: {title}")}</p> }.into_any()
        }
    };

    view! {
        <div class="group flex items-start gap-2 rounded-md border px-3 py-2">
            <div class="flex-1">{body}</div>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                on:click=move |_| app_state.0.set_edit_mode(&block.get_value(), true)
            >
                "Edit"
            </Button>
        </div>
    }
}

fn checkbox(label: &'static str, value: RwSignal<bool>) -> impl IntoView {
    view! {
        <label class="flex items-center gap-2 text-xs">
            <input
                type="checkbox"
                prop:checked=move || value.get()
                on:change=move |ev| value.set(event_target_checked(&ev))
            />
            {label}
        </label>
    }
}

fn order_radio(
    label: &'static str,
    value: VideoListOrder,
    order: RwSignal<VideoListOrder>,
    group: String,
) -> impl IntoView {
    view! {
        <label class="flex items-center gap-2 text-xs">
            <input
                type="radio"
                name=group
                prop:checked=move || order.get() == value
                on:change=move |_| order.set(value)
            />
            {label}
        </label>
    }
}

/// Edit form of one block. Inputs are local signals seeded from the
/// editor's form state, or from the `stored` values when there is no form
/// yet; every change is reported back to the editor.
#[component]
fn BlockEditForm(block: StoredValue<RecordId>, stored: BlockValues) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let editor = app_state.0.editor;
    let forms_version = app_state.0.forms_version;

    let kind = stored.kind();
    let initial = editor
        .with_value(|e| e.form(&block.get_value()).map(|f| f.values.clone()))
        .unwrap_or(stored);

    let content = RwSignal::new(String::new());
    let reference = RwSignal::new(String::new());
    let order = RwSignal::new(VideoListOrder::default());
    let show_title = RwSignal::new(true);
    let show_metadata = RwSignal::new(false);
    match initial {
        BlockValues::Title { content: c } | BlockValues::Text { content: c } => content.set(c),
        BlockValues::Series {
            series,
            order: o,
            show_title: t,
            show_metadata: m,
        } => {
            reference.set(series.unwrap_or_default());
            order.set(o);
            show_title.set(t);
            show_metadata.set(m);
        }
        BlockValues::Video { event, show_title: t } => {
            reference.set(event.unwrap_or_default());
            show_title.set(t);
        }
    }

    let current = move || {
        let reference = Some(reference.get()).filter(|r| !r.is_empty());
        match kind {
            BlockKind::Title => BlockValues::Title { content: content.get() },
            BlockKind::Text => BlockValues::Text { content: content.get() },
            BlockKind::Series => BlockValues::Series {
                series: reference,
                order: order.get(),
                show_title: show_title.get(),
                show_metadata: show_metadata.get(),
            },
            BlockKind::Video => BlockValues::Video {
                event: reference,
                show_title: show_title.get(),
            },
        }
    };

    Effect::new(move |_| {
        let values = current();
        app_state.0.update_form(&block.get_value(), values);
    });

    let form_state = move || {
        forms_version.get();
        editor.with_value(|e| {
            e.form(&block.get_value()).map(|f| {
                let error = f
                    .errors
                    .iter()
                    .next()
                    .map(|(field, e)| format!("{field}: {e}"));
                (error, f.submit_error.as_ref().map(|e| e.to_string()), f.in_flight.is_some())
            })
        })
    };
    let in_flight = move || form_state().map(|(_, _, busy)| busy).unwrap_or(false);

    let radio_group = format!("order-{}", block.get_value());
    let fields_view = match kind {
        BlockKind::Title | BlockKind::Text => view! {
            <div class="flex flex-col gap-1.5">
                <Label class="text-xs">{kind.label()}</Label>
                <Input bind_value=content class="h-8 text-sm" />
            </div>
        }
        .into_any(),
        BlockKind::Series => view! {
            <div class="flex flex-col gap-1.5">
                <Label class="text-xs">"Series id"</Label>
                <Input bind_value=reference class="h-8 text-sm" />
                <div class="flex gap-3">
                    {order_radio("Newest first", VideoListOrder::NewToOld, order, radio_group.clone())}
                    {order_radio("Oldest first", VideoListOrder::OldToNew, order, radio_group)}
                </div>
                {checkbox("Show title", show_title)}
                {checkbox("Show metadata", show_metadata)}
            </div>
        }
        .into_any(),
        BlockKind::Video => view! {
            <div class="flex flex-col gap-1.5">
                <Label class="text-xs">"Video id"</Label>
                <Input bind_value=reference class="h-8 text-sm" />
                {checkbox("Show title", show_title)}
            </div>
        }
        .into_any(),
    };

    let on_save = move |_: leptos::ev::MouseEvent| app_state.0.submit_block(block.get_value(), current());

    view! {
        <div class="flex flex-col gap-3 rounded-md border border-primary/40 px-3 py-3">
            {fields_view}

            {move || {
                form_state()
                    .and_then(|(error, _, _)| error)
                    .map(|e| view! { <p class="text-xs text-destructive">{e}</p> })
            }}
            {move || {
                form_state()
                    .and_then(|(_, error, _)| error)
                    .map(|e| {
                        view! {
                            <Alert class="border-destructive/30">
                                <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                            </Alert>
                        }
                    })
            }}

            <div class="flex items-center gap-2">
                <Button size=ButtonSize::Sm attr:disabled=in_flight on:click=on_save>
                    <span class="inline-flex items-center gap-2">
                        <Show when=in_flight fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                        "Save"
                    </span>
                </Button>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Sm
                    attr:disabled=in_flight
                    on:click=move |_| app_state.0.cancel_edit(&block.get_value())
                >
                    "Cancel"
                </Button>
            </div>
        </div>
    }
}
