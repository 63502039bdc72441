mod content;
mod videos;

use crate::api::ApiError;
use crate::components::ui::{
    Alert, AlertDescription, AlertTitle, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription,
    CardHeader, CardItem, CardList, CardTitle, Input, Label, Spinner,
};
use crate::dispatch::realm::add_child_realm;
use crate::models::realm::{NewRealm, NewRealmErrors, RealmFieldError};
use crate::models::{FieldValue, RealmView};
use crate::navigation::{classify, NavigationStatus, PageOutcome, QueryData};
use crate::router::routes::{MANAGE_PATH, VIDEOS_PATH};
use crate::router::RouteMatch;
use crate::session::LogoutState;
use crate::state::AppContext;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_navigate;

pub use content::ContentPage;
pub use videos::VideosPage;

fn href(matched: RouteMatch) -> String {
    matched.to_url().to_string()
}

/// Header with the management navigation and the user box.
#[component]
pub fn ManageShell(children: Children) -> impl IntoView {
    view! {
        <div class="min-h-screen bg-background">
            <header class="border-b">
                <div class="mx-auto flex h-12 w-full max-w-5xl items-center gap-4 px-4">
                    <a href="/" class="text-sm font-semibold text-foreground">"Video portal"</a>
                    <nav class="flex items-center gap-3 text-xs text-muted-foreground">
                        <a class="hover:text-foreground" href=MANAGE_PATH>"Manage"</a>
                        <a class="hover:text-foreground" href=VIDEOS_PATH>"My videos"</a>
                    </nav>
                    <div class="ml-auto">
                        <UserBox />
                    </div>
                </div>
            </header>
            <main class="mx-auto w-full max-w-5xl px-4 py-6">{children()}</main>
        </div>
    }
}

#[component]
fn UserBox() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let status = app_state.0.status;
    let logout = app_state.0.logout;
    let logout_link = app_state.0.config.with_value(|c| c.logout_link.clone());

    // Keep the last known name while the next page loads.
    let display_name: RwSignal<Option<String>> = RwSignal::new(None);
    Effect::new(move |_| {
        if let NavigationStatus::Ready { data, .. } = status.get() {
            let name = data
                .root
                .get("currentUser")
                .and_then(FieldValue::as_json)
                .and_then(|user| user["displayName"].as_str().map(str::to_string));
            display_name.set(name);
        }
    });

    let logout_control = match logout_link {
        Some(link) => view! {
            <a class="text-xs text-primary underline-offset-4 hover:underline" href=link>"Log out"</a>
        }
        .into_any(),
        None => view! {
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                attr:disabled=move || logout.get() == LogoutState::Pending
                on:click=move |_| app_state.0.logout()
            >
                <Show when=move || logout.get() == LogoutState::Pending fallback=|| ().into_view()>
                    <Spinner />
                </Show>
                "Log out"
            </Button>
        }
        .into_any(),
    };

    view! {
        <div class="flex items-center gap-2">
            <span class="text-xs text-muted-foreground">
                {move || display_name.get().unwrap_or_default()}
            </span>
            <Show when=move || logout.get() == LogoutState::Error fallback=|| ().into_view()>
                <span class="text-xs text-destructive">"Logout failed"</span>
            </Show>
            {logout_control}
        </div>
    }
}

/// Renders whatever the navigation slot currently holds. While a page
/// loads, the last settled page stays visible under a loading bar.
#[component]
pub fn PageView() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let status = app_state.0.status;

    move || match status.get() {
        NavigationStatus::Idle => ().into_any(),
        NavigationStatus::NotFound => view! { <NotFoundPage /> }.into_any(),
        NavigationStatus::Loading { previous: None, .. } => view! { <LoadingPage /> }.into_any(),
        NavigationStatus::Loading {
            previous: Some((matched, data)),
            ..
        } => view! {
            <LoadingPage />
            <div class="pointer-events-none opacity-60">{settled_page(app_state, matched, data)}</div>
        }
        .into_any(),
        NavigationStatus::Failed { error, .. } => view! { <LoadErrorPage error=error /> }.into_any(),
        NavigationStatus::Ready { matched, data } => settled_page(app_state, matched, data),
    }
}

fn settled_page(app_state: AppContext, matched: RouteMatch, data: QueryData) -> AnyView {
    let outcome = app_state
        .0
        .store
        .with_value(|store| store.read(|s| classify(&matched, &data, s)));
    match (outcome, matched) {
        (PageOutcome::Dashboard, _) => view! { <DashboardPage /> }.into_any(),
        (PageOutcome::Realm(realm), RouteMatch::AddChild { .. }) => view! { <AddChildPage parent=realm /> }.into_any(),
        (PageOutcome::Realm(realm), RouteMatch::RealmContent { .. }) => view! { <ContentPage realm=realm /> }.into_any(),
        (PageOutcome::Realm(realm), _) => view! { <RealmSettingsPage realm=realm /> }.into_any(),
        (PageOutcome::Videos(connection), RouteMatch::Videos(vars)) => {
            view! { <VideosPage vars=vars connection=connection /> }.into_any()
        }
        (PageOutcome::Videos(_), _) => view! { <NotFoundPage /> }.into_any(),
        (PageOutcome::InvalidPath, _) => view! { <InvalidPathPage /> }.into_any(),
        (PageOutcome::NotAuthorized, _) => view! { <NotAuthorizedPage /> }.into_any(),
    }
}

#[component]
fn LoadingPage() -> impl IntoView {
    view! {
        <div class="flex items-center gap-2 py-8 text-xs text-muted-foreground">
            <Spinner />
            "Loading..."
        </div>
    }
}

#[component]
fn NotFoundPage() -> impl IntoView {
    view! {
        <div class="py-8 text-xs text-muted-foreground">
            "Page not found. "
            <a class="text-primary underline underline-offset-4" href=MANAGE_PATH>"Back to the dashboard"</a>
        </div>
    }
}

#[component]
fn InvalidPathPage() -> impl IntoView {
    view! {
        <Alert>
            <AlertTitle>"Invalid realm path"</AlertTitle>
            <AlertDescription class="text-xs">
                "There is no realm at this path. It may have been moved or deleted."
            </AlertDescription>
        </Alert>
    }
}

#[component]
fn NotAuthorizedPage() -> impl IntoView {
    view! {
        <Alert class="border-destructive/30">
            <AlertTitle>"Not authorized"</AlertTitle>
            <AlertDescription class="text-destructive text-xs">
                "You are not allowed to manage this page. Try logging in."
            </AlertDescription>
        </Alert>
    }
}

#[component]
fn LoadErrorPage(error: ApiError) -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    view! {
        <Alert class="border-destructive/30">
            <AlertTitle>"Could not load this page"</AlertTitle>
            <AlertDescription class="text-destructive text-xs">{error.to_string()}</AlertDescription>
            <Button class="mt-3" size=ButtonSize::Sm on:click=move |_| app_state.0.reload()>
                "Try again"
            </Button>
        </Alert>
    }
}

#[component]
fn DashboardPage() -> impl IntoView {
    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">"Manage"</CardTitle>
                <CardDescription class="text-xs">"Your videos and the pages you may edit."</CardDescription>
            </CardHeader>
            <CardContent>
                <CardList>
                    <CardItem>
                        <a class="text-sm text-primary underline-offset-4 hover:underline" href=VIDEOS_PATH>
                            "My videos"
                        </a>
                    </CardItem>
                    <CardItem>
                        <a
                            class="text-sm text-primary underline-offset-4 hover:underline"
                            href=href(RouteMatch::RealmSettings { path: "/".to_string() })
                        >
                            "Root page"
                        </a>
                    </CardItem>
                </CardList>
            </CardContent>
        </Card>
    }
}

#[component]
fn RealmSettingsPage(realm: RealmView) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let children: Vec<(String, String)> = app_state.0.store.with_value(|store| {
        realm
            .children
            .iter()
            .filter_map(|id| store.record(id).as_ref().and_then(RealmView::from_record))
            .map(|child| (child.name.unwrap_or_else(|| child.path.clone()), child.path))
            .collect()
    });

    let title = realm.name.clone().unwrap_or_else(|| "Root page".to_string());
    let content_href = href(RouteMatch::RealmContent { path: realm.path.clone() });
    let add_child_href = href(RouteMatch::AddChild { parent: realm.path.clone() });

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">{title}</CardTitle>
                <CardDescription class="text-xs">
                    {realm.path.clone()}
                    {(!realm.is_root)
                        .then(|| format!(" · {} subpages", realm.number_of_descendants))}
                </CardDescription>
            </CardHeader>
            <CardContent>
                <div class="flex gap-3 text-sm">
                    <a class="text-primary underline-offset-4 hover:underline" href=content_href>"Edit content"</a>
                    <a class="text-primary underline-offset-4 hover:underline" href=add_child_href>"Add subpage"</a>
                </div>
                <CardList class="mt-4">
                    {children
                        .into_iter()
                        .map(|(name, path)| {
                            view! {
                                <CardItem>
                                    <a
                                        class="text-sm text-primary underline-offset-4 hover:underline"
                                        href=href(RouteMatch::RealmSettings { path })
                                    >
                                        {name}
                                    </a>
                                </CardItem>
                            }
                        })
                        .collect_view()}
                </CardList>
            </CardContent>
        </Card>
    }
}

fn field_error(error: Option<RealmFieldError>) -> impl IntoView {
    error.map(|e| view! { <p class="text-xs text-destructive">{e.to_string()}</p> })
}

#[component]
fn AddChildPage(parent: RealmView) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let name: RwSignal<String> = RwSignal::new(String::new());
    let path_segment: RwSignal<String> = RwSignal::new(String::new());
    let errors: RwSignal<NewRealmErrors> = RwSignal::new(NewRealmErrors::default());
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let parent_id = StoredValue::new(parent.id.as_persisted().unwrap_or_default().to_string());
    let parent_path = parent.path.clone();
    let prefix = if parent_path.ends_with('/') {
        parent_path.clone()
    } else {
        format!("{parent_path}/")
    };

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        if loading.get_untracked() {
            return;
        }

        let realm = match NewRealm::validate(&name.get_untracked(), &path_segment.get_untracked()) {
            Ok(realm) => realm,
            Err(e) => {
                errors.set(e);
                return;
            }
        };
        errors.set(NewRealmErrors::default());
        error.set(None);
        loading.set(true);

        let client = app_state.0.api_client.get_untracked();
        let store = app_state.0.store.get_value();
        let parent = parent_id.get_value();
        spawn_local(async move {
            match add_child_realm(&client, &store, &parent, &realm).await {
                Ok(path) => {
                    let url = href(RouteMatch::RealmContent { path });
                    navigate.with_value(|nav| nav(&url, Default::default()));
                }
                Err(e) => error.set(Some(e.to_string())),
            }
            loading.set(false);
        });
    };

    view! {
        <Card class="max-w-lg">
            <CardHeader>
                <CardTitle class="text-lg">"Add subpage"</CardTitle>
                <CardDescription class="text-xs">{format!("Below {parent_path}")}</CardDescription>
            </CardHeader>
            <CardContent>
                <form class="flex flex-col gap-3" on:submit=on_submit>
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="name" class="text-xs">"Name"</Label>
                        <Input
                            id="name"
                            bind_value=name
                            invalid=Signal::derive(move || errors.get().name.is_some())
                            class="h-8 text-sm"
                        />
                        {move || field_error(errors.get().name)}
                    </div>

                    <div class="flex flex-col gap-1.5">
                        <Label html_for="path-segment" class="text-xs">"Path segment"</Label>
                        <div class="flex items-center gap-1">
                            <span class="text-xs text-muted-foreground">{prefix}</span>
                            <Input
                                id="path-segment"
                                bind_value=path_segment
                                invalid=Signal::derive(move || errors.get().path_segment.is_some())
                                class="h-8 text-sm"
                            />
                        </div>
                        {move || field_error(errors.get().path_segment)}
                    </div>

                    <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                        {move || {
                            error.get().map(|e| {
                                view! {
                                    <Alert class="border-destructive/30">
                                        <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                                    </Alert>
                                }
                            })
                        }}
                    </Show>

                    <Button class="w-full" size=ButtonSize::Sm attr:disabled=move || loading.get()>
                        <span class="inline-flex items-center gap-2">
                            <Show when=move || loading.get() fallback=|| ().into_view()>
                                <Spinner />
                            </Show>
                            {move || if loading.get() { "Creating..." } else { "Create page" }}
                        </span>
                    </Button>
                </form>
            </CardContent>
        </Card>
    }
}
