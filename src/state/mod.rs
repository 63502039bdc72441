use crate::api::{ApiClient, GraphQlNetwork};
use crate::config::AppConfig;
use crate::editor::{BlockListEditor, CancelOutcome, SubmitError};
use crate::models::{BlockKind, BlockValues, FieldMap, RecordId};
use crate::navigation::{NavigationStatus, PendingFetch, QueryLifecycleManager};
use crate::router::{Router, Url};
use crate::session::{LogoutOutcome, LogoutState};
use crate::store::{FieldSelection, Listener, StoreHandle};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::sync::Arc;
use tracing::{debug, error};

/// Application-wide state. Cheap to copy; all fields are arena handles.
#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub config: StoredValue<AppConfig>,
    pub api_client: RwSignal<ApiClient>,
    pub store: StoredValue<StoreHandle>,
    pub navigation: StoredValue<QueryLifecycleManager>,
    pub editor: StoredValue<BlockListEditor>,

    /// Mirror of the navigation slot, refreshed after every transition.
    pub status: RwSignal<NavigationStatus>,

    /// Bumped whenever block form state changes outside the store.
    pub forms_version: RwSignal<u64>,

    pub logout: RwSignal<LogoutState>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = StoreHandle::new();
        Self {
            api_client: RwSignal::new(ApiClient::new(&config)),
            config: StoredValue::new(config),
            navigation: StoredValue::new(QueryLifecycleManager::new(Router::default(), store.clone())),
            editor: StoredValue::new(BlockListEditor::new(store.clone())),
            store: StoredValue::new(store),
            status: RwSignal::new(NavigationStatus::Idle),
            forms_version: RwSignal::new(0),
            logout: RwSignal::new(LogoutState::Idle),
        }
    }

    /// Mirrors the navigation slot and drops forms whose blocks the last
    /// transition evicted.
    fn sync_status(&self) {
        let status = self.navigation.with_value(|m| m.status());
        self.status.set(status);
        if self.editor.try_update_value(|e| e.prune_forms()).unwrap_or(0) > 0 {
            self.bump_forms();
        }
    }

    pub fn navigate(&self, url: Url) {
        let fetch = self.navigation.try_update_value(|m| m.navigate(&url)).flatten();
        self.sync_status();
        if let Some(fetch) = fetch {
            self.run_fetch(fetch);
        }
    }

    pub fn reload(&self) {
        let fetch = self.navigation.try_update_value(|m| m.reload()).flatten();
        self.sync_status();
        if let Some(fetch) = fetch {
            self.run_fetch(fetch);
        }
    }

    fn run_fetch(&self, fetch: PendingFetch) {
        let state = *self;
        let client = self.api_client.get_untracked();
        spawn_local(async move {
            let result = client.execute(&fetch.operation).await;
            state
                .navigation
                .update_value(|m| {
                    m.resolve(fetch.generation, result);
                });
            state.sync_status();
        });
    }

    /// Returns a counter that ticks whenever `record` changes in the store.
    /// The subscription ends with the calling component.
    pub fn watch_record(&self, record: RecordId) -> RwSignal<u64> {
        let tick = RwSignal::new(0u64);
        let listener: Listener = Arc::new(move || {
            tick.try_update(|v| *v += 1);
        });
        let store = self.store.get_value();
        let id = store.subscribe(record, FieldSelection::All, listener);
        on_cleanup(move || {
            store.unsubscribe(id);
        });
        tick
    }

    fn bump_forms(&self) {
        self.forms_version.update(|v| *v += 1);
    }

    pub fn insert_block(&self, realm: &RecordId, index: usize, kind: BlockKind) {
        let inserted = self
            .editor
            .try_update_value(|e| e.insert_block(realm, index, kind, FieldMap::new()));
        if let Some(Ok(id)) = inserted {
            debug!(block = %id, index, "block inserted");
        }
        self.bump_forms();
    }

    pub fn set_edit_mode(&self, block: &RecordId, on: bool) {
        if let Some(Err(e)) = self.editor.try_update_value(|e| e.set_edit_mode(block, on)) {
            error!(block = %block, error = %e, "cannot toggle edit mode");
        }
        self.bump_forms();
    }

    pub fn update_form(&self, block: &RecordId, values: BlockValues) {
        if let Some(Err(e)) = self.editor.try_update_value(|e| e.update_form(block, values)) {
            error!(block = %block, error = %e, "cannot update block form");
        }
        self.bump_forms();
    }

    /// Validates and sends the block. Validation errors end up on the form.
    pub fn submit_block(&self, block: RecordId, values: BlockValues) {
        let submitted = self.editor.try_update_value(|e| e.submit_block(&block, values));
        self.bump_forms();
        let request = match submitted {
            Some(Ok(request)) => request,
            Some(Err(SubmitError::Invalid(errors))) => {
                debug!(block = %block, %errors, "block form invalid");
                return;
            }
            Some(Err(e)) => {
                error!(block = %block, error = %e, "cannot submit block");
                return;
            }
            None => return,
        };

        let state = *self;
        let client = self.api_client.get_untracked();
        spawn_local(async move {
            let result = client.execute(&request.operation()).await;
            let outcome = state
                .editor
                .try_update_value(|e| e.complete_submit(request.ticket, result));
            if let Some(Err(e)) = outcome {
                error!(block = %request.block, error = %e, "submit finished without a request");
            }
            state.bump_forms();
        });
    }

    /// Leaves edit mode, asking first when the form has unsaved edits.
    pub fn cancel_edit(&self, block: &RecordId) {
        let mut outcome = self.editor.try_update_value(|e| e.cancel_edit(block, false));
        if let Some(Ok(CancelOutcome::NeedsConfirmation)) = outcome {
            let confirmed = window()
                .confirm_with_message("Discard your changes to this block?")
                .unwrap_or(false);
            if !confirmed {
                return;
            }
            outcome = self.editor.try_update_value(|e| e.cancel_edit(block, true));
        }
        match outcome {
            Some(Ok(outcome)) => debug!(block = %block, ?outcome, "edit cancelled"),
            Some(Err(e)) => error!(block = %block, error = %e, "cannot cancel edit"),
            None => {}
        }
        self.bump_forms();
    }

    /// Deletes the session, then leaves the app. Clicks while a logout is
    /// running are ignored.
    pub fn logout(&self) {
        let mut current = self.logout.get_untracked();
        if !current.begin() {
            return;
        }
        self.logout.set(current);

        let state = *self;
        let client = self.api_client.get_untracked();
        spawn_local(async move {
            let result = client.delete_session().await;
            let outcome = state.logout.try_update(|s| s.finish(result));
            if let Some(LogoutOutcome::Redirect(to)) = outcome {
                if let Err(e) = window().location().set_href(to) {
                    state.logout.update(|s| s.redirect_failed(to, &format!("{e:?}")));
                }
            }
        });
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);
