//! Per-navigation data loading.
//!
//! The manager is sans-IO: [`QueryLifecycleManager::navigate`] hands out a
//! [`PendingFetch`] and the caller feeds the network result back through
//! [`QueryLifecycleManager::resolve`]. That keeps the whole lifecycle
//! testable without a browser.
//!
//! # Lifecycle
//!
//! ```text
//!  navigate(url) ──► Loading ──resolve ok──► Ready ──navigate──► retained
//!                       │                                          │
//!                       ├──resolve err──► Failed ──navigate──► retained
//!                       │                                          │
//!                       └──navigate──► disposed      next query settles ──► disposed
//! ```
//!
//! A query still loading is dropped as soon as it is superseded, its view
//! was never mounted. A settled query keeps its records alive until the
//! query replacing it settles, so the old page can stay on screen while the
//! new one loads.

pub mod outcome;

use crate::api::operations::Operation;
use crate::api::{normalize, ApiError, ApiResult};
use crate::models::FieldMap;
use crate::router::{RouteMatch, Router, Url};
use crate::store::{RetainToken, StoreHandle};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

pub use outcome::{classify, PageOutcome};

/// One data load bound to one navigation.
///
/// Not `Clone`: the manager owns every `QueryRef` and consumes it on
/// dispose, so it cannot be disposed twice.
#[derive(Debug, PartialEq)]
pub struct QueryRef {
    generation: u64,
    route: usize,
    matched: RouteMatch,
    operation: Operation,
}

impl QueryRef {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn route(&self) -> usize {
        self.route
    }

    pub fn matched(&self) -> &RouteMatch {
        &self.matched
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }
}

/// Root fields of a loaded query. Linked records live in the store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryData {
    pub root: FieldMap,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryState {
    Loading,
    Ready(QueryData),
    Failed(ApiError),
}

/// What a fetch has to do on behalf of a navigation.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingFetch {
    pub generation: u64,
    pub operation: Operation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveOutcome {
    Applied,
    /// The result belongs to a superseded navigation and was dropped.
    Stale,
}

/// Snapshot of the navigation slot for the view layer.
#[derive(Clone, Debug, PartialEq)]
pub enum NavigationStatus {
    Idle,
    NotFound,
    Loading {
        matched: RouteMatch,
        /// Last page that loaded, kept on screen while the new one loads.
        previous: Option<(RouteMatch, QueryData)>,
    },
    Ready {
        matched: RouteMatch,
        data: QueryData,
    },
    Failed {
        matched: RouteMatch,
        error: ApiError,
    },
}

struct Slot {
    query: QueryRef,
    state: QueryState,
    retain: Option<RetainToken>,
}

pub struct QueryLifecycleManager {
    router: Router,
    store: StoreHandle,
    generation: u64,
    url: Option<Url>,
    latest: Option<Slot>,
    retained: Option<Slot>,
    not_found: bool,
}

impl QueryLifecycleManager {
    pub fn new(router: Router, store: StoreHandle) -> Self {
        Self {
            router,
            store,
            generation: 0,
            url: None,
            latest: None,
            retained: None,
            not_found: false,
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Starts a navigation. Returns the fetch to run, or `None` when no
    /// route matches.
    pub fn navigate(&mut self, url: &Url) -> Option<PendingFetch> {
        self.generation += 1;
        let generation = self.generation;
        self.url = Some(url.clone());

        if let Some(prev) = self.latest.take() {
            match prev.state {
                QueryState::Loading => {
                    debug!(generation = prev.query.generation, "superseded while loading");
                    self.dispose(prev);
                }
                _ => {
                    if let Some(older) = self.retained.replace(prev) {
                        self.dispose(older);
                    }
                }
            }
        }

        let Some(hit) = self.router.match_url(url) else {
            info!(%url, "no route matches");
            if let Some(old) = self.retained.take() {
                self.dispose(old);
            }
            self.not_found = true;
            self.store.collect_garbage();
            return None;
        };
        self.not_found = false;

        let Some(route) = self.router.route(hit.route) else {
            return None;
        };
        let operation = route.prepare(&hit.matched);
        debug!(generation, route = route.name(), operation = operation.name, "navigate");

        self.latest = Some(Slot {
            query: QueryRef {
                generation,
                route: hit.route,
                matched: hit.matched,
                operation: operation.clone(),
            },
            state: QueryState::Loading,
            retain: None,
        });
        Some(PendingFetch {
            generation,
            operation,
        })
    }

    /// Navigates to the current URL again, e.g. after a load failure.
    pub fn reload(&mut self) -> Option<PendingFetch> {
        let url = self.url.clone()?;
        self.navigate(&url)
    }

    /// Feeds the result of a fetch back. Results of superseded navigations
    /// are dropped without touching the store.
    pub fn resolve(&mut self, generation: u64, result: ApiResult<Value>) -> ResolveOutcome {
        let is_current = self
            .latest
            .as_ref()
            .map(|s| s.query.generation == generation && s.state == QueryState::Loading)
            .unwrap_or(false);
        if !is_current {
            trace!(generation, current = self.generation, "dropping stale response");
            return ResolveOutcome::Stale;
        }

        let normalized = result.and_then(|data| normalize(&data).map_err(ApiError::from));
        let (state, retain) = match normalized {
            Ok(n) => {
                let roots = n.root_ids();
                self.store.apply_server_snapshot(n.snapshot);
                let token = self.store.retain(roots);
                (QueryState::Ready(QueryData { root: n.root }), Some(token))
            }
            Err(error) => {
                warn!(generation, error = %error, "query failed");
                (QueryState::Failed(error), None)
            }
        };

        if let Some(slot) = self.latest.as_mut() {
            slot.state = state;
            slot.retain = retain;
        }
        if let Some(old) = self.retained.take() {
            self.dispose(old);
        }
        self.store.collect_garbage();
        ResolveOutcome::Applied
    }

    pub fn status(&self) -> NavigationStatus {
        if self.not_found {
            return NavigationStatus::NotFound;
        }
        let Some(slot) = &self.latest else {
            return NavigationStatus::Idle;
        };
        let matched = slot.query.matched.clone();
        match &slot.state {
            QueryState::Loading => NavigationStatus::Loading {
                matched,
                previous: self.retained.as_ref().and_then(|s| match &s.state {
                    QueryState::Ready(data) => Some((s.query.matched.clone(), data.clone())),
                    _ => None,
                }),
            },
            QueryState::Ready(data) => NavigationStatus::Ready {
                matched,
                data: data.clone(),
            },
            QueryState::Failed(error) => NavigationStatus::Failed {
                matched,
                error: error.clone(),
            },
        }
    }

    /// Data of the page currently on screen, if it has settled.
    pub fn current_data(&self) -> Option<(&RouteMatch, &QueryData)> {
        let slot = self.latest.as_ref()?;
        match &slot.state {
            QueryState::Ready(data) => Some((&slot.query.matched, data)),
            _ => None,
        }
    }

    fn dispose(&mut self, slot: Slot) {
        if let Some(route) = self.router.route(slot.query.route) {
            route.dispose(&slot.query);
        }
        if let Some(token) = slot.retain {
            self.store.release(token);
        }
        trace!(generation = slot.query.generation, "query disposed");
    }
}

impl Drop for QueryLifecycleManager {
    fn drop(&mut self) {
        for slot in [self.latest.take(), self.retained.take()].into_iter().flatten() {
            self.dispose(slot);
        }
    }
}
