use super::video_list::VideoListVars;
use super::{RouteDefinition, Url};
use crate::api::operations::{self, Operation};
use std::sync::Arc;

pub const MANAGE_PATH: &str = "/~manage";
pub const REALM_SETTINGS_PATH: &str = "/~manage/realm";
pub const ADD_CHILD_PATH: &str = "/~manage/realm/add-child";
pub const REALM_CONTENT_PATH: &str = "/~manage/realm/content";
pub const VIDEOS_PATH: &str = "/~manage/videos";

/// A matched route with its typed parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RouteMatch {
    Dashboard,
    RealmSettings { path: String },
    AddChild { parent: String },
    RealmContent { path: String },
    Videos(VideoListVars),
}

impl RouteMatch {
    /// Canonical URL of this match.
    pub fn to_url(&self) -> Url {
        match self {
            Self::Dashboard => Url::new(MANAGE_PATH),
            Self::RealmSettings { path } => Url::new(REALM_SETTINGS_PATH).with_param("path", path),
            Self::AddChild { parent } => Url::new(ADD_CHILD_PATH).with_param("parent", parent),
            Self::RealmContent { path } => Url::new(REALM_CONTENT_PATH).with_param("path", path),
            Self::Videos(vars) => Url {
                path: VIDEOS_PATH.to_string(),
                query: vars.encode(),
            },
        }
    }
}

/// The route table, in matching order.
pub fn all() -> Vec<Arc<dyn RouteDefinition>> {
    vec![
        Arc::new(DashboardRoute),
        Arc::new(RealmSettingsRoute),
        Arc::new(AddChildRoute),
        Arc::new(RealmContentRoute),
        Arc::new(VideosRoute),
    ]
}

pub struct DashboardRoute;

impl RouteDefinition for DashboardRoute {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn matches(&self, url: &Url) -> Option<RouteMatch> {
        (url.path == MANAGE_PATH).then_some(RouteMatch::Dashboard)
    }

    fn prepare(&self, _matched: &RouteMatch) -> Operation {
        operations::dashboard()
    }
}

pub struct RealmSettingsRoute;

impl RouteDefinition for RealmSettingsRoute {
    fn name(&self) -> &'static str {
        "realm-settings"
    }

    fn matches(&self, url: &Url) -> Option<RouteMatch> {
        if url.path != REALM_SETTINGS_PATH {
            return None;
        }
        let path = url.param("path")?;
        Some(RouteMatch::RealmSettings { path: path.to_string() })
    }

    fn prepare(&self, matched: &RouteMatch) -> Operation {
        match matched {
            RouteMatch::RealmSettings { path } => operations::realm_settings(path),
            other => mismatched(self, other),
        }
    }
}

pub struct AddChildRoute;

impl RouteDefinition for AddChildRoute {
    fn name(&self) -> &'static str {
        "add-child"
    }

    fn matches(&self, url: &Url) -> Option<RouteMatch> {
        if url.path != ADD_CHILD_PATH {
            return None;
        }
        let parent = url.param("parent")?;
        Some(RouteMatch::AddChild { parent: parent.to_string() })
    }

    fn prepare(&self, matched: &RouteMatch) -> Operation {
        match matched {
            RouteMatch::AddChild { parent } => operations::add_child(parent),
            other => mismatched(self, other),
        }
    }
}

pub struct RealmContentRoute;

impl RouteDefinition for RealmContentRoute {
    fn name(&self) -> &'static str {
        "realm-content"
    }

    fn matches(&self, url: &Url) -> Option<RouteMatch> {
        if url.path != REALM_CONTENT_PATH {
            return None;
        }
        let path = url.param("path")?;
        Some(RouteMatch::RealmContent { path: path.to_string() })
    }

    fn prepare(&self, matched: &RouteMatch) -> Operation {
        match matched {
            RouteMatch::RealmContent { path } => operations::realm_content(path),
            other => mismatched(self, other),
        }
    }
}

pub struct VideosRoute;

impl RouteDefinition for VideosRoute {
    fn name(&self) -> &'static str {
        "videos"
    }

    fn matches(&self, url: &Url) -> Option<RouteMatch> {
        if url.path != VIDEOS_PATH {
            return None;
        }
        let vars = VideoListVars::decode(|key| url.param(key).map(str::to_string));
        Some(RouteMatch::Videos(vars))
    }

    fn prepare(&self, matched: &RouteMatch) -> Operation {
        match matched {
            RouteMatch::Videos(vars) => operations::videos(vars),
            other => mismatched(self, other),
        }
    }
}

// A route is only ever asked to prepare its own matches. Falling back to the
// dashboard query keeps the navigation alive if that contract is broken.
fn mismatched(route: &dyn RouteDefinition, matched: &RouteMatch) -> Operation {
    tracing::error!(route = route.name(), ?matched, "route asked to prepare a foreign match");
    operations::dashboard()
}
