//! URL to route matching.
//!
//! Matching is pure: it only looks at the URL and never starts a fetch.
//! Loading the data of a matched route is the job of
//! [`crate::navigation::QueryLifecycleManager`].

pub mod routes;
pub mod video_list;

use crate::api::operations::Operation;
use crate::navigation::QueryRef;
use std::fmt;
use std::sync::Arc;

pub use routes::RouteMatch;

/// Path plus decoded query parameters, in their original order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Url {
    pub path: String,
    pub query: Vec<(String, String)>,
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    match urlencoding::decode(&s) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s,
    }
}

impl Url {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Parses `path?query#fragment`. The fragment is dropped, a parameter
    /// without `=` has an empty value.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.split('#').next().unwrap_or_default();
        let (path, search) = raw.split_once('?').unwrap_or((raw, ""));
        let query = search
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(k), decode_component(v))
            })
            .collect();

        Self {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// First value of `key`, if present.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.param(key).is_some()
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for (i, (k, v)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            if v.is_empty() {
                write!(f, "{sep}{}", urlencoding::encode(k))?;
            } else {
                write!(f, "{sep}{}={}", urlencoding::encode(k), urlencoding::encode(v))?;
            }
        }
        Ok(())
    }
}

/// One entry of the route table.
pub trait RouteDefinition: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `None` when the URL is not for this route, including when a
    /// required parameter is missing.
    fn matches(&self, url: &Url) -> Option<RouteMatch>;

    /// The query whose data has to be loaded before the route renders.
    fn prepare(&self, matched: &RouteMatch) -> Operation;

    /// Called exactly once when a query prepared by this route is dropped.
    fn dispose(&self, _query: &QueryRef) {}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matched {
    pub route: usize,
    pub matched: RouteMatch,
}

/// Ordered route table; the first matching route wins.
#[derive(Clone)]
pub struct Router {
    routes: Vec<Arc<dyn RouteDefinition>>,
}

impl Router {
    pub fn new(routes: Vec<Arc<dyn RouteDefinition>>) -> Self {
        Self { routes }
    }

    pub fn match_url(&self, url: &Url) -> Option<Matched> {
        self.routes.iter().enumerate().find_map(|(route, def)| {
            def.matches(url).map(|matched| Matched { route, matched })
        })
    }

    pub fn route(&self, index: usize) -> Option<&Arc<dyn RouteDefinition>> {
        self.routes.get(index)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(routes::all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_decodes_query() {
        let url = Url::parse("/~manage/realm?path=%2Flectures%2Fphysics&x=a+b&lastPage#top");
        assert_eq!(url.path, "/~manage/realm");
        assert_eq!(url.param("path"), Some("/lectures/physics"));
        assert_eq!(url.param("x"), Some("a b"));
        assert_eq!(url.param("lastPage"), Some(""));
        assert!(!url.has_param("missing"));
    }

    #[test]
    fn test_display_encodes_query() {
        let url = Url::new("/~manage/realm/add-child").with_param("parent", "/a b");
        assert_eq!(url.to_string(), "/~manage/realm/add-child?parent=%2Fa%20b");
        assert_eq!(Url::parse(&url.to_string()), url);
        assert_eq!(Url::new("/x").with_param("lastPage", "").to_string(), "/x?lastPage");
    }

    #[test]
    fn test_empty_path_is_root() {
        assert_eq!(Url::parse("").path, "/");
        assert_eq!(Url::parse("?a=1").path, "/");
    }

    /// Matches when the URL carries `param`, regardless of the path.
    struct ParamRoute {
        param: &'static str,
    }

    impl RouteDefinition for ParamRoute {
        fn name(&self) -> &'static str {
            self.param
        }

        fn matches(&self, url: &Url) -> Option<RouteMatch> {
            url.param(self.param).map(|v| RouteMatch::RealmSettings { path: v.to_string() })
        }

        fn prepare(&self, _matched: &RouteMatch) -> Operation {
            crate::api::operations::dashboard()
        }
    }

    const PARAMS: [&str; 4] = ["a", "b", "c", "d"];

    proptest! {
        #[test]
        fn prop_first_match_equals_linear_scan(
            table in proptest::collection::vec(0usize..4, 0..6),
            present in proptest::collection::vec(any::<bool>(), 4),
        ) {
            let defs: Vec<Arc<dyn RouteDefinition>> = table
                .iter()
                .map(|&i| Arc::new(ParamRoute { param: PARAMS[i] }) as Arc<dyn RouteDefinition>)
                .collect();
            let router = Router::new(defs.clone());

            let mut url = Url::new("/");
            for (i, on) in present.iter().enumerate() {
                if *on {
                    url = url.with_param(PARAMS[i], format!("v{i}"));
                }
            }

            let expected = defs
                .iter()
                .position(|d| d.matches(&url).is_some())
                .map(|route| Matched { route, matched: defs[route].matches(&url).unwrap() });
            prop_assert_eq!(router.match_url(&url), expected.clone());
            prop_assert_eq!(router.match_url(&url), expected);
        }
    }
}
