use super::QueryData;
use crate::models::{FieldValue, RealmView, RecordId};
use crate::router::RouteMatch;
use crate::store::RecordStore;

/// How a loaded page is presented.
#[derive(Clone, Debug, PartialEq)]
pub enum PageOutcome {
    Dashboard,
    Realm(RealmView),
    Videos(serde_json::Value),
    /// The realm the URL points at does not exist.
    InvalidPath,
    NotAuthorized,
}

fn linked(data: &QueryData, field: &str) -> Option<RecordId> {
    data.root.get(field).and_then(FieldValue::as_link).cloned()
}

/// Decides what to render for a settled query. A missing entity and a
/// forbidden one are never conflated.
pub fn classify(matched: &RouteMatch, data: &QueryData, store: &RecordStore) -> PageOutcome {
    let realm_field = match matched {
        RouteMatch::Dashboard => return PageOutcome::Dashboard,
        RouteMatch::Videos(_) => {
            return match data.root.get("currentUser").and_then(FieldValue::as_json) {
                Some(user) if !user.is_null() => PageOutcome::Videos(user["myVideos"].clone()),
                _ => PageOutcome::NotAuthorized,
            };
        }
        RouteMatch::AddChild { .. } => "parent",
        RouteMatch::RealmSettings { .. } | RouteMatch::RealmContent { .. } => "realm",
    };

    let realm = linked(data, realm_field)
        .and_then(|id| store.read(&id))
        .and_then(RealmView::from_record);
    match realm {
        None => PageOutcome::InvalidPath,
        Some(realm) if !realm.can_current_user_edit => PageOutcome::NotAuthorized,
        Some(realm) => PageOutcome::Realm(realm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::normalize;
    use crate::router::video_list::VideoListVars;
    use serde_json::json;

    fn load(data: serde_json::Value) -> (QueryData, RecordStore) {
        let n = normalize(&data).unwrap();
        let mut store = RecordStore::new();
        store.apply_server_snapshot(n.snapshot).notify();
        (QueryData { root: n.root }, store)
    }

    fn settings() -> RouteMatch {
        RouteMatch::RealmSettings { path: "/x".into() }
    }

    #[test]
    fn test_null_realm_is_invalid_path() {
        let (data, store) = load(json!({ "realm": null }));
        assert_eq!(classify(&settings(), &data, &store), PageOutcome::InvalidPath);
    }

    #[test]
    fn test_forbidden_realm_is_not_authorized() {
        let (data, store) = load(json!({
            "realm": { "__typename": "Realm", "id": "r1", "path": "/x", "canCurrentUserEdit": false },
        }));
        assert_eq!(classify(&settings(), &data, &store), PageOutcome::NotAuthorized);
    }

    #[test]
    fn test_editable_realm_renders() {
        let (data, store) = load(json!({
            "parent": { "__typename": "Realm", "id": "r1", "path": "/x", "canCurrentUserEdit": true },
        }));
        let outcome = classify(&RouteMatch::AddChild { parent: "/x".into() }, &data, &store);
        match outcome {
            PageOutcome::Realm(realm) => assert_eq!(realm.path, "/x"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_videos_need_a_user() {
        let videos = RouteMatch::Videos(VideoListVars::default());
        let (data, store) = load(json!({ "currentUser": null }));
        assert_eq!(classify(&videos, &data, &store), PageOutcome::NotAuthorized);

        let (data, store) = load(json!({ "currentUser": { "myVideos": { "totalCount": 0 } } }));
        assert_eq!(
            classify(&videos, &data, &store),
            PageOutcome::Videos(json!({ "totalCount": 0 }))
        );
    }
}
