use crate::api::operations;
use crate::api::{normalize, ApiError, ApiResult, GraphQlNetwork};
use crate::models::realm::NewRealm;
use crate::models::{fields, RealmView};
use crate::store::StoreHandle;
use tracing::{info, warn};

const ADD_REALM_FIELD: &str = "addRealm";

/// Creates a child realm below `parent` (a realm id) and merges the answer
/// into the store. Returns the new realm's path.
pub async fn add_child_realm(
    network: &dyn GraphQlNetwork,
    store: &StoreHandle,
    parent: &str,
    realm: &NewRealm,
) -> ApiResult<String> {
    let operation = operations::add_child_realm(parent, &realm.name, &realm.path_segment);
    let data = network.execute(&operation).await.inspect_err(|e| {
        warn!(parent, error = %e, "adding child realm failed");
    })?;

    let normalized = normalize(&data)?;
    let created = normalized
        .root
        .get(ADD_REALM_FIELD)
        .and_then(|v| v.as_link())
        .and_then(|id| normalized.snapshot.get(id))
        .and_then(RealmView::from_record)
        .ok_or_else(|| ApiError::parse(format!("{ADD_REALM_FIELD} returned no realm")))?;
    if created.path.is_empty() {
        return Err(ApiError::parse(format!("realm {} has no {}", created.id, fields::PATH)));
    }

    store.apply_server_snapshot(normalized.snapshot);
    info!(parent, path = %created.path, "child realm added");
    Ok(created.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeNetwork;
    use crate::models::{RecordId, REALM_TYPE};
    use futures::executor::block_on;
    use serde_json::json;

    fn physics() -> NewRealm {
        NewRealm::validate("Physics", "physics").unwrap()
    }

    #[test]
    fn test_add_child_merges_parent_children() {
        let network = FakeNetwork::default();
        network.respond(Ok(json!({
            "addRealm": {
                "__typename": "Realm", "id": "r2", "name": "Physics", "path": "/science/physics",
                "parent": {
                    "__typename": "Realm", "id": "r1",
                    "children": [{ "__typename": "Realm", "id": "r2", "name": "Physics", "path": "/science/physics" }],
                },
            },
        })));
        let store = StoreHandle::new();

        let path = block_on(add_child_realm(&network, &store, "r1", &physics())).unwrap();
        assert_eq!(path, "/science/physics");

        let parent = store.record(&RecordId::persisted("r1")).unwrap();
        assert_eq!(parent.type_tag, REALM_TYPE);
        assert_eq!(parent.links(fields::CHILDREN), Some(&[RecordId::persisted("r2")][..]));

        let sent = &network.requests.borrow()[0];
        assert_eq!(sent.name, "AddChildRealm");
        assert_eq!(sent.variables["realm"]["pathSegment"], "physics");
        assert_eq!(sent.variables["realm"]["parent"], "r1");
    }

    #[test]
    fn test_failure_leaves_store_alone() {
        let network = FakeNetwork::default();
        network.respond(Err(ApiError::graphql(&["path already taken".to_string()])));
        let store = StoreHandle::new();

        let err = block_on(add_child_realm(&network, &store, "r1", &physics())).unwrap_err();
        assert_eq!(err.message, "path already taken");
        assert!(store.read(|s| s.is_empty()));
    }

    #[test]
    fn test_missing_realm_in_answer_is_a_parse_error() {
        let network = FakeNetwork::default();
        network.respond(Ok(json!({ "addRealm": null })));
        let store = StoreHandle::new();

        let err = block_on(add_child_realm(&network, &store, "r1", &physics())).unwrap_err();
        assert_eq!(err.kind, crate::api::ApiErrorKind::Parse);
    }
}
