//! GraphQL documents and the variables they are sent with.
//!
//! Every object that carries an `id` also selects `__typename`, the
//! normalizer needs both to build a record.

use crate::models::BlockInput;
use crate::router::video_list::VideoListVars;
use serde::Serialize;
use serde_json::{json, Value};

/// A query or mutation ready to be posted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Operation {
    #[serde(rename = "operationName")]
    pub name: &'static str,
    #[serde(rename = "query")]
    pub document: &'static str,
    pub variables: Value,
}

macro_rules! with_block_fields {
    ($head:literal, $tail:literal) => {
        concat!(
            $head,
            r#"
    __typename id
    ... on TitleBlock { content }
    ... on TextBlock { content }
    ... on SeriesBlock { series { __typename id title } order showTitle showMetadata }
    ... on VideoBlock { event { __typename id title } showTitle }
"#,
            $tail
        )
    };
}

const DASHBOARD: &str = r#"
query ManageDashboard {
    currentUser { __typename username displayName }
}"#;

const REALM_SETTINGS: &str = r#"
query RealmManage($path: String!) {
    currentUser { __typename username displayName }
    realm: realmByPath(path: $path) {
        __typename id name isRoot path canCurrentUserEdit numberOfDescendants
        children { __typename id name path }
    }
}"#;

const ADD_CHILD: &str = r#"
query AddChild($parent: String!) {
    currentUser { __typename username displayName }
    parent: realmByPath(path: $parent) {
        __typename id name isRoot path canCurrentUserEdit
        children { __typename id name path }
    }
}"#;

const REALM_CONTENT: &str = with_block_fields!(
    r#"
query RealmContent($path: String!) {
    currentUser { __typename username displayName }
    realm: realmByPath(path: $path) {
        __typename id name isRoot path canCurrentUserEdit
        blocks {"#,
    r#"}
    }
}"#
);

const VIDEOS: &str = r#"
query VideoManage($order: EventSortOrder!, $after: Cursor, $before: Cursor, $first: Int, $last: Int) {
    currentUser {
        __typename username displayName
        myVideos(order: $order, after: $after, before: $before, first: $first, last: $last) {
            totalCount
            pageInfo { hasNextPage hasPreviousPage startCursor endCursor startIndex endIndex }
            items { __typename id title duration thumbnail created updated description }
        }
    }
}"#;

const ADD_CHILD_REALM: &str = r#"
mutation AddChildRealm($realm: NewRealm!) {
    addRealm(realm: $realm) {
        __typename id name path
        parent { __typename id children { __typename id name path } }
    }
}"#;

pub fn dashboard() -> Operation {
    Operation {
        name: "ManageDashboard",
        document: DASHBOARD,
        variables: json!({}),
    }
}

pub fn realm_settings(path: &str) -> Operation {
    Operation {
        name: "RealmManage",
        document: REALM_SETTINGS,
        variables: json!({ "path": path }),
    }
}

pub fn add_child(parent: &str) -> Operation {
    Operation {
        name: "AddChild",
        document: ADD_CHILD,
        variables: json!({ "parent": parent }),
    }
}

pub fn realm_content(path: &str) -> Operation {
    Operation {
        name: "RealmContent",
        document: REALM_CONTENT,
        variables: json!({ "path": path }),
    }
}

pub fn videos(vars: &VideoListVars) -> Operation {
    Operation {
        name: "VideoManage",
        document: VIDEOS,
        variables: vars.to_variables(),
    }
}

pub fn add_child_realm(parent: &str, name: &str, path_segment: &str) -> Operation {
    Operation {
        name: "AddChildRealm",
        document: ADD_CHILD_REALM,
        variables: json!({
            "realm": { "parent": parent, "name": name, "pathSegment": path_segment },
        }),
    }
}

/// Root field of the create mutation for a block of this kind.
pub fn create_block_field(input: &BlockInput) -> &'static str {
    use crate::models::BlockKind::*;
    match input.kind() {
        Title => "addTitleBlock",
        Text => "addTextBlock",
        Series => "addSeriesBlock",
        Video => "addVideoBlock",
    }
}

/// Root field of the update mutation for a block of this kind.
pub fn update_block_field(input: &BlockInput) -> &'static str {
    use crate::models::BlockKind::*;
    match input.kind() {
        Title => "updateTitleBlock",
        Text => "updateTextBlock",
        Series => "updateSeriesBlock",
        Video => "updateVideoBlock",
    }
}

const ADD_TITLE_BLOCK: &str = with_block_fields!(
    "mutation AddTitleBlock($realm: ID!, $index: Int!, $block: NewTitleBlock!) {\n    addTitleBlock(realm: $realm, index: $index, block: $block) {\n        __typename id\n        blocks {",
    "}\n    }\n}"
);
const ADD_TEXT_BLOCK: &str = with_block_fields!(
    "mutation AddTextBlock($realm: ID!, $index: Int!, $block: NewTextBlock!) {\n    addTextBlock(realm: $realm, index: $index, block: $block) {\n        __typename id\n        blocks {",
    "}\n    }\n}"
);
const ADD_SERIES_BLOCK: &str = with_block_fields!(
    "mutation AddSeriesBlock($realm: ID!, $index: Int!, $block: NewSeriesBlock!) {\n    addSeriesBlock(realm: $realm, index: $index, block: $block) {\n        __typename id\n        blocks {",
    "}\n    }\n}"
);
const ADD_VIDEO_BLOCK: &str = with_block_fields!(
    "mutation AddVideoBlock($realm: ID!, $index: Int!, $block: NewVideoBlock!) {\n    addVideoBlock(realm: $realm, index: $index, block: $block) {\n        __typename id\n        blocks {",
    "}\n    }\n}"
);

const UPDATE_TITLE_BLOCK: &str = with_block_fields!(
    "mutation UpdateTitleBlock($id: ID!, $set: UpdateTitleBlock!) {\n    updateTitleBlock(id: $id, set: $set) {",
    "}\n}"
);
const UPDATE_TEXT_BLOCK: &str = with_block_fields!(
    "mutation UpdateTextBlock($id: ID!, $set: UpdateTextBlock!) {\n    updateTextBlock(id: $id, set: $set) {",
    "}\n}"
);
const UPDATE_SERIES_BLOCK: &str = with_block_fields!(
    "mutation UpdateSeriesBlock($id: ID!, $set: UpdateSeriesBlock!) {\n    updateSeriesBlock(id: $id, set: $set) {",
    "}\n}"
);
const UPDATE_VIDEO_BLOCK: &str = with_block_fields!(
    "mutation UpdateVideoBlock($id: ID!, $set: UpdateVideoBlock!) {\n    updateVideoBlock(id: $id, set: $set) {",
    "}\n}"
);

pub fn create_block(realm: &str, index: usize, input: &BlockInput) -> Operation {
    use crate::models::BlockKind::*;
    let (name, document) = match input.kind() {
        Title => ("AddTitleBlock", ADD_TITLE_BLOCK),
        Text => ("AddTextBlock", ADD_TEXT_BLOCK),
        Series => ("AddSeriesBlock", ADD_SERIES_BLOCK),
        Video => ("AddVideoBlock", ADD_VIDEO_BLOCK),
    };
    Operation {
        name,
        document,
        variables: json!({
            "realm": realm,
            "index": index,
            "block": input.to_graphql_input(),
        }),
    }
}

pub fn update_block(id: &str, input: &BlockInput) -> Operation {
    use crate::models::BlockKind::*;
    let (name, document) = match input.kind() {
        Title => ("UpdateTitleBlock", UPDATE_TITLE_BLOCK),
        Text => ("UpdateTextBlock", UPDATE_TEXT_BLOCK),
        Series => ("UpdateSeriesBlock", UPDATE_SERIES_BLOCK),
        Video => ("UpdateVideoBlock", UPDATE_VIDEO_BLOCK),
    };
    Operation {
        name,
        document,
        variables: json!({ "id": id, "set": input.to_graphql_input() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_FIELDS: &str = "__typename id
    ... on TitleBlock { content }
    ... on TextBlock { content }
    ... on SeriesBlock { series { __typename id title } order showTitle showMetadata }
    ... on VideoBlock { event { __typename id title } showTitle }";

    #[test]
    fn test_block_documents_select_typename() {
        for doc in [REALM_CONTENT, ADD_VIDEO_BLOCK, UPDATE_SERIES_BLOCK] {
            assert!(doc.contains(BLOCK_FIELDS));
        }
    }

    #[test]
    fn test_create_block_variables() {
        let input = BlockInput::Video {
            event: None,
            show_title: true,
        };
        let op = create_block("r1", 0, &input);
        assert_eq!(op.name, "AddVideoBlock");
        assert_eq!(create_block_field(&input), "addVideoBlock");
        assert_eq!(
            op.variables,
            json!({ "realm": "r1", "index": 0, "block": { "showTitle": true } })
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(realm_settings("/a")).unwrap();
        assert_eq!(body["operationName"], "RealmManage");
        assert_eq!(body["variables"], json!({ "path": "/a" }));
        assert!(body["query"].as_str().unwrap().contains("realmByPath"));
    }
}
