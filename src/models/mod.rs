pub mod block;
pub mod realm;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use block::{BlockInput, BlockKind, BlockValues, FieldErrors, ValidationError, VideoListOrder};

/// Display prefix for ids that only exist on this client.
///
/// Pending ids never travel to the server, so this only shows up in logs
/// and DOM keys.
pub const PENDING_PREFIX: &str = "client:pending:";

/// Identity of a record in the store.
///
/// Server ids and locally minted ids live in separate variants, so they can
/// never collide and the create/update decision is a pattern match.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordId {
    /// Minted locally; valid until the matching create mutation succeeds.
    Pending(u64),
    /// Assigned by the server.
    Persisted(String),
}

impl RecordId {
    pub fn persisted(id: impl Into<String>) -> Self {
        Self::Persisted(id.into())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn as_persisted(&self) -> Option<&str> {
        match self {
            Self::Persisted(id) => Some(id),
            Self::Pending(_) => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(n) => write!(f, "{PENDING_PREFIX}{n}"),
            Self::Persisted(id) => f.write_str(id),
        }
    }
}

/// Field names shared between the store, the editor and the views.
pub mod fields {
    pub const BLOCKS: &str = "blocks";
    pub const CHILDREN: &str = "children";
    pub const NAME: &str = "name";
    pub const PATH: &str = "path";
    pub const IS_ROOT: &str = "isRoot";
    pub const CAN_CURRENT_USER_EDIT: &str = "canCurrentUserEdit";
    pub const NUMBER_OF_DESCENDANTS: &str = "numberOfDescendants";

    /// Client-only flag; never part of a server response.
    pub const EDIT_MODE: &str = "editMode";

    pub const CONTENT: &str = "content";
    pub const SERIES: &str = "series";
    pub const EVENT: &str = "event";
    pub const ORDER: &str = "order";
    pub const SHOW_TITLE: &str = "showTitle";
    pub const SHOW_METADATA: &str = "showMetadata";
    pub const TITLE: &str = "title";
}

pub const REALM_TYPE: &str = "Realm";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Plain JSON value, including `null` and objects without an id.
    Scalar(serde_json::Value),
    Link(RecordId),
    Links(Vec<RecordId>),
}

impl FieldValue {
    pub fn null() -> Self {
        Self::Scalar(serde_json::Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Scalar(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&RecordId> {
        match self {
            Self::Link(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_links(&self) -> Option<&[RecordId]> {
        match self {
            Self::Links(ids) => Some(ids),
            _ => None,
        }
    }

    /// Every record id this value points at.
    pub fn referenced_ids(&self) -> impl Iterator<Item = &RecordId> {
        let ids: &[RecordId] = match self {
            Self::Link(id) => std::slice::from_ref(id),
            Self::Links(ids) => ids,
            Self::Scalar(_) => &[],
        };
        ids.iter()
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<RecordId> for FieldValue {
    fn from(v: RecordId) -> Self {
        Self::Link(v)
    }
}

pub type FieldMap = BTreeMap<String, FieldValue>;

/// One normalized entity. Records point at each other by id only.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub type_tag: String,
    pub fields: FieldMap,
}

impl Record {
    pub fn new(id: RecordId, type_tag: impl Into<String>) -> Self {
        Self {
            id,
            type_tag: type_tag.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Returns whether the stored value actually changed.
    pub fn set(&mut self, field: &str, value: FieldValue) -> bool {
        if self.fields.get(field) == Some(&value) {
            return false;
        }
        self.fields.insert(field.to_string(), value);
        true
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_bool)
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    pub fn link(&self, field: &str) -> Option<&RecordId> {
        self.get(field).and_then(FieldValue::as_link)
    }

    pub fn links(&self, field: &str) -> Option<&[RecordId]> {
        self.get(field).and_then(FieldValue::as_links)
    }

    pub fn block_kind(&self) -> Option<BlockKind> {
        BlockKind::from_typename(&self.type_tag)
    }
}

/// Typed read of a realm record.
#[derive(Clone, Debug, PartialEq)]
pub struct RealmView {
    pub id: RecordId,
    pub name: Option<String>,
    pub path: String,
    pub is_root: bool,
    pub can_current_user_edit: bool,
    pub number_of_descendants: i64,
    pub blocks: Vec<RecordId>,
    pub children: Vec<RecordId>,
}

impl RealmView {
    pub fn from_record(record: &Record) -> Option<Self> {
        if record.type_tag != REALM_TYPE {
            return None;
        }

        Some(Self {
            id: record.id.clone(),
            name: record.str(fields::NAME).map(str::to_string),
            path: record.str(fields::PATH).unwrap_or_default().to_string(),
            is_root: record.bool(fields::IS_ROOT).unwrap_or(false),
            can_current_user_edit: record.bool(fields::CAN_CURRENT_USER_EDIT).unwrap_or(false),
            number_of_descendants: record
                .get(fields::NUMBER_OF_DESCENDANTS)
                .and_then(FieldValue::as_i64)
                .unwrap_or(0),
            blocks: record.links(fields::BLOCKS).map(<[_]>::to_vec).unwrap_or_default(),
            children: record.links(fields::CHILDREN).map(<[_]>::to_vec).unwrap_or_default(),
        })
    }
}

/// Typed read of a block record.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockView {
    pub id: RecordId,
    pub kind: BlockKind,
    pub edit_mode: bool,
    pub values: BlockValues,
}

impl BlockView {
    pub fn from_record(record: &Record) -> Option<Self> {
        let kind = record.block_kind()?;
        Some(Self {
            id: record.id.clone(),
            kind,
            edit_mode: record.bool(fields::EDIT_MODE).unwrap_or(false),
            values: BlockValues::from_record(kind, record),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_and_persisted_ids_never_compare_equal() {
        let pending = RecordId::Pending(7);
        let lookalike = RecordId::persisted(format!("{PENDING_PREFIX}7"));
        assert_ne!(pending, lookalike);
        assert_eq!(pending.to_string(), lookalike.to_string());
        assert!(pending.is_pending());
        assert!(!lookalike.is_pending());
    }

    #[test]
    fn test_record_set_reports_changes_only() {
        let mut r = Record::new(RecordId::persisted("r1"), REALM_TYPE);
        assert!(r.set(fields::NAME, "Lectures".into()));
        assert!(!r.set(fields::NAME, "Lectures".into()));
        assert!(r.set(fields::NAME, "Talks".into()));
        assert_eq!(r.str(fields::NAME), Some("Talks"));
    }

    #[test]
    fn test_realm_view_reads_typed_fields() {
        let r = Record::new(RecordId::persisted("r1"), REALM_TYPE)
            .with(fields::NAME, "Physics")
            .with(fields::PATH, "/physics")
            .with(fields::CAN_CURRENT_USER_EDIT, true)
            .with(
                fields::BLOCKS,
                FieldValue::Links(vec![RecordId::persisted("b1"), RecordId::Pending(1)]),
            );
        let view = RealmView::from_record(&r).expect("realm record should produce a view");
        assert_eq!(view.name.as_deref(), Some("Physics"));
        assert_eq!(view.path, "/physics");
        assert!(view.can_current_user_edit);
        assert!(!view.is_root);
        assert_eq!(view.blocks.len(), 2);
    }

    #[test]
    fn test_realm_view_rejects_other_types() {
        let r = Record::new(RecordId::persisted("b1"), "TextBlock");
        assert!(RealmView::from_record(&r).is_none());
    }

    #[test]
    fn test_referenced_ids() {
        let v = FieldValue::Links(vec![RecordId::persisted("a"), RecordId::persisted("b")]);
        assert_eq!(v.referenced_ids().count(), 2);
        assert_eq!(FieldValue::from(true).referenced_ids().count(), 0);
    }
}
