//! Turns a GraphQL response tree into flat records.
//!
//! Any object with an `id` becomes a record and is replaced by a link to
//! it. Objects without an id stay inline as plain JSON.

use crate::models::{FieldMap, FieldValue, Record, RecordId};
use crate::store::Snapshot;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("response data is not an object")]
    NotAnObject,
    #[error("object with id {0} has no __typename")]
    MissingTypename(String),
    #[error("id is not a string: {0}")]
    InvalidId(String),
}

/// A normalized response: the root fields, pointing into the snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    pub root: FieldMap,
    pub snapshot: Snapshot,
}

impl Normalized {
    /// Ids linked directly from the root fields.
    pub fn root_ids(&self) -> Vec<RecordId> {
        self.root
            .values()
            .flat_map(FieldValue::referenced_ids)
            .cloned()
            .collect()
    }
}

pub fn normalize(data: &Value) -> Result<Normalized, NormalizeError> {
    let obj = data.as_object().ok_or(NormalizeError::NotAnObject)?;
    let mut records = BTreeMap::new();
    let mut root = FieldMap::new();
    for (key, value) in obj {
        root.insert(key.clone(), field_value(value, &mut records)?);
    }
    Ok(Normalized {
        root,
        snapshot: Snapshot::new(records.into_values().collect()),
    })
}

fn is_entity(value: &Value) -> bool {
    value.as_object().map(|o| o.contains_key("id")).unwrap_or(false)
}

fn field_value(
    value: &Value,
    records: &mut BTreeMap<RecordId, Record>,
) -> Result<FieldValue, NormalizeError> {
    match value {
        Value::Object(obj) if obj.contains_key("id") => Ok(FieldValue::Link(record(obj, records)?)),
        Value::Array(items) if items.iter().all(is_entity) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                if let Value::Object(obj) = item {
                    ids.push(record(obj, records)?);
                }
            }
            Ok(FieldValue::Links(ids))
        }
        other => Ok(FieldValue::Scalar(other.clone())),
    }
}

fn record(
    obj: &Map<String, Value>,
    records: &mut BTreeMap<RecordId, Record>,
) -> Result<RecordId, NormalizeError> {
    let id = match obj.get("id") {
        Some(Value::String(id)) => RecordId::persisted(id.clone()),
        other => return Err(NormalizeError::InvalidId(format!("{other:?}"))),
    };
    let type_tag = obj
        .get("__typename")
        .and_then(Value::as_str)
        .ok_or_else(|| NormalizeError::MissingTypename(id.to_string()))?;

    let mut fields = FieldMap::new();
    for (key, value) in obj {
        if key == "id" || key == "__typename" {
            continue;
        }
        fields.insert(key.clone(), field_value(value, records)?);
    }

    // The same entity may show up several times in one response.
    records
        .entry(id.clone())
        .and_modify(|r| r.fields.extend(fields.clone()))
        .or_insert_with(|| Record {
            id: id.clone(),
            type_tag: type_tag.to_string(),
            fields,
        });
    Ok(id)
}
