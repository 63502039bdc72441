use super::{fields, FieldMap, FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum BlockKind {
    Title,
    Text,
    Series,
    Video,
}

impl BlockKind {
    /// GraphQL `__typename` of records of this kind.
    pub fn typename(self) -> &'static str {
        match self {
            Self::Title => "TitleBlock",
            Self::Text => "TextBlock",
            Self::Series => "SeriesBlock",
            Self::Video => "VideoBlock",
        }
    }

    pub fn from_typename(typename: &str) -> Option<Self> {
        match typename {
            "TitleBlock" => Some(Self::Title),
            "TextBlock" => Some(Self::Text),
            "SeriesBlock" => Some(Self::Series),
            "VideoBlock" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Text => "Text",
            Self::Series => "Video series",
            Self::Video => "Video",
        }
    }

    /// Fields a freshly inserted block starts with, before the user edits it.
    pub fn default_fields(self) -> FieldMap {
        let mut out = BTreeMap::new();
        match self {
            Self::Title | Self::Text => {
                out.insert(fields::CONTENT.to_string(), FieldValue::from(""));
            }
            Self::Series => {
                out.insert(fields::SERIES.to_string(), FieldValue::null());
                out.insert(
                    fields::ORDER.to_string(),
                    FieldValue::from(VideoListOrder::NewToOld.as_str()),
                );
                out.insert(fields::SHOW_TITLE.to_string(), FieldValue::from(true));
                out.insert(fields::SHOW_METADATA.to_string(), FieldValue::from(false));
            }
            Self::Video => {
                out.insert(fields::EVENT.to_string(), FieldValue::null());
                out.insert(fields::SHOW_TITLE.to_string(), FieldValue::from(true));
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoListOrder {
    #[default]
    NewToOld,
    OldToNew,
}

impl VideoListOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewToOld => "NEW_TO_OLD",
            Self::OldToNew => "OLD_TO_NEW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW_TO_OLD" => Some(Self::NewToOld),
            "OLD_TO_NEW" => Some(Self::OldToNew),
            _ => None,
        }
    }
}

/// Form state of one block while it is being edited.
///
/// Values here are unvalidated; [`BlockValues::validate`] turns them into a
/// [`BlockInput`] that can be sent.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockValues {
    Title {
        content: String,
    },
    Text {
        content: String,
    },
    Series {
        series: Option<String>,
        order: VideoListOrder,
        show_title: bool,
        show_metadata: bool,
    },
    Video {
        event: Option<String>,
        show_title: bool,
    },
}

impl BlockValues {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Title { .. } => BlockKind::Title,
            Self::Text { .. } => BlockKind::Text,
            Self::Series { .. } => BlockKind::Series,
            Self::Video { .. } => BlockKind::Video,
        }
    }

    /// Reads the current values of a block record. Links to series and
    /// events are read as their id.
    pub fn from_record(kind: BlockKind, record: &Record) -> Self {
        let linked_id = |field: &str| match record.get(field) {
            Some(FieldValue::Link(id)) => id.as_persisted().map(str::to_string),
            Some(FieldValue::Scalar(v)) => v.as_str().map(str::to_string),
            _ => None,
        };
        let content = || record.str(fields::CONTENT).unwrap_or_default().to_string();
        let show_title = record.bool(fields::SHOW_TITLE).unwrap_or(true);

        match kind {
            BlockKind::Title => Self::Title { content: content() },
            BlockKind::Text => Self::Text { content: content() },
            BlockKind::Series => Self::Series {
                series: linked_id(fields::SERIES),
                order: record
                    .str(fields::ORDER)
                    .and_then(VideoListOrder::parse)
                    .unwrap_or_default(),
                show_title,
                show_metadata: record.bool(fields::SHOW_METADATA).unwrap_or(false),
            },
            BlockKind::Video => Self::Video {
                event: linked_id(fields::EVENT),
                show_title,
            },
        }
    }

    pub fn validate(&self) -> Result<BlockInput, FieldErrors> {
        let mut errors = FieldErrors::default();
        let input = match self {
            Self::Title { content } => {
                if content.trim().is_empty() {
                    errors.add(fields::CONTENT, ValidationError::Required);
                }
                BlockInput::Title {
                    content: content.clone(),
                }
            }
            Self::Text { content } => BlockInput::Text {
                content: content.clone(),
            },
            Self::Series {
                series,
                order,
                show_title,
                show_metadata,
            } => {
                let series = series.clone().filter(|s| !s.trim().is_empty());
                if series.is_none() {
                    errors.add(fields::SERIES, ValidationError::Required);
                }
                BlockInput::Series {
                    series: series.unwrap_or_default(),
                    order: *order,
                    show_title: *show_title,
                    show_metadata: *show_metadata,
                }
            }
            Self::Video { event, show_title } => BlockInput::Video {
                event: event.clone().filter(|e| !e.trim().is_empty()),
                show_title: *show_title,
            },
        };

        if errors.is_empty() {
            Ok(input)
        } else {
            Err(errors)
        }
    }
}

/// Validated block payload, as sent in create and update mutations.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum BlockInput {
    Title {
        content: String,
    },
    Text {
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Series {
        series: String,
        order: VideoListOrder,
        show_title: bool,
        show_metadata: bool,
    },
    #[serde(rename_all = "camelCase")]
    Video {
        #[serde(skip_serializing_if = "Option::is_none")]
        event: Option<String>,
        show_title: bool,
    },
}

impl BlockInput {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Title { .. } => BlockKind::Title,
            Self::Text { .. } => BlockKind::Text,
            Self::Series { .. } => BlockKind::Series,
            Self::Video { .. } => BlockKind::Video,
        }
    }

    /// The payload as a GraphQL input object, without the `type` tag.
    pub fn to_graphql_input(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(obj) = value.as_object_mut() {
            obj.remove("type");
        }
        value
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("This field is required.")]
    Required,
}

fn field_names(errors: &BTreeMap<&'static str, ValidationError>) -> String {
    errors.keys().copied().collect::<Vec<_>>().join(", ")
}

#[derive(Error, Clone, Debug, Default, PartialEq, Eq)]
#[error("invalid fields: {}", field_names(.0))]
pub struct FieldErrors(BTreeMap<&'static str, ValidationError>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, error: ValidationError) {
        self.0.insert(field, error);
    }

    pub fn get(&self, field: &str) -> Option<ValidationError> {
        self.0.get(field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ValidationError)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordId;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn record_with_defaults(kind: BlockKind) -> Record {
        let mut r = Record::new(RecordId::Pending(1), kind.typename());
        r.fields = kind.default_fields();
        r
    }

    #[test]
    fn test_typename_roundtrip_for_every_kind() {
        for kind in BlockKind::iter() {
            assert_eq!(BlockKind::from_typename(kind.typename()), Some(kind));
        }
        assert_eq!(BlockKind::from_typename("Realm"), None);
    }

    #[test]
    fn test_series_defaults() {
        let values = BlockValues::from_record(BlockKind::Series, &record_with_defaults(BlockKind::Series));
        assert_eq!(
            values,
            BlockValues::Series {
                series: None,
                order: VideoListOrder::NewToOld,
                show_title: true,
                show_metadata: false,
            }
        );
    }

    #[test]
    fn test_video_input_serializes_like_the_wire_payload() {
        let values = BlockValues::from_record(BlockKind::Video, &record_with_defaults(BlockKind::Video));
        let input = values.validate().expect("video block has no required fields");
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({ "type": "Video", "showTitle": true })
        );
        assert_eq!(input.to_graphql_input(), json!({ "showTitle": true }));
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let errors = BlockValues::Title {
            content: "   ".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get(fields::CONTENT), Some(ValidationError::Required));
        assert_eq!(errors.to_string(), "invalid fields: content");
        assert_eq!(ValidationError::Required.to_string(), "This field is required.");
    }

    #[test]
    fn test_series_requires_a_series() {
        let errors = BlockValues::from_record(BlockKind::Series, &record_with_defaults(BlockKind::Series))
            .validate()
            .unwrap_err();
        assert_eq!(errors.get(fields::SERIES), Some(ValidationError::Required));

        let input = BlockValues::Series {
            series: Some("s1".into()),
            order: VideoListOrder::OldToNew,
            show_title: false,
            show_metadata: true,
        }
        .validate()
        .unwrap();
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({
                "type": "Series",
                "series": "s1",
                "order": "OLD_TO_NEW",
                "showTitle": false,
                "showMetadata": true,
            })
        );
    }

    #[test]
    fn test_empty_text_is_allowed() {
        let input = BlockValues::Text { content: String::new() }.validate().unwrap();
        assert_eq!(input.kind(), BlockKind::Text);
    }

    #[test]
    fn test_linked_series_is_read_as_its_id() {
        let r = record_with_defaults(BlockKind::Series)
            .with(fields::SERIES, RecordId::persisted("series-9"));
        match BlockValues::from_record(BlockKind::Series, &r) {
            BlockValues::Series { series, .. } => assert_eq!(series.as_deref(), Some("series-9")),
            other => panic!("unexpected values {other:?}"),
        }
    }
}
