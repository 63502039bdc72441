//! Two-way mapping between the query parameters of the video listing and
//! the variables of its query.

use serde::Serialize;
use std::str::FromStr;

/// Number of videos per page.
pub const PAGE_SIZE: u32 = 15;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "lowercase")]
pub enum SortColumn {
    Title,
    Duration,
    Created,
    Updated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, strum::EnumIter)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn param(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    fn from_param(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Ascending),
            "desc" => Some(Self::Descending),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SortOrder {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            column: SortColumn::Created,
            direction: SortDirection::Descending,
        }
    }
}

impl SortOrder {
    /// Order selected by clicking the header of `column`: ascending first,
    /// descending when the column is already sorted ascending.
    pub fn toggled(self, column: SortColumn) -> Self {
        let direction = if self.column == column && self.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Self { column, direction }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Page {
    #[default]
    First,
    After(String),
    Before(String),
    Last,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VideoListVars {
    pub order: SortOrder,
    pub page: Page,
}

impl VideoListVars {
    pub fn first_page(order: SortOrder) -> Self {
        Self {
            order,
            page: Page::First,
        }
    }

    /// Reads the listing parameters. Unknown or partial sort parameters fall
    /// back to the default order. `lastPage` wins over `before`, which wins
    /// over `after`.
    pub fn decode(param: impl Fn(&str) -> Option<String>) -> Self {
        let column = param("sortBy").and_then(|s| SortColumn::from_str(&s).ok());
        let direction = param("sortOrder").and_then(|s| SortDirection::from_param(&s));
        let order = match (column, direction) {
            (Some(column), Some(direction)) => SortOrder { column, direction },
            _ => SortOrder::default(),
        };

        let page = if param("lastPage").is_some() {
            Page::Last
        } else if let Some(cursor) = param("before") {
            if cursor.is_empty() {
                Page::Last
            } else {
                Page::Before(cursor)
            }
        } else {
            match param("after") {
                Some(cursor) if !cursor.is_empty() => Page::After(cursor),
                _ => Page::First,
            }
        };

        Self { order, page }
    }

    /// Inverse of [`decode`](Self::decode). Parameters equal to the
    /// defaults are omitted.
    pub fn encode(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if self.order != SortOrder::default() {
            out.push(("sortBy".to_string(), self.order.column.to_string()));
            out.push(("sortOrder".to_string(), self.order.direction.param().to_string()));
        }

        match &self.page {
            Page::First => {}
            Page::Last => out.push(("lastPage".to_string(), String::new())),
            Page::Before(cursor) if cursor.is_empty() => {
                out.push(("lastPage".to_string(), String::new()))
            }
            Page::Before(cursor) => out.push(("before".to_string(), cursor.clone())),
            Page::After(cursor) if cursor.is_empty() => {}
            Page::After(cursor) => out.push(("after".to_string(), cursor.clone())),
        }
        out
    }

    /// Variables of the listing query.
    pub fn to_variables(&self) -> serde_json::Value {
        let (first, last, after, before) = match &self.page {
            Page::First => (Some(PAGE_SIZE), None, None, None),
            Page::After(c) => (Some(PAGE_SIZE), None, Some(c.as_str()), None),
            Page::Before(c) => (None, Some(PAGE_SIZE), None, Some(c.as_str())),
            Page::Last => (None, Some(PAGE_SIZE), None, None),
        };
        serde_json::json!({
            "order": self.order,
            "first": first,
            "last": last,
            "after": after,
            "before": before,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use strum::IntoEnumIterator;

    fn decode_pairs(pairs: &[(String, String)]) -> VideoListVars {
        let map: HashMap<&str, &str> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        VideoListVars::decode(|k| map.get(k).map(|v| v.to_string()))
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_encode_to_nothing() {
        assert!(VideoListVars::default().encode().is_empty());
        assert_eq!(decode_pairs(&[]), VideoListVars::default());
    }

    #[test]
    fn test_half_specified_order_falls_back_to_default() {
        let vars = decode_pairs(&pairs(&[("sortBy", "title")]));
        assert_eq!(vars.order, SortOrder::default());

        let vars = decode_pairs(&pairs(&[("sortBy", "bogus"), ("sortOrder", "asc")]));
        assert_eq!(vars.order, SortOrder::default());
    }

    #[test]
    fn test_pagination_precedence() {
        let vars = decode_pairs(&pairs(&[("after", "a"), ("before", "b"), ("lastPage", "")]));
        assert_eq!(vars.page, Page::Last);
        let vars = decode_pairs(&pairs(&[("after", "a"), ("before", "b")]));
        assert_eq!(vars.page, Page::Before("b".into()));
        let vars = decode_pairs(&pairs(&[("after", "a")]));
        assert_eq!(vars.page, Page::After("a".into()));
    }

    #[test]
    fn test_non_default_order_is_encoded() {
        let vars = VideoListVars {
            order: SortOrder {
                column: SortColumn::Title,
                direction: SortDirection::Ascending,
            },
            page: Page::After("cur".into()),
        };
        assert_eq!(
            vars.encode(),
            pairs(&[("sortBy", "title"), ("sortOrder", "asc"), ("after", "cur")])
        );
    }

    #[test]
    fn test_header_toggle() {
        let order = SortOrder::default();
        let title = order.toggled(SortColumn::Title);
        assert_eq!(title.direction, SortDirection::Ascending);
        assert_eq!(title.toggled(SortColumn::Title).direction, SortDirection::Descending);
        assert_eq!(order.toggled(SortColumn::Created).direction, SortDirection::Ascending);
    }

    #[test]
    fn test_query_variables() {
        let vars = VideoListVars {
            order: SortOrder::default(),
            page: Page::Before("c1".into()),
        };
        assert_eq!(
            vars.to_variables(),
            serde_json::json!({
                "order": { "column": "CREATED", "direction": "DESCENDING" },
                "first": null,
                "last": 15,
                "after": null,
                "before": "c1",
            })
        );
    }

    fn any_vars() -> impl Strategy<Value = VideoListVars> {
        let columns: Vec<SortColumn> = SortColumn::iter().collect();
        let directions: Vec<SortDirection> = SortDirection::iter().collect();
        let order = (prop::sample::select(columns), prop::sample::select(directions))
            .prop_map(|(column, direction)| SortOrder { column, direction });
        let page = prop_oneof![
            Just(Page::First),
            Just(Page::Last),
            "[A-Za-z0-9]{1,12}".prop_map(Page::After),
            "[A-Za-z0-9]{1,12}".prop_map(Page::Before),
        ];
        (order, page).prop_map(|(order, page)| VideoListVars { order, page })
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(vars in any_vars()) {
            prop_assert_eq!(decode_pairs(&vars.encode()), vars);
        }
    }
}
