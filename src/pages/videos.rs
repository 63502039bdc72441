use crate::components::ui::{Card, CardContent, CardDescription, CardHeader, CardTitle};
use crate::router::video_list::{Page, SortColumn, SortDirection, SortOrder, VideoListVars};
use crate::router::RouteMatch;
use leptos::prelude::*;
use serde_json::Value;
use strum::IntoEnumIterator;

fn listing_href(order_vars: VideoListVars) -> String {
    super::href(RouteMatch::Videos(order_vars))
}

fn column_label(column: SortColumn) -> &'static str {
    match column {
        SortColumn::Title => "Title",
        SortColumn::Duration => "Duration",
        SortColumn::Created => "Created",
        SortColumn::Updated => "Updated",
    }
}

/// `1:02:03` or `2:03` from milliseconds.
fn format_duration(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn format_date(raw: &Value) -> String {
    raw.as_str()
        .map(|s| s.split('T').next().unwrap_or(s).to_string())
        .unwrap_or_default()
}

/// Targets of the First / Previous / Next / Last links; `None` when the
/// link is disabled.
fn page_links(order: SortOrder, page_info: &Value) -> [(&'static str, Option<VideoListVars>); 4] {
    let cursor = |key: &str| page_info[key].as_str().map(str::to_string);
    let has_prev = page_info["hasPreviousPage"].as_bool().unwrap_or(false);
    let has_next = page_info["hasNextPage"].as_bool().unwrap_or(false);
    let target = |enabled: bool, page: Option<Page>| {
        page.filter(|_| enabled).map(|page| VideoListVars { order, page })
    };
    [
        ("First", target(has_prev, Some(Page::First))),
        ("Previous", target(has_prev, cursor("startCursor").map(Page::Before))),
        ("Next", target(has_next, cursor("endCursor").map(Page::After))),
        ("Last", target(has_next, Some(Page::Last))),
    ]
}

#[component]
pub fn VideosPage(vars: VideoListVars, connection: Value) -> impl IntoView {
    let order = vars.order;
    let total = connection["totalCount"].as_i64().unwrap_or(0);
    let page_info = connection["pageInfo"].clone();
    let range = match (page_info["startIndex"].as_i64(), page_info["endIndex"].as_i64()) {
        (Some(start), Some(end)) => format!("{}–{} of {total}", start + 1, end + 1),
        _ => format!("{total} videos"),
    };

    let headers = SortColumn::iter()
        .map(move |column| {
            let marker = match (order.column == column, order.direction) {
                (true, SortDirection::Ascending) => " ↑",
                (true, SortDirection::Descending) => " ↓",
                (false, _) => "",
            };
            let href = listing_href(VideoListVars::first_page(order.toggled(column)));
            view! {
                <th class="px-2 py-1 text-left font-medium">
                    <a class="hover:text-foreground" href=href>{format!("{}{marker}", column_label(column))}</a>
                </th>
            }
        })
        .collect_view();

    let rows = connection["items"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|item| {
            let title = item["title"].as_str().unwrap_or_default().to_string();
            let duration = item["duration"].as_i64().map(format_duration).unwrap_or_default();
            view! {
                <tr class="border-t">
                    <td class="px-2 py-1">{title}</td>
                    <td class="px-2 py-1 tabular-nums">{duration}</td>
                    <td class="px-2 py-1">{format_date(&item["created"])}</td>
                    <td class="px-2 py-1">{format_date(&item["updated"])}</td>
                </tr>
            }
        })
        .collect_view();

    let links = page_links(order, &page_info)
        .into_iter()
        .map(|(label, target)| match target {
            Some(vars) => view! {
                <a class="text-primary underline-offset-4 hover:underline" href=listing_href(vars)>
                    {label}
                </a>
            }
            .into_any(),
            None => view! { <span class="text-muted-foreground">{label}</span> }.into_any(),
        })
        .collect_view();

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">"My videos"</CardTitle>
                <CardDescription class="text-xs">{range}</CardDescription>
            </CardHeader>
            <CardContent>
                <table class="w-full text-sm">
                    <thead class="text-xs text-muted-foreground">
                        <tr>{headers}</tr>
                    </thead>
                    <tbody>{rows}</tbody>
                </table>
                <div class="mt-4 flex items-center gap-3 text-xs">{links}</div>
            </CardContent>
        </Card>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(125_000), "2:05");
        assert_eq!(format_duration(3_723_000), "1:02:03");
    }

    #[test]
    fn test_format_date_keeps_the_day() {
        assert_eq!(format_date(&json!("2024-03-01T10:00:00Z")), "2024-03-01");
        assert_eq!(format_date(&Value::Null), "");
    }

    #[test]
    fn test_page_links_follow_page_info() {
        let order = VideoListVars::default().order;
        let links = page_links(
            order,
            &json!({ "hasPreviousPage": false, "hasNextPage": true, "startCursor": "s", "endCursor": "e" }),
        );
        assert_eq!(links[0], ("First", None));
        assert_eq!(links[1], ("Previous", None));
        assert_eq!(
            links[2],
            ("Next", Some(VideoListVars { order, page: Page::After("e".into()) }))
        );
        assert_eq!(links[3], ("Last", Some(VideoListVars { order, page: Page::Last })));
    }

    #[test]
    fn test_header_link_toggles_the_order() {
        let href = listing_href(VideoListVars::first_page(
            VideoListVars::default().order.toggled(SortColumn::Title),
        ));
        assert_eq!(href, "/~manage/videos?sortBy=title&sortOrder=asc");
    }
}
