//! Static containers: cards for page bodies, alerts for page-level notices.

use leptos::prelude::*;
use leptos_ui::clx;

mod components {
    use super::*;
    clx! {Card, section, "bg-card text-card-foreground flex flex-col gap-4 rounded-lg border py-5 shadow-xs"}
    clx! {CardHeader, div, "flex flex-col gap-1 px-5"}
    clx! {CardTitle, h1, "font-semibold leading-tight"}
    clx! {CardDescription, p, "text-muted-foreground text-sm"}
    clx! {CardContent, div, "px-5"}
    clx! {CardList, ul, "flex flex-col divide-y"}
    clx! {CardItem, li, "flex items-center gap-2 py-2"}

    clx! {Alert, div, "w-full rounded-lg border px-4 py-3 text-sm"}
    clx! {AlertTitle, h2, "mb-1 font-medium leading-none"}
    clx! {AlertDescription, p, "text-sm leading-relaxed"}
}

pub use components::*;
