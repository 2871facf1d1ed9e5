mod api;
mod components;
mod config;
mod coords;
mod gateway;
mod pages;

use dioxus::prelude::*;
use pages::dashboard::{Dashboard, Variant};

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[route("/")]
    Shared {},
    #[route("/local")]
    Local {},
}

#[component]
fn Shared() -> Element {
    rsx! {
        Dashboard { variant: Variant::Remote }
    }
}

#[component]
fn Local() -> Element {
    rsx! {
        Dashboard { variant: Variant::Local }
    }
}

const CSS: Asset = asset!("/assets/main.css");
const FAVICON: Asset = asset!("/assets/favicon.svg");

#[allow(non_snake_case)]
fn App() -> Element {
    rsx! {
        document::Title { "SENTINELS" }
        document::Link { rel: "icon", r#type: "image/svg+xml", href: FAVICON }
        document::Stylesheet { href: CSS }
        Router::<Route> {}
    }
}

fn main() {
    launch(App);
}
