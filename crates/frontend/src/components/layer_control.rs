use dioxus::prelude::*;
use sentinels_shared::controller::Controller;
use sentinels_shared::models::Category;
use sentinels_shared::sync::SyncStatus;

fn status_class(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Connecting => "sync-status connecting",
        SyncStatus::Synced => "sync-status synced",
        SyncStatus::Initialized => "sync-status initialized",
        SyncStatus::Offline => "sync-status offline",
    }
}

/// Toggle label for one category row, e.g. `[ON] THREATS`.
fn layer_label(category: Category, visible: bool) -> String {
    format!("[{}] {}", if visible { "ON" } else { "OFF" }, category)
}

#[component]
pub fn LayerControl(
    controller: Signal<Controller>,
    status: SyncStatus,
    show_reset: bool,
    on_reset: EventHandler<()>,
) -> Element {
    let mut controller = controller;
    let visibility = *controller.read().store().visibility();
    let rows: Vec<(Category, bool, String)> = Category::ALL
        .into_iter()
        .map(|c| {
            let visible = visibility.is_visible(c);
            (c, visible, layer_label(c, visible))
        })
        .collect();
    let status_css = status_class(status);

    rsx! {
        div { class: "panel layer-control",
            h2 { "LAYER CONTROL" }
            for (category, visible, label) in rows {
                div {
                    key: "{category}",
                    class: if visible { "layer-toggle" } else { "layer-toggle off" },
                    onclick: move |_| {
                        controller.write().toggle_visibility(category);
                    },
                    "{label}"
                }
            }
            div { class: "{status_css}", "LINK: {status}" }
            if show_reset {
                button {
                    class: "reset-button",
                    onclick: move |_| on_reset.call(()),
                    "[RESET SYSTEM DATA]"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_label() {
        assert_eq!(layer_label(Category::Threats, true), "[ON] THREATS");
        assert_eq!(layer_label(Category::Logistics, false), "[OFF] LOGISTICS");
    }

    #[test]
    fn test_status_class_per_state() {
        assert!(status_class(SyncStatus::Offline).ends_with("offline"));
        assert!(status_class(SyncStatus::Initialized).ends_with("initialized"));
    }
}
