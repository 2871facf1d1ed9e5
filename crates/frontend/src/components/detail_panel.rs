use dioxus::prelude::*;
use sentinels_shared::controller::Controller;
use sentinels_shared::store::Effect;

use crate::coords;

/// Name, coordinates and actions for the selected marker.
#[component]
pub fn DetailPanel(controller: Signal<Controller>, on_effect: EventHandler<Effect>) -> Element {
    let mut controller = controller;
    let Some(marker) = controller.read().active_marker().cloned() else {
        return rsx! {};
    };
    let position = coords::format_position(marker.position);
    let color = marker.category.color();

    rsx! {
        div { class: "detail-panel",
            h3 { style: "color: {color};", "{marker.name}" }
            p { class: "detail-coords", "{position}" }
            p { class: "detail-meta", "{marker.kind} // {marker.group}" }
            if marker.is_base() {
                p { class: "detail-meta", "BASE LAYER" }
            }

            div { class: "detail-actions",
                button {
                    class: "rename-button",
                    onclick: move |_| controller.write().begin_rename(),
                    "RENAME"
                }
                button {
                    class: "delete-button",
                    onclick: move |_| {
                        let effect = controller.write().delete_active();
                        on_effect.call(effect);
                    },
                    "DELETE"
                }
            }

            button {
                class: "close-button",
                onclick: move |_| controller.write().close_detail(),
                "CLOSE"
            }
        }
    }
}
