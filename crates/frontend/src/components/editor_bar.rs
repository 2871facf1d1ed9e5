use dioxus::prelude::*;
use sentinels_shared::controller::Controller;
use sentinels_shared::models::Category;

/// Buttons arming add mode, one per category. The armed button is lit in the
/// category color. Disabled until the shared overlay has arrived.
#[component]
pub fn EditorBar(controller: Signal<Controller>) -> Element {
    let mut controller = controller;
    let armed = controller.read().add_mode();
    let locked = !controller.read().overlay_loaded();
    let buttons: Vec<(Category, bool, &'static str, &'static str)> = Category::ALL
        .into_iter()
        .map(|c| (c, armed == Some(c), c.color(), c.add_label()))
        .collect();

    rsx! {
        div { class: "editor-bar",
            for (category, is_armed, color, label) in buttons {
                button {
                    key: "{category}",
                    class: if is_armed { "add-button armed" } else { "add-button" },
                    style: "--accent: {color};",
                    "aria-pressed": "{is_armed}",
                    disabled: locked,
                    onclick: move |_| controller.write().select_add_mode(category),
                    "{label}"
                }
            }
        }
    }
}
