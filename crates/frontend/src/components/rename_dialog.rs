use dioxus::prelude::*;
use sentinels_shared::controller::Controller;
use sentinels_shared::store::{Effect, StoreError};

/// Modal text entry for a new marker name.
///
/// Confirming applies the typed name to the selected marker. Cancelling
/// closes the dialog and changes nothing.
#[component]
pub fn RenameDialog(
    controller: Signal<Controller>,
    on_effect: EventHandler<Effect>,
    on_error: EventHandler<StoreError>,
) -> Element {
    let mut controller = controller;
    let Some(draft) = controller.read().rename_dialog().draft().map(str::to_string) else {
        return rsx! {};
    };

    let mut confirm = move || {
        let answer = controller.write().rename_dialog_mut().confirm();
        let result = controller.write().rename_active(answer);
        match result {
            Ok(effect) => on_effect.call(effect),
            Err(e) => on_error.call(e),
        }
    };
    let mut cancel = move || {
        controller.write().rename_dialog_mut().cancel();
    };

    rsx! {
        div {
            class: "dialog-backdrop",
            onclick: move |_| cancel(),

            div {
                class: "rename-dialog",
                onclick: move |evt: Event<MouseData>| evt.stop_propagation(),

                h3 { "ENTER NEW DESIGNATION:" }
                input {
                    "aria-label": "New marker name",
                    r#type: "text",
                    value: "{draft}",
                    autofocus: true,
                    oninput: move |evt: Event<FormData>| {
                        controller.write().rename_dialog_mut().set_draft(&evt.value());
                    },
                    onkeydown: move |evt: Event<KeyboardData>| match evt.key() {
                        Key::Enter => confirm(),
                        Key::Escape => cancel(),
                        _ => {}
                    },
                }
                div { class: "dialog-actions",
                    button { onclick: move |_| confirm(), "OK" }
                    button { onclick: move |_| cancel(), "CANCEL" }
                }
            }
        }
    }
}
