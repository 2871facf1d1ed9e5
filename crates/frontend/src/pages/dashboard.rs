use std::cell::RefCell;
use std::rc::Rc;

use dioxus::logger::tracing;
use dioxus::prelude::*;
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use sentinels_shared::base::base_dataset;
use sentinels_shared::controller::Controller;
use sentinels_shared::models::Dataset;
use sentinels_shared::store::{Effect, MarkerStore, StoreError};
use sentinels_shared::sync::{Reconciler, SyncStatus};

use crate::components::detail_panel::DetailPanel;
use crate::components::editor_bar::EditorBar;
use crate::components::layer_control::LayerControl;
use crate::components::map_view::MapView;
use crate::components::rename_dialog::RenameDialog;
use crate::config;
use crate::gateway::local;
use crate::gateway::remote::{self, Subscription};
use crate::gateway::GatewayEvent;

/// Where the overlay layer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Shared with every client through the backend.
    Remote,
    /// Kept in this browser only.
    Local,
}

fn initial_controller(variant: Variant) -> Controller {
    match variant {
        Variant::Remote => Controller::awaiting_overlay(MarkerStore::with_state(
            base_dataset(),
            Dataset::new(),
            local::load_suppressed(),
        )),
        Variant::Local => Controller::new(MarkerStore::editable(local::load_dataset())),
    }
}

fn initial_status(variant: Variant) -> SyncStatus {
    match variant {
        Variant::Remote => SyncStatus::Connecting,
        Variant::Local => SyncStatus::Synced,
    }
}

fn open_subscription(events: &UnboundedSender<GatewayEvent>) -> Result<Subscription, String> {
    let url = config::websocket_url(&config::page_origin()?);
    Subscription::open(&url, events.clone())
}

/// Feed one remote event through the reconciler and apply whatever it releases.
fn handle_event(
    event: GatewayEvent,
    controller: &mut Signal<Controller>,
    reconciler: &mut Signal<Reconciler>,
    status: &mut Signal<SyncStatus>,
) {
    let released = match event {
        GatewayEvent::Snapshot(snapshot) => {
            status.set(snapshot.status());
            reconciler.write().on_snapshot(snapshot)
        }
        GatewayEvent::Acknowledged(revision) => {
            tracing::debug!(revision, "Overlay push acknowledged");
            reconciler.write().on_ack(revision)
        }
        GatewayEvent::WriteFailed(e) => {
            tracing::warn!(error = %e, "Overlay push failed");
            status.set(SyncStatus::Offline);
            reconciler.write().on_write_failed()
        }
        GatewayEvent::Disconnected(reason) => {
            tracing::warn!(reason = %reason, "Overlay subscription lost");
            status.set(SyncStatus::Offline);
            None
        }
    };
    if let Some(snapshot) = released {
        tracing::debug!(revision = snapshot.revision, "Applying overlay snapshot");
        controller.write().apply_remote(Dataset::from(snapshot.document));
    }
}

/// Blocking notice, e.g. for an edit the marker does not allow.
fn show_notice(message: &str) {
    if let Some(window) = web_sys::window() {
        window.alert_with_message(message).ok();
    }
}

/// Where a mutation's effect has to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persist {
    Nothing,
    /// The single-user dataset, to browser storage.
    SaveDataset,
    /// The shared dashboard's hidden base ids, to browser storage.
    SaveSuppressed,
    /// The overlay, to the shared document.
    PushOverlay,
}

fn persistence(variant: Variant, effect: Effect) -> Persist {
    match (variant, effect) {
        (_, Effect::None) => Persist::Nothing,
        (Variant::Local, _) => Persist::SaveDataset,
        (Variant::Remote, Effect::LocalOnly) => Persist::SaveSuppressed,
        (Variant::Remote, Effect::PushOverlay) => Persist::PushOverlay,
    }
}

/// Signals the effect of a mutation has to reach.
#[derive(Clone, Copy)]
struct Session {
    variant: Variant,
    controller: Signal<Controller>,
    reconciler: Signal<Reconciler>,
    status: Signal<SyncStatus>,
    events: Coroutine<GatewayEvent>,
}

impl Session {
    /// Persist whatever a mutation changed.
    fn apply(mut self, effect: Effect) {
        let result = match persistence(self.variant, effect) {
            Persist::Nothing => Ok(()),
            Persist::SaveDataset => local::save_dataset(self.controller.read().store().overlay()),
            Persist::SaveSuppressed => {
                local::save_suppressed(self.controller.read().store().suppressed())
            }
            Persist::PushOverlay => {
                let document = self.controller.read().store().overlay().to_document();
                self.reconciler.write().begin_write();
                remote::push(document, self.events.tx());
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist local state");
            self.status.set(SyncStatus::Offline);
        }
    }
}

#[component]
pub fn Dashboard(variant: Variant) -> Element {
    let mut controller = use_signal(move || initial_controller(variant));
    let mut status = use_signal(move || initial_status(variant));
    let mut reconciler = use_signal(Reconciler::new);

    let events = use_coroutine(move |mut rx: UnboundedReceiver<GatewayEvent>| async move {
        while let Some(event) = rx.next().await {
            handle_event(event, &mut controller, &mut reconciler, &mut status);
        }
    });

    // The subscription lives exactly as long as this component.
    let subscription = use_hook(move || {
        let handle = match variant {
            Variant::Remote => {
                let tx = events.tx();
                match open_subscription(&tx) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        let _ = tx.unbounded_send(GatewayEvent::Disconnected(e));
                        None
                    }
                }
            }
            Variant::Local => None,
        };
        Rc::new(RefCell::new(handle))
    });
    use_drop(move || {
        if let Some(mut handle) = subscription.borrow_mut().take() {
            handle.unsubscribe();
        }
    });

    let session = Session {
        variant,
        controller,
        reconciler,
        status,
        events,
    };
    let current_status = *status.read();

    rsx! {
        div { class: "app",
            MapView {
                controller: controller,
                on_effect: move |effect: Effect| session.apply(effect),
            }

            LayerControl {
                controller: controller,
                status: current_status,
                show_reset: variant == Variant::Local,
                on_reset: move |_| {
                    if let Err(e) = local::reset() {
                        tracing::warn!(error = %e, "Reset failed");
                    }
                },
            }

            EditorBar { controller: controller }

            DetailPanel {
                controller: controller,
                on_effect: move |effect: Effect| session.apply(effect),
            }

            RenameDialog {
                controller: controller,
                on_effect: move |effect: Effect| session.apply(effect),
                on_error: move |e: StoreError| show_notice(&e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinels_shared::models::{Category, MarkerRecord, OverlayDocument, Position};
    use sentinels_shared::sync::OverlaySnapshot;

    #[test]
    fn test_initial_status_per_variant() {
        assert_eq!(initial_status(Variant::Remote), SyncStatus::Connecting);
        assert_eq!(initial_status(Variant::Local), SyncStatus::Synced);
    }

    #[test]
    fn test_persistence_routing() {
        use Persist::*;
        let cases = [
            (Variant::Remote, Effect::None, Nothing),
            (Variant::Remote, Effect::LocalOnly, SaveSuppressed),
            (Variant::Remote, Effect::PushOverlay, PushOverlay),
            (Variant::Local, Effect::None, Nothing),
            (Variant::Local, Effect::LocalOnly, SaveDataset),
            (Variant::Local, Effect::PushOverlay, SaveDataset),
        ];
        for (variant, effect, expected) in cases {
            assert_eq!(persistence(variant, effect), expected, "{:?} {:?}", variant, effect);
        }
    }

    #[test]
    fn test_shared_base_delete_is_never_pushed() {
        let mut ctl = Controller::new(MarkerStore::new(base_dataset()));
        ctl.select_marker(Category::Threats, 101);
        let effect = ctl.delete_active();
        assert_eq!(persistence(Variant::Remote, effect), Persist::SaveSuppressed);
        assert!(ctl.store().overlay().is_empty());
    }

    #[test]
    fn test_single_user_base_edits_are_saved() {
        let mut ctl = Controller::new(MarkerStore::editable(local::default_dataset()));
        ctl.select_marker(Category::Assets, 301);
        let effect = ctl.rename_active(Some("X".to_string())).unwrap();
        assert_eq!(persistence(Variant::Local, effect), Persist::SaveDataset);

        ctl.select_marker(Category::Threats, 101);
        let effect = ctl.delete_active();
        assert_eq!(persistence(Variant::Local, effect), Persist::SaveDataset);
        assert!(!ctl.composed().ids(Category::Threats).contains(&101));
    }

    #[test]
    fn test_shared_dashboard_waits_for_overlay() {
        let mut ctl = Controller::awaiting_overlay(MarkerStore::new(base_dataset()));
        ctl.select_add_mode(Category::Threats);
        let effect = ctl.map_click(Position::new(1.0, 1.0), 1_717_000_000_000);
        assert_eq!(persistence(Variant::Remote, effect), Persist::Nothing);
    }

    #[test]
    fn test_snapshot_document_becomes_overlay() {
        let snapshot = OverlaySnapshot {
            revision: 3,
            initialized: false,
            document: OverlayDocument {
                assets: vec![MarkerRecord {
                    id: 50_000,
                    name: "Relay".to_string(),
                    lat: 1.0,
                    lng: 2.0,
                    kind: "User Added".to_string(),
                    group: "My Squad".to_string(),
                }],
                ..Default::default()
            },
        };
        let mut ctl = Controller::awaiting_overlay(MarkerStore::new(base_dataset()));
        ctl.apply_remote(Dataset::from(snapshot.document));
        assert!(ctl.overlay_loaded());
        let assets = ctl.composed().ids(Category::Assets);
        assert_eq!(assets, vec![301, 302, 50_000]);
    }
}
