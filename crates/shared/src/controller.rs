use crate::compose::ComposedView;
use crate::models::{Category, Dataset, Marker, Position};
use crate::store::{Effect, MarkerStore, StoreError};

/// The marker currently shown in the detail panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub category: Category,
    pub id: u64,
}

/// Text-entry dialog used to rename a marker.
///
/// Confirming yields the typed text, cancelling yields `None`; both close it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameDialog {
    draft: Option<String>,
}

impl RenameDialog {
    pub fn open(&mut self, current_name: &str) {
        self.draft = Some(current_name.to_string());
    }

    pub fn is_open(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn set_draft(&mut self, text: &str) {
        if let Some(draft) = self.draft.as_mut() {
            *draft = text.to_string();
        }
    }

    pub fn confirm(&mut self) -> Option<String> {
        self.draft.take()
    }

    pub fn cancel(&mut self) -> Option<String> {
        self.draft = None;
        None
    }
}

/// Turns editor-bar, map and detail-panel events into store operations.
#[derive(Debug, Clone)]
pub struct Controller {
    store: MarkerStore,
    add_mode: Option<Category>,
    active: Option<Selection>,
    dialog: RenameDialog,
    overlay_loaded: bool,
}

impl Controller {
    /// A controller whose overlay is already authoritative.
    pub fn new(store: MarkerStore) -> Self {
        Controller {
            store,
            add_mode: None,
            active: None,
            dialog: RenameDialog::default(),
            overlay_loaded: true,
        }
    }

    /// A controller whose overlay lives in the shared document and has not
    /// arrived yet. Adding is refused until [`Controller::apply_remote`] runs,
    /// since a push would overwrite the document with an empty overlay.
    pub fn awaiting_overlay(store: MarkerStore) -> Self {
        Controller {
            overlay_loaded: false,
            ..Self::new(store)
        }
    }

    pub fn overlay_loaded(&self) -> bool {
        self.overlay_loaded
    }

    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    pub fn add_mode(&self) -> Option<Category> {
        self.add_mode
    }

    /// Arm add mode for `category`. Selecting the armed category again
    /// disarms it; selecting another one replaces it.
    pub fn select_add_mode(&mut self, category: Category) {
        if !self.overlay_loaded {
            return;
        }
        self.add_mode = if self.add_mode == Some(category) {
            None
        } else {
            Some(category)
        };
    }

    /// Place a marker at the clicked position if add mode is armed.
    /// Add mode is single-shot and is cleared afterwards.
    pub fn map_click(&mut self, position: Position, now_ms: u64) -> Effect {
        if !self.overlay_loaded {
            return Effect::None;
        }
        let Some(category) = self.add_mode.take() else {
            return Effect::None;
        };
        self.store.add(category, position, now_ms);
        Effect::PushOverlay
    }

    pub fn toggle_visibility(&mut self, category: Category) -> bool {
        self.store.toggle_visibility(category)
    }

    pub fn select_marker(&mut self, category: Category, id: u64) {
        self.active = Some(Selection { category, id });
        self.dialog.cancel();
    }

    pub fn close_detail(&mut self) {
        self.active = None;
        self.dialog.cancel();
    }

    pub fn selection(&self) -> Option<Selection> {
        self.active
    }

    /// The selected marker, if it still exists.
    pub fn active_marker(&self) -> Option<&Marker> {
        let sel = self.active?;
        self.store.lookup(sel.category, sel.id)
    }

    pub fn rename_dialog(&self) -> &RenameDialog {
        &self.dialog
    }

    pub fn rename_dialog_mut(&mut self) -> &mut RenameDialog {
        &mut self.dialog
    }

    /// Open the rename dialog for the selected marker, prefilled with its name.
    pub fn begin_rename(&mut self) {
        let name = match self.active_marker() {
            Some(marker) => marker.name.clone(),
            None => return,
        };
        self.dialog.open(&name);
    }

    /// Apply the dialog's answer to the selected marker.
    pub fn rename_active(&mut self, answer: Option<String>) -> Result<Effect, StoreError> {
        let Some(sel) = self.active else {
            return Ok(Effect::None);
        };
        self.store.rename(sel.category, sel.id, answer.as_deref())
    }

    /// Delete the selected marker and close the detail panel.
    pub fn delete_active(&mut self) -> Effect {
        let Some(sel) = self.active.take() else {
            return Effect::None;
        };
        self.dialog.cancel();
        self.store.delete(sel.category, sel.id)
    }

    pub fn apply_remote(&mut self, overlay: Dataset) {
        self.store.apply_remote(overlay);
        self.overlay_loaded = true;
    }

    pub fn composed(&self) -> ComposedView<'_> {
        self.store.composed()
    }
}
