use std::collections::BTreeSet;

use crate::compose::{compose, ComposedView, Visibility};
use crate::models::{
    Category, Dataset, Marker, Origin, Position, RESERVED_ID_THRESHOLD, USER_ADDED_KIND,
};

/// What the caller has to do after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing changed.
    None,
    /// The overlay changed and must be pushed to the shared document.
    PushOverlay,
    /// Only client-local state (the suppression set) changed.
    LocalOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The target is a base-layer marker, which cannot be edited.
    InvalidOperation { category: Category, id: u64 },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidOperation { category, id } => write!(
                f,
                "{} marker {} is part of the base intel layer and cannot be renamed",
                category, id
            ),
        }
    }
}

impl std::error::Error for StoreError {}

/// Allocates overlay ids from a millisecond clock.
///
/// Ids are strictly increasing within a session and never below
/// [`RESERVED_ID_THRESHOLD`], even if the clock stalls or goes backwards.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    pub fn next(&mut self, now_ms: u64) -> u64 {
        let id = now_ms
            .max(self.last.saturating_add(1))
            .max(RESERVED_ID_THRESHOLD);
        self.last = id;
        id
    }

    /// Make sure future ids land above `id`.
    pub fn observe(&mut self, id: u64) {
        self.last = self.last.max(id);
    }
}

/// Owns the overlay dataset and the client-local suppression set, with the
/// read-only base layer alongside for lookups and composition.
#[derive(Debug, Clone)]
pub struct MarkerStore {
    base: Dataset,
    overlay: Dataset,
    suppressed: BTreeSet<u64>,
    visibility: Visibility,
    ids: IdGenerator,
}

impl MarkerStore {
    pub fn new(base: Dataset) -> Self {
        Self::with_state(base, Dataset::new(), BTreeSet::new())
    }

    /// A store without a base layer, where every marker is editable and
    /// deletions really remove. Used by the single-user dashboard.
    pub fn editable(dataset: Dataset) -> Self {
        Self::with_state(Dataset::new(), dataset, BTreeSet::new())
    }

    /// Restore a store from persisted overlay and suppression state.
    pub fn with_state(base: Dataset, overlay: Dataset, suppressed: BTreeSet<u64>) -> Self {
        let mut ids = IdGenerator::default();
        if let Some(max) = overlay.max_id() {
            ids.observe(max);
        }
        MarkerStore {
            base,
            overlay,
            suppressed,
            visibility: Visibility::default(),
            ids,
        }
    }

    pub fn base(&self) -> &Dataset {
        &self.base
    }

    pub fn overlay(&self) -> &Dataset {
        &self.overlay
    }

    pub fn suppressed(&self) -> &BTreeSet<u64> {
        &self.suppressed
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Base ids are unique across categories, so the category is not needed.
    fn is_base(&self, id: u64) -> bool {
        self.base.iter().any(|m| m.id == id)
    }

    /// Place a new user marker. Always requires an overlay push.
    ///
    /// Coordinates are taken as-is; there is no range validation.
    pub fn add(&mut self, category: Category, position: Position, now_ms: u64) -> &Marker {
        let id = self.ids.next(now_ms);
        self.overlay.push(Marker {
            id,
            name: category.default_name().to_string(),
            position,
            kind: USER_ADDED_KIND.to_string(),
            group: category.default_group().to_string(),
            category,
            origin: Origin::Overlay,
        });
        let added = self.overlay.markers(category);
        &added[added.len() - 1]
    }

    /// Rename an overlay marker.
    ///
    /// A `None` or empty name (a cancelled dialog) and unknown ids are no-ops.
    pub fn rename(
        &mut self,
        category: Category,
        id: u64,
        new_name: Option<&str>,
    ) -> Result<Effect, StoreError> {
        if self.is_base(id) {
            return Err(StoreError::InvalidOperation { category, id });
        }
        let name = match new_name {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(Effect::None),
        };
        match self.overlay.find_mut(category, id) {
            Some(marker) => {
                marker.name = name.to_string();
                Ok(Effect::PushOverlay)
            }
            None => Ok(Effect::None),
        }
    }

    /// Delete a marker.
    ///
    /// Base markers are only hidden on this client, whatever `category` is
    /// given. Overlay markers are removed from the shared dataset.
    pub fn delete(&mut self, category: Category, id: u64) -> Effect {
        if self.is_base(id) {
            return if self.suppressed.insert(id) {
                Effect::LocalOnly
            } else {
                Effect::None
            };
        }
        match self.overlay.remove(category, id) {
            Some(_) => Effect::PushOverlay,
            None => Effect::None,
        }
    }

    pub fn toggle_visibility(&mut self, category: Category) -> bool {
        self.visibility.toggle(category)
    }

    /// Replace the overlay with a snapshot received from the shared store.
    pub fn apply_remote(&mut self, overlay: Dataset) {
        if let Some(max) = overlay.max_id() {
            self.ids.observe(max);
        }
        self.overlay = overlay;
    }

    /// Find a marker in either layer.
    pub fn lookup(&self, category: Category, id: u64) -> Option<&Marker> {
        self.overlay
            .find(category, id)
            .or_else(|| self.base.find(category, id))
    }

    pub fn composed(&self) -> ComposedView<'_> {
        compose(&self.base, &self.overlay, &self.suppressed, &self.visibility)
    }
}
