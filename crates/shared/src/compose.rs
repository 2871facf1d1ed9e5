use std::collections::BTreeSet;

use crate::models::{Category, Dataset, Marker, PerCategory};

/// Per-category display toggles. Hiding a category never touches data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility(PerCategory<bool>);

impl Default for Visibility {
    fn default() -> Self {
        Visibility(PerCategory::from_fn(|_| true))
    }
}

impl Visibility {
    pub fn is_visible(&self, category: Category) -> bool {
        *self.0.get(category)
    }

    /// Flip the flag for `category` and return the new value.
    pub fn toggle(&mut self, category: Category) -> bool {
        let flag = self.0.get_mut(category);
        *flag = !*flag;
        *flag
    }
}

/// The markers to draw, per category, in render order.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedView<'a> {
    layers: PerCategory<Vec<&'a Marker>>,
}

impl<'a> ComposedView<'a> {
    pub fn markers(&self, category: Category) -> &[&'a Marker] {
        self.layers.get(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Marker> + '_ {
        self.layers.iter().flat_map(|(_, markers)| markers.iter().copied())
    }

    pub fn ids(&self, category: Category) -> Vec<u64> {
        self.markers(category).iter().map(|m| m.id).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.iter().map(|(_, m)| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merge the base layer, the overlay and the local suppression set.
///
/// For each visible category: base markers not in `suppressed`, followed by
/// the overlay markers, both in insertion order. Hidden categories are empty.
pub fn compose<'a>(
    base: &'a Dataset,
    overlay: &'a Dataset,
    suppressed: &BTreeSet<u64>,
    visibility: &Visibility,
) -> ComposedView<'a> {
    let layers = PerCategory::from_fn(|category| {
        if !visibility.is_visible(category) {
            return Vec::new();
        }
        base.markers(category)
            .iter()
            .filter(|m| !suppressed.contains(&m.id))
            .chain(overlay.markers(category))
            .collect()
    });
    ComposedView { layers }
}
