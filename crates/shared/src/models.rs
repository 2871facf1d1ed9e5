use serde::{Deserialize, Serialize};

/// Ids below this value are reserved for base-layer markers. User-created
/// markers are always allocated at or above it.
pub const RESERVED_ID_THRESHOLD: u64 = 9999;

/// Kind assigned to every marker placed from the editor bar.
pub const USER_ADDED_KIND: &str = "User Added";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Threats,
    Assets,
    Logistics,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Threats, Category::Assets, Category::Logistics];

    /// Field name used in overlay documents and layer controls.
    pub fn key(self) -> &'static str {
        match self {
            Category::Threats => "THREATS",
            Category::Assets => "ASSETS",
            Category::Logistics => "LOGISTICS",
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Category::Threats => "New Hostile",
            Category::Assets => "New FOB",
            Category::Logistics => "New Refuel",
        }
    }

    pub fn default_group(self) -> &'static str {
        match self {
            Category::Threats => "Unknown Force",
            Category::Assets => "My Squad",
            Category::Logistics => "Public",
        }
    }

    /// Label of the editor-bar button that arms add mode for this category.
    pub fn add_label(self) -> &'static str {
        match self {
            Category::Threats => "+ HOSTILE",
            Category::Assets => "+ ASSET",
            Category::Logistics => "+ REFUEL",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Category::Threats => "#ff0055",
            Category::Assets => "#00ff99",
            Category::Logistics => "#00ccff",
        }
    }

    /// Threat markers get a pulsing ring on the map.
    pub fn pulses(self) -> bool {
        matches!(self, Category::Threats)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Which layer a marker lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Hardcoded, identical on every client, never mutated.
    Base,
    /// User-generated and shared through the overlay document.
    Overlay,
}

/// One value per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerCategory<T> {
    pub threats: T,
    pub assets: T,
    pub logistics: T,
}

impl<T> PerCategory<T> {
    pub fn get(&self, category: Category) -> &T {
        match category {
            Category::Threats => &self.threats,
            Category::Assets => &self.assets,
            Category::Logistics => &self.logistics,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::Threats => &mut self.threats,
            Category::Assets => &mut self.assets,
            Category::Logistics => &mut self.logistics,
        }
    }

    /// Build a value for every category from a function of the category.
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        PerCategory {
            threats: f(Category::Threats),
            assets: f(Category::Assets),
            logistics: f(Category::Logistics),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Position { lat, lng }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: u64,
    pub name: String,
    pub position: Position,
    pub kind: String,
    pub group: String,
    pub category: Category,
    pub origin: Origin,
}

impl Marker {
    pub fn is_base(&self) -> bool {
        self.origin == Origin::Base
    }

    pub fn from_record(record: MarkerRecord, category: Category, origin: Origin) -> Self {
        Marker {
            id: record.id,
            name: record.name,
            position: Position::new(record.lat, record.lng),
            kind: record.kind,
            group: record.group,
            category,
            origin,
        }
    }

    pub fn to_record(&self) -> MarkerRecord {
        MarkerRecord {
            id: self.id,
            name: self.name.clone(),
            lat: self.position.lat,
            lng: self.position.lng,
            kind: self.kind.clone(),
            group: self.group.clone(),
        }
    }
}

/// A marker as stored in the overlay document. Category and origin are
/// implied by where the record sits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "faction")]
    pub group: String,
}

/// The persisted shape of the overlay dataset: one array per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayDocument {
    #[serde(rename = "THREATS", default)]
    pub threats: Vec<MarkerRecord>,
    #[serde(rename = "ASSETS", default)]
    pub assets: Vec<MarkerRecord>,
    #[serde(rename = "LOGISTICS", default)]
    pub logistics: Vec<MarkerRecord>,
}

impl OverlayDocument {
    pub fn records(&self, category: Category) -> &[MarkerRecord] {
        match category {
            Category::Threats => &self.threats,
            Category::Assets => &self.assets,
            Category::Logistics => &self.logistics,
        }
    }

    pub fn len(&self) -> usize {
        self.threats.len() + self.assets.len() + self.logistics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Categorized, ordered marker collections.
///
/// Markers are filed by their own `category`, so a marker can never end up in
/// another category's sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "OverlayDocument", into = "OverlayDocument")]
pub struct Dataset {
    markers: PerCategory<Vec<Marker>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a document, tagging every entry with `origin`.
    pub fn from_document(doc: OverlayDocument, origin: Origin) -> Self {
        let OverlayDocument {
            threats,
            assets,
            logistics,
        } = doc;
        let tag = |records: Vec<MarkerRecord>, category: Category| -> Vec<Marker> {
            records
                .into_iter()
                .map(|r| Marker::from_record(r, category, origin))
                .collect()
        };
        Dataset {
            markers: PerCategory {
                threats: tag(threats, Category::Threats),
                assets: tag(assets, Category::Assets),
                logistics: tag(logistics, Category::Logistics),
            },
        }
    }

    pub fn to_document(&self) -> OverlayDocument {
        let records = |c: Category| -> Vec<MarkerRecord> {
            self.markers(c).iter().map(Marker::to_record).collect()
        };
        OverlayDocument {
            threats: records(Category::Threats),
            assets: records(Category::Assets),
            logistics: records(Category::Logistics),
        }
    }

    pub fn markers(&self, category: Category) -> &[Marker] {
        self.markers.get(category)
    }

    pub fn push(&mut self, marker: Marker) {
        self.markers.get_mut(marker.category).push(marker);
    }

    pub fn find(&self, category: Category, id: u64) -> Option<&Marker> {
        self.markers(category).iter().find(|m| m.id == id)
    }

    pub fn find_mut(&mut self, category: Category, id: u64) -> Option<&mut Marker> {
        self.markers.get_mut(category).iter_mut().find(|m| m.id == id)
    }

    /// Remove the marker with `id` from `category`, returning it.
    pub fn remove(&mut self, category: Category, id: u64) -> Option<Marker> {
        let markers = self.markers.get_mut(category);
        let idx = markers.iter().position(|m| m.id == id)?;
        Some(markers.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        Category::ALL
            .into_iter()
            .flat_map(move |c| self.markers(c).iter())
    }

    pub fn max_id(&self) -> Option<u64> {
        self.iter().map(|m| m.id).max()
    }

    pub fn len(&self) -> usize {
        self.markers.iter().map(|(_, m)| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<OverlayDocument> for Dataset {
    fn from(doc: OverlayDocument) -> Self {
        Dataset::from_document(doc, Origin::Overlay)
    }
}

impl From<Dataset> for OverlayDocument {
    fn from(dataset: Dataset) -> Self {
        dataset.to_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, name: &str) -> MarkerRecord {
        MarkerRecord {
            id,
            name: name.to_string(),
            lat: 1.5,
            lng: -2.5,
            kind: USER_ADDED_KIND.to_string(),
            group: "My Squad".to_string(),
        }
    }

    #[test]
    fn test_category_serializes_as_document_key() {
        for c in Category::ALL {
            let json = serde_json::to_value(c).unwrap();
            assert_eq!(json, c.key());
        }
    }

    #[test]
    fn test_only_threats_pulse() {
        assert!(Category::Threats.pulses());
        assert!(!Category::Assets.pulses());
        assert!(!Category::Logistics.pulses());
    }

    #[test]
    fn test_marker_record_uses_document_field_names() {
        let json = serde_json::to_value(record(10_000, "Alpha")).unwrap();
        assert_eq!(json["type"], "User Added");
        assert_eq!(json["faction"], "My Squad");
        assert_eq!(json["lat"], 1.5);
        assert!(json.get("kind").is_none());
        assert!(json.get("group").is_none());
    }

    #[test]
    fn test_document_missing_categories_default_to_empty() {
        let doc: OverlayDocument = serde_json::from_str(r#"{"THREATS":[]}"#).unwrap();
        assert!(doc.is_empty());
        assert!(doc.records(Category::Logistics).is_empty());
    }

    #[test]
    fn test_dataset_decodes_document_with_category_and_origin() {
        let json = r#"{
            "THREATS": [{"id":10001,"name":"A","lat":1.0,"lng":2.0,"type":"User Added","faction":"Unknown Force"}],
            "ASSETS": [],
            "LOGISTICS": [{"id":10002,"name":"B","lat":3.0,"lng":4.0,"type":"User Added","faction":"Public"}]
        }"#;
        let dataset: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.len(), 2);

        let a = dataset.find(Category::Threats, 10001).unwrap();
        assert_eq!(a.category, Category::Threats);
        assert_eq!(a.origin, Origin::Overlay);
        assert_eq!(a.position, Position::new(1.0, 2.0));

        let b = dataset.find(Category::Logistics, 10002).unwrap();
        assert_eq!(b.group, "Public");
        assert!(dataset.find(Category::Threats, 10002).is_none());
    }

    #[test]
    fn test_dataset_serializes_as_document() {
        let mut dataset = Dataset::new();
        dataset.push(Marker::from_record(
            record(10_000, "Alpha"),
            Category::Assets,
            Origin::Overlay,
        ));
        let json = serde_json::to_value(&dataset).unwrap();
        assert_eq!(json["ASSETS"][0]["name"], "Alpha");
        assert_eq!(json["THREATS"].as_array().unwrap().len(), 0);
        assert_eq!(json["LOGISTICS"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_push_files_marker_under_its_category() {
        let mut dataset = Dataset::new();
        dataset.push(Marker::from_record(
            record(10_000, "Alpha"),
            Category::Logistics,
            Origin::Overlay,
        ));
        assert_eq!(dataset.markers(Category::Logistics).len(), 1);
        assert!(dataset.markers(Category::Threats).is_empty());
    }

    #[test]
    fn test_remove_returns_marker_and_preserves_order() {
        let mut dataset = Dataset::new();
        for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
            dataset.push(Marker::from_record(
                record(id, name),
                Category::Threats,
                Origin::Overlay,
            ));
        }
        let removed = dataset.remove(Category::Threats, 2).unwrap();
        assert_eq!(removed.name, "b");
        let ids: Vec<u64> = dataset.markers(Category::Threats).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(dataset.remove(Category::Threats, 2).is_none());
    }

    #[test]
    fn test_max_id_spans_categories() {
        let mut dataset = Dataset::new();
        assert_eq!(dataset.max_id(), None);
        dataset.push(Marker::from_record(record(5, "a"), Category::Threats, Origin::Overlay));
        dataset.push(Marker::from_record(record(9, "b"), Category::Assets, Origin::Overlay));
        assert_eq!(dataset.max_id(), Some(9));
    }
}
