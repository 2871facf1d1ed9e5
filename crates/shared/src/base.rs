use crate::models::{Category, Dataset, Marker, Origin, Position};

/// (id, name, lat, lng, kind, group)
type Entry = (u64, &'static str, f64, f64, &'static str, &'static str);

const THREATS: &[Entry] = &[
    (101, "MSC United VIII", 13.2, 42.9, "Missile Strike", "Houthi Forces"),
    (102, "Maersk Hangzhou", 14.8, 41.9, "Anti-Ship Missile", "Houthi Forces"),
    (103, "Chem Pluto", 20.1, 65.2, "Drone Strike", "Houthi Forces"),
    (106, "Galaxy Leader", 14.9, 42.8, "Hijacking", "Houthi Forces"),
    (201, "Sim: W.C.C. Raid", -5.8, 11.5, "Raid", "West Congo Cougars"),
    (202, "Sim: Supply Convoy", -4.9, 12.1, "Ambush", "West Congo Cougars"),
];

const ASSETS: &[Entry] = &[
    (301, "FOB: The Crib", 44.7, -63.6, "Safehouse", "My Squad"),
    (302, "Asset: Dave's House", 44.65, -63.58, "Ally", "My Squad"),
];

const LOGISTICS: &[Entry] = &[
    (401, "Refuel: Pizza Hut", 44.66, -63.62, "Nutrition", "Supply Chain"),
    (402, "Refuel: Gym", 44.72, -63.65, "Training", "Self Improvement"),
];

fn entries(category: Category) -> &'static [Entry] {
    match category {
        Category::Threats => THREATS,
        Category::Assets => ASSETS,
        Category::Logistics => LOGISTICS,
    }
}

/// The hardcoded base layer shown on every client.
pub fn base_dataset() -> Dataset {
    let mut dataset = Dataset::new();
    for category in Category::ALL {
        for &(id, name, lat, lng, kind, group) in entries(category) {
            dataset.push(Marker {
                id,
                name: name.to_string(),
                position: Position::new(lat, lng),
                kind: kind.to_string(),
                group: group.to_string(),
                category,
                origin: Origin::Base,
            });
        }
    }
    dataset
}
