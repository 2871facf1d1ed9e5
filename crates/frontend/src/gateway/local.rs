//! Browser storage for the single-user dashboard, plus the client-local
//! suppression set of the shared one.

use std::collections::BTreeSet;

use dioxus::logger::tracing;
use sentinels_shared::base::base_dataset;
use sentinels_shared::models::Dataset;

/// Key holding the single-user dashboard's whole dataset, in the same
/// `{THREATS, ASSETS, LOGISTICS}` layout as the shared document.
pub const STATE_KEY: &str = "sentinels_data";
/// Key holding the shared dashboard's suppressed base ids.
pub const SUPPRESSED_KEY: &str = "sentinels_suppressed";

/// The hardcoded markers as an editable dataset, used when nothing is stored.
pub fn default_dataset() -> Dataset {
    Dataset::from(base_dataset().to_document())
}

/// Parse the stored dataset. Missing or unreadable content yields the defaults.
pub fn decode_dataset(raw: Option<&str>) -> Dataset {
    let Some(raw) = raw else {
        return default_dataset();
    };
    match serde_json::from_str(raw) {
        Ok(dataset) => dataset,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable local data");
            default_dataset()
        }
    }
}

pub fn decode_suppressed(raw: Option<&str>) -> BTreeSet<u64> {
    raw.and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}

fn storage() -> Result<web_sys::Storage, String> {
    let window = web_sys::window().ok_or("no window")?;
    window
        .local_storage()
        .map_err(|e| format!("localStorage error: {:?}", e))?
        .ok_or_else(|| "localStorage not available".to_string())
}

fn read(key: &str) -> Option<String> {
    match storage().and_then(|s| s.get_item(key).map_err(|e| format!("{:?}", e))) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read local storage");
            None
        }
    }
}

fn write(key: &str, value: &str) -> Result<(), String> {
    storage()?
        .set_item(key, value)
        .map_err(|e| format!("failed to write {}: {:?}", key, e))
}

pub fn load_dataset() -> Dataset {
    decode_dataset(read(STATE_KEY).as_deref())
}

pub fn save_dataset(dataset: &Dataset) -> Result<(), String> {
    let json = serde_json::to_string(dataset).map_err(|e| e.to_string())?;
    write(STATE_KEY, &json)
}

pub fn load_suppressed() -> BTreeSet<u64> {
    decode_suppressed(read(SUPPRESSED_KEY).as_deref())
}

pub fn save_suppressed(suppressed: &BTreeSet<u64>) -> Result<(), String> {
    let json = serde_json::to_string(suppressed).map_err(|e| e.to_string())?;
    write(SUPPRESSED_KEY, &json)
}

/// Wipe browser storage and reload, bringing back the hardcoded defaults.
pub fn reset() -> Result<(), String> {
    storage()?
        .clear()
        .map_err(|e| format!("failed to clear storage: {:?}", e))?;
    tracing::info!("Local state cleared");
    let window = web_sys::window().ok_or("no window")?;
    window
        .location()
        .reload()
        .map_err(|e| format!("failed to reload: {:?}", e))
}
