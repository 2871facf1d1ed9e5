use serde::{Deserialize, Serialize};

use crate::models::OverlayDocument;

/// Collection holding the shared overlay document.
pub const OVERLAY_COLLECTION: &str = "sentinels";
/// Id of the single overlay document inside [`OVERLAY_COLLECTION`].
pub const OVERLAY_DOCUMENT: &str = "overlay";

/// Storage key of the overlay document: `collection/id`.
pub fn overlay_key() -> String {
    format!("{}/{}", OVERLAY_COLLECTION, OVERLAY_DOCUMENT)
}

/// Persistence health as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncStatus {
    Connecting,
    Synced,
    /// The document did not exist and was created empty.
    Initialized,
    Offline,
}

impl SyncStatus {
    pub fn label(self) -> &'static str {
        match self {
            SyncStatus::Connecting => "CONNECTING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Initialized => "INITIALIZED",
            SyncStatus::Offline => "OFFLINE",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One change notification for the overlay document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySnapshot {
    /// Incremented by the store on every write.
    pub revision: u64,
    /// Set on the first event when the store had to create the document.
    #[serde(default)]
    pub initialized: bool,
    pub document: OverlayDocument,
}

impl OverlaySnapshot {
    pub fn status(&self) -> SyncStatus {
        if self.initialized {
            SyncStatus::Initialized
        } else {
            SyncStatus::Synced
        }
    }
}

/// Orders in-flight overlay pushes against incoming snapshots.
///
/// A client's own optimistic edits must not be clobbered by a snapshot that
/// predates them. While any push is unacknowledged, snapshots are held (only
/// the newest is kept). Once every push is settled the held snapshot is
/// applied if it is not older than the last acknowledged revision.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    pending: u32,
    floor: u64,
    held: Option<OverlaySnapshot>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pushes not yet acknowledged or failed.
    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Record that a push has been sent.
    pub fn begin_write(&mut self) {
        self.pending += 1;
    }

    /// Handle a snapshot from the subscription. Returns the snapshot if it
    /// should be applied now.
    pub fn on_snapshot(&mut self, snapshot: OverlaySnapshot) -> Option<OverlaySnapshot> {
        if snapshot.revision < self.floor {
            return None;
        }
        if self.pending > 0 {
            let newer = self
                .held
                .as_ref()
                .map_or(true, |held| snapshot.revision >= held.revision);
            if newer {
                self.held = Some(snapshot);
            }
            return None;
        }
        self.floor = snapshot.revision;
        Some(snapshot)
    }

    /// A push was acknowledged with the document's new revision.
    pub fn on_ack(&mut self, revision: u64) -> Option<OverlaySnapshot> {
        self.floor = self.floor.max(revision);
        self.settle()
    }

    /// A push failed; the local state stays as it is.
    pub fn on_write_failed(&mut self) -> Option<OverlaySnapshot> {
        self.settle()
    }

    fn settle(&mut self) -> Option<OverlaySnapshot> {
        self.pending = self.pending.saturating_sub(1);
        if self.pending > 0 {
            return None;
        }
        let held = self.held.take()?;
        if held.revision < self.floor {
            return None;
        }
        self.floor = held.revision;
        Some(held)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarkerRecord;

    fn snapshot(revision: u64, names: &[&str]) -> OverlaySnapshot {
        OverlaySnapshot {
            revision,
            initialized: false,
            document: OverlayDocument {
                threats: names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| MarkerRecord {
                        id: 10_000 + i as u64,
                        name: n.to_string(),
                        lat: 0.0,
                        lng: 0.0,
                        kind: "User Added".to_string(),
                        group: "Unknown Force".to_string(),
                    })
                    .collect(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_overlay_key() {
        assert_eq!(overlay_key(), "sentinels/overlay");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(SyncStatus::Offline.to_string(), "OFFLINE");
        assert_eq!(
            serde_json::to_value(SyncStatus::Initialized).unwrap(),
            "INITIALIZED"
        );
    }

    #[test]
    fn test_snapshot_status() {
        let mut s = snapshot(0, &[]);
        assert_eq!(s.status(), SyncStatus::Synced);
        s.initialized = true;
        assert_eq!(s.status(), SyncStatus::Initialized);
    }

    #[test]
    fn test_snapshot_deserializes_camel_case() {
        let json = r#"{"revision":3,"document":{"THREATS":[],"ASSETS":[],"LOGISTICS":[]}}"#;
        let s: OverlaySnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(s.revision, 3);
        assert!(!s.initialized);
    }

    #[test]
    fn test_snapshot_applied_immediately_when_idle() {
        let mut r = Reconciler::new();
        assert!(r.on_snapshot(snapshot(1, &["a"])).is_some());
        assert!(r.on_snapshot(snapshot(2, &["a", "b"])).is_some());
    }

    #[test]
    fn test_out_of_order_snapshot_is_dropped() {
        let mut r = Reconciler::new();
        r.on_snapshot(snapshot(5, &["a"]));
        assert!(r.on_snapshot(snapshot(4, &[])).is_none());
    }

    #[test]
    fn test_snapshot_held_while_write_pending() {
        let mut r = Reconciler::new();
        r.begin_write();
        assert!(r.on_snapshot(snapshot(1, &["remote"])).is_none());
        assert_eq!(r.pending(), 1);

        // Our write landed after the held snapshot, so the held one is stale.
        assert!(r.on_ack(2).is_none());
        assert_eq!(r.pending(), 0);
        assert!(r.on_snapshot(snapshot(1, &["remote"])).is_none());
    }

    #[test]
    fn test_newer_held_snapshot_applies_after_ack() {
        let mut r = Reconciler::new();
        r.begin_write();
        r.on_snapshot(snapshot(2, &["mine"]));
        r.on_snapshot(snapshot(3, &["mine", "theirs"]));
        let applied = r.on_ack(2).unwrap();
        assert_eq!(applied.revision, 3);
        assert_eq!(applied.document.threats.len(), 2);
    }

    #[test]
    fn test_held_snapshot_waits_for_every_write() {
        let mut r = Reconciler::new();
        r.begin_write();
        r.begin_write();
        r.on_snapshot(snapshot(4, &["x"]));
        assert!(r.on_ack(3).is_none());
        let applied = r.on_ack(4).unwrap();
        assert_eq!(applied.revision, 4);
    }

    #[test]
    fn test_failed_write_releases_held_snapshot() {
        let mut r = Reconciler::new();
        r.begin_write();
        r.on_snapshot(snapshot(7, &["remote"]));
        let applied = r.on_write_failed().unwrap();
        assert_eq!(applied.revision, 7);
        assert_eq!(r.pending(), 0);
    }
}
