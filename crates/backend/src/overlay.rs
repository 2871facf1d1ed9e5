use std::sync::Arc;

use sentinels_shared::models::{Category, OverlayDocument, RESERVED_ID_THRESHOLD};
use sentinels_shared::sync::{overlay_key, OverlaySnapshot};
use tokio::sync::broadcast;

use crate::storage::{StoredDocument, Storage};

/// Snapshots buffered per subscriber before it starts lagging.
const CHANGE_BUFFER: usize = 64;

/// The shared overlay document plus change notification for live subscribers.
pub struct OverlayHub {
    storage: Arc<Storage>,
    key: String,
    changes: broadcast::Sender<OverlaySnapshot>,
}

impl OverlayHub {
    pub fn new(storage: Arc<Storage>) -> Arc<Self> {
        Self::with_key(storage, overlay_key())
    }

    pub fn with_key(storage: Arc<Storage>, key: String) -> Arc<Self> {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Arc::new(OverlayHub {
            storage,
            key,
            changes,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Current document, if one has been written or initialized.
    pub fn current(&self) -> Result<Option<StoredDocument>, String> {
        self.storage.get(&self.key)
    }

    /// Register for change notifications and read the current content.
    ///
    /// The receiver is created before the read so no write can slip between
    /// the two. A missing document is created empty and the returned snapshot
    /// is marked `initialized`.
    pub fn subscribe(
        &self,
    ) -> Result<(OverlaySnapshot, broadcast::Receiver<OverlaySnapshot>), String> {
        let receiver = self.changes.subscribe();
        let (stored, created) = self.storage.get_or_init(&self.key)?;
        if created {
            tracing::info!(key = %self.key, "Initialized empty overlay document");
        }
        let snapshot = OverlaySnapshot {
            revision: stored.revision,
            initialized: created,
            document: stored.document,
        };
        Ok((snapshot, receiver))
    }

    /// Overwrite the document and notify subscribers. Returns the new revision.
    pub fn push(&self, document: OverlayDocument) -> Result<u64, String> {
        validate(&document)?;
        let stored = self.storage.put(&self.key, document)?;
        tracing::info!(
            revision = stored.revision,
            markers = stored.document.len(),
            "Overlay document written"
        );
        let revision = stored.revision;
        // No receivers is fine: nobody is watching right now.
        let _ = self.changes.send(OverlaySnapshot {
            revision,
            initialized: false,
            document: stored.document,
        });
        Ok(revision)
    }

    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

/// Overlay entries must keep ids clear of the reserved base range.
fn validate(document: &OverlayDocument) -> Result<(), String> {
    for category in Category::ALL {
        if let Some(record) = document
            .records(category)
            .iter()
            .find(|r| r.id < RESERVED_ID_THRESHOLD)
        {
            return Err(format!(
                "{} entry {} uses an id reserved for the base layer (must be >= {})",
                category, record.id, RESERVED_ID_THRESHOLD
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinels_shared::models::MarkerRecord;

    fn hub() -> (tempfile::TempDir, Arc<OverlayHub>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("hub.redb")).unwrap();
        (dir, OverlayHub::new(storage))
    }

    fn record(id: u64, name: &str) -> MarkerRecord {
        MarkerRecord {
            id,
            name: name.to_string(),
            lat: 44.7,
            lng: -63.6,
            kind: "User Added".to_string(),
            group: "My Squad".to_string(),
        }
    }

    #[test]
    fn test_first_subscribe_initializes_document() {
        let (_dir, hub) = hub();
        assert!(hub.current().unwrap().is_none());

        let (snapshot, _rx) = hub.subscribe().unwrap();
        assert!(snapshot.initialized);
        assert_eq!(snapshot.revision, 0);
        assert!(snapshot.document.is_empty());

        let (again, _rx) = hub.subscribe().unwrap();
        assert!(!again.initialized);
        assert!(hub.current().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_push_is_broadcast_to_subscribers() {
        let (_dir, hub) = hub();
        let (_, mut rx) = hub.subscribe().unwrap();

        let doc = OverlayDocument {
            assets: vec![record(20_000, "Overwatch")],
            ..Default::default()
        };
        let revision = hub.push(doc.clone()).unwrap();
        assert_eq!(revision, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.revision, 1);
        assert!(!received.initialized);
        assert_eq!(received.document, doc);
    }

    #[tokio::test]
    async fn test_revisions_increase_across_pushes() {
        let (_dir, hub) = hub();
        let (_, mut rx) = hub.subscribe().unwrap();
        hub.push(OverlayDocument::default()).unwrap();
        hub.push(OverlayDocument::default()).unwrap();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(second.revision > first.revision);
    }

    #[test]
    fn test_push_without_subscribers_still_persists() {
        let (_dir, hub) = hub();
        assert_eq!(hub.subscriber_count(), 0);
        hub.push(OverlayDocument {
            threats: vec![record(30_000, "Lone")],
            ..Default::default()
        })
        .unwrap();
        let stored = hub.current().unwrap().unwrap();
        assert_eq!(stored.document.threats[0].name, "Lone");
    }

    #[test]
    fn test_push_rejects_reserved_ids() {
        let (_dir, hub) = hub();
        let err = hub
            .push(OverlayDocument {
                logistics: vec![record(401, "Spoofed")],
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.contains("LOGISTICS"));
        assert!(hub.current().unwrap().is_none());
    }
}
