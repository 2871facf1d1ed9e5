use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use sentinels_shared::models::OverlayDocument;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// A document as persisted: the overlay content plus write bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub revision: u64,
    pub updated_at: String,
    pub document: OverlayDocument,
}

impl StoredDocument {
    fn empty() -> Self {
        StoredDocument {
            revision: 0,
            updated_at: chrono::Utc::now().to_rfc3339(),
            document: OverlayDocument::default(),
        }
    }
}

fn decode(bytes: &[u8]) -> Result<StoredDocument, String> {
    serde_json::from_slice(bytes).map_err(|e| e.to_string())
}

/// Key → JSON document store on top of a single redb table.
pub struct Storage {
    db: Database,
    path: PathBuf,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, String> {
        let db = Database::create(path)
            .map_err(|e| format!("Failed to open database at {}: {}", path.display(), e))?;

        // Ensure table exists
        let write_txn = db.begin_write().map_err(|e| e.to_string())?;
        {
            let _ = write_txn.open_table(DOCUMENTS_TABLE);
        }
        write_txn.commit().map_err(|e| e.to_string())?;

        Ok(Arc::new(Storage {
            db,
            path: path.to_path_buf(),
        }))
    }

    pub fn get(&self, key: &str) -> Result<Option<StoredDocument>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn
            .open_table(DOCUMENTS_TABLE)
            .map_err(|e| e.to_string())?;

        match table.get(key).map_err(|e| e.to_string())? {
            Some(value) => decode(value.value()).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch a document, creating it empty at revision 0 if it is missing.
    /// The flag is true when this call created it.
    pub fn get_or_init(&self, key: &str) -> Result<(StoredDocument, bool), String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let result = {
            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(|e| e.to_string())?;
            let existing = match table.get(key).map_err(|e| e.to_string())? {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };
            match existing {
                Some(stored) => (stored, false),
                None => {
                    let stored = StoredDocument::empty();
                    let json = serde_json::to_vec(&stored).map_err(|e| e.to_string())?;
                    table
                        .insert(key, json.as_slice())
                        .map_err(|e| e.to_string())?;
                    (stored, true)
                }
            }
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(result)
    }

    /// Overwrite a document and bump its revision.
    pub fn put(&self, key: &str, document: OverlayDocument) -> Result<StoredDocument, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        let stored = {
            let mut table = write_txn
                .open_table(DOCUMENTS_TABLE)
                .map_err(|e| e.to_string())?;
            let previous_revision = match table.get(key).map_err(|e| e.to_string())? {
                Some(value) => decode(value.value())?.revision,
                None => 0,
            };
            let stored = StoredDocument {
                revision: previous_revision + 1,
                updated_at: chrono::Utc::now().to_rfc3339(),
                document,
            };
            let json = serde_json::to_vec(&stored).map_err(|e| e.to_string())?;
            table
                .insert(key, json.as_slice())
                .map_err(|e| e.to_string())?;
            stored
        };
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(stored)
    }

    pub fn db_size_bytes(&self) -> Result<u64, String> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinels_shared::models::MarkerRecord;

    fn open_temp() -> (tempfile::TempDir, Arc<Storage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("test.redb")).unwrap();
        (dir, storage)
    }

    fn doc_with_threat(name: &str) -> OverlayDocument {
        OverlayDocument {
            threats: vec![MarkerRecord {
                id: 1_717_000_000_000,
                name: name.to_string(),
                lat: 10.0,
                lng: 20.0,
                kind: "User Added".to_string(),
                group: "Unknown Force".to_string(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (_dir, storage) = open_temp();
        assert!(storage.get("sentinels/overlay").unwrap().is_none());
    }

    #[test]
    fn test_get_or_init_creates_once() {
        let (_dir, storage) = open_temp();
        let (first, created) = storage.get_or_init("sentinels/overlay").unwrap();
        assert!(created);
        assert_eq!(first.revision, 0);
        assert!(first.document.is_empty());

        let (second, created) = storage.get_or_init("sentinels/overlay").unwrap();
        assert!(!created);
        assert_eq!(second, first);
    }

    #[test]
    fn test_put_overwrites_and_bumps_revision() {
        let (_dir, storage) = open_temp();
        let first = storage.put("k", doc_with_threat("Alpha")).unwrap();
        let second = storage.put("k", doc_with_threat("Bravo")).unwrap();
        assert_eq!(first.revision, 1);
        assert_eq!(second.revision, 2);

        let loaded = storage.get("k").unwrap().unwrap();
        assert_eq!(loaded.document.threats.len(), 1);
        assert_eq!(loaded.document.threats[0].name, "Bravo");
    }

    #[test]
    fn test_put_after_init_continues_revisions() {
        let (_dir, storage) = open_temp();
        storage.get_or_init("k").unwrap();
        assert_eq!(storage.put("k", OverlayDocument::default()).unwrap().revision, 1);
    }

    #[test]
    fn test_documents_are_independent() {
        let (_dir, storage) = open_temp();
        storage.put("a", doc_with_threat("A")).unwrap();
        assert!(storage.get("b").unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.redb");
        {
            let storage = Storage::open(&path).unwrap();
            storage.put("k", doc_with_threat("Persisted")).unwrap();
        }
        let storage = Storage::open(&path).unwrap();
        let loaded = storage.get("k").unwrap().unwrap();
        assert_eq!(loaded.document.threats[0].name, "Persisted");
        assert!(storage.db_size_bytes().unwrap() > 0);
    }
}
