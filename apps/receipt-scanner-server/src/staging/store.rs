//! Staging Store
//!
//! Per-session holder of the in-flight receipt:
//! - One entry per session, guarded by an async lock
//! - Replacement releases the previous temporary file
//! - Background sweep of entries nobody came back for

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::types::{SessionId, StagedReceipt, CLEANUP_INTERVAL_SECS, STAGING_EXPIRY_HOURS};

// ============================================================================
// Staging Store
// ============================================================================

/// Session-keyed store of staged receipts
#[derive(Clone)]
pub struct StagingStore {
    inner: Arc<StagingStoreInner>,
}

struct StagingStoreInner {
    receipts: RwLock<HashMap<SessionId, StagedReceipt>>,
    ttl_hours: i64,
}

impl StagingStore {
    pub fn new() -> Self {
        Self::with_ttl_hours(STAGING_EXPIRY_HOURS)
    }

    pub fn with_ttl_hours(ttl_hours: i64) -> Self {
        Self {
            inner: Arc::new(StagingStoreInner {
                receipts: RwLock::new(HashMap::new()),
                ttl_hours,
            }),
        }
    }

    // ========================================================================
    // Entry Lifecycle
    // ========================================================================

    /// Stage a receipt for the session, replacing any earlier one.
    ///
    /// The replaced entry's file is deleted unless it is the same file.
    pub async fn put(&self, session_id: SessionId, receipt: StagedReceipt) {
        let file_name = receipt.original_filename.clone();
        let new_path = receipt.file_path.clone();

        let previous = {
            let mut receipts = self.inner.receipts.write().await;
            receipts.insert(session_id, receipt)
        };

        if let Some(previous) = previous {
            if previous.file_path != new_path {
                tracing::debug!(
                    session_id = %session_id,
                    file_name = %previous.original_filename,
                    "Replacing unsubmitted staged receipt"
                );
                remove_file_logged(&previous.file_path).await;
            }
        }

        tracing::info!(
            session_id = %session_id,
            file_name = %file_name,
            "Staged receipt"
        );
    }

    /// Get the staged receipt of a session
    pub async fn get(&self, session_id: SessionId) -> Option<StagedReceipt> {
        let receipts = self.inner.receipts.read().await;
        receipts.get(&session_id).cloned()
    }

    /// Remove the entry, leaving its file on disk
    pub async fn clear(&self, session_id: SessionId) -> Option<StagedReceipt> {
        let mut receipts = self.inner.receipts.write().await;
        receipts.remove(&session_id)
    }

    /// Remove the entry and its file once the receipt has been uploaded.
    ///
    /// Only acts when the entry still refers to `file_path`; a receipt staged
    /// by a concurrent capture in the same session is left alone.
    pub async fn release(&self, session_id: SessionId, file_path: &Path) -> bool {
        let released = {
            let mut receipts = self.inner.receipts.write().await;
            match receipts.get(&session_id) {
                Some(current) if current.file_path == file_path => receipts.remove(&session_id),
                _ => None,
            }
        };

        // The uploaded file goes either way; a newer entry owns a different one
        remove_file_logged(file_path).await;

        released.is_some()
    }

    /// Abandon the session's receipt, deleting its file
    pub async fn discard(&self, session_id: SessionId) -> Option<StagedReceipt> {
        let removed = self.clear(session_id).await;

        if let Some(receipt) = &removed {
            remove_file_logged(&receipt.file_path).await;
            tracing::info!(
                session_id = %session_id,
                file_name = %receipt.original_filename,
                "Staged receipt discarded"
            );
        }

        removed
    }

    /// Get staged entry count
    pub async fn len(&self) -> usize {
        let receipts = self.inner.receipts.read().await;
        receipts.len()
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Remove expired entries and their files
    ///
    /// Returns the number of entries cleaned up
    pub async fn cleanup_expired(&self) -> usize {
        let expired: Vec<StagedReceipt> = {
            let mut receipts = self.inner.receipts.write().await;
            let ids: Vec<SessionId> = receipts
                .iter()
                .filter(|(_, r)| r.is_expired(self.inner.ttl_hours))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| receipts.remove(id)).collect()
        };

        for receipt in &expired {
            remove_file_logged(&receipt.file_path).await;
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Cleaned up expired staged receipts");
        }

        expired.len()
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(CLEANUP_INTERVAL_SECS));

            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        })
    }
}

impl Default for StagingStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort file removal; failures are logged, never returned
pub(crate) async fn remove_file_logged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed temporary file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "Failed to remove temporary file: {}", e),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn staged_file(dir: &TempDir, name: &str) -> StagedReceipt {
        let path = dir.path().join(name);
        tokio::fs::write(&path, b"receipt").await.unwrap();
        StagedReceipt::new(path, "nota.jpg", "image/jpeg", "Rp 150.000")
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = StagingStore::new();
        let session = Uuid::new_v4();
        let receipt = staged_file(&dir, "temp_a.jpg").await;

        store.put(session, receipt.clone()).await;

        let fetched = store.get(session).await.unwrap();
        assert_eq!(fetched.file_path, receipt.file_path);
        assert_eq!(fetched.original_filename, "nota.jpg");
        assert_eq!(fetched.content_type, "image/jpeg");
        assert_eq!(fetched.extracted_text, "Rp 150.000");
    }

    #[tokio::test]
    async fn test_replacement_deletes_previous_file() {
        let dir = TempDir::new().unwrap();
        let store = StagingStore::new();
        let session = Uuid::new_v4();
        let first = staged_file(&dir, "temp_a.jpg").await;
        let second = staged_file(&dir, "temp_b.jpg").await;

        store.put(session, first.clone()).await;
        store.put(session, second.clone()).await;

        assert!(!first.file_path.exists());
        assert!(second.file_path.exists());
        assert_eq!(store.get(session).await.unwrap().file_path, second.file_path);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = StagingStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let first = staged_file(&dir, "temp_a.jpg").await;
        let second = staged_file(&dir, "temp_b.jpg").await;

        store.put(a, first.clone()).await;
        store.put(b, second).await;

        assert!(first.file_path.exists());
        assert_eq!(store.get(a).await.unwrap().file_path, first.file_path);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_clear_keeps_file() {
        let dir = TempDir::new().unwrap();
        let store = StagingStore::new();
        let session = Uuid::new_v4();
        let receipt = staged_file(&dir, "temp_a.jpg").await;

        store.put(session, receipt.clone()).await;
        assert!(store.clear(session).await.is_some());

        assert!(store.get(session).await.is_none());
        assert!(receipt.file_path.exists());
    }

    #[tokio::test]
    async fn test_release_removes_entry_and_file() {
        let dir = TempDir::new().unwrap();
        let store = StagingStore::new();
        let session = Uuid::new_v4();
        let receipt = staged_file(&dir, "temp_a.jpg").await;

        store.put(session, receipt.clone()).await;
        assert!(store.release(session, &receipt.file_path).await);

        assert!(store.get(session).await.is_none());
        assert!(!receipt.file_path.exists());
    }

    #[tokio::test]
    async fn test_release_keeps_newer_entry() {
        let dir = TempDir::new().unwrap();
        let store = StagingStore::new();
        let session = Uuid::new_v4();
        let uploaded = staged_file(&dir, "temp_a.jpg").await;
        let newer = staged_file(&dir, "temp_b.jpg").await;

        store.put(session, newer.clone()).await;
        assert!(!store.release(session, &uploaded.file_path).await);

        assert_eq!(store.get(session).await.unwrap().file_path, newer.file_path);
        assert!(newer.file_path.exists());
        assert!(!uploaded.file_path.exists());
    }

    #[tokio::test]
    async fn test_discard_deletes_file() {
        let dir = TempDir::new().unwrap();
        let store = StagingStore::new();
        let session = Uuid::new_v4();
        let receipt = staged_file(&dir, "temp_a.jpg").await;

        store.put(session, receipt.clone()).await;
        assert!(store.discard(session).await.is_some());
        assert!(store.discard(session).await.is_none());

        assert!(!receipt.file_path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let dir = TempDir::new().unwrap();
        let store = StagingStore::with_ttl_hours(1);
        let (stale, fresh) = (Uuid::new_v4(), Uuid::new_v4());

        let mut old = staged_file(&dir, "temp_old.jpg").await;
        old.staged_at = chrono::Utc::now() - chrono::Duration::hours(2);
        let new = staged_file(&dir, "temp_new.jpg").await;

        store.put(stale, old.clone()).await;
        store.put(fresh, new.clone()).await;

        assert_eq!(store.cleanup_expired().await, 1);
        assert!(store.get(stale).await.is_none());
        assert!(!old.file_path.exists());
        assert!(store.get(fresh).await.is_some());
        assert!(new.file_path.exists());
    }
}
