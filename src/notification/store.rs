//! In-memory notification store.
//!
//! Records are kept in a concurrent map keyed by notification id, with a
//! secondary index from recipient to that recipient's notification ids.
//! Contents are volatile and lost on process restart.

use dashmap::DashMap;
use uuid::Uuid;

use super::types::Notification;

/// In-memory notification store.
///
/// Uses `DashMap` for concurrent access. The store is owned exclusively by
/// the dispatch engine; lookups return cloned records, never references into
/// the map, so no guard is ever held across a delivery call.
pub struct NotificationStore {
    /// All records, keyed by notification id
    records: DashMap<Uuid, Notification>,
    /// Recipient -> notification ids, in insertion order
    by_recipient: DashMap<String, Vec<Uuid>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_recipient: DashMap::new(),
        }
    }

    /// Insert a freshly created record and index it under its recipient.
    ///
    /// Ids are v4 UUIDs generated at construction, so a collision would
    /// indicate a bug upstream; the old record is replaced and a warning
    /// logged rather than panicking.
    pub fn insert(&self, notification: Notification) {
        let id = notification.id;
        let recipient = notification.recipient.clone();

        if self.records.insert(id, notification).is_some() {
            tracing::warn!(notification_id = %id, "Replaced existing record with duplicate id");
            return;
        }

        self.by_recipient.entry(recipient).or_default().push(id);
    }

    /// Look up a record by id. Returns a clone.
    pub fn get(&self, id: Uuid) -> Option<Notification> {
        self.records.get(&id).map(|r| r.clone())
    }

    /// Run a closure against the record under its map guard.
    ///
    /// The closure must not block or perform I/O; delivery calls happen on
    /// snapshots outside the guard.
    pub fn with_record_mut<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Notification) -> T,
    ) -> Option<T> {
        self.records.get_mut(&id).map(|mut r| f(&mut r))
    }

    /// Recent notifications for a recipient, newest first by `created_at`,
    /// capped at `limit`. Unknown recipients yield an empty vec.
    pub fn history(&self, recipient: &str, limit: usize) -> Vec<Notification> {
        let ids: Vec<Uuid> = self
            .by_recipient
            .get(recipient)
            .map(|entry| entry.clone())
            .unwrap_or_default();

        // Index guard is released before touching the records map.
        let mut history: Vec<Notification> = ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| r.clone()))
            .collect();

        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        history.truncate(limit);
        history
    }

    /// Total number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Store statistics
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_records: self.records.len(),
            recipients_indexed: self.by_recipient.len(),
        }
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the notification store
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub total_records: usize,
    pub recipients_indexed: usize,
}
