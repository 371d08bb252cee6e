//! Recent-activity ledger.
//!
//! The ten most recently saved or opened links, newest first, kept as one
//! JSON array under [`LEDGER_KEY`] in the device's storage backend.
//!
//! # Identity
//!
//! An entry is identified by its link. Editing a document changes its
//! token, so [`Ledger::record`] takes the link the document had before the
//! edit and replaces that entry instead of adding a second one.
//!
//! # Concurrency
//!
//! Every record is a read-modify-overwrite of the whole blob. Two processes
//! recording at once can lose one update; the last write wins.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use nestly_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::tool::ToolId;

/// Storage key of the persisted entries. Shared with the web app.
pub const LEDGER_KEY: &str = "nestly_history";

/// Maximum number of entries kept.
pub const LEDGER_CAPACITY: usize = 10;

/// One recently touched document.
///
/// Deserialization also accepts the web app's field names (`hash` for the
/// link, `date` for the timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub tool_id: ToolId,
    pub title: String,
    #[serde(alias = "hash")]
    pub link: String,
    #[serde(alias = "date", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// What a [`Ledger::record`] call did to the existing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The entry for the previous link was replaced (an edit).
    Replaced,
    /// An entry with the same link moved to the front (a re-open).
    Reopened,
    /// Nothing matched; a new entry was added.
    Added,
}

/// The recent-activity ledger over an injected storage backend.
pub struct Ledger {
    storage: Arc<dyn StorageBackend>,
}

impl Ledger {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Record that `link` was saved or opened.
    ///
    /// Pass `previous` when the document was edited and its link changed.
    /// The entry moves to the front and the list is cut to
    /// [`LEDGER_CAPACITY`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] if the backend fails, or
    /// [`LedgerError::Serialization`] if the entries cannot be encoded.
    pub async fn record(
        &self,
        tool: ToolId,
        title: &str,
        link: &str,
        previous: Option<&str>,
    ) -> Result<Placement, LedgerError> {
        let mut entries = self.load().await?;
        let entry = LedgerEntry {
            tool_id: tool,
            title: title.to_owned(),
            link: link.to_owned(),
            timestamp: Utc::now().trunc_subsecs(3),
        };
        let placement = place(&mut entries, entry, previous);
        self.store(&entries).await?;

        debug!(%tool, ?placement, entries = entries.len(), "recorded link");
        Ok(placement)
    }

    /// All entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] if the backend fails.
    pub async fn list(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.load().await
    }

    /// Forget every entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] if the backend fails.
    pub async fn clear(&self) -> Result<(), LedgerError> {
        self.storage.delete(LEDGER_KEY).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        match self.storage.get(LEDGER_KEY).await? {
            Some(blob) => Ok(parse_entries(&blob)),
            None => Ok(Vec::new()),
        }
    }

    async fn store(&self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        let blob = serde_json::to_vec(entries).map_err(|e| LedgerError::Serialization {
            reason: e.to_string(),
        })?;
        self.storage.put(LEDGER_KEY, &blob).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}

fn place(entries: &mut Vec<LedgerEntry>, entry: LedgerEntry, previous: Option<&str>) -> Placement {
    let replaced = previous.is_some_and(|prev| remove_link(entries, prev));
    let reopened = remove_link(entries, &entry.link);

    entries.insert(0, entry);
    entries.truncate(LEDGER_CAPACITY);

    if replaced {
        Placement::Replaced
    } else if reopened {
        Placement::Reopened
    } else {
        Placement::Added
    }
}

fn remove_link(entries: &mut Vec<LedgerEntry>, link: &str) -> bool {
    let before = entries.len();
    entries.retain(|e| e.link != link);
    entries.len() != before
}

/// Unreadable blobs and entries are dropped rather than failing the caller;
/// the ledger is a convenience, not a source of truth.
fn parse_entries(blob: &[u8]) -> Vec<LedgerEntry> {
    let values: Vec<Value> = match serde_json::from_slice(blob) {
        Ok(values) => values,
        Err(e) => {
            warn!(error = %e, "stored ledger is unreadable, starting empty");
            return Vec::new();
        }
    };

    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<LedgerEntry>(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable ledger entry");
                None
            }
        })
        .take(LEDGER_CAPACITY)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nestly_storage::MemoryBackend;

    use super::*;

    fn make_ledger() -> (Ledger, MemoryBackend) {
        let storage = MemoryBackend::new();
        let ledger = Ledger::new(Arc::new(storage.clone()));
        (ledger, storage)
    }

    fn links(entries: &[LedgerEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.link.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_ledger_lists_nothing() {
        let (ledger, _) = make_ledger();
        assert!(ledger.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn newest_entry_comes_first() {
        let (ledger, _) = make_ledger();
        ledger
            .record(ToolId::Grocery, "Groceries", "#grocery:a", None)
            .await
            .unwrap();
        ledger
            .record(ToolId::Chores, "Chores", "#chores:b", None)
            .await
            .unwrap();

        let entries = ledger.list().await.unwrap();
        assert_eq!(links(&entries), vec!["#chores:b", "#grocery:a"]);
        assert_eq!(entries[0].tool_id, ToolId::Chores);
        assert_eq!(entries[0].title, "Chores");
    }

    #[tokio::test]
    async fn edit_replaces_previous_link_in_place() {
        let (ledger, _) = make_ledger();
        ledger
            .record(ToolId::Grocery, "A", "#grocery:linkA", None)
            .await
            .unwrap();
        ledger
            .record(ToolId::Chores, "Other", "#chores:x", None)
            .await
            .unwrap();

        let placement = ledger
            .record(ToolId::Grocery, "A*", "#grocery:linkB", Some("#grocery:linkA"))
            .await
            .unwrap();
        assert_eq!(placement, Placement::Replaced);

        let entries = ledger.list().await.unwrap();
        assert_eq!(links(&entries), vec!["#grocery:linkB", "#chores:x"]);
        assert_eq!(entries[0].title, "A*");
    }

    #[tokio::test]
    async fn reopening_moves_entry_to_front() {
        let (ledger, _) = make_ledger();
        ledger
            .record(ToolId::Recipes, "Soup", "#recipes:s", None)
            .await
            .unwrap();
        ledger
            .record(ToolId::Packing, "Beach", "#packing:p", None)
            .await
            .unwrap();

        let placement = ledger
            .record(ToolId::Recipes, "Soup v2", "#recipes:s", None)
            .await
            .unwrap();
        assert_eq!(placement, Placement::Reopened);

        let entries = ledger.list().await.unwrap();
        assert_eq!(links(&entries), vec!["#recipes:s", "#packing:p"]);
        assert_eq!(entries[0].title, "Soup v2");
    }

    #[tokio::test]
    async fn unknown_previous_link_adds_entry() {
        let (ledger, _) = make_ledger();
        let placement = ledger
            .record(ToolId::Wishlist, "Gifts", "#wishlist:new", Some("#wishlist:gone"))
            .await
            .unwrap();
        assert_eq!(placement, Placement::Added);
        assert_eq!(ledger.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let (ledger, _) = make_ledger();
        for n in 0..=LEDGER_CAPACITY {
            ledger
                .record(ToolId::Grocery, &format!("List {n}"), &format!("#grocery:{n}"), None)
                .await
                .unwrap();
        }

        let entries = ledger.list().await.unwrap();
        assert_eq!(entries.len(), LEDGER_CAPACITY);
        assert_eq!(entries[0].link, format!("#grocery:{LEDGER_CAPACITY}"));
        assert!(entries.iter().all(|e| e.link != "#grocery:0"));
    }

    #[tokio::test]
    async fn entries_survive_a_new_ledger_instance() {
        let (ledger, storage) = make_ledger();
        ledger
            .record(ToolId::Emergency, "House", "#emergency:h", None)
            .await
            .unwrap();
        let before = ledger.list().await.unwrap();

        let reloaded = Ledger::new(Arc::new(storage));
        assert_eq!(reloaded.list().await.unwrap(), before);
    }

    #[tokio::test]
    async fn persisted_blob_uses_current_field_names() {
        let (ledger, storage) = make_ledger();
        ledger
            .record(ToolId::Grocery, "Milk", "#grocery:m", None)
            .await
            .unwrap();

        let blob = storage.get(LEDGER_KEY).await.unwrap().unwrap();
        let stored: Value = serde_json::from_slice(&blob).unwrap();
        let entry = &stored[0];
        assert_eq!(entry["toolId"], "grocery");
        assert_eq!(entry["title"], "Milk");
        assert_eq!(entry["link"], "#grocery:m");
        assert!(entry["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn reads_web_app_records() {
        let (ledger, storage) = make_ledger();
        let blob = br##"[
            {"toolId":"grocery","title":"Milk","hash":"#grocery:abc","date":1700000000000},
            {"toolId":"dashboard","title":"???","hash":"#x","date":1},
            {"toolId":"chores","title":"Chores","hash":"#chores:def","date":1690000000000}
        ]"##;
        storage.put(LEDGER_KEY, blob).await.unwrap();

        let entries = ledger.list().await.unwrap();
        assert_eq!(links(&entries), vec!["#grocery:abc", "#chores:def"]);
        assert_eq!(entries[0].timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[tokio::test]
    async fn corrupt_blob_is_treated_as_empty() {
        let (ledger, storage) = make_ledger();
        storage.put(LEDGER_KEY, b"{not json").await.unwrap();
        assert!(ledger.list().await.unwrap().is_empty());

        ledger
            .record(ToolId::Packing, "Camping", "#packing:c", None)
            .await
            .unwrap();
        assert_eq!(ledger.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_forgets_everything() {
        let (ledger, storage) = make_ledger();
        ledger
            .record(ToolId::Lockbox, "Lockbox", "#lockbox:z", None)
            .await
            .unwrap();
        ledger.clear().await.unwrap();

        assert!(ledger.list().await.unwrap().is_empty());
        assert!(!storage.exists(LEDGER_KEY).await.unwrap());
    }
}
