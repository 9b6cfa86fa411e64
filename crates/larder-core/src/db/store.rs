//! Keyed local stores with sync bookkeeping
//!
//! One table per entity family, all with the same shape: the serialized
//! record next to the `updated_at` and `is_synced` columns the sync engine
//! reads. The payload itself is opaque to everything in this module except
//! the pantry query variants.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};
use tokio::sync::watch;

use crate::error::StoreResult;
use crate::models::{ItemId, PantryItem, StorageLocation, Syncable};
use crate::sync::resolve::{resolve, LocalMeta, Resolution};

use super::connection::Database;

/// Outcome counts of one reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Remote records inserted or overwritten locally
    pub applied: usize,
    /// Dirty local records kept over the incoming copy
    pub kept_local: usize,
    /// Synced local records deleted because the remote set no longer has them
    pub deleted: usize,
}

/// Contract the sync engine requires from a local table
pub trait LocalStore<T: Syncable>: Send + Sync + 'static {
    /// Insert or overwrite a record, setting its sync flag
    fn upsert(&self, record: &T, is_synced: bool) -> StoreResult<()>;

    /// Get a record by ID
    fn get(&self, id: &ItemId) -> StoreResult<Option<T>>;

    /// All records, most recently updated first
    fn get_all(&self) -> StoreResult<Vec<T>>;

    /// Records with a pending write not yet confirmed remotely
    fn get_unsynced(&self) -> StoreResult<Vec<T>>;

    /// Flip a record to synced, but only while its `updated_at` still matches
    /// the copy that was pushed. Returns false when a newer local edit got
    /// there first; that edit stays dirty.
    fn mark_synced(&self, id: &ItemId, expected_updated_at: i64) -> StoreResult<bool>;

    /// Delete a record; deleting an absent id is not an error
    fn delete(&self, id: &ItemId) -> StoreResult<()>;

    /// Delete every record in the table
    fn delete_all(&self) -> StoreResult<()>;

    /// Atomically merge an authoritative remote snapshot into local state
    fn reconcile(&self, remote: &[T]) -> StoreResult<ReconcileSummary>;

    /// Live view of `get_all`, republished after every committed mutation
    fn watch_all(&self) -> watch::Receiver<Vec<T>>;
}

/// `SQLite` implementation of `LocalStore`, generic over the entity family
pub struct SqliteStore<T: Syncable> {
    conn: Arc<Mutex<Connection>>,
    live: watch::Sender<Vec<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Syncable> SqliteStore<T> {
    /// Create a store over the family's table, seeding the live view with
    /// whatever the table already holds
    pub fn new(db: &Database) -> StoreResult<Self> {
        let (live, _) = watch::channel(Vec::new());
        let store = Self {
            conn: db.connection(),
            live,
            _marker: PhantomData,
        };
        let seed = Self::query_all(&store.lock())?;
        store.live.send_replace(seed);
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Republish the full record list to live-query subscribers
    fn republish(&self, conn: &Connection) -> StoreResult<()> {
        let all = Self::query_all(conn)?;
        // send_replace stores the value even with no subscriber yet, so a
        // receiver obtained later starts from the current state
        self.live.send_replace(all);
        Ok(())
    }

    fn query_all(conn: &Connection) -> StoreResult<Vec<T>> {
        Self::query_payloads(
            conn,
            &format!(
                "SELECT payload FROM {} ORDER BY updated_at DESC",
                T::TABLE
            ),
            [],
        )
    }

    fn query_payloads<P: rusqlite::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> StoreResult<Vec<T>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let mut records = Vec::new();
        for payload in rows {
            records.push(serde_json::from_str(&payload?)?);
        }
        Ok(records)
    }

    fn upsert_in(conn: &Connection, record: &T, is_synced: bool) -> StoreResult<()> {
        let payload = serde_json::to_string(record)?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, updated_at, is_synced, payload) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET updated_at = ?2, is_synced = ?3, payload = ?4",
                T::TABLE
            ),
            params![
                record.id().as_str(),
                record.updated_at(),
                i32::from(is_synced),
                payload
            ],
        )?;
        Ok(())
    }

    /// Sync bookkeeping of the local row, if one exists
    fn local_meta(conn: &Connection, id: &ItemId) -> StoreResult<Option<LocalMeta>> {
        let result = conn.query_row(
            &format!(
                "SELECT updated_at, is_synced FROM {} WHERE id = ?",
                T::TABLE
            ),
            params![id.as_str()],
            |row| {
                Ok(LocalMeta {
                    updated_at: row.get(0)?,
                    is_synced: row.get::<_, i32>(1)? != 0,
                })
            },
        );

        match result {
            Ok(meta) => Ok(Some(meta)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl<T: Syncable> LocalStore<T> for SqliteStore<T> {
    fn upsert(&self, record: &T, is_synced: bool) -> StoreResult<()> {
        let conn = self.lock();
        Self::upsert_in(&conn, record, is_synced)?;
        self.republish(&conn)
    }

    fn get(&self, id: &ItemId) -> StoreResult<Option<T>> {
        let conn = self.lock();
        let result = conn.query_row(
            &format!("SELECT payload FROM {} WHERE id = ?", T::TABLE),
            params![id.as_str()],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_all(&self) -> StoreResult<Vec<T>> {
        Self::query_all(&self.lock())
    }

    fn get_unsynced(&self) -> StoreResult<Vec<T>> {
        Self::query_payloads(
            &self.lock(),
            &format!(
                "SELECT payload FROM {} WHERE is_synced = 0 ORDER BY updated_at ASC",
                T::TABLE
            ),
            [],
        )
    }

    fn mark_synced(&self, id: &ItemId, expected_updated_at: i64) -> StoreResult<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            &format!(
                "UPDATE {} SET is_synced = 1 WHERE id = ? AND updated_at = ?",
                T::TABLE
            ),
            params![id.as_str(), expected_updated_at],
        )?;
        Ok(rows > 0)
    }

    fn delete(&self, id: &ItemId) -> StoreResult<()> {
        let conn = self.lock();
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?", T::TABLE),
            params![id.as_str()],
        )?;
        self.republish(&conn)
    }

    fn delete_all(&self) -> StoreResult<()> {
        let conn = self.lock();
        conn.execute(&format!("DELETE FROM {}", T::TABLE), [])?;
        self.republish(&conn)
    }

    fn reconcile(&self, remote: &[T]) -> StoreResult<ReconcileSummary> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut summary = ReconcileSummary::default();
        let mut remote_ids: HashSet<String> = HashSet::with_capacity(remote.len());

        for record in remote {
            remote_ids.insert(record.id().as_str());
            let local = Self::local_meta(&tx, record.id())?;
            match resolve(record.updated_at(), local) {
                Resolution::Accept => {
                    Self::upsert_in(&tx, record, true)?;
                    summary.applied += 1;
                }
                Resolution::KeepLocal => summary.kept_local += 1,
            }
        }

        // A synced id the remote no longer has was deleted elsewhere. Dirty
        // ids may be creations that have not reached the server yet, so they
        // are never deleted here.
        let stale: Vec<String> = {
            let mut stmt =
                tx.prepare(&format!("SELECT id FROM {} WHERE is_synced = 1", T::TABLE))?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut ids = Vec::new();
            for id in rows {
                let id = id?;
                if !remote_ids.contains(&id) {
                    ids.push(id);
                }
            }
            ids
        };
        for id in &stale {
            tx.execute(&format!("DELETE FROM {} WHERE id = ?", T::TABLE), params![id])?;
            summary.deleted += 1;
        }

        tx.commit()?;
        self.republish(&conn)?;
        Ok(summary)
    }

    fn watch_all(&self) -> watch::Receiver<Vec<T>> {
        self.live.subscribe()
    }
}

impl SqliteStore<PantryItem> {
    /// Items stored in the given location, most recently updated first
    pub fn get_by_location(&self, location: StorageLocation) -> StoreResult<Vec<PantryItem>> {
        Self::query_payloads(
            &self.lock(),
            "SELECT payload FROM pantry_items
             WHERE json_extract(payload, '$.location') = ?
             ORDER BY updated_at DESC",
            params![location.as_str()],
        )
    }

    /// Case-insensitive name substring search
    pub fn search_by_name(&self, query: &str) -> StoreResult<Vec<PantryItem>> {
        let needle = query.trim().to_lowercase();
        Self::query_payloads(
            &self.lock(),
            "SELECT payload FROM pantry_items
             WHERE instr(lower(json_extract(payload, '$.name')), ?) > 0
             ORDER BY updated_at DESC",
            params![needle],
        )
    }

    /// Exact barcode lookup
    pub fn get_by_barcode(&self, barcode: &str) -> StoreResult<Vec<PantryItem>> {
        Self::query_payloads(
            &self.lock(),
            "SELECT payload FROM pantry_items
             WHERE json_extract(payload, '$.barcode') = ?
             ORDER BY updated_at DESC",
            params![barcode],
        )
    }

    /// Items with an expiry date at or before the cutoff (Unix ms), soonest
    /// first; items without an expiry date are never returned
    pub fn get_expiring_before(&self, cutoff_ms: i64) -> StoreResult<Vec<PantryItem>> {
        Self::query_payloads(
            &self.lock(),
            "SELECT payload FROM pantry_items
             WHERE json_extract(payload, '$.expires_at') IS NOT NULL
               AND json_extract(payload, '$.expires_at') <= ?
             ORDER BY json_extract(payload, '$.expires_at') ASC",
            params![cutoff_ms],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InsightAction;
    use crate::models::InsightItem;
    use pretty_assertions::assert_eq;

    fn setup() -> SqliteStore<PantryItem> {
        SqliteStore::new(&Database::open_in_memory().unwrap()).unwrap()
    }

    fn item(name: &str, updated_at: i64) -> PantryItem {
        let mut item = PantryItem::new(name, StorageLocation::Fridge);
        item.updated_at = updated_at;
        item
    }

    fn unsynced_ids(store: &SqliteStore<PantryItem>) -> Vec<ItemId> {
        store
            .get_unsynced()
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect()
    }

    #[test]
    fn test_upsert_and_get() {
        let store = setup();
        let milk = item("Milk", 10);

        store.upsert(&milk, false).unwrap();
        let fetched = store.get(&milk.id).unwrap().unwrap();
        assert_eq!(fetched, milk);

        assert!(store.get(&ItemId::new()).unwrap().is_none());
    }

    #[test]
    fn test_upsert_overwrites_and_updates_flag() {
        let store = setup();
        let mut milk = item("Milk", 10);
        store.upsert(&milk, true).unwrap();
        assert!(unsynced_ids(&store).is_empty());

        milk.name = "Oat milk".to_string();
        milk.updated_at = 11;
        store.upsert(&milk, false).unwrap();

        assert_eq!(store.get(&milk.id).unwrap().unwrap().name, "Oat milk");
        assert_eq!(unsynced_ids(&store), vec![milk.id]);
    }

    #[test]
    fn test_get_all_newest_first() {
        let store = setup();
        let older = item("Older", 1);
        let newer = item("Newer", 2);
        store.upsert(&older, false).unwrap();
        store.upsert(&newer, false).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Newer");
    }

    #[test]
    fn test_mark_synced_guard() {
        let store = setup();
        let milk = item("Milk", 10);
        store.upsert(&milk, false).unwrap();

        // Stale stamp: a newer local edit must stay dirty
        assert!(!store.mark_synced(&milk.id, 9).unwrap());
        assert_eq!(unsynced_ids(&store), vec![milk.id]);

        assert!(store.mark_synced(&milk.id, 10).unwrap());
        assert!(unsynced_ids(&store).is_empty());
    }

    #[test]
    fn test_delete_and_delete_all() {
        let store = setup();
        let milk = item("Milk", 10);
        let eggs = item("Eggs", 11);
        store.upsert(&milk, false).unwrap();
        store.upsert(&eggs, false).unwrap();

        store.delete(&milk.id).unwrap();
        assert!(store.get(&milk.id).unwrap().is_none());

        // Deleting an absent id is a no-op
        store.delete(&milk.id).unwrap();

        store.delete_all().unwrap();
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_watch_all_follows_mutations() {
        let store = setup();
        let rx = store.watch_all();
        assert!(rx.borrow().is_empty());

        let milk = item("Milk", 10);
        store.upsert(&milk, false).unwrap();
        assert_eq!(rx.borrow().len(), 1);

        store.delete(&milk.id).unwrap();
        assert!(rx.borrow().is_empty());
    }

    #[test]
    fn test_watch_all_seeds_late_subscribers() {
        let store = setup();
        let milk = item("Milk", 10);
        store.upsert(&milk, false).unwrap();

        // Subscribing after the mutation still starts from the current state
        let rx = store.watch_all();
        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(rx.borrow()[0].name, "Milk");
    }

    #[test]
    fn test_watch_all_seeded_from_existing_rows_on_open() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("larder.db");

        {
            let db = Database::open(&path).unwrap();
            let store: SqliteStore<PantryItem> = SqliteStore::new(&db).unwrap();
            store.upsert(&item("Milk", 10), true).unwrap();
        }

        // A fresh store over the reopened database publishes what the table
        // already holds before any subscriber or mutation shows up
        let db = Database::open(&path).unwrap();
        let store: SqliteStore<PantryItem> = SqliteStore::new(&db).unwrap();
        let rx = store.watch_all();
        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_reconcile_inserts_missing_as_synced() {
        let store = setup();
        let remote = vec![item("Milk", 5), item("Eggs", 9)];

        let summary = store.reconcile(&remote).unwrap();
        assert_eq!(
            summary,
            ReconcileSummary {
                applied: 2,
                kept_local: 0,
                deleted: 0
            }
        );
        assert_eq!(store.get_all().unwrap().len(), 2);
        assert!(unsynced_ids(&store).is_empty());
    }

    #[test]
    fn test_reconcile_protects_dirty_record_on_equal_timestamp() {
        let store = setup();
        let local = item("Milk", 5);
        store.upsert(&local, false).unwrap();

        let mut incoming = local.clone();
        incoming.name = "Milk-v2".to_string();
        let summary = store.reconcile(&[incoming]).unwrap();

        assert_eq!(summary.kept_local, 1);
        assert_eq!(summary.applied, 0);
        let kept = store.get(&local.id).unwrap().unwrap();
        assert_eq!(kept, local);
        assert_eq!(unsynced_ids(&store), vec![local.id]);
    }

    #[test]
    fn test_reconcile_newer_remote_wins_over_dirty() {
        let store = setup();
        let local = item("Milk", 5);
        store.upsert(&local, false).unwrap();

        let mut incoming = local.clone();
        incoming.name = "Milk-v2".to_string();
        incoming.updated_at = 6;
        let summary = store.reconcile(&[incoming.clone()]).unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(store.get(&local.id).unwrap().unwrap(), incoming);
        assert!(unsynced_ids(&store).is_empty());
    }

    #[test]
    fn test_reconcile_overwrites_clean_record_on_equal_timestamp() {
        let store = setup();
        let local = item("Milk", 5);
        store.upsert(&local, true).unwrap();

        let mut incoming = local.clone();
        incoming.name = "Milk-v2".to_string();
        let summary = store.reconcile(&[incoming.clone()]).unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(store.get(&local.id).unwrap().unwrap().name, "Milk-v2");
        assert!(unsynced_ids(&store).is_empty());
    }

    #[test]
    fn test_reconcile_deletes_only_stale_synced_ids() {
        let store = setup();
        let synced = item("Synced", 5);
        let dirty = item("Dirty", 5);
        store.upsert(&synced, true).unwrap();
        store.upsert(&dirty, false).unwrap();

        let summary = store.reconcile(&[]).unwrap();
        assert_eq!(summary.deleted, 1);
        assert!(store.get(&synced.id).unwrap().is_none());
        assert!(store.get(&dirty.id).unwrap().is_some());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let store = setup();
        let dirty = item("Dirty", 7);
        store.upsert(&dirty, false).unwrap();
        let remote = vec![item("Milk", 5), item("Eggs", 9)];

        let first = store.reconcile(&remote).unwrap();
        let state_after_first = store.get_all().unwrap();
        let second = store.reconcile(&remote).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.get_all().unwrap(), state_after_first);
        assert_eq!(unsynced_ids(&store), vec![dirty.id]);
    }

    #[test]
    fn test_reconcile_end_to_end_scenario() {
        // Local: {id=1, updatedAt=5, dirty, "Milk"}. Remote: same id at 5 as
        // "Milk-v2" plus a new record at 9. The dirty row survives, the new
        // record lands synced.
        let store = setup();
        let milk = item("Milk", 5);
        store.upsert(&milk, false).unwrap();

        let mut milk_v2 = milk.clone();
        milk_v2.name = "Milk-v2".to_string();
        let eggs = item("Eggs", 9);

        let summary = store.reconcile(&[milk_v2, eggs.clone()]).unwrap();
        assert_eq!(
            summary,
            ReconcileSummary {
                applied: 1,
                kept_local: 1,
                deleted: 0
            }
        );
        assert_eq!(store.get(&milk.id).unwrap().unwrap().name, "Milk");
        assert_eq!(store.get(&eggs.id).unwrap().unwrap().name, "Eggs");
        assert_eq!(unsynced_ids(&store), vec![milk.id]);
    }

    #[test]
    fn test_get_by_location() {
        let store = setup();
        let mut frozen = item("Peas", 1);
        frozen.location = StorageLocation::Freezer;
        store.upsert(&item("Milk", 2), false).unwrap();
        store.upsert(&frozen, false).unwrap();

        let fridge = store.get_by_location(StorageLocation::Fridge).unwrap();
        assert_eq!(fridge.len(), 1);
        assert_eq!(fridge[0].name, "Milk");

        let freezer = store.get_by_location(StorageLocation::Freezer).unwrap();
        assert_eq!(freezer.len(), 1);
        assert_eq!(freezer[0].name, "Peas");
    }

    #[test]
    fn test_search_by_name_case_insensitive() {
        let store = setup();
        store.upsert(&item("Whole Milk", 1), false).unwrap();
        store.upsert(&item("Eggs", 2), false).unwrap();

        let hits = store.search_by_name("milk").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Whole Milk");

        assert!(store.search_by_name("bread").unwrap().is_empty());
    }

    #[test]
    fn test_get_by_barcode_exact() {
        let store = setup();
        let scanned = item("Chocolate", 1).with_barcode("7622210449283");
        store.upsert(&scanned, false).unwrap();
        store.upsert(&item("Milk", 2), false).unwrap();

        let hits = store.get_by_barcode("7622210449283").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Chocolate");

        assert!(store.get_by_barcode("762221").unwrap().is_empty());
    }

    #[test]
    fn test_get_expiring_before() {
        let store = setup();
        let soon = item("Yoghurt", 1).with_expiry(100);
        let later = item("Cheese", 2).with_expiry(500);
        let never = item("Salt", 3);
        store.upsert(&soon, false).unwrap();
        store.upsert(&later, false).unwrap();
        store.upsert(&never, false).unwrap();

        let expiring = store.get_expiring_before(200).unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].name, "Yoghurt");

        let all_dated = store.get_expiring_before(1_000).unwrap();
        assert_eq!(all_dated.len(), 2);
        assert_eq!(all_dated[0].name, "Yoghurt"); // soonest first
    }

    #[test]
    fn test_families_are_isolated() {
        let db = Database::open_in_memory().unwrap();
        let pantry: SqliteStore<PantryItem> = SqliteStore::new(&db).unwrap();
        let insights: SqliteStore<InsightItem> = SqliteStore::new(&db).unwrap();

        pantry.upsert(&item("Milk", 1), false).unwrap();
        insights
            .upsert(&InsightItem::new("Milk", InsightAction::Consumed), false)
            .unwrap();

        assert_eq!(pantry.get_all().unwrap().len(), 1);
        assert_eq!(insights.get_all().unwrap().len(), 1);

        pantry.delete_all().unwrap();
        assert_eq!(insights.get_all().unwrap().len(), 1);
    }
}
