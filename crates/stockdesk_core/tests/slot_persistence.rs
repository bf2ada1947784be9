use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use stockdesk_core::service::app_slots::{branch_slot, BRANCH_KEY, LSU_KEY, WAREHOUSE_KEY};
use stockdesk_core::{
    open_api_url, open_branch, open_lsu, open_user, open_warehouse, Branch, JsonCodec, KvStore,
    MemoryKvStore, Session, SlotDef, SlotError, SlotOrigin, SlotScope, SqliteKvStore, StoreError,
    StoreResult, UserProfile, Warehouse,
};

fn session_with(store: Arc<MemoryKvStore>) -> Session {
    Session::new(store)
}

#[test]
fn fresh_session_without_entries_yields_defaults() {
    let session = Session::in_memory();

    let branch = open_branch(&session).unwrap();
    assert_eq!(branch.get(), Branch::new(0, ""));
    assert_eq!(branch.origin(), &SlotOrigin::Absent);
    assert_eq!(branch.scope(), SlotScope::Shared);
    assert!(!branch.read(Branch::is_selected));

    assert_eq!(open_warehouse(&session).unwrap().get(), Warehouse::default());
    assert_eq!(open_user(&session).unwrap().get(), UserProfile::default());
    assert_eq!(open_api_url(&session).unwrap().get(), "");
    assert_eq!(open_lsu(&session).unwrap().get(), "");
}

#[test]
fn stored_warehouse_text_seeds_the_slot() {
    let store = Arc::new(MemoryKvStore::with_entries([(
        WAREHOUSE_KEY,
        r#"{"id":3,"label":"North"}"#,
    )]));
    let session = session_with(store);

    let wh = open_warehouse(&session).unwrap();
    assert_eq!(wh.get(), Warehouse::new(3, "North"));
    assert_eq!(wh.origin(), &SlotOrigin::Stored);
}

#[test]
fn malformed_stored_text_falls_back_to_default() {
    let store = Arc::new(MemoryKvStore::with_entries([(BRANCH_KEY, "not-json")]));
    let session = session_with(Arc::clone(&store));

    let branch = open_branch(&session).unwrap();
    assert_eq!(branch.get(), Branch::default());
    assert!(matches!(branch.origin(), SlotOrigin::Fallback { .. }));
    // The corrupt entry is left alone until the next write.
    assert_eq!(store.get(BRANCH_KEY).unwrap().as_deref(), Some("not-json"));
}

#[test]
fn wrong_shape_stored_text_falls_back_to_default() {
    let store = Arc::new(MemoryKvStore::with_entries([(
        WAREHOUSE_KEY,
        r#"{"id":"three","label":7}"#,
    )]));
    let session = session_with(store);

    assert_eq!(open_warehouse(&session).unwrap().get(), Warehouse::default());
}

#[test]
fn set_then_clear_restores_default_and_removes_entry() {
    let store = Arc::new(MemoryKvStore::new());
    let session = session_with(Arc::clone(&store));
    let branch = open_branch(&session).unwrap();

    branch.set(Some(Branch::new(5, "Main"))).unwrap();
    assert_eq!(branch.get(), Branch::new(5, "Main"));
    assert_eq!(
        store.get(BRANCH_KEY).unwrap().as_deref(),
        Some(r#"{"id":5,"label":"Main"}"#)
    );

    branch.set(None).unwrap();
    assert_eq!(branch.get(), Branch::new(0, ""));
    assert_eq!(store.get(BRANCH_KEY).unwrap(), None);
    assert_eq!(branch.revision(), 2);
}

#[test]
fn clear_resets_private_text_slots_too() {
    let store = Arc::new(MemoryKvStore::with_entries([(LSU_KEY, "A-17")]));
    let session = session_with(Arc::clone(&store));

    let lsu = open_lsu(&session).unwrap();
    assert_eq!(lsu.scope(), SlotScope::Private);
    assert_eq!(lsu.get(), "A-17");
    lsu.clear().unwrap();
    assert_eq!(lsu.get(), "");
    assert_eq!(store.get(LSU_KEY).unwrap(), None);
}

#[test]
fn private_slot_reopen_reads_what_was_written() {
    let session = Session::in_memory();

    open_api_url(&session)
        .unwrap()
        .write("https://erp.example.test/api".to_string())
        .unwrap();
    let reopened = open_api_url(&session).unwrap();
    assert_eq!(reopened.get(), "https://erp.example.test/api");
    assert_eq!(reopened.origin(), &SlotOrigin::Stored);
}

#[test]
fn private_slot_handles_do_not_share_live_values() {
    let session = Session::in_memory();
    let first = open_lsu(&session).unwrap();
    let second = open_lsu(&session).unwrap();

    first.write("B-02".to_string()).unwrap();
    assert!(!first.shares_cell_with(&second));
    assert_eq!(second.get(), "");
    assert_eq!(open_lsu(&session).unwrap().get(), "B-02");
}

#[test]
fn shared_slot_handles_observe_each_other_without_refresh() {
    let session = Session::in_memory();
    let header = open_branch(&session).unwrap();
    let picker = open_branch(&session).unwrap();
    assert!(header.shares_cell_with(&picker));

    picker.set(Some(Branch::new(2, "Harbor"))).unwrap();
    assert_eq!(header.get(), Branch::new(2, "Harbor"));

    header.set(None).unwrap();
    assert_eq!(picker.get(), Branch::default());
}

#[test]
fn shared_slot_reopen_keeps_live_value_over_store_changes() {
    let store = Arc::new(MemoryKvStore::new());
    let session = session_with(Arc::clone(&store));
    let first = open_branch(&session).unwrap();
    first.set(Some(Branch::new(5, "Main"))).unwrap();

    // Out-of-band store change must not clobber the live cell.
    store.set(BRANCH_KEY, r#"{"id":9,"label":"Other"}"#).unwrap();
    let second = open_branch(&session).unwrap();
    assert_eq!(second.get(), Branch::new(5, "Main"));
}

#[test]
fn separate_sessions_over_one_store_share_only_persisted_state() {
    let store = Arc::new(MemoryKvStore::new());
    let first = session_with(Arc::clone(&store));
    open_warehouse(&first)
        .unwrap()
        .set(Some(Warehouse::new(4, "Dock")))
        .unwrap();

    let restarted = session_with(store);
    let wh = open_warehouse(&restarted).unwrap();
    assert_eq!(wh.get(), Warehouse::new(4, "Dock"));
    assert_eq!(wh.origin(), &SlotOrigin::Stored);
}

#[test]
fn persistence_failure_is_reported_and_live_value_kept() {
    let store = Arc::new(MemoryKvStore::new());
    let session = session_with(Arc::clone(&store));
    let branch = open_branch(&session).unwrap();
    branch.set(Some(Branch::new(1, "Central"))).unwrap();

    store.set_read_only(true);
    let err = branch.set(Some(Branch::new(2, "Harbor"))).unwrap_err();
    assert!(matches!(
        err,
        SlotError::Persist {
            source: StoreError::Unavailable(_),
            ..
        }
    ));
    assert_eq!(err.code(), "slot_persist_failed");
    assert_eq!(branch.get(), Branch::new(1, "Central"));

    let err = branch.clear().unwrap_err();
    assert!(matches!(err, SlotError::Persist { .. }));
    assert_eq!(branch.get(), Branch::new(1, "Central"));
    assert_eq!(branch.revision(), 1);
}

#[test]
fn reusing_a_name_with_another_type_is_rejected() {
    let session = Session::in_memory();
    open_branch(&session).unwrap();

    let alias = SlotDef::new(BRANCH_KEY, SlotScope::Shared, 0_i64, JsonCodec::new());
    let err = session.open(&alias).err().unwrap();
    assert_eq!(err.code(), "slot_type_mismatch");
}

#[test]
fn listeners_fire_for_writes_through_any_shared_handle() {
    let session = Session::in_memory();
    let observer = open_branch(&session).unwrap();
    let writer = open_branch(&session).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = observer.subscribe(move |branch: &Branch| sink.lock().unwrap().push(branch.id));

    writer.set(Some(Branch::new(7, "East"))).unwrap();
    writer.set(None).unwrap();
    assert!(observer.unsubscribe(id));
    writer.set(Some(Branch::new(8, "West"))).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![7, 0]);
}

#[test]
fn failed_write_does_not_notify_listeners() {
    let store = Arc::new(MemoryKvStore::new());
    let session = session_with(Arc::clone(&store));
    let branch = open_branch(&session).unwrap();
    let hits = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&hits);
    branch.subscribe(move |_| *sink.lock().unwrap() += 1);

    store.set_read_only(true);
    assert!(branch.set(Some(Branch::new(3, "South"))).is_err());
    assert_eq!(*hits.lock().unwrap(), 0);
}

#[test]
fn concurrent_writers_leave_live_value_and_store_in_agreement() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel();
    let store = Arc::new(PausingStore::new(entered_tx, resume_rx));
    let session = Session::new(Arc::clone(&store) as Arc<dyn KvStore>);
    let first = open_branch(&session).unwrap();
    let second = open_branch(&session).unwrap();

    let slow = thread::spawn(move || first.set(Some(Branch::new(1, "A"))).unwrap());
    // The first writer is now paused right after its store write.
    entered_rx.recv().unwrap();
    let fast = thread::spawn(move || second.set(Some(Branch::new(2, "B"))).unwrap());
    thread::sleep(Duration::from_millis(50));
    resume_tx.send(()).unwrap();
    slow.join().unwrap();
    fast.join().unwrap();

    let live = open_branch(&session).unwrap().get();
    let stored = store.inner.get(BRANCH_KEY).unwrap().unwrap();
    assert_eq!(live, Branch::new(2, "B"));
    assert_eq!(serde_json::from_str::<Branch>(&stored).unwrap(), live);
}

#[test]
fn teardown_releases_handles_opened_before_it() {
    let store = Arc::new(MemoryKvStore::new());
    let session = session_with(Arc::clone(&store));
    let stale = open_branch(&session).unwrap();
    stale.set(Some(Branch::new(5, "Main"))).unwrap();

    session.teardown();
    assert!(session.registry().is_empty());

    let err = stale.set(Some(Branch::new(6, "Dock"))).unwrap_err();
    assert_eq!(err.code(), "slot_released");
    assert!(matches!(stale.clear(), Err(SlotError::Released { .. })));
    assert_eq!(stale.get(), Branch::new(5, "Main"));
    assert_eq!(
        store.get(BRANCH_KEY).unwrap().as_deref(),
        Some(r#"{"id":5,"label":"Main"}"#)
    );

    let fresh = open_branch(&session).unwrap();
    assert!(!fresh.shares_cell_with(&stale));
    fresh.set(Some(Branch::new(6, "Dock"))).unwrap();
    assert_eq!(fresh.origin(), &SlotOrigin::Stored);
}

#[test]
fn sqlite_backed_slot_round_trips_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.sqlite3");

    {
        let session = Session::new(Arc::new(SqliteKvStore::open(&path).unwrap()));
        open_branch(&session)
            .unwrap()
            .set(Some(Branch::new(12, "Airport")))
            .unwrap();
    }

    let session = Session::new(Arc::new(SqliteKvStore::open(&path).unwrap()));
    assert_eq!(
        session.open(&branch_slot()).unwrap().get(),
        Branch::new(12, "Airport")
    );
}

// Pauses the first `set` after it reached the inner store until resumed.
struct PausingStore {
    inner: MemoryKvStore,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl PausingStore {
    fn new(entered: Sender<()>, resume: Receiver<()>) -> Self {
        Self {
            inner: MemoryKvStore::new(),
            gate: Mutex::new(Some((entered, resume))),
        }
    }
}

impl KvStore for PausingStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.inner.set(key, value)?;
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, resume)) = gate {
            entered.send(()).unwrap();
            resume.recv().unwrap();
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.inner.remove(key)
    }
}
