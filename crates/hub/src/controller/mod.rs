//! Application controller: the authoritative in-memory snapshot.
//!
//! Every effective mutation is written to the local store immediately and
//! schedules one debounced remote save. The remote save carries the snapshot
//! as it is when the timer fires, so a burst of edits inside the delay window
//! costs a single upload.
//!
//! Remote writes are serialized: a write that has started always finishes
//! before the next one is sent, so the document ends up holding the latest
//! write.
//!
//! # Status
//!
//! ```text
//! idle ──start──► syncing ──fetch ok──► saved
//!                         └─fetch failed─► error
//! mutation ──► syncing ──save ok──► saved
//!                      └─save failed─► error
//! ```

mod debounce;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, info, instrument, warn};

use libertad_hub_core::{
    CosmeticProduct, Message, NewCosmetic, Snapshot, SyncStatus, UserRole, WishlistCategory,
    WishlistItem, now_ms, reconcile,
};

use crate::store::{KeyValueStore, LocalStore, RemoteStore};
use debounce::Debouncer;

/// Owning handle to the hub's state.
///
/// Cheap to clone; all clones share the same snapshot, stores and timer.
pub struct AppController<K, R> {
    inner: Arc<ControllerInner<K, R>>,
}

impl<K, R> Clone for AppController<K, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<K, R> {
    local: LocalStore<K>,
    remote: R,
    snapshot: Mutex<Snapshot>,
    identity: Mutex<Option<UserRole>>,
    status: watch::Sender<SyncStatus>,
    debouncer: Debouncer,
    /// Held for the duration of every remote write.
    remote_writes: AsyncMutex<()>,
}

impl<K: KeyValueStore, R: RemoteStore> AppController<K, R> {
    /// Hydrate from the local store and reconcile with the remote copy.
    ///
    /// The controller is handed out only after the single startup fetch
    /// has resolved, so no mutation can interleave with reconciliation.
    /// When the merged result differs from the remote copy a write-back is
    /// scheduled.
    #[instrument(skip_all, fields(save_delay = ?save_delay))]
    pub async fn start(local: LocalStore<K>, remote: R, save_delay: Duration) -> Self {
        let hydrated = local.load().unwrap_or_default();
        let identity = local.load_identity();
        let (status, _) = watch::channel(SyncStatus::Idle);

        let controller = Self {
            inner: Arc::new(ControllerInner {
                local,
                remote,
                snapshot: Mutex::new(hydrated),
                identity: Mutex::new(identity),
                status,
                debouncer: Debouncer::new(Handle::current(), save_delay),
                remote_writes: AsyncMutex::new(()),
            }),
        };

        controller.set_status(SyncStatus::Syncing);
        let Some(remote_snapshot) = controller.inner.remote.fetch_latest().await else {
            warn!("Remote snapshot unavailable, keeping local state");
            controller.set_status(SyncStatus::Error);
            return controller;
        };

        let write_back = {
            let mut current = controller.lock_snapshot();
            let merged = reconcile(&current, &remote_snapshot, now_ms());
            let write_back = !merged.same_contents(&remote_snapshot);
            controller.inner.local.save(&merged);
            *current = merged;
            info!(counts = %current.counts(), write_back, "Startup reconciliation complete");
            write_back
        };

        controller.set_status(SyncStatus::Saved);
        if write_back {
            controller.schedule_remote_save();
        }
        controller
    }

    /// Copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.lock_snapshot().clone()
    }

    /// Current persistence status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        *self.inner.status.borrow()
    }

    /// Receiver notified on every status change.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    /// Delay between the last mutation and the remote save.
    #[must_use]
    pub fn save_delay(&self) -> Duration {
        self.inner.debouncer.delay()
    }

    // --- Identity ---

    /// Currently selected identity.
    #[must_use]
    pub fn identity(&self) -> Option<UserRole> {
        *self
            .inner
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn select_identity(&self, role: UserRole) {
        *self
            .inner
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(role);
        self.inner.local.save_identity(role);
        info!(%role, "Identity selected");
    }

    pub fn clear_identity(&self) {
        *self
            .inner
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.inner.local.clear_identity();
        info!("Identity cleared");
    }

    // --- Wishlist ---

    /// Add a wishlist entry at the top of the list.
    pub fn add_wishlist_item(
        &self,
        title: impl Into<String>,
        description: Option<String>,
        category: WishlistCategory,
    ) -> WishlistItem {
        let item = WishlistItem::new(title, description, category, now_ms());
        self.mutate(|snapshot| {
            snapshot.wishlist.insert(0, item.clone());
            Some(())
        });
        debug!(id = %item.id, %category, "Wishlist item added");
        item
    }

    /// Flip completion of an entry. `None` when the id is unknown.
    pub fn toggle_wishlist_item(&self, id: &str) -> Option<WishlistItem> {
        self.mutate(|snapshot| {
            let item = snapshot.wishlist.iter_mut().find(|w| w.id.as_str() == id)?;
            item.toggle();
            Some(item.clone())
        })
    }

    /// Remove an entry. Returns whether it existed.
    pub fn delete_wishlist_item(&self, id: &str) -> bool {
        self.mutate(|snapshot| {
            let index = snapshot.wishlist.iter().position(|w| w.id.as_str() == id)?;
            snapshot.wishlist.remove(index);
            Some(())
        })
        .is_some()
    }

    // --- Cosmetics ---

    /// Register a product at the top of the inventory.
    pub fn add_cosmetic(&self, input: NewCosmetic) -> CosmeticProduct {
        let product = input.into_product(now_ms());
        self.mutate(|snapshot| {
            snapshot.makeup.insert(0, product.clone());
            Some(())
        });
        debug!(id = %product.id, category = %product.category, "Cosmetic added");
        product
    }

    /// Remove a product. Returns whether it existed.
    pub fn remove_cosmetic(&self, id: &str) -> bool {
        self.mutate(|snapshot| {
            let index = snapshot.makeup.iter().position(|p| p.id.as_str() == id)?;
            snapshot.makeup.remove(index);
            Some(())
        })
        .is_some()
    }

    // --- Messages ---

    /// Post a message as the selected identity.
    ///
    /// Returns `None` without touching state when no identity is selected.
    pub fn send_message(&self, text: impl Into<String>) -> Option<Message> {
        let Some(sender) = self.identity() else {
            warn!("Message dropped: no identity selected");
            return None;
        };
        let message = Message::compose(text, sender, now_ms());
        self.mutate(|snapshot| {
            snapshot.mailbox.insert(0, message.clone());
            Some(())
        })?;
        debug!(id = %message.id, %sender, "Message sent");
        Some(message)
    }

    /// Mark a message read. `None` when the id is unknown.
    pub fn mark_message_read(&self, id: &str) -> Option<Message> {
        self.mutate(|snapshot| {
            let message = snapshot.mailbox.iter_mut().find(|m| m.id.as_str() == id)?;
            message.mark_read();
            Some(message.clone())
        })
    }

    // --- Whole-snapshot operations ---

    /// Overwrite both stores with an empty snapshot.
    ///
    /// Skips reconciliation and cancels any save still waiting for its
    /// delay. A save already in flight is allowed to finish first, so the
    /// empty snapshot is the last write. Returns whether the remote store
    /// accepted it.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> bool {
        self.inner.debouncer.cancel();

        let empty = Snapshot::empty(now_ms());
        {
            let mut current = self.lock_snapshot();
            self.inner.local.save(&empty);
            *current = empty.clone();
        }
        warn!("All data reset");

        self.set_status(SyncStatus::Syncing);
        let _write = self.inner.remote_writes.lock().await;
        let saved = self.inner.remote.save_latest(&empty).await;
        self.set_status(if saved {
            SyncStatus::Saved
        } else {
            SyncStatus::Error
        });
        saved
    }

    /// Push a pending remote save immediately.
    ///
    /// When nothing is waiting, waits for any save in flight and returns
    /// `false` only if the last remote operation failed.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> bool {
        if self.inner.debouncer.cancel() {
            info!("Flushing pending remote save");
            return push_remote(&self.inner).await;
        }
        drop(self.inner.remote_writes.lock().await);
        self.status() != SyncStatus::Error
    }

    fn lock_snapshot(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: SyncStatus) {
        self.inner.status.send_replace(status);
    }

    /// Apply `change`; when it reports a match, persist locally and schedule
    /// the remote save.
    fn mutate<T>(&self, change: impl FnOnce(&mut Snapshot) -> Option<T>) -> Option<T> {
        let result = {
            let mut current = self.lock_snapshot();
            let result = change(&mut current)?;
            current.last_updated = now_ms();
            self.inner.local.save(&current);
            result
        };

        self.set_status(SyncStatus::Syncing);
        self.schedule_remote_save();
        Some(result)
    }

    fn schedule_remote_save(&self) {
        let inner = Arc::clone(&self.inner);
        self.inner.debouncer.arm(async move {
            push_remote(&inner).await;
        });
    }
}

/// Upload the snapshot as it is now and publish the outcome.
///
/// The snapshot is taken after the write lock is acquired, so a save queued
/// behind a reset uploads the reset state.
async fn push_remote<K: KeyValueStore, R: RemoteStore>(inner: &ControllerInner<K, R>) -> bool {
    let _write = inner.remote_writes.lock().await;
    let snapshot = inner
        .snapshot
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    let saved = inner.remote.save_latest(&snapshot).await;
    inner.status.send_replace(if saved {
        SyncStatus::Saved
    } else {
        SyncStatus::Error
    });
    debug!(saved, counts = %snapshot.counts(), "Remote save finished");
    saved
}

impl<K, R> std::fmt::Debug for AppController<K, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppController")
            .field("status", &*self.inner.status.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SNAPSHOT_KEY, UNREADABLE_SNAPSHOT_KEY};
    use libertad_hub_core::{CosmeticCategory, MessageId, WishlistItemId};
    use std::sync::atomic::{AtomicBool, Ordering};

    const DELAY: Duration = Duration::from_secs(2);

    #[derive(Default)]
    struct FakeRemote {
        stored: Mutex<Option<Snapshot>>,
        saves: Mutex<Vec<Snapshot>>,
        failing: AtomicBool,
        save_latency: Duration,
    }

    impl FakeRemote {
        fn holding(snapshot: Snapshot) -> Self {
            Self {
                stored: Mutex::new(Some(snapshot)),
                ..Self::default()
            }
        }

        fn saves(&self) -> Vec<Snapshot> {
            self.saves.lock().unwrap().clone()
        }
    }

    impl RemoteStore for FakeRemote {
        async fn fetch_latest(&self) -> Option<Snapshot> {
            if self.failing.load(Ordering::SeqCst) {
                return None;
            }
            self.stored.lock().unwrap().clone()
        }

        async fn save_latest(&self, snapshot: &Snapshot) -> bool {
            if !self.save_latency.is_zero() {
                tokio::time::sleep(self.save_latency).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return false;
            }
            self.saves.lock().unwrap().push(snapshot.clone());
            *self.stored.lock().unwrap() = Some(snapshot.clone());
            true
        }
    }

    type TestController = AppController<Arc<MemoryStore>, Arc<FakeRemote>>;

    async fn start_with(
        local: Snapshot,
        remote: FakeRemote,
    ) -> (TestController, Arc<MemoryStore>, Arc<FakeRemote>) {
        let kv = Arc::new(MemoryStore::new());
        LocalStore::new(Arc::clone(&kv)).save(&local);
        let remote = Arc::new(remote);
        let controller = AppController::start(
            LocalStore::new(Arc::clone(&kv)),
            Arc::clone(&remote),
            DELAY,
        )
        .await;
        (controller, kv, remote)
    }

    fn stored_locally(kv: &Arc<MemoryStore>) -> Snapshot {
        LocalStore::new(Arc::clone(kv)).load().unwrap()
    }

    fn wish(id: &str, title: &str) -> WishlistItem {
        let mut item = WishlistItem::new(title, None, WishlistCategory::Plans, 1);
        item.id = WishlistItemId::new(id);
        item
    }

    async fn settle() {
        tokio::time::sleep(DELAY * 2).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_merges_and_persists() {
        let local = Snapshot {
            wishlist: vec![wish("a", "Old")],
            ..Snapshot::default()
        };
        let remote = Snapshot {
            wishlist: vec![wish("a", "New"), wish("b", "Extra")],
            ..Snapshot::default()
        };

        let (controller, kv, _) = start_with(local, FakeRemote::holding(remote)).await;

        let titles: Vec<String> = controller
            .snapshot()
            .wishlist
            .iter()
            .map(|w| format!("{}/{}", w.id, w.title))
            .collect();
        assert_eq!(titles, vec!["a/Old", "b/Extra"]);
        assert!(stored_locally(&kv).same_contents(&controller.snapshot()));
        assert_eq!(controller.status(), SyncStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_writes_back_only_when_merge_differs() {
        let same = Snapshot {
            wishlist: vec![wish("a", "A")],
            ..Snapshot::default()
        };
        let (_, _, remote) = start_with(same.clone(), FakeRemote::holding(same)).await;
        settle().await;
        assert!(remote.saves().is_empty());

        let local = Snapshot {
            wishlist: vec![wish("local", "L")],
            ..Snapshot::default()
        };
        let (controller, _, remote) = start_with(local, FakeRemote::holding(Snapshot::default())).await;
        settle().await;
        let saves = remote.saves();
        assert_eq!(saves.len(), 1);
        assert!(saves[0].same_contents(&controller.snapshot()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_fetch_absent_keeps_local() {
        let local = Snapshot {
            wishlist: vec![wish("a", "Mine")],
            last_updated: 5,
            ..Snapshot::default()
        };
        let (controller, kv, remote) = start_with(local.clone(), FakeRemote::default()).await;

        assert_eq!(controller.snapshot(), local);
        assert_eq!(stored_locally(&kv), local);
        assert_eq!(controller.status(), SyncStatus::Error);
        settle().await;
        assert!(remote.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_odd_stored_records_survive_the_next_mutation() {
        let blob = r#"{
            "wishlist": [{"id": "w1", "categoryId": "plans", "title": "Keep me", "createdAt": 1}],
            "makeup": [{"id": "p1", "brand": "B", "name": "Serum", "category": "skincare",
                        "paoMonths": 1.5, "dateOpened": 2}],
            "mailbox": [],
            "lastUpdated": 3
        }"#;
        let kv = Arc::new(MemoryStore::new().with_entry(SNAPSHOT_KEY, blob));
        let controller = AppController::start(
            LocalStore::new(Arc::clone(&kv)),
            FakeRemote::default(),
            DELAY,
        )
        .await;
        assert_eq!(controller.status(), SyncStatus::Error);
        assert_eq!(controller.snapshot().wishlist.len(), 1);

        controller.add_wishlist_item("New", None, WishlistCategory::Flowers);

        let stored = stored_locally(&kv);
        let titles: Vec<&str> = stored.wishlist.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Keep me"]);
        assert_eq!(stored.makeup.len(), 1);
        assert!((stored.makeup[0].pao_months - 1.5).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_mutations_saves_once() {
        let (controller, _, remote) =
            start_with(Snapshot::default(), FakeRemote::holding(Snapshot::default())).await;

        controller.add_wishlist_item("One", None, WishlistCategory::Plans);
        tokio::time::sleep(Duration::from_millis(500)).await;
        controller.add_wishlist_item("Two", None, WishlistCategory::Flowers);
        tokio::time::sleep(Duration::from_millis(500)).await;
        let third = controller.add_wishlist_item("Three", None, WishlistCategory::Products);
        assert_eq!(controller.status(), SyncStatus::Syncing);
        assert!(remote.saves().is_empty());

        settle().await;

        let saves = remote.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0], controller.snapshot());
        assert_eq!(saves[0].wishlist.len(), 3);
        assert_eq!(saves[0].wishlist[0].id, third.id);
        assert_eq!(controller.status(), SyncStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_persists_locally_before_remote() {
        let (controller, kv, remote) =
            start_with(Snapshot::default(), FakeRemote::holding(Snapshot::default())).await;

        let item =
            controller.add_wishlist_item("Sushi", Some(" ".into()), WishlistCategory::Restaurants);
        assert_eq!(item.description, None);
        assert_eq!(stored_locally(&kv).wishlist, vec![item]);
        assert!(remote.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_reports_error() {
        let (controller, _, remote) =
            start_with(Snapshot::default(), FakeRemote::holding(Snapshot::default())).await;
        remote.failing.store(true, Ordering::SeqCst);

        let mut status = controller.subscribe_status();
        controller.add_wishlist_item("x", None, WishlistCategory::Plans);
        let observed = *status
            .wait_for(|s| *s == SyncStatus::Error)
            .await
            .unwrap();
        assert_eq!(observed, SyncStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_ids_change_nothing() {
        let (controller, _, remote) =
            start_with(Snapshot::default(), FakeRemote::holding(Snapshot::default())).await;
        let before = controller.snapshot();

        assert!(controller.toggle_wishlist_item("missing").is_none());
        assert!(!controller.delete_wishlist_item("missing"));
        assert!(!controller.remove_cosmetic("missing"));
        assert!(controller.mark_message_read("missing").is_none());

        assert_eq!(controller.snapshot(), before);
        assert_eq!(controller.status(), SyncStatus::Saved);
        settle().await;
        assert!(remote.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wishlist_toggle_and_delete() {
        let (controller, _, _) =
            start_with(Snapshot::default(), FakeRemote::holding(Snapshot::default())).await;
        let item = controller.add_wishlist_item("Tulips", None, WishlistCategory::Flowers);

        let toggled = controller.toggle_wishlist_item(item.id.as_str()).unwrap();
        assert!(toggled.is_completed);
        let toggled = controller.toggle_wishlist_item(item.id.as_str()).unwrap();
        assert!(!toggled.is_completed);

        assert!(controller.delete_wishlist_item(item.id.as_str()));
        assert!(controller.snapshot().wishlist.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cosmetics_prepend_and_remove() {
        let (controller, _, _) =
            start_with(Snapshot::default(), FakeRemote::holding(Snapshot::default())).await;
        let input = |name: &str| NewCosmetic {
            id: None,
            brand: "Brand".into(),
            name: name.into(),
            category: CosmeticCategory::Lips,
            pao_months: 12.0,
            date_opened: None,
            image_url: None,
        };

        let first = controller.add_cosmetic(input("Gloss"));
        let second = controller.add_cosmetic(input("Balm"));
        let names: Vec<String> = controller
            .snapshot()
            .makeup
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["Balm", "Gloss"]);

        assert!(controller.remove_cosmetic(first.id.as_str()));
        assert_eq!(controller.snapshot().makeup, vec![second]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_requires_identity() {
        let (controller, _, remote) =
            start_with(Snapshot::default(), FakeRemote::holding(Snapshot::default())).await;

        assert!(controller.identity().is_none());
        assert!(controller.send_message("hola").is_none());
        assert!(controller.snapshot().mailbox.is_empty());
        settle().await;
        assert!(remote.saves().is_empty());

        controller.select_identity(UserRole::Admin);
        let sent = controller.send_message("hola").unwrap();
        assert_eq!(sent.sender(), UserRole::Admin);
        assert!(!sent.is_read());
        assert_eq!(controller.snapshot().mailbox[0].id, sent.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_survives_restart() {
        let kv = Arc::new(MemoryStore::new());
        let controller = AppController::start(
            LocalStore::new(Arc::clone(&kv)),
            FakeRemote::default(),
            DELAY,
        )
        .await;
        controller.select_identity(UserRole::Libertad);

        let restarted = AppController::start(
            LocalStore::new(Arc::clone(&kv)),
            FakeRemote::default(),
            DELAY,
        )
        .await;
        assert_eq!(restarted.identity(), Some(UserRole::Libertad));

        restarted.clear_identity();
        assert_eq!(LocalStore::new(kv).load_identity(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_read_is_sticky() {
        let mut incoming = Message::new(MessageId::new("m1"), "hi", 1, UserRole::Admin);
        let local = Snapshot {
            mailbox: vec![incoming.clone()],
            ..Snapshot::default()
        };
        incoming.mark_read();
        let remote = Snapshot {
            mailbox: vec![incoming],
            ..Snapshot::default()
        };

        let (controller, _, _) = start_with(local, FakeRemote::holding(remote)).await;
        let mailbox = controller.snapshot().mailbox;
        assert_eq!(mailbox.len(), 1);
        assert!(mailbox[0].is_read());

        assert!(controller.mark_message_read("m1").unwrap().is_read());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_both_stores() {
        let populated = Snapshot {
            wishlist: vec![wish("a", "A")],
            ..Snapshot::default()
        };
        let (controller, kv, remote) =
            start_with(populated.clone(), FakeRemote::holding(populated)).await;
        controller.add_wishlist_item("pending", None, WishlistCategory::Plans);

        assert!(controller.reset().await);
        assert!(controller.snapshot().is_empty());
        assert!(stored_locally(&kv).is_empty());
        assert_eq!(controller.status(), SyncStatus::Saved);

        settle().await;
        let saves = remote.saves();
        assert_eq!(saves.len(), 1, "pending save must be cancelled");
        assert!(saves[0].is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_lands_after_save_in_flight() {
        let slow = FakeRemote {
            save_latency: Duration::from_secs(1),
            ..FakeRemote::holding(Snapshot::default())
        };
        let (controller, kv, remote) = start_with(Snapshot::default(), slow).await;
        controller.add_wishlist_item("in flight", None, WishlistCategory::Plans);

        // The timer has fired and the upload is under way.
        tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
        assert!(remote.saves().is_empty());

        assert!(controller.reset().await);

        let saves = remote.saves();
        assert_eq!(saves.len(), 2);
        assert_eq!(saves[0].wishlist.len(), 1);
        assert!(saves[1].is_empty());
        assert!(remote.stored.lock().unwrap().as_ref().unwrap().is_empty());
        assert!(stored_locally(&kv).is_empty());
        assert_eq!(controller.status(), SyncStatus::Saved);

        settle().await;
        assert_eq!(remote.saves().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_waits_for_save_in_flight() {
        let slow = FakeRemote {
            save_latency: Duration::from_secs(1),
            ..FakeRemote::holding(Snapshot::default())
        };
        let (controller, _, remote) = start_with(Snapshot::default(), slow).await;
        controller.add_wishlist_item("in flight", None, WishlistCategory::Plans);
        tokio::time::sleep(DELAY + Duration::from_millis(100)).await;

        assert!(controller.flush().await);
        assert_eq!(remote.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_reports_remote_failure() {
        let (controller, kv, remote) =
            start_with(Snapshot::default(), FakeRemote::holding(Snapshot::default())).await;
        controller.add_wishlist_item("x", None, WishlistCategory::Plans);
        remote.failing.store(true, Ordering::SeqCst);

        assert!(!controller.reset().await);
        assert_eq!(controller.status(), SyncStatus::Error);
        assert!(stored_locally(&kv).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_saves_immediately() {
        let (controller, _, remote) =
            start_with(Snapshot::default(), FakeRemote::holding(Snapshot::default())).await;
        assert!(controller.flush().await);
        assert!(remote.saves().is_empty());

        controller.add_wishlist_item("now", None, WishlistCategory::Plans);
        assert!(controller.flush().await);
        assert_eq!(remote.saves().len(), 1);

        settle().await;
        assert_eq!(remote.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_local_blob_starts_empty() {
        let kv = Arc::new(MemoryStore::new().with_entry(SNAPSHOT_KEY, "not json"));
        let controller = AppController::start(
            LocalStore::new(Arc::clone(&kv)),
            FakeRemote::default(),
            DELAY,
        )
        .await;
        assert!(controller.snapshot().is_empty());

        controller.add_wishlist_item("After", None, WishlistCategory::Plans);
        assert_eq!(
            kv.get(UNREADABLE_SNAPSHOT_KEY).unwrap().as_deref(),
            Some("not json")
        );
    }
}
