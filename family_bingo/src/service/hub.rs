//! Fan-out of committed game snapshots to subscribers.
//!
//! One topic per game code. Every subscriber remembers the last version it
//! was handed and silently drops anything older, so two commits published
//! out of order can never reach a listener out of order; the newest state
//! always gets through.
//!
//! Deletion is versioned too. `NotFound` raises the floor to the deleted
//! version and the topic keeps that floor as a tombstone, so a snapshot
//! committed before the delete but published after it is dropped. Only a
//! fresh [`publish_created`](SubscriptionHub::publish_created) clears it.

use crate::game::{Game, GameCode};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::{sync::mpsc, task::JoinHandle};

/// Subscriber identifier, unique per hub
pub type SubscriberId = u64;

/// What a subscriber receives.
#[derive(Debug, Clone)]
pub enum GameUpdate {
    /// Full record as committed at `version`
    Snapshot { version: u64, game: Arc<Game> },
    /// No record exists under the subscribed code
    NotFound,
}

impl GameUpdate {
    pub fn game(&self) -> Option<&Game> {
        match self {
            GameUpdate::Snapshot { game, .. } => Some(game),
            GameUpdate::NotFound => None,
        }
    }

    pub fn version(&self) -> Option<u64> {
        match self {
            GameUpdate::Snapshot { version, .. } => Some(*version),
            GameUpdate::NotFound => None,
        }
    }
}

struct Subscriber {
    sender: mpsc::UnboundedSender<GameUpdate>,
    last_version: Option<u64>,
    /// Anything at all was sent
    delivered: bool,
}

impl Subscriber {
    fn new(sender: mpsc::UnboundedSender<GameUpdate>, floor: Option<u64>) -> Self {
        Self {
            sender,
            last_version: floor,
            delivered: false,
        }
    }

    /// Returns false once the receiving side is gone.
    fn send(&mut self, update: GameUpdate) -> bool {
        self.delivered = true;
        self.sender.send(update).is_ok()
    }

    fn offer_snapshot(&mut self, version: u64, game: &Arc<Game>) -> bool {
        if self.last_version.is_some_and(|seen| version <= seen) {
            return true;
        }
        self.last_version = Some(version);
        self.send(GameUpdate::Snapshot {
            version,
            game: Arc::clone(game),
        })
    }

    fn offer_absent(&mut self, version: u64) -> bool {
        self.last_version = Some(self.last_version.map_or(version, |seen| seen.max(version)));
        self.send(GameUpdate::NotFound)
    }
}

#[derive(Default)]
struct HubState {
    next_id: SubscriberId,
    topics: HashMap<GameCode, HashMap<SubscriberId, Subscriber>>,
    /// Version at which each discarded game was deleted
    tombstones: HashMap<GameCode, u64>,
}

/// Registry of listeners per game.
#[derive(Default)]
pub struct SubscriptionHub {
    state: Mutex<HubState>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener for `code`. Nothing is delivered until the first publish
    /// or an explicit [`deliver`](Self::deliver).
    pub fn register(self: &Arc<Self>, code: &GameCode) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.lock();

        let id = state.next_id;
        state.next_id += 1;
        let floor = state.tombstones.get(code).copied();
        state
            .topics
            .entry(code.clone())
            .or_default()
            .insert(id, Subscriber::new(sender, floor));

        log::debug!("Subscriber {} registered for game {}", id, code);

        Subscription {
            code: code.clone(),
            id,
            receiver,
            hub: Arc::clone(self),
        }
    }

    /// Send a committed snapshot to every listener of `code`.
    pub fn publish(&self, code: &GameCode, version: u64, game: Arc<Game>) {
        let mut state = self.state.lock();
        broadcast(&mut state, code, |subscriber| {
            subscriber.offer_snapshot(version, &game)
        });
    }

    /// Send the first snapshot of a newly inserted record. Its versions start
    /// over, so any tombstone and every listener's ordering are reset.
    pub fn publish_created(&self, code: &GameCode, version: u64, game: Arc<Game>) {
        let mut state = self.state.lock();
        state.tombstones.remove(code);
        broadcast(&mut state, code, |subscriber| {
            subscriber.last_version = None;
            subscriber.offer_snapshot(version, &game)
        });
    }

    /// Tell every listener of `code` that the record was deleted at `version`.
    pub fn publish_absent(&self, code: &GameCode, version: u64) {
        let mut state = self.state.lock();
        let floor = state.tombstones.entry(code.clone()).or_insert(version);
        *floor = (*floor).max(version);
        broadcast(&mut state, code, |subscriber| subscriber.offer_absent(version));
    }

    /// Hand the initial state read at subscribe time to a single listener.
    /// A snapshot obeys the version ordering. `NotFound` is skipped when a
    /// published update already reached the listener, since that one is newer.
    pub fn deliver(&self, code: &GameCode, id: SubscriberId, update: GameUpdate) {
        let mut state = self.state.lock();
        let closed = state
            .topics
            .get_mut(code)
            .and_then(|topic| topic.get_mut(&id))
            .is_some_and(|subscriber| match &update {
                GameUpdate::Snapshot { version, game } => !subscriber.offer_snapshot(*version, game),
                GameUpdate::NotFound if subscriber.delivered => false,
                GameUpdate::NotFound => !subscriber.send(GameUpdate::NotFound),
            });

        if closed {
            remove(&mut state, code, id);
        }
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, code: &GameCode, id: SubscriberId) -> bool {
        let mut state = self.state.lock();
        let removed = remove(&mut state, code, id);
        if removed {
            log::debug!("Subscriber {} left game {}", id, code);
        }
        removed
    }

    /// Listeners across all games
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().topics.values().map(HashMap::len).sum()
    }

    /// Listeners of one game
    pub fn listeners(&self, code: &GameCode) -> usize {
        self.state
            .lock()
            .topics
            .get(code)
            .map_or(0, HashMap::len)
    }

    #[cfg(test)]
    fn tombstone(&self, code: &GameCode) -> Option<u64> {
        self.state.lock().tombstones.get(code).copied()
    }
}

fn broadcast<F>(state: &mut HubState, code: &GameCode, mut offer: F)
where
    F: FnMut(&mut Subscriber) -> bool,
{
    let Some(topic) = state.topics.get_mut(code) else {
        return;
    };

    topic.retain(|id, subscriber| {
        let open = offer(subscriber);
        if !open {
            log::debug!("Subscriber {} of game {} disconnected, removing", id, code);
        }
        open
    });

    if topic.is_empty() {
        state.topics.remove(code);
    }
}

fn remove(state: &mut HubState, code: &GameCode, id: SubscriberId) -> bool {
    let Some(topic) = state.topics.get_mut(code) else {
        return false;
    };
    let removed = topic.remove(&id).is_some();
    if topic.is_empty() {
        state.topics.remove(code);
    }
    removed
}

/// Receiving end of a subscription. Dropping it unsubscribes.
pub struct Subscription {
    code: GameCode,
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<GameUpdate>,
    hub: Arc<SubscriptionHub>,
}

impl Subscription {
    pub fn code(&self) -> &GameCode {
        &self.code
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next update
    pub async fn recv(&mut self) -> Option<GameUpdate> {
        self.receiver.recv().await
    }

    /// Next update if one is already queued
    pub fn try_recv(&mut self) -> Option<GameUpdate> {
        self.receiver.try_recv().ok()
    }

    /// Stop receiving; equivalent to dropping the subscription
    pub fn unsubscribe(self) {}

    /// Forward every update to `callback` on a background task.
    pub fn spawn_with<F>(mut self, mut callback: F) -> SubscriptionHandle
    where
        F: FnMut(GameUpdate) + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);

        let task = tokio::spawn(async move {
            while let Some(update) = self.recv().await {
                if !flag.load(Ordering::Acquire) {
                    break;
                }
                callback(update);
            }
        });

        SubscriptionHandle { active, task }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.code, self.id);
    }
}

/// Handle to a callback subscription. Dropping it unsubscribes. Once
/// [`unsubscribe`](Self::unsubscribe) returns no new callback starts; one
/// already running may still finish.
pub struct SubscriptionHandle {
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn unsubscribe(self) {}

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.task.is_finished()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
    }
}
