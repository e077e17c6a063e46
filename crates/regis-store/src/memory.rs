use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use regis_types::EventType;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::record::{is_under, RawEvent, StoredRecord};
use crate::traits::KeyValueStore;
use crate::watch::{EndSignal, RawWatch, WatchEnd};

/// In-memory, versioned key-value store.
///
/// Intended for tests and embedding. Versions come from a single index that
/// advances on every mutation, so they are monotonic across the whole store
/// and not just per key. The most recent changes are kept for `since`
/// replay and every change is fanned out to open watches.
pub struct InMemoryStore {
    state: RwLock<State>,
    changes: broadcast::Sender<RawEvent>,
    shutdown: watch::Sender<bool>,
    config: StoreConfig,
}

#[derive(Default)]
struct State {
    records: BTreeMap<String, Entry>,
    index: u64,
    history: VecDeque<RawEvent>,
    /// Highest version evicted from `history`.
    cleared_through: u64,
    closed: bool,
}

struct Entry {
    data: Vec<u8>,
    version: u64,
}

impl InMemoryStore {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::build(StoreConfig::default())
    }

    /// Create an empty store with a validated configuration.
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: StoreConfig) -> Self {
        let (changes, _) = broadcast::channel(config.channel_capacity);
        let (shutdown, _) = watch::channel(false);
        info!(
            history_limit = config.history_limit,
            channel_capacity = config.channel_capacity,
            "in-memory store opened"
        );
        Self {
            state: RwLock::new(State::default()),
            changes,
            shutdown,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.read_state().records.len()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.read_state().records.is_empty()
    }

    /// Version assigned to the most recent mutation, zero if none.
    pub fn current_index(&self) -> u64 {
        self.read_state().index
    }

    /// Number of open watch subscriptions.
    pub fn watcher_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Terminate every open watch and refuse further requests.
    pub fn close(&self) {
        self.write_state().closed = true;
        self.shutdown.send_replace(true);
        info!("in-memory store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.read_state().closed
    }

    // A panic while holding the lock cannot leave a half-applied mutation
    // behind, so a poisoned lock is still safe to use.
    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_state(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        let state = self.write_state();
        if state.closed {
            return Err(StoreError::Closed);
        }
        Ok(state)
    }

    /// Assign the next version to a change, publish it and remember it.
    /// Must be called with the write lock held so that watchers observe
    /// changes in version order.
    fn publish(&self, state: &mut State, event_type: EventType, key: &str, data: Vec<u8>) -> u64 {
        state.index += 1;
        let version = state.index;
        let event = RawEvent {
            event_type,
            record: StoredRecord::new(key, data, version),
        };
        // A send error only means nobody is watching.
        let _ = self.changes.send(event.clone());
        state.history.push_back(event);
        while state.history.len() > self.config.history_limit {
            if let Some(evicted) = state.history.pop_front() {
                state.cleared_through = evicted.record.version;
            }
        }
        version
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryStore {
    fn extract_all(&self, prefix: &str) -> StoreResult<Vec<StoredRecord>> {
        let state = self.read_state();
        if state.closed {
            return Err(StoreError::Closed);
        }
        let records = state
            .records
            .range::<str, _>((Bound::Excluded(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| is_under(prefix, key))
            .map(|(key, entry)| StoredRecord::new(key.as_str(), entry.data.clone(), entry.version))
            .collect();
        Ok(records)
    }

    fn extract_one(&self, key: &str) -> StoreResult<StoredRecord> {
        let state = self.read_state();
        if state.closed {
            return Err(StoreError::Closed);
        }
        state
            .records
            .get(key)
            .map(|entry| StoredRecord::new(key, entry.data.clone(), entry.version))
            .ok_or_else(|| StoreError::KeyNotFound {
                key: key.to_string(),
            })
    }

    fn create_only(&self, key: &str, data: Vec<u8>) -> StoreResult<u64> {
        check_record_key(key)?;
        let mut state = self.open_state()?;
        if state.records.contains_key(key) {
            return Err(StoreError::NodeExist {
                key: key.to_string(),
            });
        }
        let version = self.publish(&mut state, EventType::Added, key, data.clone());
        state.records.insert(key.to_string(), Entry { data, version });
        debug!(key, version, "record created");
        Ok(version)
    }

    fn set(&self, key: &str, data: Vec<u8>) -> StoreResult<u64> {
        check_record_key(key)?;
        let mut state = self.open_state()?;
        let event_type = if state.records.contains_key(key) {
            EventType::Modified
        } else {
            EventType::Added
        };
        let version = self.publish(&mut state, event_type, key, data.clone());
        state.records.insert(key.to_string(), Entry { data, version });
        debug!(key, version, %event_type, "record set");
        Ok(version)
    }

    fn delete(&self, key: &str, recursive: bool) -> StoreResult<()> {
        let mut state = self.open_state()?;
        let doomed: Vec<String> = if recursive {
            state
                .records
                .range::<str, _>((Bound::Included(key), Bound::Unbounded))
                .take_while(|(k, _)| k.starts_with(key))
                .filter(|(k, _)| k.as_str() == key || is_under(key, k))
                .map(|(k, _)| k.clone())
                .collect()
        } else if state.records.contains_key(key) {
            vec![key.to_string()]
        } else {
            Vec::new()
        };
        if doomed.is_empty() {
            return Err(StoreError::KeyNotFound {
                key: key.to_string(),
            });
        }
        for k in doomed {
            if let Some(entry) = state.records.remove(&k) {
                let version = self.publish(&mut state, EventType::Deleted, &k, entry.data);
                debug!(key = %k, version, "record deleted");
            }
        }
        Ok(())
    }

    fn watch(&self, prefix: &str, since: u64) -> StoreResult<RawWatch> {
        let runtime = Handle::try_current()
            .map_err(|e| StoreError::Unavailable(format!("watch requires a tokio runtime: {e}")))?;

        // Subscribe while holding the lock: every change is either in the
        // backlog or on the feed, never both and never neither.
        let state = self.read_state();
        if state.closed {
            return Err(StoreError::Closed);
        }
        if since != 0 && since <= state.cleared_through {
            return Err(StoreError::IndexCleared {
                requested: since,
                oldest: state.cleared_through + 1,
            });
        }
        let backlog: Vec<RawEvent> = if since == 0 {
            Vec::new()
        } else {
            state
                .history
                .iter()
                .filter(|e| e.record.version >= since && is_under(prefix, &e.record.key))
                .cloned()
                .collect()
        };
        let changes = self.changes.subscribe();
        let shutdown = self.shutdown.subscribe();
        drop(state);

        let (events, rx) = mpsc::channel(self.config.watch_buffer);
        let (stop_tx, stop) = oneshot::channel();
        let watch = RawWatch::new(rx, stop_tx);
        debug!(prefix, since, backlog = backlog.len(), "watch opened");
        runtime.spawn(forward(
            Subscription {
                prefix: prefix.to_string(),
                since,
                changes,
                shutdown,
                events,
                stop,
                end: watch.end_signal(),
            },
            backlog,
        ));
        Ok(watch)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("InMemoryStore")
            .field("record_count", &state.records.len())
            .field("index", &state.index)
            .field("closed", &state.closed)
            .finish()
    }
}

/// Records live at non-empty keys that do not name a directory.
fn check_record_key(key: &str) -> StoreResult<()> {
    if key.is_empty() || key.ends_with('/') {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Producer side of one watch.
struct Subscription {
    prefix: String,
    since: u64,
    changes: broadcast::Receiver<RawEvent>,
    shutdown: watch::Receiver<bool>,
    events: mpsc::Sender<RawEvent>,
    stop: oneshot::Receiver<()>,
    end: EndSignal,
}

impl Subscription {
    /// Hand an event to the consumer. Returns `false` once the consumer is
    /// gone or has stopped the watch.
    async fn deliver(&mut self, event: RawEvent) -> bool {
        tokio::select! {
            biased;
            _ = &mut self.stop => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }
}

async fn forward(mut sub: Subscription, backlog: Vec<RawEvent>) {
    for event in backlog {
        if !sub.deliver(event).await {
            return;
        }
    }
    loop {
        let event = tokio::select! {
            biased;
            _ = &mut sub.stop => return,
            _ = sub.shutdown.changed() => {
                debug!(prefix = %sub.prefix, "store closed, ending watch");
                sub.end.record(WatchEnd::StoreClosed);
                return;
            }
            received = sub.changes.recv() => match received {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    sub.end.record(WatchEnd::Lagged { skipped });
                    warn!(
                        prefix = %sub.prefix,
                        skipped,
                        "watcher fell behind the change feed, ending watch"
                    );
                    return;
                }
                Err(RecvError::Closed) => {
                    sub.end.record(WatchEnd::StoreClosed);
                    return;
                }
            },
        };
        if event.record.version < sub.since || !is_under(&sub.prefix, &event.record.key) {
            continue;
        }
        if !sub.deliver(event).await {
            return;
        }
    }
}
