use crate::time::now_ms;
use sotto_api::types::{ServerEvent, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub type ConnectionId = Uuid;

#[derive(Default)]
struct Inner {
    live: HashMap<String, HashMap<ConnectionId, mpsc::Sender<ServerEvent>>>,
    last_seen: HashMap<String, u64>,
}

/// Live connections per user, multiple simultaneous devices supported.
/// An empty set is "offline". Injected into the relay components rather
/// than living in process-global state.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection; the bool reports whether this was the user's
    /// first live connection (the offline -> online transition).
    pub async fn register(
        &self,
        user: &UserId,
        tx: mpsc::Sender<ServerEvent>,
    ) -> (ConnectionId, bool) {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().await;
        let entry = inner.live.entry(user.value.clone()).or_default();
        let first = entry.is_empty();
        entry.insert(id, tx);
        (id, first)
    }

    /// Removes a connection; the bool reports whether the user now has
    /// zero live connections. Records the last-seen timestamp on that
    /// transition.
    pub async fn deregister(&self, user: &UserId, id: ConnectionId) -> bool {
        let mut inner = self.inner.lock().await;
        let offline = match inner.live.get_mut(&user.value) {
            Some(entry) => {
                entry.remove(&id);
                entry.is_empty()
            }
            None => false,
        };
        if offline {
            inner.live.remove(&user.value);
            inner.last_seen.insert(user.value.clone(), now_ms());
        }
        offline
    }

    pub async fn is_online(&self, user: &UserId) -> bool {
        let inner = self.inner.lock().await;
        inner
            .live
            .get(&user.value)
            .map(|entry| !entry.is_empty())
            .unwrap_or(false)
    }

    pub async fn last_seen_ms(&self, user: &UserId) -> Option<u64> {
        let inner = self.inner.lock().await;
        inner.last_seen.get(&user.value).copied()
    }

    /// Fans an event out to every live connection of `user`, best-effort
    /// and independent per connection: a full or closed queue never
    /// blocks the others. Returns how many queues accepted the event.
    pub async fn push(&self, user: &UserId, event: &ServerEvent) -> usize {
        self.push_except(user, None, event).await
    }

    /// Same as [`ConnectionRegistry::push`] but skips one connection,
    /// used so an acting device is answered by its ack instead of its
    /// own fan-out copy.
    pub async fn push_except(
        &self,
        user: &UserId,
        skip: Option<ConnectionId>,
        event: &ServerEvent,
    ) -> usize {
        let senders: Vec<mpsc::Sender<ServerEvent>> = {
            let inner = self.inner.lock().await;
            match inner.live.get(&user.value) {
                Some(entry) => entry
                    .iter()
                    .filter(|(id, _)| Some(**id) != skip)
                    .map(|(_, tx)| tx.clone())
                    .collect(),
                None => Vec::new(),
            }
        };
        let mut accepted = 0;
        for tx in senders {
            if tx.try_send(event.clone()).is_ok() {
                accepted += 1;
            }
        }
        accepted
    }
}
