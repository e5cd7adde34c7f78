//! Session store: single source of truth for "are we logged in, and as whom".
//!
//! ARCHITECTURE
//! ============
//! The in-memory session and the subscriber list live behind one mutex.
//! Every mutation writes durable storage, updates memory, and enqueues the new
//! value to each subscriber while holding that lock, so storage and memory
//! agree on return and subscribers see updates in mutation order.
//!
//! Subscribers receive values through unbounded channels. Sending never
//! blocks and never re-enters the store, so delivering under the lock is safe.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;

use super::storage::{DurableStorage, StorageError, TOKEN_KEY, USER_KEY};
use super::types::{Session, SessionUser};

/// Value delivered to subscribers: the new session, or `None` once cleared.
pub type SessionUpdate = Option<Session>;

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<SessionUpdate>,
}

#[derive(Default)]
struct StoreInner {
    session: Option<Session>,
    subscribers: Vec<Subscriber>,
    next_subscriber_id: u64,
}

impl StoreInner {
    fn notify(&mut self, update: &SessionUpdate) {
        self.subscribers
            .retain(|subscriber| subscriber.tx.send(update.clone()).is_ok());
    }
}

/// Owner of the current session and its persisted copy.
pub struct SessionStore {
    storage: Arc<dyn DurableStorage>,
    inner: Arc<Mutex<StoreInner>>,
}

impl SessionStore {
    /// Create an empty store over `storage`. Call [`SessionStore::restore`]
    /// once at startup to load a persisted session.
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage, inner: Arc::new(Mutex::new(StoreInner::default())) }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the persisted session, if both slots are present and well-formed.
    ///
    /// A torn or malformed pair is discarded from storage and the store ends
    /// up with no session.
    pub fn restore(&self) -> Option<Session> {
        let mut inner = self.lock();
        let restored = match read_persisted(self.storage.as_ref()) {
            Persisted::Empty => None,
            Persisted::Present(session) => {
                tracing::info!(user_id = %session.user.user_id, "restored persisted session");
                Some(session)
            }
            Persisted::Torn(reason) => {
                tracing::warn!(reason, "discarding unusable persisted session");
                if let Err(e) = remove_slots(self.storage.as_ref()) {
                    tracing::warn!(error = %e, "failed to remove unusable session from storage");
                }
                None
            }
        };

        if inner.session != restored {
            inner.session.clone_from(&restored);
            inner.notify(&restored);
        }
        restored
    }

    /// Replace the current session and persist it.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the session could not be persisted. The
    /// in-memory session is left unchanged in that case.
    pub fn set_session(&self, token: impl Into<String>, user: SessionUser) -> Result<(), StorageError> {
        let session = Session::new(token, user);
        let mut inner = self.lock();

        if let Err(e) = write_slots(self.storage.as_ref(), &session) {
            let rollback = match &inner.session {
                Some(previous) => write_slots(self.storage.as_ref(), previous),
                None => remove_slots(self.storage.as_ref()),
            };
            if let Err(rollback_err) = rollback {
                tracing::warn!(error = %rollback_err, "failed to roll back session storage");
            }
            return Err(e);
        }

        tracing::info!(user_id = %session.user.user_id, "session established");
        let update = Some(session);
        inner.session.clone_from(&update);
        inner.notify(&update);
        Ok(())
    }

    /// Drop the current session from memory and storage.
    ///
    /// Memory is always cleared. Subscribers are notified only if a session
    /// was present, so repeated calls produce no further notifications.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the persisted copy could not be removed.
    pub fn clear_session(&self) -> Result<(), StorageError> {
        let mut inner = self.lock();
        self.clear_locked(&mut inner)
    }

    /// Clear the session in response to the API rejecting `rejected_token`
    /// (`None` when the rejected request carried no credential).
    ///
    /// A session installed after that request was sent is kept: returns
    /// `Ok(false)` without touching anything when the current token differs
    /// from `rejected_token`. Otherwise behaves like
    /// [`SessionStore::clear_session`] and returns `Ok(true)`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the persisted copy could not be removed.
    /// Memory is cleared regardless.
    pub fn clear_rejected_session(&self, rejected_token: Option<&str>) -> Result<bool, StorageError> {
        let mut inner = self.lock();
        if let Some(current) = &inner.session {
            if rejected_token != Some(current.token.as_str()) {
                return Ok(false);
            }
        }
        self.clear_locked(&mut inner)?;
        Ok(true)
    }

    fn clear_locked(&self, inner: &mut StoreInner) -> Result<(), StorageError> {
        let removed = remove_slots(self.storage.as_ref());
        if inner.session.take().is_some() {
            tracing::info!("session cleared");
            inner.notify(&None);
        }
        removed
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.lock().session.is_some()
    }

    /// Register a subscriber. The current value is delivered first, followed
    /// by every later change in order.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        let mut inner = self.lock();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id = inner.next_subscriber_id.wrapping_add(1);
        // The receiver is alive in this scope, so the send cannot fail.
        let _ = tx.send(inner.session.clone());
        inner.subscribers.push(Subscriber { id, tx });
        SessionSubscription { id, rx, inner: Arc::downgrade(&self.inner) }
    }
}

/// Handle returned by [`SessionStore::subscribe`]. Dropping it unsubscribes.
pub struct SessionSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<SessionUpdate>,
    inner: Weak<Mutex<StoreInner>>,
}

impl SessionSubscription {
    /// Wait for the next session value. Returns `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<SessionUpdate> {
        self.rx.recv().await
    }

    /// Take the next queued session value without waiting.
    pub fn try_recv(&mut self) -> Option<SessionUpdate> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving updates.
    pub fn unsubscribe(self) {}
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.subscribers.retain(|subscriber| subscriber.id != self.id);
        }
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

enum Persisted {
    Empty,
    Present(Session),
    Torn(&'static str),
}

fn read_persisted(storage: &dyn DurableStorage) -> Persisted {
    let slots = storage
        .get(TOKEN_KEY)
        .and_then(|token| Ok((token, storage.get(USER_KEY)?)));
    let (token, user) = match slots {
        Ok(slots) => slots,
        Err(e) => {
            tracing::warn!(error = %e, "session storage unreadable");
            return Persisted::Torn("storage unreadable");
        }
    };

    match (token, user) {
        (None, None) => Persisted::Empty,
        (Some(token), Some(user)) => {
            if token.trim().is_empty() {
                return Persisted::Torn("empty token");
            }
            match serde_json::from_str::<SessionUser>(&user) {
                Ok(user) => Persisted::Present(Session::new(token, user)),
                Err(_) => Persisted::Torn("malformed user record"),
            }
        }
        _ => Persisted::Torn("token and user slots disagree"),
    }
}

fn write_slots(storage: &dyn DurableStorage, session: &Session) -> Result<(), StorageError> {
    let user = serde_json::to_string(&session.user)?;
    storage.set(TOKEN_KEY, &session.token)?;
    storage.set(USER_KEY, &user)
}

/// Remove both slots, attempting the second even if the first fails.
fn remove_slots(storage: &dyn DurableStorage) -> Result<(), StorageError> {
    let token = storage.remove(TOKEN_KEY);
    let user = storage.remove(USER_KEY);
    token.and(user)
}
