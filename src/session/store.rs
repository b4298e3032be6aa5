//! In-memory session store.
//!
//! # Design Decisions
//! - Each stored session sits behind its own lock. `load` takes the lock
//!   and `save` (or dropping the `Session`) releases it, so requests on
//!   one session run one at a time
//! - Idle sessions expire; expired entries are swept at most once per
//!   idle timeout, and never while a request holds them

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::session::flash::FlashMessages;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1440);

/// Persisted state of one session.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    values: HashMap<String, Value>,
    flash: FlashMessages,
}

impl SessionData {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.flash.is_empty()
    }
}

#[derive(Debug)]
struct SessionSlot {
    data: SessionData,
    last_access: Instant,
}

impl SessionSlot {
    fn is_expired(&self, idle_timeout: Duration) -> bool {
        self.last_access.elapsed() >= idle_timeout
    }
}

/// Concurrent map of session id → session data.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, Arc<Mutex<SessionSlot>>>>,
    idle_timeout: Duration,
    epoch: Instant,
    /// Milliseconds after `epoch` of the last sweep.
    last_sweep: Arc<AtomicU64>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            idle_timeout,
            epoch: Instant::now(),
            last_sweep: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Load the session for `id`, or start a new one if the id is unknown
    /// or expired.
    ///
    /// Blocks while another request holds the same session. Call it from a
    /// blocking worker, never from an async task.
    pub fn load(&self, id: Option<&str>) -> Session {
        self.sweep_if_due();

        if let Some(id) = id {
            let slot = self.inner.get(id).map(|entry| entry.value().clone());
            if let Some(slot) = slot {
                let guard = slot.clone().blocking_lock_owned();
                if !guard.is_expired(self.idle_timeout) {
                    return Session {
                        id: id.to_string(),
                        is_new: false,
                        data: guard.data.clone(),
                        guard: Some(guard),
                    };
                }
                drop(guard);
                self.inner.remove_if(id, |_, current| Arc::ptr_eq(current, &slot));
            }
        }

        Session {
            id: Uuid::new_v4().to_string(),
            is_new: true,
            data: SessionData::default(),
            guard: None,
        }
    }

    /// Store a session and release its lock. Returns false when an empty
    /// new session was discarded.
    pub fn save(&self, session: Session) -> bool {
        let Session {
            id,
            is_new,
            data,
            guard,
        } = session;

        match guard {
            Some(mut guard) => {
                guard.data = data;
                guard.last_access = Instant::now();
                true
            }
            None if is_new && data.is_empty() => false,
            None => {
                let slot = SessionSlot {
                    data,
                    last_access: Instant::now(),
                };
                self.inner.insert(id, Arc::new(Mutex::new(slot)));
                true
            }
        }
    }

    pub fn destroy(&self, id: &str) {
        self.inner.remove(id);
    }

    /// Drop every expired session no request is holding. Returns how many
    /// were dropped.
    pub fn sweep_expired(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, slot| match slot.try_lock() {
            Ok(slot) => !slot.is_expired(self.idle_timeout),
            Err(_) => true,
        });
        let removed = before.saturating_sub(self.inner.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.inner.len(), "Swept idle sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn sweep_if_due(&self) {
        let now = self.epoch.elapsed().as_millis() as u64;
        let last = self.last_sweep.load(Ordering::Relaxed);
        let interval = self.idle_timeout.as_millis() as u64;
        if now.saturating_sub(last) < interval {
            return;
        }
        if self
            .last_sweep
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            self.sweep_expired();
        }
    }
}

/// Working copy of a session for one request.
///
/// Holds the session's lock until it is saved or dropped.
#[derive(Debug)]
pub struct Session {
    id: String,
    is_new: bool,
    data: SessionData,
    guard: Option<OwnedMutexGuard<SessionSlot>>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when the client did not present a known session id.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.values.remove(key)
    }

    pub fn set_flash(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.data.flash.set(key, message);
    }

    /// Read a flash message; it is dropped at the end of this request.
    pub fn take_flash(&mut self, key: &str) -> Option<String> {
        self.data.flash.get(key)
    }

    pub fn clear_flash(&mut self) {
        self.data.flash.clear();
    }

    /// Called by the request loop before dispatch.
    pub fn begin_request(&mut self) {
        self.data.flash.mark_all();
    }

    /// Called by the request loop after dispatch, before saving.
    pub fn end_request(&mut self) {
        self.data.flash.sweep();
    }
}
