use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use prism_data::models::{Account, Role};

/// A logged-in staff session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Random session identifier, carried in the signed cookie
    pub id: String,
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-process session store.
///
/// Sessions live in a mutex-guarded map keyed by session id. Expired entries
/// are dropped on lookup and by [`SessionStore::cleanup_expired`]. When the
/// store reaches `max_size` it first purges expired sessions and then evicts
/// the oldest half.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    ttl: Duration,
    max_size: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

impl SessionStore {
    /// Create a store whose sessions last `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self::with_max_size(ttl, 10_000)
    }

    pub fn with_max_size(ttl: Duration, max_size: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_size,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // A poisoned lock only means another request panicked mid-update; the
    // map itself is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a session for an account
    pub fn create(&self, account: &Account) -> Session {
        let now = Utc::now();
        let session = Session {
            id: generate_session_id(),
            user_id: account.id,
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            role: account.role,
            created_at: now,
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let mut sessions = self.lock();
        if sessions.len() >= self.max_size {
            warn!("Session store reached max size ({}), pruning", self.max_size);
            Self::remove_expired(&mut sessions, now);

            if sessions.len() >= self.max_size {
                Self::remove_oldest(&mut sessions, self.max_size / 2);
            }
        }

        sessions.insert(session.id.clone(), session.clone());
        info!("Session created for user {}", account.username);
        session
    }

    /// Look up a live session; an expired one is removed and reported missing
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let mut sessions = self.lock();
        let session = sessions.get(session_id)?.clone();

        if session.is_expired(Utc::now()) {
            debug!("Session for user {} has expired", session.username);
            sessions.remove(session_id);
            return None;
        }

        Some(session)
    }

    /// End one session; returns whether it existed
    pub fn revoke(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    /// End every session belonging to a user; returns how many were removed
    pub fn revoke_user(&self, user_id: Uuid) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        let removed = before - sessions.len();

        if removed > 0 {
            info!("Revoked {} session(s) for user {}", removed, user_id);
        }
        removed
    }

    /// Copy an edited account's name and role into its live sessions
    pub fn refresh_user(&self, account: &Account) -> usize {
        let mut refreshed = 0;
        for session in self.lock().values_mut().filter(|s| s.user_id == account.id) {
            session.username = account.username.clone();
            session.full_name = account.full_name.clone();
            session.role = account.role;
            refreshed += 1;
        }
        refreshed
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Drop expired sessions; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.lock();
        Self::remove_expired(&mut sessions, Utc::now())
    }

    fn remove_expired(sessions: &mut HashMap<String, Session>, now: DateTime<Utc>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        let removed = before - sessions.len();

        if removed > 0 {
            debug!("Removed {} expired sessions", removed);
        }
        removed
    }

    fn remove_oldest(sessions: &mut HashMap<String, Session>, count: usize) {
        let mut by_age: Vec<(String, DateTime<Utc>)> = sessions
            .iter()
            .map(|(id, s)| (id.clone(), s.created_at))
            .collect();
        by_age.sort_by(|a, b| a.1.cmp(&b.1));

        for (id, _) in by_age.into_iter().take(count) {
            sessions.remove(&id);
        }

        debug!("Evicted {} oldest sessions", count);
    }
}

/// Start a background task that periodically purges expired sessions
pub fn start_cleanup_task(store: SessionStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));

        loop {
            interval.tick().await;
            let removed = store.cleanup_expired();
            debug!("Session cleanup removed {}, {} remain", removed, store.size());
        }
    });
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
