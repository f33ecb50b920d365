//! Live-update fan-out. Stands in for the push channels of a hosted
//! backend: auth-state changes and per-document profile changes. A
//! subscription is an explicit registration that returns a handle;
//! dropping the handle unsubscribes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::db::models::UserProfile;

type ProfileCallback = dyn Fn(&UserProfile) + Send + Sync;
type AuthCallback = dyn Fn(&AuthEvent) + Send + Sync;

/// Observer registry for profile documents, keyed by uid.
pub struct ProfileHub {
    inner: Mutex<ProfileHubInner>,
}

#[derive(Default)]
struct ProfileHubInner {
    next_id: u64,
    subscribers: HashMap<String, Vec<(u64, Arc<ProfileCallback>)>>,
}

impl ProfileHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ProfileHubInner::default()),
        })
    }

    /// Register a callback for one uid's profile updates. The
    /// subscription lives until the returned handle is dropped.
    pub fn subscribe<F>(self: &Arc<Self>, uid: &str, callback: F) -> ProfileWatch
    where
        F: Fn(&UserProfile) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id;
            inner.next_id += 1;
            inner
                .subscribers
                .entry(uid.to_string())
                .or_default()
                .push((id, Arc::new(callback)));
            id
        };
        tracing::debug!("Profile watch {} started for {}", id, uid);

        ProfileWatch {
            hub: Arc::downgrade(self),
            uid: uid.to_string(),
            id,
        }
    }

    /// Push a fresh profile to its uid's subscribers. Callbacks are
    /// snapshotted first and invoked with no lock held, so a callback
    /// may itself subscribe or publish.
    pub fn publish(&self, profile: &UserProfile) {
        let callbacks: Vec<Arc<ProfileCallback>> = {
            let inner = self.inner.lock().unwrap();
            inner
                .subscribers
                .get(&profile.uid)
                .map(|subs| subs.iter().map(|(_, cb)| cb.clone()).collect())
                .unwrap_or_default()
        };
        for callback in &callbacks {
            callback(profile);
        }
    }

    pub fn subscriber_count(&self, uid: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.subscribers.get(uid).map(|s| s.len()).unwrap_or(0)
    }

    fn unsubscribe(&self, uid: &str, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(subs) = inner.subscribers.get_mut(uid) {
            subs.retain(|(sub_id, _)| *sub_id != id);
            if subs.is_empty() {
                inner.subscribers.remove(uid);
            }
        }
    }
}

/// Unsubscribe handle for one profile watch.
pub struct ProfileWatch {
    hub: Weak<ProfileHub>,
    uid: String,
    id: u64,
}

impl ProfileWatch {
    pub fn uid(&self) -> &str {
        &self.uid
    }
}

impl Drop for ProfileWatch {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(&self.uid, self.id);
            tracing::debug!("Profile watch {} ended for {}", self.id, self.uid);
        }
    }
}

/// One auth-state transition, published by the sign-in/sign-out
/// handlers and consumed by the session registry.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn { token: String, uid: String },
    SignedOut { token: String },
}

/// Fan-out for auth-state changes.
pub struct AuthHub {
    inner: Mutex<AuthHubInner>,
}

#[derive(Default)]
struct AuthHubInner {
    next_id: u64,
    subscribers: Vec<(u64, Arc<AuthCallback>)>,
}

impl AuthHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(AuthHubInner::default()),
        })
    }

    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> AuthWatch
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, Arc::new(callback)));
            id
        };

        AuthWatch {
            hub: Arc::downgrade(self),
            id,
        }
    }

    pub fn publish(&self, event: &AuthEvent) {
        let callbacks: Vec<Arc<AuthCallback>> = {
            let inner = self.inner.lock().unwrap();
            inner.subscribers.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for callback in &callbacks {
            callback(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }

    fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }
}

/// Unsubscribe handle for one auth watch.
pub struct AuthWatch {
    hub: Weak<AuthHub>,
    id: u64,
}

impl Drop for AuthWatch {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}
