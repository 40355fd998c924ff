//! Reuse pool for `Client` entries.
//!
//! Create-on-miss, return-on-done. The pool never validates, resets or
//! evicts what it is given back: a released client still carries whatever
//! was last configured on it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::client::Client;

/// Shared, internally synchronized pool of idle clients.
#[derive(Debug, Default)]
pub struct ClientPool {
    idle: Mutex<Vec<Client>>,
    capacity: Option<usize>,
    created: AtomicUsize,
}

impl ClientPool {
    /// Pool keeping every released client.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Pool keeping at most `capacity` idle clients; extra releases are dropped.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Take an idle client, or create a bare one.
    pub fn acquire(&self) -> Client {
        if let Some(client) = self.lock().pop() {
            log::trace!("reusing pooled client {}", client.id());
            return client;
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        let client = Client::new();
        log::debug!("created client {}", client.id());
        client
    }

    /// Hand a client back for reuse.
    pub fn release(&self, client: Client) {
        let mut idle = self.lock();
        if self.capacity.is_some_and(|cap| idle.len() >= cap) {
            log::trace!("pool full, dropping client {}", client.id());
            return;
        }
        log::trace!("released client {}", client.id());
        idle.push(client);
    }

    /// Number of idle clients.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    /// Number of clients this pool has created.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    // A panic while holding the lock cannot leave the Vec half-updated.
    fn lock(&self) -> MutexGuard<'_, Vec<Client>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
