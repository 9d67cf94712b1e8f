//! Per-client rolling request windows.
//!
//! The client map is only locked long enough to find or insert an entry. All
//! work on one client's window (append, evict, decoy binding) happens under that
//! client's own mutex, so traffic from different clients never queues behind a
//! busy one while one client's requests are applied in arrival order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::backend::{DecoyFactory, DecoyHandle};
use crate::clock::Clock;
use crate::input::NumericFields;
use crate::lock_utils::{lock_or_recover, read_lock_or_recover, write_lock_or_recover};
use crate::types::{ClientIdentity, RequestRecord, Route};

/// Default trailing window (seconds)
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Snapshot of a client's in-window requests, oldest first
pub type WindowView = Vec<RequestRecord>;

/// Behavioral state for one client
struct ClientHistory {
    first_seen: Duration,
    records: VecDeque<RequestRecord>,
    /// Bound on first decoy dispatch and never replaced
    decoy: Option<DecoyHandle>,
    authoritative_served: u64,
    decoys_served: u64,
}

impl ClientHistory {
    fn new(first_seen: Duration) -> Self {
        Self {
            first_seen,
            records: VecDeque::new(),
            decoy: None,
            authoritative_served: 0,
            decoys_served: 0,
        }
    }

    fn evict(&mut self, now: Duration, window: Duration) {
        while let Some(oldest) = self.records.front() {
            if now.saturating_sub(oldest.timestamp) < window {
                break;
            }
            self.records.pop_front();
        }
    }
}

/// Read-only view of a client's state for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub first_seen_secs: f64,
    pub requests_in_window: usize,
    pub authoritative_served: u64,
    pub decoys_served: u64,
    pub decoy_bound: bool,
}

/// Client History Store
pub struct HistoryStore {
    window: Duration,
    clock: Arc<dyn Clock>,
    clients: RwLock<HashMap<ClientIdentity, Arc<Mutex<ClientHistory>>>>,
}

impl HistoryStore {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Find or atomically create the entry for `identity`
    fn entry(&self, identity: &ClientIdentity, first_seen: Duration) -> Arc<Mutex<ClientHistory>> {
        if let Some(entry) = read_lock_or_recover(&self.clients, "client map").get(identity) {
            return Arc::clone(entry);
        }

        let mut clients = write_lock_or_recover(&self.clients, "client map");
        let entry = clients.entry(identity.clone()).or_insert_with(|| {
            debug!("Tracking new client {}", identity);
            Arc::new(Mutex::new(ClientHistory::new(first_seen)))
        });
        Arc::clone(entry)
    }

    fn existing(&self, identity: &ClientIdentity) -> Option<Arc<Mutex<ClientHistory>>> {
        read_lock_or_recover(&self.clients, "client map")
            .get(identity)
            .map(Arc::clone)
    }

    /// Append a request and return the resulting in-window sequence.
    ///
    /// The timestamp is read from the store clock while the client's lock is
    /// held, so a window is always in non-decreasing time order. Eviction is
    /// relative to that timestamp.
    pub fn record(
        &self,
        identity: &ClientIdentity,
        input: NumericFields,
        credentialed: bool,
    ) -> WindowView {
        let entry = self.entry(identity, self.clock.now());
        let mut history = lock_or_recover(&entry, "client history");

        let now = self.clock.now();
        history.records.push_back(RequestRecord {
            timestamp: now,
            input,
            credentialed,
        });
        let before = history.records.len();
        history.evict(now, self.window);

        let evicted = before - history.records.len();
        if evicted > 0 {
            debug!("Evicted {} stale records for {}", evicted, identity);
        }

        history.records.iter().cloned().collect()
    }

    /// Current in-window sequence without recording anything. Empty for unknown clients.
    pub fn recent(&self, identity: &ClientIdentity) -> WindowView {
        let Some(entry) = self.existing(identity) else {
            return Vec::new();
        };

        let mut history = lock_or_recover(&entry, "client history");
        history.evict(self.clock.now(), self.window);
        history.records.iter().cloned().collect()
    }

    /// Return the decoy bound to `identity`, binding a new one on first use.
    ///
    /// The factory runs under the client's lock, so concurrent first requests
    /// from one client still produce a single decoy.
    pub fn get_or_create_decoy(
        &self,
        identity: &ClientIdentity,
        factory: &dyn DecoyFactory,
    ) -> DecoyHandle {
        let entry = self.entry(identity, self.clock.now());
        let mut history = lock_or_recover(&entry, "client history");

        if let Some(decoy) = &history.decoy {
            return Arc::clone(decoy);
        }

        debug!("Binding decoy instance to {}", identity);
        let decoy = factory.create();
        history.decoy = Some(Arc::clone(&decoy));
        decoy
    }

    /// Note which backend answered the client's latest request
    pub fn record_outcome(&self, identity: &ClientIdentity, route: Route) {
        let Some(entry) = self.existing(identity) else {
            return;
        };

        let mut history = lock_or_recover(&entry, "client history");
        match route {
            Route::Authoritative => history.authoritative_served += 1,
            Route::Decoy => history.decoys_served += 1,
        }
    }

    pub fn first_seen(&self, identity: &ClientIdentity) -> Option<Duration> {
        let entry = self.existing(identity)?;
        let history = lock_or_recover(&entry, "client history");
        Some(history.first_seen)
    }

    pub fn summary(&self, identity: &ClientIdentity) -> Option<ClientSummary> {
        let entry = self.existing(identity)?;
        let mut history = lock_or_recover(&entry, "client history");
        history.evict(self.clock.now(), self.window);

        Some(ClientSummary {
            first_seen_secs: history.first_seen.as_secs_f64(),
            requests_in_window: history.records.len(),
            authoritative_served: history.authoritative_served,
            decoys_served: history.decoys_served,
            decoy_bound: history.decoy.is_some(),
        })
    }

    /// Number of clients ever seen. Entries are never dropped.
    pub fn client_count(&self) -> usize {
        read_lock_or_recover(&self.clients, "client map").len()
    }
}
