//! Waypoint Store: the single source of truth for the ordered stop list.
//!
//! Every mutation bumps a version and notifies listeners synchronously, in
//! subscription order, with the full new sequence. A listener subscribed
//! late is handed the current sequence immediately.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::Coordinate;

/// One stop on the route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub coordinate: Option<Coordinate>,
    pub display_text: String,
}

impl Waypoint {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn resolved(coordinate: Coordinate, display_text: impl Into<String>) -> Self {
        Self {
            coordinate: Some(coordinate),
            display_text: display_text.into(),
        }
    }

    /// Free text only; not routable until a coordinate is attached.
    pub fn text(display_text: impl Into<String>) -> Self {
        Self {
            coordinate: None,
            display_text: display_text.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.coordinate.is_some()
    }
}

/// Coordinates of the resolved waypoints, in route order.
pub fn resolved_coordinates(waypoints: &[Waypoint]) -> Vec<Coordinate> {
    waypoints.iter().filter_map(|waypoint| waypoint.coordinate).collect()
}

/// Which operation produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Emitted only to a listener on subscription.
    Initial,
    Replace,
    Append,
    Insert(usize),
    Update(usize),
    Remove(usize),
    Clear,
}

/// Immutable view of the store after one mutation.
#[derive(Debug, Clone)]
pub struct WaypointSnapshot {
    pub version: u64,
    pub mutation: Mutation,
    pub waypoints: Arc<[Waypoint]>,
}

impl WaypointSnapshot {
    pub fn resolved(&self) -> Vec<Coordinate> {
        resolved_coordinates(&self.waypoints)
    }
}

/// Slots a session always shows: origin and destination.
pub const MIN_SLOTS: usize = 2;

type Listener = Box<dyn FnMut(&WaypointSnapshot) + Send>;

struct StoreState {
    waypoints: Arc<[Waypoint]>,
    version: u64,
    pending: VecDeque<WaypointSnapshot>,
    notifying: bool,
}

struct StoreInner {
    state: Mutex<StoreState>,
    listeners: Mutex<Vec<Listener>>,
}

/// Cheap-to-clone handle; clones share the same sequence.
#[derive(Clone)]
pub struct WaypointStore {
    inner: Arc<StoreInner>,
}

impl Default for WaypointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WaypointStore {
    /// A store with the two empty slots every session starts with.
    pub fn new() -> Self {
        Self::with_waypoints(vec![Waypoint::empty(); MIN_SLOTS])
    }

    pub fn with_waypoints(waypoints: Vec<Waypoint>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    waypoints: waypoints.into(),
                    version: 0,
                    pending: VecDeque::new(),
                    notifying: false,
                }),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn get(&self) -> Arc<[Waypoint]> {
        self.inner.state.lock().waypoints.clone()
    }

    pub fn version(&self) -> u64 {
        self.inner.state.lock().version
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> WaypointSnapshot {
        let state = self.inner.state.lock();
        WaypointSnapshot {
            version: state.version,
            mutation: Mutation::Initial,
            waypoints: state.waypoints.clone(),
        }
    }

    /// Registers a listener and immediately replays the current sequence to
    /// it. Listeners must not subscribe from inside a notification.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: FnMut(&WaypointSnapshot) + Send + 'static,
    {
        let mut listener: Listener = Box::new(listener);
        listener(&self.snapshot());
        self.inner.listeners.lock().push(listener);
    }

    pub fn replace(&self, waypoints: Vec<Waypoint>) {
        self.commit(Mutation::Replace, |current| {
            *current = waypoints;
            true
        });
    }

    pub fn append(&self, waypoint: Waypoint) {
        self.commit(Mutation::Append, |current| {
            current.push(waypoint);
            true
        });
    }

    /// `index == len` is out of range; use `append` to add at the end.
    pub fn insert_at(&self, index: usize, waypoint: Waypoint) {
        self.commit(Mutation::Insert(index), |current| {
            if index >= current.len() {
                return false;
            }
            current.insert(index, waypoint);
            true
        });
    }

    pub fn update_at(&self, index: usize, waypoint: Waypoint) {
        self.commit(Mutation::Update(index), |current| {
            match current.get_mut(index) {
                Some(slot) => {
                    *slot = waypoint;
                    true
                }
                None => false,
            }
        });
    }

    /// Removing from a two-slot sequence leaves an empty slot at the end,
    /// so only `clear` takes the store below two slots.
    pub fn remove_at(&self, index: usize) {
        self.commit(Mutation::Remove(index), |current| {
            if index >= current.len() {
                return false;
            }
            let floor = current.len().min(MIN_SLOTS);
            current.remove(index);
            current.resize_with(current.len().max(floor), Waypoint::empty);
            true
        });
    }

    /// Empties the sequence. Route holders observe `Mutation::Clear` and
    /// drop their result.
    pub fn clear(&self) {
        self.commit(Mutation::Clear, |current| {
            current.clear();
            true
        });
    }

    fn commit<F>(&self, mutation: Mutation, apply: F)
    where
        F: FnOnce(&mut Vec<Waypoint>) -> bool,
    {
        {
            let mut state = self.inner.state.lock();
            let mut next = state.waypoints.to_vec();
            if !apply(&mut next) {
                debug!(
                    ?mutation,
                    len = state.waypoints.len(),
                    "waypoint index out of range, ignoring"
                );
                return;
            }
            state.version += 1;
            state.waypoints = next.into();
            let snapshot = WaypointSnapshot {
                version: state.version,
                mutation,
                waypoints: state.waypoints.clone(),
            };
            state.pending.push_back(snapshot);
            if state.notifying {
                // The outer commit delivers it once the current round ends.
                return;
            }
            state.notifying = true;
        }
        self.flush();
    }

    fn flush(&self) {
        loop {
            let snapshot = {
                let mut state = self.inner.state.lock();
                match state.pending.pop_front() {
                    Some(snapshot) => snapshot,
                    None => {
                        state.notifying = false;
                        return;
                    }
                }
            };
            let mut listeners = self.inner.listeners.lock();
            for listener in listeners.iter_mut() {
                listener(&snapshot);
            }
        }
    }
}
