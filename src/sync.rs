//! Route Synchronizer: keeps the Route Engine in step with the Waypoint
//! Store, and feeds the engine's own waypoint edits back through a guard.
//!
//! Every store snapshot becomes a push with a fresh generation. An engine
//! event is written back into the store only when
//!
//! * the settle window of the latest push has elapsed,
//! * the event was produced against the latest push generation, and
//! * applying it would actually change the store.
//!
//! The last check turns a late echo of our own push into a no-op, so a slow
//! engine cannot bounce a sequence back into the store.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::geo::Coordinate;
use crate::route::{RouteRequest, RouteResult, RoutingFailureKind};
use crate::store::{Mutation, Waypoint, WaypointSnapshot, WaypointStore};
use crate::traits::RouteEngine;
use crate::view::{ViewCommand, Viewport, plan_waypoint_view};

/// Notifications delivered to synchronizer subscribers, in order.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A store sequence was handed to the engine for display.
    WaypointsPushed {
        generation: u64,
        waypoints: Arc<[Waypoint]>,
    },
    View(ViewCommand),
    RoutingStarted {
        generation: u64,
    },
    RouteFound {
        generation: u64,
        route: Arc<RouteResult>,
    },
    /// The previous route, if any, stays displayed.
    RoutingFailed {
        generation: u64,
        kind: RoutingFailureKind,
        message: String,
    },
    RouteCleared,
    /// What the engine reports it is showing. Display only.
    EngineWaypoints {
        coordinates: Vec<Coordinate>,
    },
}

/// User edits made on the engine's own surface. `generation` is the push
/// the engine was showing when the edit happened.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine's full list of routed coordinates.
    WaypointsChanged {
        generation: u64,
        coordinates: Vec<Coordinate>,
    },
    /// `index` counts resolved waypoints only, as the engine sees them.
    MarkerDragged {
        generation: u64,
        index: usize,
        coordinate: Coordinate,
    },
    MarkerClicked {
        generation: u64,
        index: usize,
    },
    MapClicked {
        generation: u64,
        coordinate: Coordinate,
    },
}

impl EngineEvent {
    pub fn generation(&self) -> u64 {
        match self {
            EngineEvent::WaypointsChanged { generation, .. }
            | EngineEvent::MarkerDragged { generation, .. }
            | EngineEvent::MarkerClicked { generation, .. }
            | EngineEvent::MapClicked { generation, .. } => *generation,
        }
    }
}

/// What an engine event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Blocked by the guard, or nothing to change.
    Ignored,
    /// These slots now hold a new coordinate labelled with its own digits.
    Placed(Vec<usize>),
    Removed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocked {
    /// The latest push has not settled yet.
    Settling,
    /// A newer push was issued after the event was produced.
    StaleGeneration { event: u64, current: u64 },
}

/// Re-entrancy guard around engine pushes.
#[derive(Debug)]
pub struct ApplyGuard {
    settle: Duration,
    generation: u64,
    settle_until: Option<Instant>,
}

impl ApplyGuard {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            generation: 0,
            settle_until: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Marks the start of a push and returns its generation.
    pub fn begin_push(&mut self, now: Instant) -> u64 {
        self.generation += 1;
        self.settle_until = Some(now + self.settle);
        self.generation
    }

    pub fn is_applying(&self, now: Instant) -> bool {
        self.settle_until.is_some_and(|until| now < until)
    }

    pub fn admit(&self, event_generation: u64, now: Instant) -> Result<(), Blocked> {
        if self.is_applying(now) {
            return Err(Blocked::Settling);
        }
        if event_generation != self.generation {
            return Err(Blocked::StaleGeneration {
                event: event_generation,
                current: self.generation,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub profile: String,
    pub alternative: usize,
    pub settle: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            profile: "driving".to_string(),
            alternative: 0,
            settle: Duration::from_millis(300),
        }
    }
}

type SyncListener = Box<dyn FnMut(&SyncEvent) + Send>;

struct SyncState {
    route: Option<Arc<RouteResult>>,
    viewport: Viewport,
    alternative: usize,
}

pub struct RouteSynchronizer<E> {
    engine: Arc<E>,
    store: WaypointStore,
    profile: String,
    guard: Mutex<ApplyGuard>,
    state: Arc<Mutex<SyncState>>,
    snapshots: Mutex<mpsc::UnboundedReceiver<WaypointSnapshot>>,
    listeners: Mutex<Vec<SyncListener>>,
}

impl<E: RouteEngine> RouteSynchronizer<E> {
    /// Subscribes to `store`. The current sequence is queued right away and
    /// pushed on the first `pump`.
    ///
    /// A `clear` drops the route as soon as the store commits it;
    /// `RouteCleared` is emitted on the next `pump`.
    pub fn attach(store: WaypointStore, engine: Arc<E>, options: SyncOptions) -> Self {
        let state = Arc::new(Mutex::new(SyncState {
            route: None,
            viewport: Viewport::default(),
            alternative: options.alternative,
        }));

        let (tx, rx) = mpsc::unbounded_channel();
        let cleared = state.clone();
        store.subscribe(move |snapshot: &WaypointSnapshot| {
            if snapshot.mutation == Mutation::Clear {
                cleared.lock().route = None;
            }
            // Closed only when the synchronizer is gone.
            let _ = tx.send(snapshot.clone());
        });

        Self {
            engine,
            store,
            profile: options.profile,
            guard: Mutex::new(ApplyGuard::new(options.settle)),
            state,
            snapshots: Mutex::new(rx),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: FnMut(&SyncEvent) + Send + 'static,
    {
        self.listeners.lock().push(Box::new(listener));
    }

    pub fn route(&self) -> Option<Arc<RouteResult>> {
        self.state.lock().route.clone()
    }

    pub fn generation(&self) -> u64 {
        self.guard.lock().generation()
    }

    pub fn is_applying(&self) -> bool {
        self.guard.lock().is_applying(Instant::now())
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.state.lock().viewport = viewport;
    }

    /// Takes effect on the next push; call `refresh` to re-route now.
    pub fn set_alternative(&self, alternative: usize) {
        self.state.lock().alternative = alternative;
    }

    /// Processes every store snapshot queued so far, in order. Returns how
    /// many were handled.
    pub async fn pump(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = self.snapshots.lock().try_recv();
            match next {
                Ok(snapshot) => {
                    self.handle_snapshot(snapshot).await;
                    handled += 1;
                }
                Err(_) => return handled,
            }
        }
    }

    /// Pushes the current store sequence again.
    pub async fn refresh(&self) {
        let snapshot = self.store.snapshot();
        self.handle_snapshot(snapshot).await;
    }

    async fn handle_snapshot(&self, snapshot: WaypointSnapshot) {
        if snapshot.mutation == Mutation::Clear {
            self.state.lock().route = None;
            self.emit(&SyncEvent::RouteCleared);
        }

        if snapshot.version != self.store.version() {
            debug!(version = snapshot.version, "skipping superseded waypoint snapshot");
            return;
        }

        let generation = self.guard.lock().begin_push(Instant::now());
        self.emit(&SyncEvent::WaypointsPushed {
            generation,
            waypoints: snapshot.waypoints.clone(),
        });

        let resolved = snapshot.resolved();
        let (viewport, alternative) = {
            let state = self.state.lock();
            (state.viewport, state.alternative)
        };
        if let Some(command) = plan_waypoint_view(&resolved, &viewport) {
            self.emit(&SyncEvent::View(command));
        }

        if resolved.len() < 2 {
            debug!(resolved = resolved.len(), "not enough resolved waypoints to route");
            return;
        }

        let request = RouteRequest {
            coordinates: resolved,
            profile: self.profile.clone(),
            alternative,
        };
        self.emit(&SyncEvent::RoutingStarted { generation });
        let outcome = self.engine.route(&request).await;

        if snapshot.version != self.store.version() {
            debug!(
                version = snapshot.version,
                current = self.store.version(),
                "dropping route result for a superseded sequence"
            );
            return;
        }
        let latest = self.guard.lock().generation();
        if generation != latest {
            debug!(generation, latest, "dropping route result for a superseded push");
            return;
        }

        match outcome {
            Ok(route) => {
                let route = Arc::new(route);
                info!(
                    generation,
                    distance = route.summary.total_distance,
                    duration = route.summary.total_duration,
                    "route found"
                );
                self.state.lock().route = Some(route.clone());
                self.emit(&SyncEvent::RouteFound { generation, route });
            }
            Err(err) => {
                warn!(generation, kind = err.kind().as_str(), error = %err, "routing failed");
                self.emit(&SyncEvent::RoutingFailed {
                    generation,
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        }
    }

    /// Applies an engine-originated edit through the guard.
    pub fn apply_engine_event(&self, event: EngineEvent) -> Applied {
        if let EngineEvent::WaypointsChanged { coordinates, .. } = &event {
            self.emit(&SyncEvent::EngineWaypoints {
                coordinates: coordinates.clone(),
            });
        }

        if let Err(blocked) = self.guard.lock().admit(event.generation(), Instant::now()) {
            debug!(?blocked, ?event, "engine event not written back");
            return Applied::Ignored;
        }

        let current = self.store.get();
        let resolved_slots: Vec<usize> = current
            .iter()
            .enumerate()
            .filter(|(_, waypoint)| waypoint.is_resolved())
            .map(|(slot, _)| slot)
            .collect();

        match event {
            EngineEvent::WaypointsChanged { coordinates, .. } => {
                if coordinates.len() != resolved_slots.len() {
                    debug!(
                        engine = coordinates.len(),
                        store = resolved_slots.len(),
                        "engine waypoint count differs from store, ignoring"
                    );
                    return Applied::Ignored;
                }
                let moved: Vec<(usize, Coordinate)> = resolved_slots
                    .iter()
                    .zip(coordinates)
                    .filter(|(slot, coordinate)| !is_at(&current[**slot], coordinate))
                    .map(|(slot, coordinate)| (*slot, coordinate))
                    .collect();
                for (slot, coordinate) in &moved {
                    self.store
                        .update_at(*slot, Waypoint::resolved(*coordinate, coordinate.to_string()));
                }
                if moved.is_empty() {
                    Applied::Ignored
                } else {
                    Applied::Placed(moved.into_iter().map(|(slot, _)| slot).collect())
                }
            }
            EngineEvent::MarkerDragged {
                index, coordinate, ..
            } => {
                let Some(&slot) = resolved_slots.get(index) else {
                    debug!(index, "dragged marker has no matching waypoint");
                    return Applied::Ignored;
                };
                if is_at(&current[slot], &coordinate) {
                    return Applied::Ignored;
                }
                self.store
                    .update_at(slot, Waypoint::resolved(coordinate, coordinate.to_string()));
                Applied::Placed(vec![slot])
            }
            EngineEvent::MarkerClicked { index, .. } => {
                let Some(&slot) = resolved_slots.get(index) else {
                    debug!(index, "clicked marker has no matching waypoint");
                    return Applied::Ignored;
                };
                self.store.remove_at(slot);
                Applied::Removed(slot)
            }
            EngineEvent::MapClicked { coordinate, .. } => {
                let slot = current
                    .iter()
                    .position(|waypoint| !waypoint.is_resolved())
                    .or_else(|| current.len().checked_sub(1));
                let Some(slot) = slot else {
                    debug!("map click on an empty waypoint list, ignoring");
                    return Applied::Ignored;
                };
                if is_at(&current[slot], &coordinate) {
                    return Applied::Ignored;
                }
                self.store
                    .update_at(slot, Waypoint::resolved(coordinate, coordinate.to_string()));
                Applied::Placed(vec![slot])
            }
        }
    }

    fn emit(&self, event: &SyncEvent) {
        // Listeners run unlocked so they may subscribe further listeners.
        let mut listeners = std::mem::take(&mut *self.listeners.lock());
        for listener in listeners.iter_mut() {
            listener(event);
        }
        let mut registered = self.listeners.lock();
        listeners.append(&mut registered);
        *registered = listeners;
    }
}

fn is_at(waypoint: &Waypoint, coordinate: &Coordinate) -> bool {
    waypoint
        .coordinate
        .is_some_and(|current| current.same_position(coordinate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_guard_settles_after_window() {
        let mut guard = ApplyGuard::new(Duration::from_millis(300));
        let generation = guard.begin_push(Instant::now());
        assert_eq!(guard.admit(generation, Instant::now()), Err(Blocked::Settling));

        tokio::time::advance(Duration::from_millis(301)).await;
        assert_eq!(guard.admit(generation, Instant::now()), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_rejects_older_generation() {
        let mut guard = ApplyGuard::new(Duration::from_millis(300));
        let first = guard.begin_push(Instant::now());
        let second = guard.begin_push(Instant::now());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            guard.admit(first, Instant::now()),
            Err(Blocked::StaleGeneration {
                event: first,
                current: second
            })
        );
    }

    #[test]
    fn test_event_generation() {
        let event = EngineEvent::MarkerClicked {
            generation: 7,
            index: 0,
        };
        assert_eq!(event.generation(), 7);
    }
}
