//! Session wiring: one store, its URL writer, the synchronizer, the
//! address panel and the directions view, handed out as a `PlannerHandle`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{PlannerConfig, Timings};
use crate::directions::{Directions, DirectionsDeriver};
use crate::entry::AddressEntry;
use crate::geo::Coordinate;
use crate::geocode::GeocodeBridge;
use crate::highlight::{HighlightState, SegmentHighlighter};
use crate::nominatim::NominatimClient;
use crate::osrm::OsrmClient;
use crate::route::{RouteResult, RoutingFailureKind};
use crate::store::{Waypoint, WaypointStore};
use crate::sync::{Applied, EngineEvent, RouteSynchronizer, SyncEvent, SyncOptions};
use crate::traits::{GeocodingService, RouteEngine};
use crate::url_codec::{self, LocaleSettings, ViewState};
use crate::view::{ViewCommand, Viewport};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub profile: String,
    pub timings: Timings,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            profile: "driving".to_string(),
            timings: Timings::default(),
        }
    }
}

/// Last routing failure, shown as a non-blocking notice.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingNotice {
    pub kind: RoutingFailureKind,
    pub message: String,
}

struct ShareState {
    query: String,
    view: Option<ViewState>,
    settings: LocaleSettings,
}

impl ShareState {
    fn rewrite(&mut self, waypoints: &[Waypoint]) {
        self.query = url_codec::encode(&self.query, waypoints, self.view.as_ref(), &self.settings);
    }
}

#[derive(Default)]
struct Outputs {
    directions: Option<Directions>,
    notice: Option<RoutingNotice>,
    views: Vec<ViewCommand>,
}

pub struct PlannerSession<E, G> {
    engine: E,
    geocoder: G,
    options: SessionOptions,
}

impl PlannerSession<OsrmClient, NominatimClient> {
    pub fn from_config(config: &PlannerConfig) -> Result<Self, reqwest::Error> {
        let engine = OsrmClient::new(config.osrm.clone())?;
        let geocoder = NominatimClient::new(config.nominatim.clone())?;
        Ok(Self::new(engine, geocoder).with_options(SessionOptions {
            profile: config.osrm.profile.clone(),
            timings: config.timings,
        }))
    }
}

impl<E, G> PlannerSession<E, G>
where
    E: RouteEngine + 'static,
    G: GeocodingService + 'static,
{
    pub fn new(engine: E, geocoder: G) -> Self {
        Self {
            engine,
            geocoder,
            options: SessionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Restores the state encoded in `query` and wires everything to the
    /// store. Nothing is routed until the first `PlannerHandle::pump`.
    ///
    /// A host restoring a saved camera should call `set_viewport` before
    /// that first pump so the view policy sees it.
    pub async fn start(self, query: &str) -> PlannerHandle<E, G> {
        let timings = self.options.timings;
        let decoded = url_codec::decode(query);
        let bridge = Arc::new(GeocodeBridge::new(self.geocoder, timings));
        let store = WaypointStore::new();

        if !decoded.coordinates.is_empty() {
            let names = reverse_names(&bridge, &decoded.coordinates).await;
            let mut names = names.into_iter();
            let waypoints = decoded.waypoints_with(|coordinate| {
                names.next().unwrap_or_else(|| coordinate.to_string())
            });
            info!(waypoints = decoded.coordinates.len(), "restored waypoints from share query");
            store.replace(waypoints);
        }

        let share = Arc::new(Mutex::new(ShareState {
            query: query.trim_start_matches('?').to_string(),
            view: decoded.view,
            settings: decoded.settings.clone(),
        }));
        let writer = share.clone();
        store.subscribe(move |snapshot| writer.lock().rewrite(&snapshot.waypoints));

        let sync = RouteSynchronizer::attach(
            store.clone(),
            Arc::new(self.engine),
            SyncOptions {
                profile: self.options.profile,
                alternative: decoded.settings.alternative,
                settle: timings.settle,
            },
        );

        let deriver = Arc::new(Mutex::new(DirectionsDeriver::default()));
        deriver.lock().set_language(decoded.settings.language.clone());
        let highlighter = Arc::new(Mutex::new(SegmentHighlighter::new()));
        let outputs = Arc::new(Mutex::new(Outputs::default()));

        {
            let deriver = deriver.clone();
            let highlighter = highlighter.clone();
            let outputs = outputs.clone();
            sync.subscribe(move |event| match event {
                SyncEvent::View(command) => outputs.lock().views.push(*command),
                SyncEvent::RouteFound { route, .. } => {
                    let directions = deriver.lock().derive(route);
                    highlighter.lock().deselect();
                    let mut outputs = outputs.lock();
                    outputs.directions = Some(directions);
                    outputs.notice = None;
                }
                SyncEvent::RoutingFailed { kind, message, .. } => {
                    outputs.lock().notice = Some(RoutingNotice {
                        kind: *kind,
                        message: message.clone(),
                    });
                }
                SyncEvent::RouteCleared => {
                    highlighter.lock().deselect();
                    outputs.lock().directions = None;
                }
                _ => {}
            });
        }

        let entry = AddressEntry::new(store.clone(), bridge.clone(), timings);

        PlannerHandle {
            store,
            sync,
            bridge,
            entry,
            share,
            deriver,
            highlighter,
            outputs,
            initial_view: decoded.view,
        }
    }
}

/// Looks up every coordinate concurrently, keeping URL order.
async fn reverse_names<G>(bridge: &Arc<GeocodeBridge<G>>, coordinates: &[Coordinate]) -> Vec<String>
where
    G: GeocodingService + 'static,
{
    let mut lookups = JoinSet::new();
    for (index, coordinate) in coordinates.iter().copied().enumerate() {
        let bridge = bridge.clone();
        lookups.spawn(async move { (index, bridge.reverse_geocode(coordinate).await) });
    }

    let mut names: Vec<String> = coordinates.iter().map(ToString::to_string).collect();
    while let Some(joined) = lookups.join_next().await {
        match joined {
            Ok((index, name)) => {
                if let Some(slot) = names.get_mut(index) {
                    *slot = name;
                }
            }
            Err(err) => warn!(error = %err, "reverse lookup task failed"),
        }
    }
    names
}

/// Explicit handle on a running session.
pub struct PlannerHandle<E, G> {
    store: WaypointStore,
    sync: RouteSynchronizer<E>,
    bridge: Arc<GeocodeBridge<G>>,
    entry: AddressEntry<G>,
    share: Arc<Mutex<ShareState>>,
    deriver: Arc<Mutex<DirectionsDeriver>>,
    highlighter: Arc<Mutex<SegmentHighlighter>>,
    outputs: Arc<Mutex<Outputs>>,
    initial_view: Option<ViewState>,
}

impl<E, G> PlannerHandle<E, G>
where
    E: RouteEngine + 'static,
    G: GeocodingService + 'static,
{
    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    pub fn synchronizer(&self) -> &RouteSynchronizer<E> {
        &self.sync
    }

    pub fn entry(&self) -> &AddressEntry<G> {
        &self.entry
    }

    pub fn geocoder(&self) -> &GeocodeBridge<G> {
        &self.bridge
    }

    /// Camera restored from the share query, if it carried one.
    pub fn initial_view(&self) -> Option<ViewState> {
        self.initial_view
    }

    /// Current share query, without a leading `?`.
    pub fn share_query(&self) -> String {
        self.share.lock().query.clone()
    }

    pub fn settings(&self) -> LocaleSettings {
        self.share.lock().settings.clone()
    }

    pub fn route(&self) -> Option<Arc<RouteResult>> {
        self.sync.route()
    }

    /// `None` as soon as the store is cleared, even before the next pump.
    pub fn directions(&self) -> Option<Directions> {
        self.sync.route()?;
        self.outputs.lock().directions.clone()
    }

    pub fn notice(&self) -> Option<RoutingNotice> {
        self.outputs.lock().notice.clone()
    }

    /// Camera moves decided since the last call, oldest first.
    pub fn take_view_commands(&self) -> Vec<ViewCommand> {
        std::mem::take(&mut self.outputs.lock().views)
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: FnMut(&SyncEvent) + Send + 'static,
    {
        self.sync.subscribe(listener);
    }

    /// Feeds queued store changes to the synchronizer.
    pub async fn pump(&self) -> usize {
        self.sync.pump().await
    }

    /// Engine-originated edit: marker drag, marker click or map click. A
    /// placed waypoint is renamed once its reverse lookup returns.
    pub async fn engine_event(&self, event: EngineEvent) -> Applied {
        let applied = self.sync.apply_engine_event(event);
        if let Applied::Placed(slots) = &applied {
            for slot in slots {
                self.rename_slot(*slot).await;
            }
        }
        applied
    }

    async fn rename_slot(&self, slot: usize) {
        let placed = self.store.get().get(slot).and_then(|waypoint| waypoint.coordinate);
        let Some(coordinate) = placed else {
            return;
        };
        let name = self.bridge.reverse_geocode(coordinate).await;
        if name == coordinate.to_string() {
            return;
        }

        let unchanged = self
            .store
            .get()
            .get(slot)
            .and_then(|waypoint| waypoint.coordinate)
            .is_some_and(|current| current.same_position(&coordinate));
        if unchanged {
            self.store.update_at(slot, Waypoint::resolved(coordinate, name));
        } else {
            debug!(slot, "waypoint moved again before its name arrived");
        }
    }

    pub fn highlight(&self, step: usize) -> Option<ViewCommand> {
        let route = self.sync.route()?;
        let command = self.highlighter.lock().select(step, &route);
        if let Some(command) = command {
            self.outputs.lock().views.push(command);
        }
        command
    }

    pub fn deselect(&self) {
        self.highlighter.lock().deselect();
    }

    pub fn highlight_state(&self) -> HighlightState {
        self.highlighter.lock().state().clone()
    }

    /// Records the camera the host currently shows and persists it in the
    /// share query.
    pub fn set_viewport(&self, viewport: Viewport) {
        self.sync.set_viewport(viewport);
        let mut share = self.share.lock();
        share.view = Some(ViewState::new(viewport.center, viewport.zoom));
        share.rewrite(&self.store.get());
    }

    pub fn set_language(&self, language: &str) {
        {
            let mut deriver = self.deriver.lock();
            deriver.set_language(language);
            if let Some(route) = self.sync.route() {
                self.outputs.lock().directions = Some(deriver.derive(&route));
            }
        }
        let mut share = self.share.lock();
        share.settings.language = language.to_string();
        share.rewrite(&self.store.get());
    }

    pub async fn set_alternative(&self, alternative: usize) {
        {
            let mut share = self.share.lock();
            share.settings.alternative = alternative;
            share.rewrite(&self.store.get());
        }
        self.sync.set_alternative(alternative);
        self.sync.refresh().await;
    }

    pub fn set_service(&self, service: &str) {
        let mut share = self.share.lock();
        share.settings.service = service.to_string();
        share.rewrite(&self.store.get());
    }
}
