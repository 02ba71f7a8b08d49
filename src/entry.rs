//! Address entry panel state: drafts, suggestion lists, keyboard selection
//! and the blur grace period.
//!
//! Typing only changes the local draft. The store is written when a
//! suggestion is accepted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::Timings;
use crate::geocode::{GeocodeBridge, GeocodeSuggestion, SearchDebouncer, SearchOutcome};
use crate::store::{MIN_SLOTS, Waypoint, WaypointStore};
use crate::traits::GeocodingService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

#[derive(Debug, Default)]
struct EntryState {
    drafts: HashMap<usize, String>,
    suggestions: HashMap<usize, Vec<GeocodeSuggestion>>,
    highlighted: HashMap<usize, usize>,
    active: Option<usize>,
    focus_epoch: u64,
}

impl EntryState {
    fn dismiss(&mut self, slot: usize) {
        self.suggestions.remove(&slot);
        self.highlighted.remove(&slot);
    }

    fn reset(&mut self) {
        self.drafts.clear();
        self.suggestions.clear();
        self.highlighted.clear();
        self.active = None;
    }
}

pub struct AddressEntry<G> {
    store: WaypointStore,
    search: SearchDebouncer<G>,
    blur_grace: Duration,
    state: Mutex<EntryState>,
}

impl<G: GeocodingService> AddressEntry<G> {
    pub fn new(store: WaypointStore, bridge: Arc<GeocodeBridge<G>>, timings: Timings) -> Self {
        Self {
            store,
            search: SearchDebouncer::new(bridge),
            blur_grace: timings.blur_grace,
            state: Mutex::new(EntryState::default()),
        }
    }

    /// What the input for `slot` shows: the draft while typing, otherwise
    /// the stored display text.
    pub fn text(&self, slot: usize) -> String {
        if let Some(draft) = self.state.lock().drafts.get(&slot) {
            return draft.clone();
        }
        self.store
            .get()
            .get(slot)
            .map(|waypoint| waypoint.display_text.clone())
            .unwrap_or_default()
    }

    pub fn suggestions(&self, slot: usize) -> Vec<GeocodeSuggestion> {
        self.state
            .lock()
            .suggestions
            .get(&slot)
            .cloned()
            .unwrap_or_default()
    }

    pub fn highlighted(&self, slot: usize) -> Option<usize> {
        self.state.lock().highlighted.get(&slot).copied()
    }

    pub fn active(&self) -> Option<usize> {
        self.state.lock().active
    }

    /// Placeholder shown in an empty input.
    pub fn placeholder(&self, slot: usize) -> &'static str {
        let len = self.store.len().max(MIN_SLOTS);
        match slot {
            0 => "Choose starting point",
            slot if slot + 1 == len => "Choose destination",
            _ => "Add waypoint",
        }
    }

    /// Records a keystroke and waits out the debounce. Returns `true` when
    /// the slot's suggestions changed.
    pub async fn input(&self, slot: usize, text: &str) -> bool {
        {
            let mut state = self.state.lock();
            state.drafts.insert(slot, text.to_string());
            if text.trim().is_empty() {
                state.dismiss(slot);
            }
        }

        match self.search.input(slot, text).await {
            SearchOutcome::Suggestions(suggestions) => {
                let mut state = self.state.lock();
                state.highlighted.remove(&slot);
                state.suggestions.insert(slot, suggestions);
                true
            }
            SearchOutcome::Cleared => true,
            SearchOutcome::Superseded | SearchOutcome::Unchanged => false,
        }
    }

    pub fn focus(&self, slot: usize) {
        let mut state = self.state.lock();
        state.active = Some(slot);
        state.focus_epoch += 1;
    }

    /// Hides the slot's suggestions after the grace period, unless focus
    /// moved in the meantime. The grace leaves room for a click on a
    /// suggestion to land.
    pub async fn blur(&self, slot: usize) {
        let epoch = self.state.lock().focus_epoch;
        tokio::time::sleep(self.blur_grace).await;

        let mut state = self.state.lock();
        if state.focus_epoch == epoch && state.active == Some(slot) {
            state.active = None;
            state.dismiss(slot);
        }
    }

    /// Keyboard navigation within the suggestion list. Returns `true` when
    /// the key was consumed.
    pub fn key(&self, slot: usize, key: EntryKey) -> bool {
        if key == EntryKey::Enter {
            let pick = {
                let state = self.state.lock();
                state.highlighted.get(&slot).copied().unwrap_or(0)
            };
            return self.accept(slot, pick);
        }

        let mut state = self.state.lock();
        let count = state.suggestions.get(&slot).map_or(0, Vec::len);
        if count == 0 {
            return false;
        }
        let current = state.highlighted.get(&slot).copied();
        match key {
            EntryKey::ArrowDown => {
                let next = current.map_or(0, |index| (index + 1).min(count - 1));
                state.highlighted.insert(slot, next);
            }
            EntryKey::ArrowUp => match current {
                Some(0) | None => {
                    state.highlighted.remove(&slot);
                }
                Some(index) => {
                    state.highlighted.insert(slot, index - 1);
                }
            },
            EntryKey::Escape => state.dismiss(slot),
            EntryKey::Enter => {}
        }
        true
    }

    /// Writes suggestion `index` of `slot` into the store.
    pub fn accept(&self, slot: usize, index: usize) -> bool {
        let suggestion = {
            let mut state = self.state.lock();
            let Some(suggestion) = state
                .suggestions
                .get(&slot)
                .and_then(|suggestions| suggestions.get(index))
                .cloned()
            else {
                return false;
            };
            state.dismiss(slot);
            state.drafts.remove(&slot);
            state.active = None;
            suggestion
        };

        debug!(slot, place = %suggestion.display_text, "accepting suggestion");
        self.store.update_at(
            slot,
            Waypoint::resolved(suggestion.coordinate, suggestion.display_text),
        );
        true
    }

    /// Inserts an empty via slot before the destination.
    pub fn add_slot(&self) {
        self.state.lock().reset();
        match self.store.len().checked_sub(1) {
            Some(destination) => self.store.insert_at(destination, Waypoint::empty()),
            None => self.store.append(Waypoint::empty()),
        }
    }

    /// Origin and destination cannot be removed from a two-slot list.
    pub fn remove_slot(&self, slot: usize) -> bool {
        let len = self.store.len();
        if len <= MIN_SLOTS || slot >= len {
            return false;
        }
        self.state.lock().reset();
        self.store.remove_at(slot);
        true
    }

    pub fn clear_all(&self) {
        self.state.lock().reset();
        self.store.clear();
    }
}
