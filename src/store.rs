//! The stack store: an ordered item sequence plus settings, persisted
//! through a [`KvStore`] after every change.
//!
//! All mutation rules live in [`crate::ops`]; this type owns the state,
//! the current selection, the clock, and the optional sweep timer.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::io::kv::{KvError, KvStore, SETTINGS_KEY, STACK_KEY};
use crate::io::sweeper::SweepTicker;
use crate::model::item::{Item, ItemDraft, ItemPatch};
use crate::model::settings::{Settings, SettingsPatch};
use crate::ops::expiry;
use crate::ops::stack_ops::{self, LookupError};
use crate::util::clock::{Clock, SystemClock};

/// Error type for store persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Kv(#[from] KvError),
    #[error("could not encode {key}: {source}")]
    Encode {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("could not start sweeper: {0}")]
    Sweeper(std::io::Error),
}

/// The todo stack: items bottom first, its settings and the selection.
pub struct StackStore<K: KvStore> {
    kv: K,
    items: Vec<Item>,
    settings: Settings,
    selected: Option<String>,
    clock: Box<dyn Clock>,
    sweeper: Option<SweepTicker>,
}

impl<K: KvStore> StackStore<K> {
    /// Load the stack and settings from `kv`, using wall-clock time.
    ///
    /// `default_settings` applies when no settings record is stored.
    pub fn open(kv: K, default_settings: Settings) -> Result<Self, StoreError> {
        Self::open_with_clock(kv, default_settings, Box::new(SystemClock))
    }

    pub fn open_with_clock(
        mut kv: K,
        default_settings: Settings,
        clock: Box<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let mut items: Vec<Item> = load_record(&mut kv, STACK_KEY)?.unwrap_or_default();
        let settings = usable(load_record(&mut kv, SETTINGS_KEY)?.unwrap_or(default_settings));

        // Only the first flagged item keeps its selection.
        let selected = stack_ops::selected_id(&items).map(str::to_string);
        if let Some(id) = selected.as_deref() {
            for item in items.iter_mut() {
                item.selected = item.id == id;
            }
        }

        let mut store = StackStore {
            kv,
            items,
            settings,
            selected,
            clock,
            sweeper: None,
        };
        // Catch up on anything that expired while nothing was running.
        store.sweep()?;
        Ok(store)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Items bottom first; the last element is the top.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The selected id, even if its item has since expired.
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected item, or `None` if nothing is selected or the selection
    /// points at an item that is gone.
    pub fn selected_item(&self) -> Option<&Item> {
        self.selected
            .as_deref()
            .and_then(|id| stack_ops::find(&self.items, id))
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        stack_ops::find(&self.items, id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resolve a full id or unique prefix.
    pub fn resolve(&self, prefix: &str) -> Result<String, LookupError> {
        stack_ops::resolve_id(&self.items, prefix)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn time_left(&self, item: &Item) -> TimeDelta {
        expiry::time_left(item, &self.settings, self.now())
    }

    pub fn fraction_left(&self, item: &Item) -> f64 {
        expiry::fraction_left(item, &self.settings, self.now())
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Push a new item on top, evicting from the bottom on overflow.
    /// Returns the new item's id.
    pub fn push(&mut self, draft: ItemDraft) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let item = Item::new(id.clone(), draft, self.now());
        let evicted = stack_ops::push(&mut self.items, item, self.settings.max_items);
        for old in &evicted {
            tracing::info!(id = %old.id, title = %old.title, "evicted from bottom of stack");
        }
        tracing::debug!(%id, len = self.items.len(), "pushed");
        self.save_items()?;
        Ok(id)
    }

    /// Remove the top item and clear the selection.
    pub fn pop(&mut self) -> Result<Option<Item>, StoreError> {
        let had_selection = self.selected.take().is_some();
        let popped = stack_ops::pop(&mut self.items);
        if popped.is_some() || had_selection {
            self.save_items()?;
        }
        Ok(popped)
    }

    /// Move an item one place toward the top. Returns false on a no-op.
    pub fn move_up(&mut self, id: &str) -> Result<bool, StoreError> {
        let moved = stack_ops::move_up(&mut self.items, id);
        if moved {
            self.save_items()?;
        }
        Ok(moved)
    }

    /// Move an item one place toward the bottom. Returns false on a no-op.
    pub fn move_down(&mut self, id: &str) -> Result<bool, StoreError> {
        let moved = stack_ops::move_down(&mut self.items, id);
        if moved {
            self.save_items()?;
        }
        Ok(moved)
    }

    pub fn move_selected_up(&mut self) -> Result<bool, StoreError> {
        match self.selected.clone() {
            Some(id) => self.move_up(&id),
            None => Ok(false),
        }
    }

    pub fn move_selected_down(&mut self) -> Result<bool, StoreError> {
        match self.selected.clone() {
            Some(id) => self.move_down(&id),
            None => Ok(false),
        }
    }

    /// Remove an item by id and clear the selection.
    pub fn delete(&mut self, id: &str) -> Result<Option<Item>, StoreError> {
        let had_selection = self.selected.take().is_some();
        let removed = stack_ops::delete(&mut self.items, id);
        if removed.is_some() || had_selection {
            self.save_items()?;
        }
        Ok(removed)
    }

    pub fn delete_selected(&mut self) -> Result<Option<Item>, StoreError> {
        match self.selected.clone() {
            Some(id) => self.delete(&id),
            None => Ok(None),
        }
    }

    /// Merge a partial update into an item. Returns false on a no-op.
    pub fn update(&mut self, id: &str, patch: ItemPatch) -> Result<bool, StoreError> {
        let changed = stack_ops::update(&mut self.items, id, patch);
        if changed {
            self.save_items()?;
        }
        Ok(changed)
    }

    /// Select `id`, or deselect it if it is already selected.
    /// Returns the new selection.
    pub fn toggle_selection(&mut self, id: &str) -> Result<Option<&str>, StoreError> {
        let next = stack_ops::toggle_selection(&mut self.items, self.selected.as_deref(), id);
        if next != self.selected {
            self.selected = next;
            self.save_items()?;
        }
        Ok(self.selected.as_deref())
    }

    /// Merge partial settings. Lowering `max_items` does not evict.
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<bool, StoreError> {
        let changed = self.settings.apply(patch);
        if changed {
            if self.items.len() > self.settings.max_items {
                tracing::info!(
                    len = self.items.len(),
                    max_items = self.settings.max_items,
                    "stack is over the new bound until the next push"
                );
            }
            self.save_settings()?;
        }
        Ok(changed)
    }

    /// Remove expired items now. Returns what was removed.
    pub fn sweep(&mut self) -> Result<Vec<Item>, StoreError> {
        let now = self.now();
        let expired = expiry::sweep(&mut self.items, &self.settings, now);
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired items removed");
            self.save_items()?;
        }
        Ok(expired)
    }

    /// Re-read both records, e.g. after another process changed them.
    /// The in-memory selection survives if its item still exists.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        let mut items: Vec<Item> = load_record(&mut self.kv, STACK_KEY)?.unwrap_or_default();
        if let Some(settings) = load_record(&mut self.kv, SETTINGS_KEY)? {
            self.settings = usable(settings);
        }
        let selected = self
            .selected
            .clone()
            .filter(|id| stack_ops::find(&items, id).is_some())
            .or_else(|| stack_ops::selected_id(&items).map(str::to_string));
        for item in items.iter_mut() {
            item.selected = selected.as_deref() == Some(item.id.as_str());
        }
        self.items = items;
        self.selected = selected;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sweep timer
    // -----------------------------------------------------------------------

    /// Start the periodic sweep. Replaces a running timer.
    pub fn start_sweeper(&mut self, interval: Duration) -> Result<(), StoreError> {
        self.stop_sweeper();
        self.sweeper = Some(SweepTicker::start(interval).map_err(StoreError::Sweeper)?);
        Ok(())
    }

    /// Cancel the periodic sweep, if running.
    pub fn stop_sweeper(&mut self) {
        if let Some(ticker) = self.sweeper.take() {
            ticker.cancel();
        }
    }

    pub fn sweeper_running(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Run one sweep if any ticks arrived since the last call.
    pub fn run_pending_sweeps(&mut self) -> Result<Vec<Item>, StoreError> {
        let due = self.sweeper.as_ref().is_some_and(|t| t.poll() > 0);
        if due { self.sweep() } else { Ok(Vec::new()) }
    }

    /// Block up to `timeout` for the next tick without sweeping, for owners
    /// that must reload or lock before they mutate.
    /// Without a running sweeper this just sleeps and returns false.
    pub fn wait_for_tick(&self, timeout: Duration) -> bool {
        match self.sweeper.as_ref() {
            Some(ticker) => ticker.wait(timeout),
            None => {
                std::thread::sleep(timeout);
                false
            }
        }
    }

    /// Block up to `timeout` for the next tick; sweep if one arrives.
    /// Returns `None` when no tick arrived.
    pub fn wait_for_sweep(&mut self, timeout: Duration) -> Result<Option<Vec<Item>>, StoreError> {
        if self.wait_for_tick(timeout) {
            self.sweep().map(Some)
        } else {
            Ok(None)
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn save_items(&mut self) -> Result<(), StoreError> {
        save_record(&mut self.kv, STACK_KEY, &self.items)
    }

    fn save_settings(&mut self) -> Result<(), StoreError> {
        save_record(&mut self.kv, SETTINGS_KEY, &self.settings)
    }
}

/// Settings as loaded may carry a bound no push could honor.
fn usable(settings: Settings) -> Settings {
    match settings.clamped() {
        Some(clamped) => {
            tracing::warn!(
                max_items = settings.max_items,
                using = clamped.max_items,
                "stored stack bound is out of range"
            );
            clamped
        }
        None => settings,
    }
}

fn load_record<K: KvStore, T: DeserializeOwned>(
    kv: &mut K,
    key: &'static str,
) -> Result<Option<T>, StoreError> {
    let Some(raw) = kv.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            kv.report_unreadable(key, &raw, &e.to_string());
            Ok(None)
        }
    }
}

fn save_record<K: KvStore, T: Serialize + ?Sized>(
    kv: &mut K,
    key: &'static str,
    value: &T,
) -> Result<(), StoreError> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| StoreError::Encode { key, source: e })?;
    kv.set(key, &json)?;
    Ok(())
}
