//! State shared between the coordinator and the workers.
//!
//! Everything mutable lives in one [`State`] behind a single mutex. The lock
//! is only held to copy values in or out; record loads, hooks and channel
//! sends happen after it is released.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use vista_core::{HookId, Record, RecordId};
use vista_filter::{FilterSettings, SortSettings};

use crate::hook::PrepareHook;

/// Consistent view of what a worker needs for one package.
#[derive(Clone)]
pub struct Snapshot {
    pub version: u64,
    pub settings: Arc<FilterSettings>,
    pub hooks: Arc<[Arc<dyn PrepareHook>]>,
}

/// A record the coordinator currently shows or may show.
#[derive(Clone)]
pub(crate) struct KnownRecord {
    pub record: Record,
    pub extra: Option<serde_json::Value>,
}

pub(crate) struct State {
    pub settings: Arc<FilterSettings>,
    pub sort: SortSettings,
    /// Current filter epoch; starts at 1.
    pub version: u64,
    /// Packages stamped at or below this version predate a reset.
    pub last_discard_version: u64,

    pub hooks: Vec<(HookId, Arc<dyn PrepareHook>)>,
    pub hook_snapshot: Arc<[Arc<dyn PrepareHook>]>,
    pub next_hook_id: u64,

    pub cache: HashMap<RecordId, bool>,
    pub sent_out: usize,
    pub sent_out_for_readd: usize,
    pub has_match: bool,
    pub has_text_match: bool,

    pub order: Vec<RecordId>,
    pub known: HashMap<RecordId, KnownRecord>,
}

impl State {
    fn new() -> Self {
        Self {
            settings: Arc::new(FilterSettings::default()),
            sort: SortSettings::default(),
            version: 1,
            last_discard_version: 0,
            hooks: Vec::new(),
            hook_snapshot: Arc::from(Vec::new()),
            next_hook_id: 1,
            cache: HashMap::new(),
            sent_out: 0,
            sent_out_for_readd: 0,
            has_match: false,
            has_text_match: false,
            order: Vec::new(),
            known: HashMap::new(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            settings: Arc::clone(&self.settings),
            hooks: Arc::clone(&self.hook_snapshot),
        }
    }

    pub fn needs_prepare(&self) -> bool {
        self.settings.needs_prepare() || !self.hooks.is_empty()
    }

    /// Start a new filter epoch: bump the version and forget every result
    /// computed for the old one. In-flight counters are kept because the old
    /// packages are still out and will be recycled.
    pub fn begin_epoch(&mut self) -> u64 {
        self.version += 1;
        self.cache.clear();
        self.has_match = false;
        self.has_text_match = false;
        self.version
    }

    /// Remember `record`. A known id keeps its extra value and position but
    /// switches to the new handle.
    pub fn remember(&mut self, record: Record) {
        match self.known.entry(record.id()) {
            Entry::Occupied(mut known) => known.get_mut().record = record,
            Entry::Vacant(slot) => {
                self.order.push(record.id());
                slot.insert(KnownRecord {
                    record,
                    extra: None,
                });
            }
        }
    }

    pub fn forget(&mut self, ids: &[RecordId]) {
        let mut removed = false;
        for id in ids {
            self.cache.remove(id);
            removed |= self.known.remove(id).is_some();
        }
        if removed {
            let known = &self.known;
            self.order.retain(|id| known.contains_key(id));
        }
    }

    /// Known records in insertion order, with extras when any record has one.
    pub fn known_records(&self, ids: &[RecordId]) -> (Vec<Record>, Vec<serde_json::Value>) {
        let entries: Vec<&KnownRecord> = ids.iter().filter_map(|id| self.known.get(id)).collect();
        let records = entries.iter().map(|k| k.record.clone()).collect();
        let extras = if entries.iter().any(|k| k.extra.is_some()) {
            entries
                .iter()
                .map(|k| k.extra.clone().unwrap_or(serde_json::Value::Null))
                .collect()
        } else {
            Vec::new()
        };
        (records, extras)
    }

    pub fn rebuild_hook_snapshot(&mut self) {
        self.hook_snapshot = self.hooks.iter().map(|(_, hook)| Arc::clone(hook)).collect();
    }
}

/// Lock-guarded [`State`] handed to every stage.
pub struct Shared {
    state: Mutex<State>,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::new()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().snapshot()
    }

    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Whether work stamped with `version` has been overtaken.
    pub fn is_stale(&self, version: u64) -> bool {
        self.version() != version
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}
