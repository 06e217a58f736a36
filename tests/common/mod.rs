//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], a [`FilterModel`] with live workers over an
//! in-memory source, and [`ManualPipeline`], a coordinator whose stages are
//! stepped by hand so package interleavings can be forced.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use vista::core::config::PipelineConfig;
use vista::core::{MediaCategory, MemoryEntry, MemorySource, Record, RecordId, RecordInfo, TagId};
use vista::filter::{FilterSettings, GroupFilterSettings};
use vista::pipeline::{
    filterer, preparer, Completion, Coordinator, Dispatcher, FilterModel, Package, PrepareHook,
    Prepared,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn photo(id: u64, name: &str) -> MemoryEntry {
    MemoryEntry {
        id: RecordId::new(id),
        info: RecordInfo {
            name: name.into(),
            path: PathBuf::from(format!("/library/{name}")),
            format: "JPG".into(),
            category: MediaCategory::Image,
            date: NaiveDate::from_ymd_opt(2023, 8, 14).and_then(|d| d.and_hms_opt(18, 0, 0)),
            file_size: 4_096 * id,
            dimensions: Some((6000, 4000)),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn rated(mut entry: MemoryEntry, stars: u8) -> MemoryEntry {
    entry.info.rating = Some(stars);
    entry
}

pub fn tagged(mut entry: MemoryEntry, tags: &[u64]) -> MemoryEntry {
    entry.tags = tags.iter().copied().map(TagId::new).collect();
    entry
}

/// `n` photos named `photo_0001.jpg` onwards.
pub fn photos(n: u64) -> Arc<MemorySource> {
    Arc::new(MemorySource::from_entries(
        (1..=n).map(|id| photo(id, &format!("photo_{id:04}.jpg"))),
    ))
}

/// Accepts every record without loading anything.
pub fn accept_all() -> FilterSettings {
    FilterSettings {
        group: GroupFilterSettings::all_open(),
        ..Default::default()
    }
}

pub fn ids(records: &[Record]) -> Vec<u64> {
    records.iter().map(|r| r.id().get()).collect()
}

// ---------------------------------------------------------------------------
// Live harness
// ---------------------------------------------------------------------------

/// A running [`FilterModel`] plus the source its records come from.
pub struct TestHarness {
    pub model: FilterModel,
    pub source: Arc<MemorySource>,
}

impl TestHarness {
    /// Must be called from within a tokio runtime.
    pub fn new(source: Arc<MemorySource>) -> Self {
        Self::with_config(source, PipelineConfig::default())
    }

    pub fn with_config(source: Arc<MemorySource>, config: PipelineConfig) -> Self {
        Self {
            model: FilterModel::new(config),
            source,
        }
    }

    /// Hand every source record to the model.
    pub fn add_all(&self) {
        self.model.records_added(self.source.records());
    }

    pub async fn settle(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.model.wait_settled())
            .await
            .expect("pipeline did not settle");
    }

    pub fn visible_ids(&self) -> Vec<u64> {
        ids(&self.model.visible_records())
    }
}

// ---------------------------------------------------------------------------
// Manual pipeline
// ---------------------------------------------------------------------------

/// A coordinator whose preparer and filterer run only when asked.
pub struct ManualPipeline {
    pub coordinator: Coordinator,
    prepare_rx: UnboundedReceiver<Package>,
    filter_rx: UnboundedReceiver<Package>,
    prepared: VecDeque<Package>,
}

impl ManualPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let (prepare_tx, prepare_rx) = mpsc::unbounded_channel();
        let (filter_tx, filter_rx) = mpsc::unbounded_channel();
        Self {
            coordinator: Coordinator::new(config, Dispatcher::new(prepare_tx, filter_tx)),
            prepare_rx,
            filter_rx,
            prepared: VecDeque::new(),
        }
    }

    /// Packages waiting for the preparer.
    pub fn take_prepare(&mut self) -> Vec<Package> {
        let mut packages = Vec::new();
        while let Ok(package) = self.prepare_rx.try_recv() {
            packages.push(package);
        }
        packages
    }

    /// Packages waiting for the filterer, including ones this harness
    /// prepared.
    pub fn take_filter(&mut self) -> Vec<Package> {
        let mut packages: Vec<Package> = self.prepared.drain(..).collect();
        while let Ok(package) = self.filter_rx.try_recv() {
            packages.push(package);
        }
        packages
    }

    /// Run `package` through the preparer. Ready packages queue for the
    /// filterer; discarded and failed ones go straight back to the
    /// coordinator.
    pub fn prepare(&mut self, package: Package) {
        match preparer::process(package, &self.coordinator.shared()) {
            Prepared::Ready(package) => self.prepared.push_back(package),
            Prepared::Discarded(package) => self.coordinator.finish(Completion::Discarded(package)),
            Prepared::Failed(package) => self.coordinator.finish(Completion::Failed(package)),
        }
    }

    /// Run `package` through the filterer and hand the outcome back.
    pub fn filter(&mut self, package: Package) {
        let completion = filterer::process(package, &self.coordinator.shared());
        self.coordinator.finish(completion);
    }

    /// Step both stages until nothing is queued.
    pub fn drain(&mut self) {
        loop {
            let prepare = self.take_prepare();
            let filter = self.take_filter();
            if prepare.is_empty() && filter.is_empty() {
                break;
            }
            for package in prepare {
                self.prepare(package);
            }
            for package in filter {
                self.filter(package);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Gate hook
// ---------------------------------------------------------------------------

/// Prepare hook that blocks every package until [`Gate::open`] is called.
#[derive(Default)]
pub struct Gate {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Default)]
struct GateState {
    open: bool,
    waiting: usize,
}

impl Gate {
    pub fn open(&self) {
        let mut state = self.state.lock().unwrap();
        state.open = true;
        self.changed.notify_all();
    }

    /// Number of packages currently blocked in the hook.
    pub fn waiting(&self) -> usize {
        self.state.lock().unwrap().waiting
    }

    /// Poll until at least one package is blocked.
    pub async fn wait_for_package(&self) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.waiting() == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("no package reached the gate");
    }
}

impl PrepareHook for Gate {
    fn prepare(&self, _records: &[Record]) {
        let mut state = self.state.lock().unwrap();
        state.waiting += 1;
        while !state.open {
            state = self.changed.wait(state).unwrap();
        }
        state.waiting -= 1;
    }
}
