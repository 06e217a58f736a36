//! The coordinator owns the filter and sort state of one view.
//!
//! It chunks records into [`Package`]s stamped with the current filter
//! version, hands them to the preparer or the filterer, and merges finished
//! packages back into the result cache. A package that comes back for an old
//! version is recycled into the current one unless it predates a reset, in
//! which case it is dropped.
//!
//! Every public method is synchronous and returns without waiting for the
//! pipeline. [`Coordinator::accepts_record`] is the only call that may load
//! record attributes inline.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{broadcast, watch};
use vista_core::config::PipelineConfig;
use vista_core::events::{Event, EventBus, EventPayload};
use vista_core::{Attribute, Error, HookId, Record, RecordId, Result};
use vista_filter::{
    Categorization, CategoryKey, ContentFilter, FilterSettings, LabelFilter, MimeFilter,
    RatingFilter, SortSettings, TagFilter, TextFilter, VersionFilterSettings,
};

use crate::hook::PrepareHook;
use crate::package::{Completion, Package};
use crate::state::{Shared, State};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Entry points of the two worker stages.
pub struct Dispatcher {
    prepare_tx: UnboundedSender<Package>,
    filter_tx: UnboundedSender<Package>,
}

impl Dispatcher {
    pub fn new(prepare_tx: UnboundedSender<Package>, filter_tx: UnboundedSender<Package>) -> Self {
        Self {
            prepare_tx,
            filter_tx,
        }
    }

    fn send(&self, packages: Vec<Package>, needs_prepare: bool) {
        let (tx, stage) = if needs_prepare {
            (&self.prepare_tx, "preparer")
        } else {
            (&self.filter_tx, "filterer")
        };
        for package in packages {
            if tx.send(package).is_err() {
                tracing::warn!(stage, "Pipeline stage is gone; package dropped");
                return;
            }
        }
    }
}

/// Packages built under the lock, sent once it is released.
struct Batch {
    packages: Vec<Package>,
    needs_prepare: bool,
}

/// Aggregate flags of an epoch whose last package was merged.
struct Settled {
    version: u64,
    has_match: bool,
    has_text_match: bool,
}

/// Result of starting a new filter epoch.
struct Restart {
    version: u64,
    batch: Batch,
    settled: Option<Settled>,
}

/// What a merge needs to announce.
struct Merged {
    version: u64,
    readded: Option<(Vec<RecordId>, bool)>,
    settled: Option<Settled>,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

pub struct Coordinator {
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
    events: Arc<EventBus>,
    settled: watch::Sender<bool>,
    closed: AtomicBool,
    config: PipelineConfig,
}

impl Coordinator {
    pub fn new(config: PipelineConfig, dispatcher: Dispatcher) -> Self {
        let (settled, _) = watch::channel(true);
        Self {
            shared: Arc::new(Shared::new()),
            dispatcher,
            events: Arc::new(EventBus::new(config.event_capacity)),
            settled,
            closed: AtomicBool::new(false),
            config,
        }
    }

    /// State handle for the worker stages.
    pub fn shared(&self) -> Arc<Shared> {
        Arc::clone(&self.shared)
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // -- Source notifications ------------------------------------------------

    /// Schedule newly available records for filtering.
    pub fn records_added(&self, records: Vec<Record>) {
        self.add(records, Vec::new(), false);
    }

    /// Like [`records_added`](Self::records_added), with one extra value per
    /// record that is stored once the record's package is merged.
    pub fn records_added_with_extras(
        &self,
        records: Vec<Record>,
        extras: Vec<serde_json::Value>,
    ) -> Result<()> {
        check_extras(&records, &extras)?;
        self.add(records, extras, false);
        Ok(())
    }

    /// Records that come back after a transient removal. Their packages are
    /// tracked separately so the view learns when re-adding is complete.
    pub fn records_readded(
        &self,
        records: Vec<Record>,
        extras: Vec<serde_json::Value>,
    ) -> Result<()> {
        check_extras(&records, &extras)?;
        self.add(records, extras, true);
        Ok(())
    }

    /// Forget `ids` and their cached results. Packages still carrying them
    /// finish normally, but their results are not merged.
    pub fn records_about_to_be_removed(&self, ids: &[RecordId]) {
        self.shared.lock().forget(ids);
        tracing::debug!(count = ids.len(), "Records removed");
    }

    /// Drop every record, result and in-flight package.
    pub fn model_reset(&self) {
        let version = {
            let mut state = self.shared.lock();
            state.last_discard_version = state.version;
            let version = state.begin_epoch();
            state.sent_out = 0;
            state.sent_out_for_readd = 0;
            state.order.clear();
            state.known.clear();
            self.mark_settled(true);
            version
        };

        tracing::info!(version, "Filter model reset");
        self.events.broadcast(EventPayload::ModelReset { version });
    }

    /// Replace the whole record set.
    pub fn set_records(&self, records: Vec<Record>) {
        self.model_reset();
        self.records_added(records);
    }

    /// Attributes of `ids` changed in the source.
    ///
    /// Cached attribute values are dropped. If the filter reads one of the
    /// changed attributes the records are filtered again under the current
    /// version; otherwise, if the sort order depends on them, listeners are
    /// told to re-sort.
    pub fn records_changed(&self, ids: &[RecordId], attributes: &[Attribute]) {
        let (records, extras, filter_affected, sort_affected) = {
            let state = self.shared.lock();
            let known: Vec<RecordId> = ids
                .iter()
                .copied()
                .filter(|id| {
                    let known = state.known.contains_key(id);
                    if !known {
                        tracing::trace!(record = %id, "Change for unknown record ignored");
                    }
                    known
                })
                .collect();
            let (records, extras) = state.known_records(&known);
            (
                records,
                extras,
                state.settings.is_affected_by(attributes),
                state.sort.is_affected_by(attributes),
            )
        };

        if records.is_empty() {
            return;
        }
        for record in &records {
            record.invalidate(attributes);
        }

        if filter_affected {
            let count = records.len();
            let batch = {
                let mut state = self.shared.lock();
                self.schedule(&mut state, records, extras, false)
            };
            tracing::debug!(count, packages = batch.packages.len(), "Refiltering changed records");
            self.dispatch(batch);
        } else if sort_affected {
            self.events.broadcast(EventPayload::Resorted);
        }
    }

    // -- Filter settings -----------------------------------------------------

    /// Replace the whole filter.
    pub fn set_filter(&self, settings: FilterSettings) {
        self.change_settings(|current| *current = settings);
    }

    /// Replace the content part of the filter.
    pub fn set_filter_settings(&self, content: ContentFilter) {
        self.change_settings(|current| current.content = content);
    }

    pub fn set_version_filter(&self, version: VersionFilterSettings) {
        self.change_settings(|current| current.version = version);
    }

    pub fn set_text_filter(&self, text: TextFilter) {
        self.change_settings(|current| current.content.text = text);
    }

    pub fn set_tag_filter(&self, tags: TagFilter) {
        self.change_settings(|current| current.content.tags = tags);
    }

    pub fn set_rating_filter(&self, rating: Option<RatingFilter>) {
        self.change_settings(|current| current.content.rating = rating);
    }

    pub fn set_label_filter(&self, labels: LabelFilter) {
        self.change_settings(|current| current.content.labels = labels);
    }

    pub fn set_day_filter(&self, days: BTreeSet<NaiveDate>) {
        self.change_settings(|current| current.content.days = days);
    }

    pub fn set_mime_filter(&self, mime: MimeFilter) {
        self.change_settings(|current| current.content.mime = mime);
    }

    /// Set or clear (`None`) the allow-list stored under `key`.
    pub fn set_url_allow_list(&self, key: impl Into<String>, paths: Option<BTreeSet<PathBuf>>) {
        let key = key.into();
        self.change_settings(|current| {
            let lists = &mut current.content.url_allow_lists;
            match paths {
                Some(paths) => {
                    lists.insert(key, paths);
                }
                None => {
                    lists.remove(&key);
                }
            }
        });
    }

    pub fn set_group_open(&self, leader: RecordId, open: bool) {
        self.change_settings(|current| current.group.set_open(leader, open));
    }

    pub fn toggle_group_open(&self, leader: RecordId) {
        self.change_settings(|current| {
            current.group.toggle(leader);
        });
    }

    pub fn set_all_groups_open(&self, open: bool) {
        self.change_settings(|current| current.group.all_open = open);
    }

    // -- Prepare hooks -------------------------------------------------------

    /// Register a hook run on every package before filtering.
    pub fn add_prepare_hook(&self, hook: Arc<dyn PrepareHook>) -> HookId {
        let (id, restart) = {
            let mut state = self.shared.lock();
            let id = HookId::new(state.next_hook_id);
            state.next_hook_id += 1;
            state.hooks.push((id, hook));
            state.rebuild_hook_snapshot();
            (id, self.restart(&mut state))
        };
        tracing::debug!(hook = %id, "Prepare hook added");
        self.announce(restart);
        id
    }

    /// Unregister a hook. Returns `false` for an unknown id.
    pub fn remove_prepare_hook(&self, id: HookId) -> bool {
        let restart = {
            let mut state = self.shared.lock();
            let before = state.hooks.len();
            state.hooks.retain(|(hook_id, _)| *hook_id != id);
            if state.hooks.len() == before {
                return false;
            }
            state.rebuild_hook_snapshot();
            self.restart(&mut state)
        };
        tracing::debug!(hook = %id, "Prepare hook removed");
        self.announce(restart);
        true
    }

    // -- Sorting -------------------------------------------------------------

    pub fn set_sort_settings(&self, sort: SortSettings) {
        self.change_sort(|current| *current = sort);
    }

    pub fn set_categorization(&self, categorization: Categorization) {
        self.change_sort(|current| current.categorization = categorization);
    }

    pub fn compare_for_sort(&self, a: &Record, b: &Record) -> Ordering {
        self.sort_settings().compare_for_sort(a, b)
    }

    pub fn compare_categories(&self, a: &Record, b: &Record) -> Ordering {
        self.sort_settings().compare_categories(a, b)
    }

    pub fn category_of(&self, record: &Record) -> CategoryKey {
        self.sort_settings().category_key(record)
    }

    // -- Queries -------------------------------------------------------------

    /// Whether `record` passes the current filter.
    ///
    /// Answers from the cache when possible. On a miss the record is evaluated
    /// inline, which may load attributes from the source; that answer is not
    /// cached.
    pub fn accepts_record(&self, record: &Record) -> bool {
        let settings = {
            let state = self.shared.lock();
            if let Some(&accepted) = state.cache.get(&record.id()) {
                return accepted;
            }
            Arc::clone(&state.settings)
        };
        settings.matches(record)
    }

    /// Accepted records in display order.
    pub fn visible_records(&self) -> Vec<Record> {
        let (mut records, sort) = {
            let state = self.shared.lock();
            let records: Vec<Record> = state
                .order
                .iter()
                .filter(|id| state.cache.get(id).copied().unwrap_or(false))
                .filter_map(|id| state.known.get(id))
                .map(|known| known.record.clone())
                .collect();
            (records, state.sort)
        };
        sort.sort(&mut records);
        records
    }

    pub fn version(&self) -> u64 {
        self.shared.version()
    }

    /// No package of any epoch is in flight.
    pub fn is_settled(&self) -> bool {
        self.shared.lock().sent_out == 0
    }

    pub fn has_match(&self) -> bool {
        self.shared.lock().has_match
    }

    pub fn has_text_match(&self) -> bool {
        self.shared.lock().has_text_match
    }

    pub fn cached_result(&self, id: RecordId) -> Option<bool> {
        self.shared.lock().cache.get(&id).copied()
    }

    /// `(packages in flight, re-add packages in flight)`.
    pub fn in_flight(&self) -> (usize, usize) {
        let state = self.shared.lock();
        (state.sent_out, state.sent_out_for_readd)
    }

    pub fn record_count(&self) -> usize {
        self.shared.lock().order.len()
    }

    pub fn extra_value(&self, id: RecordId) -> Option<serde_json::Value> {
        self.shared.lock().known.get(&id).and_then(|known| known.extra.clone())
    }

    pub fn filter_settings(&self) -> Arc<FilterSettings> {
        Arc::clone(&self.shared.lock().settings)
    }

    pub fn sort_settings(&self) -> SortSettings {
        self.shared.lock().sort
    }

    /// Resolve once no package is in flight, or once the coordinator is
    /// closed. After [`close`](Self::close) this returns immediately even
    /// though [`is_settled`](Self::is_settled) may stay false.
    pub async fn wait_settled(&self) {
        let mut rx = self.settled.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|settled| *settled).await;
    }

    /// Stop waiting for packages. Called when the workers go away, since
    /// whatever is still queued will never come back.
    pub fn close(&self) {
        if !self.closed.swap(true, AtomicOrdering::AcqRel) {
            tracing::debug!(in_flight = self.shared.lock().sent_out, "Coordinator closed");
        }
        self.settled.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::Acquire)
    }

    // -- Completion ----------------------------------------------------------

    /// Take back a package leaving the pipeline.
    pub fn finish(&self, completion: Completion) {
        let failed = matches!(completion, Completion::Failed(_));
        let filtered = failed || matches!(completion, Completion::Filtered(_));
        let mut package = completion.into_package();

        let mut state = self.shared.lock();
        if package.version == state.version {
            if failed {
                // Retrying would panic again; its records stay uncached.
                tracing::warn!(
                    version = package.version,
                    records = package.len(),
                    "Package failed; merged without results"
                );
            }
            if filtered {
                let merged = self.merge(&mut state, package);
                drop(state);
                self.publish(merged);
            } else {
                let needs_prepare = state.needs_prepare();
                drop(state);
                self.dispatcher.send(vec![package], needs_prepare);
            }
        } else if package.version > state.last_discard_version {
            let from = package.version;
            package.recycle(state.version);
            let needs_prepare = state.needs_prepare();
            drop(state);
            tracing::trace!(
                from,
                to = package.version,
                records = package.len(),
                "Package recycled"
            );
            self.dispatcher.send(vec![package], needs_prepare);
        } else {
            drop(state);
            tracing::trace!(version = package.version, "Package predates reset; dropped");
        }
    }

    // -- Internals -----------------------------------------------------------

    fn add(&self, records: Vec<Record>, extras: Vec<serde_json::Value>, is_readd: bool) {
        if records.is_empty() {
            return;
        }
        let count = records.len();
        let batch = {
            let mut state = self.shared.lock();
            for record in &records {
                state.remember(record.clone());
            }
            self.schedule(&mut state, records, extras, is_readd)
        };
        tracing::debug!(
            count,
            packages = batch.packages.len(),
            readd = is_readd,
            prepare = batch.needs_prepare,
            "Records scheduled"
        );
        self.dispatch(batch);
    }

    /// Chunk `records` for the current version and count the packages.
    fn schedule(
        &self,
        state: &mut State,
        records: Vec<Record>,
        extras: Vec<serde_json::Value>,
        is_readd: bool,
    ) -> Batch {
        let needs_prepare = state.needs_prepare();
        let size = self.config.chunk_size_for(needs_prepare);
        let packages = Package::chunk(records, extras, size, state.version, is_readd);

        state.sent_out += packages.len();
        if is_readd {
            state.sent_out_for_readd += packages.len();
        }
        if !packages.is_empty() {
            self.mark_settled(false);
        }

        Batch {
            packages,
            needs_prepare,
        }
    }

    fn dispatch(&self, batch: Batch) {
        self.dispatcher.send(batch.packages, batch.needs_prepare);
    }

    fn change_settings(&self, edit: impl FnOnce(&mut FilterSettings)) {
        let restart = {
            let mut state = self.shared.lock();
            let mut settings = (*state.settings).clone();
            edit(&mut settings);
            if settings == *state.settings {
                return;
            }
            state.settings = Arc::new(settings);
            self.restart(&mut state)
        };
        self.announce(restart);
    }

    /// Begin a new epoch and resubmit every known record.
    fn restart(&self, state: &mut State) -> Restart {
        let version = state.begin_epoch();
        let (records, extras) = state.known_records(&state.order);
        let batch = self.schedule(state, records, extras, false);
        let settled = (state.sent_out == 0).then_some(Settled {
            version,
            has_match: false,
            has_text_match: false,
        });
        Restart {
            version,
            batch,
            settled,
        }
    }

    fn announce(&self, restart: Restart) {
        let Restart {
            version,
            batch,
            settled,
        } = restart;
        tracing::debug!(version, packages = batch.packages.len(), "Filter settings changed");
        self.events.broadcast(EventPayload::SettingsChanged { version });
        self.dispatch(batch);
        if let Some(settled) = settled {
            self.publish_settled(settled);
        }
    }

    fn change_sort(&self, edit: impl FnOnce(&mut SortSettings)) {
        let changed = {
            let mut state = self.shared.lock();
            let before = state.sort;
            edit(&mut state.sort);
            state.sort != before
        };
        if changed {
            tracing::debug!("Sort settings changed");
            self.events.broadcast(EventPayload::Resorted);
        }
    }

    fn merge(&self, state: &mut State, package: Package) -> Merged {
        let Package {
            records,
            is_readd,
            filter_results,
            extra_values,
            has_match,
            has_text_match,
            ..
        } = package;

        for (id, accepted) in filter_results {
            if state.known.contains_key(&id) {
                state.cache.insert(id, accepted);
            }
        }
        for (record, extra) in records.iter().zip(extra_values) {
            if extra.is_null() {
                continue;
            }
            if let Some(known) = state.known.get_mut(&record.id()) {
                known.extra = Some(extra);
            }
        }

        state.has_match |= has_match;
        state.has_text_match |= has_text_match;
        state.sent_out = state.sent_out.saturating_sub(1);

        let readded = is_readd.then(|| {
            state.sent_out_for_readd = state.sent_out_for_readd.saturating_sub(1);
            let ids = records
                .iter()
                .map(Record::id)
                .filter(|id| state.known.contains_key(id))
                .collect();
            (ids, state.sent_out_for_readd == 0)
        });

        let settled = (state.sent_out == 0).then_some(Settled {
            version: state.version,
            has_match: state.has_match,
            has_text_match: state.has_text_match,
        });

        Merged {
            version: state.version,
            readded,
            settled,
        }
    }

    fn publish(&self, merged: Merged) {
        if let Some((ids, finished)) = merged.readded {
            self.events.broadcast(EventPayload::RecordsReAdded { ids });
            if finished {
                self.events.broadcast(EventPayload::ReAddingFinished {
                    version: merged.version,
                });
            }
        }
        if let Some(settled) = merged.settled {
            self.publish_settled(settled);
        }
    }

    fn publish_settled(&self, settled: Settled) {
        let Settled {
            version,
            has_match,
            has_text_match,
        } = settled;
        tracing::debug!(version, has_match, has_text_match, "Filter epoch settled");
        self.events.broadcast(EventPayload::ViewInvalidated { version });
        self.events.broadcast(EventPayload::MatchesFound {
            version,
            found: has_match,
        });
        self.events.broadcast(EventPayload::TextMatchesFound {
            version,
            found: has_text_match,
        });

        // Re-read under the lock: new work may have been scheduled meanwhile.
        let state = self.shared.lock();
        self.mark_settled(state.sent_out == 0);
    }

    /// Once closed, waiters are released for good.
    fn mark_settled(&self, settled: bool) {
        let closed = self.closed.load(AtomicOrdering::Acquire);
        self.settled.send_replace(settled || closed);
    }
}

fn check_extras(records: &[Record], extras: &[serde_json::Value]) -> Result<()> {
    if extras.is_empty() || extras.len() == records.len() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{} extra values for {} records",
            extras.len(),
            records.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{catalog, entry, Harness};
    use assert_matches::assert_matches;
    use serde_json::json;
    use vista_core::{MemorySource, TagId};
    use vista_filter::GroupFilterSettings;

    fn open() -> FilterSettings {
        FilterSettings {
            group: GroupFilterSettings::all_open(),
            ..Default::default()
        }
    }

    fn ids(records: &[Record]) -> Vec<u64> {
        records.iter().map(|r| r.id().get()).collect()
    }

    #[test]
    fn ten_thousand_records_are_chunked_into_five_packages() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        harness.coordinator.records_added(catalog(10_000).records());

        assert_eq!(harness.coordinator.in_flight(), (5, 0));
        assert_eq!(harness.queued_filter(), 5);
        assert_eq!(harness.queued_prepare(), 0);

        harness.drain();
        assert!(harness.coordinator.is_settled());
        assert_eq!(harness.coordinator.visible_records().len(), 10_000);
    }

    #[test]
    fn preparation_uses_small_chunks() {
        let mut harness = Harness::new();
        harness.coordinator.records_added(catalog(250).records());
        assert_eq!(harness.queued_prepare(), 3);
        harness.drain();
        assert_eq!(harness.coordinator.record_count(), 250);
        assert!(harness.coordinator.is_settled());
    }

    #[test]
    fn settled_epoch_publishes_flags() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        let source = catalog(3);
        harness.coordinator.records_added(source.records());
        harness.drain();

        let coordinator = &harness.coordinator;
        assert!(coordinator.has_match());
        assert!(!coordinator.has_text_match());
        let version = coordinator.version();
        let recent = coordinator.events().recent_payloads(3);
        assert_eq!(
            recent,
            vec![
                EventPayload::TextMatchesFound { version, found: false },
                EventPayload::MatchesFound { version, found: true },
                EventPayload::ViewInvalidated { version },
            ]
        );
    }

    #[test]
    fn stale_package_is_recycled_into_current_version() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        harness.coordinator.records_added(catalog(4).records());
        let stale = harness.pop_filter().unwrap();
        assert_eq!(stale.version, 2);

        let mut text = open();
        text.content.text =
            TextFilter::new("img_00003").with_fields([vista_filter::TextField::Name]);
        harness.coordinator.set_filter(text);
        let fresh = harness.pop_filter().unwrap();
        assert_eq!(fresh.version, 3);
        assert_eq!(harness.coordinator.in_flight(), (2, 0));

        // The old package finishes first and comes back restamped.
        harness.coordinator.finish(Completion::Discarded(stale));
        let recycled = harness.pop_filter().unwrap();
        assert_eq!(recycled.version, 3);
        assert_eq!(harness.coordinator.in_flight(), (2, 0));

        harness.finish_filtered(fresh);
        assert!(!harness.coordinator.is_settled());
        harness.finish_filtered(recycled);
        assert!(harness.coordinator.is_settled());
        assert_eq!(ids(&harness.coordinator.visible_records()), vec![3]);
        assert!(harness.coordinator.has_text_match());
    }

    #[test]
    fn filtered_stale_result_is_never_merged() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        harness.coordinator.records_added(catalog(2).records());
        let package = harness.pop_filter().unwrap();
        let completion = crate::filterer::process(package, &harness.coordinator.shared());
        assert_matches!(completion, Completion::Filtered(_));

        harness.coordinator.set_rating_filter(Some(RatingFilter::at_least(5)));
        harness.coordinator.finish(completion);

        assert_eq!(harness.coordinator.cached_result(RecordId::new(1)), None);
        harness.drain();
        assert_eq!(harness.coordinator.cached_result(RecordId::new(1)), Some(false));
        assert!(!harness.coordinator.has_match());
    }

    #[test]
    fn failed_package_settles_without_results() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        harness.coordinator.records_added(catalog(3).records());
        let package = harness.pop_filter().unwrap();

        harness.coordinator.finish(Completion::Failed(package));
        assert_eq!(harness.queued_filter(), 0);
        assert_eq!(harness.coordinator.in_flight(), (0, 0));
        assert!(harness.coordinator.is_settled());
        assert_eq!(harness.coordinator.cached_result(RecordId::new(1)), None);
        assert!(!harness.coordinator.has_match());
    }

    #[test]
    fn stale_failed_package_is_recycled() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        harness.coordinator.records_added(catalog(2).records());
        let package = harness.pop_filter().unwrap();

        harness.coordinator.set_rating_filter(Some(RatingFilter::at_least(1)));
        harness.coordinator.finish(Completion::Failed(package));
        assert_eq!(harness.queued_filter() + harness.queued_prepare(), 2);
        harness.drain();
        assert!(harness.coordinator.is_settled());
        assert_eq!(harness.coordinator.cached_result(RecordId::new(2)), Some(false));
    }

    #[test]
    fn closing_releases_waiters_for_good() {
        let harness = Harness::new();
        harness.coordinator.close();
        harness.coordinator.records_added(catalog(2).records());
        assert!(!harness.coordinator.is_settled());
        assert!(*harness.coordinator.settled.borrow());
    }

    #[test]
    fn reset_drops_in_flight_packages() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        harness.coordinator.records_added(catalog(3).records());
        let before = harness.pop_filter().unwrap();

        harness.coordinator.model_reset();
        assert_eq!(harness.coordinator.in_flight(), (0, 0));
        assert_eq!(harness.coordinator.record_count(), 0);
        assert!(harness.coordinator.is_settled());

        harness.finish_filtered(before);
        assert!(harness.queued_filter() == 0 && harness.queued_prepare() == 0);
        assert_eq!(harness.coordinator.cached_result(RecordId::new(1)), None);
        assert_eq!(harness.coordinator.in_flight(), (0, 0));
        assert_matches!(
            harness.coordinator.events().recent_payloads(1)[0],
            EventPayload::ModelReset { .. }
        );
    }

    #[test]
    fn removed_records_are_not_resurrected() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        harness.coordinator.records_added(catalog(3).records());
        harness.coordinator.records_about_to_be_removed(&[RecordId::new(2)]);
        harness.drain();

        assert_eq!(harness.coordinator.cached_result(RecordId::new(2)), None);
        assert_eq!(ids(&harness.coordinator.visible_records()), vec![1, 3]);
        assert_eq!(harness.coordinator.record_count(), 2);
    }

    #[test]
    fn identical_settings_do_not_start_an_epoch() {
        let harness = Harness::new();
        harness.coordinator.set_filter(open());
        let version = harness.coordinator.version();
        harness.coordinator.set_filter(open());
        assert_eq!(harness.coordinator.version(), version);
    }

    #[test]
    fn settings_change_without_records_settles_immediately() {
        let harness = Harness::new();
        harness.coordinator.set_text_filter(TextFilter::new("x"));
        let version = harness.coordinator.version();
        assert_eq!(version, 2);
        assert!(harness.coordinator.is_settled());
        let recent = harness.coordinator.events().recent_payloads(4);
        assert_eq!(recent[3], EventPayload::SettingsChanged { version });
        assert_eq!(recent[2], EventPayload::ViewInvalidated { version });
    }

    #[test]
    fn readd_reports_each_package_and_completion() {
        let mut harness = Harness::with_config(PipelineConfig {
            chunk_size: 2,
            ..Default::default()
        });
        harness.coordinator.set_filter(open());
        let source = catalog(3);
        harness
            .coordinator
            .records_readded(source.records(), Vec::new())
            .unwrap();
        assert_eq!(harness.coordinator.in_flight(), (2, 2));

        harness.drain();
        assert_eq!(harness.coordinator.in_flight(), (0, 0));
        let payloads = harness.coordinator.events().recent_payloads(20);
        let readded: Vec<_> = payloads
            .iter()
            .filter(|p| matches!(p, EventPayload::RecordsReAdded { .. }))
            .collect();
        assert_eq!(readded.len(), 2);
        let finished = payloads
            .iter()
            .filter(|p| matches!(p, EventPayload::ReAddingFinished { .. }))
            .count();
        assert_eq!(finished, 1);
    }

    #[test]
    fn extras_are_stored_on_merge() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        let records = catalog(2).records();
        harness
            .coordinator
            .records_added_with_extras(records, vec![json!({"score": 1}), json!({"score": 2})])
            .unwrap();
        assert_eq!(harness.coordinator.extra_value(RecordId::new(1)), None);

        harness.drain();
        assert_eq!(
            harness.coordinator.extra_value(RecordId::new(2)),
            Some(json!({"score": 2}))
        );
    }

    #[test]
    fn mismatched_extras_are_rejected() {
        let harness = Harness::new();
        let err = harness
            .coordinator
            .records_added_with_extras(catalog(2).records(), vec![json!(1)])
            .unwrap_err();
        assert_matches!(err, Error::Validation(_));
        assert_eq!(harness.coordinator.record_count(), 0);
    }

    #[test]
    fn accepts_record_falls_back_without_caching() {
        let harness = Harness::new();
        harness.coordinator.set_filter(open());
        let record = catalog(1).records().remove(0);
        assert!(harness.coordinator.accepts_record(&record));
        assert_eq!(harness.coordinator.cached_result(record.id()), None);
    }

    #[test]
    fn changed_attribute_refilters_without_new_epoch() {
        let mut harness = Harness::new();
        let mut settings = open();
        settings.content.rating = Some(RatingFilter::at_least(3));
        harness.coordinator.set_filter(settings);

        let source = catalog(2);
        harness.coordinator.records_added(source.records());
        harness.drain();
        assert!(harness.coordinator.visible_records().is_empty());
        let version = harness.coordinator.version();

        source
            .update(RecordId::new(2), |e| e.info.rating = Some(4))
            .unwrap();
        harness
            .coordinator
            .records_changed(&[RecordId::new(2), RecordId::new(99)], &[Attribute::Rating]);
        assert_eq!(harness.coordinator.in_flight(), (1, 0));
        harness.drain();

        assert_eq!(harness.coordinator.version(), version);
        assert_eq!(ids(&harness.coordinator.visible_records()), vec![2]);
    }

    #[test]
    fn changed_sort_attribute_only_resorts() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        let source = catalog(2);
        harness.coordinator.records_added(source.records());
        harness.drain();

        harness
            .coordinator
            .records_changed(&[RecordId::new(1)], &[Attribute::Name]);
        assert_eq!(harness.coordinator.in_flight(), (0, 0));
        assert_eq!(
            harness.coordinator.events().recent_payloads(1),
            vec![EventPayload::Resorted]
        );
    }

    #[test]
    fn group_setters_start_new_epochs() {
        let mut harness = Harness::new();
        let source = Arc::new(MemorySource::from_entries(vec![
            entry(1, "leader.jpg"),
            {
                let mut member = entry(2, "member.jpg");
                member.group_leader = Some(RecordId::new(1));
                member
            },
        ]));
        harness.coordinator.records_added(source.records());
        harness.drain();
        assert_eq!(ids(&harness.coordinator.visible_records()), vec![1]);

        let version = harness.coordinator.version();
        harness.coordinator.set_group_open(RecordId::new(1), true);
        assert_eq!(harness.coordinator.version(), version + 1);
        harness.drain();
        assert_eq!(ids(&harness.coordinator.visible_records()), vec![1, 2]);

        harness.coordinator.toggle_group_open(RecordId::new(1));
        harness.drain();
        assert_eq!(ids(&harness.coordinator.visible_records()), vec![1]);

        harness.coordinator.set_all_groups_open(true);
        harness.drain();
        assert_eq!(ids(&harness.coordinator.visible_records()), vec![1, 2]);
    }

    #[test]
    fn url_allow_lists_can_be_set_and_cleared() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        harness.coordinator.records_added(catalog(3).records());
        harness.coordinator.set_url_allow_list(
            "selection",
            Some([PathBuf::from("/photos/img_00002.jpg")].into_iter().collect()),
        );
        harness.drain();
        assert_eq!(ids(&harness.coordinator.visible_records()), vec![2]);

        harness.coordinator.set_url_allow_list("selection", None);
        harness.drain();
        assert_eq!(harness.coordinator.visible_records().len(), 3);
    }

    #[test]
    fn hooks_bump_version_and_route_through_preparer() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        harness.coordinator.records_added(catalog(2).records());
        harness.drain();

        let version = harness.coordinator.version();
        let hook: Arc<dyn PrepareHook> = Arc::new(|_: &[Record]| {});
        let id = harness.coordinator.add_prepare_hook(hook);
        assert_eq!(harness.coordinator.version(), version + 1);
        assert_eq!(harness.queued_prepare(), 1);
        harness.drain();

        assert!(harness.coordinator.remove_prepare_hook(id));
        assert!(!harness.coordinator.remove_prepare_hook(id));
        assert_eq!(harness.coordinator.version(), version + 2);
        assert_eq!(harness.queued_filter(), 1);
    }

    #[test]
    fn sort_changes_do_not_touch_the_filter() {
        let harness = Harness::new();
        let version = harness.coordinator.version();
        harness.coordinator.set_categorization(Categorization::Month);
        assert_eq!(harness.coordinator.version(), version);
        assert_eq!(
            harness.coordinator.sort_settings().categorization,
            Categorization::Month
        );
        assert_eq!(
            harness.coordinator.events().recent_payloads(1),
            vec![EventPayload::Resorted]
        );

        harness.coordinator.set_categorization(Categorization::Month);
        assert_eq!(harness.coordinator.events().recent_payloads(5).len(), 1);
    }

    #[test]
    fn version_filter_hides_tagged_versions() {
        let mut harness = Harness::new();
        harness.coordinator.set_filter(open());
        let source = catalog(2);
        source
            .update(RecordId::new(1), |e| {
                e.tags.insert(TagId::new(7));
            })
            .unwrap();
        harness.coordinator.records_added(source.records());
        harness
            .coordinator
            .set_version_filter(VersionFilterSettings::hiding([TagId::new(7)]));
        harness.drain();
        assert_eq!(ids(&harness.coordinator.visible_records()), vec![2]);
    }
}
