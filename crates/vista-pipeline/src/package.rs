//! Units of work moving through the pipeline.
//!
//! A [`Package`] is a move-only batch of records stamped with the filter
//! version it was created for. Workers take ownership, fill in results and
//! pass it on; nothing else references it while it is in flight.

use std::collections::HashMap;

use vista_core::{Record, RecordId};

/// A chunk of records processed together.
#[derive(Debug)]
pub struct Package {
    pub records: Vec<Record>,
    /// Filter version this package is valid for.
    pub version: u64,
    /// Created by a re-add notification.
    pub is_readd: bool,
    pub filter_results: HashMap<RecordId, bool>,
    /// Either empty or one value per record.
    pub extra_values: Vec<serde_json::Value>,
    /// At least one record was accepted.
    pub has_match: bool,
    /// At least one record matched the active text sub-filter.
    pub has_text_match: bool,
}

impl Package {
    pub fn new(records: Vec<Record>, version: u64) -> Self {
        Self {
            records,
            version,
            is_readd: false,
            filter_results: HashMap::new(),
            extra_values: Vec::new(),
            has_match: false,
            has_text_match: false,
        }
    }

    /// Split `records` into packages of at most `size` records.
    ///
    /// `extras` must be empty or parallel to `records`; it is split along the
    /// same boundaries.
    pub fn chunk(
        records: Vec<Record>,
        extras: Vec<serde_json::Value>,
        size: usize,
        version: u64,
        is_readd: bool,
    ) -> Vec<Package> {
        let size = size.max(1);
        let has_extras = !extras.is_empty();
        let mut extras = extras.into_iter();
        let mut records = records.into_iter().peekable();
        let mut packages = Vec::new();

        while records.peek().is_some() {
            let chunk: Vec<Record> = records.by_ref().take(size).collect();
            let extra_values = if has_extras {
                extras.by_ref().take(chunk.len()).collect()
            } else {
                Vec::new()
            };
            packages.push(Package {
                is_readd,
                extra_values,
                ..Package::new(chunk, version)
            });
        }

        packages
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(Record::id).collect()
    }

    /// Extra value paired with the record at `index`, if any.
    pub fn extra_value(&self, index: usize) -> Option<&serde_json::Value> {
        self.extra_values.get(index)
    }

    /// Forget all results and stamp the package for `version`.
    pub fn recycle(&mut self, version: u64) {
        self.version = version;
        self.filter_results.clear();
        self.has_match = false;
        self.has_text_match = false;
    }
}

/// What a preparer hands on.
#[derive(Debug)]
pub enum Prepared {
    /// Attributes are loaded; the package goes to the filterer.
    Ready(Package),
    /// The filter version moved on while preparing.
    Discarded(Package),
    /// A load or hook panicked; the package carries no results.
    Failed(Package),
}

/// What reaches the coordinator at the end of the pipeline.
#[derive(Debug)]
pub enum Completion {
    Filtered(Package),
    Discarded(Package),
    /// A stage panicked while working on the package.
    Failed(Package),
}

impl Completion {
    pub fn package(&self) -> &Package {
        match self {
            Self::Filtered(package) | Self::Discarded(package) | Self::Failed(package) => package,
        }
    }

    pub fn into_package(self) -> Package {
        match self {
            Self::Filtered(package) | Self::Discarded(package) | Self::Failed(package) => package,
        }
    }
}
