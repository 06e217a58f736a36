//! Group filter: records folded under a group leader are only shown while
//! that group is open.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use vista_core::{Attribute, Record, RecordId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupFilterSettings {
    /// Every group is open; `open_groups` is ignored.
    pub all_open: bool,
    pub open_groups: BTreeSet<RecordId>,
}

impl GroupFilterSettings {
    pub fn all_open() -> Self {
        Self {
            all_open: true,
            open_groups: BTreeSet::new(),
        }
    }

    pub fn is_open(&self, leader: RecordId) -> bool {
        self.all_open || self.open_groups.contains(&leader)
    }

    pub fn set_open(&mut self, leader: RecordId, open: bool) {
        if open {
            self.open_groups.insert(leader);
        } else {
            self.open_groups.remove(&leader);
        }
    }

    /// Flip the open state of `leader`'s group. Returns the new state.
    pub fn toggle(&mut self, leader: RecordId) -> bool {
        let open = !self.open_groups.contains(&leader);
        self.set_open(leader, open);
        open
    }

    /// Grouping must be known to evaluate unless every group is open.
    pub fn needs_grouping(&self) -> bool {
        !self.all_open
    }

    pub fn matches(&self, record: &Record) -> bool {
        if self.all_open {
            return true;
        }
        match record.grouping().leader {
            Some(leader) => self.is_open(leader),
            None => true,
        }
    }

    pub fn watched_attributes(&self) -> BTreeSet<Attribute> {
        if self.all_open {
            BTreeSet::new()
        } else {
            [Attribute::Grouping].into_iter().collect()
        }
    }
}
