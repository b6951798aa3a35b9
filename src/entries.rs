use tracing::{info, warn};

use crate::domain::TimeEntry;

/// Fields to merge into a committed entry. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub edited_duration: Option<i64>,
}

impl EntryPatch {
    pub fn edited_duration(seconds: i64) -> Self {
        Self {
            edited_duration: Some(seconds),
            ..Self::default()
        }
    }
}

/// Committed entries in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryStore {
    entries: Vec<TimeEntry>,
}

impl EntryStore {
    pub fn new(entries: Vec<TimeEntry>) -> Self {
        Self { entries }
    }

    pub fn as_slice(&self) -> &[TimeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TimeEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn push(&mut self, mut entry: TimeEntry) {
        entry.is_running = false;
        info!(entry_id = %entry.id, project_id = %entry.project_id, "entry saved");
        match self.entries.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Returns `false` when no entry has `id`.
    pub fn update(&mut self, id: &str, patch: EntryPatch) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            warn!(entry_id = %id, "ignoring update of unknown entry");
            return false;
        };

        if let Some(project_id) = patch.project_id {
            entry.project_id = project_id;
        }
        if let Some(project_name) = patch.project_name {
            entry.project_name = project_name;
        }
        if let Some(edited_duration) = patch.edited_duration {
            entry.edited_duration = Some(edited_duration.max(0));
        }
        info!(entry_id = %id, "entry updated");
        true
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        let removed = self.entries.len() != before;
        if removed {
            info!(entry_id = %id, "entry deleted");
        } else {
            warn!(entry_id = %id, "ignoring delete of unknown entry");
        }
        removed
    }

    /// Copies a project's new name onto every entry that references it.
    pub fn rename_project(&mut self, project_id: &str, name: &str) -> usize {
        let mut renamed = 0;
        for entry in self.entries.iter_mut().filter(|entry| entry.project_id == project_id) {
            if entry.project_name != name {
                entry.project_name = name.to_string();
                renamed += 1;
            }
        }
        renamed
    }
}
