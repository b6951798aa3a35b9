use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{Project, TimeEntry, default_projects, duration_from_parts};
use crate::entries::{EntryPatch, EntryStore};
use crate::error::{Result, TimesheetError};
use crate::projects::ProjectRegistry;
use crate::report::{EntryFilter, Report};
use crate::session::Session;
use crate::storage::{CURRENT_ENTRY_KEY, ENTRIES_KEY, KeyValueStore, PROJECTS_KEY, read_json, write_json};

/// Projects, committed entries and the current session, written through to `store`
/// after every change.
#[derive(Debug)]
pub struct Timesheet<S: KeyValueStore> {
    store: S,
    projects: ProjectRegistry,
    entries: EntryStore,
    session: Session,
}

impl<S: KeyValueStore> Timesheet<S> {
    /// Reads the three slots. A store that has never held projects is seeded with the
    /// defaults right away so their ids stay stable across loads.
    pub fn load(mut store: S, now: DateTime<Utc>) -> Result<Self> {
        let projects = match read_json::<Vec<Project>, _>(&store, PROJECTS_KEY)? {
            Some(projects) => projects,
            None => {
                debug!("no stored projects, seeding defaults");
                let projects = default_projects(now);
                write_json(&mut store, PROJECTS_KEY, &projects)?;
                projects
            }
        };
        let entries = read_json::<Vec<TimeEntry>, _>(&store, ENTRIES_KEY)?.unwrap_or_default();
        let current = read_json::<TimeEntry, _>(&store, CURRENT_ENTRY_KEY)?;
        let session = Session::from_entry(current);
        debug!(
            projects = projects.len(),
            entries = entries.len(),
            session = session.state_name(),
            "timesheet loaded"
        );

        Ok(Self {
            store,
            projects: ProjectRegistry::new(projects),
            entries: EntryStore::new(entries),
            session,
        })
    }

    pub fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn add_project(&mut self, name: &str, color: Option<String>, now: DateTime<Utc>) -> Result<Project> {
        let project = self.projects.add(name, color, now)?.clone();
        self.flush_projects()?;
        Ok(project)
    }

    /// Renames/recolors a project and copies the new name onto its entries and the
    /// current session.
    pub fn update_project(&mut self, id: &str, name: &str, color: &str) -> Result<bool> {
        if !self.projects.update(id, name, color)? {
            return Ok(false);
        }
        self.flush_projects()?;

        let renamed = self.entries.rename_project(id, name.trim());
        if renamed > 0 {
            info!(project_id = %id, renamed, "propagated project name to entries");
            self.flush_entries()?;
        }
        if self.session.rename_project(id, name.trim()) {
            debug!(project_id = %id, "propagated project name to current session");
            self.flush_session()?;
        }
        Ok(true)
    }

    /// Entries referencing the project are left as they are.
    pub fn delete_project(&mut self, id: &str) -> Result<bool> {
        if self.projects.delete(id).is_none() {
            return Ok(false);
        }
        self.flush_projects()?;
        Ok(true)
    }

    pub fn start_timer(&mut self, project_id: &str, now: DateTime<Utc>) -> Result<()> {
        let project = self
            .projects
            .get(project_id)
            .ok_or_else(|| TimesheetError::UnknownProject(project_id.to_string()))?;
        self.session.start(project, now)?;
        self.flush_session()
    }

    /// Display seconds for the current session, recomputed from the stored start time.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<i64> {
        self.session.elapsed(now)
    }

    pub fn stop_timer(&mut self, now: DateTime<Utc>) -> Result<TimeEntry> {
        let entry = self.session.stop(now)?.clone();
        self.flush_session()?;
        Ok(entry)
    }

    pub fn edit_staged_duration(&mut self, hours: u64, minutes: u64, seconds: u64) -> Result<i64> {
        let edited = self.session.edit_duration(hours, minutes, seconds)?;
        self.flush_session()?;
        Ok(edited)
    }

    /// Commits the stopped entry and returns its id.
    ///
    /// The current-entry slot is cleared before the entry list is written. If clearing
    /// fails the entry stays staged and nothing is committed.
    pub fn save_entry(&mut self) -> Result<String> {
        let entry = self.session.save()?;
        if let Err(err) = self.flush_session() {
            self.session = Session::Stopped(entry);
            return Err(err);
        }

        let id = entry.id.clone();
        self.entries.push(entry);
        self.flush_entries()?;
        Ok(id)
    }

    pub fn update_entry(&mut self, id: &str, patch: EntryPatch) -> Result<bool> {
        if !self.entries.update(id, patch) {
            return Ok(false);
        }
        self.flush_entries()?;
        Ok(true)
    }

    pub fn edit_entry_duration(&mut self, id: &str, hours: u64, minutes: u64, seconds: u64) -> Result<bool> {
        let seconds = duration_from_parts(hours, minutes, seconds);
        self.update_entry(id, EntryPatch::edited_duration(seconds))
    }

    pub fn delete_entry(&mut self, id: &str) -> Result<bool> {
        if !self.entries.delete(id) {
            return Ok(false);
        }
        self.flush_entries()?;
        Ok(true)
    }

    pub fn report(&self, filter: &EntryFilter) -> Report {
        Report::build(self.entries.as_slice(), &self.projects, filter)
    }

    fn flush_projects(&mut self) -> Result<()> {
        write_json(&mut self.store, PROJECTS_KEY, self.projects.as_slice())
    }

    fn flush_entries(&mut self) -> Result<()> {
        write_json(&mut self.store, ENTRIES_KEY, self.entries.as_slice())
    }

    fn flush_session(&mut self) -> Result<()> {
        match self.session.to_entry() {
            Some(entry) => write_json(&mut self.store, CURRENT_ENTRY_KEY, &entry),
            None => {
                debug!("clearing current entry slot");
                self.store.remove(CURRENT_ENTRY_KEY)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::domain::{Project, TimeEntry};
    use crate::error::{Result, TimesheetError};
    use crate::report::EntryFilter;
    use crate::session::Session;
    use crate::storage::{
        CURRENT_ENTRY_KEY, ENTRIES_KEY, FileStore, KeyValueStore, MemoryStore, PROJECTS_KEY,
        read_json,
    };

    use super::Timesheet;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn fresh() -> (Timesheet<MemoryStore>, String) {
        let mut timesheet = Timesheet::load(MemoryStore::default(), t0()).expect("load should work");
        let design = timesheet
            .add_project("Design", Some("#8b5cf6".to_string()), t0())
            .expect("project should be created");
        (timesheet, design.id)
    }

    fn record(timesheet: &mut Timesheet<MemoryStore>, project_id: &str, start: DateTime<Utc>, seconds: i64) -> String {
        timesheet.start_timer(project_id, start).expect("start should work");
        timesheet
            .stop_timer(start + Duration::seconds(seconds))
            .expect("stop should work");
        timesheet.save_entry().expect("save should work")
    }

    #[test]
    fn empty_store_loads_default_projects() {
        let timesheet = Timesheet::load(MemoryStore::default(), t0()).expect("load should work");
        assert_eq!(timesheet.projects().len(), 3);
        assert!(timesheet.entries().is_empty());
        assert!(timesheet.session().is_idle());

        let seeded: Vec<Project> = read_json(timesheet.store(), PROJECTS_KEY)
            .expect("read")
            .expect("defaults written on first load");
        assert_eq!(seeded, timesheet.projects().as_slice());

        let reloaded = Timesheet::load(timesheet.into_store(), t0()).expect("reload should work");
        assert_eq!(reloaded.projects().as_slice(), seeded.as_slice());
    }

    #[test]
    fn stored_empty_project_list_is_respected() {
        let mut store = MemoryStore::default();
        store.set(PROJECTS_KEY, "[]".to_string()).expect("set");
        let timesheet = Timesheet::load(store, t0()).expect("load should work");
        assert!(timesheet.projects().is_empty());
    }

    #[test]
    fn start_stop_save_adds_exactly_one_entry() {
        let (mut timesheet, design) = fresh();
        for round in 0..3 {
            let before = timesheet.entries().len();
            record(&mut timesheet, &design, t0() + Duration::hours(round), 60);
            assert_eq!(timesheet.entries().len(), before + 1);
            assert!(timesheet.session().is_idle());
        }
        assert_eq!(timesheet.store().get(CURRENT_ENTRY_KEY).expect("read"), None);
    }

    #[test]
    fn example_scenario_reports_the_edited_duration() {
        let (mut timesheet, design) = fresh();
        timesheet.start_timer(&design, t0()).expect("start should work");
        assert_eq!(timesheet.elapsed(t0() + Duration::seconds(30)), Some(30));

        let stopped = timesheet
            .stop_timer(t0() + Duration::seconds(90))
            .expect("stop should work");
        assert_eq!(stopped.duration, 90);
        assert!(!stopped.is_running);

        timesheet.edit_staged_duration(0, 2, 0).expect("edit should work");
        timesheet.save_entry().expect("save should work");

        let entry = &timesheet.entries().as_slice()[0];
        assert_eq!(entry.duration, 90);
        assert_eq!(entry.edited_duration, Some(120));
        assert_eq!(entry.project_name, "Design");

        let report = timesheet.report(&EntryFilter::default());
        assert_eq!(report.total_seconds, 120);
        assert!((report.total_hours() - 120.0 / 3600.0).abs() < 1e-9);
    }

    #[test]
    fn guards_leave_state_and_storage_untouched() {
        let (mut timesheet, design) = fresh();
        assert!(matches!(
            timesheet.start_timer("missing", t0()),
            Err(TimesheetError::UnknownProject(_))
        ));
        assert!(timesheet.session().is_idle());

        timesheet.start_timer(&design, t0()).expect("start should work");
        let stored = timesheet.store().get(CURRENT_ENTRY_KEY).expect("read");
        assert!(matches!(
            timesheet.start_timer(&design, t0() + Duration::seconds(5)),
            Err(TimesheetError::AlreadyRunning)
        ));
        assert_eq!(timesheet.store().get(CURRENT_ENTRY_KEY).expect("read"), stored);
        assert!(matches!(timesheet.save_entry(), Err(TimesheetError::NotStopped)));
    }

    #[test]
    fn current_session_is_persisted_through_each_state() {
        let (mut timesheet, design) = fresh();
        timesheet.start_timer(&design, t0()).expect("start should work");
        let running: TimeEntry = read_json(timesheet.store(), CURRENT_ENTRY_KEY)
            .expect("read")
            .expect("running entry stored");
        assert!(running.is_running);
        assert_eq!(running.end_time, None);

        timesheet.stop_timer(t0() + Duration::seconds(45)).expect("stop should work");
        timesheet.edit_staged_duration(0, 1, 0).expect("edit should work");
        let staged: TimeEntry = read_json(timesheet.store(), CURRENT_ENTRY_KEY)
            .expect("read")
            .expect("staged entry stored");
        assert!(!staged.is_running);
        assert_eq!(staged.duration, 45);
        assert_eq!(staged.edited_duration, Some(60));

        // a reload resumes the staged entry
        let store = timesheet.into_store();
        let mut reloaded = Timesheet::load(store, t0() + Duration::hours(1)).expect("reload should work");
        assert!(matches!(reloaded.session(), Session::Stopped(_)));
        reloaded.save_entry().expect("save should work");
        let stored: Vec<TimeEntry> = read_json(reloaded.store(), ENTRIES_KEY)
            .expect("read")
            .expect("entries stored");
        assert_eq!(stored.len(), 1);
        assert_eq!(reloaded.store().get(CURRENT_ENTRY_KEY).expect("read"), None);
    }

    #[test]
    fn running_timer_survives_a_reload() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut timesheet = Timesheet::load(FileStore::new(dir.path()), t0()).expect("load should work");
        let project_id = timesheet.projects().as_slice()[0].id.clone();
        timesheet.start_timer(&project_id, t0()).expect("start should work");
        drop(timesheet);

        let reloaded = Timesheet::load(FileStore::new(dir.path()), t0()).expect("reload should work");
        assert!(reloaded.session().is_running());
        assert_eq!(reloaded.elapsed(t0() + Duration::minutes(10)), Some(600));
        let projects: Vec<Project> = read_json(reloaded.store(), PROJECTS_KEY)
            .expect("read")
            .expect("projects flushed");
        assert_eq!(projects, reloaded.projects().as_slice());
    }

    #[test]
    fn renaming_propagates_only_to_matching_entries() {
        let (mut timesheet, design) = fresh();
        let ops = timesheet.add_project("Ops", None, t0()).expect("project").id;
        record(&mut timesheet, &design, t0(), 60);
        record(&mut timesheet, &ops, t0() + Duration::hours(1), 60);
        record(&mut timesheet, &design, t0() + Duration::hours(2), 60);

        assert!(timesheet.update_project(&design, "Branding", "#ff0000").expect("update"));
        let names = timesheet
            .entries()
            .as_slice()
            .iter()
            .map(|entry| entry.project_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Branding", "Ops", "Branding"]);

        let stored: Vec<TimeEntry> = read_json(timesheet.store(), ENTRIES_KEY)
            .expect("read")
            .expect("entries stored");
        assert_eq!(stored, timesheet.entries().as_slice());

        assert!(!timesheet.update_project("missing", "X", "#000000").expect("no-op"));
    }

    #[test]
    fn renaming_reaches_the_entry_being_timed() {
        let (mut timesheet, design) = fresh();
        timesheet.start_timer(&design, t0()).expect("start should work");
        assert!(timesheet.update_project(&design, "Branding", "#ff0000").expect("update"));
        let running: TimeEntry = read_json(timesheet.store(), CURRENT_ENTRY_KEY)
            .expect("read")
            .expect("running entry stored");
        assert_eq!(running.project_name, "Branding");

        timesheet.stop_timer(t0() + Duration::seconds(60)).expect("stop should work");
        assert!(timesheet.update_project(&design, "Brand", "#ff0000").expect("update"));
        timesheet.save_entry().expect("save should work");

        let stored: Vec<TimeEntry> = read_json(timesheet.store(), ENTRIES_KEY)
            .expect("read")
            .expect("entries stored");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].project_name, "Brand");
    }

    #[test]
    fn deleting_a_project_keeps_its_entries() {
        let (mut timesheet, design) = fresh();
        record(&mut timesheet, &design, t0(), 60);
        record(&mut timesheet, &design, t0() + Duration::hours(1), 120);
        let before = timesheet.entries().clone();

        assert!(timesheet.delete_project(&design).expect("delete"));
        assert!(!timesheet.delete_project(&design).expect("second delete is a no-op"));
        assert_eq!(timesheet.entries(), &before);

        let report = timesheet.report(&EntryFilter::default());
        let bucket = report
            .projects
            .iter()
            .find(|bucket| bucket.project_id == design)
            .expect("bucket for deleted project");
        assert_eq!(bucket.name, "Design");
        assert_eq!(bucket.entries, 2);
    }

    #[test]
    fn history_edits_and_deletes_are_flushed() {
        let (mut timesheet, design) = fresh();
        let first = record(&mut timesheet, &design, t0(), 600);
        let second = record(&mut timesheet, &design, t0() + Duration::hours(1), 600);

        assert!(timesheet.edit_entry_duration(&first, 1, 0, 0).expect("edit"));
        assert!(!timesheet.edit_entry_duration("missing", 1, 0, 0).expect("no-op"));
        assert!(timesheet.delete_entry(&second).expect("delete"));
        assert!(!timesheet.delete_entry(&second).expect("no-op"));

        let stored: Vec<TimeEntry> = read_json(timesheet.store(), ENTRIES_KEY)
            .expect("read")
            .expect("entries stored");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].duration, 600);
        assert_eq!(stored[0].edited_duration, Some(3600));
    }

    #[test]
    fn oversized_history_edit_counts_as_zero() {
        let (mut timesheet, design) = fresh();
        let first = record(&mut timesheet, &design, t0(), 60);
        record(&mut timesheet, &design, t0() + Duration::hours(1), 60);

        assert!(timesheet.edit_entry_duration(&first, 3_000_000_000_000_000, 0, 0).expect("edit"));
        assert_eq!(timesheet.entries().get(&first).expect("entry").effective_duration(), 0);

        let report = timesheet.report(&EntryFilter::default());
        assert_eq!(report.total_seconds, 60);
    }

    /// Memory store whose slot removal can be switched to fail.
    #[derive(Debug, Default)]
    struct StickyStore {
        inner: MemoryStore,
        fail_remove: bool,
    }

    impl KeyValueStore for StickyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: String) -> Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            if self.fail_remove {
                return Err(std::io::Error::other("slot is locked").into());
            }
            self.inner.remove(key)
        }
    }

    #[test]
    fn failed_slot_clear_keeps_the_entry_staged_and_uncommitted() {
        let mut timesheet = Timesheet::load(StickyStore::default(), t0()).expect("load should work");
        let project_id = timesheet.projects().as_slice()[0].id.clone();
        timesheet.start_timer(&project_id, t0()).expect("start should work");
        timesheet.stop_timer(t0() + Duration::seconds(60)).expect("stop should work");

        timesheet.store.fail_remove = true;
        assert!(matches!(timesheet.save_entry(), Err(TimesheetError::Io(_))));
        assert!(matches!(timesheet.session(), Session::Stopped(_)));
        assert!(timesheet.entries().is_empty());
        assert_eq!(timesheet.store().get(ENTRIES_KEY).expect("read"), None);

        timesheet.store.fail_remove = false;
        timesheet.save_entry().expect("retry should work");
        assert_eq!(timesheet.entries().len(), 1);
        assert!(timesheet.session().is_idle());
        assert_eq!(timesheet.store().get(CURRENT_ENTRY_KEY).expect("read"), None);
        let stored: Vec<TimeEntry> = read_json(timesheet.store(), ENTRIES_KEY)
            .expect("read")
            .expect("entries stored");
        assert_eq!(stored.len(), 1);
    }
}
