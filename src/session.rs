use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{Project, TimeEntry, calendar_day, duration_from_parts, generate_id};
use crate::error::{Result, TimesheetError};

/// The single timing session. At most one entry is ever running or staged.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Session {
    #[default]
    Idle,
    Running(RunningSession),
    /// Stopped but not yet committed; the duration may still be corrected.
    Stopped(TimeEntry),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunningSession {
    pub id: String,
    pub project_id: String,
    pub project_name: String,
    pub start_time: DateTime<Utc>,
}

impl RunningSession {
    /// Whole seconds since the stored start time. Never persisted.
    pub fn elapsed(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_seconds().max(0)
    }
}

impl Session {
    pub fn state_name(&self) -> &'static str {
        match self {
            Session::Idle => "idle",
            Session::Running(_) => "running",
            Session::Stopped(_) => "stopped",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Session::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Session::Running(_))
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            Session::Idle => None,
            Session::Running(running) => Some(&running.project_id),
            Session::Stopped(entry) => Some(&entry.project_id),
        }
    }

    /// Copies a renamed project's name onto the running or staged entry.
    pub fn rename_project(&mut self, project_id: &str, name: &str) -> bool {
        let current = match self {
            Session::Idle => return false,
            Session::Running(running) if running.project_id == project_id => &mut running.project_name,
            Session::Stopped(entry) if entry.project_id == project_id => &mut entry.project_name,
            _ => return false,
        };
        *current = name.to_string();
        true
    }

    /// Starts timing `project`. A stopped entry that was never saved is dropped.
    pub fn start(&mut self, project: &Project, now: DateTime<Utc>) -> Result<()> {
        match self {
            Session::Running(_) => return Err(TimesheetError::AlreadyRunning),
            Session::Stopped(staged) => {
                info!(entry_id = %staged.id, "discarding unsaved entry");
            }
            Session::Idle => {}
        }

        let running = RunningSession {
            id: generate_id(),
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            start_time: now,
        };
        info!(entry_id = %running.id, project_id = %project.id, "timer started");
        *self = Session::Running(running);
        Ok(())
    }

    /// Seconds to display: live while running, the effective duration once stopped.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<i64> {
        match self {
            Session::Idle => None,
            Session::Running(running) => Some(running.elapsed(now)),
            Session::Stopped(entry) => Some(entry.effective_duration()),
        }
    }

    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<&TimeEntry> {
        let Session::Running(running) = self else {
            return Err(TimesheetError::NotRunning);
        };

        let end_time = now.max(running.start_time);
        let entry = TimeEntry {
            id: running.id.clone(),
            project_id: running.project_id.clone(),
            project_name: running.project_name.clone(),
            start_time: running.start_time,
            end_time: Some(end_time),
            duration: running.elapsed(end_time),
            date: calendar_day(running.start_time),
            is_running: false,
            edited_duration: None,
        };
        info!(entry_id = %entry.id, duration = entry.duration, "timer stopped");
        *self = Session::Stopped(entry);

        match &*self {
            Session::Stopped(entry) => Ok(entry),
            _ => unreachable!("session was just stopped"),
        }
    }

    /// Overrides the staged entry's duration; returns the new effective seconds.
    pub fn edit_duration(&mut self, hours: u64, minutes: u64, seconds: u64) -> Result<i64> {
        let Session::Stopped(entry) = self else {
            return Err(TimesheetError::NotStopped);
        };

        let edited = duration_from_parts(hours, minutes, seconds);
        entry.edited_duration = Some(edited);
        info!(entry_id = %entry.id, edited_duration = edited, "staged duration edited");
        Ok(edited)
    }

    /// Hands the staged entry over for commit and returns to idle.
    pub fn save(&mut self) -> Result<TimeEntry> {
        if !matches!(self, Session::Stopped(_)) {
            return Err(TimesheetError::NotStopped);
        }

        match std::mem::take(self) {
            Session::Stopped(entry) => Ok(entry),
            _ => unreachable!("session was checked to be stopped"),
        }
    }

    /// The stored shape of the current entry, `None` when idle.
    pub fn to_entry(&self) -> Option<TimeEntry> {
        match self {
            Session::Idle => None,
            Session::Running(running) => Some(TimeEntry {
                id: running.id.clone(),
                project_id: running.project_id.clone(),
                project_name: running.project_name.clone(),
                start_time: running.start_time,
                end_time: None,
                duration: 0,
                date: calendar_day(running.start_time),
                is_running: true,
                edited_duration: None,
            }),
            Session::Stopped(entry) => Some(entry.clone()),
        }
    }

    pub fn from_entry(entry: Option<TimeEntry>) -> Self {
        match entry {
            None => Session::Idle,
            Some(entry) if entry.is_running => Session::Running(RunningSession {
                id: entry.id,
                project_id: entry.project_id,
                project_name: entry.project_name,
                start_time: entry.start_time,
            }),
            Some(entry) => Session::Stopped(entry),
        }
    }
}
