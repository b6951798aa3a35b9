use chrono::{DateTime, NaiveDate, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 8;

/// Display color for entries whose project no longer exists.
pub const FALLBACK_COLOR: &str = "#94a3b8";

pub const PROJECT_PALETTE: [&str; 8] = [
    "#3b82f6", "#8b5cf6", "#10b981", "#f59e0b", "#ef4444", "#ec4899", "#06b6d4", "#84cc16",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// A tracked interval of work on a project.
///
/// `duration` is fixed when the timer stops. A later manual correction is kept
/// alongside it in `edited_duration` so both values remain visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    pub project_id: String,
    pub project_name: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub duration: i64,
    pub date: NaiveDate,
    pub is_running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_duration: Option<i64>,
}

impl TimeEntry {
    /// Seconds used for every display and aggregation.
    pub fn effective_duration(&self) -> i64 {
        self.edited_duration.unwrap_or(self.duration)
    }

    pub fn is_edited(&self) -> bool {
        self.edited_duration.is_some()
    }
}

pub fn calendar_day(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// Projects seeded when storage has never held a project list.
pub fn default_projects(now: DateTime<Utc>) -> Vec<Project> {
    [("Development", 0), ("Design", 1), ("Meetings", 2)]
        .into_iter()
        .map(|(name, palette_index)| Project {
            id: generate_id(),
            name: name.to_string(),
            color: PROJECT_PALETTE[palette_index].to_string(),
            created_at: now,
        })
        .collect()
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Total seconds for an `h:m:s` edit. A total that does not fit counts as zero,
/// like any other unusable duration input.
pub fn duration_from_parts(hours: u64, minutes: u64, seconds: u64) -> i64 {
    hours
        .checked_mul(3600)
        .and_then(|total| total.checked_add(minutes.checked_mul(60)?))
        .and_then(|total| total.checked_add(seconds))
        .and_then(|total| i64::try_from(total).ok())
        .unwrap_or(0)
}

/// Lenient numeric field parsing: anything that is not a non-negative integer counts as zero.
pub fn parse_component(input: &str) -> u64 {
    input.trim().parse().unwrap_or(0)
}

pub fn seconds_to_hours(seconds: i64) -> f64 {
    seconds as f64 / 3600.0
}

pub fn format_duration(seconds: i64) -> String {
    let total_seconds = seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
