use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};

use crate::domain::{TimeEntry, seconds_to_hours};
use crate::projects::ProjectRegistry;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DAILY_BUCKETS: usize = 30;
pub const WEEKLY_BUCKETS: usize = 8;

/// Project and inclusive day-range selection. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub project_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &TimeEntry) -> bool {
        if let Some(project_id) = &self.project_id {
            if &entry.project_id != project_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.date > to {
                return false;
            }
        }
        true
    }
}

/// Entries matching `filter`, most recent day first. Same-day entries keep source order.
pub fn filter_entries<'a>(entries: &'a [TimeEntry], filter: &EntryFilter) -> Vec<&'a TimeEntry> {
    let mut rows = entries
        .iter()
        .filter(|entry| filter.matches(entry))
        .collect::<Vec<_>>();
    rows.sort_by(|left, right| right.date.cmp(&left.date));
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let page = page.max(1);
    let start = ((page - 1).saturating_mul(page_size)).min(items.len());
    let end = page.saturating_mul(page_size).min(items.len());

    Page {
        items: &items[start..end],
        page,
        total_pages: items.len().div_ceil(page_size),
        total_items: items.len(),
    }
}

pub fn total_seconds(entries: &[&TimeEntry]) -> i64 {
    entries
        .iter()
        .fold(0_i64, |total, entry| total.saturating_add(entry.effective_duration()))
}

pub fn total_hours(entries: &[&TimeEntry]) -> f64 {
    seconds_to_hours(total_seconds(entries))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub seconds: i64,
    /// Seconds per project id within the day.
    pub by_project: BTreeMap<String, i64>,
}

impl DayBucket {
    pub fn hours(&self) -> f64 {
        seconds_to_hours(self.seconds)
    }
}

/// Per-day totals in ascending date order, limited to the latest `DAILY_BUCKETS` days.
pub fn daily_series(entries: &[&TimeEntry]) -> Vec<DayBucket> {
    let mut days = BTreeMap::<NaiveDate, DayBucket>::new();
    for entry in entries {
        let bucket = days.entry(entry.date).or_insert_with(|| DayBucket {
            date: entry.date,
            seconds: 0,
            by_project: BTreeMap::new(),
        });
        let seconds = entry.effective_duration();
        bucket.seconds = bucket.seconds.saturating_add(seconds);
        let project_seconds = bucket.by_project.entry(entry.project_id.clone()).or_insert(0);
        *project_seconds = project_seconds.saturating_add(seconds);
    }

    latest(days.into_values().collect(), DAILY_BUCKETS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBucket {
    pub project_id: String,
    pub name: String,
    pub color: String,
    pub seconds: i64,
    pub entries: usize,
}

impl ProjectBucket {
    pub fn hours(&self) -> f64 {
        seconds_to_hours(self.seconds)
    }
}

/// Totals grouped by project id, largest first.
///
/// Buckets are labelled with the project's current name. For deleted projects the
/// first snapshot name seen is used, which is the most recent one when `entries`
/// comes from [`filter_entries`].
pub fn project_series(entries: &[&TimeEntry], projects: &ProjectRegistry) -> Vec<ProjectBucket> {
    let mut order = Vec::<String>::new();
    let mut buckets = HashMap::<String, ProjectBucket>::new();
    for entry in entries {
        let bucket = buckets.entry(entry.project_id.clone()).or_insert_with(|| {
            order.push(entry.project_id.clone());
            let name = projects
                .get(&entry.project_id)
                .map(|project| project.name.clone())
                .unwrap_or_else(|| entry.project_name.clone());
            ProjectBucket {
                project_id: entry.project_id.clone(),
                name,
                color: projects.color_for(&entry.project_id).to_string(),
                seconds: 0,
                entries: 0,
            }
        });
        bucket.seconds = bucket.seconds.saturating_add(entry.effective_duration());
        bucket.entries += 1;
    }

    let mut rows = order
        .into_iter()
        .filter_map(|project_id| buckets.remove(&project_id))
        .collect::<Vec<_>>();
    rows.sort_by(|left, right| right.seconds.cmp(&left.seconds).then_with(|| left.name.cmp(&right.name)));
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekBucket {
    /// Sunday that opens the week.
    pub week_start: NaiveDate,
    pub seconds: i64,
}

impl WeekBucket {
    pub fn hours(&self) -> f64 {
        seconds_to_hours(self.seconds)
    }
}

pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_sunday().into())
}

/// Per-week totals in ascending order, limited to the latest `WEEKLY_BUCKETS` weeks.
pub fn weekly_series(entries: &[&TimeEntry]) -> Vec<WeekBucket> {
    let mut weeks = BTreeMap::<NaiveDate, i64>::new();
    for entry in entries {
        let seconds = weeks.entry(week_start(entry.date)).or_insert(0);
        *seconds = seconds.saturating_add(entry.effective_duration());
    }

    let rows = weeks
        .into_iter()
        .map(|(week_start, seconds)| WeekBucket { week_start, seconds })
        .collect();
    latest(rows, WEEKLY_BUCKETS)
}

fn latest<T>(mut rows: Vec<T>, limit: usize) -> Vec<T> {
    if rows.len() > limit {
        rows.drain(..rows.len() - limit);
    }
    rows
}

/// Everything the reporting views show for one filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub entry_count: usize,
    pub total_seconds: i64,
    pub daily: Vec<DayBucket>,
    pub projects: Vec<ProjectBucket>,
    pub weekly: Vec<WeekBucket>,
}

impl Report {
    pub fn build(entries: &[TimeEntry], projects: &ProjectRegistry, filter: &EntryFilter) -> Self {
        let rows = filter_entries(entries, filter);
        Self {
            entry_count: rows.len(),
            total_seconds: total_seconds(&rows),
            daily: daily_series(&rows),
            projects: project_series(&rows, projects),
            weekly: weekly_series(&rows),
        }
    }

    pub fn total_hours(&self) -> f64 {
        seconds_to_hours(self.total_seconds)
    }
}
