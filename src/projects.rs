use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{FALLBACK_COLOR, PROJECT_PALETTE, Project, generate_id};
use crate::error::{Result, TimesheetError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRegistry {
    projects: Vec<Project>,
}

impl ProjectRegistry {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn as_slice(&self) -> &[Project] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    /// Looks a project up by id, then by case-insensitive name when exactly one matches.
    pub fn resolve(&self, key: &str) -> Option<&Project> {
        if let Some(project) = self.get(key) {
            return Some(project);
        }

        let mut matches = self
            .projects
            .iter()
            .filter(|project| project.name.eq_ignore_ascii_case(key.trim()));
        match (matches.next(), matches.next()) {
            (Some(project), None) => Some(project),
            _ => None,
        }
    }

    /// Color for a project id, falling back for ids that no longer resolve.
    pub fn color_for(&self, id: &str) -> &str {
        self.get(id)
            .map(|project| project.color.as_str())
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn add(&mut self, name: &str, color: Option<String>, now: DateTime<Utc>) -> Result<&Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TimesheetError::EmptyProjectName);
        }

        let color = color
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| PROJECT_PALETTE[self.projects.len() % PROJECT_PALETTE.len()].to_string());
        let project = Project {
            id: generate_id(),
            name: name.to_string(),
            color,
            created_at: now,
        };
        info!(project_id = %project.id, name = %project.name, "project added");
        self.projects.push(project);

        Ok(&self.projects[self.projects.len() - 1])
    }

    /// Renames and recolors a project. Returns `false` when the id is unknown.
    pub fn update(&mut self, id: &str, name: &str, color: &str) -> Result<bool> {
        let Some(project) = self.projects.iter_mut().find(|project| project.id == id) else {
            warn!(project_id = %id, "ignoring update of unknown project");
            return Ok(false);
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(TimesheetError::EmptyProjectName);
        }

        project.name = name.to_string();
        project.color = color.trim().to_string();
        info!(project_id = %id, name = %project.name, "project updated");
        Ok(true)
    }

    /// Removes the project record only; entries keep their snapshot of the name.
    pub fn delete(&mut self, id: &str) -> Option<Project> {
        let Some(index) = self.projects.iter().position(|project| project.id == id) else {
            warn!(project_id = %id, "ignoring delete of unknown project");
            return None;
        };

        let project = self.projects.remove(index);
        info!(project_id = %id, name = %project.name, "project deleted");
        Some(project)
    }
}
