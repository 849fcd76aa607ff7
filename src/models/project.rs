use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    Review,
    WaitingFeedback,
    Completed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 5] = [
        ProjectStatus::Planning,
        ProjectStatus::InProgress,
        ProjectStatus::Review,
        ProjectStatus::WaitingFeedback,
        ProjectStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Review => "review",
            ProjectStatus::WaitingFeedback => "waiting_feedback",
            ProjectStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown project status '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub completion_percentage: i32,
    pub notes: Option<String>,
    pub drive_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub completion_percentage: i32,
    pub notes: Option<String>,
}

/// The full mutable field set written by an admin edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectChanges {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub completion_percentage: i32,
    pub notes: Option<String>,
    pub drive_link: Option<String>,
}

impl ProjectChanges {
    /// Takes the edited project, trimming text and storing blanks as NULL.
    pub fn from_edit(project: &Project) -> Self {
        Self {
            name: project.name.trim().to_string(),
            description: non_blank(project.description.as_deref()),
            status: project.status,
            completion_percentage: project.completion_percentage,
            notes: non_blank(project.notes.as_deref()),
            drive_link: non_blank(project.drive_link.as_deref()),
        }
    }

    pub fn apply_to(&self, project: &mut Project) {
        project.name = self.name.clone();
        project.description = self.description.clone();
        project.status = self.status;
        project.completion_percentage = self.completion_percentage;
        project.notes = self.notes.clone();
        project.drive_link = self.drive_link.clone();
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
