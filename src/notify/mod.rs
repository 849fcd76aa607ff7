//! Project change notifications.
//!
//! An admin edit produces at most one email. [`classify`] picks it with a
//! strict priority: status change, then a progress jump of at least
//! [`PROGRESS_THRESHOLD`] points, then a substantial note.

mod http;

pub use http::HttpNotifier;

use async_trait::async_trait;

use crate::error::PortalError;
use crate::models::{NotificationRequest, NotificationResponse, Profile, Project, ProjectStatus, UpdateType};

pub const PROGRESS_THRESHOLD: u32 = 10;

/// Notes must be longer than this (in characters) to warrant an email.
pub const NOTE_MIN_CHARS: usize = 20;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResponse, PortalError>;
}

/// The one change an update is reported as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Status { from: ProjectStatus, to: ProjectStatus },
    Progress { from: i32, to: i32 },
    Notes(String),
}

impl Change {
    pub fn update_type(&self) -> UpdateType {
        match self {
            Change::Status { .. } => UpdateType::Status,
            Change::Progress { .. } => UpdateType::Progress,
            Change::Notes(_) => UpdateType::General,
        }
    }
}

pub fn classify(before: &Project, after: &Project) -> Option<Change> {
    if before.status != after.status {
        return Some(Change::Status {
            from: before.status,
            to: after.status,
        });
    }

    if after.completion_percentage.abs_diff(before.completion_percentage) >= PROGRESS_THRESHOLD {
        return Some(Change::Progress {
            from: before.completion_percentage,
            to: after.completion_percentage,
        });
    }

    match &after.notes {
        Some(notes) if after.notes != before.notes && notes.chars().count() > NOTE_MIN_CHARS => {
            Some(Change::Notes(notes.clone()))
        }
        _ => None,
    }
}

/// `in_progress` -> `In Progress`.
pub fn format_status(status: &str) -> String {
    status
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn request_for(change: &Change, client: &Profile, project: &Project) -> NotificationRequest {
    let (old_value, new_value, message) = match change {
        Change::Status { from, to } => (
            Some(format_status(from.as_str())),
            Some(format_status(to.as_str())),
            project.notes.clone(),
        ),
        Change::Progress { from, to } => (Some(from.to_string()), Some(to.to_string()), project.notes.clone()),
        Change::Notes(notes) => (None, None, Some(notes.clone())),
    };

    NotificationRequest {
        to: client.email.clone(),
        client_name: client.display_name().to_string(),
        project_name: project.name.clone(),
        update_type: change.update_type(),
        old_value,
        new_value,
        message,
    }
}

/// Send and log the outcome. Failures never reach the caller.
pub async fn deliver(notifier: &dyn Notifier, request: NotificationRequest) -> bool {
    match notifier.send(&request).await {
        Ok(response) => {
            tracing::info!(
                to = %request.to,
                update_type = ?request.update_type,
                message_id = %response.message_id,
                "Project update email sent"
            );
            true
        }
        Err(e) => {
            tracing::error!(to = %request.to, error = %e, "Failed to send email notification");
            false
        }
    }
}
