use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::cache::ProjectCache;
use crate::db::{ProjectScope, Store};
use crate::error::PortalError;
use crate::models::{NewProject, Profile, Project, ProjectChanges, ProjectStatus, UpdateType, non_blank};
use crate::notify::{self, Notifier};

/// A client with the projects that belong to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWithProjects {
    pub client: Profile,
    pub projects: Vec<Project>,
}

/// Headline counts for the admin dashboard, over the loaded clients only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_clients: usize,
    /// Projects in progress.
    pub active_projects: usize,
    /// Projects waiting on client feedback.
    pub pending_feedback: usize,
    pub completed: usize,
}

/// Input of the "add project" form.
#[derive(Debug, Clone, Default)]
pub struct NewProjectForm {
    pub client_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    /// Defaults to [`ProjectStatus::Planning`].
    pub status: Option<ProjectStatus>,
    pub completion_percentage: i32,
    pub notes: String,
}

/// Result of a successful update. The notification, if any, is still being
/// delivered when this is returned.
#[derive(Debug)]
pub struct UpdateReceipt {
    pub project: Project,
    pub notification: Option<UpdateType>,
    task: Option<JoinHandle<bool>>,
}

impl UpdateReceipt {
    /// Wait for the notification attempt. `false` if none was sent or it failed.
    pub async fn notified(self) -> bool {
        match self.task {
            Some(task) => task.await.unwrap_or(false),
            None => false,
        }
    }
}

/// State behind the admin views.
pub struct AdminWorkspace {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    clients: RwLock<Vec<Profile>>,
    cache: ProjectCache,
    submitting: AtomicBool,
}

struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn validate(name: &str, completion_percentage: i32) -> Result<(), PortalError> {
    if name.trim().is_empty() {
        return Err(PortalError::Validation("Please enter a project name".to_string()));
    }
    if !(0..=100).contains(&completion_percentage) {
        return Err(PortalError::Validation(
            "Completion percentage must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}

impl AdminWorkspace {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            clients: RwLock::new(Vec::new()),
            cache: ProjectCache::new(),
            submitting: AtomicBool::new(false),
        }
    }

    fn begin_submit(&self) -> Result<SubmitGuard<'_>, PortalError> {
        self.submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| SubmitGuard(&self.submitting))
            .map_err(|_| {
                tracing::debug!("Already submitting, ignoring request");
                PortalError::Busy
            })
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> &ProjectCache {
        &self.cache
    }

    /// Fetch every client and project and rebuild the local view.
    pub async fn load(&self) -> Result<Vec<ClientWithProjects>, PortalError> {
        let clients = self.store.list_clients().await?;
        let projects = self.store.list_projects(ProjectScope::All).await?;
        tracing::info!(clients = clients.len(), projects = projects.len(), "Admin data loaded");

        *self.clients.write() = clients;
        self.cache.replace(projects);
        Ok(self.clients_with_projects())
    }

    /// Grouped view of the local state, without a fetch.
    pub fn clients_with_projects(&self) -> Vec<ClientWithProjects> {
        self.clients
            .read()
            .iter()
            .map(|client| ClientWithProjects {
                client: client.clone(),
                projects: self.cache.for_client(client.id),
            })
            .collect()
    }

    pub fn stats(&self) -> DashboardStats {
        let grouped = self.clients_with_projects();
        let count = |status: ProjectStatus| {
            grouped
                .iter()
                .flat_map(|c| &c.projects)
                .filter(|p| p.status == status)
                .count()
        };
        DashboardStats {
            total_clients: grouped.len(),
            active_projects: count(ProjectStatus::InProgress),
            pending_feedback: count(ProjectStatus::WaitingFeedback),
            completed: count(ProjectStatus::Completed),
        }
    }

    pub async fn add_project(&self, form: NewProjectForm) -> Result<Project, PortalError> {
        let _guard = self.begin_submit()?;

        validate(&form.name, form.completion_percentage)?;
        let client_id = form
            .client_id
            .ok_or_else(|| PortalError::Validation("Please select a client".to_string()))?;

        let project = self
            .store
            .insert_project(&NewProject {
                client_id,
                name: form.name.trim().to_string(),
                description: non_blank(Some(&form.description)),
                status: form.status.unwrap_or_default(),
                completion_percentage: form.completion_percentage,
                notes: non_blank(Some(&form.notes)),
            })
            .await?;

        tracing::info!(project_id = %project.id, %client_id, "Project created");
        self.cache.upsert(project.clone());
        Ok(project)
    }

    /// Persist an edited project and report the most significant change to
    /// its client. Returns before the email is delivered; delivery failures
    /// are logged and never undo the update.
    pub async fn update_project(&self, edited: Project) -> Result<UpdateReceipt, PortalError> {
        let _guard = self.begin_submit()?;

        validate(&edited.name, edited.completion_percentage)?;

        let before = self.cache.get(edited.id).ok_or_else(|| {
            tracing::error!(project_id = %edited.id, "Original project not found");
            PortalError::NotFound("Project".to_string())
        })?;
        // Ownership is not editable here, so the stored row decides the recipient.
        let client = self.client(before.client_id).await?;

        let changes = ProjectChanges::from_edit(&edited);
        let project = self.store.update_project(edited.id, &changes).await?;
        tracing::info!(project_id = %project.id, "Project updated");
        self.cache.upsert(project.clone());

        let Some(change) = notify::classify(&before, &project) else {
            tracing::debug!(project_id = %project.id, "No email notification needed");
            return Ok(UpdateReceipt {
                project,
                notification: None,
                task: None,
            });
        };

        let request = notify::request_for(&change, &client, &project);
        let notifier = self.notifier.clone();
        let task = tokio::spawn(async move { notify::deliver(notifier.as_ref(), request).await });

        Ok(UpdateReceipt {
            project,
            notification: Some(change.update_type()),
            task: Some(task),
        })
    }

    /// First step of a delete. Nothing is removed until the returned
    /// [`PendingDelete`] is confirmed.
    pub fn request_delete(&self, project_id: Uuid) -> PendingDelete<'_> {
        PendingDelete {
            workspace: self,
            project_id,
        }
    }

    async fn client(&self, client_id: Uuid) -> Result<Profile, PortalError> {
        let cached = self.clients.read().iter().find(|c| c.id == client_id).cloned();
        match cached {
            Some(client) => Ok(client),
            None => self
                .store
                .find_profile(client_id)
                .await?
                .ok_or_else(|| PortalError::NotFound("Client".to_string())),
        }
    }
}

/// An unconfirmed delete.
#[must_use = "a delete only happens once confirmed"]
pub struct PendingDelete<'a> {
    workspace: &'a AdminWorkspace,
    project_id: Uuid,
}

impl PendingDelete<'_> {
    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub async fn confirm(self) -> Result<(), PortalError> {
        self.workspace.store.delete_project(self.project_id).await?;
        self.workspace.cache.remove(self.project_id);
        tracing::info!(project_id = %self.project_id, "Project deleted");
        Ok(())
    }

    pub fn cancel(self) {
        tracing::debug!(project_id = %self.project_id, "Delete cancelled");
    }
}
