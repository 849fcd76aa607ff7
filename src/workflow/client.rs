use std::sync::Arc;

use dashmap::DashSet;
use uuid::Uuid;

use super::cache::ProjectCache;
use crate::db::{ProjectScope, Store};
use crate::error::PortalError;
use crate::models::{Profile, Project, ProjectUpdate, non_blank};

pub const RECENT_UPDATES_LIMIT: i64 = 5;

/// State behind a client's dashboard. Every query is scoped to the client's
/// own projects.
pub struct ClientWorkspace {
    store: Arc<dyn Store>,
    profile: Profile,
    cache: ProjectCache,
    updating: DashSet<Uuid>,
}

/// Clears a project's "updating" marker when the edit ends.
struct UpdatingGuard<'a> {
    set: &'a DashSet<Uuid>,
    id: Uuid,
}

impl Drop for UpdatingGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.id);
    }
}

impl ClientWorkspace {
    pub fn new(store: Arc<dyn Store>, profile: Profile) -> Self {
        Self {
            store,
            profile,
            cache: ProjectCache::new(),
            updating: DashSet::new(),
        }
    }

    fn scope(&self) -> ProjectScope {
        ProjectScope::Client(self.profile.id)
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn cache(&self) -> &ProjectCache {
        &self.cache
    }

    pub fn is_updating(&self, project_id: Uuid) -> bool {
        self.updating.contains(&project_id)
    }

    pub async fn load_projects(&self) -> Result<Vec<Project>, PortalError> {
        let projects = self.store.list_projects(self.scope()).await?;
        tracing::debug!(client_id = %self.profile.id, count = projects.len(), "Client projects loaded");
        self.cache.replace(projects.clone());
        Ok(projects)
    }

    pub async fn recent_updates(&self) -> Result<Vec<ProjectUpdate>, PortalError> {
        self.store.recent_updates(self.scope(), RECENT_UPDATES_LIMIT).await
    }

    /// Set or clear the deliverable link of one of the client's projects.
    /// Touches only `drive_link` and never notifies anyone.
    pub async fn update_drive_link(&self, project_id: Uuid, url: &str) -> Result<Project, PortalError> {
        if !self.updating.insert(project_id) {
            return Err(PortalError::Busy);
        }
        let _guard = UpdatingGuard {
            set: &self.updating,
            id: project_id,
        };

        let link = non_blank(Some(url));
        let project = self
            .store
            .update_drive_link(project_id, self.scope(), link.as_deref())
            .await
            .inspect_err(|e| tracing::error!(%project_id, error = %e, "Error updating drive link"))?;

        self.cache.upsert(project.clone());
        Ok(project)
    }
}
