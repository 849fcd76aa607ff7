use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::Project;

/// Local copy of the project list.
///
/// Mutations merge into the list by id without refetching; only
/// [`replace`](ProjectCache::replace) (a full load) bumps the version, so a
/// reader can tell whether it is looking at the same snapshot.
#[derive(Default)]
pub struct ProjectCache {
    inner: RwLock<Snapshot>,
}

#[derive(Default)]
struct Snapshot {
    projects: Vec<Project>,
    version: u64,
}

impl ProjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, projects: Vec<Project>) -> u64 {
        let mut snap = self.inner.write();
        snap.projects = projects;
        snap.version += 1;
        snap.version
    }

    /// Replace the entry with the same id, or prepend a new one.
    pub fn upsert(&self, project: Project) {
        let mut snap = self.inner.write();
        match snap.projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => *existing = project,
            None => snap.projects.insert(0, project),
        }
    }

    pub fn remove(&self, id: Uuid) -> Option<Project> {
        let mut snap = self.inner.write();
        let idx = snap.projects.iter().position(|p| p.id == id)?;
        Some(snap.projects.remove(idx))
    }

    pub fn get(&self, id: Uuid) -> Option<Project> {
        self.inner.read().projects.iter().find(|p| p.id == id).cloned()
    }

    pub fn all(&self) -> Vec<Project> {
        self.inner.read().projects.clone()
    }

    pub fn for_client(&self, client_id: Uuid) -> Vec<Project> {
        self.inner
            .read()
            .projects
            .iter()
            .filter(|p| p.client_id == client_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }
}
