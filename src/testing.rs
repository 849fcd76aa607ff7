//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::auth::provider::{AuthProvider, Listener, ListenerId, ListenerRegistry};
use crate::db::{ProjectScope, Store};
use crate::error::PortalError;
use crate::models::{
    AuthChange, AuthEvent, Identity, NewProfile, NewProject, NotificationRequest, NotificationResponse,
    Profile, Project, ProjectChanges, ProjectStatus, ProjectUpdate, Role, Session,
};
use crate::notify::Notifier;

pub fn identity(email: &str) -> Identity {
    Identity {
        id: Uuid::now_v7(),
        email: email.to_string(),
    }
}

pub fn session_for(user: &Identity) -> Session {
    Session {
        access_token: format!("access-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        expires_at: Utc::now() + chrono::Duration::hours(1),
        user: user.clone(),
    }
}

pub fn profile(email: &str, role: Role) -> Profile {
    profile_for(&identity(email), role)
}

pub fn profile_for(user: &Identity, role: Role) -> Profile {
    let now = Utc::now();
    Profile {
        id: user.id,
        email: user.email.clone(),
        role,
        full_name: None,
        company_name: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn project(client_id: Uuid, name: &str) -> Project {
    let now = Utc::now();
    Project {
        id: Uuid::now_v7(),
        client_id,
        name: name.to_string(),
        description: None,
        status: ProjectStatus::Planning,
        completion_percentage: 0,
        notes: None,
        drive_link: None,
        created_at: now,
        updated_at: now,
    }
}

async fn stall() {
    std::future::pending::<()>().await
}

#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<Uuid, Profile>>,
    hidden_reads: Mutex<HashMap<Uuid, u32>>,
    visibility_lag: AtomicU32,
    projects: Mutex<Vec<Project>>,
    updates: Mutex<Vec<ProjectUpdate>>,
    profile_lookups: AtomicUsize,
    project_writes: AtomicUsize,
    fail_lookups: AtomicBool,
    stall_lookups: AtomicBool,
    lookup_delay: Mutex<Option<Duration>>,
    next_lookup_delay: Mutex<Option<Duration>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_profile(&self, profile: Profile) {
        self.profiles.lock().insert(profile.id, profile);
    }

    pub fn put_project(&self, project: Project) {
        self.projects.lock().push(project);
    }

    pub fn put_update(&self, update: ProjectUpdate) {
        self.updates.lock().push(update);
    }

    pub fn project(&self, id: Uuid) -> Option<Project> {
        self.projects.lock().iter().find(|p| p.id == id).cloned()
    }

    /// Newly inserted profiles stay invisible for this many reads.
    pub fn lag_profile_visibility(&self, reads: u32) {
        self.visibility_lag.store(reads, Ordering::SeqCst);
    }

    pub fn fail_profile_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn stall_profile_lookups(&self, stall: bool) {
        self.stall_lookups.store(stall, Ordering::SeqCst);
    }

    pub fn delay_profile_lookups(&self, delay: Duration) {
        *self.lookup_delay.lock() = Some(delay);
    }

    /// Delay only the next profile lookup.
    pub fn delay_next_profile_lookup(&self, delay: Duration) {
        *self.next_lookup_delay.lock() = Some(delay);
    }

    pub fn fail_project_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn profile_lookups(&self) -> usize {
        self.profile_lookups.load(Ordering::SeqCst)
    }

    pub fn project_writes(&self) -> usize {
        self.project_writes.load(Ordering::SeqCst)
    }

    fn begin_write(&self) -> Result<(), PortalError> {
        self.project_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortalError::Query("write rejected".to_string()));
        }
        Ok(())
    }

    fn visible(&self, project: &Project, scope: ProjectScope) -> bool {
        scope.client_id().is_none_or(|client_id| project.client_id == client_id)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, PortalError> {
        self.profile_lookups.fetch_add(1, Ordering::SeqCst);

        if self.stall_lookups.load(Ordering::SeqCst) {
            stall().await;
        }
        let delay = self.next_lookup_delay.lock().take().or(*self.lookup_delay.lock());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(PortalError::Query("connection reset".to_string()));
        }

        if let Some(remaining) = self.hidden_reads.lock().get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
        }
        Ok(self.profiles.lock().get(&id).cloned())
    }

    async fn insert_profile(&self, new: &NewProfile) -> Result<Profile, PortalError> {
        // A real insert suspends; let tasks woken by the sign-up event run.
        tokio::task::yield_now().await;
        let now = Utc::now();
        let profile = Profile {
            id: new.id,
            email: new.email.clone(),
            role: new.role,
            full_name: new.full_name.clone(),
            company_name: new.company_name.clone(),
            created_at: now,
            updated_at: now,
        };
        self.hidden_reads
            .lock()
            .insert(new.id, self.visibility_lag.load(Ordering::SeqCst));
        self.put_profile(profile.clone());
        Ok(profile)
    }

    async fn list_clients(&self) -> Result<Vec<Profile>, PortalError> {
        let mut clients: Vec<_> = self
            .profiles
            .lock()
            .values()
            .filter(|p| p.role == Role::Client)
            .cloned()
            .collect();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(clients)
    }

    async fn list_projects(&self, scope: ProjectScope) -> Result<Vec<Project>, PortalError> {
        let mut projects: Vec<_> = self
            .projects
            .lock()
            .iter()
            .filter(|p| self.visible(p, scope))
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn insert_project(&self, new: &NewProject) -> Result<Project, PortalError> {
        self.begin_write()?;
        let now = Utc::now();
        let project = Project {
            id: Uuid::now_v7(),
            client_id: new.client_id,
            name: new.name.clone(),
            description: new.description.clone(),
            status: new.status,
            completion_percentage: new.completion_percentage,
            notes: new.notes.clone(),
            drive_link: None,
            created_at: now,
            updated_at: now,
        };
        self.put_project(project.clone());
        Ok(project)
    }

    async fn update_project(&self, id: Uuid, changes: &ProjectChanges) -> Result<Project, PortalError> {
        self.begin_write()?;
        let mut projects = self.projects.lock();
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PortalError::NotFound("Project".to_string()))?;
        changes.apply_to(project);
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn update_drive_link(
        &self,
        id: Uuid,
        scope: ProjectScope,
        drive_link: Option<&str>,
    ) -> Result<Project, PortalError> {
        self.begin_write()?;
        let mut projects = self.projects.lock();
        let project = projects
            .iter_mut()
            .find(|p| p.id == id && scope.client_id().is_none_or(|c| p.client_id == c))
            .ok_or_else(|| PortalError::NotFound("Project".to_string()))?;
        project.drive_link = drive_link.map(str::to_string);
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: Uuid) -> Result<(), PortalError> {
        self.begin_write()?;
        let mut projects = self.projects.lock();
        let before = projects.len();
        projects.retain(|p| p.id != id);
        if projects.len() == before {
            return Err(PortalError::NotFound("Project".to_string()));
        }
        Ok(())
    }

    async fn recent_updates(&self, scope: ProjectScope, limit: i64) -> Result<Vec<ProjectUpdate>, PortalError> {
        let projects = self.projects.lock().clone();
        let mut updates: Vec<_> = self
            .updates
            .lock()
            .iter()
            .filter(|u| {
                projects
                    .iter()
                    .any(|p| p.id == u.project_id && self.visible(p, scope))
            })
            .cloned()
            .collect();
        updates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        updates.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(updates)
    }
}

#[derive(Default)]
pub struct MemoryAuthProvider {
    accounts: Mutex<HashMap<String, (Identity, String)>>,
    session: Mutex<Option<Session>>,
    registry: ListenerRegistry,
    unsubscribes: AtomicUsize,
    fail_get_session: AtomicBool,
    stall_get_session: AtomicBool,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, email: &str, password: &str) -> Identity {
        let user = identity(email);
        self.accounts
            .lock()
            .insert(email.to_string(), (user.clone(), password.to_string()));
        user
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock() = session;
    }

    pub fn fail_get_session(&self) {
        self.fail_get_session.store(true, Ordering::SeqCst);
    }

    pub fn stall_get_session(&self) {
        self.stall_get_session.store(true, Ordering::SeqCst);
    }

    pub async fn emit(&self, change: AuthChange) {
        self.registry.emit(change).await;
    }

    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    async fn start_session(&self, user: Identity) -> Session {
        let session = session_for(&user);
        self.set_session(Some(session.clone()));
        self.emit(AuthChange {
            event: AuthEvent::SignedIn,
            session: Some(session.clone()),
        })
        .await;
        session
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn get_session(&self) -> Result<Option<Session>, PortalError> {
        if self.stall_get_session.load(Ordering::SeqCst) {
            stall().await;
        }
        if self.fail_get_session.load(Ordering::SeqCst) {
            return Err(PortalError::Auth("session storage unavailable".to_string()));
        }
        Ok(self.session.lock().clone())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, PortalError> {
        if self.accounts.lock().contains_key(email) {
            return Err(PortalError::Auth("User already registered".to_string()));
        }
        let user = self.add_account(email, password);
        self.start_session(user.clone()).await;
        Ok(user)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, PortalError> {
        let account = self.accounts.lock().get(email).cloned();
        match account {
            Some((user, stored)) if stored == password => Ok(self.start_session(user).await),
            _ => Err(PortalError::Auth("Invalid login credentials".to_string())),
        }
    }

    async fn sign_out(&self) -> Result<(), PortalError> {
        self.set_session(None);
        self.emit(AuthChange {
            event: AuthEvent::SignedOut,
            session: None,
        })
        .await;
        Ok(())
    }

    fn on_auth_state_change(&self) -> Listener {
        self.registry.register()
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        self.registry.remove(id);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotificationRequest>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, request: &NotificationRequest) -> Result<NotificationResponse, PortalError> {
        self.sent.lock().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortalError::Notification("relay returned 500".to_string()));
        }
        Ok(NotificationResponse {
            success: true,
            message_id: format!("msg-{}", Uuid::now_v7()),
        })
    }
}
