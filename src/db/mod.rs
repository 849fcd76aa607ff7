//! Persistence: per-table queries plus the [`Store`] seam the auth and
//! workflow layers talk to.

pub mod identities;
pub mod profiles;
pub mod project_updates;
pub mod projects;
pub mod refresh_tokens;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::error::PortalError;
use crate::models::{NewProfile, NewProject, Profile, Project, ProjectChanges, ProjectUpdate, Role};

/// Row visibility: clients see only their own projects, admins see all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectScope {
    All,
    Client(Uuid),
}

impl ProjectScope {
    pub fn for_profile(profile: &Profile) -> Self {
        match profile.role {
            Role::Admin => ProjectScope::All,
            Role::Client => ProjectScope::Client(profile.id),
        }
    }

    pub fn client_id(&self) -> Option<Uuid> {
        match self {
            ProjectScope::All => None,
            ProjectScope::Client(id) => Some(*id),
        }
    }
}

/// Query interface over `profiles`, `projects` and `project_updates`.
///
/// "No row found" is `Ok(None)` (or `NotFound` for writes), never `Query`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, PortalError>;

    async fn insert_profile(&self, profile: &NewProfile) -> Result<Profile, PortalError>;

    /// Client profiles, newest first.
    async fn list_clients(&self) -> Result<Vec<Profile>, PortalError>;

    /// Projects visible in `scope`, newest first.
    async fn list_projects(&self, scope: ProjectScope) -> Result<Vec<Project>, PortalError>;

    async fn insert_project(&self, project: &NewProject) -> Result<Project, PortalError>;

    async fn update_project(&self, id: Uuid, changes: &ProjectChanges) -> Result<Project, PortalError>;

    async fn update_drive_link(
        &self,
        id: Uuid,
        scope: ProjectScope,
        drive_link: Option<&str>,
    ) -> Result<Project, PortalError>;

    async fn delete_project(&self, id: Uuid) -> Result<(), PortalError>;

    /// Most recent updates visible in `scope`, newest first.
    async fn recent_updates(&self, scope: ProjectScope, limit: i64) -> Result<Vec<ProjectUpdate>, PortalError>;
}

/// [`Store`] backed by Postgres.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, PortalError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), PortalError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PortalError::Query(format!("migration failed: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, PortalError> {
        Ok(profiles::find_by_id(&self.pool, id).await?)
    }

    async fn insert_profile(&self, profile: &NewProfile) -> Result<Profile, PortalError> {
        Ok(profiles::create(&self.pool, profile).await?)
    }

    async fn list_clients(&self) -> Result<Vec<Profile>, PortalError> {
        Ok(profiles::list_by_role(&self.pool, Role::Client).await?)
    }

    async fn list_projects(&self, scope: ProjectScope) -> Result<Vec<Project>, PortalError> {
        let projects = match scope {
            ProjectScope::All => projects::list_all(&self.pool).await?,
            ProjectScope::Client(client_id) => projects::list_for_client(&self.pool, client_id).await?,
        };
        Ok(projects)
    }

    async fn insert_project(&self, project: &NewProject) -> Result<Project, PortalError> {
        Ok(projects::create(&self.pool, project).await?)
    }

    async fn update_project(&self, id: Uuid, changes: &ProjectChanges) -> Result<Project, PortalError> {
        projects::update(&self.pool, id, changes)
            .await?
            .ok_or_else(|| PortalError::NotFound("Project".to_string()))
    }

    async fn update_drive_link(
        &self,
        id: Uuid,
        scope: ProjectScope,
        drive_link: Option<&str>,
    ) -> Result<Project, PortalError> {
        projects::update_drive_link(&self.pool, id, scope.client_id(), drive_link)
            .await?
            .ok_or_else(|| PortalError::NotFound("Project".to_string()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<(), PortalError> {
        match projects::delete(&self.pool, id).await? {
            0 => Err(PortalError::NotFound("Project".to_string())),
            _ => Ok(()),
        }
    }

    async fn recent_updates(&self, scope: ProjectScope, limit: i64) -> Result<Vec<ProjectUpdate>, PortalError> {
        let updates = match scope {
            ProjectScope::All => project_updates::recent(&self.pool, limit).await?,
            ProjectScope::Client(client_id) => {
                project_updates::recent_for_client(&self.pool, client_id, limit).await?
            }
        };
        Ok(updates)
    }
}
