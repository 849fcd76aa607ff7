use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewProject, Project, ProjectChanges};

pub async fn list_all(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn list_for_client(pool: &PgPool, client_id: Uuid) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "SELECT * FROM projects WHERE client_id = $1 ORDER BY created_at DESC",
    )
    .bind(client_id)
    .fetch_all(pool)
    .await
}

pub async fn create(pool: &PgPool, project: &NewProject) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "INSERT INTO projects (client_id, name, description, status, completion_percentage, notes)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(project.client_id)
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status)
    .bind(project.completion_percentage)
    .bind(&project.notes)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &ProjectChanges,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "UPDATE projects
         SET name = $2, description = $3, status = $4, completion_percentage = $5,
             notes = $6, drive_link = $7, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&changes.name)
    .bind(&changes.description)
    .bind(changes.status)
    .bind(changes.completion_percentage)
    .bind(&changes.notes)
    .bind(&changes.drive_link)
    .fetch_optional(pool)
    .await
}

/// Client-side edit: touches `drive_link` only, and only on the client's own row.
pub async fn update_drive_link(
    pool: &PgPool,
    id: Uuid,
    client_id: Option<Uuid>,
    drive_link: Option<&str>,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "UPDATE projects SET drive_link = $3, updated_at = now()
         WHERE id = $1 AND ($2::uuid IS NULL OR client_id = $2) RETURNING *",
    )
    .bind(id)
    .bind(client_id)
    .bind(drive_link)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
