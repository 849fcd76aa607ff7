use sqlx::PgPool;
use uuid::Uuid;

use crate::models::ProjectUpdate;

pub async fn recent_for_client(
    pool: &PgPool,
    client_id: Uuid,
    limit: i64,
) -> Result<Vec<ProjectUpdate>, sqlx::Error> {
    sqlx::query_as::<_, ProjectUpdate>(
        "SELECT u.* FROM project_updates u
         JOIN projects p ON p.id = u.project_id
         WHERE p.client_id = $1
         ORDER BY u.created_at DESC
         LIMIT $2",
    )
    .bind(client_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<ProjectUpdate>, sqlx::Error> {
    sqlx::query_as::<_, ProjectUpdate>(
        "SELECT * FROM project_updates ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
