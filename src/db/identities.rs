use sqlx::PgPool;
use uuid::Uuid;

use crate::models::IdentityRecord;

pub async fn create(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<IdentityRecord, sqlx::Error> {
    sqlx::query_as::<_, IdentityRecord>(
        "INSERT INTO identities (email, password_hash) VALUES ($1, $2) RETURNING *",
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<IdentityRecord>, sqlx::Error> {
    sqlx::query_as::<_, IdentityRecord>("SELECT * FROM identities WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<IdentityRecord>, sqlx::Error> {
    sqlx::query_as::<_, IdentityRecord>("SELECT * FROM identities WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}
