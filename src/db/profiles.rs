use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewProfile, Profile, Role};

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(pool: &PgPool, profile: &NewProfile) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles (id, email, role, full_name, company_name)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(profile.id)
    .bind(&profile.email)
    .bind(profile.role)
    .bind(&profile.full_name)
    .bind(&profile.company_name)
    .fetch_one(pool)
    .await
}

pub async fn list_by_role(pool: &PgPool, role: Role) -> Result<Vec<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "SELECT * FROM profiles WHERE role = $1 ORDER BY created_at DESC",
    )
    .bind(role)
    .fetch_all(pool)
    .await
}
