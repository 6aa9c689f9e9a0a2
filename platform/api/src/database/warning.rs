use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Default, sqlx::FromRow, serde::Serialize)]
pub struct WarningMessage {
    pub id: Uuid,
    /// The project this warning belongs to.
    pub project_foreign_id: i64,
    /// Set to NULL when the authoring manager is deleted; `author_email`
    /// keeps the attribution.
    pub project_manager_id: Option<Uuid>,
    /// Snapshot of the author's e-mail taken at save time.
    pub author_email: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct WarningImageMeta {
    pub id: Uuid,
    pub warning_id: Uuid,
    pub mime_type: String,
    pub description: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WarningImage {
    pub id: Uuid,
    pub warning_id: Uuid,
    pub mime_type: String,
    pub description: String,
    pub data: Vec<u8>,
}

impl WarningMessage {
    pub async fn get(db: &sqlx::PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM warning_messages WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_project(
        db: &sqlx::PgPool,
        project_foreign_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM warning_messages WHERE project_foreign_id = $1 ORDER BY created_at DESC",
        )
        .bind(project_foreign_id)
        .fetch_all(db)
        .await
    }

    pub async fn create(
        db: &sqlx::PgPool,
        project_foreign_id: i64,
        manager_id: Uuid,
        author_email: &str,
        title: &str,
        body: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO warning_messages (id, project_foreign_id, project_manager_id, author_email, title, body) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(project_foreign_id)
        .bind(manager_id)
        .bind(author_email)
        .bind(title)
        .bind(body)
        .fetch_one(db)
        .await
    }

    pub async fn update(
        db: &sqlx::PgPool,
        id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE warning_messages SET title = $2, body = $3, updated_at = now() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(title)
        .bind(body)
        .fetch_optional(db)
        .await
    }

    /// The warning owns its images: both are removed in one transaction.
    pub async fn delete(db: &sqlx::PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = db.begin().await?;

        sqlx::query("DELETE FROM warning_images WHERE warning_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM warning_messages WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn add_image(
        db: &sqlx::PgPool,
        warning_id: Uuid,
        mime_type: &str,
        description: &str,
        data: &[u8],
    ) -> Result<WarningImageMeta, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO warning_images (id, warning_id, mime_type, description, data) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id, warning_id, mime_type, description",
        )
        .bind(Uuid::new_v4())
        .bind(warning_id)
        .bind(mime_type)
        .bind(description)
        .bind(data)
        .fetch_one(db)
        .await
    }

    pub async fn images(db: &sqlx::PgPool, warning_id: Uuid) -> Result<Vec<WarningImageMeta>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, warning_id, mime_type, description FROM warning_images \
             WHERE warning_id = $1 ORDER BY id",
        )
        .bind(warning_id)
        .fetch_all(db)
        .await
    }
}

impl WarningImage {
    pub async fn get(db: &sqlx::PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM warning_images WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }
}
