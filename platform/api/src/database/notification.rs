use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A push notification record. The row may reference a warning, an article,
/// both, or neither; resolution prefers the warning and a dangling reference
/// degrades the dispatcher to its observable invalid state.
#[derive(Debug, Clone, Default, sqlx::FromRow, serde::Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub warning_id: Option<Uuid>,
    pub article_foreign_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub async fn get(db: &sqlx::PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn create(
        db: &sqlx::PgPool,
        title: &str,
        body: &str,
        warning_id: Option<Uuid>,
        article_foreign_id: Option<i64>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO notifications (id, title, body, warning_id, article_foreign_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(body)
        .bind(warning_id)
        .bind(article_foreign_id)
        .fetch_one(db)
        .await
    }

    /// Notifications whose warning belongs to any of the given projects,
    /// newest first.
    pub async fn list_for_projects(
        db: &sqlx::PgPool,
        project_ids: &[i64],
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT DISTINCT n.* FROM notifications n \
             LEFT JOIN warning_messages w ON w.id = n.warning_id \
             LEFT JOIN article_projects ap ON ap.article_foreign_id = n.article_foreign_id \
             WHERE w.project_foreign_id = ANY($1) OR ap.project_foreign_id = ANY($1) \
             ORDER BY n.created_at DESC",
        )
        .bind(project_ids)
        .fetch_all(db)
        .await
    }
}
