use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, sqlx::FromRow, serde::Serialize)]
pub struct Project {
    /// The upstream system's stable identifier for the project.
    pub foreign_id: i64,
    /// Inactive projects are hidden from default listings but stay
    /// retrievable by id.
    pub active: bool,
    /// The last time the ingestion pipeline observed this project.
    pub last_seen: DateTime<Utc>,
    pub title: String,
    pub subtitle: String,
    /// Nested page content as delivered by the ingestion pipeline.
    pub sections: serde_json::Value,
    pub contacts: serde_json::Value,
    pub timeline: serde_json::Value,
    pub images: serde_json::Value,
    /// Free-form coordinates; either component may be absent.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Upsert payload produced by the ingestion pipeline.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProjectIngest {
    pub foreign_id: i64,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub sections: serde_json::Value,
    #[serde(default)]
    pub contacts: serde_json::Value,
    #[serde(default)]
    pub timeline: serde_json::Value,
    #[serde(default)]
    pub images: serde_json::Value,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Project {
    pub async fn get(db: &sqlx::PgPool, foreign_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM projects WHERE foreign_id = $1")
            .bind(foreign_id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_active(db: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM projects WHERE active ORDER BY title")
            .fetch_all(db)
            .await
    }

    /// Upserted rows are marked seen now and reactivated; the garbage
    /// collector decides later whether they stay active.
    pub async fn upsert(db: &sqlx::PgPool, ingest: &ProjectIngest) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO projects (foreign_id, active, last_seen, title, subtitle, sections, contacts, timeline, images, latitude, longitude) \
             VALUES ($1, TRUE, now(), $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (foreign_id) DO UPDATE SET \
                active = TRUE, last_seen = now(), title = EXCLUDED.title, subtitle = EXCLUDED.subtitle, \
                sections = EXCLUDED.sections, contacts = EXCLUDED.contacts, timeline = EXCLUDED.timeline, \
                images = EXCLUDED.images, latitude = EXCLUDED.latitude, longitude = EXCLUDED.longitude",
        )
        .bind(ingest.foreign_id)
        .bind(&ingest.title)
        .bind(&ingest.subtitle)
        .bind(&ingest.sections)
        .bind(&ingest.contacts)
        .bind(&ingest.timeline)
        .bind(&ingest.images)
        .bind(ingest.latitude)
        .bind(ingest.longitude)
        .execute(db)
        .await?;

        Ok(())
    }
}
