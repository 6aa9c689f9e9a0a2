use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, sqlx::FromRow, serde::Serialize)]
pub struct Article {
    /// The upstream system's stable identifier for the article.
    pub foreign_id: i64,
    pub active: bool,
    /// The last time the ingestion pipeline observed this article.
    pub last_seen: DateTime<Utc>,
    pub title: String,
    pub intro: String,
    pub body: serde_json::Value,
    pub publication_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Upsert payload produced by the ingestion pipeline.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ArticleIngest {
    pub foreign_id: i64,
    pub title: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub publication_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    /// Foreign ids of the projects this article belongs to.
    #[serde(default)]
    pub project_ids: Vec<i64>,
}

impl Article {
    pub async fn get(db: &sqlx::PgPool, foreign_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM articles WHERE foreign_id = $1")
            .bind(foreign_id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_active(db: &sqlx::PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM articles WHERE active \
             ORDER BY publication_date DESC NULLS LAST LIMIT $1",
        )
        .bind(limit)
        .fetch_all(db)
        .await
    }

    /// Active articles for any of the given projects, newest first.
    pub async fn list_for_projects(
        db: &sqlx::PgPool,
        project_ids: &[i64],
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT DISTINCT a.* FROM articles a \
             INNER JOIN article_projects ap ON ap.article_foreign_id = a.foreign_id \
             WHERE a.active AND ap.project_foreign_id = ANY($1) \
             ORDER BY a.publication_date DESC NULLS LAST \
             LIMIT $2",
        )
        .bind(project_ids)
        .bind(limit)
        .fetch_all(db)
        .await
    }

    /// Foreign ids of the projects this article is associated with.
    pub async fn project_ids(db: &sqlx::PgPool, foreign_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT project_foreign_id FROM article_projects WHERE article_foreign_id = $1",
        )
        .bind(foreign_id)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn upsert(db: &sqlx::PgPool, ingest: &ArticleIngest) -> Result<(), sqlx::Error> {
        let mut tx = db.begin().await?;

        sqlx::query(
            "INSERT INTO articles (foreign_id, active, last_seen, title, intro, body, publication_date, expiration_date) \
             VALUES ($1, TRUE, now(), $2, $3, $4, $5, $6) \
             ON CONFLICT (foreign_id) DO UPDATE SET \
                active = TRUE, last_seen = now(), title = EXCLUDED.title, intro = EXCLUDED.intro, \
                body = EXCLUDED.body, publication_date = EXCLUDED.publication_date, \
                expiration_date = EXCLUDED.expiration_date",
        )
        .bind(ingest.foreign_id)
        .bind(&ingest.title)
        .bind(&ingest.intro)
        .bind(&ingest.body)
        .bind(ingest.publication_date)
        .bind(ingest.expiration_date)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM article_projects WHERE article_foreign_id = $1")
            .bind(ingest.foreign_id)
            .execute(&mut *tx)
            .await?;

        // Associations to projects the ingestion has not delivered yet are
        // skipped rather than failing the whole upsert.
        sqlx::query(
            "INSERT INTO article_projects (article_foreign_id, project_foreign_id) \
             SELECT $1, p.foreign_id FROM projects p WHERE p.foreign_id = ANY($2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(ingest.foreign_id)
        .bind(&ingest.project_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }
}
