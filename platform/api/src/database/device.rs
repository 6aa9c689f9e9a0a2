use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, sqlx::FromRow, serde::Serialize)]
pub struct Device {
    /// Externally assigned device identifier.
    pub id: String,
    /// OS tag reported by the mobile app.
    pub os: String,
    /// Push provider registration token, absent when the device refused
    /// notifications.
    pub push_token: Option<String>,
    /// The last time the device contacted the API.
    pub last_access: DateTime<Utc>,
}

impl Device {
    pub async fn get(db: &sqlx::PgPool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM devices WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Devices are created on first API contact; later contacts only bump
    /// `last_access`.
    pub async fn touch(db: &sqlx::PgPool, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO devices (id) VALUES ($1) \
             ON CONFLICT (id) DO UPDATE SET last_access = now()",
        )
        .bind(id)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn register(
        db: &sqlx::PgPool,
        id: &str,
        os: &str,
        push_token: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO devices (id, os, push_token) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET os = EXCLUDED.os, push_token = EXCLUDED.push_token, \
                last_access = now()",
        )
        .bind(id)
        .bind(os)
        .bind(push_token)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn follow_project(
        db: &sqlx::PgPool,
        id: &str,
        project_foreign_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO device_followed_projects (device_id, project_foreign_id) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(project_foreign_id)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn unfollow_project(
        db: &sqlx::PgPool,
        id: &str,
        project_foreign_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM device_followed_projects WHERE device_id = $1 AND project_foreign_id = $2",
        )
        .bind(id)
        .bind(project_foreign_id)
        .execute(db)
        .await?;

        Ok(())
    }

    /// Replaces the device's followed-project set.
    pub async fn set_followed_projects(
        db: &sqlx::PgPool,
        id: &str,
        project_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        let mut tx = db.begin().await?;

        sqlx::query("DELETE FROM device_followed_projects WHERE device_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO device_followed_projects (device_id, project_foreign_id) \
             SELECT $1, p.foreign_id FROM projects p WHERE p.foreign_id = ANY($2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(project_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    pub async fn followed_projects(db: &sqlx::PgPool, id: &str) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT project_foreign_id FROM device_followed_projects WHERE device_id = $1",
        )
        .bind(id)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Push tokens of every device following any of the given projects.
    pub async fn subscriber_tokens(
        db: &sqlx::PgPool,
        project_ids: &[i64],
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT d.push_token FROM devices d \
             INNER JOIN device_followed_projects f ON f.device_id = d.id \
             WHERE f.project_foreign_id = ANY($1) AND d.push_token IS NOT NULL \
             ORDER BY d.push_token",
        )
        .bind(project_ids)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(|(token,)| token).collect())
    }

    /// Deletes devices unseen for `retention_days`; follow rows and tokens go
    /// with them. Returns the number of pruned devices.
    pub async fn prune_stale(db: &sqlx::PgPool, retention_days: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM devices WHERE last_access < now() - make_interval(days => $1::int)",
        )
        .bind(retention_days)
        .execute(db)
        .await?;

        Ok(result.rows_affected())
    }
}
