use uuid::Uuid;

#[derive(Debug, Clone, Default, sqlx::FromRow, serde::Serialize)]
pub struct ProjectManager {
    pub id: Uuid,
    /// Must belong to the configured organizational domain.
    pub email: String,
}

impl ProjectManager {
    /// Checks syntax and that the address belongs to `domain`.
    pub fn validate_email(email: &str, domain: &str) -> Result<(), &'static str> {
        if !email_address::EmailAddress::is_valid(email) {
            return Err("not a valid e-mail address");
        }

        let (_, email_domain) = email
            .rsplit_once('@')
            .ok_or("not a valid e-mail address")?;
        if !email_domain.eq_ignore_ascii_case(domain) {
            return Err("e-mail address is outside the organizational domain");
        }

        Ok(())
    }

    pub async fn get(db: &sqlx::PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM project_managers WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &sqlx::PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM project_managers ORDER BY email")
            .fetch_all(db)
            .await
    }

    pub async fn create(db: &sqlx::PgPool, email: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as("INSERT INTO project_managers (id, email) VALUES ($1, $2) RETURNING *")
            .bind(Uuid::new_v4())
            .bind(email)
            .fetch_one(db)
            .await
    }

    pub async fn delete(db: &sqlx::PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_managers WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the manager's project assignments.
    pub async fn assign_projects(
        db: &sqlx::PgPool,
        id: Uuid,
        project_ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        let mut tx = db.begin().await?;

        sqlx::query("DELETE FROM project_manager_projects WHERE manager_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO project_manager_projects (manager_id, project_foreign_id) \
             SELECT $1, p.foreign_id FROM projects p WHERE p.foreign_id = ANY($2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(project_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    pub async fn assigned_projects(db: &sqlx::PgPool, id: Uuid) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT project_foreign_id FROM project_manager_projects WHERE manager_id = $1",
        )
        .bind(id)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// The authorization boundary for the redaction surface: a manager may
    /// only post warnings for projects they are assigned to.
    pub async fn is_assigned(
        db: &sqlx::PgPool,
        id: Uuid,
        project_foreign_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM project_manager_projects \
             WHERE manager_id = $1 AND project_foreign_id = $2",
        )
        .bind(id)
        .bind(project_foreign_id)
        .fetch_optional(db)
        .await?;

        Ok(row.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_domain_validation() {
        assert!(ProjectManager::validate_email("jan@cityworks.dev", "cityworks.dev").is_ok());
        assert!(ProjectManager::validate_email("Jan@CITYWORKS.DEV", "cityworks.dev").is_ok());
        assert!(ProjectManager::validate_email("jan@elsewhere.org", "cityworks.dev").is_err());
        assert!(ProjectManager::validate_email("not-an-address", "cityworks.dev").is_err());
        assert!(ProjectManager::validate_email("", "cityworks.dev").is_err());
    }
}
