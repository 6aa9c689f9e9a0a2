//! Weighted trigram search over content tables.
//!
//! Scoring and substring filtering run inside Postgres (`pg_trgm` +
//! `unaccent`); this module only assembles the statement from a whitelisted
//! field list and enforces the minimum query length.

use crate::database::SearchResult;

/// Queries shorter than this return an empty result set without touching the
/// database.
pub const MIN_QUERY_LENGTH: usize = 3;

/// A searchable entity: its table and the fields allowed for scoring, in
/// default priority order.
#[derive(Debug, Clone, Copy)]
pub struct SearchEntity {
    pub table: &'static str,
    pub fields: &'static [&'static str],
}

pub const PROJECTS: SearchEntity = SearchEntity {
    table: "projects",
    fields: &["title", "subtitle"],
};

pub const ARTICLES: SearchEntity = SearchEntity {
    table: "articles",
    fields: &["title", "intro"],
};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("field {0:?} is not searchable")]
    UnknownField(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Ranks rows of `entity` by weighted trigram similarity over `fields`
/// (caller order; the weight halves for every subsequent field). Rows
/// qualify only when the raw query appears accent-insensitively in at least
/// one scored field and the aggregate score is positive.
pub async fn search<T>(
    db: &sqlx::PgPool,
    entity: SearchEntity,
    fields: &[String],
    term: &str,
    limit: i64,
) -> Result<Vec<SearchResult<T>>, SearchError>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    if term.chars().count() < MIN_QUERY_LENGTH {
        return Ok(Vec::new());
    }

    let fields = validate_fields(entity, fields)?;
    let score = score_expression(&fields);
    let filter = substring_filter(&fields);

    let query = format!(
        "SELECT {table}.*, {score} AS score FROM {table} \
         WHERE active AND ({filter}) AND {score} > 0 \
         ORDER BY score DESC LIMIT $2",
        table = entity.table,
    );

    Ok(sqlx::query_as(&query)
        .bind(term)
        .bind(limit)
        .fetch_all(db)
        .await?)
}

/// Every requested field must be on the entity's whitelist; field names are
/// spliced into the statement. An empty request means the default field set.
fn validate_fields(
    entity: SearchEntity,
    fields: &[String],
) -> Result<Vec<&'static str>, SearchError> {
    if fields.is_empty() {
        return Ok(entity.fields.to_vec());
    }

    fields
        .iter()
        .map(|requested| {
            entity
                .fields
                .iter()
                .find(|allowed| *allowed == requested)
                .copied()
                .ok_or_else(|| SearchError::UnknownField(requested.clone()))
        })
        .collect()
}

/// `similarity(a, $1) * 1 + similarity(b, $1) * 0.5 + ...`
fn score_expression(fields: &[&str]) -> String {
    fields
        .iter()
        .enumerate()
        .map(|(position, field)| {
            let weight = 1.0 / (1u32 << position) as f64;
            format!("similarity({field}, $1) * {weight}")
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

fn substring_filter(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| format!("unaccent({field}) ILIKE unaccent('%' || $1 || '%')"))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use crate::database::Project;

    use super::*;

    fn lazy_pool() -> sqlx::PgPool {
        // Never connects; any query attempt against it would error, which is
        // exactly what the short-query tests rely on.
        sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/never")
            .unwrap()
    }

    #[test]
    fn weights_halve_per_field() {
        assert_eq!(score_expression(&["title"]), "similarity(title, $1) * 1");
        assert_eq!(
            score_expression(&["title", "subtitle", "body"]),
            "similarity(title, $1) * 1 + similarity(subtitle, $1) * 0.5 + similarity(body, $1) * 0.25"
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            validate_fields(PROJECTS, &["password".to_string()]),
            Err(SearchError::UnknownField(_))
        ));
        assert_eq!(
            validate_fields(PROJECTS, &[]).unwrap(),
            vec!["title", "subtitle"]
        );
        assert_eq!(
            validate_fields(PROJECTS, &["subtitle".to_string()]).unwrap(),
            vec!["subtitle"]
        );
    }

    #[tokio::test]
    async fn short_query_returns_empty_without_database_round_trip() {
        let db = lazy_pool();
        let results: Vec<crate::database::SearchResult<Project>> =
            search(&db, PROJECTS, &[], "ab", 20).await.unwrap();
        assert!(results.is_empty());

        let results: Vec<crate::database::SearchResult<Project>> =
            search(&db, PROJECTS, &[], "", 20).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn unknown_field_is_rejected_before_the_database() {
        let db = lazy_pool();
        let result: Result<Vec<crate::database::SearchResult<Project>>, _> =
            search(&db, PROJECTS, &["secret".to_string()], "quay", 20).await;
        assert!(matches!(result, Err(SearchError::UnknownField(_))));
    }
}
