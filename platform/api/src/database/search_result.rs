use sqlx::postgres::PgRow;
use sqlx::Row as _;

#[derive(Debug, Clone)]
pub struct SearchResult<T> {
    /// The matched row.
    pub object: T,
    /// Aggregate weighted trigram similarity of the query to the scored
    /// fields.
    pub score: f64,
}

impl<'r, T> sqlx::FromRow<'r, PgRow> for SearchResult<T>
where
    T: sqlx::FromRow<'r, PgRow>,
{
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            object: T::from_row(row)?,
            score: row.try_get("score")?,
        })
    }
}
