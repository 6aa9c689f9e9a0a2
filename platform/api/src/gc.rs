//! Reconciles cached content against the latest upstream scrape.
//!
//! Every content row carries a `last_seen` timestamp maintained by the
//! ingestion pipeline. Given the pipeline's `last_scrape_time` cutoff each
//! row lands in exactly one bucket: rows unseen for more than the grace
//! period are deleted, rows seen at or after the cutoff are activated, and
//! rows seen before the cutoff but within the grace period are deactivated.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::database::Device;
use crate::global::GlobalState;

/// Content unseen for this long is deleted instead of deactivated.
const GRACE_PERIOD_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GcAction {
    Deleted,
    Activated,
    Deactivated,
}

/// The two content kinds the sweep reconciles. Explicit dispatch on the kind
/// replaces the reflective field access of older revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Project,
    Article,
}

impl ContentKind {
    fn table(self) -> &'static str {
        match self {
            ContentKind::Project => "projects",
            ContentKind::Article => "articles",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ContentRow {
    foreign_id: i64,
    last_seen: DateTime<Utc>,
}

/// Per-object report of the actions taken, keyed by the object's stable
/// external identifier.
#[derive(Debug, Default, serde::Serialize)]
pub struct GcReport {
    pub projects: BTreeMap<i64, GcAction>,
    pub news: BTreeMap<i64, GcAction>,
}

/// Classifies one content object. The three buckets are mutually exclusive
/// and exhaustive; deletion takes precedence.
pub fn classify(last_seen: DateTime<Utc>, last_scrape_time: DateTime<Utc>) -> GcAction {
    if last_seen + Duration::days(GRACE_PERIOD_DAYS) <= last_scrape_time {
        GcAction::Deleted
    } else if last_seen >= last_scrape_time {
        GcAction::Activated
    } else {
        GcAction::Deactivated
    }
}

/// Runs the full sweep over projects and articles.
///
/// `last_scrape_time` has been validated by the caller; the sweep itself
/// raises only on database failure.
pub async fn sweep(
    db: &sqlx::PgPool,
    last_scrape_time: DateTime<Utc>,
) -> Result<GcReport, sqlx::Error> {
    let report = GcReport {
        projects: sweep_kind(db, ContentKind::Project, last_scrape_time).await?,
        news: sweep_kind(db, ContentKind::Article, last_scrape_time).await?,
    };

    tracing::info!(
        projects = report.projects.len(),
        news = report.news.len(),
        "garbage collection sweep finished"
    );

    Ok(report)
}

async fn sweep_kind(
    db: &sqlx::PgPool,
    kind: ContentKind,
    last_scrape_time: DateTime<Utc>,
) -> Result<BTreeMap<i64, GcAction>, sqlx::Error> {
    let rows: Vec<ContentRow> =
        sqlx::query_as(&format!("SELECT foreign_id, last_seen FROM {}", kind.table()))
            .fetch_all(db)
            .await?;

    let mut report = BTreeMap::new();
    let mut deleted = Vec::new();
    let mut activated = Vec::new();
    let mut deactivated = Vec::new();

    for row in rows {
        let action = classify(row.last_seen, last_scrape_time);
        match action {
            GcAction::Deleted => deleted.push(row.foreign_id),
            GcAction::Activated => activated.push(row.foreign_id),
            GcAction::Deactivated => deactivated.push(row.foreign_id),
        }
        report.insert(row.foreign_id, action);
    }

    if !deleted.is_empty() {
        // Dependent rows (associations, warnings, follows) cascade.
        sqlx::query(&format!(
            "DELETE FROM {} WHERE foreign_id = ANY($1)",
            kind.table()
        ))
        .bind(&deleted)
        .execute(db)
        .await?;
    }

    if !activated.is_empty() {
        sqlx::query(&format!(
            "UPDATE {} SET active = TRUE WHERE foreign_id = ANY($1)",
            kind.table()
        ))
        .bind(&activated)
        .execute(db)
        .await?;
    }

    match kind {
        ContentKind::Project => {
            if !deactivated.is_empty() {
                sqlx::query("UPDATE projects SET active = FALSE WHERE foreign_id = ANY($1)")
                    .bind(&deactivated)
                    .execute(db)
                    .await?;
            }
        }
        // Articles deactivate scoped on both the article's own identifier and
        // a parent project's identifier; an article no longer tied to any
        // project is left for the delete bucket of a later sweep.
        ContentKind::Article => {
            if !deactivated.is_empty() {
                sqlx::query(
                    "UPDATE articles a SET active = FALSE \
                     WHERE a.foreign_id = ANY($1) AND EXISTS (\
                        SELECT 1 FROM article_projects ap \
                        WHERE ap.article_foreign_id = a.foreign_id)",
                )
                .bind(&deactivated)
                .execute(db)
                .await?;
            }
        }
    }

    Ok(report)
}

/// Periodic stale-device prune. Devices unseen for the configured retention
/// window are removed together with their follow and token rows.
pub async fn device_prune_loop(global: Arc<GlobalState>) -> anyhow::Result<()> {
    let interval = std::time::Duration::from_secs(global.config.ingest.device_prune_interval_secs);
    let retention_days = global.config.ingest.device_retention_days;

    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        timer.tick().await;

        match Device::prune_stale(&global.db, retention_days).await {
            Ok(0) => tracing::debug!("no stale devices to prune"),
            Ok(count) => tracing::info!(count, "pruned stale devices"),
            Err(err) => tracing::error!("device prune failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn just_seen_objects_stay_active() {
        let now = Utc::now();
        let last_scrape_time = now - Duration::hours(1);
        assert_eq!(
            classify(now - Duration::hours(1), last_scrape_time),
            GcAction::Activated
        );
    }

    #[test]
    fn objects_within_grace_window_deactivate() {
        let now = Utc::now();
        assert_eq!(
            classify(now - Duration::hours(2), now),
            GcAction::Deactivated
        );
    }

    #[test]
    fn objects_past_grace_window_delete() {
        let now = Utc::now();
        assert_eq!(classify(now, now + Duration::days(8)), GcAction::Deleted);
    }

    #[test]
    fn grace_boundary_is_inclusive() {
        let now = Utc::now();
        // Exactly seven days unseen deletes; a hair less deactivates.
        assert_eq!(classify(now, now + Duration::days(7)), GcAction::Deleted);
        assert_eq!(
            classify(now, now + Duration::days(7) - Duration::seconds(1)),
            GcAction::Deactivated
        );
    }

    #[test]
    fn classification_is_exhaustive_and_exclusive() {
        let cutoff = Utc::now();
        for hours in -400..400 {
            let last_seen = cutoff + Duration::hours(hours);
            let action = classify(last_seen, cutoff);

            let expect = if last_seen + Duration::days(GRACE_PERIOD_DAYS) <= cutoff {
                GcAction::Deleted
            } else if last_seen >= cutoff {
                GcAction::Activated
            } else {
                GcAction::Deactivated
            };
            assert_eq!(action, expect, "hours offset {hours}");
        }
    }
}
