//! Push-notification fan-out.
//!
//! A dispatcher resolves a notification record to its content item, builds
//! the provider payload once, partitions the subscribed device tokens into
//! provider-sized batches and issues one multicast call per batch. Failed
//! tokens are collected across batches and logged once; they are never
//! retried and never abort the remaining batches.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::{Article, Device, Notification, WarningMessage};

mod fcm;

pub use fcm::FcmClient;

/// Data-payload tag for warnings posted through the redaction surface.
pub const WARNING_CONTENT_TYPE: &str = "ProjectWarningCreatedByProjectManager";
/// Data-payload tag for article notifications.
pub const ARTICLE_CONTENT_TYPE: &str = "NewsItemCreatedByIngestion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    /// Content-type tag carried in the provider data payload.
    pub content_type: &'static str,
    /// Stable identifier of the content item the notification points at.
    pub content_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("provider returned a malformed multicast response")]
    MalformedResponse,
}

/// One multicast-send call per invocation; outcomes come back in submission
/// order. The client handle is constructed at process bootstrap and injected.
#[async_trait]
pub trait PushClient: Send + Sync {
    async fn send_multicast(
        &self,
        payload: &PushPayload,
        tokens: &[String],
    ) -> Result<Vec<bool>, PushError>;
}

/// The content item a notification resolves to. A notification row may name
/// a warning, an article, both or neither; the warning wins when both are
/// present.
enum Content {
    Warning(WarningMessage),
    Article(Article),
}

#[derive(Debug, Default)]
pub struct SendReport {
    /// Multicast calls issued.
    pub batches_sent: usize,
    /// Tokens the provider reported as failed, across all batches.
    pub failed_tokens: Vec<String>,
}

pub struct NotificationDispatcher {
    push: Arc<dyn PushClient>,
    payload: Option<PushPayload>,
    /// `None` marks the degenerate state: the notification or its content
    /// could not be resolved and `send` is a no-op.
    batches: Option<Vec<Vec<String>>>,
}

impl NotificationDispatcher {
    /// Resolves the notification and prepares delivery.
    ///
    /// A missing notification or a dangling content reference produces a
    /// dispatcher in an observable invalid state instead of an error: no
    /// payload is built, no device set is resolved, and one log line
    /// identifies the lookup failure.
    pub async fn resolve(
        db: &sqlx::PgPool,
        push: Arc<dyn PushClient>,
        batch_size: usize,
        notification_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut dispatcher = Self {
            push,
            payload: None,
            batches: None,
        };

        let Some(notification) = Notification::get(db, notification_id).await? else {
            tracing::warn!(%notification_id, "notification not found, nothing to dispatch");
            return Ok(dispatcher);
        };

        let Some(content) = resolve_content(db, &notification).await? else {
            tracing::warn!(
                %notification_id,
                warning_id = ?notification.warning_id,
                article_foreign_id = ?notification.article_foreign_id,
                "notification references no resolvable content, nothing to dispatch"
            );
            return Ok(dispatcher);
        };

        // The payload is built exactly once, before any delivery.
        let (content_type, content_id, project_ids) = match &content {
            Content::Warning(warning) => (
                WARNING_CONTENT_TYPE,
                warning.id.to_string(),
                vec![warning.project_foreign_id],
            ),
            Content::Article(article) => (
                ARTICLE_CONTENT_TYPE,
                article.foreign_id.to_string(),
                Article::project_ids(db, article.foreign_id).await?,
            ),
        };

        dispatcher.payload = Some(PushPayload {
            title: notification.title,
            body: notification.body,
            content_type,
            content_id,
        });

        let tokens = Device::subscriber_tokens(db, &project_ids).await?;
        dispatcher.batches = Some(chunk_tokens(tokens, batch_size));

        Ok(dispatcher)
    }

    /// Callers check this before sending; an invalid dispatcher has had no
    /// side effects and `send` on it does nothing.
    pub fn is_valid(&self) -> bool {
        self.batches.is_some()
    }

    /// Delivers all batches sequentially and logs the aggregate failures
    /// once. Never raises.
    pub async fn send(&self) -> SendReport {
        let (Some(payload), Some(batches)) = (&self.payload, &self.batches) else {
            return SendReport::default();
        };

        if batches.is_empty() {
            tracing::info!("no subscribed devices found");
            return SendReport::default();
        }

        deliver(self.push.as_ref(), payload, batches).await
    }
}

async fn resolve_content(
    db: &sqlx::PgPool,
    notification: &Notification,
) -> Result<Option<Content>, sqlx::Error> {
    if let Some(warning_id) = notification.warning_id {
        if let Some(warning) = WarningMessage::get(db, warning_id).await? {
            return Ok(Some(Content::Warning(warning)));
        }
    }

    if let Some(foreign_id) = notification.article_foreign_id {
        if let Some(article) = Article::get(db, foreign_id).await? {
            return Ok(Some(Content::Article(article)));
        }
    }

    Ok(None)
}

/// Contiguous fixed-size chunks; the last one may be short.
fn chunk_tokens(tokens: Vec<String>, batch_size: usize) -> Vec<Vec<String>> {
    tokens
        .chunks(batch_size.max(1))
        .map(<[String]>::to_vec)
        .collect()
}

async fn deliver(push: &dyn PushClient, payload: &PushPayload, batches: &[Vec<String>]) -> SendReport {
    let mut report = SendReport::default();

    for batch in batches {
        match push.send_multicast(payload, batch).await {
            Ok(outcomes) => {
                report.batches_sent += 1;
                for (token, delivered) in batch.iter().zip(outcomes) {
                    if !delivered {
                        report.failed_tokens.push(token.clone());
                    }
                }
            }
            // One failing batch does not cancel the remaining batches.
            Err(err) => {
                report.batches_sent += 1;
                tracing::error!("multicast send failed: {}", err);
                report.failed_tokens.extend(batch.iter().cloned());
            }
        }
    }

    if !report.failed_tokens.is_empty() {
        tracing::warn!(
            failed = report.failed_tokens.len(),
            tokens = ?report.failed_tokens,
            "push delivery failed for some device tokens"
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    fn payload() -> PushPayload {
        PushPayload {
            title: "Works on the quay wall".to_string(),
            body: "The bike lane is closed next week".to_string(),
            content_type: WARNING_CONTENT_TYPE,
            content_id: Uuid::new_v4().to_string(),
        }
    }

    fn tokens(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("token-{i}")).collect()
    }

    /// Provider double that fails the first token of every batch.
    struct FirstTokenFails {
        calls: AtomicUsize,
        batch_sizes: Mutex<Vec<usize>>,
    }

    impl FirstTokenFails {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                batch_sizes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PushClient for FirstTokenFails {
        async fn send_multicast(
            &self,
            _payload: &PushPayload,
            tokens: &[String],
        ) -> Result<Vec<bool>, PushError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batch_sizes.lock().unwrap().push(tokens.len());
            Ok((0..tokens.len()).map(|i| i != 0).collect())
        }
    }

    #[test]
    fn chunking_is_contiguous_and_bounded() {
        let batches = chunk_tokens(tokens(1201), 500);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 500);
        assert_eq!(batches[1].len(), 500);
        assert_eq!(batches[2].len(), 201);
        assert_eq!(batches[0][0], "token-0");
        assert_eq!(batches[2][200], "token-1200");

        assert!(chunk_tokens(Vec::new(), 500).is_empty());
        assert_eq!(chunk_tokens(tokens(1), 500).len(), 1);
    }

    #[tokio::test]
    async fn one_provider_call_per_batch() {
        let push = FirstTokenFails::new();
        let batches = chunk_tokens(tokens(1201), 500);

        let report = deliver(&push, &payload(), &batches).await;

        // ceil(1201 / 500) calls, one failed token per batch.
        assert_eq!(push.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.batches_sent, 3);
        assert_eq!(report.failed_tokens.len(), 3);
        assert_eq!(
            report.failed_tokens,
            vec!["token-0", "token-500", "token-1000"]
        );
        assert_eq!(*push.batch_sizes.lock().unwrap(), vec![500, 500, 201]);
    }

    #[tokio::test]
    async fn failing_batch_does_not_abort_the_rest() {
        struct SecondBatchErrors(AtomicUsize);

        #[async_trait]
        impl PushClient for SecondBatchErrors {
            async fn send_multicast(
                &self,
                _payload: &PushPayload,
                tokens: &[String],
            ) -> Result<Vec<bool>, PushError> {
                if self.0.fetch_add(1, Ordering::SeqCst) == 1 {
                    Err(PushError::MalformedResponse)
                } else {
                    Ok(vec![true; tokens.len()])
                }
            }
        }

        let push = SecondBatchErrors(AtomicUsize::new(0));
        let batches = chunk_tokens(tokens(30), 10);

        let report = deliver(&push, &payload(), &batches).await;

        assert_eq!(report.batches_sent, 3);
        // The whole second batch counts as failed.
        assert_eq!(report.failed_tokens.len(), 10);
        assert!(report.failed_tokens.iter().all(|t| {
            t.strip_prefix("token-")
                .and_then(|i| i.parse::<usize>().ok())
                .is_some_and(|i| (10..20).contains(&i))
        }));
    }

    #[tokio::test]
    async fn degenerate_dispatcher_send_is_a_no_op() {
        let dispatcher = NotificationDispatcher {
            push: Arc::new(FirstTokenFails::new()),
            payload: None,
            batches: None,
        };

        assert!(!dispatcher.is_valid());
        let report = dispatcher.send().await;
        assert_eq!(report.batches_sent, 0);
        assert!(report.failed_tokens.is_empty());
    }

    #[tokio::test]
    async fn no_subscribed_devices_skips_delivery() {
        let push = Arc::new(FirstTokenFails::new());
        let dispatcher = NotificationDispatcher {
            push: push.clone(),
            payload: Some(payload()),
            batches: Some(Vec::new()),
        };

        assert!(dispatcher.is_valid());
        let report = dispatcher.send().await;
        assert_eq!(report.batches_sent, 0);
        assert_eq!(push.calls.load(Ordering::SeqCst), 0);
    }
}
