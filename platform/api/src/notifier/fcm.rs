use async_trait::async_trait;
use serde_json::json;

use super::{PushClient, PushError, PushPayload};
use crate::config::PushConfig;

/// Multicast push client for the FCM legacy send endpoint.
///
/// One POST per batch; the response carries a `results` array with one entry
/// per submitted registration token, in submission order.
pub struct FcmClient {
    client: reqwest::Client,
    url: String,
    server_key: String,
}

impl FcmClient {
    pub fn new(config: &PushConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            server_key: config.server_key.clone(),
        }
    }
}

#[async_trait]
impl PushClient for FcmClient {
    async fn send_multicast(
        &self,
        payload: &PushPayload,
        tokens: &[String],
    ) -> Result<Vec<bool>, PushError> {
        let body = json!({
            "registration_ids": tokens,
            "notification": {
                "title": payload.title,
                "body": payload.body,
            },
            "data": {
                "type": payload.content_type,
                "id": payload.content_id,
            },
        });

        let res = self
            .client
            .post(&self.url)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&body)
            .send()
            .await?;

        let body = res.json::<serde_json::Value>().await?;

        let results = body["results"]
            .as_array()
            .ok_or(PushError::MalformedResponse)?;
        if results.len() != tokens.len() {
            return Err(PushError::MalformedResponse);
        }

        Ok(results.iter().map(|r| r.get("error").is_none()).collect())
    }
}

#[cfg(test)]
mod tests {
    use hyper::server::conn::Http;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    use super::*;

    /// Serves one canned FCM response and hands the request body back.
    async fn mock_provider(
        response: serde_json::Value,
    ) -> (mpsc::Receiver<serde_json::Value>, String) {
        let (tx, rx) = mpsc::channel(1);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                let tx = tx.clone();
                let response = response.clone();
                Http::new()
                    .serve_connection(
                        socket,
                        hyper::service::service_fn(move |req| {
                            let tx = tx.clone();
                            let response = response.clone();
                            async move {
                                let (_, body) = req.into_parts();
                                let body = hyper::body::to_bytes(body).await.unwrap();
                                tx.send(serde_json::from_slice(&body).unwrap()).await.unwrap();
                                Ok::<_, hyper::Error>(hyper::Response::new(hyper::Body::from(
                                    response.to_string(),
                                )))
                            }
                        }),
                    )
                    .await
                    .unwrap();
            }
        });

        (rx, addr)
    }

    fn client(url: String) -> FcmClient {
        FcmClient::new(&PushConfig {
            url,
            server_key: "test-key".to_string(),
            batch_size: 500,
        })
    }

    #[tokio::test]
    async fn per_token_outcomes_keep_submission_order() {
        let (mut rx, url) = mock_provider(json!({
            "results": [
                {"message_id": "0:1"},
                {"error": "NotRegistered"},
                {"message_id": "0:2"},
            ],
        }))
        .await;

        let payload = PushPayload {
            title: "title".to_string(),
            body: "body".to_string(),
            content_type: super::super::WARNING_CONTENT_TYPE,
            content_id: "id".to_string(),
        };
        let tokens = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let outcomes = client(url).send_multicast(&payload, &tokens).await.unwrap();
        assert_eq!(outcomes, vec![true, false, true]);

        let request = rx.recv().await.unwrap();
        assert_eq!(request["registration_ids"], json!(["a", "b", "c"]));
        assert_eq!(request["notification"]["title"], "title");
        assert_eq!(request["data"]["type"], super::super::WARNING_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn short_result_list_is_malformed() {
        let (_rx, url) = mock_provider(json!({"results": [{"message_id": "0:1"}]})).await;

        let payload = PushPayload {
            title: "title".to_string(),
            body: "body".to_string(),
            content_type: super::super::ARTICLE_CONTENT_TYPE,
            content_id: "id".to_string(),
        };
        let tokens = vec!["a".to_string(), "b".to_string()];

        assert!(matches!(
            client(url).send_multicast(&payload, &tokens).await,
            Err(PushError::MalformedResponse)
        ));
    }
}
