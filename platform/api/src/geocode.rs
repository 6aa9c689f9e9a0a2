use crate::config::GeocoderConfig;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Forward-geocoding client. One address in, at most one coordinate pair
/// out: zero or multiple candidate matches mean the coordinates are
/// undefined.
pub struct Geocoder {
    client: reqwest::Client,
    url: String,
}

#[derive(serde::Deserialize)]
struct Candidate {
    lat: String,
    lon: String,
}

impl Geocoder {
    pub fn new(config: &GeocoderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
        }
    }

    pub async fn lookup(&self, address: &str) -> Result<Option<(f64, f64)>, GeocodeError> {
        let candidates = self
            .client
            .get(&self.url)
            .query(&[("q", address), ("format", "json"), ("limit", "2")])
            .send()
            .await?
            .json::<Vec<Candidate>>()
            .await?;

        let [candidate] = candidates.as_slice() else {
            return Ok(None);
        };

        match (candidate.lat.parse(), candidate.lon.parse()) {
            (Ok(lat), Ok(lon)) => Ok(Some((lat, lon))),
            _ => {
                tracing::warn!(address, "geocoder returned unparsable coordinates");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hyper::server::conn::Http;
    use tokio::net::TcpListener;

    use super::*;

    async fn mock_geocoder(response: serde_json::Value) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            loop {
                let (socket, _) = listener.accept().await.unwrap();
                let response = response.clone();
                Http::new()
                    .serve_connection(
                        socket,
                        hyper::service::service_fn(move |_req| {
                            let response = response.clone();
                            async move {
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

        addr
    }

    fn client(url: String) -> Geocoder {
        Geocoder::new(&GeocoderConfig { url })
    }

    #[tokio::test]
    async fn single_match_yields_coordinates() {
        let url = mock_geocoder(serde_json::json!([
            {"lat": "52.3728", "lon": "4.8936"},
        ]))
        .await;

        let result = client(url).lookup("City Hall 1").await.unwrap();
        assert_eq!(result, Some((52.3728, 4.8936)));
    }

    #[tokio::test]
    async fn ambiguous_or_empty_matches_are_undefined() {
        let url = mock_geocoder(serde_json::json!([
            {"lat": "52.0", "lon": "4.0"},
            {"lat": "53.0", "lon": "5.0"},
        ]))
        .await;
        assert_eq!(client(url).lookup("Main street").await.unwrap(), None);

        let url = mock_geocoder(serde_json::json!([])).await;
        assert_eq!(client(url).lookup("Nowhere 0").await.unwrap(), None);
    }
}
