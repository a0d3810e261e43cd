//! HTTP client for the prediction backend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::model::{
    ExampleNumbers, HealthResponse, PredictionRequest, PredictionResponse, StatsResponse,
};

/// The backend endpoints the controller consumes.
///
/// Abstracted so the controller can be driven by a stub in tests.
#[async_trait]
pub trait LottoApi: Send + Sync {
    /// `POST /api/predict`.
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse>;

    /// `GET /api/example-numbers`.
    async fn example_numbers(&self) -> Result<ExampleNumbers>;

    /// `GET /api/stats`.
    async fn stats(&self) -> Result<StatsResponse>;

    /// `GET /api/health`.
    async fn health(&self) -> Result<HealthResponse>;
}

/// Runs `fut` under a deadline and a cancellation token.
///
/// The timer is dropped as soon as any branch completes, so no handle
/// outlives the request.
///
/// # Errors
///
/// Returns [`Error::Timeout`] when the deadline passes first,
/// [`Error::Cancelled`] when the token fires first, otherwise whatever
/// `fut` returns.
pub async fn bounded<T, F>(timeout: Duration, cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        res = fut => res,
        () = tokio::time::sleep(timeout) => Err(Error::Timeout(timeout)),
        () = cancel.cancelled() => Err(Error::Cancelled),
    }
}

/// Builds a configured HTTP client for backend requests.
fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(4)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// `reqwest` implementation of [`LottoApi`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base: Url,
}

impl HttpApi {
    /// Creates a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid base URL {base_url}: {e}")))?;
        Ok(Self {
            http: build_http_client()?,
            base,
        })
    }

    /// Uses an existing `reqwest` client.
    #[must_use]
    pub const fn with_client(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Config(format!("invalid path {path}: {e}")))
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http.get(self.url(path)?).send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl LottoApi for HttpApi {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        log::debug!("POST /api/predict {:?}", request.user_numbers);
        let response = self
            .http
            .post(self.url("/api/predict")?)
            .json(request)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn example_numbers(&self) -> Result<ExampleNumbers> {
        self.get_json("/api/example-numbers").await
    }

    async fn stats(&self) -> Result<StatsResponse> {
        self.get_json("/api/stats").await
    }

    async fn health(&self) -> Result<HealthResponse> {
        self.get_json("/api/health").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out() {
        let token = CancellationToken::new();
        let result: Result<()> = bounded(Duration::from_secs(30), &token, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::Timeout(d)) if d == Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn bounded_passes_result_through() {
        let token = CancellationToken::new();
        let result = bounded(Duration::from_secs(1), &token, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn bounded_observes_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<()> = bounded(
            Duration::from_secs(1),
            &token,
            futures::future::pending::<Result<()>>(),
        )
        .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(HttpApi::new("::nope::"), Err(Error::Config(_))));
    }

    #[test]
    fn joins_paths_on_base() {
        let api = HttpApi::new("http://127.0.0.1:5000").unwrap();
        assert_eq!(
            api.url("/api/stats").unwrap().as_str(),
            "http://127.0.0.1:5000/api/stats"
        );
    }

    #[cfg(feature = "proxy")]
    mod http {
        use super::*;
        use axum::Router;
        use axum::http::StatusCode;
        use axum::routing::{get, post};
        use serde_json::{Value, json};

        async fn serve(app: Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let _ = axum::serve(listener, app).await;
            });
            format!("http://{addr}")
        }

        #[tokio::test]
        async fn predict_posts_user_numbers() {
            let app = Router::new().route(
                "/api/predict",
                post(|axum::Json(body): axum::Json<Value>| async move {
                    axum::Json(json!({
                        "success": true,
                        "top_recommendations": [[1, 2, 3, 10, 20, 30]],
                        "models": {},
                        "user_numbers": body["user_numbers"],
                    }))
                }),
            );
            let api = HttpApi::new(&serve(app).await).unwrap();

            let response = api
                .predict(&PredictionRequest {
                    user_numbers: vec![1, 2, 3],
                })
                .await
                .unwrap();
            assert!(response.success);
            assert_eq!(response.user_numbers, vec![1, 2, 3]);
            assert_eq!(response.top_recommendations, vec![vec![1, 2, 3, 10, 20, 30]]);
        }

        #[tokio::test]
        async fn non_2xx_maps_to_status_error() {
            let app = Router::new().route(
                "/api/stats",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
            );
            let api = HttpApi::new(&serve(app).await).unwrap();

            let err = api.stats().await.unwrap_err();
            assert!(matches!(err, Error::Status { status: 503 }));
            assert!(err.user_message().contains("unavailable"));
        }

        #[tokio::test]
        async fn example_numbers_parse() {
            let app = Router::new().route(
                "/api/example-numbers",
                get(|| async {
                    axum::Json(json!({
                        "success": true,
                        "example_numbers": [3, 11, 19, 27, 35, 43],
                        "analysis": {"sum": 138, "even_count": 0, "odd_count": 6}
                    }))
                }),
            );
            let api = HttpApi::new(&serve(app).await).unwrap();

            let examples = api.example_numbers().await.unwrap();
            assert_eq!(examples.example_numbers, vec![3, 11, 19, 27, 35, 43]);
            assert_eq!(examples.analysis.odd_count, 6);
        }

        #[tokio::test]
        async fn unreachable_backend_is_transport_error() {
            // Bind then drop to get a port nobody listens on.
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let api = HttpApi::new(&format!("http://{addr}")).unwrap();
            let err = api.health().await.unwrap_err();
            assert!(err.is_transport());
        }
    }
}
