use reqwest::Client;
use url::Url;

use super::error::ApiError;
use super::{ApiRequest, FromResponse};

/// Thin client over one bootstrap server
///
/// Cloning is cheap and shares the underlying connection pool, which is the
/// only state concurrent store flows have in common.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("blobdrop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Send a request. Any non-2xx status is an error carrying the response text.
    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        self.call_at(&self.remote, request).await
    }

    /// Send a request to another server, reusing this client's connection pool
    pub async fn call_at<T: ApiRequest>(
        &self,
        base_url: &Url,
        request: T,
    ) -> Result<T::Response, ApiError> {
        let request_builder = request.build_request(base_url, &self.client)?;
        let response = request_builder.send().await?;

        if response.status().is_success() {
            T::Response::from_response(response).await
        } else {
            Err(ApiError::HttpStatus(
                response.status(),
                response.text().await.unwrap_or_default(),
            ))
        }
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
