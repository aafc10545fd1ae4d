use bytes::Bytes;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::{api_error, ClientError, ClientResult};

/// reqwest client bound to one API base URL
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    base: Url,
}

impl Transport {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    pub fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        Ok(self.http.request(method, self.url(path)?))
    }

    pub fn post(&self, path: &str) -> ClientResult<RequestBuilder> {
        self.request(Method::POST, path)
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let err = api_error(status.as_u16(), &body);
        tracing::debug!(status = status.as_u16(), error = %err, "API call failed");
        Err(err)
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        Ok(self.send(request).await?.json::<T>().await?)
    }

    pub async fn send_empty(&self, request: RequestBuilder) -> ClientResult<()> {
        self.send(request).await?;
        Ok(())
    }

    pub async fn send_bytes(&self, request: RequestBuilder) -> ClientResult<Bytes> {
        Ok(self.send(request).await?.bytes().await?)
    }
}
