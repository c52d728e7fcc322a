use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use tracing::debug;

use crate::error::ClientError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for internal endpoints.
///
/// Certificate verification is disabled: the endpoints it talks to sit behind self-signed certificates.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, ClientError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()?;
        Ok(Self { inner })
    }

    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Send `body` (omitted when empty) with `headers` to `url`.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: impl Into<String>,
        headers: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        let body = body.into();
        let mut builder = self.inner.request(method.clone(), url);
        if !body.is_empty() {
            builder = builder.body(body);
        }
        send(with_headers(builder, headers), &method, url).await
    }

    pub async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Response, ClientError> {
        self.request(Method::GET, url, "", headers).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: impl Into<String>,
        headers: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.request(Method::POST, url, body, headers).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: impl Into<String>,
        headers: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.request(Method::PUT, url, body, headers).await
    }

    pub async fn patch(
        &self,
        url: &str,
        body: impl Into<String>,
        headers: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.request(Method::PATCH, url, body, headers).await
    }

    /// POST `payload` serialized as JSON.
    pub async fn post_json<T>(&self, url: &str, payload: &T) -> Result<Response, ClientError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_string(payload)?;
        let builder = self
            .inner
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        send(builder, &Method::POST, url).await
    }
}

fn with_headers(builder: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    headers
        .iter()
        .fold(builder, |builder, (name, value)| builder.header(*name, *value))
}

async fn send(builder: RequestBuilder, method: &Method, url: &str) -> Result<Response, ClientError> {
    let response = builder.send().await?;
    debug!(%method, url, status = %response.status(), "http request done");
    Ok(response)
}
