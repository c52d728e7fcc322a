//! Keystone (v2 API) admin token retrieval with caching.
use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{cache::CacheBackend, error::ClientError, http::HttpClient};

pub const TENANT_TOKEN_KEY: &str = "keystone_tenant_endpoint";
pub const ADMIN_TOKEN_KEY: &str = "keystone_admin_endpoint";

/// Credentials and endpoint used to request a token.
#[derive(Debug, Clone)]
pub struct KeystoneAuth {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub tenant: Option<String>,
}

impl KeystoneAuth {
    pub fn cache_key(&self) -> &'static str {
        match self.tenant {
            Some(_) => TENANT_TOKEN_KEY,
            None => ADMIN_TOKEN_KEY,
        }
    }

    fn tokens_url(&self) -> String {
        format!("{}/tokens", self.endpoint.trim_end_matches('/'))
    }

    fn request(&self) -> TokenRequest<'_> {
        TokenRequest {
            auth: AuthBody {
                password_credentials: Credentials {
                    username: &self.username,
                    password: &self.password,
                },
                tenant_name: self.tenant.as_deref(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
struct AuthBody<'a> {
    #[serde(rename = "passwordCredentials")]
    password_credentials: Credentials<'a>,
    #[serde(rename = "tenantName", skip_serializing_if = "Option::is_none")]
    tenant_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Option<Access>,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Option<Token>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: Option<String>,
}

pub struct TokenFetcher {
    http: HttpClient,
    cache: Arc<dyn CacheBackend>,
    auth: KeystoneAuth,
}

impl TokenFetcher {
    pub fn new(http: HttpClient, cache: Arc<dyn CacheBackend>, auth: KeystoneAuth) -> Self {
        Self { http, cache, auth }
    }

    pub fn auth(&self) -> &KeystoneAuth {
        &self.auth
    }

    /// Cached token, or a fresh one from keystone which is then cached.
    pub async fn get_token(&self) -> Result<String, ClientError> {
        let key = self.auth.cache_key();
        if let Some(token) = self.cache.get(key).await {
            debug!(key, "using cached keystone token");
            return Ok(token);
        }

        match self.fetch().await {
            Ok(token) => {
                self.cache.set(key, &token).await;
                debug!(key, endpoint = %self.auth.endpoint, "keystone token refreshed");
                Ok(token)
            }
            Err(e) => {
                warn!(endpoint = %self.auth.endpoint, error = %e, "failed to get keystone token");
                Err(e)
            }
        }
    }

    /// Drop the cached token and request a new one.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        self.cache.delete(self.auth.cache_key()).await;
        self.get_token().await
    }

    async fn fetch(&self) -> Result<String, ClientError> {
        let response = self
            .http
            .post_json(&self.auth.tokens_url(), &self.auth.request())
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::Rejected { status });
        }

        let body: TokenResponse = response.json().await?;
        body.access
            .and_then(|access| access.token)
            .and_then(|token| token.id)
            .filter(|id| !id.is_empty())
            .ok_or(ClientError::MissingToken)
    }
}
