use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::remote::SignerTokenSource;
use crate::security::token_cache::SignerToken;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct UploadRequestBody<'a> {
    #[serde(rename = "content-type", skip_serializing_if = "str::is_empty")]
    content_type: &'a str,
    #[serde(rename = "content-size", skip_serializing_if = "is_zero")]
    content_size: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Client for the remote asset trust authority.
///
/// Issues signer tokens (`GET {host}/token/{app}`) and pre-signed upload
/// descriptors (`PUT {host}/asset/{app}/{name}`), both behind bearer
/// authentication. Stateless between calls; every request carries a bounded
/// timeout so a slow authority can never stall the refresh loop past a tick.
#[derive(Debug, Clone)]
pub struct AuthorityClient {
    host: String,
    app_name: String,
    auth_token: String,
    http_client: Client,
}

impl AuthorityClient {
    pub fn new(
        host: impl Into<String>,
        app_name: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("creating HTTP client")?;

        Ok(Self {
            host: host.into(),
            app_name: app_name.into(),
            auth_token: auth_token.into(),
            http_client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.host).context("parsing authority host")?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| anyhow!("authority host cannot be a base URL: {}", self.host))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Fetch a fresh signer token expiring at `expired_at`.
    ///
    /// Expects a JSON body `{value, extra, expired_at}`; any network error,
    /// non-success status, or malformed body is returned as an error carrying
    /// the request URL so the refresh loop can log it without retrying inline.
    pub async fn fetch_signer_token(&self, expired_at: DateTime<Utc>) -> Result<SignerToken> {
        let mut url = self.endpoint(&["token", &self.app_name])?;
        url.query_pairs_mut()
            .append_pair("expired_at", &expired_at.timestamp().to_string());

        debug!(url = %url, "requesting signer token from authority");

        let response = self
            .http_client
            .get(url.clone())
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .with_context(|| format!("requesting signer token from {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "signer token request to {url} failed with status {status}: {body}"
            ));
        }

        let token: SignerToken = response
            .json()
            .await
            .with_context(|| format!("parsing signer token response from {url}"))?;

        info!(expired_at = %token.expired_at, "got new signer token from authority");
        Ok(token)
    }

    /// Ask the authority for a pre-signed upload descriptor for `name`.
    ///
    /// The descriptor is opaque to this crate and is returned unmodified.
    pub async fn presigned_upload(
        &self,
        name: &str,
        content_type: &str,
        content_size: u64,
    ) -> Result<serde_json::Value> {
        let url = self.endpoint(&["asset", &self.app_name, name])?;

        debug!(url = %url, name, "requesting pre-signed upload from authority");

        let response = self
            .http_client
            .put(url.clone())
            .bearer_auth(&self.auth_token)
            .json(&UploadRequestBody {
                content_type,
                content_size,
            })
            .send()
            .await
            .with_context(|| format!("requesting pre-signed upload from {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "pre-signed upload request to {url} failed with status {status}: {body}"
            ));
        }

        response
            .json()
            .await
            .with_context(|| format!("parsing pre-signed upload response from {url}"))
    }
}

#[async_trait]
impl SignerTokenSource for AuthorityClient {
    async fn fetch_signer_token(&self, expired_at: DateTime<Utc>) -> Result<SignerToken> {
        AuthorityClient::fetch_signer_token(self, expired_at).await
    }
}
