//! Client for the official Guild Wars 2 API, used to turn an API key into an account.

use std::time::Duration;

use gw2style_common::config::Gw2Config;
use gw2style_common::error::{StyleError, StyleResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

/// `GET /v2/tokeninfo`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// `GET /v2/account`, only the fields gw2style keeps.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
}

#[derive(Clone)]
pub struct Gw2Client {
    client: Client,
    base_url: Url,
    required_permissions: Vec<String>,
}

impl Gw2Client {
    pub fn new(config: &Gw2Config) -> anyhow::Result<Self> {
        let mut base = config.api_url.trim_end_matches('/').to_owned();
        base.push('/');
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("gw2style/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            required_permissions: config.required_permissions.clone(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, api_key: &str) -> StyleResult<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| StyleError::Internal(e.into()))?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| StyleError::Internal(anyhow::anyhow!("GW2 API unreachable: {e}")))?;

        if !resp.status().is_success() {
            tracing::debug!(status = %resp.status(), path, "GW2 API rejected the key");
            return Err(StyleError::InvalidCredentials);
        }

        resp.json::<T>()
            .await
            .map_err(|e| StyleError::Internal(anyhow::anyhow!("Malformed GW2 API response: {e}")))
    }

    pub async fn token_info(&self, api_key: &str) -> StyleResult<TokenInfo> {
        self.get("v2/tokeninfo", api_key).await
    }

    /// Fail with the first required scope the key does not grant.
    pub async fn check_permissions(&self, api_key: &str) -> StyleResult<TokenInfo> {
        let info = self.token_info(api_key).await?;
        if let Some(missing) = self
            .required_permissions
            .iter()
            .find(|p| !info.permissions.contains(p))
        {
            return Err(StyleError::MissingPermission {
                permission: missing.clone(),
            });
        }
        Ok(info)
    }

    pub async fn account(&self, api_key: &str) -> StyleResult<Account> {
        self.get("v2/account", api_key).await
    }
}
