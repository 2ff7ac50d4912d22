use serde::{Deserialize, Serialize};

/// Minimal Slack Web API surface needed by the core: OAuth code exchange and
/// the generic `response_url` / `chat.postMessage`-style POST handlers use
/// to reply. A full Web API client is out of scope; this is the external
/// collaborator, reached through an abstract interface, that the Context
/// hands to handlers.
pub struct SlackApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl SlackApiClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://slack.com/api".to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// `oauth.access` — the v1/classic token exchange.
    pub async fn oauth_access(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<OAuthV1AccessResponse, reqwest::Error> {
        let mut form = vec![
            ("client_id", client_id.to_string()),
            ("client_secret", client_secret.to_string()),
            ("code", code.to_string()),
        ];
        if let Some(uri) = redirect_uri {
            form.push(("redirect_uri", uri.to_string()));
        }

        self.http
            .post(format!("{}/oauth.access", self.base_url))
            .form(&form)
            .send()
            .await?
            .json()
            .await
    }

    /// `oauth.v2.access` — the v2 token exchange (separate bot/user scopes).
    pub async fn oauth_v2_access(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<OAuthV2AccessResponse, reqwest::Error> {
        let mut form = vec![
            ("client_id", client_id.to_string()),
            ("client_secret", client_secret.to_string()),
            ("code", code.to_string()),
        ];
        if let Some(uri) = redirect_uri {
            form.push(("redirect_uri", uri.to_string()));
        }

        self.http
            .post(format!("{}/oauth.v2.access", self.base_url))
            .form(&form)
            .send()
            .await?
            .json()
            .await
    }

    /// POST a replacement message to a Block Kit `response_url`, the way
    /// interactive-component handlers update the original message in place.
    pub async fn post_to_response_url(
        &self,
        response_url: &str,
        body: &serde_json::Value,
    ) -> Result<(), reqwest::Error> {
        let resp = self.http.post(response_url).json(body).send().await?;
        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "response_url POST returned non-success");
        }
        Ok(())
    }
}

impl Default for SlackApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthV1AccessResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthV2Team {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthV2AuthedUser {
    pub id: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthV2AccessResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub bot_user_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub team: Option<OAuthV2Team>,
    #[serde(default)]
    pub enterprise: Option<OAuthV2Team>,
    #[serde(default)]
    pub authed_user: Option<OAuthV2AuthedUser>,
}
