use crate::oauth::OAuthConfig;
use crate::parser::ParserConfig;

/// Every configuration option the framework exposes, collected into one
/// struct. `from_env()` reads the same-named environment variables the
/// teacher's `main.rs` convention uses (`std::env::var` + an optional
/// `.env` file loaded via `dotenv`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub signing_secret: String,
    pub verification_token: Option<String>,
    pub single_team_bot_token: Option<String>,
    pub oauth: Option<OAuthConfig>,
    pub parser: ParserConfig,
}

impl AppConfig {
    pub fn builder(signing_secret: impl Into<String>) -> AppConfigBuilder {
        AppConfigBuilder::new(signing_secret)
    }

    /// Loads configuration from environment variables, mirroring the
    /// teacher's `std::env::var(...).unwrap_or_else(...)` convention.
    /// Returns an error if `SLACK_SIGNING_SECRET` is unset — every other
    /// field has a workable default or stays unset.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let signing_secret = std::env::var("SLACK_SIGNING_SECRET")
            .map_err(|_| anyhow::anyhow!("SLACK_SIGNING_SECRET environment variable must be set"))?;

        let mut builder = AppConfigBuilder::new(signing_secret);

        if let Ok(token) = std::env::var("SLACK_VERIFICATION_TOKEN") {
            builder = builder.verification_token(token);
        }
        if let Ok(token) = std::env::var("SLACK_BOT_TOKEN") {
            builder = builder.single_team_bot_token(token);
        }

        if let (Ok(client_id), Ok(client_secret)) = (
            std::env::var("SLACK_CLIENT_ID"),
            std::env::var("SLACK_CLIENT_SECRET"),
        ) {
            let scope = std::env::var("SLACK_SCOPES").unwrap_or_default();
            let user_scope = std::env::var("SLACK_USER_SCOPES").ok();
            let redirect_uri = std::env::var("SLACK_REDIRECT_URI").ok();
            let completion_url = std::env::var("SLACK_OAUTH_COMPLETION_URL")
                .unwrap_or_else(|_| "/slack/oauth_success".to_string());
            let cancellation_url = std::env::var("SLACK_OAUTH_CANCELLATION_URL")
                .unwrap_or_else(|_| "/slack/oauth_cancel".to_string());
            let classic = std::env::var("SLACK_CLASSIC_APP_PERMISSIONS_ENABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            let state_ttl = std::env::var("SLACK_STATE_EXPIRATION_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600);

            builder = builder.oauth(OAuthConfig {
                client_id,
                client_secret,
                scope,
                user_scope,
                redirect_uri,
                oauth_completion_url: completion_url,
                oauth_cancellation_url: cancellation_url,
                classic_app_permissions_enabled: classic,
                state_expiration_seconds: state_ttl,
                extra_install_query_params: Vec::new(),
            });
        }

        Ok(builder.build())
    }
}

pub struct AppConfigBuilder {
    signing_secret: String,
    verification_token: Option<String>,
    single_team_bot_token: Option<String>,
    oauth: Option<OAuthConfig>,
    parser: ParserConfig,
}

impl AppConfigBuilder {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            verification_token: None,
            single_team_bot_token: None,
            oauth: None,
            parser: ParserConfig::default(),
        }
    }

    pub fn verification_token(mut self, token: impl Into<String>) -> Self {
        self.verification_token = Some(token.into());
        self
    }

    pub fn single_team_bot_token(mut self, token: impl Into<String>) -> Self {
        self.single_team_bot_token = Some(token.into());
        self
    }

    pub fn oauth(mut self, oauth: OAuthConfig) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn parser_config(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    pub fn build(self) -> AppConfig {
        AppConfig {
            signing_secret: self.signing_secret,
            verification_token: self.verification_token,
            single_team_bot_token: self.single_team_bot_token,
            oauth: self.oauth,
            parser: self.parser,
        }
    }
}
