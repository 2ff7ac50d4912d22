/// OAuth app identity + install/callback configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub user_scope: Option<String>,
    pub redirect_uri: Option<String>,
    pub oauth_completion_url: String,
    pub oauth_cancellation_url: String,
    /// Selects v1 (`classic`) vs v2 install URL + access call.
    pub classic_app_permissions_enabled: bool,
    pub state_expiration_seconds: i64,
    /// Extra query parameters appended to the generated install URL, the
    /// install-time analogue of Bolt's `install_path_options` extensibility
    /// hook.
    pub extra_install_query_params: Vec<(String, String)>,
}

impl OAuthConfig {
    pub fn authorize_base_url(&self) -> &'static str {
        if self.classic_app_permissions_enabled {
            "https://slack.com/oauth/authorize"
        } else {
            "https://slack.com/oauth/v2/authorize"
        }
    }
}
