use chrono::{DateTime, Utc};

/// Persisted record of a single workspace install. Keyed by
/// `(enterprise_id?, team_id, user_id?)` — the core holds only references by
/// key; lifetime is owned by whatever `InstallationStore` is configured.
#[derive(Debug, Clone)]
pub struct Installation {
    pub enterprise_id: Option<String>,
    pub enterprise_url: Option<String>,
    pub team_id: String,
    pub team_name: Option<String>,
    pub user_id: Option<String>,
    pub bot_token: String,
    pub bot_id: Option<String>,
    pub bot_user_id: Option<String>,
    pub scopes: Vec<String>,
    pub installer_user_token: Option<String>,
    pub installed_at: DateTime<Utc>,
}

impl Installation {
    pub fn key(&self) -> (Option<String>, String, Option<String>) {
        (
            self.enterprise_id.clone(),
            self.team_id.clone(),
            self.user_id.clone(),
        )
    }
}
