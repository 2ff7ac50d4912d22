use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::cancellation::CancellationSignal;
use crate::client::SlackApiClient;

/// Per-request mutable bag carried through the middleware chain and into
/// the matched handler. Exclusively owned by the request that created it —
/// never shared across requests.
///
/// Fields set by the auth middlewares (`bot_token`, `user_token`,
/// `bot_user_id`, `bot_id`) are `None` until that middleware runs; handlers
/// read them but must not mutate them (enforced by convention, not the type
/// system, matching the convention used for `axum::extract::State`-style
/// request state, where state flows one-directionally through the request).
#[derive(Clone)]
pub struct Context {
    pub request_timestamp: i64,
    pub team_id: Option<String>,
    pub enterprise_id: Option<String>,
    pub user_id: Option<String>,
    pub bot_token: Option<String>,
    pub user_token: Option<String>,
    pub bot_id: Option<String>,
    pub bot_user_id: Option<String>,
    pub client: Arc<SlackApiClient>,
    pub cancellation_url: Option<String>,
    pub cancellation: CancellationSignal,
    /// Free-form bag for middleware-to-middleware communication beyond the
    /// named fields above.
    pub extra: HashMap<String, Value>,
}

impl Context {
    pub fn new(request_timestamp: i64, client: Arc<SlackApiClient>) -> Self {
        Self {
            request_timestamp,
            team_id: None,
            enterprise_id: None,
            user_id: None,
            bot_token: None,
            user_token: None,
            bot_id: None,
            bot_user_id: None,
            client,
            cancellation_url: None,
            cancellation: CancellationSignal::new(),
            extra: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_timestamp", &self.request_timestamp)
            .field("team_id", &self.team_id)
            .field("enterprise_id", &self.enterprise_id)
            .field("user_id", &self.user_id)
            .field("bot_id", &self.bot_id)
            .field("bot_user_id", &self.bot_user_id)
            .field("cancellation_url", &self.cancellation_url)
            .finish_non_exhaustive()
    }
}
