use std::sync::Arc;

use chrono::Utc;

use crate::client::SlackApiClient;
use crate::installation::Installation;
use crate::oauth::config::OAuthConfig;
use crate::oauth::handlers::{
    DefaultOAuthFailureHandler, DefaultOAuthSuccessHandler, OAuthFailureHandler,
    OAuthSuccessHandler,
};
use crate::oauth::install::build_install_response;
use crate::request::OAuthCallbackParams;
use crate::response::Response;
use crate::store::{InstallationStore, OAuthStateStore};

/// Implements the OAuth install-start + callback state machine. Constructed
/// once by `App::start()` and shared (via `Arc`) across all concurrent
/// `run()` invocations.
pub struct OAuthFlow {
    pub config: OAuthConfig,
    pub client: Arc<SlackApiClient>,
    pub installation_store: Arc<dyn InstallationStore>,
    pub state_store: Arc<dyn OAuthStateStore>,
    pub success_handler: Arc<dyn OAuthSuccessHandler>,
    pub error_handler: Arc<dyn OAuthFailureHandler>,
    pub state_error_handler: Arc<dyn OAuthFailureHandler>,
    pub access_error_handler: Arc<dyn OAuthFailureHandler>,
    pub exception_handler: Arc<dyn OAuthFailureHandler>,
}

impl OAuthFlow {
    pub fn new(
        config: OAuthConfig,
        client: Arc<SlackApiClient>,
        installation_store: Arc<dyn InstallationStore>,
        state_store: Arc<dyn OAuthStateStore>,
    ) -> Self {
        Self {
            config,
            client,
            installation_store,
            state_store,
            success_handler: Arc::new(DefaultOAuthSuccessHandler),
            error_handler: Arc::new(DefaultOAuthFailureHandler),
            state_error_handler: Arc::new(DefaultOAuthFailureHandler),
            access_error_handler: Arc::new(DefaultOAuthFailureHandler),
            exception_handler: Arc::new(DefaultOAuthFailureHandler),
        }
    }

    pub async fn handle_install_start(&self) -> Response {
        build_install_response(&self.config, &self.state_store).await
    }

    /// Drives the callback state machine: error param, then state
    /// consumption, then code exchange, in that order, each with its own
    /// failure handler.
    pub async fn handle_callback(&self, params: &OAuthCallbackParams) -> Response {
        // 1. `error` present.
        if let Some(error) = &params.error {
            return self
                .error_handler
                .handle(error, &self.config.oauth_cancellation_url)
                .await;
        }

        // 2. `state` missing or fails to consume (unknown/expired/already used).
        let state = match &params.state {
            Some(s) => s,
            None => {
                return self
                    .state_error_handler
                    .handle("missing state", &self.config.oauth_cancellation_url)
                    .await
            }
        };

        match self.state_store.consume(state).await {
            Ok(true) => {}
            Ok(false) => {
                return self
                    .state_error_handler
                    .handle("state invalid, expired, or already consumed", &self.config.oauth_cancellation_url)
                    .await
            }
            Err(e) => {
                return self
                    .exception_handler
                    .handle(&format!("state store error: {e}"), &self.config.oauth_cancellation_url)
                    .await
            }
        }

        let code = match &params.code {
            Some(c) => c,
            None => {
                return self
                    .state_error_handler
                    .handle("missing code", &self.config.oauth_cancellation_url)
                    .await
            }
        };

        // 3. Exchange the code for tokens.
        let installation = if self.config.classic_app_permissions_enabled {
            self.exchange_v1(code).await
        } else {
            self.exchange_v2(code).await
        };

        let installation = match installation {
            Ok(installation) => installation,
            Err(ExchangeError::Transport(e)) => {
                return self
                    .exception_handler
                    .handle(&e, &self.config.oauth_cancellation_url)
                    .await
            }
            Err(ExchangeError::Api(e)) => {
                return self
                    .access_error_handler
                    .handle(&e, &self.config.oauth_cancellation_url)
                    .await
            }
        };

        if let Err(e) = self.installation_store.save(installation.clone()).await {
            return self
                .exception_handler
                .handle(&format!("failed to save installation: {e}"), &self.config.oauth_cancellation_url)
                .await;
        }

        self.success_handler
            .handle(&installation, &self.config.oauth_completion_url)
            .await
    }

    async fn exchange_v1(&self, code: &str) -> Result<Installation, ExchangeError> {
        let resp = self
            .client
            .oauth_access(
                &self.config.client_id,
                &self.config.client_secret,
                code,
                self.config.redirect_uri.as_deref(),
            )
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        if !resp.ok {
            return Err(ExchangeError::Api(
                resp.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        let bot_token = resp
            .access_token
            .ok_or_else(|| ExchangeError::Api("missing access_token".to_string()))?;
        let team_id = resp
            .team_id
            .ok_or_else(|| ExchangeError::Api("missing team_id".to_string()))?;

        Ok(Installation {
            enterprise_id: None,
            enterprise_url: None,
            team_id,
            team_name: resp.team_name,
            user_id: resp.user_id,
            bot_token,
            bot_id: None,
            bot_user_id: None,
            scopes: resp
                .scope
                .map(|s| s.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            installer_user_token: None,
            installed_at: Utc::now(),
        })
    }

    async fn exchange_v2(&self, code: &str) -> Result<Installation, ExchangeError> {
        let resp = self
            .client
            .oauth_v2_access(
                &self.config.client_id,
                &self.config.client_secret,
                code,
                self.config.redirect_uri.as_deref(),
            )
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        if !resp.ok {
            return Err(ExchangeError::Api(
                resp.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        let bot_token = resp
            .access_token
            .ok_or_else(|| ExchangeError::Api("missing access_token".to_string()))?;
        let team = resp
            .team
            .ok_or_else(|| ExchangeError::Api("missing team".to_string()))?;

        Ok(Installation {
            enterprise_id: resp.enterprise.as_ref().map(|e| e.id.clone()),
            enterprise_url: resp.enterprise.and_then(|e| e.url),
            team_id: team.id,
            team_name: team.name,
            user_id: resp.authed_user.as_ref().map(|u| u.id.clone()),
            bot_token,
            bot_id: resp.app_id,
            bot_user_id: resp.bot_user_id,
            scopes: resp
                .scope
                .map(|s| s.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
            installer_user_token: resp.authed_user.and_then(|u| u.access_token),
            installed_at: Utc::now(),
        })
    }
}

enum ExchangeError {
    Transport(String),
    Api(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryInstallationStore, MemoryOAuthStateStore, MockInstallationStore};
    use axum::routing::post;
    use axum::{Json, Router};

    fn test_config(classic: bool) -> OAuthConfig {
        OAuthConfig {
            client_id: "CLIENT".to_string(),
            client_secret: "SECRET".to_string(),
            scope: "chat:write".to_string(),
            user_scope: None,
            redirect_uri: None,
            oauth_completion_url: "https://example.com/ok".to_string(),
            oauth_cancellation_url: "https://example.com/cancel".to_string(),
            classic_app_permissions_enabled: classic,
            state_expiration_seconds: 600,
            extra_install_query_params: Vec::new(),
        }
    }

    fn flow(classic: bool) -> OAuthFlow {
        OAuthFlow::new(
            test_config(classic),
            Arc::new(SlackApiClient::new()),
            Arc::new(MemoryInstallationStore::new()),
            Arc::new(MemoryOAuthStateStore::new(600)),
        )
    }

    /// Spins up a throwaway local HTTP server that always answers
    /// `POST /oauth.v2.access` with `body`, so tests can exercise the real
    /// `reqwest`-based exchange path without calling out to Slack. The
    /// returned `JoinHandle` keeps the server alive for the test's duration.
    async fn spawn_mock_slack_server(body: serde_json::Value) -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
        async fn respond(
            axum::extract::State(body): axum::extract::State<serde_json::Value>,
        ) -> Json<serde_json::Value> {
            Json(body)
        }

        let router = Router::new()
            .route("/oauth.v2.access", post(respond))
            .with_state(body);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn error_param_redirects_to_cancellation_without_consuming_state() {
        let flow = flow(false);
        let state = flow.state_store.issue().await.unwrap();

        let resp = flow
            .handle_callback(&OAuthCallbackParams {
                code: None,
                state: Some(state.clone()),
                error: Some("access_denied".to_string()),
            })
            .await;

        assert_eq!(resp.status_code, 302);
        assert_eq!(
            resp.headers.get(http::header::LOCATION).unwrap(),
            "https://example.com/cancel"
        );
        // State was never consumed because the error short-circuits first.
        assert!(flow.state_store.consume(&state).await.unwrap());
    }

    #[tokio::test]
    async fn missing_state_redirects_to_cancellation() {
        let flow = flow(false);
        let resp = flow
            .handle_callback(&OAuthCallbackParams {
                code: Some("abc".to_string()),
                state: None,
                error: None,
            })
            .await;
        assert_eq!(resp.status_code, 302);
        assert_eq!(
            resp.headers.get(http::header::LOCATION).unwrap(),
            "https://example.com/cancel"
        );
    }

    #[tokio::test]
    async fn reused_state_is_rejected_on_second_callback() {
        let flow = flow(false);
        let state = flow.state_store.issue().await.unwrap();
        assert!(flow.state_store.consume(&state).await.unwrap());

        let resp = flow
            .handle_callback(&OAuthCallbackParams {
                code: Some("abc".to_string()),
                state: Some(state),
                error: None,
            })
            .await;
        assert_eq!(resp.status_code, 302);
        assert_eq!(
            resp.headers.get(http::header::LOCATION).unwrap(),
            "https://example.com/cancel"
        );
    }

    #[tokio::test]
    async fn successful_v2_callback_saves_installation_and_redirects_to_completion_url() {
        let (addr, _server) = spawn_mock_slack_server(serde_json::json!({
            "ok": true,
            "access_token": "xoxb-X",
            "scope": "chat:write",
            "bot_user_id": "U-BOT",
            "app_id": "A1",
            "team": {"id": "T1", "name": "Test Team"},
        }))
        .await;

        let mut store = MockInstallationStore::new();
        store
            .expect_save()
            .withf(|installation| installation.bot_token == "xoxb-X" && installation.team_id == "T1")
            .times(1)
            .returning(|_| Ok(()));

        let flow = OAuthFlow::new(
            test_config(false),
            Arc::new(SlackApiClient::with_base_url(format!("http://{addr}"))),
            Arc::new(store),
            Arc::new(MemoryOAuthStateStore::new(600)),
        );
        let state = flow.state_store.issue().await.unwrap();

        let resp = flow
            .handle_callback(&OAuthCallbackParams {
                code: Some("good-code".to_string()),
                state: Some(state),
                error: None,
            })
            .await;

        assert_eq!(resp.status_code, 302);
        assert_eq!(
            resp.headers.get(http::header::LOCATION).unwrap(),
            "https://example.com/ok"
        );
    }

    #[tokio::test]
    async fn access_error_from_slack_redirects_to_cancellation_without_saving() {
        let (addr, _server) = spawn_mock_slack_server(serde_json::json!({
            "ok": false,
            "error": "invalid_code",
        }))
        .await;

        let mut store = MockInstallationStore::new();
        store.expect_save().times(0);

        let flow = OAuthFlow::new(
            test_config(false),
            Arc::new(SlackApiClient::with_base_url(format!("http://{addr}"))),
            Arc::new(store),
            Arc::new(MemoryOAuthStateStore::new(600)),
        );
        let state = flow.state_store.issue().await.unwrap();

        let resp = flow
            .handle_callback(&OAuthCallbackParams {
                code: Some("bad-code".to_string()),
                state: Some(state),
                error: None,
            })
            .await;

        assert_eq!(resp.status_code, 302);
        assert_eq!(
            resp.headers.get(http::header::LOCATION).unwrap(),
            "https://example.com/cancel"
        );
    }

    #[tokio::test]
    async fn transport_failure_during_exchange_redirects_to_cancellation_without_saving() {
        // Nothing is listening on this port: the exchange call fails at the
        // transport layer rather than returning a parsed Slack response.
        let unreachable_addr = "127.0.0.1:1";

        let mut store = MockInstallationStore::new();
        store.expect_save().times(0);

        let flow = OAuthFlow::new(
            test_config(false),
            Arc::new(SlackApiClient::with_base_url(format!("http://{unreachable_addr}"))),
            Arc::new(store),
            Arc::new(MemoryOAuthStateStore::new(600)),
        );
        let state = flow.state_store.issue().await.unwrap();

        let resp = flow
            .handle_callback(&OAuthCallbackParams {
                code: Some("any-code".to_string()),
                state: Some(state),
                error: None,
            })
            .await;

        assert_eq!(resp.status_code, 302);
        assert_eq!(
            resp.headers.get(http::header::LOCATION).unwrap(),
            "https://example.com/cancel"
        );
    }
}
