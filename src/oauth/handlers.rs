use crate::installation::Installation;
use crate::response::Response;

/// Invoked once `InstallationStore::save` has succeeded. Default: `302` to
/// `oauth_completion_url`.
#[async_trait::async_trait]
pub trait OAuthSuccessHandler: Send + Sync {
    async fn handle(&self, installation: &Installation, completion_url: &str) -> Response;
}

/// Shared shape for the three failure paths (`error` query param present,
/// state invalid/expired/reused, Slack API returned `ok:false`) and the
/// transport-exception path. Default: `302` to `oauth_cancellation_url`.
#[async_trait::async_trait]
pub trait OAuthFailureHandler: Send + Sync {
    async fn handle(&self, reason: &str, cancellation_url: &str) -> Response;
}

pub struct DefaultOAuthSuccessHandler;

#[async_trait::async_trait]
impl OAuthSuccessHandler for DefaultOAuthSuccessHandler {
    async fn handle(&self, _installation: &Installation, completion_url: &str) -> Response {
        Response::redirect(completion_url)
    }
}

pub struct DefaultOAuthFailureHandler;

#[async_trait::async_trait]
impl OAuthFailureHandler for DefaultOAuthFailureHandler {
    async fn handle(&self, reason: &str, cancellation_url: &str) -> Response {
        tracing::error!(reason = %reason, "OAuth callback failed");
        Response::redirect(cancellation_url)
    }
}
