use std::sync::Arc;

use super::{Middleware, Next};
use crate::error::AppError;
use crate::request::{Request, RequestKind};
use crate::response::Response;
use crate::store::InstallationStore;

/// Distributed-app auth: looks up the installation for the request's team
/// (+ optional enterprise) in `InstallationStore` and populates `Context`
/// with its bot token / bot user id / Slack client. Short-circuits `401`
/// when no installation is on file. Skipped for the OAuth endpoints
/// themselves, which have no installation yet, and for URL verification,
/// whose challenge payload carries no `team_id`.
pub struct MultiTeamsAuthorization {
    store: Arc<dyn InstallationStore>,
}

impl MultiTeamsAuthorization {
    pub fn new(store: Arc<dyn InstallationStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Middleware for MultiTeamsAuthorization {
    async fn apply(
        &self,
        req: &mut Request,
        draft: Response,
        next: Next<'_>,
    ) -> Result<Response, anyhow::Error> {
        if matches!(
            req.kind,
            RequestKind::OAuthStart | RequestKind::OAuthCallback | RequestKind::UrlVerification
        ) {
            return next.run(req, draft).await;
        }

        let (team_id, enterprise_id) = req.payload.team_and_enterprise();
        let team_id = match team_id {
            Some(id) => id,
            None => return Ok(AppError::Unauthorized.into_response()),
        };

        match self
            .store
            .find_bot(enterprise_id.as_deref(), &team_id)
            .await
        {
            Ok(Some(installation)) => {
                req.context.team_id = Some(team_id);
                req.context.enterprise_id = enterprise_id;
                req.context.bot_token = Some(installation.bot_token);
                req.context.bot_id = installation.bot_id;
                req.context.bot_user_id = installation.bot_user_id;
                next.run(req, draft).await
            }
            Ok(None) => Ok(AppError::Unauthorized.into_response()),
            Err(e) => {
                tracing::error!(error = %e, "installation store lookup failed");
                Ok(AppError::Internal(e.to_string()).into_response())
            }
        }
    }
}

/// Single-workspace auth: no lookup, just installs a fixed bot token into
/// every request's `Context`.
pub struct SingleTeamAuthorization {
    bot_token: String,
}

impl SingleTeamAuthorization {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for SingleTeamAuthorization {
    async fn apply(
        &self,
        req: &mut Request,
        draft: Response,
        next: Next<'_>,
    ) -> Result<Response, anyhow::Error> {
        if !matches!(req.kind, RequestKind::OAuthStart | RequestKind::OAuthCallback) {
            req.context.bot_token = Some(self.bot_token.clone());
        }
        next.run(req, draft).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installation::Installation;
    use crate::middleware::{BoxFuture, FnTerminal, MiddlewareChain};
    use crate::request::ParsedPayload;
    use crate::store::MemoryInstallationStore;
    use chrono::Utc;
    use std::collections::HashMap;

    fn slash_command_request_for_team(team_id: &str) -> Request {
        let mut req = crate::tests_support::dummy_slash_command_request();
        let mut fields = HashMap::new();
        fields.insert("command".to_string(), "/help".to_string());
        fields.insert("team_id".to_string(), team_id.to_string());
        req.payload = ParsedPayload::SlashCommand(fields);
        req
    }

    #[tokio::test]
    async fn missing_installation_short_circuits_401() {
        let store = Arc::new(MemoryInstallationStore::new());
        let chain = MiddlewareChain::new(vec![Arc::new(MultiTeamsAuthorization::new(store))]);
        let mut req = slash_command_request_for_team("T-UNKNOWN");
        let terminal = FnTerminal(|_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            Box::pin(async { Ok(Response::ok()) })
        });

        let resp = chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(resp.status_code, 401);
    }

    #[tokio::test]
    async fn known_installation_populates_context_and_continues() {
        let store = Arc::new(MemoryInstallationStore::new());
        store
            .save(Installation {
                enterprise_id: None,
                enterprise_url: None,
                team_id: "T1".to_string(),
                team_name: None,
                user_id: None,
                bot_token: "xoxb-known".to_string(),
                bot_id: Some("B1".to_string()),
                bot_user_id: Some("U-BOT".to_string()),
                scopes: vec![],
                installer_user_token: None,
                installed_at: Utc::now(),
            })
            .await
            .unwrap();

        let chain = MiddlewareChain::new(vec![Arc::new(MultiTeamsAuthorization::new(store))]);
        let mut req = slash_command_request_for_team("T1");
        let terminal = FnTerminal(|_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            Box::pin(async { Ok(Response::ok()) })
        });

        let resp = chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(req.context.bot_token.as_deref(), Some("xoxb-known"));
        assert_eq!(req.context.bot_user_id.as_deref(), Some("U-BOT"));
    }

    #[tokio::test]
    async fn url_verification_skips_team_lookup() {
        let store = Arc::new(MemoryInstallationStore::new());
        let chain = MiddlewareChain::new(vec![Arc::new(MultiTeamsAuthorization::new(store))]);
        let mut req = crate::tests_support::dummy_slash_command_request();
        req.kind = RequestKind::UrlVerification;
        req.payload = ParsedPayload::UrlVerification {
            challenge: "abc".to_string(),
        };
        let terminal = FnTerminal(|_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            Box::pin(async { Ok(Response::ok()) })
        });

        let resp = chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(resp.status_code, 200);
        assert!(req.context.bot_token.is_none());
    }

    #[tokio::test]
    async fn single_team_authorization_installs_static_token() {
        let chain = MiddlewareChain::new(vec![Arc::new(SingleTeamAuthorization::new("xoxb-static"))]);
        let mut req = slash_command_request_for_team("T-ANY");
        let terminal = FnTerminal(|_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            Box::pin(async { Ok(Response::ok()) })
        });

        chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(req.context.bot_token.as_deref(), Some("xoxb-static"));
    }
}
