use chrono::Utc;

use super::{Middleware, Next};
use crate::error::AppError;
use crate::request::Request;
use crate::response::Response;
use crate::signature::SignatureVerifier;

/// Wraps `SignatureVerifier` as a pipeline stage. Runs before any
/// authorization/user middleware in the default stack. Skipped for
/// `OAuthStart`/`OAuthCallback`, which are GETs with no signable body and
/// are instead protected by the one-time state token.
pub struct VerifySignature {
    verifier: SignatureVerifier,
}

impl VerifySignature {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            verifier: SignatureVerifier::new(signing_secret),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for VerifySignature {
    async fn apply(
        &self,
        req: &mut Request,
        draft: Response,
        next: Next<'_>,
    ) -> Result<Response, anyhow::Error> {
        use crate::request::RequestKind;
        if matches!(req.kind, RequestKind::OAuthStart | RequestKind::OAuthCallback) {
            return next.run(req, draft).await;
        }

        let timestamp = req.header_str("X-Slack-Request-Timestamp").map(str::to_string);
        let signature = req.header_str("X-Slack-Signature").map(str::to_string);

        let result = self.verifier.verify(
            timestamp.as_deref(),
            signature.as_deref(),
            &req.raw_body,
            Utc::now().timestamp(),
        );

        match result {
            Ok(()) => next.run(req, draft).await,
            Err(e @ (AppError::MissingSignatureHeaders | AppError::RequestExpired | AppError::InvalidSignature)) => {
                tracing::warn!(error = %e, "Slack request signature verification failed");
                Ok(e.into_response())
            }
            Err(other) => Ok(other.into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{BoxFuture, FnTerminal, MiddlewareChain};
    use crate::request::{ParsedPayload, RequestKind};
    use std::sync::Arc;

    const SECRET: &str = "verify-signature-test-secret";

    #[tokio::test]
    async fn valid_signature_reaches_terminal() {
        let mut req = crate::tests_support::dummy_slash_command_request();
        req.raw_body = b"command=%2Fhelp&team_id=T1".to_vec();
        let verifier = SignatureVerifier::new(SECRET);
        let ts = Utc::now().timestamp().to_string();
        let sig = verifier.sign(&ts, &req.raw_body);
        req.headers.insert("X-Slack-Request-Timestamp", ts.parse().unwrap());
        req.headers.insert("X-Slack-Signature", sig.parse().unwrap());

        let chain = MiddlewareChain::new(vec![Arc::new(VerifySignature::new(SECRET))]);
        let terminal = FnTerminal(|_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            Box::pin(async { Ok(Response::ok()) })
        });
        let resp = chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(resp.status_code, 200);
    }

    #[tokio::test]
    async fn missing_headers_rejected_with_401_before_terminal() {
        let mut req = crate::tests_support::dummy_slash_command_request();
        let chain = MiddlewareChain::new(vec![Arc::new(VerifySignature::new(SECRET))]);
        let terminal = FnTerminal(|_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            Box::pin(async { Ok(Response::ok()) })
        });

        let resp = chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(resp.status_code, 401);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let mut req = crate::tests_support::dummy_slash_command_request();
        req.raw_body = b"command=%2Fhelp&team_id=T1".to_vec();
        let signer = SignatureVerifier::new("a-different-secret");
        let ts = Utc::now().timestamp().to_string();
        let sig = signer.sign(&ts, &req.raw_body);
        req.headers.insert("X-Slack-Request-Timestamp", ts.parse().unwrap());
        req.headers.insert("X-Slack-Signature", sig.parse().unwrap());

        let chain = MiddlewareChain::new(vec![Arc::new(VerifySignature::new(SECRET))]);
        let terminal = FnTerminal(|_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            Box::pin(async { Ok(Response::ok()) })
        });
        let resp = chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(resp.status_code, 401);
    }

    #[tokio::test]
    async fn oauth_start_skips_verification_entirely() {
        let mut req = crate::tests_support::dummy_slash_command_request();
        req.kind = RequestKind::OAuthStart;
        req.payload = ParsedPayload::OAuthStart;
        let chain = MiddlewareChain::new(vec![Arc::new(VerifySignature::new(SECRET))]);
        let terminal = FnTerminal(|_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            Box::pin(async { Ok(Response::ok()) })
        });

        let resp = chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(resp.status_code, 200);
    }
}
