use super::{Middleware, Next};
use crate::request::{ParsedPayload, Request, RequestKind};
use crate::response::Response;

/// Legacy SSL-check middleware that precedes signature verification. For
/// slash commands only: if the form body carries `ssl_check=1`, respond
/// `200 OK` immediately without invoking downstream middleware or a
/// handler. When a legacy verification token is configured, the form's
/// `token` field must match it before the short-circuit fires — otherwise
/// the request falls through to the normal signature/auth path like any
/// other slash command.
pub struct SslCheck {
    verification_token: Option<String>,
}

impl SslCheck {
    pub fn new(verification_token: Option<String>) -> Self {
        Self { verification_token }
    }
}

#[async_trait::async_trait]
impl Middleware for SslCheck {
    async fn apply(
        &self,
        req: &mut Request,
        draft: Response,
        next: Next<'_>,
    ) -> Result<Response, anyhow::Error> {
        if req.kind == RequestKind::SlashCommand {
            if let ParsedPayload::SlashCommand(fields) = &req.payload {
                let is_ssl_check = fields.get("ssl_check").map(String::as_str) == Some("1");
                let token_ok = match &self.verification_token {
                    Some(expected) => fields.get("token").map(String::as_str) == Some(expected.as_str()),
                    None => true,
                };
                if is_ssl_check && token_ok {
                    return Ok(Response::ok());
                }
            }
        }
        next.run(req, draft).await
    }
}
