use super::{Middleware, Next};
use crate::request::{ParsedPayload, Request, RequestKind};
use crate::response::Response;

/// For `Event` requests only: short-circuits `200 OK` without invoking any
/// handler when the event's `user` or `bot_id` matches the authorized bot's
/// own identity in `Context`. Prevents a bot from responding to itself and
/// looping forever. Must run after an authorization middleware has
/// populated `bot_id`/`bot_user_id`.
pub struct IgnoringSelfEvents;

#[async_trait::async_trait]
impl Middleware for IgnoringSelfEvents {
    async fn apply(
        &self,
        req: &mut Request,
        draft: Response,
        next: Next<'_>,
    ) -> Result<Response, anyhow::Error> {
        if req.kind == RequestKind::Event {
            if let ParsedPayload::Event { envelope, .. } = &req.payload {
                let event_user = envelope
                    .get("event")
                    .and_then(|e| e.get("user"))
                    .and_then(|v| v.as_str());
                let event_bot_id = envelope
                    .get("event")
                    .and_then(|e| e.get("bot_id"))
                    .and_then(|v| v.as_str());

                let is_self_user = match (event_user, &req.context.bot_user_id) {
                    (Some(u), Some(bot_user_id)) => u == bot_user_id,
                    _ => false,
                };
                let is_self_bot = match (event_bot_id, &req.context.bot_id) {
                    (Some(b), Some(bot_id)) => b == bot_id,
                    _ => false,
                };

                if is_self_user || is_self_bot {
                    return Ok(Response::ok());
                }
            }
        }
        next.run(req, draft).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SlackApiClient;
    use crate::context::Context;
    use crate::middleware::{BoxFuture, FnTerminal, MiddlewareChain};
    use std::sync::{Arc, Mutex};

    fn event_request(bot_user_id: Option<&str>, bot_id: Option<&str>, envelope: serde_json::Value) -> Request {
        let mut context = Context::new(0, Arc::new(SlackApiClient::new()));
        context.bot_user_id = bot_user_id.map(str::to_string);
        context.bot_id = bot_id.map(str::to_string);
        Request {
            kind: RequestKind::Event,
            method: "POST".to_string(),
            path: "/slack/events".to_string(),
            raw_body: Vec::new(),
            headers: http::HeaderMap::new(),
            payload: ParsedPayload::Event {
                event_type: "message".to_string(),
                event_subtype: None,
                envelope,
            },
            context,
        }
    }

    #[tokio::test]
    async fn event_from_own_bot_user_id_is_ignored() {
        let called = Arc::new(Mutex::new(false));
        let called_clone = called.clone();
        let terminal = FnTerminal(move |_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            let called = called_clone.clone();
            Box::pin(async move {
                *called.lock().unwrap() = true;
                Ok(Response::ok())
            })
        });
        let chain = MiddlewareChain::new(vec![Arc::new(IgnoringSelfEvents)]);
        let mut req = event_request(
            Some("U-BOT"),
            None,
            serde_json::json!({"event": {"type": "message", "user": "U-BOT", "text": "hi"}}),
        );

        let resp = chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(resp.status_code, 200);
        assert!(!*called.lock().unwrap());
    }

    #[tokio::test]
    async fn event_from_own_bot_id_is_ignored() {
        let called = Arc::new(Mutex::new(false));
        let called_clone = called.clone();
        let terminal = FnTerminal(move |_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            let called = called_clone.clone();
            Box::pin(async move {
                *called.lock().unwrap() = true;
                Ok(Response::ok())
            })
        });
        let chain = MiddlewareChain::new(vec![Arc::new(IgnoringSelfEvents)]);
        let mut req = event_request(
            None,
            Some("B-SELF"),
            serde_json::json!({"event": {"type": "message", "bot_id": "B-SELF", "text": "hi"}}),
        );

        let resp = chain.run(&mut req, &terminal).await.unwrap();
        assert_eq!(resp.status_code, 200);
        assert!(!*called.lock().unwrap());
    }

    #[tokio::test]
    async fn event_from_other_user_reaches_terminal() {
        let called = Arc::new(Mutex::new(false));
        let called_clone = called.clone();
        let terminal = FnTerminal(move |_req: &mut Request| -> BoxFuture<'_, Result<Response, anyhow::Error>> {
            let called = called_clone.clone();
            Box::pin(async move {
                *called.lock().unwrap() = true;
                Ok(Response::ok())
            })
        });
        let chain = MiddlewareChain::new(vec![Arc::new(IgnoringSelfEvents)]);
        let mut req = event_request(
            Some("U-BOT"),
            None,
            serde_json::json!({"event": {"type": "message", "user": "U-OTHER", "text": "hi"}}),
        );

        chain.run(&mut req, &terminal).await.unwrap();
        assert!(*called.lock().unwrap());
    }
}
