//! Shared fixtures for unit tests across modules.
use std::sync::Arc;

use http::HeaderMap;

use crate::client::SlackApiClient;
use crate::context::Context;
use crate::request::{ParsedPayload, Request, RequestKind};

pub fn dummy_slash_command_request() -> Request {
    Request {
        kind: RequestKind::SlashCommand,
        method: "POST".to_string(),
        path: "/slack/commands".to_string(),
        raw_body: Vec::new(),
        headers: HeaderMap::new(),
        payload: ParsedPayload::SlashCommand(Default::default()),
        context: Context::new(0, Arc::new(SlackApiClient::new())),
    }
}
