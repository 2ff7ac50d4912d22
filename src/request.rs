use std::collections::HashMap;

use http::HeaderMap;
use serde_json::Value;

use crate::context::Context;

/// The closed set of request kinds this framework understands. Exactly one
/// is assigned per `Request` by `RequestParser`; there is no fallthrough
/// variant — an unrecognized request is a parse error, not a silent kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    UrlVerification,
    Event,
    SlashCommand,
    BlockAction,
    BlockSuggestion,
    MessageAction,
    AttachmentAction,
    ViewSubmission,
    ViewClosed,
    DialogSubmission,
    DialogSuggestion,
    DialogCancellation,
    OutgoingWebhook,
    OAuthStart,
    OAuthCallback,
}

/// The query parameters Slack appends to the OAuth callback redirect.
#[derive(Debug, Clone, Default)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Kind-specific structured payload produced by `RequestParser`.
#[derive(Debug, Clone)]
pub enum ParsedPayload {
    UrlVerification { challenge: String },
    /// `event.type` + `event.subtype` (subtype literal "null" when absent),
    /// plus the full envelope for handlers that need more than the key.
    Event {
        event_type: String,
        event_subtype: Option<String>,
        envelope: Value,
    },
    /// `command=/foo` form fields, e.g. `text`, `channel_id`, `user_id`.
    SlashCommand(HashMap<String, String>),
    /// The decoded `payload` JSON for Block Kit interactions.
    BlockAction(Value),
    BlockSuggestion(Value),
    MessageAction(Value),
    AttachmentAction(Value),
    ViewSubmission(Value),
    ViewClosed(Value),
    DialogSubmission(Value),
    DialogSuggestion(Value),
    DialogCancellation(Value),
    /// Legacy outgoing-webhook form fields.
    OutgoingWebhook(HashMap<String, String>),
    OAuthStart,
    OAuthCallback(OAuthCallbackParams),
}

impl ParsedPayload {
    /// The key the Dispatcher looks up in the registry for this payload, if
    /// it's pattern/exact keyed (returns `None` for the kinds the Dispatcher
    /// handles without a registry lookup).
    pub fn dispatch_key(&self) -> Option<String> {
        match self {
            ParsedPayload::Event {
                event_type,
                event_subtype,
                ..
            } => Some(format!(
                "{}:{}",
                event_type,
                event_subtype.as_deref().unwrap_or("null")
            )),
            ParsedPayload::SlashCommand(fields) => fields.get("command").cloned(),
            ParsedPayload::OutgoingWebhook(fields) => fields.get("trigger_word").cloned(),
            ParsedPayload::BlockAction(v) => {
                // Dispatch only on the first action's id, whether or not
                // more follow — Slack only consumes one response.
                let actions = v.get("actions").and_then(Value::as_array)?;
                actions
                    .first()?
                    .get("action_id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }
            ParsedPayload::BlockSuggestion(v) => {
                v.get("action_id").and_then(Value::as_str).map(str::to_string)
            }
            ParsedPayload::MessageAction(v)
            | ParsedPayload::AttachmentAction(v)
            | ParsedPayload::ViewSubmission(v)
            | ParsedPayload::ViewClosed(v)
            | ParsedPayload::DialogSubmission(v)
            | ParsedPayload::DialogSuggestion(v)
            | ParsedPayload::DialogCancellation(v) => {
                v.get("callback_id").and_then(Value::as_str).map(str::to_string)
            }
            ParsedPayload::UrlVerification { .. }
            | ParsedPayload::OAuthStart
            | ParsedPayload::OAuthCallback(_) => None,
        }
    }

    /// Team/enterprise ids, when the payload carries them — used by
    /// `MultiTeamsAuthorization` before any handler runs.
    pub fn team_and_enterprise(&self) -> (Option<String>, Option<String>) {
        let v = match self {
            ParsedPayload::Event { envelope, .. } => Some(envelope),
            ParsedPayload::BlockAction(v)
            | ParsedPayload::BlockSuggestion(v)
            | ParsedPayload::MessageAction(v)
            | ParsedPayload::AttachmentAction(v)
            | ParsedPayload::ViewSubmission(v)
            | ParsedPayload::ViewClosed(v)
            | ParsedPayload::DialogSubmission(v)
            | ParsedPayload::DialogSuggestion(v)
            | ParsedPayload::DialogCancellation(v) => Some(v),
            _ => None,
        };
        let team = v
            .and_then(|v| v.get("team_id").or_else(|| v.get("team").and_then(|t| t.get("id"))))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| match self {
                ParsedPayload::SlashCommand(f) | ParsedPayload::OutgoingWebhook(f) => {
                    f.get("team_id").cloned()
                }
                _ => None,
            });
        let enterprise = v
            .and_then(|v| v.get("enterprise_id").or_else(|| v.get("enterprise").and_then(|e| e.get("id"))))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| match self {
                ParsedPayload::SlashCommand(f) | ParsedPayload::OutgoingWebhook(f) => {
                    f.get("enterprise_id").cloned()
                }
                _ => None,
            });
        (team, enterprise)
    }
}

/// A normalized, already-parsed inbound HTTP request. Produced by
/// `RequestParser::parse`; carried unchanged through the middleware chain
/// and into the matched handler.
#[derive(Debug)]
pub struct Request {
    pub kind: RequestKind,
    pub method: String,
    pub path: String,
    pub raw_body: Vec<u8>,
    pub headers: HeaderMap,
    pub payload: ParsedPayload,
    pub context: Context,
}

impl Request {
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.raw_body).ok()
    }
}
