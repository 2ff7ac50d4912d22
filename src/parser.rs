use std::collections::HashMap;

use http::HeaderMap;
use serde_json::Value;

use crate::error::AppError;
use crate::request::{OAuthCallbackParams, ParsedPayload, RequestKind};

/// Paths the parser recognizes as the two OAuth endpoints.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub oauth_start_path: String,
    pub oauth_callback_path: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            oauth_start_path: "/slack/install".to_string(),
            oauth_callback_path: "/slack/oauth_redirect".to_string(),
        }
    }
}

/// Normalizes raw HTTP into a `(RequestKind, ParsedPayload)` pair, following
/// a fixed cascade of classification rules in order. No global state: a
/// `ParserConfig` is passed in explicitly instead of read from a static.
pub struct RequestParser {
    config: ParserConfig,
}

impl RequestParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn classify(
        &self,
        method: &str,
        path: &str,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> Result<(RequestKind, ParsedPayload), AppError> {
        // Rule 1 & 2: OAuth endpoints are matched on path before anything
        // about the body is inspected. The path may carry a query string
        // (the callback always does), so compare only the path component.
        let path_only = path.split_once('?').map(|(p, _)| p).unwrap_or(path);
        if path_only == self.config.oauth_start_path {
            return Ok((RequestKind::OAuthStart, ParsedPayload::OAuthStart));
        }
        if path_only == self.config.oauth_callback_path {
            return Ok((
                RequestKind::OAuthCallback,
                ParsedPayload::OAuthCallback(parse_oauth_callback_query(path)),
            ));
        }

        let content_type = content_type_of(headers);

        if content_type.starts_with("application/json") {
            return self.classify_json(raw_body);
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            return self.classify_form(raw_body);
        }

        Err(AppError::UnrecognizedRequest)
    }

    fn classify_json(&self, raw_body: &[u8]) -> Result<(RequestKind, ParsedPayload), AppError> {
        let body: Value = serde_json::from_slice(raw_body)
            .map_err(|e| AppError::MalformedBody(e.to_string()))?;

        match body.get("type").and_then(Value::as_str) {
            Some("url_verification") => {
                let challenge = body
                    .get("challenge")
                    .and_then(Value::as_str)
                    .ok_or_else(|| AppError::MalformedBody("missing challenge".to_string()))?
                    .to_string();
                Ok((
                    RequestKind::UrlVerification,
                    ParsedPayload::UrlVerification { challenge },
                ))
            }
            Some("event_callback") => {
                let event = body
                    .get("event")
                    .ok_or_else(|| AppError::MalformedBody("missing event".to_string()))?;
                let event_type = event
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| AppError::MalformedBody("missing event.type".to_string()))?
                    .to_string();
                let event_subtype = event
                    .get("subtype")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok((
                    RequestKind::Event,
                    ParsedPayload::Event {
                        event_type,
                        event_subtype,
                        envelope: body,
                    },
                ))
            }
            _ => Err(AppError::UnrecognizedRequest),
        }
    }

    fn classify_form(&self, raw_body: &[u8]) -> Result<(RequestKind, ParsedPayload), AppError> {
        let body_str = std::str::from_utf8(raw_body)
            .map_err(|_| AppError::MalformedBody("body is not valid UTF-8".to_string()))?;
        let fields = parse_form_urlencoded(body_str);

        // Rule 5: an interactive-component `payload` field wins over
        // slash-command/outgoing-webhook classification.
        if let Some(payload_str) = fields.get("payload") {
            let payload: Value = serde_json::from_str(payload_str)
                .map_err(|e| AppError::MalformedBody(e.to_string()))?;
            let kind_str = payload
                .get("type")
                .and_then(Value::as_str)
                .ok_or(AppError::UnrecognizedRequest)?;

            let kind = match kind_str {
                "block_actions" => RequestKind::BlockAction,
                "block_suggestion" => RequestKind::BlockSuggestion,
                "message_action" => RequestKind::MessageAction,
                "interactive_message" => RequestKind::AttachmentAction,
                "view_submission" => RequestKind::ViewSubmission,
                "view_closed" => RequestKind::ViewClosed,
                "dialog_submission" => RequestKind::DialogSubmission,
                "dialog_suggestion" => RequestKind::DialogSuggestion,
                "dialog_cancellation" => RequestKind::DialogCancellation,
                _ => return Err(AppError::UnrecognizedRequest),
            };

            let parsed = match kind {
                RequestKind::BlockAction => ParsedPayload::BlockAction(payload),
                RequestKind::BlockSuggestion => ParsedPayload::BlockSuggestion(payload),
                RequestKind::MessageAction => ParsedPayload::MessageAction(payload),
                RequestKind::AttachmentAction => ParsedPayload::AttachmentAction(payload),
                RequestKind::ViewSubmission => ParsedPayload::ViewSubmission(payload),
                RequestKind::ViewClosed => ParsedPayload::ViewClosed(payload),
                RequestKind::DialogSubmission => ParsedPayload::DialogSubmission(payload),
                RequestKind::DialogSuggestion => ParsedPayload::DialogSuggestion(payload),
                RequestKind::DialogCancellation => ParsedPayload::DialogCancellation(payload),
                _ => unreachable!(),
            };
            return Ok((kind, parsed));
        }

        // Rule 6: slash command.
        if fields.contains_key("command") {
            return Ok((RequestKind::SlashCommand, ParsedPayload::SlashCommand(fields)));
        }

        // Rule 7: legacy outgoing webhook.
        if fields.contains_key("trigger_word") {
            return Ok((RequestKind::OutgoingWebhook, ParsedPayload::OutgoingWebhook(fields)));
        }

        Err(AppError::UnrecognizedRequest)
    }
}

fn content_type_of(headers: &HeaderMap) -> String {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Minimal `application/x-www-form-urlencoded` decoder: splits on `&`, then
/// `=`, and percent/`+`-decodes each side. Slack's bodies are flat key/value
/// pairs, so a dependency on a full query-string crate isn't needed for
/// anything this parser does beyond what `urlencoding` already covers.
fn parse_form_urlencoded(body: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for pair in body.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or("");
        let value = parts.next().unwrap_or("");
        let key = urlencoding::decode(&key.replace('+', "%20"))
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| key.to_string());
        let value = urlencoding::decode(&value.replace('+', "%20"))
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| value.to_string());
        fields.insert(key, value);
    }
    fields
}

fn parse_oauth_callback_query(path_with_query: &str) -> OAuthCallbackParams {
    let query = path_with_query.split_once('?').map(|(_, q)| q).unwrap_or("");
    let fields = parse_form_urlencoded(query);
    OAuthCallbackParams {
        code: fields.get("code").cloned(),
        state: fields.get("state").cloned(),
        error: fields.get("error").cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(http::header::CONTENT_TYPE, "application/json".parse().unwrap());
        h
    }

    fn form_headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        h
    }

    #[test]
    fn url_verification_round_trips_challenge() {
        let parser = RequestParser::new(ParserConfig::default());
        let body = br#"{"type":"url_verification","challenge":"abc"}"#;
        let (kind, payload) = parser
            .classify("POST", "/slack/events", &json_headers(), body)
            .unwrap();
        assert_eq!(kind, RequestKind::UrlVerification);
        match payload {
            ParsedPayload::UrlVerification { challenge } => assert_eq!(challenge, "abc"),
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn event_callback_keys_on_type_and_subtype() {
        let parser = RequestParser::new(ParserConfig::default());
        let body = br#"{"type":"event_callback","event":{"type":"message","subtype":"bot_message"}}"#;
        let (kind, payload) = parser
            .classify("POST", "/slack/events", &json_headers(), body)
            .unwrap();
        assert_eq!(kind, RequestKind::Event);
        assert_eq!(payload.dispatch_key().unwrap(), "message:bot_message");
    }

    #[test]
    fn event_callback_without_subtype_uses_null_literal() {
        let parser = RequestParser::new(ParserConfig::default());
        let body = br#"{"type":"event_callback","event":{"type":"app_mention"}}"#;
        let (_, payload) = parser
            .classify("POST", "/slack/events", &json_headers(), body)
            .unwrap();
        assert_eq!(payload.dispatch_key().unwrap(), "app_mention:null");
    }

    #[test]
    fn slash_command_extracts_command_field() {
        let parser = RequestParser::new(ParserConfig::default());
        let body = b"command=%2Fhelp&text=me&team_id=T1";
        let (kind, payload) = parser
            .classify("POST", "/slack/commands", &form_headers(), body)
            .unwrap();
        assert_eq!(kind, RequestKind::SlashCommand);
        assert_eq!(payload.dispatch_key().unwrap(), "/help");
    }

    #[test]
    fn outgoing_webhook_detected_without_command() {
        let parser = RequestParser::new(ParserConfig::default());
        let body = b"trigger_word=hello&team_id=T1";
        let (kind, _) = parser
            .classify("POST", "/slack/webhook", &form_headers(), body)
            .unwrap();
        assert_eq!(kind, RequestKind::OutgoingWebhook);
    }

    #[test]
    fn block_actions_payload_dispatches_on_first_action() {
        let parser = RequestParser::new(ParserConfig::default());
        let body = br#"payload=%7B%22type%22%3A%22block_actions%22%2C%22actions%22%3A%5B%7B%22action_id%22%3A%22a%22%7D%2C%7B%22action_id%22%3A%22b%22%7D%5D%7D"#;
        let (kind, payload) = parser
            .classify("POST", "/slack/interact", &form_headers(), body)
            .unwrap();
        assert_eq!(kind, RequestKind::BlockAction);
        assert_eq!(payload.dispatch_key().unwrap(), "a");
    }

    #[test]
    fn oauth_paths_classified_before_body_inspection() {
        let parser = RequestParser::new(ParserConfig::default());
        let (kind, _) = parser
            .classify("GET", "/slack/install", &HeaderMap::new(), b"")
            .unwrap();
        assert_eq!(kind, RequestKind::OAuthStart);

        let (kind, payload) = parser
            .classify(
                "GET",
                "/slack/oauth_redirect?code=abc&state=xyz",
                &HeaderMap::new(),
                b"",
            )
            .unwrap();
        assert_eq!(kind, RequestKind::OAuthCallback);
        match payload {
            ParsedPayload::OAuthCallback(params) => {
                assert_eq!(params.code.as_deref(), Some("abc"));
                assert_eq!(params.state.as_deref(), Some("xyz"));
            }
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn unrecognized_body_is_a_parse_error() {
        let parser = RequestParser::new(ParserConfig::default());
        let result = parser.classify("POST", "/slack/events", &json_headers(), b"{}");
        assert!(matches!(result, Err(AppError::UnrecognizedRequest)));
    }
}
