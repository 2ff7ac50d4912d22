use std::sync::{Arc, RwLock};

use chrono::Utc;
use http::HeaderMap;

use crate::cancellation::CancellationSignal;
use crate::client::SlackApiClient;
use crate::config::AppConfig;
use crate::context::Context;
use crate::error::AppError;
use crate::handler::Handler;
use crate::middleware::{
    IgnoringSelfEvents, Middleware, MiddlewareChain, MultiTeamsAuthorization,
    SingleTeamAuthorization, SslCheck, Terminal, VerifySignature,
};
use crate::oauth::OAuthFlow;
use crate::parser::RequestParser;
use crate::pattern::Pattern;
use crate::registry::HandlerRegistry;
use crate::request::{ParsedPayload, Request, RequestKind};
use crate::response::Response;
use crate::store::{InstallationStore, MemoryInstallationStore, MemoryOAuthStateStore, OAuthStateStore};

/// A raw, not-yet-classified inbound HTTP request — what an HTTP adapter
/// hands to `App::run`.
///
/// `cancellation` is optional: an adapter that wants handlers to be able to
/// abort in-flight Slack API calls when its own client connection drops
/// constructs a `CancellationSignal`, keeps a clone for itself (to call
/// `.cancel()` from its own disconnect/timeout hook), and passes the other
/// half in here. If omitted, `App::run` builds a fresh signal that nothing
/// ever triggers.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub cancellation: Option<CancellationSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Stopped,
    Running,
}

/// Ties `RequestParser` → `MiddlewareChain` → `HandlerRegistry` → handler,
/// and manages the App's start/stop lifecycle.
///
/// A single `App` is invoked concurrently by the hosting HTTP server from
/// many threads/tasks; `run()` is safe under parallel execution because
/// the registry/middleware list are snapshotted per-call and `Context` is
/// exclusively owned by its own request.
pub struct App {
    config: AppConfig,
    parser: RequestParser,
    registry: HandlerRegistry,
    installation_store: Arc<dyn InstallationStore>,
    state_store: Arc<dyn OAuthStateStore>,
    client: Arc<SlackApiClient>,
    oauth_flow: RwLock<Option<Arc<OAuthFlow>>>,
    default_middlewares: RwLock<Option<Vec<Arc<dyn Middleware>>>>,
    user_middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
    state: RwLock<LifecycleState>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self::with_stores(
            config,
            Arc::new(MemoryInstallationStore::new()),
            Arc::new(MemoryOAuthStateStore::new(600)),
        )
    }

    pub fn with_stores(
        config: AppConfig,
        installation_store: Arc<dyn InstallationStore>,
        state_store: Arc<dyn OAuthStateStore>,
    ) -> Self {
        let parser = RequestParser::new(config.parser.clone());
        Self {
            config,
            parser,
            registry: HandlerRegistry::new(),
            installation_store,
            state_store,
            client: Arc::new(SlackApiClient::new()),
            oauth_flow: RwLock::new(None),
            default_middlewares: RwLock::new(None),
            user_middlewares: RwLock::new(Vec::new()),
            state: RwLock::new(LifecycleState::Stopped),
        }
    }

    /// Appends a user middleware. Runs after the default stack, in
    /// insertion order. Safe to call before or after `start()`; callers
    /// doing so concurrently with in-flight `run()` calls are responsible
    /// for any raciness.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.user_middlewares
            .write()
            .expect("middleware list lock poisoned")
            .push(middleware);
    }

    pub fn on_event(&self, event_type: impl Into<String>, subtype: Option<&str>, handler: Arc<dyn Handler>) {
        let key = format!("{}:{}", event_type.into(), subtype.unwrap_or("null"));
        self.registry.register_exact(RequestKind::Event, key, handler);
    }

    pub fn on_command(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::SlashCommand, pattern, handler);
    }

    pub fn on_block_action(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::BlockAction, pattern, handler);
    }

    pub fn on_block_suggestion(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::BlockSuggestion, pattern, handler);
    }

    pub fn on_message_action(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::MessageAction, pattern, handler);
    }

    pub fn on_attachment_action(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::AttachmentAction, pattern, handler);
    }

    pub fn on_view_submission(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::ViewSubmission, pattern, handler);
    }

    pub fn on_view_closed(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::ViewClosed, pattern, handler);
    }

    pub fn on_dialog_submission(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::DialogSubmission, pattern, handler);
    }

    pub fn on_dialog_suggestion(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::DialogSuggestion, pattern, handler);
    }

    pub fn on_dialog_cancellation(&self, pattern: impl Into<Pattern>, handler: Arc<dyn Handler>) {
        self.registry
            .register_pattern(RequestKind::DialogCancellation, pattern, handler);
    }

    pub fn on_outgoing_webhook(&self, trigger_word: impl Into<String>, handler: Arc<dyn Handler>) {
        self.registry
            .register_exact(RequestKind::OutgoingWebhook, trigger_word, handler);
    }

    /// `Stopped -> Running`. Idempotent. Lazily builds the default
    /// middleware stack and the `OAuthFlow` service if OAuth is configured,
    /// so construction order never cycles between the App and its OAuth
    /// service.
    pub fn start(&self) {
        {
            let mut state = self.state.write().expect("lifecycle lock poisoned");
            if *state == LifecycleState::Running {
                return;
            }
            *state = LifecycleState::Running;
        }

        let mut default_middlewares = self
            .default_middlewares
            .write()
            .expect("middleware list lock poisoned");
        if default_middlewares.is_none() {
            let mut stack: Vec<Arc<dyn Middleware>> = vec![
                Arc::new(SslCheck::new(self.config.verification_token.clone())),
                Arc::new(VerifySignature::new(self.config.signing_secret.clone())),
            ];
            if let Some(bot_token) = &self.config.single_team_bot_token {
                stack.push(Arc::new(SingleTeamAuthorization::new(bot_token.clone())));
            } else {
                stack.push(Arc::new(MultiTeamsAuthorization::new(
                    self.installation_store.clone(),
                )));
            }
            stack.push(Arc::new(IgnoringSelfEvents));
            *default_middlewares = Some(stack);
        }

        if let Some(oauth_config) = &self.config.oauth {
            let mut oauth_flow = self.oauth_flow.write().expect("oauth flow lock poisoned");
            if oauth_flow.is_none() {
                *oauth_flow = Some(Arc::new(OAuthFlow::new(
                    oauth_config.clone(),
                    self.client.clone(),
                    self.installation_store.clone(),
                    self.state_store.clone(),
                )));
            }
        }
    }

    /// `Running -> Stopped`. Idempotent.
    pub fn stop(&self) {
        *self.state.write().expect("lifecycle lock poisoned") = LifecycleState::Stopped;
    }

    pub fn is_running(&self) -> bool {
        *self.state.read().expect("lifecycle lock poisoned") == LifecycleState::Running
    }

    /// Classifies `raw`, runs it through the middleware chain, and returns
    /// the final `Response`. Auto-starts the App on first invocation.
    /// Handler-thrown errors propagate out of this call uncaught — the core
    /// does not catch user exceptions.
    pub async fn run(&self, raw: RawRequest) -> Result<Response, anyhow::Error> {
        if !self.is_running() {
            self.start();
        }

        let now = Utc::now().timestamp();
        let (kind, payload) = match self
            .parser
            .classify(&raw.method, &raw.path, &raw.headers, &raw.body)
        {
            Ok(pair) => pair,
            Err(e) => return Ok(e.into_response()),
        };

        let cancellation_url = self
            .config
            .oauth
            .as_ref()
            .map(|oauth| oauth.oauth_cancellation_url.clone());
        let mut context = Context::new(now, self.client.clone());
        context.cancellation_url = cancellation_url;
        if let Some(cancellation) = raw.cancellation {
            context.cancellation = cancellation;
        }

        let mut req = Request {
            kind,
            method: raw.method,
            path: raw.path,
            raw_body: raw.body,
            headers: raw.headers,
            payload,
            context,
        };

        // Snapshot the middleware list for this call.
        let mut middlewares = self
            .default_middlewares
            .read()
            .expect("middleware list lock poisoned")
            .clone()
            .unwrap_or_default();
        middlewares.extend(
            self.user_middlewares
                .read()
                .expect("middleware list lock poisoned")
                .iter()
                .cloned(),
        );
        let chain = MiddlewareChain::new(middlewares);

        chain.run(&mut req, self).await
    }
}

#[async_trait::async_trait]
impl Terminal for App {
    /// The terminal step of the middleware chain: looks up and invokes the
    /// handler matching this request's kind and key.
    async fn call(&self, req: &mut Request) -> Result<Response, anyhow::Error> {
        match req.kind {
            RequestKind::UrlVerification => {
                if let ParsedPayload::UrlVerification { challenge } = &req.payload {
                    Ok(Response::text(200, challenge.clone()))
                } else {
                    unreachable!("classifier guarantees payload matches kind")
                }
            }
            RequestKind::OAuthStart => {
                let oauth_flow = self.oauth_flow.read().expect("oauth flow lock poisoned").clone();
                match oauth_flow {
                    Some(flow) => Ok(flow.handle_install_start().await),
                    None => Ok(AppError::Internal("OAuth is not configured".to_string()).into_response()),
                }
            }
            RequestKind::OAuthCallback => {
                let oauth_flow = self.oauth_flow.read().expect("oauth flow lock poisoned").clone();
                match (oauth_flow, &req.payload) {
                    (Some(flow), ParsedPayload::OAuthCallback(params)) => {
                        Ok(flow.handle_callback(params).await)
                    }
                    (None, _) => Ok(AppError::Internal("OAuth is not configured".to_string()).into_response()),
                    _ => unreachable!("classifier guarantees payload matches kind"),
                }
            }
            RequestKind::Event => {
                let key = req.payload.dispatch_key().expect("Event always has a dispatch key");
                match self.registry.lookup_exact(RequestKind::Event, &key) {
                    Some(handler) => Ok(handler.call(req).await?),
                    None => Ok(AppError::NoHandler(key).into_response()),
                }
            }
            RequestKind::OutgoingWebhook => {
                let key = match req.payload.dispatch_key() {
                    Some(key) => key,
                    None => return Ok(AppError::UnrecognizedRequest.into_response()),
                };
                match self.registry.lookup_exact(RequestKind::OutgoingWebhook, &key) {
                    Some(handler) => Ok(handler.call(req).await?),
                    None => Ok(AppError::NoHandler(key).into_response()),
                }
            }
            kind => {
                let key = match req.payload.dispatch_key() {
                    Some(key) => key,
                    None => return Ok(AppError::UnrecognizedRequest.into_response()),
                };
                match self.registry.lookup_pattern(kind, &key) {
                    Some(handler) => Ok(handler.call(req).await?),
                    None => Ok(AppError::NoHandler(key).into_response()),
                }
            }
        }
    }
}
