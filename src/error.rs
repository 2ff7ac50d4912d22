use crate::response::Response;

/// Unified error taxonomy for the core. Every variant maps to exactly the
/// status code/body spec'd for its category; handler-thrown errors never
/// appear here (they propagate as `anyhow::Error` out of `App::run`).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unrecognized request")]
    UnrecognizedRequest,

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("missing signature headers")]
    MissingSignatureHeaders,

    #[error("request timestamp outside replay window")]
    RequestExpired,

    #[error("invalid request signature")]
    InvalidSignature,

    #[error("no installation found for workspace")]
    Unauthorized,

    #[error("no handler found for {0}")]
    NoHandler(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convert to the wire-level `Response` prescribed by the error taxonomy.
    pub fn into_response(self) -> Response {
        match self {
            AppError::UnrecognizedRequest | AppError::MalformedBody(_) => {
                Response::json(400, serde_json::json!({"error": "invalid_request"}))
            }
            AppError::MissingSignatureHeaders
            | AppError::RequestExpired
            | AppError::InvalidSignature => Response::json(
                401,
                serde_json::json!({"error": self.wire_code()}),
            ),
            AppError::Unauthorized => {
                Response::json(401, serde_json::json!({"error": "invalid_request"}))
            }
            AppError::NoHandler(key) => {
                tracing::warn!(key = %key, "no handler found");
                Response::json(404, serde_json::json!({"error": "no handler found"}))
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                Response::json(500, serde_json::json!({"error": "internal_error"}))
            }
        }
    }

    fn wire_code(&self) -> &'static str {
        match self {
            AppError::MissingSignatureHeaders => "missing_signature_headers",
            AppError::RequestExpired => "request_expired",
            AppError::InvalidSignature => "invalid_signature",
            _ => "unauthorized",
        }
    }
}
