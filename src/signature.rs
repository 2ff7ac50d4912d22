use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed clock skew between the request timestamp and now before
/// a request is treated as a replay.
pub const REPLAY_WINDOW_SECONDS: i64 = 300;

/// Validates that an inbound request actually originated from Slack.
///
/// Protocol: <https://api.slack.com/authentication/verifying-requests-from-slack>
/// `base = "v0:" + timestamp + ":" + raw_body`,
/// `expected = "v0=" + hex(HMAC_SHA256(signing_secret, base))`.
pub struct SignatureVerifier {
    signing_secret: String,
}

impl SignatureVerifier {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
        }
    }

    /// Verify a request. `now` is injected so tests can control the clock.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        raw_body: &[u8],
        now: i64,
    ) -> Result<(), AppError> {
        let timestamp = timestamp.ok_or(AppError::MissingSignatureHeaders)?;
        let signature = signature.ok_or(AppError::MissingSignatureHeaders)?;

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| AppError::MissingSignatureHeaders)?;
        if (now - ts).abs() > REPLAY_WINDOW_SECONDS {
            return Err(AppError::RequestExpired);
        }

        let expected = self.sign(timestamp, raw_body);

        if constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            Ok(())
        } else {
            Err(AppError::InvalidSignature)
        }
    }

    /// Compute the `v0=<hex>` signature for a given timestamp + body, used
    /// both to verify inbound requests and (in tests) to sign fixtures.
    pub fn sign(&self, timestamp: &str, raw_body: &[u8]) -> String {
        let mut base = Vec::with_capacity(3 + timestamp.len() + 1 + raw_body.len());
        base.extend_from_slice(b"v0:");
        base.extend_from_slice(timestamp.as_bytes());
        base.push(b':');
        base.extend_from_slice(raw_body);

        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .expect("HMAC accepts key of any length");
        mac.update(&base);
        format!("v0={}", hex::encode(mac.finalize().into_bytes()))
    }
}

/// Constant-time byte comparison. Slack signatures are fixed-width hex
/// strings (`"v0="` + 64 hex chars), so a length check followed by an
/// accumulated XOR over equal-length byte slices is sufficient and avoids
/// pulling in a `subtle` dependency the rest of the stack never uses.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
