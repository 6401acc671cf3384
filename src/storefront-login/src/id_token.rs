//! Identity token claims extraction.
//!
//! Splits a compact token into header, payload and signature. The
//! signature is NOT verified: a decoded token is not a trusted token, and
//! only its `nonce` claim is used, for replay detection.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value;

use crate::error::{AuthError, Result};

/// base64url that accepts segments with or without padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Header, claims and raw signature of an identity token.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub header: Value,
    pub payload: Value,
    /// Opaque, unverified.
    pub signature: String,
}

impl DecodedToken {
    /// The `nonce` claim, if present and a string.
    pub fn nonce(&self) -> Option<&str> {
        self.payload.get("nonce").and_then(Value::as_str)
    }
}

/// Decode a compact identity token without verifying its signature.
pub fn decode_id_token(token: &str) -> Result<DecodedToken> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::MalformedToken(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(AuthError::MalformedToken("empty segment".into()));
    }

    Ok(DecodedToken {
        header: decode_segment(segments[0], "header")?,
        payload: decode_segment(segments[1], "payload")?,
        signature: segments[2].to_string(),
    })
}

/// Convenience accessor for the `nonce` claim of an encoded token.
pub fn get_nonce(token: &str) -> Result<Option<String>> {
    Ok(decode_id_token(token)?.nonce().map(str::to_string))
}

fn decode_segment(segment: &str, name: &str) -> Result<Value> {
    let bytes = URL_SAFE_LENIENT
        .decode(segment)
        .map_err(|e| AuthError::MalformedToken(format!("{name} is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("{name} is not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn encode(header: &Value, payload: &Value, signature: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(payload.to_string()),
            signature
        )
    }

    #[test]
    fn test_decode_recovers_header_and_payload() {
        let header = json!({"alg": "RS256", "kid": "k1"});
        let payload = json!({"sub": "gid://shopify/Customer/1", "nonce": "n1", "exp": 1700000000});
        let token = encode(&header, &payload, "c2lnbmF0dXJl");

        let decoded = decode_id_token(&token).unwrap();
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.payload, payload);
        assert_eq!(decoded.signature, "c2lnbmF0dXJl");
        assert_eq!(decoded.nonce(), Some("n1"));
    }

    #[test]
    fn test_padded_segments_are_accepted() {
        let header = json!({"alg": "none"});
        let payload = json!({"a": 1});
        let token = format!(
            "{}.{}.sig",
            URL_SAFE.encode(header.to_string()),
            URL_SAFE.encode(payload.to_string())
        );
        assert_eq!(decode_id_token(&token).unwrap().payload, payload);
    }

    #[test]
    fn test_segment_count() {
        for token in ["", "a", "a.b", "a.b.c.d"] {
            let err = decode_id_token(token).unwrap_err();
            assert!(matches!(err, AuthError::MalformedToken(_)), "{token:?}");
        }
    }

    #[test]
    fn test_empty_segment() {
        let header = URL_SAFE_NO_PAD.encode("{}");
        let err = decode_id_token(&format!("{header}.{header}.")).unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[test]
    fn test_non_json_segment() {
        let err = decode_id_token("H.P.S").unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
        assert_eq!(err.error_code(), "invalid_id_token");
    }

    #[test]
    fn test_get_nonce() {
        let with = encode(&json!({}), &json!({"nonce": "abc"}), "s");
        let without = encode(&json!({}), &json!({"sub": "1"}), "s");
        let numeric = encode(&json!({}), &json!({"nonce": 7}), "s");

        assert_eq!(get_nonce(&with).unwrap().as_deref(), Some("abc"));
        assert_eq!(get_nonce(&without).unwrap(), None);
        assert_eq!(get_nonce(&numeric).unwrap(), None);
    }
}
