//! Local, signature-free token payload decoding.
//!
//! The client never holds the signing secrets; trust in the signature lives
//! server-side. Locally it only needs the claim fields and the embedded
//! expiry, which the session store always checks before using the claims.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::DecodeError;
use crate::types::DecodedClaims;

/// Decode the payload segment of a compact JWT into [`DecodedClaims`].
pub fn decode_claims(token: &str) -> Result<DecodedClaims, DecodeError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| DecodeError::InvalidBase64)?;

    serde_json::from_slice(&bytes).map_err(|_| DecodeError::InvalidClaims)
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde_json::json;

    use super::decode_claims;
    use crate::error::DecodeError;

    fn fake_jwt(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{payload}.fakesig")
    }

    #[test]
    fn decodes_full_claim_set() {
        let token = fake_jwt(json!({
            "sub": "g1",
            "email": "a@b.com",
            "name": "Ann",
            "provider": "google",
            "iat": 1000,
            "exp": 2000
        }));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, "g1");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.name.as_deref(), Some("Ann"));
        assert_eq!(claims.exp, 2000);
    }

    #[test]
    fn name_is_optional() {
        let token = fake_jwt(json!({"sub": "g1", "email": "a@b.com", "exp": 2000}));
        assert_eq!(decode_claims(&token).unwrap().name, None);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert_eq!(decode_claims("onlyone"), Err(DecodeError::Malformed));
        assert_eq!(decode_claims("a.b"), Err(DecodeError::Malformed));
        assert_eq!(decode_claims("a.b.c.d"), Err(DecodeError::Malformed));
    }

    #[test]
    fn rejects_bad_base64() {
        assert_eq!(
            decode_claims("head.!!!not-base64!!!.sig"),
            Err(DecodeError::InvalidBase64)
        );
    }

    #[test]
    fn rejects_payload_missing_required_claims() {
        let token = fake_jwt(json!({"email": "a@b.com"}));
        assert_eq!(decode_claims(&token), Err(DecodeError::InvalidClaims));
    }
}
