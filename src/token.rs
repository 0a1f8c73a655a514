//! Structural bearer-token decoding.
//!
//! Tokens are three dot-delimited segments with a base64url JSON payload in
//! the middle. The client never verifies the signature: decoded claims are
//! display hints and client-side route gating inputs only. The server
//! re-validates the token on every authenticated request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::collections::BTreeSet;

/// Why a token failed structural decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a three-segment dot-delimited string
    Malformed,
    /// Middle segment is not valid base64url or not valid JSON
    BadPayload(String),
    /// Payload decoded but carries no `sub` claim
    MissingSubject,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed => write!(f, "token is not a three-segment bearer token"),
            DecodeError::BadPayload(msg) => write!(f, "token payload is not decodable: {}", msg),
            DecodeError::MissingSubject => write!(f, "token payload has no 'sub' claim"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Claims extracted from a token payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// The `sub` claim: the principal's identity. The backend uses this as
    /// both username and email; they are not distinguished anywhere.
    pub subject: String,
    /// The `roles` claim exactly as the issuer wrote it, if present
    pub roles_raw: Option<String>,
    /// Canonical role tokens parsed once at this boundary
    pub roles: BTreeSet<String>,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(&canonical_role(role))
    }
}

/// Canonicalize a single role token: trim whitespace and a leading `ROLE_`
/// prefix, so the issuer's "ROLE_ADMIN" and "ADMIN" name the same role.
pub fn canonical_role(role: &str) -> String {
    let role = role.trim();
    role.strip_prefix("ROLE_").unwrap_or(role).to_string()
}

/// Parse a raw roles value into a canonical set.
/// Issuers emit either a single role or a comma/space-delimited list.
fn parse_roles(raw: &str) -> BTreeSet<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(canonical_role)
        .collect()
}

/// Decode the payload segment of a bearer token.
///
/// Establishes structural validity only; no signature check is performed.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(DecodeError::Malformed);
    }

    // Issuers vary on padding; strip it and decode unpadded.
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| DecodeError::BadPayload(e.to_string()))?;

    let json: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| DecodeError::BadPayload(e.to_string()))?;

    let subject = json
        .get("sub")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or(DecodeError::MissingSubject)?
        .to_string();

    // The roles claim may be a string or an array of strings.
    let (roles_raw, roles) = match json.get("roles") {
        Some(serde_json::Value::String(s)) => (Some(s.clone()), parse_roles(s)),
        Some(serde_json::Value::Array(items)) => {
            let names: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str())
                .map(String::from)
                .collect();
            let set = names.iter().map(|s| canonical_role(s)).collect();
            (Some(names.join(",")), set)
        }
        _ => (None, BTreeSet::new()),
    };

    Ok(Claims {
        subject,
        roles_raw,
        roles,
    })
}

#[cfg(test)]
pub(crate) fn make_token(payload: &serde_json::Value) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("header.{}.sig", encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_subject_and_roles() {
        // payload {"sub":"alice","roles":"ADMIN"}
        let token = "header.eyJzdWIiOiJhbGljZSIsInJvbGVzIjoiQURNSU4ifQ.sig";
        let claims = decode(token).unwrap();
        assert_eq!(claims.subject, "alice");
        assert_eq!(claims.roles_raw.as_deref(), Some("ADMIN"));
        assert!(claims.has_role("ADMIN"));
        assert!(!claims.has_role("SUPERADMIN"));
    }

    #[test]
    fn test_decode_strips_role_prefix() {
        let token = make_token(&json!({"sub": "bob", "roles": "ROLE_USER"}));
        let claims = decode(&token).unwrap();
        assert!(claims.has_role("USER"));
        assert!(claims.has_role("ROLE_USER"));
        assert_eq!(claims.roles_raw.as_deref(), Some("ROLE_USER"));
    }

    #[test]
    fn test_decode_role_list() {
        let token = make_token(&json!({"sub": "carol", "roles": "ROLE_USER, ROLE_ADMIN"}));
        let claims = decode(&token).unwrap();
        assert!(claims.has_role("USER"));
        assert!(claims.has_role("ADMIN"));
        assert_eq!(claims.roles.len(), 2);
    }

    #[test]
    fn test_decode_role_array() {
        let token = make_token(&json!({"sub": "dave", "roles": ["ROLE_ADMIN"]}));
        let claims = decode(&token).unwrap();
        assert!(claims.has_role("ADMIN"));
    }

    #[test]
    fn test_decode_no_roles_claim() {
        let token = make_token(&json!({"sub": "erin"}));
        let claims = decode(&token).unwrap();
        assert!(claims.roles.is_empty());
        assert!(claims.roles_raw.is_none());
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        assert_eq!(decode("onlyonesegment"), Err(DecodeError::Malformed));
        assert_eq!(decode("two.segments"), Err(DecodeError::Malformed));
        assert_eq!(decode("a.b.c.d"), Err(DecodeError::Malformed));
        assert_eq!(decode(""), Err(DecodeError::Malformed));
        assert_eq!(decode("..sig"), Err(DecodeError::Malformed));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode("header.!!!not-base64!!!.sig").unwrap_err();
        assert!(matches!(err, DecodeError::BadPayload(_)));
    }

    #[test]
    fn test_decode_rejects_non_json_payload() {
        let encoded = URL_SAFE_NO_PAD.encode("this is not json");
        let err = decode(&format!("h.{}.s", encoded)).unwrap_err();
        assert!(matches!(err, DecodeError::BadPayload(_)));
    }

    #[test]
    fn test_decode_rejects_missing_subject() {
        let token = make_token(&json!({"roles": "ADMIN"}));
        assert_eq!(decode(&token), Err(DecodeError::MissingSubject));

        let token = make_token(&json!({"sub": ""}));
        assert_eq!(decode(&token), Err(DecodeError::MissingSubject));
    }

    #[test]
    fn test_decode_accepts_padded_payload() {
        let encoded = base64::engine::general_purpose::URL_SAFE
            .encode(json!({"sub": "frank"}).to_string());
        let claims = decode(&format!("h.{}.s", encoded)).unwrap();
        assert_eq!(claims.subject, "frank");
    }
}
