//! Best-effort extraction of the user id from a JWT credential
//!
//! The token is never verified here; the server does that. A token that
//! cannot be decoded simply means "no user id known".

use crate::model::UserId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;
use tracing::debug;

/// Claims that may carry the user id, in lookup order
const USER_ID_CLAIMS: [&str; 3] = ["user", "userId", "id"];

/// Decode the user id from a JWT payload
pub fn decode_user_id(token: &str) -> Option<UserId> {
    let mut segments = token.trim().split('.');
    let (_header, payload) = (segments.next()?, segments.next()?);

    let bytes = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Token payload is not base64url: {}", e);
            return None;
        }
    };

    let claims: Value = match serde_json::from_slice(&bytes) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Token payload is not JSON: {}", e);
            return None;
        }
    };

    USER_ID_CLAIMS.iter().find_map(|claim| match claims.get(claim) {
        Some(Value::String(id)) if !id.is_empty() => Some(UserId::new(id.clone())),
        Some(Value::Number(n)) => Some(UserId::new(n.to_string())),
        _ => None,
    })
}

#[cfg(test)]
pub(crate) fn fake_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_user_claim() {
        let token = fake_jwt(&json!({"user": "664bcf3e33da217c4af21f00", "iat": 1}));
        assert_eq!(
            decode_user_id(&token),
            Some(UserId::new("664bcf3e33da217c4af21f00"))
        );
    }

    #[test]
    fn falls_back_to_user_id_claim() {
        let token = fake_jwt(&json!({"userId": "u-42"}));
        assert_eq!(decode_user_id(&token), Some(UserId::new("u-42")));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(decode_user_id(""), None);
        assert_eq!(decode_user_id("not-a-jwt"), None);
        assert_eq!(decode_user_id("a.!!!.c"), None);
        assert_eq!(decode_user_id(&fake_jwt(&json!({"role": "admin"}))), None);
    }

    #[test]
    fn padded_payload_is_accepted() {
        let token = fake_jwt(&json!({"user": "u1"}));
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1].push_str("==");
        assert_eq!(decode_user_id(&parts.join(".")), Some(UserId::new("u1")));
    }
}
