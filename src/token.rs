//! Bearer token 工具
//!
//! token 对客户端是不透明的，这里只读取 JWT 负载中的 `exp` 声明，
//! 用于在发请求前提前登出。签名不做校验，后端才是权威。

use chrono::{DateTime, Utc};
use data_encoding::{BASE64URL, BASE64URL_NOPAD};
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// 读取 token 中的过期时间；不是 JWT 或没有 `exp` 时返回 None
pub fn expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = BASE64URL_NOPAD
        .decode(payload.as_bytes())
        .or_else(|_| BASE64URL.decode(payload.as_bytes()))
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.exp?;
    DateTime::from_timestamp(exp as i64, 0)
}

/// token 是否已过期
///
/// 无法解出过期时间的 token 视为未过期。
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    expiry(token).map(|exp| exp <= now).unwrap_or(false)
}

#[cfg(test)]
pub(crate) fn make_jwt(exp: i64) -> String {
    let header = BASE64URL_NOPAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = BASE64URL_NOPAD.encode(format!(r#"{{"sub":"1","exp":{}}}"#, exp).as_bytes());
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reads_exp_claim() {
        let token = make_jwt(1_700_000_000);
        assert_eq!(
            expiry(&token),
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        );
    }

    #[test]
    fn expiry_comparison() {
        let token = make_jwt(1_700_000_000);
        let before = Utc.timestamp_opt(1_699_999_999, 0).unwrap();
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert!(!is_expired(&token, before));
        assert!(is_expired(&token, at));
    }

    #[test]
    fn opaque_tokens_never_expire_locally() {
        let now = Utc::now();
        assert!(!is_expired("opaque-token", now));
        assert!(!is_expired("a.!!!.c", now));
        let no_exp = format!("x.{}.y", BASE64URL_NOPAD.encode(br#"{"sub":"1"}"#));
        assert!(!is_expired(&no_exp, now));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let payload = BASE64URL.encode(br#"{"exp":10}"#);
        let token = format!("h.{}.s", payload);
        assert_eq!(expiry(&token), Some(Utc.timestamp_opt(10, 0).unwrap()));
    }
}
