use thiserror::Error;

// =========================================================
// 错误分类
// =========================================================

/// 客户端错误
///
/// - `Network`: 请求根本没有发出或没有收到响应
/// - `Http`: 非 2xx 响应，携带尽力提取的消息与状态码
/// - `Parse`: 期望 JSON 的响应体无法解析
/// - `Validation`: 本地校验失败，不会触达网络层
/// - `InvalidResponse`: JSON 合法但缺少调用方约定的字段
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{message} (Status: {status})")]
    Http { status: u16, message: String },

    #[error("Failed to parse response as JSON")]
    Parse,

    #[error("{0}")]
    Validation(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Not logged in")]
    Unauthenticated,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// HTTP 状态码（仅 `Http` 错误）
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 是否应当强制登出，而不是原地展示错误
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired | Self::Unauthenticated | Self::Http { status: 401, .. }
        )
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_carries_status() {
        let e = ApiError::Http {
            status: 404,
            message: "not found".into(),
        };
        assert_eq!(e.to_string(), "not found (Status: 404)");
        assert_eq!(e.status(), Some(404));
    }

    #[test]
    fn auth_failures() {
        assert!(ApiError::SessionExpired.is_auth_failure());
        assert!(
            ApiError::Http {
                status: 401,
                message: "x".into()
            }
            .is_auth_failure()
        );
        assert!(
            !ApiError::Http {
                status: 403,
                message: "x".into()
            }
            .is_auth_failure()
        );
        assert!(!ApiError::Parse.is_auth_failure());
    }
}
