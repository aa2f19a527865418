//! 客户端配置
//!
//! 缺省值适用于本地开发；`from_env` 允许用环境变量覆盖。

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "EDUSYNC_API_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "EDUSYNC_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API 根地址，所有路径都拼接在它后面
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// 单次请求超时（秒），`None` 表示不限制
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: Option<u64>,
    /// 会话存储中 token 的键
    #[serde(default = "default_token_key")]
    pub token_key: String,
    /// 会话存储中用户对象的键
    #[serde(default = "default_user_key")]
    pub user_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            token_key: default_token_key(),
            user_key: default_user_key(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_request_timeout_secs() -> Option<u64> {
    Some(30)
}

fn default_token_key() -> String {
    "token".to_string()
}

fn default_user_key() -> String {
    "user".to_string()
}

impl ClientConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// 从环境变量加载，未设置的项使用缺省值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.request_timeout_secs = None,
                Ok(secs) => config.request_timeout_secs = Some(secs),
                Err(_) => tracing::warn!(
                    value = %raw,
                    "ignoring invalid {}",
                    ENV_REQUEST_TIMEOUT_SECS
                ),
            }
        }
        config
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
