//! SessionStorage 封装模块
//!
//! 使用 `web_sys::Storage` 实现会话的持久化副本，关闭标签页即失效。

use edusync::{ApiError, ApiResult, SessionStore};

/// 浏览器 sessionStorage
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSessionStore;

impl BrowserSessionStore {
    fn storage() -> ApiResult<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| ApiError::Storage("no window".to_string()))?
            .session_storage()
            .map_err(|e| ApiError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| ApiError::Storage("sessionStorage unavailable".to_string()))
    }
}

impl SessionStore for BrowserSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage().ok()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| ApiError::Storage(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| ApiError::Storage(format!("{:?}", e)))
    }
}
