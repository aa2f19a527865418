//! 会话模块
//!
//! 显式、可注入的会话服务，状态机：
//!
//! ```text
//! Unauthenticated --hydrate(有 token)--> Verifying --check 成功--> Authenticated
//!        ^                                   |                          |
//!        +------------- 校验失败 ------------+------ logout / 过期 ------+
//! ```
//!
//! 持久化副本（浏览器 sessionStorage）与内存副本总是在同一个同步调用中一起清除，
//! 其他组件不会观察到中间状态。

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::request::HttpClient;
use crate::token;
use chrono::{DateTime, Utc};
use edusync_shared::User;
use edusync_shared::protocol::{
    AuthCheck, GetProfile, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

// =========================================================
// 持久化存储抽象
// =========================================================

/// 会话持久化存储（浏览器中对应 sessionStorage）
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> ApiResult<()>;
    fn remove(&self, key: &str) -> ApiResult<()>;
}

/// 内存存储，用于测试与 native 环境
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    items: RefCell<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, key: &str, value: &str) -> Self {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

// =========================================================
// 会话状态
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Verifying,
    Authenticated,
}

/// 会话快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub token: Option<String>,
    pub user: Option<User>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

pub struct Session<C: HttpClient, S: SessionStore> {
    api: ApiClient<C>,
    store: S,
    token_key: String,
    user_key: String,
    state: RefCell<SessionState>,
}

impl<C: HttpClient, S: SessionStore> Session<C, S> {
    pub fn new(api: ApiClient<C>, store: S, config: &ClientConfig) -> Self {
        Self {
            api,
            store,
            token_key: config.token_key.clone(),
            user_key: config.user_key.clone(),
            state: RefCell::new(SessionState::default()),
        }
    }

    pub fn api(&self) -> &ApiClient<C> {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    // --- 生命周期 ---

    /// 启动时从持久化存储恢复会话
    ///
    /// 没有 token 时直接停在 `Unauthenticated`；token 已过期时不访问后端直接清除；
    /// 否则调用 `/auth/check`，任何失败都清除持久化 token。
    pub async fn hydrate(&self) -> SessionStatus {
        let Some(token) = self.store.get(&self.token_key).filter(|t| !t.is_empty()) else {
            self.clear();
            return SessionStatus::Unauthenticated;
        };

        if token::is_expired(&token, Utc::now()) {
            tracing::info!("persisted token already expired");
            self.clear();
            return SessionStatus::Unauthenticated;
        }

        *self.state.borrow_mut() = SessionState {
            status: SessionStatus::Verifying,
            token: Some(token.clone()),
            user: None,
        };

        let verified = self
            .api
            .send(&AuthCheck, Some(&token))
            .await
            .and_then(|value| extract_user(&value));

        match verified {
            Ok(user) => {
                if let Err(e) = self.persist_user(&user) {
                    tracing::warn!(error = %e, "failed to persist verified user");
                }
                tracing::info!(user_id = user.id, role = user.role.as_str(), "session verified");
                *self.state.borrow_mut() = SessionState {
                    status: SessionStatus::Authenticated,
                    token: Some(token),
                    user: Some(user),
                };
                SessionStatus::Authenticated
            }
            Err(e) => {
                tracing::warn!(error = %e, "session verification failed");
                self.clear();
                SessionStatus::Unauthenticated
            }
        }
    }

    /// 登录
    ///
    /// 响应必须同时包含 token 和带角色的 user，否则返回 `InvalidResponse`
    /// 且不持久化任何内容。导航由调用方负责。
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::validation("Email and password are required"));
        }

        let req = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let value = self.api.send(&req, None).await?;

        let token = value
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::invalid_response("login response is missing a token"))?
            .to_string();
        let user = value
            .get("user")
            .ok_or_else(|| ApiError::invalid_response("login response is missing a user"))
            .and_then(parse_user)?;

        if let Err(e) = self
            .store
            .set(&self.token_key, &token)
            .and_then(|_| self.persist_user(&user))
        {
            self.clear();
            return Err(e);
        }

        tracing::info!(user_id = user.id, role = user.role.as_str(), "logged in");
        *self.state.borrow_mut() = SessionState {
            status: SessionStatus::Authenticated,
            token: Some(token),
            user: Some(user.clone()),
        };
        Ok(user)
    }

    /// 注册新账号，不会自动登录
    pub async fn register(&self, req: &RegisterRequest) -> ApiResult<Value> {
        if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
            return Err(ApiError::validation("Name, email and password are required"));
        }
        self.api.send(req, None).await
    }

    /// 登出：同步清除持久化副本与内存副本
    ///
    /// 整页重载由前端外壳负责。
    pub fn logout(&self) {
        tracing::info!("logging out");
        self.clear();
    }

    fn clear(&self) {
        for key in [&self.token_key, &self.user_key] {
            if let Err(e) = self.store.remove(key) {
                tracing::error!(key = %key, error = %e, "failed to clear session storage");
            }
        }
        *self.state.borrow_mut() = SessionState::default();
    }

    fn persist_user(&self, user: &User) -> ApiResult<()> {
        let json = serde_json::to_string(user).map_err(|e| ApiError::Storage(e.to_string()))?;
        self.store.set(&self.user_key, &json)
    }

    // --- 受保护视图使用 ---

    /// 取出可用的 token
    ///
    /// 本地检测到过期时先主动登出，再返回 `SessionExpired`。
    pub fn valid_token_at(&self, now: DateTime<Utc>) -> ApiResult<String> {
        let token = self.token().ok_or(ApiError::Unauthenticated)?;
        if token::is_expired(&token, now) {
            tracing::info!("token expired, forcing logout");
            self.logout();
            return Err(ApiError::SessionExpired);
        }
        Ok(token)
    }

    pub fn valid_token(&self) -> ApiResult<String> {
        self.valid_token_at(Utc::now())
    }

    /// 认证类错误触发强制登出，返回是否真的登出了
    ///
    /// 没有 token 时不登出，调用方应照常展示错误。
    pub fn handle_error(&self, err: &ApiError) -> bool {
        if !err.is_auth_failure() || self.token().is_none() {
            return false;
        }
        tracing::warn!(error = %err, "auth failure, forcing logout");
        self.logout();
        true
    }

    // --- 资料 ---

    /// 重新读取 `/profile` 并更新会话中的用户
    pub async fn refresh_profile(&self) -> ApiResult<User> {
        let token = self.valid_token()?;
        let value = self.api.send(&GetProfile, Some(&token)).await?;
        let user = extract_user(&value)?;
        self.replace_user(&token, user.clone())?;
        Ok(user)
    }

    /// 学生更新个人资料
    pub async fn update_profile(&self, name: &str, email: &str) -> ApiResult<User> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(ApiError::validation("Name and email are required"));
        }
        if !email.contains('@') {
            return Err(ApiError::validation("Please enter a valid email address"));
        }

        let current = self.user().ok_or(ApiError::Unauthenticated)?;
        let token = self.valid_token()?;
        let req = UpdateProfileRequest {
            name: name.to_string(),
            email: email.to_string(),
        };
        let value = self.api.send(&req, Some(&token)).await?;

        let user = extract_user(&value).unwrap_or_else(|_| User {
            name: req.name.clone(),
            email: req.email.clone(),
            ..current
        });
        self.replace_user(&token, user.clone())?;
        Ok(user)
    }

    /// 请求期间会话已登出或换了 token 时不写回
    fn replace_user(&self, token: &str, user: User) -> ApiResult<()> {
        if self.token().as_deref() != Some(token) {
            tracing::debug!("session changed during profile request, dropping result");
            return Err(ApiError::Unauthenticated);
        }
        self.persist_user(&user)?;
        self.state.borrow_mut().user = Some(user);
        Ok(())
    }
}

/// 响应体可能是用户对象本身，也可能包在 `user` 字段里
fn extract_user(value: &Value) -> ApiResult<User> {
    parse_user(value.get("user").unwrap_or(value))
}

fn parse_user(value: &Value) -> ApiResult<User> {
    if value.get("role").and_then(Value::as_str).is_none() {
        return Err(ApiError::invalid_response("user object is missing a role"));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| ApiError::invalid_response(format!("malformed user: {}", e)))
}

#[cfg(test)]
mod tests;
