//! EduSync 客户端数据层
//!
//! - `api`: 单一入口的 HTTP 请求助手
//! - `session`: 会话 / token 持有者
//! - `dashboard`: 仪表盘数据加载编排
//! - `mutations`: 各类写操作处理器
//!
//! 只依赖 `HttpClient` 与 `SessionStore` 两个抽象，浏览器与 native 共用。

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod mutations;
pub mod request;
pub mod session;
pub mod token;

pub use edusync_shared as shared;
pub use edusync_shared::date;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use dashboard::{Change, CourseView, DashboardLoader, DashboardState, ReloadScope, StateChange};
pub use error::{ApiError, ApiResult};
pub use mutations::Mutations;
pub use request::{HttpClient, ReqwestHttpClient};
pub use session::{MemorySessionStore, Session, SessionState, SessionStatus, SessionStore};

// =========================================================
// 组装
// =========================================================

/// 按配置构建基于 reqwest 的 API 客户端
pub fn connect(config: &ClientConfig) -> ApiResult<ApiClient<ReqwestHttpClient>> {
    let client = ReqwestHttpClient::new(config.request_timeout())?;
    tracing::info!(base_url = %config.api_base_url, "api client ready");
    Ok(ApiClient::new(config.api_base_url.clone(), client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_trims_trailing_slash() {
        let config = ClientConfig::default().with_base_url("http://api.test/");
        let api = connect(&config).unwrap();
        assert_eq!(api.base_url(), "http://api.test");
    }
}
