//! 浏览器 API 封装模块
//!
//! 直接使用 web_sys 提供路由与会话存储，不引入 gloo-* 系列 crate，
//! 以减小 WASM 二进制体积。

pub mod route;
pub mod router;
mod storage;

pub use storage::BrowserSessionStore;

/// 整页重载
pub fn reload_page() {
    let reloaded = web_sys::window().map(|w| w.location().reload());
    if !matches!(reloaded, Some(Ok(()))) {
        tracing::warn!("page reload failed");
    }
}
