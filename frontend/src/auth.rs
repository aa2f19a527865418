//! 认证模块
//!
//! 会话服务本身不是 Send，放在 `StoredValue::new_local` 里；
//! 组件只读取镜像出来的 `SessionState` 信号。每次会话变化后调用 `sync`。

use crate::web::{BrowserSessionStore, reload_page};
use edusync::shared::protocol::RegisterRequest;
use edusync::shared::{Role, User};
use edusync::{ApiClient, ApiError, ApiResult, ClientConfig, ReqwestHttpClient, Session, SessionState};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::rc::Rc;

pub type AppSession = Session<ReqwestHttpClient, BrowserSessionStore>;

/// 认证上下文
#[derive(Clone, Copy)]
pub struct AuthContext {
    session: StoredValue<Rc<AppSession>, LocalStorage>,
    /// 会话快照（只读）
    pub state: ReadSignal<SessionState>,
    set_state: WriteSignal<SessionState>,
    settled: ReadSignal<bool>,
    set_settled: WriteSignal<bool>,
}

impl AuthContext {
    pub fn new(api: ApiClient<ReqwestHttpClient>, config: &ClientConfig) -> Self {
        let session = Session::new(api, BrowserSessionStore, config);
        let (state, set_state) = signal(SessionState::default());
        let (settled, set_settled) = signal(false);
        Self {
            session: StoredValue::new_local(Rc::new(session)),
            state,
            set_state,
            settled,
            set_settled,
        }
    }

    fn session(&self) -> Rc<AppSession> {
        self.session.get_value()
    }

    fn sync(&self) {
        self.set_state.set(self.session().snapshot());
    }

    /// 当前角色（仅已认证时）
    pub fn role_signal(&self) -> Signal<Option<Role>> {
        let state = self.state;
        Signal::derive(move || {
            state.with(|s| {
                s.is_authenticated()
                    .then(|| s.user.as_ref().map(|u| u.role))
                    .flatten()
            })
        })
    }

    pub fn settled_signal(&self) -> Signal<bool> {
        self.settled.into()
    }

    pub fn user(&self) -> Option<User> {
        self.state.with(|s| s.user.clone())
    }

    pub fn api(&self) -> ApiClient<ReqwestHttpClient> {
        self.session().api().clone()
    }

    /// 取出可用的 token；本地判定过期时会强制登出
    pub fn valid_token(&self) -> ApiResult<String> {
        let result = self.session().valid_token();
        if let Err(e) = &result {
            self.handle_error(e);
        }
        result
    }

    /// 认证类错误：清空会话并整页重载，返回是否已处理
    pub fn handle_error(&self, err: &ApiError) -> bool {
        let session = self.session();
        let had_token = session.token().is_some();
        if session.handle_error(err) {
            self.sync();
            if had_token {
                reload_page();
            }
            return true;
        }
        false
    }

    pub async fn login(&self, email: String, password: String) -> ApiResult<User> {
        let result = self.session().login(&email, &password).await;
        self.sync();
        result
    }

    pub async fn register(&self, req: RegisterRequest) -> ApiResult<()> {
        self.session().register(&req).await.map(|_| ())
    }

    pub async fn update_profile(&self, name: String, email: String) -> ApiResult<User> {
        let result = self.session().update_profile(&name, &email).await;
        if let Err(e) = &result {
            self.handle_error(e);
        }
        self.sync();
        result
    }

    /// 登出：同步清除两份副本后整页重载
    pub fn logout(&self) {
        self.session().logout();
        self.sync();
        reload_page();
    }
}

/// 从 Context 获取认证上下文
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>().expect("AuthContext should be provided")
}

/// 启动时恢复会话；完成后路由守卫才开始工作
pub fn init_auth(ctx: &AuthContext) {
    let ctx = *ctx;
    spawn_local(async move {
        let status = ctx.session().hydrate().await;
        tracing::info!(status = ?status, "session restored");
        ctx.sync();
        ctx.set_settled.set(true);
    });
}
