//! 仪表盘数据上下文
//!
//! 包装 `DashboardLoader`：所有请求结束后把快照写进 `state` 信号，
//! 修改操作走 `mutate`，成功时只合并对应的变更。

use crate::auth::AuthContext;
use edusync::shared::Role;
use edusync::{ApiError, ApiResult, DashboardLoader, DashboardState, ReloadScope, ReqwestHttpClient, StateChange};
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

pub type AppLoader = DashboardLoader<ReqwestHttpClient>;

const NOTICE_DURATION: Duration = Duration::from_secs(3);

/// 页面顶部的提示
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

#[derive(Clone, Copy)]
pub struct DashboardContext {
    loader: StoredValue<Rc<AppLoader>, LocalStorage>,
    auth: AuthContext,
    pub state: RwSignal<DashboardState>,
    pub loading: RwSignal<bool>,
    pub notice: RwSignal<Option<Notice>>,
}

impl DashboardContext {
    pub fn new(auth: AuthContext) -> Self {
        let loader = DashboardLoader::new(auth.api());
        let ctx = Self {
            loader: StoredValue::new_local(Rc::new(loader)),
            auth,
            state: RwSignal::new(DashboardState::default()),
            loading: RwSignal::new(false),
            notice: RwSignal::new(None),
        };

        // 提示 3 秒后自动消失
        let notice = ctx.notice;
        Effect::new(move |_| {
            if notice.with(Option::is_some) {
                set_timeout(move || notice.set(None), NOTICE_DURATION);
            }
        });
        ctx
    }

    fn loader(&self) -> Rc<AppLoader> {
        self.loader.get_value()
    }

    fn sync(&self) {
        self.state.set(self.loader().snapshot());
    }

    pub fn notify(&self, message: impl Into<String>) {
        self.notice.set(Some(Notice {
            message: message.into(),
            is_error: false,
        }));
    }

    fn fail(&self, err: ApiError) {
        if !self.auth.handle_error(&err) {
            self.notice.set(Some(Notice {
                message: err.to_string(),
                is_error: true,
            }));
        }
    }

    /// 运行一次加载类操作，结束后同步快照
    fn run<Fut>(&self, fut: impl FnOnce(Rc<AppLoader>) -> Fut + 'static)
    where
        Fut: Future<Output = ApiResult<()>> + 'static,
    {
        let this = *self;
        let loader = self.loader();
        this.loading.set(true);
        spawn_local(async move {
            if let Err(e) = fut(loader).await {
                this.fail(e);
            }
            this.sync();
            this.loading.set(false);
        });
    }

    /// 加载角色仪表盘；同一 token 重复调用不会重新请求
    pub fn load(&self, role: Role) {
        let token = match self.auth.valid_token() {
            Ok(token) => token,
            Err(_) => return,
        };
        self.run(move |loader| async move { loader.load(role, &token).await });
    }

    pub fn reload(&self, scope: ReloadScope) {
        self.run(move |loader| async move { loader.reload(scope).await });
    }

    pub fn select_course(&self, course_id: i64) {
        self.run(move |loader| async move { loader.select_course(course_id).await });
    }

    pub fn clear_selection(&self) {
        self.loader().clear_selection();
        self.sync();
    }

    /// 执行一次修改
    ///
    /// `op` 拿到加载器与 token，返回要合并的变更；成功后显示 `success`
    /// 并调用 `on_success`（通常用于关闭对话框）。
    pub fn mutate<F, Fut>(&self, success: &'static str, op: F, on_success: impl FnOnce() + 'static)
    where
        F: FnOnce(Rc<AppLoader>, String) -> Fut + 'static,
        Fut: Future<Output = ApiResult<StateChange>> + 'static,
    {
        let token = match self.auth.valid_token() {
            Ok(token) => token,
            Err(_) => return,
        };
        let this = *self;
        let loader = self.loader();
        spawn_local(async move {
            let outcome = match op(loader.clone(), token).await {
                Ok(change) => loader.apply(change).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => {
                    this.notify(success);
                    on_success();
                }
                Err(e) => this.fail(e),
            }
            this.sync();
        });
    }
}

pub fn use_dashboard() -> DashboardContext {
    use_context::<DashboardContext>().expect("DashboardContext should be provided")
}
