//! 路由服务模块 - 核心引擎
//!
//! 封装 web_sys 的 History API，所有对 window.history 的操作都集中在此模块。
//! 导航流程："监听 -> 守卫 -> 处理 -> 加载"。守卫规则见 `AppRoute::guard`，
//! 当前角色通过注入的信号获得，路由与会话互不依赖。

use edusync_shared::Role;
use leptos::prelude::*;
use wasm_bindgen::prelude::*;

use super::route::AppRoute;

/// 获取当前浏览器路径
fn current_path() -> String {
    web_sys::window()
        .and_then(|w| w.location().pathname().ok())
        .unwrap_or_else(|| "/".to_string())
}

fn write_history(path: &str, use_push: bool) {
    let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
        return;
    };
    let result = if use_push {
        history.push_state_with_url(&JsValue::NULL, "", Some(path))
    } else {
        history.replace_state_with_url(&JsValue::NULL, "", Some(path))
    };
    if result.is_err() {
        tracing::warn!(path, "failed to update browser history");
    }
}

/// 路由器服务
///
/// 通过 Signal 驱动界面更新。
#[derive(Clone, Copy)]
pub struct RouterService {
    current_route: ReadSignal<AppRoute>,
    set_route: WriteSignal<AppRoute>,
    /// 当前登录角色（注入）
    role: Signal<Option<Role>>,
    /// 会话是否已经完成校验（注入）；校验中不做重定向
    settled: Signal<bool>,
}

impl RouterService {
    fn new(role: Signal<Option<Role>>, settled: Signal<bool>) -> Self {
        let (current_route, set_route) = signal(AppRoute::from_path(&current_path()));
        Self {
            current_route,
            set_route,
            role,
            settled,
        }
    }

    pub fn current_route(&self) -> ReadSignal<AppRoute> {
        self.current_route
    }

    /// 导航到指定路径（经过守卫）
    pub fn navigate(&self, path: &str) {
        self.navigate_to_route(AppRoute::from_path(path), true);
    }

    fn navigate_to_route(&self, target: AppRoute, use_push: bool) {
        let resolved = target.guard(self.role.get_untracked());
        if resolved != target {
            tracing::debug!(from = %target, to = %resolved, "route guard redirect");
        }
        write_history(resolved.to_path(), use_push);
        self.set_route.set(resolved);
    }

    /// 初始化浏览器后退/前进按钮监听
    fn init_popstate_listener(&self) {
        let router = *self;
        let closure = Closure::<dyn Fn()>::new(move || {
            // popstate 时也执行守卫，但只替换不推入
            router.navigate_to_route(AppRoute::from_path(&current_path()), false);
        });

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        // 泄漏闭包以保持监听器存活
        closure.forget();
    }

    /// 角色变化（登录 / 登出 / 校验完成）时重新应用守卫
    fn setup_auth_redirect(&self) {
        let router = *self;
        Effect::new(move |_| {
            let settled = router.settled.get();
            let _ = router.role.get();
            if settled {
                let route = router.current_route.get_untracked();
                router.navigate_to_route(route, false);
            }
        });
    }
}

fn provide_router(role: Signal<Option<Role>>, settled: Signal<bool>) -> RouterService {
    let router = RouterService::new(role, settled);
    router.init_popstate_listener();
    router.setup_auth_redirect();
    provide_context(router);
    router
}

/// 从 Context 获取路由服务
pub fn use_router() -> RouterService {
    use_context::<RouterService>()
        .expect("RouterService not found in context. Ensure Router is provided.")
}

// ============================================================================
// UI 组件
// ============================================================================

/// 路由器根组件
#[component]
pub fn Router(
    /// 当前角色信号
    role: Signal<Option<Role>>,
    /// 会话校验是否完成
    settled: Signal<bool>,
    children: Children,
) -> impl IntoView {
    provide_router(role, settled);
    children()
}

/// 路由出口组件
///
/// 会话校验完成前显示加载中，之后根据当前路由渲染对应组件。
#[component]
pub fn RouterOutlet(
    /// 路由匹配函数：接收当前路由，返回对应视图
    matcher: fn(AppRoute) -> AnyView,
) -> impl IntoView {
    let router = use_router();

    move || {
        if !router.settled.get() {
            return view! {
                <div class="flex items-center justify-center min-h-screen">
                    <span class="loading loading-spinner loading-lg text-primary"></span>
                </div>
            }
            .into_any();
        }
        matcher(router.current_route().get())
    }
}
