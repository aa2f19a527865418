//! EduSync 前端应用
//!
//! 采用 Context-Driven 架构：
//! - `web::route` / `web::router`: 路由定义与按角色守卫的路由服务
//! - `auth`: 会话上下文
//! - `data`: 仪表盘数据上下文
//! - `components`: UI 组件层

mod auth;
mod data;
pub mod logging;
mod components {
    pub mod common;
    pub mod login;
    pub mod student_dashboard;
    pub mod teacher_dashboard;
}
pub(crate) mod web;

use crate::auth::{AuthContext, init_auth};
use crate::components::login::LoginPage;
use crate::components::student_dashboard::StudentDashboardPage;
use crate::components::teacher_dashboard::TeacherDashboardPage;
use crate::data::DashboardContext;

use edusync::ClientConfig;
use leptos::prelude::*;
use web::route::AppRoute;
use web::router::{Router, RouterOutlet};

fn route_matcher(route: AppRoute) -> AnyView {
    match route {
        AppRoute::Login => view! { <LoginPage /> }.into_any(),
        AppRoute::StudentDashboard => view! { <StudentDashboardPage /> }.into_any(),
        AppRoute::TeacherDashboard => view! { <TeacherDashboardPage /> }.into_any(),
        AppRoute::NotFound => view! {
            <div class="flex items-center justify-center min-h-screen bg-base-200">
                <div class="text-center">
                    <h1 class="text-6xl font-bold text-error">"404"</h1>
                    <p class="text-xl mt-4">"Page not found"</p>
                </div>
            </div>
        }
        .into_any(),
    }
}

/// 构建期可通过 `EDUSYNC_API_BASE_URL` 覆盖后端地址
fn client_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Some(url) = option_env!("EDUSYNC_API_BASE_URL") {
        config.api_base_url = url.to_string();
    }
    config
}

#[component]
pub fn App() -> impl IntoView {
    let config = client_config();
    let api = match edusync::connect(&config) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!(error = %e, "failed to create api client");
            return view! {
                <div role="alert" class="alert alert-error m-8">
                    <span>{format!("EduSync failed to start: {}", e)}</span>
                </div>
            }
            .into_any();
        }
    };

    // 1. 会话上下文
    let auth = AuthContext::new(api, &config);
    provide_context(auth);

    // 2. 仪表盘数据上下文，两个角色页面共用
    provide_context(DashboardContext::new(auth));

    // 3. 从 sessionStorage 恢复会话，完成后路由守卫才生效
    init_auth(&auth);

    view! {
        <Router role=auth.role_signal() settled=auth.settled_signal()>
            <RouterOutlet matcher=route_matcher />
        </Router>
    }
    .into_any()
}
