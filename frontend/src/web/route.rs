//! 路由定义模块 - 领域模型
//!
//! 纯业务逻辑层，不依赖 DOM。定义所有路由以及基于角色的守卫规则。

use edusync_shared::Role;
use std::fmt::Display;

/// 应用路由枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppRoute {
    /// 登录 / 注册页面 (默认路由)
    #[default]
    Login,
    StudentDashboard,
    TeacherDashboard,
    /// 页面未找到
    NotFound,
}

impl AppRoute {
    /// 将 URL path 解析为路由枚举
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" | "/login" => Self::Login,
            "/student" => Self::StudentDashboard,
            "/teacher" => Self::TeacherDashboard,
            _ => Self::NotFound,
        }
    }

    /// 获取路由对应的 URL path
    pub fn to_path(&self) -> &'static str {
        match self {
            Self::Login => "/",
            Self::StudentDashboard => "/student",
            Self::TeacherDashboard => "/teacher",
            Self::NotFound => "/404",
        }
    }

    /// 该路由要求的角色；`None` 表示公开页面
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Self::StudentDashboard => Some(Role::Student),
            Self::TeacherDashboard => Some(Role::Teacher),
            Self::Login | Self::NotFound => None,
        }
    }

    /// 角色对应的仪表盘
    pub fn home_for(role: Role) -> Self {
        match role {
            Role::Student => Self::StudentDashboard,
            Role::Teacher => Self::TeacherDashboard,
        }
    }

    /// **核心守卫逻辑**
    ///
    /// 返回实际应当展示的路由：
    /// - 受保护页面在未登录时回到登录页
    /// - 已登录用户访问登录页或别的角色的仪表盘时，去往自己的仪表盘
    pub fn guard(self, role: Option<Role>) -> Self {
        match (self.required_role(), role) {
            (Some(_), None) => Self::Login,
            (Some(required), Some(actual)) if required != actual => Self::home_for(actual),
            (None, Some(actual)) if self == Self::Login => Self::home_for(actual),
            _ => self,
        }
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}
