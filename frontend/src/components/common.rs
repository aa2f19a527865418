//! 通用 UI 组件

use crate::auth::use_auth;
use crate::data::use_dashboard;
use edusync::date::{format_date, is_due_date_over, relative_time};
use edusync::shared::{Announcement, Material};
use leptos::prelude::*;

/// 页面顶部导航栏
#[component]
pub fn Navbar(#[prop(into)] title: String) -> impl IntoView {
    let auth = use_auth();
    let name = move || auth.user().map(|u| u.name).unwrap_or_default();
    let role = move || auth.user().map(|u| u.role.as_str()).unwrap_or_default();

    view! {
        <div class="navbar bg-base-100 rounded-box shadow-xl">
            <div class="flex-1 gap-2">
                <a class="btn btn-ghost text-xl">{title}</a>
                <span class="badge badge-neutral hidden md:inline-flex">{role}</span>
            </div>
            <div class="flex-none gap-2">
                <span class="text-sm opacity-70 hidden md:inline">{name}</span>
                <button on:click=move |_| auth.logout() class="btn btn-outline btn-error btn-sm">
                    "Log out"
                </button>
            </div>
        </div>
    }
}

/// 右上角提示
#[component]
pub fn NoticeToast() -> impl IntoView {
    let ctx = use_dashboard();
    let notice = ctx.notice;

    view! {
        <Show when=move || notice.with(Option::is_some)>
            <div class="toast toast-top toast-end z-50">
                <div class=move || {
                    if notice.with(|n| n.as_ref().is_some_and(|n| n.is_error)) {
                        "alert alert-error shadow-lg"
                    } else {
                        "alert alert-success shadow-lg"
                    }
                }>
                    <span>{move || notice.with(|n| n.as_ref().map(|n| n.message.clone()))}</span>
                </div>
            </div>
        </Show>
    }
}

/// 对话框
///
/// 完全声明式渲染：`open` 为 true 时显示。
#[component]
pub fn Modal(
    open: RwSignal<bool>,
    #[prop(into)] title: String,
    children: ChildrenFn,
) -> impl IntoView {
    view! {
        <div class="modal" class:modal-open=move || open.get()>
            <div class="modal-box">
                <h3 class="font-bold text-lg mb-4">{title}</h3>
                {children()}
            </div>
            <div class="modal-backdrop" on:click=move |_| open.set(false)></div>
        </div>
    }
}

/// 带标签的输入框
#[component]
pub fn Field(
    #[prop(into)] label: String,
    value: RwSignal<String>,
    #[prop(default = "text")] kind: &'static str,
    #[prop(optional, into)] placeholder: String,
) -> impl IntoView {
    view! {
        <label class="form-control w-full">
            <div class="label">
                <span class="label-text">{label}</span>
            </div>
            <input
                type=kind
                placeholder=placeholder
                class="input input-bordered w-full"
                prop:value=move || value.get()
                on:input=move |ev| value.set(event_target_value(&ev))
            />
        </label>
    }
}

/// 多行输入框
#[component]
pub fn TextArea(#[prop(into)] label: String, value: RwSignal<String>) -> impl IntoView {
    view! {
        <label class="form-control w-full">
            <div class="label">
                <span class="label-text">{label}</span>
            </div>
            <textarea
                class="textarea textarea-bordered w-full h-28"
                prop:value=move || value.get()
                on:input=move |ev| value.set(event_target_value(&ev))
            ></textarea>
        </label>
    }
}

/// 对话框底部按钮
#[component]
pub fn DialogActions(
    open: RwSignal<bool>,
    #[prop(into)] submit_label: String,
    on_submit: impl Fn() + 'static,
) -> impl IntoView {
    view! {
        <div class="modal-action">
            <button class="btn btn-ghost" on:click=move |_| open.set(false)>"Cancel"</button>
            <button class="btn btn-primary" on:click=move |_| on_submit()>{submit_label}</button>
        </div>
    }
}

/// 截止日期徽章
#[component]
pub fn DueBadge(due: Option<String>) -> impl IntoView {
    let overdue = is_due_date_over(due.as_deref());
    let text = relative_time(due.as_deref());
    let title = format_date(due.as_deref());
    let class = if overdue {
        "badge badge-error badge-outline"
    } else if due.is_some() {
        "badge badge-info badge-outline"
    } else {
        "badge badge-ghost"
    };

    view! { <span class=class title=title>{text}</span> }
}

/// 统计卡片
#[component]
pub fn Stat(#[prop(into)] title: String, value: Signal<String>) -> impl IntoView {
    view! {
        <div class="stat">
            <div class="stat-title">{title}</div>
            <div class="stat-value text-primary">{move || value.get()}</div>
        </div>
    }
}

#[component]
pub fn AnnouncementList(
    items: Vec<Announcement>,
    /// 传入时每条公告显示删除按钮
    #[prop(optional)]
    on_delete: Option<Callback<i64>>,
) -> impl IntoView {
    if items.is_empty() {
        return view! { <p class="text-sm opacity-50">"No announcements yet."</p> }.into_any();
    }

    items
        .into_iter()
        .map(|a| {
            let id = a.id;
            view! {
                <div class="border-l-4 pl-3 py-1" class:border-warning=a.pinned class:border-base-300=!a.pinned>
                    <div class="flex items-center justify-between">
                        <span class="font-semibold">
                            {a.pinned.then_some("📌 ")} {a.title}
                        </span>
                        {on_delete.map(|cb| view! {
                            <button class="btn btn-ghost btn-xs text-error" on:click=move |_| cb.run(id)>
                                "Delete"
                            </button>
                        })}
                    </div>
                    <p class="text-sm whitespace-pre-line">{a.content}</p>
                    <p class="text-xs opacity-50">{format_date(a.created_at.as_deref())}</p>
                </div>
            }
        })
        .collect_view()
        .into_any()
}

#[component]
pub fn MaterialList(
    items: Vec<Material>,
    #[prop(optional)] on_delete: Option<Callback<i64>>,
) -> impl IntoView {
    if items.is_empty() {
        return view! { <p class="text-sm opacity-50">"No materials yet."</p> }.into_any();
    }

    view! {
        <ul class="menu bg-base-200 rounded-box">
            {items
                .into_iter()
                .map(|m| {
                    let id = m.id;
                    let href = m.file_path.clone().unwrap_or_default();
                    view! {
                        <li class="flex flex-row items-center justify-between">
                            <a href=href target="_blank">
                                <span class="badge badge-sm">{m.kind.unwrap_or_else(|| "file".to_string())}</span>
                                {m.title}
                            </a>
                            {on_delete.map(|cb| view! {
                                <button class="btn btn-ghost btn-xs text-error" on:click=move |_| cb.run(id)>
                                    "Delete"
                                </button>
                            })}
                        </li>
                    }
                })
                .collect_view()}
        </ul>
    }
    .into_any()
}
