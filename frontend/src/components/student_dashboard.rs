use crate::auth::use_auth;
use crate::components::common::*;
use crate::data::use_dashboard;
use edusync::Mutations;
use edusync::shared::{Assignment, Role, Submission};
use leptos::prelude::*;

#[component]
pub fn StudentDashboardPage() -> impl IntoView {
    let ctx = use_dashboard();
    let state = ctx.state;

    // token 不变时 load 不会重复请求
    Effect::new(move |_| ctx.load(Role::Student));

    let summary_value = move |f: fn(&edusync::shared::StudentSummary) -> String| {
        Signal::derive(move || state.with(|s| s.summary.as_ref().map(f).unwrap_or_else(|| "-".into())))
    };

    view! {
        <div class="min-h-screen bg-base-200 p-4 md:p-8 font-sans">
            <div class="max-w-7xl mx-auto space-y-8">
                <NoticeToast />
                <Navbar title="Student Dashboard" />

                <div class="stats shadow w-full stats-vertical md:stats-horizontal bg-base-100">
                    <Stat title="Enrolled courses" value=summary_value(|s| s.enrolled_courses.to_string()) />
                    <Stat title="Pending" value=summary_value(|s| s.pending_assignments.to_string()) />
                    <Stat title="Completed" value=summary_value(|s| s.completed_assignments.to_string()) />
                    <Stat
                        title="Average grade"
                        value=summary_value(|s| s.average_grade.map(|g| format!("{:.1}", g)).unwrap_or_else(|| "-".into()))
                    />
                </div>

                <div class="flex gap-2">
                    <EnrollDialog />
                    <ProfileDialog />
                </div>

                <div class="grid md:grid-cols-3 gap-6">
                    <div class="card bg-base-100 shadow-xl">
                        <div class="card-body">
                            <h3 class="card-title">"My courses"</h3>
                            <Show when=move || ctx.loading.get() && state.with(|s| s.courses.is_empty())>
                                <span class="loading loading-spinner loading-md"></span>
                            </Show>
                            <Show when=move || !ctx.loading.get() && state.with(|s| s.courses.is_empty())>
                                <p class="text-sm opacity-50">"You are not enrolled in any course yet."</p>
                            </Show>
                            <ul class="menu">
                                <For
                                    each=move || state.get().courses
                                    key=|c| c.id
                                    children=move |course| {
                                        let id = course.id;
                                        let active = move || state.with(|s| s.selected.as_ref().is_some_and(|v| v.course.id == id));
                                        view! {
                                            <li>
                                                <a class:active=active on:click=move |_| ctx.select_course(id)>
                                                    <div>
                                                        <div class="font-semibold">{course.title}</div>
                                                        <div class="text-xs opacity-60">{course.teacher_name.unwrap_or_default()}</div>
                                                    </div>
                                                </a>
                                            </li>
                                        }
                                    }
                                />
                            </ul>
                        </div>
                    </div>

                    <div class="md:col-span-2 space-y-6">
                        {move || match state.with(|s| s.selected.as_ref().map(|v| v.course.id)) {
                            Some(course_id) => view! { <CourseDetail course_id=course_id /> }.into_any(),
                            None => view! { <UpcomingWork /> }.into_any(),
                        }}
                    </div>
                </div>
            </div>
        </div>
    }
}

/// 未选择课程时：全部课程的作业与提交状态
#[component]
fn UpcomingWork() -> impl IntoView {
    let ctx = use_dashboard();
    let state = ctx.state;

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <h3 class="card-title">"Assignments"</h3>
                <AssignmentTable assignments=Signal::derive(move || state.get().assignments) />
            </div>
        </div>
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <h3 class="card-title">"Announcements"</h3>
                {move || view! { <AnnouncementList items=state.get().announcements /> }}
            </div>
        </div>
    }
}

#[component]
fn CourseDetail(course_id: i64) -> impl IntoView {
    let ctx = use_dashboard();
    let state = ctx.state;
    let title = move || state.with(|s| s.selected.as_ref().map(|v| v.course.title.clone()));
    let description = move || {
        state.with(|s| s.selected.as_ref().and_then(|v| v.course.description.clone()))
    };

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <div class="flex items-center justify-between">
                    <h3 class="card-title">{title}</h3>
                    <button class="btn btn-ghost btn-sm" on:click=move |_| ctx.clear_selection()>"Back"</button>
                </div>
                <p class="opacity-70">{description}</p>
                <AssignmentTable assignments=Signal::derive(move || {
                    state.with(|s| s.selected.as_ref().map(|v| v.assignments.clone()).unwrap_or_default())
                }) />
            </div>
        </div>
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <h3 class="card-title">"Announcements"</h3>
                {move || view! {
                    <AnnouncementList items=state.with(|s| s.announcements_for(course_id).into_iter().cloned().collect()) />
                }}
            </div>
        </div>
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <h3 class="card-title">"Materials"</h3>
                {move || view! {
                    <MaterialList items=state.with(|s| s.materials_for(course_id).into_iter().cloned().collect()) />
                }}
            </div>
        </div>
    }
}

#[component]
fn AssignmentTable(assignments: Signal<Vec<Assignment>>) -> impl IntoView {
    let ctx = use_dashboard();
    let state = ctx.state;

    view! {
        <div class="overflow-x-auto">
            <table class="table table-zebra">
                <thead>
                    <tr>
                        <th>"Assignment"</th>
                        <th>"Due"</th>
                        <th>"Status"</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>
                    <Show when=move || assignments.with(Vec::is_empty)>
                        <tr>
                            <td colspan="4" class="text-center py-6 opacity-50">"No assignments."</td>
                        </tr>
                    </Show>
                    <For
                        each=move || assignments.get()
                        key=|a| a.id
                        children=move |assignment| {
                            let id = assignment.id;
                            let submission = Signal::derive(move || state.with(|s| s.submission_for(id).cloned()));
                            view! {
                                <tr>
                                    <td>
                                        <div class="font-semibold">{assignment.title.clone()}</div>
                                        <div class="text-xs opacity-60">
                                            {assignment.max_points.map(|p| format!("{} points", p))}
                                        </div>
                                    </td>
                                    <td><DueBadge due=assignment.due_date.clone() /></td>
                                    <td>
                                        {move || match submission.get() {
                                            Some(s) if s.is_graded() => view! {
                                                <span class="badge badge-success">
                                                    {format!("Graded: {}", s.score.unwrap_or_default())}
                                                </span>
                                            }.into_any(),
                                            Some(_) => view! { <span class="badge badge-info">"Submitted"</span> }.into_any(),
                                            None => view! { <span class="badge badge-ghost">"Not submitted"</span> }.into_any(),
                                        }}
                                    </td>
                                    <td>
                                        <SubmitDialog assignment=assignment.clone() submission=submission />
                                    </td>
                                </tr>
                            }
                        }
                    />
                </tbody>
            </table>
        </div>
    }
}

/// 提交或修改作业
#[component]
fn SubmitDialog(assignment: Assignment, submission: Signal<Option<Submission>>) -> impl IntoView {
    let ctx = use_dashboard();
    let open = RwSignal::new(false);
    let content = RwSignal::new(String::new());
    let assignment_id = assignment.id;

    let show = move |_| {
        content.set(submission.get_untracked().map(|s| s.content).unwrap_or_default());
        open.set(true);
    };

    let submit = move || {
        let text = content.get_untracked();
        match submission.get_untracked() {
            Some(current) => ctx.mutate(
                "Submission updated",
                move |loader, token| async move {
                    Mutations::new(loader.api(), &token)
                        .update_submission(&current, &text)
                        .await
                },
                move || open.set(false),
            ),
            None => ctx.mutate(
                "Assignment submitted",
                move |loader, token| async move {
                    Mutations::new(loader.api(), &token)
                        .create_submission(assignment_id, &text)
                        .await
                },
                move || open.set(false),
            ),
        }
    };

    // 已评分的提交不能再修改
    let locked = move || submission.with(|s| s.as_ref().is_some_and(Submission::is_graded));

    view! {
        <button class="btn btn-sm btn-primary" disabled=locked on:click=show>
            {move || if submission.with(Option::is_some) { "Edit" } else { "Submit" }}
        </button>
        <Modal open=open title=assignment.title.clone()>
            <p class="text-sm opacity-70 mb-2">{assignment.description.clone().unwrap_or_default()}</p>
            <TextArea label="Your answer" value=content />
            <DialogActions open=open submit_label="Save" on_submit=submit />
        </Modal>
    }
}

#[component]
fn EnrollDialog() -> impl IntoView {
    let ctx = use_dashboard();
    let open = RwSignal::new(false);
    let classroom_id = RwSignal::new(String::new());
    let teacher_name = RwSignal::new(String::new());

    let submit = move || {
        let Ok(id) = classroom_id.get_untracked().trim().parse::<i64>() else {
            ctx.notice.set(Some(crate::data::Notice {
                message: "Classroom ID must be a number".to_string(),
                is_error: true,
            }));
            return;
        };
        let teacher = teacher_name.get_untracked();
        ctx.mutate(
            "Enrolled successfully",
            move |loader, token| async move {
                Mutations::new(loader.api(), &token)
                    .enroll(id, Some(teacher.as_str()))
                    .await
            },
            move || {
                classroom_id.set(String::new());
                teacher_name.set(String::new());
                open.set(false);
            },
        );
    };

    view! {
        <button class="btn btn-primary" on:click=move |_| open.set(true)>"Join a course"</button>
        <Modal open=open title="Join a course">
            <Field label="Classroom ID" value=classroom_id placeholder="e.g. 42" />
            <Field label="Teacher name (optional)" value=teacher_name />
            <DialogActions open=open submit_label="Join" on_submit=submit />
        </Modal>
    }
}

#[component]
fn ProfileDialog() -> impl IntoView {
    let auth = use_auth();
    let ctx = use_dashboard();
    let open = RwSignal::new(false);
    let name = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());

    let show = move |_| {
        if let Some(user) = auth.user() {
            name.set(user.name);
            email.set(user.email);
        }
        open.set(true);
    };

    let submit = move || {
        let (n, e) = (name.get_untracked(), email.get_untracked());
        leptos::task::spawn_local(async move {
            match auth.update_profile(n, e).await {
                Ok(_) => {
                    ctx.notify("Profile updated");
                    open.set(false);
                }
                Err(err) => ctx.notice.set(Some(crate::data::Notice {
                    message: err.to_string(),
                    is_error: true,
                })),
            }
        });
    };

    view! {
        <button class="btn btn-outline" on:click=show>"Edit profile"</button>
        <Modal open=open title="Edit profile">
            <Field label="Name" value=name />
            <Field label="Email" value=email kind="email" />
            <DialogActions open=open submit_label="Save" on_submit=submit />
        </Modal>
    }
}
