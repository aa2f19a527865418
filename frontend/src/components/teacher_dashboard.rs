use crate::components::common::*;
use crate::data::{DashboardContext, use_dashboard};
use edusync::Mutations;
use edusync::date::format_date;
use edusync::shared::protocol::{AnnouncementInput, AssignmentInput, CourseInput, MaterialInput};
use edusync::shared::{Course, Role, Submission};
use leptos::prelude::*;

fn optional(value: String) -> Option<String> {
    Some(value).filter(|v| !v.trim().is_empty())
}

#[component]
pub fn TeacherDashboardPage() -> impl IntoView {
    let ctx = use_dashboard();
    let state = ctx.state;

    Effect::new(move |_| ctx.load(Role::Teacher));

    let stat = move |f: fn(&edusync::shared::DashboardStats) -> u32| {
        Signal::derive(move || {
            state.with(|s| s.stats.as_ref().map(|st| f(st).to_string()).unwrap_or_else(|| "-".into()))
        })
    };

    view! {
        <div class="min-h-screen bg-base-200 p-4 md:p-8 font-sans">
            <div class="max-w-7xl mx-auto space-y-8">
                <NoticeToast />
                <Navbar title="Teacher Dashboard" />

                <div class="stats shadow w-full stats-vertical md:stats-horizontal bg-base-100">
                    <Stat title="Courses" value=stat(|s| s.total_courses) />
                    <Stat title="Students" value=stat(|s| s.total_students) />
                    <Stat title="Assignments" value=stat(|s| s.total_assignments) />
                    <Stat title="To grade" value=stat(|s| s.pending_submissions) />
                </div>

                <div class="grid md:grid-cols-3 gap-6">
                    <div class="space-y-6">
                        <div class="card bg-base-100 shadow-xl">
                            <div class="card-body">
                                <div class="flex items-center justify-between">
                                    <h3 class="card-title">"My classrooms"</h3>
                                    <CourseDialog current=None />
                                </div>
                                <Show when=move || !ctx.loading.get() && state.with(|s| s.courses.is_empty())>
                                    <p class="text-sm opacity-50">"No classrooms yet. Create one to start."</p>
                                </Show>
                                <ul class="menu">
                                    <For
                                        each=move || state.get().courses
                                        key=|c| (c.id, c.title.clone(), c.student_count)
                                        children=move |course| {
                                            let id = course.id;
                                            view! {
                                                <li>
                                                    <a on:click=move |_| ctx.select_course(id)>
                                                        <div>
                                                            <div class="font-semibold">{course.title}</div>
                                                            <div class="text-xs opacity-60">
                                                                {format!(
                                                                    "{} students · {} assignments",
                                                                    course.student_count.unwrap_or(0),
                                                                    course.assignment_count.unwrap_or(0),
                                                                )}
                                                            </div>
                                                        </div>
                                                    </a>
                                                </li>
                                            }
                                        }
                                    />
                                </ul>
                            </div>
                        </div>

                        <div class="card bg-base-100 shadow-xl">
                            <div class="card-body">
                                <h3 class="card-title">"Upcoming deadlines"</h3>
                                <For
                                    each=move || state.get().upcoming
                                    key=|a| a.id
                                    children=move |a| view! {
                                        <div class="flex items-center justify-between">
                                            <span>{a.title}</span>
                                            <DueBadge due=a.due_date />
                                        </div>
                                    }
                                />
                            </div>
                        </div>
                    </div>

                    <div class="md:col-span-2 space-y-6">
                        {move || match state.with(|s| s.selected.as_ref().map(|v| v.course.id)) {
                            Some(id) => view! { <ClassroomDetail course_id=id /> }.into_any(),
                            None => view! {
                                <div class="card bg-base-100 shadow-xl">
                                    <div class="card-body items-center text-center opacity-60">
                                        "Select a classroom to manage its assignments, announcements and materials."
                                    </div>
                                </div>
                            }.into_any(),
                        }}
                    </div>
                </div>
            </div>
        </div>
    }
}

#[component]
fn ClassroomDetail(course_id: i64) -> impl IntoView {
    let ctx = use_dashboard();
    let state = ctx.state;
    let course = Signal::derive(move || {
        state.with(|s| s.selected.as_ref().map(|v| v.course.clone()))
    });

    let delete_course = move |_| {
        ctx.mutate(
            "Classroom deleted",
            move |loader, token| async move {
                Mutations::new(loader.api(), &token).delete_course(course_id).await
            },
            || {},
        );
    };
    let delete_announcement = Callback::new(move |id: i64| {
        ctx.mutate(
            "Announcement deleted",
            move |loader, token| async move {
                Mutations::new(loader.api(), &token).delete_announcement(id).await
            },
            || {},
        );
    });
    let delete_material = Callback::new(move |id: i64| {
        ctx.mutate(
            "Material deleted",
            move |loader, token| async move {
                Mutations::new(loader.api(), &token).delete_material(id).await
            },
            || {},
        );
    });

    view! {
        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <div class="flex items-center justify-between">
                    <h3 class="card-title">
                        {move || course.get().map(|c| c.title)}
                        <span class="badge badge-outline">{format!("ID {}", course_id)}</span>
                    </h3>
                    <div class="flex gap-1">
                        {move || course.get().map(|c| view! { <CourseDialog current=Some(c) /> })}
                        <button class="btn btn-ghost btn-sm text-error" on:click=delete_course>"Delete"</button>
                        <button class="btn btn-ghost btn-sm" on:click=move |_| ctx.clear_selection()>"Back"</button>
                    </div>
                </div>
                <p class="opacity-70">{move || course.get().and_then(|c| c.description)}</p>
            </div>
        </div>

        <div class="card bg-base-100 shadow-xl">
            <div class="card-body">
                <div class="flex items-center justify-between">
                    <h3 class="card-title">"Assignments"</h3>
                    <AssignmentDialog course_id=course_id />
                </div>
                <AssignmentsWithSubmissions ctx=ctx />
            </div>
        </div>

        <div class="grid md:grid-cols-2 gap-6">
            <div class="card bg-base-100 shadow-xl">
                <div class="card-body">
                    <div class="flex items-center justify-between">
                        <h3 class="card-title">"Announcements"</h3>
                        <AnnouncementDialog course_id=course_id />
                    </div>
                    {move || view! {
                        <AnnouncementList
                            items=state.with(|s| s.announcements_for(course_id).into_iter().cloned().collect())
                            on_delete=delete_announcement
                        />
                    }}
                </div>
            </div>
            <div class="card bg-base-100 shadow-xl">
                <div class="card-body">
                    <div class="flex items-center justify-between">
                        <h3 class="card-title">"Materials"</h3>
                        <MaterialDialog course_id=course_id />
                    </div>
                    {move || view! {
                        <MaterialList
                            items=state.with(|s| s.materials_for(course_id).into_iter().cloned().collect())
                            on_delete=delete_material
                        />
                    }}
                </div>
            </div>
        </div>
    }
}

#[component]
fn AssignmentsWithSubmissions(ctx: DashboardContext) -> impl IntoView {
    let state = ctx.state;
    let view_data = move || state.with(|s| s.selected.clone());

    move || {
        let Some(view) = view_data() else {
            return ().into_any();
        };
        if view.assignments.is_empty() {
            return view! { <p class="text-sm opacity-50">"No assignments yet."</p> }.into_any();
        }

        view.assignments
            .into_iter()
            .map(|assignment| {
                let id = assignment.id;
                let max_points = assignment.max_points;
                let submissions: Vec<Submission> = view
                    .submissions
                    .iter()
                    .filter(|s| s.assignment_id == id)
                    .cloned()
                    .collect();
                let stats = state.with(|s| s.assignment_stats.get(&id).cloned());
                let delete = move |_| {
                    ctx.mutate(
                        "Assignment deleted",
                        move |loader, token| async move {
                            Mutations::new(loader.api(), &token).delete_assignment(id).await
                        },
                        || {},
                    );
                };

                view! {
                    <div class="collapse collapse-arrow bg-base-200 mb-2">
                        <input type="checkbox" />
                        <div class="collapse-title flex items-center gap-3">
                            <span class="font-semibold">{assignment.title.clone()}</span>
                            <DueBadge due=assignment.due_date.clone() />
                            <span class="text-xs opacity-60">
                                {stats.map(|st| match st.average_score {
                                    Some(avg) => format!("{} submitted · avg {:.1}", st.submission_count, avg),
                                    None => format!("{} submitted", st.submission_count),
                                })}
                            </span>
                        </div>
                        <div class="collapse-content">
                            <table class="table table-sm">
                                <thead>
                                    <tr>
                                        <th>"Student"</th>
                                        <th>"Submitted"</th>
                                        <th>"Score"</th>
                                        <th></th>
                                    </tr>
                                </thead>
                                <tbody>
                                    {submissions
                                        .into_iter()
                                        .map(|s| view! {
                                            <tr>
                                                <td>{s.student_name.clone().unwrap_or_else(|| "Unknown".into())}</td>
                                                <td>{format_date(s.submitted_at.as_deref())}</td>
                                                <td>
                                                    {match (s.score, max_points) {
                                                        (Some(score), Some(max)) => format!("{} / {}", score, max),
                                                        (Some(score), None) => score.to_string(),
                                                        (None, _) => "-".to_string(),
                                                    }}
                                                </td>
                                                <td><GradeDialog submission=s max_points=max_points /></td>
                                            </tr>
                                        })
                                        .collect_view()}
                                </tbody>
                            </table>
                            <button class="btn btn-ghost btn-xs text-error" on:click=delete>
                                "Delete assignment"
                            </button>
                        </div>
                    </div>
                }
            })
            .collect_view()
            .into_any()
    }
}

#[component]
fn GradeDialog(submission: Submission, max_points: Option<f64>) -> impl IntoView {
    let ctx = use_dashboard();
    let open = RwSignal::new(false);
    let score = RwSignal::new(submission.score.map(|s| s.to_string()).unwrap_or_default());
    let feedback = RwSignal::new(submission.feedback.clone().unwrap_or_default());
    let content = submission.content.clone();
    let submission = StoredValue::new(submission);

    let submit = move || {
        let Ok(value) = score.get_untracked().trim().parse::<f64>() else {
            ctx.notice.set(Some(crate::data::Notice {
                message: "Score must be a number".to_string(),
                is_error: true,
            }));
            return;
        };
        let current = submission.get_value();
        let note = feedback.get_untracked();
        ctx.mutate(
            "Submission graded",
            move |loader, token| async move {
                Mutations::new(loader.api(), &token)
                    .grade_submission(&current, max_points, value, Some(note.as_str()))
                    .await
            },
            move || open.set(false),
        );
    };

    view! {
        <button class="btn btn-xs btn-primary" on:click=move |_| open.set(true)>"Grade"</button>
        <Modal open=open title="Grade submission">
            <pre class="bg-base-200 p-3 rounded whitespace-pre-wrap text-sm mb-2">{content.clone()}</pre>
            <Field
                label=match max_points {
                    Some(max) => format!("Score (0 - {})", max),
                    None => "Score".to_string(),
                }
                value=score
                kind="number"
            />
            <TextArea label="Feedback" value=feedback />
            <DialogActions open=open submit_label="Save grade" on_submit=submit />
        </Modal>
    }
}

/// 新建或编辑课程
#[component]
fn CourseDialog(current: Option<Course>) -> impl IntoView {
    let ctx = use_dashboard();
    let open = RwSignal::new(false);
    let title = RwSignal::new(String::new());
    let description = RwSignal::new(String::new());
    let subject = RwSignal::new(String::new());
    let editing = current.is_some();
    let current = StoredValue::new(current);

    let show = move |_| {
        let c = current.get_value();
        title.set(c.as_ref().map(|c| c.title.clone()).unwrap_or_default());
        description.set(c.as_ref().and_then(|c| c.description.clone()).unwrap_or_default());
        subject.set(c.as_ref().and_then(|c| c.subject.clone()).unwrap_or_default());
        open.set(true);
    };

    let submit = move || {
        let input = CourseInput {
            title: title.get_untracked(),
            description: optional(description.get_untracked()),
            subject: optional(subject.get_untracked()),
            ..CourseInput::default()
        };
        let close = move || open.set(false);
        match current.get_value() {
            Some(c) => ctx.mutate(
                "Classroom updated",
                move |loader, token| async move {
                    Mutations::new(loader.api(), &token).update_course(&c, input).await
                },
                close,
            ),
            None => ctx.mutate(
                "Classroom created",
                move |loader, token| async move {
                    Mutations::new(loader.api(), &token).create_course(input).await
                },
                close,
            ),
        }
    };

    view! {
        <button class="btn btn-sm btn-primary" on:click=show>
            {if editing { "Edit" } else { "New" }}
        </button>
        <Modal open=open title=if editing { "Edit classroom" } else { "New classroom" }>
            <Field label="Title" value=title />
            <Field label="Subject" value=subject />
            <TextArea label="Description" value=description />
            <DialogActions open=open submit_label="Save" on_submit=submit />
        </Modal>
    }
}

#[component]
fn AssignmentDialog(course_id: i64) -> impl IntoView {
    let ctx = use_dashboard();
    let open = RwSignal::new(false);
    let title = RwSignal::new(String::new());
    let description = RwSignal::new(String::new());
    let due_date = RwSignal::new(String::new());
    let max_points = RwSignal::new("100".to_string());

    let submit = move || {
        let points = max_points.get_untracked();
        let points = match points.trim() {
            "" => None,
            raw => match raw.parse::<f64>() {
                Ok(p) => Some(p),
                Err(_) => {
                    ctx.notice.set(Some(crate::data::Notice {
                        message: "Max points must be a number".to_string(),
                        is_error: true,
                    }));
                    return;
                }
            },
        };
        // datetime-local 没有时区，按 UTC 解释
        let due = optional(due_date.get_untracked()).map(|d| if d.len() == 16 { format!("{}:00Z", d) } else { d });
        let input = AssignmentInput {
            course_id,
            title: title.get_untracked(),
            description: optional(description.get_untracked()),
            due_date: due,
            max_points: points,
        };
        ctx.mutate(
            "Assignment created",
            move |loader, token| async move {
                Mutations::new(loader.api(), &token).create_assignment(input).await
            },
            move || {
                title.set(String::new());
                description.set(String::new());
                due_date.set(String::new());
                open.set(false);
            },
        );
    };

    view! {
        <button class="btn btn-sm btn-primary" on:click=move |_| open.set(true)>"New"</button>
        <Modal open=open title="New assignment">
            <Field label="Title" value=title />
            <TextArea label="Description" value=description />
            <Field label="Due date" value=due_date kind="datetime-local" />
            <Field label="Max points" value=max_points kind="number" />
            <DialogActions open=open submit_label="Create" on_submit=submit />
        </Modal>
    }
}

#[component]
fn AnnouncementDialog(course_id: i64) -> impl IntoView {
    let ctx = use_dashboard();
    let open = RwSignal::new(false);
    let title = RwSignal::new(String::new());
    let content = RwSignal::new(String::new());
    let pinned = RwSignal::new(false);

    let submit = move || {
        let input = AnnouncementInput {
            course_id,
            title: title.get_untracked(),
            content: content.get_untracked(),
            pinned: pinned.get_untracked(),
        };
        ctx.mutate(
            "Announcement posted",
            move |loader, token| async move {
                Mutations::new(loader.api(), &token).create_announcement(input).await
            },
            move || {
                title.set(String::new());
                content.set(String::new());
                pinned.set(false);
                open.set(false);
            },
        );
    };

    view! {
        <button class="btn btn-sm btn-primary" on:click=move |_| open.set(true)>"Post"</button>
        <Modal open=open title="New announcement">
            <Field label="Title" value=title />
            <TextArea label="Content" value=content />
            <label class="label cursor-pointer justify-start gap-2">
                <input
                    type="checkbox"
                    class="checkbox"
                    prop:checked=move || pinned.get()
                    on:change=move |ev| pinned.set(event_target_checked(&ev))
                />
                <span class="label-text">"Pin to top"</span>
            </label>
            <DialogActions open=open submit_label="Post" on_submit=submit />
        </Modal>
    }
}

#[component]
fn MaterialDialog(course_id: i64) -> impl IntoView {
    let ctx = use_dashboard();
    let open = RwSignal::new(false);
    let title = RwSignal::new(String::new());
    let kind = RwSignal::new(String::new());
    let link = RwSignal::new(String::new());

    let submit = move || {
        let input = MaterialInput {
            course_id,
            title: title.get_untracked(),
            kind: optional(kind.get_untracked()),
            file_path: optional(link.get_untracked()),
            ..MaterialInput::default()
        };
        ctx.mutate(
            "Material added",
            move |loader, token| async move {
                Mutations::new(loader.api(), &token).create_material(input).await
            },
            move || {
                title.set(String::new());
                link.set(String::new());
                open.set(false);
            },
        );
    };

    view! {
        <button class="btn btn-sm btn-primary" on:click=move |_| open.set(true)>"Add"</button>
        <Modal open=open title="New material">
            <Field label="Title" value=title />
            <Field label="Type" value=kind placeholder="pdf, video, link" />
            <Field label="Link" value=link placeholder="https://" />
            <DialogActions open=open submit_label="Add" on_submit=submit />
        </Modal>
    }
}
