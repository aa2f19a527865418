use crate::auth::use_auth;
use crate::components::common::Field;
use crate::web::route::AppRoute;
use crate::web::router::use_router;
use edusync::shared::Role;
use edusync::shared::protocol::RegisterRequest;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn LoginPage() -> impl IntoView {
    let auth = use_auth();
    let router = use_router();

    let registering = RwSignal::new(false);
    let name = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let role = RwSignal::new(Role::Student);
    let (is_submitting, set_is_submitting) = signal(false);
    let (error_msg, set_error_msg) = signal(Option::<String>::None);
    let (info_msg, set_info_msg) = signal(Option::<String>::None);

    let on_submit = move |ev: leptos::web_sys::SubmitEvent| {
        ev.prevent_default();
        set_is_submitting.set(true);
        set_error_msg.set(None);
        set_info_msg.set(None);

        spawn_local(async move {
            if registering.get_untracked() {
                let req = RegisterRequest {
                    name: name.get_untracked(),
                    email: email.get_untracked(),
                    password: password.get_untracked(),
                    role: role.get_untracked(),
                };
                match auth.register(req).await {
                    Ok(()) => {
                        registering.set(false);
                        set_info_msg.set(Some("Account created. Please log in.".to_string()));
                    }
                    Err(e) => set_error_msg.set(Some(e.to_string())),
                }
            } else {
                match auth.login(email.get_untracked(), password.get_untracked()).await {
                    Ok(user) => router.navigate(AppRoute::home_for(user.role).to_path()),
                    Err(e) => set_error_msg.set(Some(e.to_string())),
                }
            }
            set_is_submitting.set(false);
        });
    };

    view! {
        <div class="hero min-h-screen bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <div class="text-center mb-4">
                    <h1 class="text-3xl font-bold">"EduSync"</h1>
                    <p class="text-base-content/70">
                        {move || if registering.get() { "Create your account" } else { "Sign in to your classroom" }}
                    </p>
                </div>

                <div class="card shrink-0 w-full shadow-2xl bg-base-100">
                    <form class="card-body" on:submit=on_submit>
                        <Show when=move || error_msg.get().is_some()>
                            <div role="alert" class="alert alert-error text-sm py-2">
                                <span>{move || error_msg.get().unwrap_or_default()}</span>
                            </div>
                        </Show>
                        <Show when=move || info_msg.get().is_some()>
                            <div role="alert" class="alert alert-success text-sm py-2">
                                <span>{move || info_msg.get().unwrap_or_default()}</span>
                            </div>
                        </Show>

                        <Show when=move || registering.get()>
                            <Field label="Name" value=name />
                            <label class="form-control w-full">
                                <div class="label"><span class="label-text">"I am a"</span></div>
                                <select
                                    class="select select-bordered"
                                    on:change=move |ev| {
                                        let role_value = if event_target_value(&ev) == "teacher" {
                                            Role::Teacher
                                        } else {
                                            Role::Student
                                        };
                                        role.set(role_value);
                                    }
                                >
                                    <option value="student" selected=move || role.get() == Role::Student>"Student"</option>
                                    <option value="teacher" selected=move || role.get() == Role::Teacher>"Teacher"</option>
                                </select>
                            </label>
                        </Show>
                        <Field label="Email" value=email kind="email" placeholder="you@school.edu" />
                        <Field label="Password" value=password kind="password" />

                        <div class="form-control mt-6">
                            <button class="btn btn-primary" disabled=move || is_submitting.get()>
                                {move || match (is_submitting.get(), registering.get()) {
                                    (true, _) => view! { <span class="loading loading-spinner"></span> }.into_any(),
                                    (false, true) => "Register".into_any(),
                                    (false, false) => "Log in".into_any(),
                                }}
                            </button>
                        </div>
                        <button
                            type="button"
                            class="btn btn-link btn-sm"
                            on:click=move |_| {
                                set_error_msg.set(None);
                                registering.update(|r| *r = !*r);
                            }
                        >
                            {move || if registering.get() { "Already have an account? Log in" } else { "New here? Create an account" }}
                        </button>
                    </form>
                </div>
            </div>
        </div>
    }
}
