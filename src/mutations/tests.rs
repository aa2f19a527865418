use super::*;
use crate::dashboard::DashboardLoader;
use crate::request::MockHttpClient;
use edusync_shared::Role;
use edusync_shared::protocol::HttpMethod;
use serde_json::json;

const BASE: &str = "http://api.test";

fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

fn setup() -> (MockHttpClient, ApiClient<MockHttpClient>) {
    let mock = MockHttpClient::new();
    (mock.clone(), ApiClient::new(BASE, mock))
}

fn announcement_input(title: &str) -> AnnouncementInput {
    AnnouncementInput {
        course_id: 1,
        title: title.into(),
        content: "Quiz on Friday".into(),
        pinned: false,
    }
}

fn submission(content: &str) -> Submission {
    Submission {
        id: 5,
        assignment_id: 10,
        student_id: Some(7),
        student_name: Some("Ada".into()),
        content: content.into(),
        score: None,
        feedback: None,
        submitted_at: None,
    }
}

/// 已加载一门课程与一条提交记录的学生仪表盘
async fn loaded_student(mock: &MockHttpClient, api: &ApiClient<MockHttpClient>) -> DashboardLoader<MockHttpClient> {
    mock.mock_response(HttpMethod::Get, &url("/student/enrollments"), 200, json!([{"id": 1, "title": "Bio"}]));
    mock.mock_response(
        HttpMethod::Get,
        &url("/submissions"),
        200,
        json!([{"id": 5, "assignment_id": 10, "content": "draft"}]),
    );
    mock.mock_response(
        HttpMethod::Get,
        &url("/classrooms/1/materials"),
        200,
        json!([{"id": 3, "classroom_id": 1, "title": "Slides"}]),
    );
    let loader = DashboardLoader::new(api.clone());
    loader.load(Role::Student, "tok").await.unwrap();
    loader
}

#[tokio::test]
async fn empty_announcement_title_is_rejected_without_requests() {
    let (mock, api) = setup();
    let mutations = Mutations::new(&api, "tok");

    let err = mutations
        .create_announcement(announcement_input("   "))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn created_announcement_prefers_server_entity() {
    let (mock, api) = setup();
    mock.mock_response(
        HttpMethod::Post,
        &url("/announcements"),
        201,
        json!({"message": "created", "announcement": {"id": 42, "classroom_id": 1, "title": "Quiz", "content": "Friday", "is_pinned": true}}),
    );

    let change = Mutations::new(&api, "tok")
        .create_announcement(announcement_input(" Quiz "))
        .await
        .unwrap();

    let StateChange::Announcement(Change::Created(a)) = change else {
        panic!("unexpected change: {:?}", change);
    };
    assert_eq!(a.id, 42);
    assert!(a.pinned);

    let body = mock.requests()[0].json_body().unwrap();
    assert_eq!(body["title"], json!("Quiz"));
    assert_eq!(body["classroom_id"], json!(1));
    assert_eq!(mock.requests()[0].header("Authorization"), Some("Bearer tok"));
}

#[tokio::test]
async fn bare_id_response_combines_with_local_input() {
    let (mock, api) = setup();
    mock.mock_response(HttpMethod::Post, &url("/assignments"), 201, json!({"message": "ok", "id": 77}));

    let input = AssignmentInput {
        course_id: 1,
        title: "Essay".into(),
        description: None,
        due_date: Some("2030-05-01T12:00:00Z".into()),
        max_points: Some(50.0),
    };
    let change = Mutations::new(&api, "tok").create_assignment(input).await.unwrap();

    let StateChange::Assignment(Change::Created(a)) = change else {
        panic!("unexpected change: {:?}", change);
    };
    assert_eq!((a.id, a.course_id, a.title.as_str()), (77, 1, "Essay"));
    assert_eq!(a.max_points, Some(50.0));
}

#[tokio::test]
async fn missing_entity_falls_back_to_scoped_reload() {
    let (mock, api) = setup();
    mock.mock_raw(HttpMethod::Post, &url("/materials"), 201, "");

    let input = MaterialInput {
        course_id: 1,
        title: "Reading list".into(),
        ..MaterialInput::default()
    };
    let change = Mutations::new(&api, "tok").create_material(input).await.unwrap();

    assert_eq!(change, StateChange::Reload(ReloadScope::CourseResources));
}

#[tokio::test]
async fn invalid_due_date_is_rejected_locally() {
    let (mock, api) = setup();
    let input = AssignmentInput {
        course_id: 1,
        title: "Essay".into(),
        due_date: Some("next friday".into()),
        ..AssignmentInput::default()
    };

    let err = Mutations::new(&api, "tok").create_assignment(input).await.unwrap_err();
    assert_eq!(err, ApiError::validation("Due date must be a valid date"));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn update_submission_replaces_the_single_entry() {
    let (mock, api) = setup();
    let loader = loaded_student(&mock, &api).await;
    mock.mock_response(HttpMethod::Put, &url("/submissions/5"), 200, json!({"message": "updated"}));

    let current = loader.snapshot().submission_for(10).cloned().unwrap();
    let change = Mutations::new(&api, "tok")
        .update_submission(&current, "final answer")
        .await
        .unwrap();
    loader.apply(change).await.unwrap();

    let state = loader.snapshot();
    let matching: Vec<_> = state.submissions.iter().filter(|s| s.id == 5).collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].content, "final answer");
    assert_eq!(
        mock.requests().last().unwrap().json_body(),
        Some(json!({"content": "final answer"}))
    );
}

#[tokio::test]
async fn server_failure_leaves_state_unchanged() {
    let (mock, api) = setup();
    let loader = loaded_student(&mock, &api).await;
    mock.mock_response(
        HttpMethod::Delete,
        &url("/materials/3"),
        403,
        json!({"message": "Only the teacher can delete materials"}),
    );
    let before = loader.snapshot();

    let err = Mutations::new(&api, "tok").delete_material(3).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Only the teacher can delete materials (Status: 403)"
    );
    assert_eq!(loader.snapshot(), before);
}

#[tokio::test]
async fn enroll_maps_known_backend_messages() {
    let (mock, api) = setup();
    let mutations = Mutations::new(&api, "tok");

    mock.mock_response(
        HttpMethod::Post,
        &url("/enroll"),
        404,
        json!({"message": "Error: no classroom exists with id 9"}),
    );
    let err = mutations.enroll(9, None).await.unwrap_err();
    assert_eq!(err, ApiError::Http { status: 404, message: NO_CLASSROOM_MESSAGE.into() });

    mock.mock_response(
        HttpMethod::Post,
        &url("/enroll"),
        400,
        json!({"error": {"message": "Teacher does not match classroom"}}),
    );
    let err = mutations.enroll(9, Some("Mr. Smith")).await.unwrap_err();
    assert_eq!(err, ApiError::Http { status: 400, message: TEACHER_MISMATCH_MESSAGE.into() });

    mock.mock_response(HttpMethod::Post, &url("/enroll"), 409, json!({"message": "Already enrolled"}));
    let err = mutations.enroll(9, None).await.unwrap_err();
    assert_eq!(err.to_string(), "Already enrolled (Status: 409)");
}

#[tokio::test]
async fn enroll_success_without_entity_reloads_courses() {
    let (mock, api) = setup();
    mock.mock_response(HttpMethod::Post, &url("/enroll"), 200, json!({"message": "Enrolled"}));

    let change = Mutations::new(&api, "tok").enroll(4, Some("  ")).await.unwrap();

    assert_eq!(change, StateChange::Reload(ReloadScope::Courses));
    assert_eq!(mock.requests()[0].json_body(), Some(json!({"classroom_id": 4})));
}

#[tokio::test]
async fn enrolled_course_brings_its_resources_and_summary() {
    let (mock, api) = setup();
    let loader = loaded_student(&mock, &api).await;
    mock.mock_response(
        HttpMethod::Post,
        &url("/enroll"),
        200,
        json!({"classroom": {"id": 2, "title": "Chem"}}),
    );
    mock.mock_response(
        HttpMethod::Get,
        &url("/classrooms/2/assignments"),
        200,
        json!([{"id": 20, "classroom_id": 2, "title": "Lab report"}]),
    );
    mock.mock_response(HttpMethod::Get, &url("/student/dashboard"), 200, json!({"enrolled_courses": 2}));

    let change = Mutations::new(&api, "tok").enroll(2, None).await.unwrap();
    loader.apply(change).await.unwrap();

    let state = loader.snapshot();
    assert_eq!(state.courses.len(), 2);
    assert_eq!(state.assignments_for(2).len(), 1);
    assert_eq!(state.materials_for(1).len(), 1);
    assert_eq!(state.summary.as_ref().unwrap().enrolled_courses, 2);
    assert_eq!(mock.count_for(HttpMethod::Get, &url("/classrooms/2/assignments")), 1);
    // 已有课程不重新拉取
    assert_eq!(mock.count_for(HttpMethod::Get, &url("/classrooms/1/materials")), 1);
}

#[tokio::test]
async fn enroll_rejects_non_positive_id() {
    let (mock, api) = setup();

    let err = Mutations::new(&api, "tok").enroll(0, None).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn grade_is_bounded_by_max_points() {
    let (mock, api) = setup();
    let mutations = Mutations::new(&api, "tok");
    let current = submission("essay");

    let err = mutations
        .grade_submission(&current, Some(100.0), 101.0, None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Score must be between 0 and 100");
    assert!(mutations.grade_submission(&current, None, -1.0, None).await.is_err());
    assert_eq!(mock.request_count(), 0);

    mock.mock_response(HttpMethod::Post, &url("/submissions/5/grade"), 200, json!({}));
    let change = mutations
        .grade_submission(&current, Some(100.0), 100.0, Some("Great work"))
        .await
        .unwrap();

    let StateChange::Submission(Change::Updated(graded)) = change else {
        panic!("unexpected change: {:?}", change);
    };
    assert_eq!(graded.score, Some(100.0));
    assert_eq!(graded.feedback.as_deref(), Some("Great work"));
    assert_eq!(graded.content, "essay");
    assert_eq!(
        mock.requests()[0].json_body(),
        Some(json!({"score": 100.0, "feedback": "Great work"}))
    );
}

#[tokio::test]
async fn course_update_keeps_server_counts() {
    let (mock, api) = setup();
    mock.mock_response(HttpMethod::Put, &url("/classrooms/1"), 200, json!({"success": true}));
    let current = Course {
        id: 1,
        title: "Bio".into(),
        description: None,
        subject: None,
        color: Some("#0a0".into()),
        teacher_name: None,
        student_count: Some(30),
        assignment_count: Some(4),
        start_date: None,
        end_date: None,
    };
    let input = CourseInput {
        title: "Biology".into(),
        subject: Some("Science".into()),
        ..CourseInput::default()
    };

    let change = Mutations::new(&api, "tok").update_course(&current, input).await.unwrap();

    let StateChange::Course(Change::Updated(course)) = change else {
        panic!("unexpected change: {:?}", change);
    };
    assert_eq!(course.title, "Biology");
    assert_eq!(course.student_count, Some(30));
    assert_eq!(course.color.as_deref(), Some("#0a0"));
}

#[tokio::test]
async fn course_deletion_cascades_through_loader() {
    let (mock, api) = setup();
    let loader = loaded_student(&mock, &api).await;
    mock.mock_raw(HttpMethod::Delete, &url("/classrooms/1"), 204, "");

    let change = Mutations::new(&api, "tok").delete_course(1).await.unwrap();
    loader.apply(change).await.unwrap();

    let state = loader.snapshot();
    assert!(state.courses.is_empty());
    assert!(state.materials.is_empty());
}
