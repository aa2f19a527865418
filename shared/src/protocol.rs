//! 接口目录
//!
//! 每个后端端点对应一个请求结构体，实现 `ApiRequest`，
//! 把路径、方法与响应类型绑定在一起。

use crate::{
    Assignment, AssignmentStats, Course, CourseDetail, DashboardStats, EntityId, StudentSummary,
    Submission,
};
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET / DELETE 不发送请求体
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
pub trait ApiRequest: Serialize {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The HTTP method.
    const METHOD: HttpMethod;
    /// The URL path, relative to the API base.
    fn path(&self) -> String;
}

// =========================================================
// 宽容的列表响应
// =========================================================

/// 列表响应
///
/// 后端有时返回裸数组，有时把数组包在某个字段里（`data`、`classrooms` ...），
/// 有时返回 `null`。三种情况都解码为列表，数组中的 `null` 元素被丢弃。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ListOf<T>(pub Vec<T>);

impl<T> ListOf<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for ListOf<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

const PREFERRED_LIST_KEYS: &[&str] = &["data", "items", "results"];

fn find_array(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => {
            for key in PREFERRED_LIST_KEYS {
                if let Some(Value::Array(_)) = map.get(*key) {
                    if let Some(Value::Array(items)) = map.remove(*key) {
                        return Some(items);
                    }
                }
            }
            map.into_iter().find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                Value::Object(_) => find_array(v),
                _ => None,
            })
        }
        _ => None,
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ListOf<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let items = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(ref map) if map.is_empty() => return Ok(Self::default()),
            other => find_array(other)
                .ok_or_else(|| D::Error::custom("expected a JSON array of entities"))?,
        };
        items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| serde_json::from_value(v).map_err(D::Error::custom))
            .collect::<Result<Vec<T>, _>>()
            .map(ListOf)
    }
}

// =========================================================
// Request Bodies
// =========================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: crate::Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub classroom_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubmissionRequest {
    pub assignment_id: EntityId,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSubmissionRequest {
    #[serde(skip)]
    pub id: EntityId,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeSubmissionRequest {
    #[serde(skip)]
    pub id: EntityId,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseInput {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentInput {
    #[serde(rename = "classroom_id")]
    pub course_id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementInput {
    #[serde(rename = "classroom_id")]
    pub course_id: EntityId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialInput {
    #[serde(rename = "classroom_id")]
    pub course_id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// 带路径 ID 的写请求：ID 进路径，输入进请求体
#[derive(Debug, Clone, Serialize)]
pub struct WithId<T> {
    #[serde(skip)]
    pub id: EntityId,
    #[serde(flatten)]
    pub input: T,
}

// =========================================================
// Request Definitions
// =========================================================

macro_rules! api_request {
    ($req:ty => $resp:ty, $method:ident, |$this:ident| $path:expr) => {
        impl ApiRequest for $req {
            type Response = $resp;
            const METHOD: HttpMethod = HttpMethod::$method;
            fn path(&self) -> String {
                let $this = self;
                $path
            }
        }
    };
    ($req:ty => $resp:ty, $method:ident, $path:expr) => {
        impl ApiRequest for $req {
            type Response = $resp;
            const METHOD: HttpMethod = HttpMethod::$method;
            fn path(&self) -> String {
                $path.to_string()
            }
        }
    };
}

macro_rules! marker {
    ($($name:ident),* $(,)?) => {
        $(#[derive(Debug, Clone, Copy, Default, Serialize)]
        pub struct $name;)*
    };
}

macro_rules! by_id {
    ($($name:ident),* $(,)?) => {
        $(#[derive(Debug, Clone, Copy, Serialize)]
        pub struct $name(#[serde(skip)] pub EntityId);)*
    };
}

marker!(
    AuthCheck,
    GetProfile,
    GetStudentDashboard,
    ListEnrollments,
    ListMySubmissions,
    ListTeacherClassrooms,
    ListUpcomingAssignments,
    GetStats,
);

by_id!(
    GetClassroom,
    DeleteClassroom,
    ListClassroomAssignments,
    ListClassroomMaterials,
    ListClassroomAnnouncements,
    DeleteAssignment,
    ListAssignmentSubmissions,
    GetAssignmentStatistics,
    DeleteMaterial,
    DeleteAnnouncement,
);

// --- 认证 ---
api_request!(RegisterRequest => Value, Post, "/register");
api_request!(LoginRequest => Value, Post, "/login");
api_request!(AuthCheck => Value, Get, "/auth/check");
api_request!(GetProfile => Value, Get, "/profile");
api_request!(UpdateProfileRequest => Value, Put, "/student/profile");

// --- 学生 ---
api_request!(GetStudentDashboard => StudentSummary, Get, "/student/dashboard");
api_request!(ListEnrollments => ListOf<Course>, Get, "/student/enrollments");
api_request!(EnrollRequest => Value, Post, "/enroll");
api_request!(ListMySubmissions => ListOf<Submission>, Get, "/submissions");
api_request!(CreateSubmissionRequest => Value, Post, "/submissions");
api_request!(UpdateSubmissionRequest => Value, Put, |r| format!("/submissions/{}", r.id));
api_request!(GradeSubmissionRequest => Value, Post, |r| format!("/submissions/{}/grade", r.id));

// --- 课程 ---
api_request!(GetClassroom => CourseDetail, Get, |r| format!("/classrooms/{}", r.0));
api_request!(CourseInput => Value, Post, "/classrooms");
api_request!(WithId<CourseInput> => Value, Put, |r| format!("/classrooms/{}", r.id));
api_request!(DeleteClassroom => Value, Delete, |r| format!("/classrooms/{}", r.0));
api_request!(ListClassroomAssignments => ListOf<Assignment>, Get, |r| format!("/classrooms/{}/assignments", r.0));
api_request!(ListClassroomMaterials => ListOf<crate::Material>, Get, |r| format!("/classrooms/{}/materials", r.0));
api_request!(ListClassroomAnnouncements => ListOf<crate::Announcement>, Get, |r| format!("/classrooms/{}/announcements", r.0));

// --- 作业 ---
api_request!(AssignmentInput => Value, Post, "/assignments");
api_request!(WithId<AssignmentInput> => Value, Put, |r| format!("/assignments/{}", r.id));
api_request!(DeleteAssignment => Value, Delete, |r| format!("/assignments/{}", r.0));
api_request!(ListAssignmentSubmissions => ListOf<Submission>, Get, |r| format!("/assignments/{}/submissions", r.0));
api_request!(GetAssignmentStatistics => AssignmentStats, Get, |r| format!("/assignments/{}/statistics", r.0));

// --- 资料 ---
api_request!(MaterialInput => Value, Post, "/materials");
api_request!(WithId<MaterialInput> => Value, Put, |r| format!("/materials/{}", r.id));
api_request!(DeleteMaterial => Value, Delete, |r| format!("/materials/{}", r.0));

// --- 公告 ---
api_request!(AnnouncementInput => Value, Post, "/announcements");
api_request!(WithId<AnnouncementInput> => Value, Put, |r| format!("/announcements/{}", r.id));
api_request!(DeleteAnnouncement => Value, Delete, |r| format!("/announcements/{}", r.0));

// --- 教师 ---
api_request!(ListTeacherClassrooms => ListOf<Course>, Get, "/teacher/classrooms");
api_request!(ListUpcomingAssignments => ListOf<Assignment>, Get, "/teacher/assignments/upcoming");
api_request!(GetStats => DashboardStats, Get, "/stats");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_of_accepts_bare_wrapped_and_null() {
        let bare: ListOf<Course> =
            serde_json::from_value(json!([{"id": 1, "title": "A"}, null])).unwrap();
        assert_eq!(bare.0.len(), 1);

        let wrapped: ListOf<Course> =
            serde_json::from_value(json!({"classrooms": [{"id": 2, "title": "B"}]})).unwrap();
        assert_eq!(wrapped.0[0].id, 2);

        let nested: ListOf<Course> =
            serde_json::from_value(json!({"data": {"items": [{"id": 3, "title": "C"}]}}))
                .unwrap();
        assert_eq!(nested.0[0].id, 3);

        let empty: ListOf<Course> = serde_json::from_value(json!(null)).unwrap();
        assert!(empty.0.is_empty());
    }

    #[test]
    fn list_of_rejects_scalars() {
        assert!(serde_json::from_value::<ListOf<Course>>(json!(42)).is_err());
    }

    #[test]
    fn path_ids_stay_out_of_bodies() {
        let req = UpdateSubmissionRequest {
            id: 9,
            content: "v2".into(),
        };
        assert_eq!(req.path(), "/submissions/9");
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({"content": "v2"}));

        let put = WithId {
            id: 4,
            input: AnnouncementInput {
                course_id: 1,
                title: "t".into(),
                content: "c".into(),
                pinned: true,
            },
        };
        assert_eq!(put.path(), "/announcements/4");
        assert_eq!(
            serde_json::to_value(&put).unwrap(),
            json!({"classroom_id": 1, "title": "t", "content": "c", "pinned": true})
        );
    }

    #[test]
    fn body_less_methods() {
        assert!(!<GetClassroom as ApiRequest>::METHOD.has_body());
        assert!(!<DeleteClassroom as ApiRequest>::METHOD.has_body());
        assert!(<CourseInput as ApiRequest>::METHOD.has_body());
        assert_eq!(GetClassroom(7).path(), "/classrooms/7");
    }
}
