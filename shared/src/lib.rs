use serde::{Deserialize, Serialize};

pub mod date;
pub mod protocol;

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json";

// =========================================================
// 领域模型 (Domain Models)
// =========================================================

/// 所有实体的数字 ID 只在同类型内唯一
pub type EntityId = i64;

/// 可以按 ID 定位的实体
pub trait Entity {
    fn id(&self) -> EntityId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: EntityId,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// 学生视图：授课教师
    #[serde(default)]
    pub teacher_name: Option<String>,
    /// 教师视图：聚合计数
    #[serde(default)]
    pub student_count: Option<u32>,
    #[serde(default)]
    pub assignment_count: Option<u32>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: EntityId,
    #[serde(alias = "classroom_id")]
    pub course_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 缺省表示“无截止日期”，绝不能当作“现在到期”
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub max_points: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// 提交记录
///
/// 后端在不同视图中混用 `score` 与 `grade`。这里以 `score` 为准，
/// `grade` 只在反序列化时作为旧别名读取，两者同时存在时取 `score`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SubmissionWire")]
pub struct Submission {
    pub id: EntityId,
    pub assignment_id: EntityId,
    pub student_id: Option<EntityId>,
    pub student_name: Option<String>,
    pub content: String,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub submitted_at: Option<String>,
}

impl Submission {
    pub fn is_graded(&self) -> bool {
        self.score.is_some()
    }
}

#[derive(Deserialize)]
struct SubmissionWire {
    id: EntityId,
    assignment_id: EntityId,
    #[serde(default)]
    student_id: Option<EntityId>,
    #[serde(default)]
    student_name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    grade: Option<f64>,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    submitted_at: Option<String>,
}

impl From<SubmissionWire> for Submission {
    fn from(w: SubmissionWire) -> Self {
        Self {
            id: w.id,
            assignment_id: w.assignment_id,
            student_id: w.student_id,
            student_name: w.student_name,
            content: w.content.unwrap_or_default(),
            score: w.score.or(w.grade),
            feedback: w.feedback,
            submitted_at: w.submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: EntityId,
    #[serde(alias = "classroom_id")]
    pub course_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, alias = "is_pinned")]
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: EntityId,
    #[serde(alias = "classroom_id")]
    pub course_id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type", alias = "material_type")]
    pub kind: Option<String>,
    #[serde(default, alias = "url", alias = "file_url")]
    pub file_path: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

/// 单个作业的统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentStats {
    #[serde(default)]
    pub assignment_id: EntityId,
    #[serde(default)]
    pub average_score: Option<f64>,
    #[serde(default)]
    pub submission_count: u32,
}

/// 课程级计数（来自 `/stats`）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseCounts {
    #[serde(alias = "classroom_id")]
    pub course_id: EntityId,
    #[serde(default)]
    pub student_count: u32,
    #[serde(default)]
    pub assignment_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_courses: u32,
    #[serde(default)]
    pub total_students: u32,
    #[serde(default)]
    pub total_assignments: u32,
    #[serde(default)]
    pub pending_submissions: u32,
    #[serde(default, alias = "classrooms")]
    pub courses: Vec<CourseCounts>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    #[serde(default)]
    pub enrolled_courses: u32,
    #[serde(default)]
    pub pending_assignments: u32,
    #[serde(default)]
    pub completed_assignments: u32,
    #[serde(default)]
    pub average_grade: Option<f64>,
}

/// 课程详情：`GET /classrooms/{id}` 可能内嵌作业列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

macro_rules! impl_entity {
    ($($t:ty),*) => {
        $(impl Entity for $t {
            fn id(&self) -> EntityId {
                self.id
            }
        })*
    };
}

impl_entity!(Course, Assignment, Submission, Announcement, Material);

/// 置顶公告优先，其次按创建时间倒序
pub fn sort_announcements(list: &mut [Announcement]) {
    list.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submission_prefers_score_over_legacy_grade() {
        let s: Submission = serde_json::from_value(json!({
            "id": 1, "assignment_id": 2, "content": "x", "score": 90.0, "grade": 70.0
        }))
        .unwrap();
        assert_eq!(s.score, Some(90.0));

        let legacy: Submission = serde_json::from_value(json!({
            "id": 1, "assignment_id": 2, "grade": 70.0
        }))
        .unwrap();
        assert_eq!(legacy.score, Some(70.0));
        assert_eq!(legacy.content, "");
    }

    #[test]
    fn submission_serializes_canonical_score_only() {
        let s: Submission =
            serde_json::from_value(json!({"id": 1, "assignment_id": 2, "grade": 5.0})).unwrap();
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["score"], json!(5.0));
        assert!(v.get("grade").is_none());
    }

    #[test]
    fn course_accepts_name_alias() {
        let c: Course = serde_json::from_value(json!({"id": 3, "name": "Physics"})).unwrap();
        assert_eq!(c.title, "Physics");
        assert_eq!(c.description, None);
    }

    #[test]
    fn pinned_announcements_sort_first() {
        let mk = |id, pinned, at: &str| Announcement {
            id,
            course_id: 1,
            title: format!("a{id}"),
            content: String::new(),
            created_at: Some(at.to_string()),
            pinned,
        };
        let mut list = vec![
            mk(1, false, "2024-01-03T00:00:00Z"),
            mk(2, true, "2024-01-01T00:00:00Z"),
            mk(3, false, "2024-01-05T00:00:00Z"),
        ];
        sort_announcements(&mut list);
        let ids: Vec<_> = list.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
