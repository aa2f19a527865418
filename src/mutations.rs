//! 修改处理器
//!
//! 每个处理器的流程相同：本地校验（失败直接返回 `Validation`，不发请求）→
//! 发出恰好一次写请求 → 把后端返回的实体（缺省时用本地输入）包装成 `StateChange`。
//! 失败时原样返回后端错误，调用方不合并任何变更，本地状态保持不变。
//!
//! 后端返回实体的解析顺序：
//! 1. 完整实体（裸对象，或包在某个字段下）
//! 2. 只有 `id`：与本地输入组合
//! 3. 更新操作：用输入修补本地已知实体
//! 4. 新建操作两者皆无：重新加载所属范围

use crate::api::ApiClient;
use crate::dashboard::{Change, ReloadScope, StateChange};
use crate::error::{ApiError, ApiResult};
use crate::request::HttpClient;
use chrono::Utc;
use edusync_shared::date::is_valid_iso;
use edusync_shared::protocol::{
    AnnouncementInput, ApiRequest, AssignmentInput, CourseInput, CreateSubmissionRequest,
    DeleteAnnouncement, DeleteAssignment, DeleteClassroom, DeleteMaterial, EnrollRequest,
    GradeSubmissionRequest, MaterialInput, UpdateSubmissionRequest, WithId,
};
use edusync_shared::{Announcement, Assignment, Course, EntityId, Material, Submission};
use serde::de::DeserializeOwned;
use serde_json::Value;

const NO_CLASSROOM_MESSAGE: &str =
    "No classroom exists with that ID. Please check the classroom ID and try again.";
const TEACHER_MISMATCH_MESSAGE: &str =
    "The teacher name does not match this classroom. Please check with your teacher.";

/// 绑定了 token 的修改处理器集合
pub struct Mutations<'a, C: HttpClient> {
    api: &'a ApiClient<C>,
    token: &'a str,
}

impl<'a, C: HttpClient> Mutations<'a, C> {
    pub fn new(api: &'a ApiClient<C>, token: &'a str) -> Self {
        Self { api, token }
    }

    async fn write<R>(&self, req: &R) -> ApiResult<Value>
    where
        R: ApiRequest<Response = Value>,
    {
        self.api.send(req, Some(self.token)).await.inspect_err(|e| {
            tracing::warn!(method = R::METHOD.as_str(), path = %req.path(), error = %e, "mutation failed");
        })
    }

    // --- 学生 ---

    /// 加入课程
    ///
    /// 两类已知的后端错误会替换成更友好的提示，其余错误原样返回。
    pub async fn enroll(
        &self,
        classroom_id: EntityId,
        teacher_name: Option<&str>,
    ) -> ApiResult<StateChange> {
        require_id(classroom_id, "Classroom ID must be a positive number")?;
        let req = EnrollRequest {
            classroom_id,
            teacher_name: teacher_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        };

        let value = self.write(&req).await.map_err(friendly_enroll_error)?;
        tracing::info!(classroom_id, "enrolled");

        Ok(match entity_from::<Course>(&value) {
            Some(course) => StateChange::Course(Change::Created(course)),
            None => StateChange::Reload(ReloadScope::Courses),
        })
    }

    pub async fn create_submission(
        &self,
        assignment_id: EntityId,
        content: &str,
    ) -> ApiResult<StateChange> {
        require_id(assignment_id, "Invalid assignment")?;
        let content = require_text(content, "Submission content is required")?;
        let req = CreateSubmissionRequest {
            assignment_id,
            content,
        };

        let value = self.write(&req).await?;
        let entity = created(&value, |id| Submission {
            id,
            assignment_id,
            student_id: None,
            student_name: None,
            content: req.content.clone(),
            score: None,
            feedback: None,
            submitted_at: Some(Utc::now().to_rfc3339()),
        });
        Ok(match entity {
            Some(s) => StateChange::Submission(Change::Created(s)),
            None => StateChange::Reload(ReloadScope::Submissions),
        })
    }

    pub async fn update_submission(
        &self,
        current: &Submission,
        content: &str,
    ) -> ApiResult<StateChange> {
        require_id(current.id, "Invalid submission")?;
        let content = require_text(content, "Submission content is required")?;
        let req = UpdateSubmissionRequest {
            id: current.id,
            content,
        };

        let value = self.write(&req).await?;
        let patched = Submission {
            content: req.content.clone(),
            ..current.clone()
        };
        Ok(StateChange::Submission(Change::Updated(updated(&value, patched))))
    }

    // --- 教师 ---

    /// 评分
    ///
    /// 已知作业满分时，分数必须落在 `0..=max_points`。
    pub async fn grade_submission(
        &self,
        current: &Submission,
        max_points: Option<f64>,
        score: f64,
        feedback: Option<&str>,
    ) -> ApiResult<StateChange> {
        require_id(current.id, "Invalid submission")?;
        if !score.is_finite() || score < 0.0 {
            return Err(ApiError::validation("Score must be a non-negative number"));
        }
        if let Some(max) = max_points {
            if score > max {
                return Err(ApiError::validation(format!(
                    "Score must be between 0 and {}",
                    max
                )));
            }
        }

        let req = GradeSubmissionRequest {
            id: current.id,
            score,
            feedback: feedback
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        };

        let value = self.write(&req).await?;
        tracing::info!(submission_id = current.id, score, "submission graded");
        let patched = Submission {
            score: Some(score),
            feedback: req.feedback.clone().or_else(|| current.feedback.clone()),
            ..current.clone()
        };
        Ok(StateChange::Submission(Change::Updated(updated(&value, patched))))
    }

    // --- 课程 ---

    pub async fn create_course(&self, input: CourseInput) -> ApiResult<StateChange> {
        let input = validate_course(input)?;
        let value = self.write(&input).await?;
        Ok(match created(&value, |id| course_from_input(id, &input, None)) {
            Some(c) => StateChange::Course(Change::Created(c)),
            None => StateChange::Reload(ReloadScope::Courses),
        })
    }

    pub async fn update_course(&self, current: &Course, input: CourseInput) -> ApiResult<StateChange> {
        require_id(current.id, "Invalid classroom")?;
        let input = validate_course(input)?;
        let req = WithId {
            id: current.id,
            input,
        };
        let value = self.write(&req).await?;
        let patched = course_from_input(current.id, &req.input, Some(current));
        Ok(StateChange::Course(Change::Updated(updated(&value, patched))))
    }

    /// 删除课程；合并时连带移除该课程的作业、公告与资料
    pub async fn delete_course(&self, id: EntityId) -> ApiResult<StateChange> {
        require_id(id, "Invalid classroom")?;
        self.write(&DeleteClassroom(id)).await?;
        Ok(StateChange::Course(Change::Deleted(id)))
    }

    // --- 作业 ---

    pub async fn create_assignment(&self, input: AssignmentInput) -> ApiResult<StateChange> {
        let input = validate_assignment(input)?;
        let value = self.write(&input).await?;
        Ok(match created(&value, |id| assignment_from_input(id, &input, None)) {
            Some(a) => StateChange::Assignment(Change::Created(a)),
            None => StateChange::Reload(ReloadScope::CourseResources),
        })
    }

    pub async fn update_assignment(
        &self,
        current: &Assignment,
        input: AssignmentInput,
    ) -> ApiResult<StateChange> {
        require_id(current.id, "Invalid assignment")?;
        let input = validate_assignment(input)?;
        let req = WithId {
            id: current.id,
            input,
        };
        let value = self.write(&req).await?;
        let patched = assignment_from_input(current.id, &req.input, Some(current));
        Ok(StateChange::Assignment(Change::Updated(updated(&value, patched))))
    }

    pub async fn delete_assignment(&self, id: EntityId) -> ApiResult<StateChange> {
        require_id(id, "Invalid assignment")?;
        self.write(&DeleteAssignment(id)).await?;
        Ok(StateChange::Assignment(Change::Deleted(id)))
    }

    // --- 公告 ---

    pub async fn create_announcement(&self, input: AnnouncementInput) -> ApiResult<StateChange> {
        let input = validate_announcement(input)?;
        let value = self.write(&input).await?;
        let entity = created(&value, |id| Announcement {
            id,
            course_id: input.course_id,
            title: input.title.clone(),
            content: input.content.clone(),
            created_at: Some(Utc::now().to_rfc3339()),
            pinned: input.pinned,
        });
        Ok(match entity {
            Some(a) => StateChange::Announcement(Change::Created(a)),
            None => StateChange::Reload(ReloadScope::CourseResources),
        })
    }

    pub async fn update_announcement(
        &self,
        current: &Announcement,
        input: AnnouncementInput,
    ) -> ApiResult<StateChange> {
        require_id(current.id, "Invalid announcement")?;
        let input = validate_announcement(input)?;
        let req = WithId {
            id: current.id,
            input,
        };
        let value = self.write(&req).await?;
        let patched = Announcement {
            course_id: req.input.course_id,
            title: req.input.title.clone(),
            content: req.input.content.clone(),
            pinned: req.input.pinned,
            ..current.clone()
        };
        Ok(StateChange::Announcement(Change::Updated(updated(&value, patched))))
    }

    pub async fn delete_announcement(&self, id: EntityId) -> ApiResult<StateChange> {
        require_id(id, "Invalid announcement")?;
        self.write(&DeleteAnnouncement(id)).await?;
        Ok(StateChange::Announcement(Change::Deleted(id)))
    }

    // --- 资料 ---

    pub async fn create_material(&self, input: MaterialInput) -> ApiResult<StateChange> {
        let input = validate_material(input)?;
        let value = self.write(&input).await?;
        Ok(match created(&value, |id| material_from_input(id, &input, None)) {
            Some(m) => StateChange::Material(Change::Created(m)),
            None => StateChange::Reload(ReloadScope::CourseResources),
        })
    }

    pub async fn update_material(
        &self,
        current: &Material,
        input: MaterialInput,
    ) -> ApiResult<StateChange> {
        require_id(current.id, "Invalid material")?;
        let input = validate_material(input)?;
        let req = WithId {
            id: current.id,
            input,
        };
        let value = self.write(&req).await?;
        let patched = material_from_input(current.id, &req.input, Some(current));
        Ok(StateChange::Material(Change::Updated(updated(&value, patched))))
    }

    pub async fn delete_material(&self, id: EntityId) -> ApiResult<StateChange> {
        require_id(id, "Invalid material")?;
        self.write(&DeleteMaterial(id)).await?;
        Ok(StateChange::Material(Change::Deleted(id)))
    }
}

// =========================================================
// 本地校验
// =========================================================

fn require_id(id: EntityId, message: &str) -> ApiResult<()> {
    if id > 0 {
        Ok(())
    } else {
        Err(ApiError::validation(message))
    }
}

fn require_text(text: &str, message: &str) -> ApiResult<String> {
    let text = text.trim();
    if text.is_empty() {
        Err(ApiError::validation(message))
    } else {
        Ok(text.to_string())
    }
}

fn optional_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn require_date(date: Option<String>, message: &str) -> ApiResult<Option<String>> {
    match optional_text(date) {
        Some(d) if !is_valid_iso(&d) => Err(ApiError::validation(message)),
        other => Ok(other),
    }
}

fn validate_course(input: CourseInput) -> ApiResult<CourseInput> {
    Ok(CourseInput {
        title: require_text(&input.title, "Classroom title is required")?,
        description: optional_text(input.description),
        subject: optional_text(input.subject),
        start_date: require_date(input.start_date, "Start date must be a valid date")?,
        end_date: require_date(input.end_date, "End date must be a valid date")?,
    })
}

fn validate_assignment(input: AssignmentInput) -> ApiResult<AssignmentInput> {
    require_id(input.course_id, "Please select a classroom")?;
    if let Some(points) = input.max_points {
        if !points.is_finite() || points <= 0.0 {
            return Err(ApiError::validation("Max points must be a positive number"));
        }
    }
    Ok(AssignmentInput {
        course_id: input.course_id,
        title: require_text(&input.title, "Assignment title is required")?,
        description: optional_text(input.description),
        due_date: require_date(input.due_date, "Due date must be a valid date")?,
        max_points: input.max_points,
    })
}

fn validate_announcement(input: AnnouncementInput) -> ApiResult<AnnouncementInput> {
    require_id(input.course_id, "Please select a classroom")?;
    Ok(AnnouncementInput {
        course_id: input.course_id,
        title: require_text(&input.title, "Announcement title is required")?,
        content: require_text(&input.content, "Announcement content is required")?,
        pinned: input.pinned,
    })
}

fn validate_material(input: MaterialInput) -> ApiResult<MaterialInput> {
    require_id(input.course_id, "Please select a classroom")?;
    Ok(MaterialInput {
        course_id: input.course_id,
        title: require_text(&input.title, "Material title is required")?,
        description: optional_text(input.description),
        kind: optional_text(input.kind),
        file_path: optional_text(input.file_path),
    })
}

// =========================================================
// 响应解析
// =========================================================

/// 完整实体：裸对象，或包在某个对象字段下（`{"assignment": {...}}`）
fn entity_from<T: DeserializeOwned>(value: &Value) -> Option<T> {
    if let Ok(entity) = serde_json::from_value(value.clone()) {
        return Some(entity);
    }
    value
        .as_object()?
        .values()
        .filter(|v| v.is_object())
        .find_map(|v| serde_json::from_value(v.clone()).ok())
}

/// 只返回了 ID：`{"id": 5}` 或 `{"assignment": {"id": 5}}`
fn returned_id(value: &Value) -> Option<EntityId> {
    value.get("id").and_then(Value::as_i64).or_else(|| {
        value
            .as_object()?
            .values()
            .find_map(|v| v.get("id").and_then(Value::as_i64))
    })
}

fn created<T: DeserializeOwned>(value: &Value, from_id: impl FnOnce(EntityId) -> T) -> Option<T> {
    entity_from(value).or_else(|| returned_id(value).map(from_id))
}

fn updated<T: DeserializeOwned>(value: &Value, patched: T) -> T {
    entity_from(value).unwrap_or(patched)
}

fn friendly_enroll_error(err: ApiError) -> ApiError {
    match err {
        ApiError::Http { status, message } => {
            let lower = message.to_lowercase();
            let message = if lower.contains("no classroom exists") {
                NO_CLASSROOM_MESSAGE.to_string()
            } else if lower.contains("teacher does not match") {
                TEACHER_MISMATCH_MESSAGE.to_string()
            } else {
                message
            };
            ApiError::Http { status, message }
        }
        other => other,
    }
}

// =========================================================
// 由输入构造实体
// =========================================================

fn course_from_input(id: EntityId, input: &CourseInput, current: Option<&Course>) -> Course {
    let base = current.cloned();
    Course {
        id,
        title: input.title.clone(),
        description: input.description.clone(),
        subject: input.subject.clone(),
        start_date: input.start_date.clone(),
        end_date: input.end_date.clone(),
        color: base.as_ref().and_then(|c| c.color.clone()),
        teacher_name: base.as_ref().and_then(|c| c.teacher_name.clone()),
        student_count: base.as_ref().and_then(|c| c.student_count),
        assignment_count: base.as_ref().and_then(|c| c.assignment_count),
    }
}

fn assignment_from_input(
    id: EntityId,
    input: &AssignmentInput,
    current: Option<&Assignment>,
) -> Assignment {
    Assignment {
        id,
        course_id: input.course_id,
        title: input.title.clone(),
        description: input.description.clone(),
        due_date: input.due_date.clone(),
        max_points: input.max_points,
        status: current.and_then(|a| a.status.clone()),
    }
}

fn material_from_input(id: EntityId, input: &MaterialInput, current: Option<&Material>) -> Material {
    Material {
        id,
        course_id: input.course_id,
        title: input.title.clone(),
        description: input.description.clone(),
        kind: input.kind.clone(),
        file_path: input.file_path.clone(),
        uploaded_at: current
            .and_then(|m| m.uploaded_at.clone())
            .or_else(|| Some(Utc::now().to_rfc3339())),
    }
}

#[cfg(test)]
mod tests;
