//! 仪表盘数据加载器
//!
//! 显式的加载编排器，替代“依赖变化即重新请求”的隐式响应式写法：
//!
//! 1. `load(role, token)` 先取课程列表，课程就绪后再并发扇出每门课的
//!    作业 / 公告 / 资料；学生提交记录、概要等独立请求与之并行。
//! 2. `reload(scope)` 只重新拉取指定范围，单次修改不需要整页重载。
//! 3. 扇出请求各自捕获错误：某门课失败只贡献空结果，不影响其他课程；
//!    所有扇出结束后才一次性写入状态，避免中间态渲染。
//! 4. 同一范围的请求在途时再次触发会被跳过，不重复发出。
//!
//! 换 token 会递增 generation，旧 generation 的迟到结果直接丢弃。

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::request::HttpClient;
use edusync_shared::protocol::{
    ApiRequest, GetAssignmentStatistics, GetClassroom, GetStats, GetStudentDashboard,
    ListAssignmentSubmissions, ListClassroomAnnouncements, ListClassroomAssignments,
    ListClassroomMaterials, ListEnrollments, ListMySubmissions, ListOf, ListTeacherClassrooms,
    ListUpcomingAssignments,
};
use edusync_shared::{
    Announcement, Assignment, AssignmentStats, Course, DashboardStats, Entity, EntityId, Material,
    Role, StudentSummary, Submission, sort_announcements,
};
use futures::future::join_all;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;

// =========================================================
// 视图状态
// =========================================================

/// 单门课程的详情视图
#[derive(Debug, Clone, PartialEq)]
pub struct CourseView {
    pub course: Course,
    pub assignments: Vec<Assignment>,
    /// 该课程所有作业的提交记录汇总
    pub submissions: Vec<Submission>,
}

/// 仪表盘快照
///
/// 纯数据，可直接放进 UI 的响应式信号中。关系只靠外键字段表达，
/// 视图按需过滤。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub role: Option<Role>,
    pub courses: Vec<Course>,
    pub assignments: Vec<Assignment>,
    pub announcements: Vec<Announcement>,
    pub materials: Vec<Material>,
    /// 学生：本人的提交记录
    pub submissions: Vec<Submission>,
    pub selected: Option<CourseView>,
    pub summary: Option<StudentSummary>,
    pub stats: Option<DashboardStats>,
    pub assignment_stats: HashMap<EntityId, AssignmentStats>,
    pub upcoming: Vec<Assignment>,
}

impl DashboardState {
    fn for_role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    pub fn course(&self, id: EntityId) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn assignment(&self, id: EntityId) -> Option<&Assignment> {
        self.assignments
            .iter()
            .chain(self.selected.iter().flat_map(|v| v.assignments.iter()))
            .find(|a| a.id == id)
    }

    pub fn assignments_for(&self, course_id: EntityId) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.course_id == course_id)
            .collect()
    }

    pub fn announcements_for(&self, course_id: EntityId) -> Vec<&Announcement> {
        self.announcements
            .iter()
            .filter(|a| a.course_id == course_id)
            .collect()
    }

    pub fn materials_for(&self, course_id: EntityId) -> Vec<&Material> {
        self.materials
            .iter()
            .filter(|m| m.course_id == course_id)
            .collect()
    }

    /// 学生对某作业的提交
    pub fn submission_for(&self, assignment_id: EntityId) -> Option<&Submission> {
        self.submissions
            .iter()
            .find(|s| s.assignment_id == assignment_id)
    }

    fn course_ids(&self) -> HashSet<EntityId> {
        self.courses.iter().map(|c| c.id).collect()
    }

    fn apply_course_counts(&mut self) {
        let Some(stats) = &self.stats else {
            return;
        };
        for counts in &stats.courses {
            if let Some(course) = self.courses.iter_mut().find(|c| c.id == counts.course_id) {
                course.student_count = Some(counts.student_count);
                course.assignment_count = Some(counts.assignment_count);
            }
        }
    }

    /// 把一次修改的结果合并进快照
    ///
    /// 新建是插入，更新是原地替换，删除是移除；同一 ID 永远不会出现两份。
    pub fn apply(&mut self, change: StateChange) {
        match change {
            StateChange::Course(Change::Deleted(id)) => {
                remove(&mut self.courses, id);
                let dropped: HashSet<EntityId> = self
                    .assignments
                    .iter()
                    .filter(|a| a.course_id == id)
                    .map(|a| a.id)
                    .collect();
                self.assignments.retain(|a| a.course_id != id);
                self.announcements.retain(|a| a.course_id != id);
                self.materials.retain(|m| m.course_id != id);
                self.assignment_stats.retain(|k, _| !dropped.contains(k));
                if self.selected.as_ref().is_some_and(|v| v.course.id == id) {
                    self.selected = None;
                }
            }
            StateChange::Course(Change::Created(course) | Change::Updated(course)) => {
                if let Some(view) = self.selected.as_mut().filter(|v| v.course.id == course.id) {
                    view.course = course.clone();
                }
                upsert(&mut self.courses, course);
            }
            StateChange::Assignment(Change::Deleted(id)) => {
                remove(&mut self.assignments, id);
                self.assignment_stats.remove(&id);
                self.submissions.retain(|s| s.assignment_id != id);
                if let Some(view) = self.selected.as_mut() {
                    remove(&mut view.assignments, id);
                    view.submissions.retain(|s| s.assignment_id != id);
                }
            }
            StateChange::Assignment(Change::Created(assignment) | Change::Updated(assignment)) => {
                if let Some(view) = self
                    .selected
                    .as_mut()
                    .filter(|v| v.course.id == assignment.course_id)
                {
                    upsert(&mut view.assignments, assignment.clone());
                }
                upsert(&mut self.assignments, assignment);
            }
            StateChange::Submission(Change::Deleted(id)) => {
                remove(&mut self.submissions, id);
                if let Some(view) = self.selected.as_mut() {
                    remove(&mut view.submissions, id);
                }
            }
            StateChange::Submission(Change::Created(submission) | Change::Updated(submission)) => {
                let mut placed = false;
                if let Some(view) = self.selected.as_mut() {
                    let in_view = view
                        .assignments
                        .iter()
                        .any(|a| a.id == submission.assignment_id)
                        || view.submissions.iter().any(|s| s.id == submission.id);
                    if in_view {
                        upsert(&mut view.submissions, submission.clone());
                        placed = true;
                    }
                }
                let own = self.role == Some(Role::Student)
                    || self.submissions.iter().any(|s| s.id == submission.id);
                if own || !placed {
                    upsert(&mut self.submissions, submission);
                }
            }
            StateChange::Announcement(Change::Deleted(id)) => {
                remove(&mut self.announcements, id);
            }
            StateChange::Announcement(Change::Created(item) | Change::Updated(item)) => {
                upsert(&mut self.announcements, item);
                sort_announcements(&mut self.announcements);
            }
            StateChange::Material(Change::Deleted(id)) => {
                remove(&mut self.materials, id);
            }
            StateChange::Material(Change::Created(item) | Change::Updated(item)) => {
                upsert(&mut self.materials, item);
            }
            StateChange::Reload(_) => {}
        }
    }
}

fn upsert<T: Entity>(list: &mut Vec<T>, item: T) {
    match list.iter_mut().find(|x| x.id() == item.id()) {
        Some(slot) => *slot = item,
        None => list.push(item),
    }
}

fn remove<T: Entity>(list: &mut Vec<T>, id: EntityId) {
    list.retain(|x| x.id() != id);
}

// =========================================================
// 变更描述
// =========================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Created(T),
    Updated(T),
    Deleted(EntityId),
}

/// 修改处理器的产出，由加载器统一合并
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    Course(Change<Course>),
    Assignment(Change<Assignment>),
    Submission(Change<Submission>),
    Announcement(Change<Announcement>),
    Material(Change<Material>),
    /// 后端没有返回可用实体，需要重新拉取对应范围
    Reload(ReloadScope),
}

/// 可单独重新加载的范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReloadScope {
    Courses,
    CourseResources,
    Submissions,
    CourseDetail(EntityId),
    Stats,
    Upcoming,
    Summary,
}

// =========================================================
// 加载器
// =========================================================

#[derive(Debug, Clone)]
struct LoadContext {
    role: Role,
    token: String,
    generation: u64,
    /// 课程链路已成功完成
    loaded: bool,
}

type InFlightKey = (u64, ReloadScope);

/// 在途标记，drop 时自动移除
struct InFlightGuard<'a> {
    set: &'a RefCell<HashSet<InFlightKey>>,
    key: InFlightKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.key);
    }
}

pub struct DashboardLoader<C: HttpClient> {
    api: ApiClient<C>,
    context: RefCell<Option<LoadContext>>,
    state: RefCell<DashboardState>,
    in_flight: RefCell<HashSet<InFlightKey>>,
    generation: Cell<u64>,
}

impl<C: HttpClient> DashboardLoader<C> {
    pub fn new(api: ApiClient<C>) -> Self {
        Self {
            api,
            context: RefCell::new(None),
            state: RefCell::new(DashboardState::default()),
            in_flight: RefCell::new(HashSet::new()),
            generation: Cell::new(0),
        }
    }

    pub fn api(&self) -> &ApiClient<C> {
        &self.api
    }

    pub fn snapshot(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        f(&*self.state.borrow())
    }

    /// 当前加载所用的 token
    pub fn token(&self) -> Option<String> {
        self.context.borrow().as_ref().map(|c| c.token.clone())
    }

    /// 清空状态（登出时调用）
    pub fn reset(&self) {
        self.generation.set(self.generation.get() + 1);
        *self.context.borrow_mut() = None;
        *self.state.borrow_mut() = DashboardState::default();
    }

    fn context(&self) -> ApiResult<LoadContext> {
        self.context
            .borrow()
            .clone()
            .ok_or(ApiError::Unauthenticated)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.get() == generation
    }

    /// 仅当 generation 仍然有效时写入状态
    fn commit<R>(&self, ctx: &LoadContext, f: impl FnOnce(&mut DashboardState) -> R) -> Option<R> {
        if !self.is_current(ctx.generation) {
            tracing::debug!(generation = ctx.generation, "discarding stale dashboard result");
            return None;
        }
        Some(f(&mut *self.state.borrow_mut()))
    }

    /// 加载指定角色的整个仪表盘
    ///
    /// 同一角色、同一 token 已加载时不做任何事；token 变化时先清空状态。
    /// 只有课程列表失败会返回错误，其余独立请求失败只记录日志。
    pub async fn load(&self, role: Role, token: &str) -> ApiResult<()> {
        // 上次失败的加载允许用同一 token 重试；仍在途时不重复发起
        let skip = self.context.borrow().as_ref().is_some_and(|c| {
            c.role == role
                && c.token == token
                && (c.loaded || self.in_flight.borrow().iter().any(|(g, _)| *g == c.generation))
        });
        if skip {
            tracing::debug!(role = role.as_str(), "dashboard already loaded for this token");
            return Ok(());
        }

        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let ctx = LoadContext {
            role,
            token: token.to_string(),
            generation,
            loaded: false,
        };
        *self.context.borrow_mut() = Some(ctx.clone());
        *self.state.borrow_mut() = DashboardState::for_role(role);
        tracing::info!(role = role.as_str(), "loading dashboard");

        let course_chain = async {
            self.run(&ctx, ReloadScope::Courses, self.fetch_courses(&ctx))
                .await?;
            self.follow_course_change(&ctx).await
        };

        let independent = async {
            let scopes: &[ReloadScope] = match role {
                Role::Student => &[ReloadScope::Submissions, ReloadScope::Summary],
                Role::Teacher => &[ReloadScope::Upcoming],
            };
            let results = join_all(
                scopes
                    .iter()
                    .map(|&scope| self.run(&ctx, scope, self.fetch_scope(&ctx, scope))),
            )
            .await;
            for (scope, result) in scopes.iter().zip(results) {
                if let Err(e) = result {
                    tracing::warn!(scope = ?scope, error = %e, "dashboard section failed to load");
                }
            }
        };

        let (chain, ()) = futures::join!(course_chain, independent);
        match &chain {
            Ok(()) => {
                if let Some(c) = self
                    .context
                    .borrow_mut()
                    .as_mut()
                    .filter(|c| c.generation == generation)
                {
                    c.loaded = true;
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to load courses"),
        }
        chain
    }

    /// 重新加载某一范围
    ///
    /// 重新加载课程列表时，只有课程集合发生变化才会连带刷新课程资源（教师还有统计）。
    pub async fn reload(&self, scope: ReloadScope) -> ApiResult<()> {
        let ctx = self.context()?;
        match scope {
            ReloadScope::Courses => {
                let changed = self
                    .run(&ctx, scope, self.fetch_courses(&ctx))
                    .await?
                    .unwrap_or(false);
                if changed {
                    self.follow_course_change(&ctx).await?;
                }
                Ok(())
            }
            other => self
                .run(&ctx, other, self.fetch_scope(&ctx, other))
                .await
                .map(|_| ()),
        }
    }

    /// 打开单门课程的详情
    pub async fn select_course(&self, course_id: EntityId) -> ApiResult<()> {
        self.reload(ReloadScope::CourseDetail(course_id)).await
    }

    pub fn clear_selection(&self) {
        self.state.borrow_mut().selected = None;
    }

    /// 合并一次修改；需要重新拉取时只拉取对应范围
    ///
    /// 新加入的课程会补取它自己的作业 / 公告 / 资料；课程或作业增删后
    /// 刷新计数（学生概要或教师统计）。补取失败只记录日志，修改本身已成功。
    pub async fn apply(&self, change: StateChange) -> ApiResult<()> {
        let (new_course, counts_changed) = match &change {
            StateChange::Reload(scope) => return self.reload(*scope).await,
            StateChange::Course(Change::Created(c)) => {
                let is_new = self.with_state(|s| s.course(c.id).is_none());
                (is_new.then_some(c.id), is_new)
            }
            StateChange::Course(Change::Deleted(_))
            | StateChange::Assignment(Change::Created(_) | Change::Deleted(_)) => (None, true),
            _ => (None, false),
        };
        self.state.borrow_mut().apply(change);

        let Some(ctx) = self.context.borrow().clone() else {
            return Ok(());
        };
        if let Some(course_id) = new_course {
            self.fetch_resources_of(&ctx, course_id).await;
        }
        if counts_changed {
            let scope = match ctx.role {
                Role::Student => ReloadScope::Summary,
                Role::Teacher => ReloadScope::Stats,
            };
            if let Err(e) = self.run(&ctx, scope, self.fetch_scope(&ctx, scope)).await {
                tracing::warn!(scope = ?scope, error = %e, "counts refresh failed");
            }
        }
        Ok(())
    }

    /// 以范围为键去重执行；范围已在途时返回 `Ok(None)`
    async fn run<T>(
        &self,
        ctx: &LoadContext,
        scope: ReloadScope,
        fut: impl Future<Output = ApiResult<T>>,
    ) -> ApiResult<Option<T>> {
        let key = (ctx.generation, scope);
        if !self.in_flight.borrow_mut().insert(key) {
            tracing::debug!(scope = ?scope, "already in flight, skipping");
            return Ok(None);
        }
        let _guard = InFlightGuard {
            set: &self.in_flight,
            key,
        };
        fut.await.map(Some)
    }

    async fn follow_course_change(&self, ctx: &LoadContext) -> ApiResult<()> {
        self.run(
            ctx,
            ReloadScope::CourseResources,
            self.fetch_course_resources(ctx),
        )
        .await?;
        if ctx.role == Role::Teacher {
            self.run(ctx, ReloadScope::Stats, self.fetch_stats(ctx))
                .await?;
        }
        Ok(())
    }

    async fn fetch_scope(&self, ctx: &LoadContext, scope: ReloadScope) -> ApiResult<()> {
        match (scope, ctx.role) {
            (ReloadScope::Courses, _) => self.fetch_courses(ctx).await.map(|_| ()),
            (ReloadScope::CourseResources, _) => self.fetch_course_resources(ctx).await,
            (ReloadScope::CourseDetail(id), _) => self.fetch_course_detail(ctx, id).await,
            (ReloadScope::Submissions, Role::Student) => self.fetch_own_submissions(ctx).await,
            (ReloadScope::Summary, Role::Student) => self.fetch_summary(ctx).await,
            (ReloadScope::Stats, Role::Teacher) => self.fetch_stats(ctx).await,
            (ReloadScope::Upcoming, Role::Teacher) => self.fetch_upcoming(ctx).await,
            (scope, role) => {
                tracing::debug!(scope = ?scope, role = role.as_str(), "scope not used by role");
                Ok(())
            }
        }
    }

    // --- 单项请求 ---

    /// 列表请求，失败时记录日志并返回空列表
    async fn list_or_empty<R, T>(&self, ctx: &LoadContext, req: R) -> Vec<T>
    where
        R: ApiRequest<Response = ListOf<T>>,
    {
        match self.api.send(&req, Some(ctx.token.as_str())).await {
            Ok(list) => list.into_inner(),
            Err(e) => {
                tracing::warn!(path = %req.path(), error = %e, "fan-out request failed, using empty result");
                Vec::new()
            }
        }
    }

    /// 课程列表，返回课程集合是否变化
    async fn fetch_courses(&self, ctx: &LoadContext) -> ApiResult<bool> {
        let token = Some(ctx.token.as_str());
        let courses = match ctx.role {
            Role::Student => self.api.send(&ListEnrollments, token).await?,
            Role::Teacher => self.api.send(&ListTeacherClassrooms, token).await?,
        }
        .into_inner();

        let changed = self.commit(ctx, |s| {
            let before = s.course_ids();
            s.courses = courses;
            s.apply_course_counts();
            let after = s.course_ids();
            if s.selected.as_ref().is_some_and(|v| !after.contains(&v.course.id)) {
                s.selected = None;
            }
            before != after
        });
        Ok(changed.unwrap_or(false))
    }

    /// 按课程并发扇出作业 / 公告 / 资料，全部结束后一次写入
    async fn fetch_course_resources(&self, ctx: &LoadContext) -> ApiResult<()> {
        let course_ids: Vec<EntityId> = self.state.borrow().courses.iter().map(|c| c.id).collect();

        let per_course = join_all(course_ids.iter().map(|&id| async move {
            futures::join!(
                self.list_or_empty(ctx, ListClassroomAssignments(id)),
                self.list_or_empty(ctx, ListClassroomAnnouncements(id)),
                self.list_or_empty(ctx, ListClassroomMaterials(id)),
            )
        }))
        .await;

        let mut assignments = Vec::new();
        let mut announcements = Vec::new();
        let mut materials = Vec::new();
        for (a, n, m) in per_course {
            assignments.extend(a);
            announcements.extend(n);
            materials.extend(m);
        }
        sort_announcements(&mut announcements);

        self.commit(ctx, |s| {
            s.assignments = assignments;
            s.announcements = announcements;
            s.materials = materials;
        });
        Ok(())
    }

    /// 单门课程的资源，合并进已有列表
    async fn fetch_resources_of(&self, ctx: &LoadContext, course_id: EntityId) {
        let (assignments, announcements, materials) = futures::join!(
            self.list_or_empty(ctx, ListClassroomAssignments(course_id)),
            self.list_or_empty(ctx, ListClassroomAnnouncements(course_id)),
            self.list_or_empty(ctx, ListClassroomMaterials(course_id)),
        );
        self.commit(ctx, |s| {
            s.assignments.retain(|a| a.course_id != course_id);
            s.assignments.extend(assignments);
            s.announcements.retain(|a| a.course_id != course_id);
            s.announcements.extend(announcements);
            sort_announcements(&mut s.announcements);
            s.materials.retain(|m| m.course_id != course_id);
            s.materials.extend(materials);
        });
    }

    async fn fetch_own_submissions(&self, ctx: &LoadContext) -> ApiResult<()> {
        let submissions = self
            .api
            .send(&ListMySubmissions, Some(ctx.token.as_str()))
            .await?
            .into_inner();
        self.commit(ctx, |s| s.submissions = submissions);
        Ok(())
    }

    async fn fetch_summary(&self, ctx: &LoadContext) -> ApiResult<()> {
        let summary = self
            .api
            .send(&GetStudentDashboard, Some(ctx.token.as_str()))
            .await?;
        self.commit(ctx, |s| s.summary = Some(summary));
        Ok(())
    }

    async fn fetch_upcoming(&self, ctx: &LoadContext) -> ApiResult<()> {
        let upcoming = self
            .api
            .send(&ListUpcomingAssignments, Some(ctx.token.as_str()))
            .await?
            .into_inner();
        self.commit(ctx, |s| s.upcoming = upcoming);
        Ok(())
    }

    /// 课程详情：课程本身 + 每个作业的提交记录汇总
    async fn fetch_course_detail(&self, ctx: &LoadContext, course_id: EntityId) -> ApiResult<()> {
        let detail = self
            .api
            .send(&GetClassroom(course_id), Some(ctx.token.as_str()))
            .await?;

        let assignments = if detail.assignments.is_empty() {
            self.list_or_empty(ctx, ListClassroomAssignments(course_id))
                .await
        } else {
            detail.assignments
        };

        let submissions: Vec<Submission> = join_all(
            assignments
                .iter()
                .map(|a| self.list_or_empty(ctx, ListAssignmentSubmissions(a.id))),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        self.commit(ctx, |s| {
            s.selected = Some(CourseView {
                course: detail.course,
                assignments,
                submissions,
            });
        });
        Ok(())
    }

    /// 教师统计：`/stats` 与每个作业的统计并发获取
    ///
    /// 单个作业统计失败只记录日志；`/stats` 失败在写入作业统计后返回错误。
    async fn fetch_stats(&self, ctx: &LoadContext) -> ApiResult<()> {
        let assignment_ids: Vec<EntityId> =
            self.state.borrow().assignments.iter().map(|a| a.id).collect();

        let per_assignment = join_all(assignment_ids.iter().map(|&id| async move {
            let result = self
                .api
                .send(&GetAssignmentStatistics(id), Some(ctx.token.as_str()))
                .await;
            (id, result)
        }));
        let (overall, per_assignment) = futures::join!(
            self.api.send(&GetStats, Some(ctx.token.as_str())),
            per_assignment
        );

        let mut assignment_stats = HashMap::new();
        for (id, result) in per_assignment {
            match result {
                Ok(mut stats) => {
                    stats.assignment_id = id;
                    assignment_stats.insert(id, stats);
                }
                Err(e) => {
                    tracing::warn!(assignment_id = id, error = %e, "assignment statistics unavailable")
                }
            }
        }

        let (overall, result) = match overall {
            Ok(stats) => (Some(stats), Ok(())),
            Err(e) => (None, Err(e)),
        };
        self.commit(ctx, |s| {
            s.assignment_stats = assignment_stats;
            if let Some(stats) = overall {
                s.stats = Some(stats);
                s.apply_course_counts();
            }
        });
        result
    }
}
