use chrono::{DateTime, Utc};
use rocket::State;
use rocket::http::Status;
use rocket::serde::{Deserialize, Serialize, json::Json};
use validator::Validate;

use crate::access::{ensure_can_view_student, ensure_owns_assignment};
use crate::auth::{Permission, Principal, Role};
use crate::db::{self, SqliteStore};
use crate::error::AppError;
use crate::models::{Assignment, Audience, NewAssignment, Progress, ProgressStatus, Submission};
use crate::progress::lessons::{self, LessonActivity};
use crate::progress::submissions;
use crate::progress::{
    AssignmentStatistics, AssignmentView, DetailedProgress, ProgressService, StudentAssignment,
    StudentProgress, StudentProgressEntry,
};
use crate::validation::{ApiError, AppErrorExt, JsonValidateExt};

pub type Engine = ProgressService<SqliteStore>;

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

#[get("/progress/student/<id>")]
pub async fn api_get_student_progress(
    id: i64,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<StudentProgress>, Status> {
    engine.ensure_students_exist(&[id]).await?;
    ensure_can_view_student(engine.store(), &principal, id).await?;

    let progress = engine.get_student_progress(id).await?;

    Ok(Json(progress))
}

#[get("/progress/student/<id>/detailed")]
pub async fn api_get_detailed_progress(
    id: i64,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<DetailedProgress>, Status> {
    engine.ensure_students_exist(&[id]).await?;
    ensure_can_view_student(engine.store(), &principal, id).await?;

    let progress = engine.get_detailed_progress(id).await?;

    Ok(Json(progress))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentsProgressRequest {
    #[validate(length(min = 1, max = 200, message = "Provide between 1 and 200 student ids"))]
    student_ids: Vec<i64>,
}

#[post("/progress/students", data = "<request>")]
pub async fn api_get_students_progress(
    request: Json<StudentsProgressRequest>,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Vec<StudentProgressEntry>>, ApiError> {
    let request = request.validate_custom()?;

    engine
        .ensure_students_exist(&request.student_ids)
        .await
        .validate_custom()?;

    for &student_id in &request.student_ids {
        ensure_can_view_student(engine.store(), &principal, student_id)
            .await
            .validate_custom()?;
    }

    let entries = engine
        .get_multiple_students_progress(&request.student_ids)
        .await
        .validate_custom()?;

    Ok(Json(entries))
}

#[get("/teacher/students/progress")]
pub async fn api_get_teacher_students_progress(
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Vec<StudentProgressEntry>>, Status> {
    principal.require_permission(Permission::ViewEnrolledStudents)?;

    let student_ids: Vec<i64> = db::get_enrolled_students(engine.store().pool(), principal.id)
        .await?
        .into_iter()
        .collect();

    let entries = engine.get_multiple_students_progress(&student_ids).await?;

    Ok(Json(entries))
}

#[get("/parent/children/progress")]
pub async fn api_get_children_progress(
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Vec<StudentProgressEntry>>, Status> {
    principal.require_permission(Permission::ViewChildProgress)?;

    let children = db::get_guardian_children(engine.store().pool(), principal.id).await?;
    let entries = engine.get_multiple_students_progress(&children).await?;

    Ok(Json(entries))
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum AssignmentListing {
    Student(Vec<StudentAssignment>),
    Teacher(Vec<AssignmentView>),
}

async fn view_with_total(
    engine: &Engine,
    assignment: &Assignment,
) -> Result<AssignmentView, AppError> {
    let mut view = AssignmentView::from(assignment);
    view.total_assigned = Some(engine.resolver().total_assigned(assignment).await? as i64);
    Ok(view)
}

/// Students get their in-scope assignments with their own submission;
/// teachers get the assignments they own with `totalAssigned`.
#[get("/assignments")]
pub async fn api_get_assignments(
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<AssignmentListing>, Status> {
    if principal.role == Role::Student {
        let assignments = engine.student_assignments(principal.id).await?;
        return Ok(Json(AssignmentListing::Student(assignments)));
    }

    principal.require_permission(Permission::ManageAssignments)?;

    let owned = db::get_assignments_by_teacher(engine.store().pool(), principal.id).await?;
    let mut views = Vec::with_capacity(owned.len());
    for assignment in &owned {
        views.push(view_with_total(engine, assignment).await?);
    }

    Ok(Json(AssignmentListing::Teacher(views)))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    title: String,
    #[serde(default)]
    description: String,
    lesson_id: Option<i64>,
    /// Empty means every student enrolled with the teacher.
    #[serde(default)]
    assigned_to: Vec<i64>,
    #[validate(range(exclusive_min = 0.0, message = "maxPoints must be greater than 0"))]
    max_points: f64,
    due_date: Option<DateTime<Utc>>,
}

#[post("/assignments", data = "<request>")]
pub async fn api_create_assignment(
    request: Json<CreateAssignmentRequest>,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<AssignmentView>, ApiError> {
    principal
        .require_permission(Permission::ManageAssignments)
        .validate_custom()?;
    let request = request.validate_custom()?;
    let pool = engine.store().pool();

    if let Some(lesson_id) = request.lesson_id {
        db::get_lesson(pool, lesson_id).await.validate_custom()?;
    }

    let new_assignment = NewAssignment {
        teacher_id: principal.id,
        lesson_id: request.lesson_id,
        title: request.title,
        description: request.description,
        audience: Audience::from_assigned_to(&request.assigned_to),
        max_points: request.max_points,
        due_date: request.due_date,
    };

    let assignment_id = db::create_assignment(pool, &new_assignment)
        .await
        .validate_custom()?;
    let assignment = db::get_assignment(pool, assignment_id)
        .await
        .validate_custom()?;

    let view = view_with_total(engine, &assignment)
        .await
        .validate_custom()?;

    Ok(Json(view))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AudienceRequest {
    #[serde(default)]
    assigned_to: Vec<i64>,
}

#[put("/assignments/<id>/audience", data = "<request>")]
pub async fn api_update_audience(
    id: i64,
    request: Json<AudienceRequest>,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<AssignmentView>, ApiError> {
    let request = request.validate_custom()?;
    let pool = engine.store().pool();

    let assignment = db::get_assignment(pool, id).await.validate_custom()?;
    ensure_owns_assignment(&principal, &assignment).validate_custom()?;

    db::update_assignment_audience(pool, id, &Audience::from_assigned_to(&request.assigned_to))
        .await
        .validate_custom()?;

    let updated = db::get_assignment(pool, id).await.validate_custom()?;
    let view = view_with_total(engine, &updated).await.validate_custom()?;

    Ok(Json(view))
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterResponse {
    pub assignment_id: i64,
    pub student_ids: Vec<i64>,
    pub total_assigned: i64,
}

#[get("/assignments/<id>/roster")]
pub async fn api_get_assignment_roster(
    id: i64,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<RosterResponse>, Status> {
    let assignment = db::get_assignment(engine.store().pool(), id).await?;
    ensure_owns_assignment(&principal, &assignment)?;

    let student_ids = engine.assignment_roster(id).await?;

    Ok(Json(RosterResponse {
        assignment_id: id,
        total_assigned: student_ids.len() as i64,
        student_ids,
    }))
}

#[get("/assignments/<id>/stats")]
pub async fn api_get_assignment_stats(
    id: i64,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<AssignmentStatistics>, Status> {
    let assignment = db::get_assignment(engine.store().pool(), id).await?;
    ensure_owns_assignment(&principal, &assignment)?;

    Ok(Json(engine.assignment_statistics(id).await?))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[validate(length(max = 100000, message = "Content is too long"))]
    content: String,
    #[serde(default)]
    submit: bool,
}

#[post("/assignments/<id>/submissions", data = "<request>")]
pub async fn api_create_submission(
    id: i64,
    request: Json<SubmissionRequest>,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Submission>, ApiError> {
    principal
        .require_permission(Permission::SubmitAssignments)
        .validate_custom()?;
    let request = request.validate_custom()?;

    let submission = submissions::create_submission(
        engine.store(),
        principal.id,
        id,
        &request.content,
        request.submit,
    )
    .await
    .validate_custom()?;

    Ok(Json(submission))
}

#[put("/submissions/<id>", data = "<request>")]
pub async fn api_update_submission(
    id: i64,
    request: Json<SubmissionRequest>,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Submission>, ApiError> {
    principal
        .require_permission(Permission::SubmitAssignments)
        .validate_custom()?;
    let request = request.validate_custom()?;

    let submission = submissions::edit_submission(
        engine.store(),
        principal.id,
        id,
        &request.content,
        request.submit,
    )
    .await
    .validate_custom()?;

    Ok(Json(submission))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    score: f64,
    #[validate(length(max = 10000, message = "Feedback is too long"))]
    feedback: Option<String>,
}

/// Loads the submission's assignment and checks the grader owns it.
async fn authorize_grader(
    engine: &Engine,
    principal: &Principal,
    submission_id: i64,
) -> Result<(), ApiError> {
    principal
        .require_permission(Permission::GradeSubmissions)
        .validate_custom()?;

    let pool = engine.store().pool();
    let submission = db::get_submission(pool, submission_id)
        .await
        .validate_custom()?;
    let assignment = db::get_assignment(pool, submission.assignment_id)
        .await
        .validate_custom()?;

    ensure_owns_assignment(principal, &assignment).validate_custom()
}

#[post("/submissions/<id>/grade", data = "<request>")]
pub async fn api_grade_submission(
    id: i64,
    request: Json<GradeRequest>,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Submission>, ApiError> {
    let request = request.validate_custom()?;
    authorize_grader(engine, &principal, id).await?;

    let submission = submissions::grade_submission(
        engine.store(),
        principal.id,
        id,
        request.score,
        request.feedback.as_deref(),
    )
    .await
    .validate_custom()?;

    Ok(Json(submission))
}

#[post("/submissions/<id>/regrade", data = "<request>")]
pub async fn api_regrade_submission(
    id: i64,
    request: Json<GradeRequest>,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Submission>, ApiError> {
    let request = request.validate_custom()?;
    authorize_grader(engine, &principal, id).await?;

    let submission = submissions::regrade_submission(
        engine.store(),
        principal.id,
        id,
        request.score,
        request.feedback.as_deref(),
    )
    .await
    .validate_custom()?;

    Ok(Json(submission))
}

#[post("/submissions/<id>/return")]
pub async fn api_return_submission(
    id: i64,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Submission>, ApiError> {
    authorize_grader(engine, &principal, id).await?;

    let submission = submissions::return_submission(engine.store(), id)
        .await
        .validate_custom()?;

    Ok(Json(submission))
}

#[post("/lessons/<id>/start")]
pub async fn api_start_lesson(
    id: i64,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Progress>, Status> {
    principal.require_permission(Permission::RecordOwnProgress)?;

    let progress = lessons::start_lesson(engine.store().pool(), principal.id, id).await?;

    Ok(Json(progress))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LessonActivityRequest {
    #[validate(range(min = 0, message = "minutes must not be negative"))]
    #[serde(default)]
    minutes: i64,
    status: Option<ProgressStatus>,
    #[validate(range(min = 0.0, max = 100.0, message = "score must be between 0 and 100"))]
    score: Option<f64>,
}

#[put("/lessons/<id>/progress", data = "<request>")]
pub async fn api_record_lesson_activity(
    id: i64,
    request: Json<LessonActivityRequest>,
    principal: Principal,
    engine: &State<Engine>,
) -> Result<Json<Progress>, ApiError> {
    principal
        .require_permission(Permission::RecordOwnProgress)
        .validate_custom()?;
    let request = request.validate_custom()?;

    let activity = LessonActivity {
        minutes: request.minutes,
        status: request.status,
        score: request.score,
    };

    let progress =
        lessons::record_lesson_activity(engine.store().pool(), principal.id, id, activity)
            .await
            .validate_custom()?;

    Ok(Json(progress))
}
