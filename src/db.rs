use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument, warn};

use crate::auth::Role;
use crate::error::AppError;
use crate::models::{
    Assignment, Audience, DbAssignment, DbLesson, DbProgress, DbStudentIdentity, DbSubmission,
    Lesson, NewAssignment, Progress, ProgressStatus, StudentIdentity, Submission,
    SubmissionStatus,
};
use crate::progress::{ActivityStore, RosterIndex};

const ASSIGNMENT_COLUMNS: &str = "a.id, a.teacher_id, a.lesson_id, a.title, a.description, \
     a.audience, a.max_points, a.is_active, a.due_date";

const PROGRESS_SELECT: &str = "SELECT p.id, p.student_id, p.lesson_id, l.title AS lesson_title, \
     p.status, p.score, p.time_spent, p.completed_at, p.updated_at \
     FROM progress p LEFT JOIN lessons l ON l.id = p.lesson_id";

const SUBMISSION_SELECT: &str = "SELECT s.id, s.assignment_id, s.student_id, \
     a.title AS assignment_title, s.content, s.status, s.score, s.feedback, s.graded_by, \
     s.submitted_at, s.graded_at, s.updated_at \
     FROM submissions s LEFT JOIN assignments a ON a.id = s.assignment_id";

#[instrument(skip(pool))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    display_name: Option<&str>,
    role: Role,
) -> Result<i64, AppError> {
    info!("Creating user");
    let res = sqlx::query("INSERT INTO users (username, display_name, role) VALUES (?, ?, ?)")
        .bind(username)
        .bind(display_name)
        .bind(role.as_str())
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn find_student(
    pool: &Pool<Sqlite>,
    student_id: i64,
) -> Result<Option<StudentIdentity>, AppError> {
    info!("Fetching student by ID");
    let row = sqlx::query_as::<_, DbStudentIdentity>(
        "SELECT id, username, display_name FROM users WHERE id = ? AND role = 'student'",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(StudentIdentity::from))
}

#[instrument(skip(pool))]
pub async fn enroll_student(
    pool: &Pool<Sqlite>,
    teacher_id: i64,
    student_id: i64,
) -> Result<bool, AppError> {
    info!("Enrolling student with teacher");
    let res =
        sqlx::query("INSERT OR IGNORE INTO enrollments (teacher_id, student_id) VALUES (?, ?)")
            .bind(teacher_id)
            .bind(student_id)
            .execute(pool)
            .await?;

    Ok(res.rows_affected() > 0)
}

#[instrument(skip(pool))]
pub async fn unenroll_student(
    pool: &Pool<Sqlite>,
    teacher_id: i64,
    student_id: i64,
) -> Result<bool, AppError> {
    info!("Removing enrollment");
    let res = sqlx::query("DELETE FROM enrollments WHERE teacher_id = ? AND student_id = ?")
        .bind(teacher_id)
        .bind(student_id)
        .execute(pool)
        .await?;

    Ok(res.rows_affected() > 0)
}

#[instrument(skip(pool))]
pub async fn get_enrolled_students(
    pool: &Pool<Sqlite>,
    teacher_id: i64,
) -> Result<BTreeSet<i64>, AppError> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT student_id FROM enrollments WHERE teacher_id = ?")
            .bind(teacher_id)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[instrument(skip(pool))]
pub async fn get_enrolled_teachers(
    pool: &Pool<Sqlite>,
    student_id: i64,
) -> Result<BTreeSet<i64>, AppError> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT teacher_id FROM enrollments WHERE student_id = ?")
            .bind(student_id)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[instrument(skip(pool))]
pub async fn is_enrolled(
    pool: &Pool<Sqlite>,
    teacher_id: i64,
    student_id: i64,
) -> Result<bool, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM enrollments WHERE teacher_id = ? AND student_id = ?")
            .bind(teacher_id)
            .bind(student_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

#[instrument(skip(pool))]
pub async fn link_guardian(
    pool: &Pool<Sqlite>,
    parent_id: i64,
    student_id: i64,
) -> Result<(), AppError> {
    info!("Linking guardian to student");
    sqlx::query("INSERT OR IGNORE INTO guardians (parent_id, student_id) VALUES (?, ?)")
        .bind(parent_id)
        .bind(student_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_guardian_children(
    pool: &Pool<Sqlite>,
    parent_id: i64,
) -> Result<Vec<i64>, AppError> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT student_id FROM guardians WHERE parent_id = ? ORDER BY student_id")
            .bind(parent_id)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[instrument(skip(pool))]
pub async fn is_guardian_of(
    pool: &Pool<Sqlite>,
    parent_id: i64,
    student_id: i64,
) -> Result<bool, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM guardians WHERE parent_id = ? AND student_id = ?")
            .bind(parent_id)
            .bind(student_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

#[instrument(skip(pool))]
pub async fn create_lesson(
    pool: &Pool<Sqlite>,
    teacher_id: i64,
    title: &str,
) -> Result<i64, AppError> {
    info!("Creating lesson");
    let res = sqlx::query("INSERT INTO lessons (teacher_id, title) VALUES (?, ?)")
        .bind(teacher_id)
        .bind(title)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn set_lesson_active(
    pool: &Pool<Sqlite>,
    lesson_id: i64,
    active: bool,
) -> Result<(), AppError> {
    info!("Toggling lesson active flag");
    sqlx::query("UPDATE lessons SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(lesson_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_lesson(pool: &Pool<Sqlite>, lesson_id: i64) -> Result<Lesson, AppError> {
    let row = sqlx::query_as::<_, DbLesson>(
        "SELECT id, teacher_id, title, is_active FROM lessons WHERE id = ?",
    )
    .bind(lesson_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(lesson) => Ok(Lesson::from(lesson)),
        None => Err(AppError::NotFound(format!(
            "Lesson with id {} not found in database",
            lesson_id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn count_active_lessons(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM lessons WHERE is_active = 1")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

async fn write_audience(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    assignment_id: i64,
    audience: &Audience,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM assignment_students WHERE assignment_id = ?")
        .bind(assignment_id)
        .execute(&mut **tx)
        .await?;

    if let Audience::Specific(ids) = audience {
        for (position, student_id) in ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO assignment_students (assignment_id, student_id, position) \
                 VALUES (?, ?, ?)",
            )
            .bind(assignment_id)
            .bind(student_id)
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
        }
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn create_assignment(
    pool: &Pool<Sqlite>,
    assignment: &NewAssignment,
) -> Result<i64, AppError> {
    let audience = assignment.audience.normalized();
    info!(audience = audience.kind(), "Creating assignment");
    if !(assignment.max_points > 0.0) {
        return Err(AppError::Validation(format!(
            "maxPoints must be positive, got {}",
            assignment.max_points
        )));
    }

    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "INSERT INTO assignments (teacher_id, lesson_id, title, description, audience, max_points, due_date)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(assignment.teacher_id)
    .bind(assignment.lesson_id)
    .bind(&assignment.title)
    .bind(&assignment.description)
    .bind(audience.kind())
    .bind(assignment.max_points)
    .bind(assignment.due_date.map(|d| d.naive_utc()))
    .execute(&mut *tx)
    .await?;

    let assignment_id = res.last_insert_rowid();
    write_audience(&mut tx, assignment_id, &audience).await?;

    tx.commit().await?;

    Ok(assignment_id)
}

#[instrument(skip(pool))]
pub async fn update_assignment_audience(
    pool: &Pool<Sqlite>,
    assignment_id: i64,
    audience: &Audience,
) -> Result<(), AppError> {
    let audience = &audience.normalized();
    info!(audience = audience.kind(), "Updating assignment audience");
    let mut tx = pool.begin().await?;

    let res = sqlx::query("UPDATE assignments SET audience = ?, updated_at = ? WHERE id = ?")
        .bind(audience.kind())
        .bind(Utc::now().naive_utc())
        .bind(assignment_id)
        .execute(&mut *tx)
        .await?;

    if res.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound(format!(
            "Assignment with id {} not found in database",
            assignment_id
        )));
    }

    write_audience(&mut tx, assignment_id, audience).await?;
    tx.commit().await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn set_assignment_active(
    pool: &Pool<Sqlite>,
    assignment_id: i64,
    active: bool,
) -> Result<(), AppError> {
    info!("Toggling assignment active flag");
    sqlx::query("UPDATE assignments SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(Utc::now().naive_utc())
        .bind(assignment_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Bound ids per audience lookup, kept well under SQLite's host parameter limit.
pub(crate) const AUDIENCE_LOOKUP_CHUNK: usize = 500;

/// Loads explicit audience rows for the `specific` assignments among `rows`
/// and converts them. Rows that cannot be converted are skipped.
async fn attach_audiences(
    pool: &Pool<Sqlite>,
    rows: Vec<DbAssignment>,
) -> Result<Vec<Assignment>, AppError> {
    let specific_ids: Vec<i64> = rows
        .iter()
        .filter(|r| r.audience.as_deref() == Some("specific"))
        .filter_map(|r| r.id)
        .collect();

    let mut audiences: HashMap<i64, Vec<i64>> = HashMap::new();

    for chunk in specific_ids.chunks(AUDIENCE_LOOKUP_CHUNK) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT assignment_id, student_id FROM assignment_students WHERE assignment_id IN (",
        );
        let mut separated = qb.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY assignment_id, position");

        let audience_rows: Vec<(i64, i64)> = qb.build_query_as().fetch_all(pool).await?;
        for (assignment_id, student_id) in audience_rows {
            audiences.entry(assignment_id).or_default().push(student_id);
        }
    }

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let assigned = row
                .id
                .and_then(|id| audiences.remove(&id))
                .unwrap_or_default();
            match row.into_assignment(assigned) {
                Ok(assignment) => Some(assignment),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable assignment row");
                    None
                }
            }
        })
        .collect())
}

async fn fetch_assignments(
    pool: &Pool<Sqlite>,
    sql: &str,
    bind: Option<i64>,
) -> Result<Vec<Assignment>, AppError> {
    let mut query = sqlx::query_as::<_, DbAssignment>(sql);
    if let Some(value) = bind {
        query = query.bind(value);
    }
    let rows = query.fetch_all(pool).await?;

    attach_audiences(pool, rows).await
}

#[instrument(skip(pool))]
pub async fn get_assignment(
    pool: &Pool<Sqlite>,
    assignment_id: i64,
) -> Result<Assignment, AppError> {
    let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments a WHERE a.id = ?");
    let mut assignments = fetch_assignments(pool, &sql, Some(assignment_id)).await?;

    match assignments.pop() {
        Some(assignment) => Ok(assignment),
        None => Err(AppError::NotFound(format!(
            "Assignment with id {} not found in database",
            assignment_id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn get_active_assignments(pool: &Pool<Sqlite>) -> Result<Vec<Assignment>, AppError> {
    info!("Getting active assignments");
    let sql = format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a WHERE a.is_active = 1 ORDER BY a.due_date, a.id"
    );
    fetch_assignments(pool, &sql, None).await
}

#[instrument(skip(pool))]
pub async fn get_assignments_by_teacher(
    pool: &Pool<Sqlite>,
    teacher_id: i64,
) -> Result<Vec<Assignment>, AppError> {
    info!("Getting assignments for teacher");
    let sql = format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a WHERE a.teacher_id = ? ORDER BY a.due_date, a.id"
    );
    fetch_assignments(pool, &sql, Some(teacher_id)).await
}

/// Every assignment, active or not, that the student has a submission for.
#[instrument(skip(pool))]
pub async fn get_submission_parents(
    pool: &Pool<Sqlite>,
    student_id: i64,
) -> Result<Vec<Assignment>, AppError> {
    let sql = format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a
         WHERE a.id IN (SELECT assignment_id FROM submissions WHERE student_id = ?)"
    );
    fetch_assignments(pool, &sql, Some(student_id)).await
}

fn readable_progress(rows: Vec<DbProgress>) -> Vec<Progress> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match Progress::try_from(row) {
                Ok(progress) => Some(progress),
                Err(e) => {
                    warn!(progress_id = ?id, error = %e, "Skipping unreadable progress row");
                    None
                }
            }
        })
        .collect()
}

fn readable_submissions(rows: Vec<DbSubmission>) -> Vec<Submission> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match Submission::try_from(row) {
                Ok(submission) => Some(submission),
                Err(e) => {
                    warn!(submission_id = ?id, error = %e, "Skipping unreadable submission row");
                    None
                }
            }
        })
        .collect()
}

#[instrument(skip(pool))]
pub async fn get_progress_for_student(
    pool: &Pool<Sqlite>,
    student_id: i64,
) -> Result<Vec<Progress>, AppError> {
    info!("Getting lesson progress for student");
    let sql = format!("{PROGRESS_SELECT} WHERE p.student_id = ? ORDER BY p.id");
    let rows = sqlx::query_as::<_, DbProgress>(&sql)
        .bind(student_id)
        .fetch_all(pool)
        .await?;

    Ok(readable_progress(rows))
}

#[instrument(skip(pool))]
pub async fn get_progress(
    pool: &Pool<Sqlite>,
    student_id: i64,
    lesson_id: i64,
) -> Result<Progress, AppError> {
    let sql = format!("{PROGRESS_SELECT} WHERE p.student_id = ? AND p.lesson_id = ?");
    let row = sqlx::query_as::<_, DbProgress>(&sql)
        .bind(student_id)
        .bind(lesson_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Progress::try_from(row),
        None => Err(AppError::NotFound(format!(
            "No progress for student {} on lesson {}",
            student_id, lesson_id
        ))),
    }
}

/// Creates the progress row if absent and moves it out of `not_started`.
#[instrument(skip(pool))]
pub async fn ensure_progress_started(
    pool: &Pool<Sqlite>,
    student_id: i64,
    lesson_id: i64,
) -> Result<(), AppError> {
    info!("Starting lesson progress");
    let now = Utc::now().naive_utc();

    sqlx::query(
        "INSERT INTO progress (student_id, lesson_id, status, created_at, updated_at)
         VALUES (?, ?, 'in_progress', ?, ?)
         ON CONFLICT (student_id, lesson_id) DO NOTHING",
    )
    .bind(student_id)
    .bind(lesson_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query(
        "UPDATE progress SET status = 'in_progress', updated_at = ?
         WHERE student_id = ? AND lesson_id = ? AND status = 'not_started'",
    )
    .bind(now)
    .bind(student_id)
    .bind(lesson_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Applies one activity record in a single statement. SQLite evaluates every
/// SET expression against the old row, so `completed_at` is stamped only when
/// the previous status was not already `completed`.
#[instrument(skip(pool))]
pub async fn apply_progress_activity(
    pool: &Pool<Sqlite>,
    progress_id: i64,
    status: ProgressStatus,
    score: Option<f64>,
    minutes: i64,
) -> Result<(), AppError> {
    info!("Recording lesson activity");
    let now = Utc::now().naive_utc();

    sqlx::query(
        "UPDATE progress
         SET status = ?,
             score = COALESCE(?, score),
             time_spent = time_spent + ?,
             completed_at = CASE
                 WHEN ? = 'completed' AND status != 'completed' THEN ?
                 ELSE completed_at
             END,
             updated_at = ?
         WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(score)
    .bind(minutes)
    .bind(status.as_str())
    .bind(now)
    .bind(now)
    .bind(progress_id)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool, content))]
pub async fn insert_submission(
    pool: &Pool<Sqlite>,
    assignment_id: i64,
    student_id: i64,
    content: &str,
    status: SubmissionStatus,
) -> Result<i64, AppError> {
    info!(status = %status, "Creating submission");
    let now = Utc::now().naive_utc();
    let submitted_at = (status == SubmissionStatus::Submitted).then_some(now);

    let res = sqlx::query(
        "INSERT INTO submissions (assignment_id, student_id, content, status, submitted_at, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(assignment_id)
    .bind(student_id)
    .bind(content)
    .bind(status.as_str())
    .bind(submitted_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn get_submission(
    pool: &Pool<Sqlite>,
    submission_id: i64,
) -> Result<Submission, AppError> {
    let sql = format!("{SUBMISSION_SELECT} WHERE s.id = ?");
    let row = sqlx::query_as::<_, DbSubmission>(&sql)
        .bind(submission_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Submission::try_from(row),
        None => Err(AppError::NotFound(format!(
            "Submission with id {} not found in database",
            submission_id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn get_submissions_for_student(
    pool: &Pool<Sqlite>,
    student_id: i64,
) -> Result<Vec<Submission>, AppError> {
    info!("Getting submissions for student");
    let sql = format!("{SUBMISSION_SELECT} WHERE s.student_id = ? ORDER BY s.id");
    let rows = sqlx::query_as::<_, DbSubmission>(&sql)
        .bind(student_id)
        .fetch_all(pool)
        .await?;

    Ok(readable_submissions(rows))
}

#[instrument(skip(pool))]
pub async fn get_submissions_for_assignment(
    pool: &Pool<Sqlite>,
    assignment_id: i64,
) -> Result<Vec<Submission>, AppError> {
    info!("Getting submissions for assignment");
    let sql = format!("{SUBMISSION_SELECT} WHERE s.assignment_id = ? ORDER BY s.id");
    let rows = sqlx::query_as::<_, DbSubmission>(&sql)
        .bind(assignment_id)
        .fetch_all(pool)
        .await?;

    Ok(readable_submissions(rows))
}

/// Student edit. Only touches rows still in `draft` or `submitted`; returns
/// whether a row was changed.
#[instrument(skip(pool, content))]
pub async fn update_submission_content(
    pool: &Pool<Sqlite>,
    submission_id: i64,
    content: &str,
    status: SubmissionStatus,
) -> Result<bool, AppError> {
    info!(status = %status, "Updating submission content");
    let now = Utc::now().naive_utc();

    let res = sqlx::query(
        "UPDATE submissions
         SET content = ?,
             status = ?,
             submitted_at = CASE WHEN ? = 'submitted' THEN ? ELSE submitted_at END,
             updated_at = ?
         WHERE id = ? AND status IN ('draft', 'submitted')",
    )
    .bind(content)
    .bind(status.as_str())
    .bind(status.as_str())
    .bind(now)
    .bind(now)
    .bind(submission_id)
    .execute(pool)
    .await?;

    Ok(res.rows_affected() > 0)
}

/// Which prior statuses a grading write may start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeFrom {
    Submitted,
    GradedOrReturned,
}

impl GradeFrom {
    fn predicate(&self) -> &'static str {
        match self {
            GradeFrom::Submitted => "status = 'submitted'",
            GradeFrom::GradedOrReturned => "status IN ('graded', 'returned')",
        }
    }
}

/// Single-row conditional grade. The score bound is re-checked against the
/// parent assignment inside the statement; returns whether a row was changed.
#[instrument(skip(pool, feedback))]
pub async fn grade_submission_row(
    pool: &Pool<Sqlite>,
    submission_id: i64,
    score: f64,
    feedback: Option<&str>,
    graded_by: i64,
    from: GradeFrom,
) -> Result<bool, AppError> {
    info!(from = ?from, "Writing submission grade");
    let now = Utc::now().naive_utc();

    let sql = format!(
        "UPDATE submissions
         SET status = 'graded', score = ?, feedback = ?, graded_by = ?, graded_at = ?, updated_at = ?
         WHERE id = ? AND {}
           AND ? >= 0
           AND ? <= (SELECT max_points FROM assignments WHERE assignments.id = submissions.assignment_id)",
        from.predicate()
    );

    let res = sqlx::query(&sql)
        .bind(score)
        .bind(feedback)
        .bind(graded_by)
        .bind(now)
        .bind(now)
        .bind(submission_id)
        .bind(score)
        .bind(score)
        .execute(pool)
        .await?;

    Ok(res.rows_affected() > 0)
}

#[instrument(skip(pool))]
pub async fn return_submission_row(
    pool: &Pool<Sqlite>,
    submission_id: i64,
) -> Result<bool, AppError> {
    info!("Returning graded submission");
    let res = sqlx::query(
        "UPDATE submissions SET status = 'returned', updated_at = ? WHERE id = ? AND status = 'graded'",
    )
    .bind(Utc::now().naive_utc())
    .bind(submission_id)
    .execute(pool)
    .await?;

    Ok(res.rows_affected() > 0)
}

/// SQLite-backed implementation of the engine's read interfaces.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[rocket::async_trait]
impl RosterIndex for SqliteStore {
    async fn enrolled_students(&self, teacher_id: i64) -> Result<BTreeSet<i64>, AppError> {
        get_enrolled_students(&self.pool, teacher_id).await
    }

    async fn enrolled_teachers(&self, student_id: i64) -> Result<BTreeSet<i64>, AppError> {
        get_enrolled_teachers(&self.pool, student_id).await
    }

    async fn is_enrolled(&self, teacher_id: i64, student_id: i64) -> Result<bool, AppError> {
        is_enrolled(&self.pool, teacher_id, student_id).await
    }
}

#[rocket::async_trait]
impl ActivityStore for SqliteStore {
    async fn find_student(&self, student_id: i64) -> Result<Option<StudentIdentity>, AppError> {
        find_student(&self.pool, student_id).await
    }

    async fn progress_for_student(&self, student_id: i64) -> Result<Vec<Progress>, AppError> {
        get_progress_for_student(&self.pool, student_id).await
    }

    async fn count_active_lessons(&self) -> Result<i64, AppError> {
        count_active_lessons(&self.pool).await
    }

    async fn submissions_for_student(&self, student_id: i64) -> Result<Vec<Submission>, AppError> {
        get_submissions_for_student(&self.pool, student_id).await
    }

    async fn submission_parents(&self, student_id: i64) -> Result<Vec<Assignment>, AppError> {
        get_submission_parents(&self.pool, student_id).await
    }

    async fn active_assignments(&self) -> Result<Vec<Assignment>, AppError> {
        get_active_assignments(&self.pool).await
    }

    async fn find_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>, AppError> {
        match get_assignment(&self.pool, assignment_id).await {
            Ok(assignment) => Ok(Some(assignment)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn submissions_for_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<Submission>, AppError> {
        get_submissions_for_assignment(&self.pool, assignment_id).await
    }
}
