use tracing::{info, instrument, warn};

use crate::db::{self, GradeFrom, SqliteStore};
use crate::error::AppError;
use crate::models::{Assignment, Submission, SubmissionStatus};

use super::AudienceResolver;

/// Rejects scores outside `[0, max_points]` before anything is written.
pub fn validate_score(score: f64, max_points: f64) -> Result<(), AppError> {
    if score.is_finite() && score >= 0.0 && score <= max_points {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Score {} is outside the allowed range 0..={}",
            score, max_points
        )))
    }
}

async fn active_assignment(store: &SqliteStore, assignment_id: i64) -> Result<Assignment, AppError> {
    let assignment = db::get_assignment(store.pool(), assignment_id).await?;
    if !assignment.is_active {
        return Err(AppError::NotFound(format!(
            "Assignment with id {} is no longer active",
            assignment_id
        )));
    }
    Ok(assignment)
}

/// Creates the student's single submission for an assignment. A second
/// attempt, concurrent or not, is rejected by the storage unique constraint
/// and surfaces as `Conflict`.
#[instrument(skip(store, content))]
pub async fn create_submission(
    store: &SqliteStore,
    student_id: i64,
    assignment_id: i64,
    content: &str,
    submit: bool,
) -> Result<Submission, AppError> {
    let assignment = active_assignment(store, assignment_id).await?;

    if !AudienceResolver::new(store)
        .is_in_scope(&assignment, student_id)
        .await?
    {
        return Err(AppError::Authorization(format!(
            "Assignment {} is not assigned to student {}",
            assignment_id, student_id
        )));
    }

    let status = if submit {
        SubmissionStatus::Submitted
    } else {
        SubmissionStatus::Draft
    };

    let submission_id =
        db::insert_submission(store.pool(), assignment_id, student_id, content, status)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AppError::Conflict(format!(
                    "Student {} already has a submission for assignment {}",
                    student_id, assignment_id
                )),
                other => other,
            })?;

    info!(submission_id, "Submission created");
    db::get_submission(store.pool(), submission_id).await
}

/// Student edit of their own submission. Content freezes once graded.
#[instrument(skip(store, content))]
pub async fn edit_submission(
    store: &SqliteStore,
    student_id: i64,
    submission_id: i64,
    content: &str,
    submit: bool,
) -> Result<Submission, AppError> {
    let submission = db::get_submission(store.pool(), submission_id).await?;

    if submission.student_id != student_id {
        return Err(AppError::Authorization(format!(
            "Submission {} does not belong to student {}",
            submission_id, student_id
        )));
    }

    active_assignment(store, submission.assignment_id).await?;

    if !submission.status.is_editable() {
        return Err(AppError::Validation(format!(
            "Submission {} is {} and can no longer be edited",
            submission_id, submission.status
        )));
    }

    let next = if submit {
        SubmissionStatus::Submitted
    } else {
        submission.status
    };

    if !submission.status.can_transition_to(next) {
        return Err(AppError::Validation(format!(
            "Cannot move submission from {} to {}",
            submission.status, next
        )));
    }

    if !db::update_submission_content(store.pool(), submission_id, content, next).await? {
        warn!(submission_id, "Submission was graded before the edit landed");
        return Err(AppError::Validation(format!(
            "Submission {} can no longer be edited",
            submission_id
        )));
    }

    db::get_submission(store.pool(), submission_id).await
}

/// Grades a submitted submission. Repeating an identical grade is a no-op
/// success, so callers may retry freely; changing an existing grade needs
/// `regrade_submission`.
#[instrument(skip(store, feedback))]
pub async fn grade_submission(
    store: &SqliteStore,
    grader_id: i64,
    submission_id: i64,
    score: f64,
    feedback: Option<&str>,
) -> Result<Submission, AppError> {
    let submission = db::get_submission(store.pool(), submission_id).await?;
    let assignment = db::get_assignment(store.pool(), submission.assignment_id).await?;

    validate_score(score, assignment.max_points)?;

    let is_repeat = |s: &Submission| {
        s.status == SubmissionStatus::Graded
            && s.score == Some(score)
            && (feedback.is_none() || s.feedback.as_deref() == feedback)
    };

    match submission.status {
        SubmissionStatus::Submitted => {}
        _ if is_repeat(&submission) => {
            info!(submission_id, "Identical grade already recorded");
            return Ok(submission);
        }
        SubmissionStatus::Draft => {
            return Err(AppError::Validation(format!(
                "Submission {} has not been submitted yet",
                submission_id
            )));
        }
        SubmissionStatus::Graded | SubmissionStatus::Returned => {
            return Err(AppError::Validation(format!(
                "Submission {} is already {}; use regrade to change the score",
                submission_id, submission.status
            )));
        }
    }

    let written = db::grade_submission_row(
        store.pool(),
        submission_id,
        score,
        feedback,
        grader_id,
        GradeFrom::Submitted,
    )
    .await?;

    let current = db::get_submission(store.pool(), submission_id).await?;

    if written || is_repeat(&current) {
        Ok(current)
    } else {
        Err(AppError::Conflict(format!(
            "Submission {} changed while grading; now {}",
            submission_id, current.status
        )))
    }
}

/// Explicit re-grade path for graded or returned submissions.
#[instrument(skip(store, feedback))]
pub async fn regrade_submission(
    store: &SqliteStore,
    grader_id: i64,
    submission_id: i64,
    score: f64,
    feedback: Option<&str>,
) -> Result<Submission, AppError> {
    let submission = db::get_submission(store.pool(), submission_id).await?;
    let assignment = db::get_assignment(store.pool(), submission.assignment_id).await?;

    validate_score(score, assignment.max_points)?;

    if !submission.status.can_regrade() {
        return Err(AppError::Validation(format!(
            "Submission {} is {} and cannot be re-graded",
            submission_id, submission.status
        )));
    }

    if !db::grade_submission_row(
        store.pool(),
        submission_id,
        score,
        feedback,
        grader_id,
        GradeFrom::GradedOrReturned,
    )
    .await?
    {
        return Err(AppError::Conflict(format!(
            "Submission {} changed while re-grading",
            submission_id
        )));
    }

    db::get_submission(store.pool(), submission_id).await
}

#[instrument(skip(store))]
pub async fn return_submission(
    store: &SqliteStore,
    submission_id: i64,
) -> Result<Submission, AppError> {
    let submission = db::get_submission(store.pool(), submission_id).await?;

    if submission.status == SubmissionStatus::Returned {
        return Ok(submission);
    }

    if !submission.status.can_transition_to(SubmissionStatus::Returned) {
        return Err(AppError::Validation(format!(
            "Submission {} is {} and cannot be returned",
            submission_id, submission.status
        )));
    }

    if !db::return_submission_row(store.pool(), submission_id).await? {
        return Err(AppError::Conflict(format!(
            "Submission {} changed while returning",
            submission_id
        )));
    }

    db::get_submission(store.pool(), submission_id).await
}
