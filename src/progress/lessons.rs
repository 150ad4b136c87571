use tracing::{info, instrument};

use crate::db;
use crate::error::AppError;
use crate::models::{Progress, ProgressStatus};
use sqlx::{Pool, Sqlite};

/// One activity record posted by a student while working through a lesson.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LessonActivity {
    pub minutes: i64,
    pub status: Option<ProgressStatus>,
    pub score: Option<f64>,
}

impl LessonActivity {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.minutes < 0 {
            return Err(AppError::Validation(format!(
                "Time spent must not be negative, got {}",
                self.minutes
            )));
        }

        if let Some(score) = self.score {
            if !(0.0..=100.0).contains(&score) {
                return Err(AppError::Validation(format!(
                    "Lesson score must be between 0 and 100, got {}",
                    score
                )));
            }
        }

        Ok(())
    }
}

async fn require_active_lesson(pool: &Pool<Sqlite>, lesson_id: i64) -> Result<(), AppError> {
    let lesson = db::get_lesson(pool, lesson_id).await?;
    if !lesson.is_active {
        return Err(AppError::NotFound(format!(
            "Lesson with id {} is no longer active",
            lesson_id
        )));
    }
    Ok(())
}

/// Idempotent: the row is created on first call and left alone afterwards,
/// apart from leaving `not_started`.
#[instrument(skip(pool))]
pub async fn start_lesson(
    pool: &Pool<Sqlite>,
    student_id: i64,
    lesson_id: i64,
) -> Result<Progress, AppError> {
    require_active_lesson(pool, lesson_id).await?;

    db::ensure_progress_started(pool, student_id, lesson_id).await?;
    db::get_progress(pool, student_id, lesson_id).await
}

#[instrument(skip(pool))]
pub async fn record_lesson_activity(
    pool: &Pool<Sqlite>,
    student_id: i64,
    lesson_id: i64,
    activity: LessonActivity,
) -> Result<Progress, AppError> {
    activity.validate()?;
    let current = start_lesson(pool, student_id, lesson_id).await?;

    // status only moves forward
    let status = activity
        .status
        .map_or(current.status, |requested| requested.max(current.status));

    info!(from = %current.status, to = %status, minutes = activity.minutes, "Applying lesson activity");
    db::apply_progress_activity(pool, current.id, status, activity.score, activity.minutes).await?;

    db::get_progress(pool, student_id, lesson_id).await
}
