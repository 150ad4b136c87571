use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

fn to_utc(dt: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdentity {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbStudentIdentity {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

impl From<DbStudentIdentity> for StudentIdentity {
    fn from(db: DbStudentIdentity) -> Self {
        let username = db.username.unwrap_or_default();
        Self {
            id: db.id.unwrap_or_default(),
            display_name: db.display_name.unwrap_or_else(|| username.clone()),
            username,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub teacher_id: i64,
    pub title: String,
    pub is_active: bool,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbLesson {
    pub id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub title: Option<String>,
    pub is_active: Option<bool>,
}

impl From<DbLesson> for Lesson {
    fn from(db: DbLesson) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            teacher_id: db.teacher_id.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            is_active: db.is_active.unwrap_or_default(),
        }
    }
}

/// Who an assignment applies to.
///
/// `All` means every student enrolled with the owning teacher at the time of
/// the question. `Specific` is an explicit, ordered, non-empty list that is
/// never re-validated against enrollments. An empty list is not a valid
/// audience: build through `from_assigned_to` or `specific`, and storage
/// writes go through `normalized`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    All,
    Specific(Vec<i64>),
}

impl Audience {
    /// Maps the wire representation, where an empty list means everyone, to the
    /// tagged form. Duplicates are collapsed keeping first occurrence.
    pub fn from_assigned_to(ids: &[i64]) -> Self {
        if ids.is_empty() {
            return Audience::All;
        }

        let mut seen = std::collections::HashSet::new();
        Audience::specific(ids.iter().copied().filter(|id| seen.insert(*id)).collect())
    }

    /// An explicit list, or `All` when the list is empty.
    pub fn specific(ids: Vec<i64>) -> Self {
        if ids.is_empty() {
            Audience::All
        } else {
            Audience::Specific(ids)
        }
    }

    pub fn normalized(&self) -> Self {
        match self {
            Audience::All => Audience::All,
            Audience::Specific(ids) => Audience::specific(ids.clone()),
        }
    }

    /// Inverse of `from_assigned_to` for normalized values.
    pub fn to_assigned_to(&self) -> Vec<i64> {
        match self {
            Audience::All => Vec::new(),
            Audience::Specific(ids) => ids.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Audience::All => "all",
            Audience::Specific(_) => "specific",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub id: i64,
    pub teacher_id: i64,
    pub lesson_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub audience: Audience,
    pub max_points: f64,
    pub is_active: bool,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbAssignment {
    pub id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub audience: Option<String>,
    pub max_points: Option<f64>,
    pub is_active: Option<bool>,
    pub due_date: Option<NaiveDateTime>,
}

impl DbAssignment {
    /// `assigned` holds the explicit audience rows for this assignment, already
    /// ordered by position. They are ignored for `all` audiences.
    pub fn into_assignment(self, assigned: Vec<i64>) -> Result<Assignment, AppError> {
        let id = self.id.unwrap_or_default();
        let audience = match self.audience.as_deref() {
            Some("all") | None => Audience::All,
            Some("specific") => Audience::specific(assigned),
            Some(other) => {
                return Err(AppError::Internal(format!(
                    "Assignment {} has unknown audience kind '{}'",
                    id, other
                )));
            }
        };

        Ok(Assignment {
            id,
            teacher_id: self.teacher_id.unwrap_or_default(),
            lesson_id: self.lesson_id,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            audience,
            max_points: self.max_points.unwrap_or_default(),
            is_active: self.is_active.unwrap_or_default(),
            due_date: self.due_date.map(to_utc),
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub teacher_id: i64,
    pub lesson_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub audience: Audience,
    pub max_points: f64,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
        }
    }
}

impl FromStr for ProgressStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(ProgressStatus::NotStarted),
            "in_progress" => Ok(ProgressStatus::InProgress),
            "completed" => Ok(ProgressStatus::Completed),
            _ => Err(AppError::Validation(format!(
                "Unknown progress status: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: i64,
    pub student_id: i64,
    pub lesson_id: i64,
    /// `None` when the referenced lesson no longer exists.
    pub lesson_title: Option<String>,
    pub status: ProgressStatus,
    pub score: Option<f64>,
    pub time_spent: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbProgress {
    pub id: Option<i64>,
    pub student_id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub lesson_title: Option<String>,
    pub status: Option<String>,
    pub score: Option<f64>,
    pub time_spent: Option<i64>,
    pub completed_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<DbProgress> for Progress {
    type Error = AppError;

    fn try_from(db: DbProgress) -> Result<Self, Self::Error> {
        let status = db.status.as_deref().unwrap_or("not_started").parse()?;

        Ok(Self {
            id: db.id.unwrap_or_default(),
            student_id: db.student_id.unwrap_or_default(),
            lesson_id: db.lesson_id.unwrap_or_default(),
            lesson_title: db.lesson_title,
            status,
            score: db.score,
            time_spent: db.time_spent.unwrap_or_default(),
            completed_at: db.completed_at.map(to_utc),
            updated_at: db.updated_at.map(to_utc).unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    Graded,
    Returned,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Graded => "graded",
            SubmissionStatus::Returned => "returned",
        }
    }

    /// Transitions reachable through student edits and the plain grade/return
    /// actions. Re-grading is a separate, explicit path.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;

        matches!(
            (self, next),
            (Draft, Draft)
                | (Draft, Submitted)
                | (Submitted, Submitted)
                | (Submitted, Graded)
                | (Graded, Returned)
        )
    }

    pub fn can_regrade(&self) -> bool {
        matches!(self, SubmissionStatus::Graded | SubmissionStatus::Returned)
    }

    /// Content stays editable by the student until a grade lands.
    pub fn is_editable(&self) -> bool {
        matches!(self, SubmissionStatus::Draft | SubmissionStatus::Submitted)
    }

    pub fn counts_as_submitted(&self) -> bool {
        matches!(self, SubmissionStatus::Submitted | SubmissionStatus::Graded)
    }
}

impl FromStr for SubmissionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SubmissionStatus::Draft),
            "submitted" => Ok(SubmissionStatus::Submitted),
            "graded" => Ok(SubmissionStatus::Graded),
            "returned" => Ok(SubmissionStatus::Returned),
            _ => Err(AppError::Validation(format!(
                "Unknown submission status: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    /// Denormalized from the parent assignment; `None` when it no longer exists.
    pub assignment_title: Option<String>,
    pub content: String,
    pub status: SubmissionStatus,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<i64>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbSubmission {
    pub id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub student_id: Option<i64>,
    pub assignment_title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<i64>,
    pub submitted_at: Option<NaiveDateTime>,
    pub graded_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<DbSubmission> for Submission {
    type Error = AppError;

    fn try_from(db: DbSubmission) -> Result<Self, Self::Error> {
        let status = db.status.as_deref().unwrap_or("draft").parse()?;

        Ok(Self {
            id: db.id.unwrap_or_default(),
            assignment_id: db.assignment_id.unwrap_or_default(),
            student_id: db.student_id.unwrap_or_default(),
            assignment_title: db.assignment_title,
            content: db.content.unwrap_or_default(),
            status,
            score: db.score,
            feedback: db.feedback,
            graded_by: db.graded_by,
            submitted_at: db.submitted_at.map(to_utc),
            graded_at: db.graded_at.map(to_utc),
            updated_at: db.updated_at.map(to_utc).unwrap_or_else(Utc::now),
        })
    }
}
