use crate::error::AppError;
use crate::models::{Assignment, Progress, StudentIdentity, Submission};

/// Read-only queries the facade needs to build a progress report.
#[rocket::async_trait]
pub trait ActivityStore: Send + Sync {
    async fn find_student(&self, student_id: i64) -> Result<Option<StudentIdentity>, AppError>;

    async fn progress_for_student(&self, student_id: i64) -> Result<Vec<Progress>, AppError>;

    async fn count_active_lessons(&self) -> Result<i64, AppError>;

    async fn submissions_for_student(&self, student_id: i64) -> Result<Vec<Submission>, AppError>;

    /// Parent assignments of the student's submissions, active or not.
    async fn submission_parents(&self, student_id: i64) -> Result<Vec<Assignment>, AppError>;

    async fn active_assignments(&self) -> Result<Vec<Assignment>, AppError>;

    async fn find_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>, AppError>;

    async fn submissions_for_assignment(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<Submission>, AppError>;
}
