use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Assignment, StudentIdentity, Submission};

use super::aggregator::ActivityReport;

/// Two-decimal rendering used for every rate and score in the output.
pub fn format_percent(value: f64) -> String {
    format!("{:.2}", value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonStats {
    pub viewed: i64,
    pub completed: i64,
    pub total: i64,
    pub completion_rate: String,
    pub average_score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStats {
    pub submitted: i64,
    pub graded: i64,
    pub total: i64,
    pub submission_rate: String,
    pub average_score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub progress: String,
    pub average_score: String,
    pub total_time_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub lessons: LessonStats,
    pub assignments: AssignmentStats,
    pub overall: OverallStats,
}

impl From<&ActivityReport> for StudentProgress {
    fn from(report: &ActivityReport) -> Self {
        Self {
            lessons: LessonStats {
                viewed: report.lessons_viewed,
                completed: report.lessons_completed,
                total: report.total_lessons,
                completion_rate: format_percent(report.lesson_completion_rate),
                average_score: format_percent(report.lesson_average_score),
            },
            assignments: AssignmentStats {
                submitted: report.assignments_submitted,
                graded: report.assignments_graded,
                total: report.total_assignments,
                submission_rate: format_percent(report.assignment_submission_rate),
                average_score: format_percent(report.assignment_average_score),
            },
            overall: OverallStats {
                progress: format_percent(report.overall_progress),
                average_score: format_percent(report.overall_average_score),
                total_time_spent: report.total_time_spent,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Lesson,
    Submission,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub kind: ActivityKind,
    /// Lesson id or assignment id, depending on `kind`.
    pub item_id: i64,
    pub record_id: i64,
    pub title: String,
    pub status: String,
    pub score: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedProgress {
    #[serde(flatten)]
    pub progress: StudentProgress,
    pub recent_activity: Vec<RecentActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgressEntry {
    pub student: StudentIdentity,
    pub progress: StudentProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStatistics {
    pub assignment_id: i64,
    pub total_assigned: i64,
    pub submitted: i64,
    pub graded: i64,
    pub submission_rate: String,
    pub average_score: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: i64,
    pub teacher_id: i64,
    pub lesson_id: Option<i64>,
    pub title: String,
    pub description: String,
    /// Empty means every student enrolled with the teacher.
    pub assigned_to: Vec<i64>,
    pub max_points: f64,
    pub is_active: bool,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_assigned: Option<i64>,
}

impl From<&Assignment> for AssignmentView {
    fn from(assignment: &Assignment) -> Self {
        Self {
            id: assignment.id,
            teacher_id: assignment.teacher_id,
            lesson_id: assignment.lesson_id,
            title: assignment.title.clone(),
            description: assignment.description.clone(),
            assigned_to: assignment.audience.to_assigned_to(),
            max_points: assignment.max_points,
            is_active: assignment.is_active,
            due_date: assignment.due_date,
            total_assigned: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAssignment {
    #[serde(flatten)]
    pub assignment: AssignmentView,
    pub submission: Option<Submission>,
}
