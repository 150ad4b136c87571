#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::models::{
        Assignment, Audience, Progress, ProgressStatus, Submission, SubmissionStatus,
    };
    use crate::progress::aggregator::{ASSIGNMENT_WEIGHT, LESSON_WEIGHT};
    use crate::progress::service::recent_activity;
    use crate::progress::{ActivitySnapshot, StudentProgress, aggregate};

    const STUDENT: i64 = 1;

    fn at(minutes: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn lesson_row(id: i64, status: ProgressStatus, score: Option<f64>, time_spent: i64) -> Progress {
        Progress {
            id,
            student_id: STUDENT,
            lesson_id: id,
            lesson_title: Some(format!("Lesson {}", id)),
            status,
            score,
            time_spent,
            completed_at: None,
            updated_at: at(id),
        }
    }

    fn assignment(id: i64, max_points: f64, is_active: bool) -> Assignment {
        Assignment {
            id,
            teacher_id: 99,
            lesson_id: None,
            title: format!("Assignment {}", id),
            description: String::new(),
            audience: Audience::All,
            max_points,
            is_active,
            due_date: None,
        }
    }

    fn submission(id: i64, assignment_id: i64, status: SubmissionStatus, score: Option<f64>) -> Submission {
        Submission {
            id,
            assignment_id,
            student_id: STUDENT,
            assignment_title: Some(format!("Assignment {}", assignment_id)),
            content: String::new(),
            status,
            score,
            feedback: None,
            graded_by: None,
            submitted_at: None,
            graded_at: None,
            updated_at: at(id),
        }
    }

    #[test]
    fn test_blended_progress_scenario() {
        let snapshot = ActivitySnapshot {
            student_id: STUDENT,
            progress: vec![
                lesson_row(1, ProgressStatus::Completed, Some(80.0), 30),
                lesson_row(2, ProgressStatus::Completed, Some(100.0), 45),
            ],
            total_active_lessons: 10,
            submissions: vec![submission(1, 10, SubmissionStatus::Graded, Some(45.0))],
            submission_parents: vec![assignment(10, 50.0, true)],
            assignments_in_scope: vec![assignment(10, 50.0, true), assignment(11, 20.0, true)],
        };

        let report = aggregate(&snapshot);
        assert_eq!(report.lesson_completion_rate, 20.0);
        assert_eq!(report.lesson_average_score, 90.0);
        assert_eq!(report.assignment_submission_rate, 50.0);
        assert_eq!(report.assignment_average_score, 90.0);
        assert_eq!(report.total_time_spent, 75);

        let progress = StudentProgress::from(&report);
        assert_eq!(progress.overall.progress, "32.00");
        assert_eq!(progress.overall.average_score, "90.00");
        assert_eq!(progress.lessons.completion_rate, "20.00");
        assert_eq!(progress.lessons.viewed, 2);
        assert_eq!(progress.lessons.total, 10);
        assert_eq!(progress.assignments.submitted, 1);
        assert_eq!(progress.assignments.graded, 1);
        assert_eq!(progress.assignments.total, 2);
        assert_eq!(progress.assignments.submission_rate, "50.00");
    }

    #[test]
    fn test_empty_snapshot_is_all_zero() {
        let report = aggregate(&ActivitySnapshot::default());
        let progress = StudentProgress::from(&report);

        assert_eq!(progress.lessons.completion_rate, "0.00");
        assert_eq!(progress.lessons.average_score, "0.00");
        assert_eq!(progress.assignments.submission_rate, "0.00");
        assert_eq!(progress.overall.progress, "0.00");
        assert_eq!(progress.overall.average_score, "0.00");
        assert_eq!(progress.overall.total_time_spent, 0);
    }

    #[test]
    fn test_rates_are_clamped_before_blending() {
        // more completions than active lessons after lessons were deactivated
        let snapshot = ActivitySnapshot {
            student_id: STUDENT,
            progress: vec![
                lesson_row(1, ProgressStatus::Completed, None, 0),
                lesson_row(2, ProgressStatus::Completed, None, 0),
                lesson_row(3, ProgressStatus::Completed, None, 0),
            ],
            total_active_lessons: 2,
            submissions: vec![
                submission(1, 10, SubmissionStatus::Submitted, None),
                submission(2, 11, SubmissionStatus::Submitted, None),
            ],
            submission_parents: vec![assignment(10, 10.0, true), assignment(11, 10.0, true)],
            // the second assignment is no longer in scope
            assignments_in_scope: vec![assignment(10, 10.0, true)],
        };

        let report = aggregate(&snapshot);
        assert_eq!(report.lesson_completion_rate, 100.0);
        assert_eq!(report.assignment_submission_rate, 100.0);
        assert_eq!(report.overall_progress, 100.0);

        let expected = LESSON_WEIGHT * report.lesson_completion_rate
            + ASSIGNMENT_WEIGHT * report.assignment_submission_rate;
        assert!((report.overall_progress - expected).abs() < 0.01);
    }

    #[test]
    fn test_inconsistent_rows_are_excluded() {
        let mut orphan = lesson_row(3, ProgressStatus::Completed, Some(50.0), 20);
        orphan.lesson_title = None;

        let snapshot = ActivitySnapshot {
            student_id: STUDENT,
            progress: vec![
                lesson_row(1, ProgressStatus::Completed, Some(150.0), 10),
                lesson_row(2, ProgressStatus::InProgress, None, -5),
                orphan,
            ],
            total_active_lessons: 4,
            submissions: vec![
                submission(1, 10, SubmissionStatus::Graded, Some(60.0)),
                submission(2, 11, SubmissionStatus::Graded, Some(5.0)),
                submission(3, 12, SubmissionStatus::Submitted, None),
                submission(4, 404, SubmissionStatus::Graded, Some(1.0)),
            ],
            submission_parents: vec![
                assignment(10, 50.0, true),
                assignment(11, 10.0, true),
                assignment(12, 10.0, false),
            ],
            assignments_in_scope: vec![assignment(10, 50.0, true), assignment(11, 10.0, true)],
        };

        let report = aggregate(&snapshot);

        // out-of-range score is dropped but the completion still counts
        assert_eq!(report.lessons_completed, 1);
        assert_eq!(report.lessons_viewed, 2);
        assert_eq!(report.scored_lessons, 0);
        assert_eq!(report.lesson_average_score, 0.0);
        assert_eq!(report.total_time_spent, 10);

        // 60/50 is out of range; the inactive and missing parents are skipped
        assert_eq!(report.assignments_submitted, 2);
        assert_eq!(report.assignments_graded, 2);
        assert_eq!(report.scored_submissions, 1);
        assert_eq!(report.assignment_average_score, 50.0);
        assert_eq!(report.total_assignments, 2);
    }

    #[test]
    fn test_overall_average_is_weighted_by_sample_size() {
        let snapshot = ActivitySnapshot {
            student_id: STUDENT,
            progress: vec![
                lesson_row(1, ProgressStatus::Completed, Some(100.0), 0),
                lesson_row(2, ProgressStatus::Completed, Some(100.0), 0),
                lesson_row(3, ProgressStatus::Completed, Some(100.0), 0),
            ],
            total_active_lessons: 3,
            submissions: vec![submission(1, 10, SubmissionStatus::Graded, Some(0.0))],
            submission_parents: vec![assignment(10, 20.0, true)],
            assignments_in_scope: vec![assignment(10, 20.0, true)],
        };

        let report = aggregate(&snapshot);
        assert_eq!(report.lesson_average_score, 100.0);
        assert_eq!(report.assignment_average_score, 0.0);
        assert_eq!(report.overall_average_score, 75.0);
    }

    #[test]
    fn test_recent_activity_orders_and_filters() {
        let mut orphan = lesson_row(5, ProgressStatus::InProgress, None, 0);
        orphan.lesson_title = None;

        let mut tie_low = submission(7, 10, SubmissionStatus::Submitted, None);
        tie_low.updated_at = at(100);
        let mut tie_high = submission(8, 10, SubmissionStatus::Submitted, None);
        tie_high.updated_at = at(100);

        let snapshot = ActivitySnapshot {
            student_id: STUDENT,
            progress: vec![lesson_row(1, ProgressStatus::Completed, Some(70.0), 0), orphan],
            total_active_lessons: 2,
            submissions: vec![
                tie_low,
                tie_high,
                submission(9, 12, SubmissionStatus::Graded, Some(3.0)),
            ],
            submission_parents: vec![assignment(10, 10.0, true), assignment(12, 10.0, false)],
            assignments_in_scope: vec![],
        };

        let recent = recent_activity(&snapshot, 10);
        let ids: Vec<i64> = recent.iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec![8, 7, 1]);

        assert_eq!(recent_activity(&snapshot, 2).len(), 2);
    }
}
