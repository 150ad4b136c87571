use std::collections::HashMap;

use tracing::warn;

use crate::models::{Assignment, Progress, ProgressStatus, Submission, SubmissionStatus};

/// Policy weights for `overall_progress`. The overall average score does not
/// use these; it is weighted by sample size.
pub const LESSON_WEIGHT: f64 = 0.6;
pub const ASSIGNMENT_WEIGHT: f64 = 0.4;

/// Everything the aggregator reads for one student, loaded up front.
#[derive(Debug, Clone, Default)]
pub struct ActivitySnapshot {
    pub student_id: i64,
    pub progress: Vec<Progress>,
    /// Platform-wide, not limited to the student's teachers.
    pub total_active_lessons: i64,
    pub submissions: Vec<Submission>,
    /// Parent assignments of `submissions`, including inactive ones.
    pub submission_parents: Vec<Assignment>,
    /// Assignments already resolved as in scope for the student.
    pub assignments_in_scope: Vec<Assignment>,
}

/// Unrounded aggregation result. Rates and scores are percentages in [0, 100].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityReport {
    pub lessons_viewed: i64,
    pub lessons_completed: i64,
    pub total_lessons: i64,
    pub lesson_completion_rate: f64,
    pub lesson_average_score: f64,
    pub scored_lessons: i64,

    pub assignments_submitted: i64,
    pub assignments_graded: i64,
    pub total_assignments: i64,
    pub assignment_submission_rate: f64,
    pub assignment_average_score: f64,
    pub scored_submissions: i64,

    pub overall_progress: f64,
    pub overall_average_score: f64,
    pub total_time_spent: i64,
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn percentage(numerator: i64, denominator: i64) -> f64 {
    if denominator > 0 {
        clamp_percent(numerator as f64 / denominator as f64 * 100.0)
    } else {
        0.0
    }
}

fn mean(sum: f64, count: i64) -> f64 {
    if count > 0 { sum / count as f64 } else { 0.0 }
}

#[derive(Default)]
struct LessonTally {
    viewed: i64,
    completed: i64,
    score_sum: f64,
    scored: i64,
    time_spent: i64,
}

fn tally_lessons(student_id: i64, progress: &[Progress]) -> LessonTally {
    let mut tally = LessonTally::default();

    for row in progress {
        if row.lesson_title.is_none() {
            warn!(
                student_id,
                progress_id = row.id,
                lesson_id = row.lesson_id,
                "Excluding progress for missing lesson"
            );
            continue;
        }

        if row.time_spent >= 0 {
            tally.time_spent += row.time_spent;
        } else {
            warn!(student_id, progress_id = row.id, time_spent = row.time_spent, "Ignoring negative time spent");
        }

        match row.status {
            ProgressStatus::NotStarted => {}
            ProgressStatus::InProgress => tally.viewed += 1,
            ProgressStatus::Completed => {
                tally.viewed += 1;
                tally.completed += 1;

                match row.score {
                    Some(score) if (0.0..=100.0).contains(&score) => {
                        tally.score_sum += score;
                        tally.scored += 1;
                    }
                    Some(score) => {
                        warn!(student_id, progress_id = row.id, score, "Ignoring out-of-range lesson score");
                    }
                    None => {}
                }
            }
        }
    }

    tally
}

#[derive(Default)]
struct SubmissionTally {
    submitted: i64,
    graded: i64,
    percent_sum: f64,
    scored: i64,
}

fn tally_submissions(
    student_id: i64,
    submissions: &[Submission],
    parents: &HashMap<i64, &Assignment>,
) -> SubmissionTally {
    let mut tally = SubmissionTally::default();

    for submission in submissions {
        let parent = match parents.get(&submission.assignment_id) {
            Some(parent) if parent.is_active => *parent,
            Some(_) => continue,
            None => {
                warn!(
                    student_id,
                    submission_id = submission.id,
                    assignment_id = submission.assignment_id,
                    "Excluding submission for missing assignment"
                );
                continue;
            }
        };

        if submission.status.counts_as_submitted() {
            tally.submitted += 1;
        }

        if submission.status != SubmissionStatus::Graded {
            continue;
        }
        tally.graded += 1;

        let Some(score) = submission.score else {
            continue;
        };

        if !(parent.max_points > 0.0) {
            warn!(
                student_id,
                assignment_id = parent.id,
                max_points = parent.max_points,
                "Ignoring grade against non-positive max points"
            );
            continue;
        }

        if !(0.0..=parent.max_points).contains(&score) {
            warn!(
                student_id,
                submission_id = submission.id,
                score,
                max_points = parent.max_points,
                "Ignoring out-of-range submission score"
            );
            continue;
        }

        tally.percent_sum += score / parent.max_points * 100.0;
        tally.scored += 1;
    }

    tally
}

/// Computes the progress report for one student. Inconsistent rows are
/// logged and left out; they never fail the whole report.
pub fn aggregate(snapshot: &ActivitySnapshot) -> ActivityReport {
    let student_id = snapshot.student_id;

    let lessons = tally_lessons(student_id, &snapshot.progress);

    let parents: HashMap<i64, &Assignment> = snapshot
        .submission_parents
        .iter()
        .map(|a| (a.id, a))
        .collect();
    let submissions = tally_submissions(student_id, &snapshot.submissions, &parents);

    let total_assignments = snapshot
        .assignments_in_scope
        .iter()
        .filter(|a| a.is_active)
        .count() as i64;

    let lesson_completion_rate = percentage(lessons.completed, snapshot.total_active_lessons);
    let lesson_average_score = clamp_percent(mean(lessons.score_sum, lessons.scored));

    let assignment_submission_rate = percentage(submissions.submitted, total_assignments);
    let assignment_average_score = clamp_percent(mean(submissions.percent_sum, submissions.scored));

    let overall_progress = clamp_percent(
        LESSON_WEIGHT * lesson_completion_rate + ASSIGNMENT_WEIGHT * assignment_submission_rate,
    );

    let samples = lessons.scored + submissions.scored;
    let overall_average_score = if samples > 0 {
        clamp_percent(
            (lesson_average_score * lessons.scored as f64
                + assignment_average_score * submissions.scored as f64)
                / samples as f64,
        )
    } else {
        0.0
    };

    ActivityReport {
        lessons_viewed: lessons.viewed,
        lessons_completed: lessons.completed,
        total_lessons: snapshot.total_active_lessons,
        lesson_completion_rate,
        lesson_average_score,
        scored_lessons: lessons.scored,

        assignments_submitted: submissions.submitted,
        assignments_graded: submissions.graded,
        total_assignments,
        assignment_submission_rate,
        assignment_average_score,
        scored_submissions: submissions.scored,

        overall_progress,
        overall_average_score,
        total_time_spent: lessons.time_spent,
    }
}
