use std::collections::{HashMap, HashSet};

use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{Assignment, StudentIdentity, Submission, SubmissionStatus};

use super::aggregator::{ActivitySnapshot, aggregate};
use super::audience::AudienceResolver;
use super::report::{
    ActivityKind, AssignmentStatistics, AssignmentView, DetailedProgress, RecentActivity,
    StudentAssignment, StudentProgress, StudentProgressEntry, format_percent,
};
use super::{ActivityStore, RosterIndex};

pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Entry point for controllers: composes the roster, the audience resolver
/// and the aggregator over one store.
pub struct ProgressService<S> {
    store: S,
}

impl<S: ActivityStore + RosterIndex> ProgressService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> AudienceResolver<'_, S> {
        AudienceResolver::new(&self.store)
    }

    async fn require_student(&self, student_id: i64) -> Result<StudentIdentity, AppError> {
        self.store
            .find_student(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", student_id)))
    }

    async fn require_assignment(&self, assignment_id: i64) -> Result<Assignment, AppError> {
        self.store
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Assignment with id {} not found", assignment_id))
            })
    }

    /// Active assignments in scope for the student, in store order.
    pub async fn assignments_in_scope(&self, student_id: i64) -> Result<Vec<Assignment>, AppError> {
        let active = self.store.active_assignments().await?;
        self.resolver().scoped_assignments(student_id, active).await
    }

    /// Point-in-time reads; concurrent writes may land between them.
    #[instrument(skip(self))]
    pub async fn load_snapshot(&self, student_id: i64) -> Result<ActivitySnapshot, AppError> {
        Ok(ActivitySnapshot {
            student_id,
            progress: self.store.progress_for_student(student_id).await?,
            total_active_lessons: self.store.count_active_lessons().await?,
            submissions: self.store.submissions_for_student(student_id).await?,
            submission_parents: self.store.submission_parents(student_id).await?,
            assignments_in_scope: self.assignments_in_scope(student_id).await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_student_progress(&self, student_id: i64) -> Result<StudentProgress, AppError> {
        info!("Computing student progress");
        self.require_student(student_id).await?;

        let snapshot = self.load_snapshot(student_id).await?;
        Ok(StudentProgress::from(&aggregate(&snapshot)))
    }

    #[instrument(skip(self))]
    pub async fn get_detailed_progress(
        &self,
        student_id: i64,
    ) -> Result<DetailedProgress, AppError> {
        info!("Computing detailed student progress");
        self.require_student(student_id).await?;

        let snapshot = self.load_snapshot(student_id).await?;
        let progress = StudentProgress::from(&aggregate(&snapshot));

        Ok(DetailedProgress {
            progress,
            recent_activity: recent_activity(&snapshot, RECENT_ACTIVITY_LIMIT),
        })
    }

    /// Fails with NotFound on the first id that is not a student.
    pub async fn ensure_students_exist(&self, student_ids: &[i64]) -> Result<(), AppError> {
        for &student_id in student_ids {
            self.require_student(student_id).await?;
        }
        Ok(())
    }

    /// Preserves input order. Any unknown id fails the whole call.
    #[instrument(skip(self, student_ids), fields(count = student_ids.len()))]
    pub async fn get_multiple_students_progress(
        &self,
        student_ids: &[i64],
    ) -> Result<Vec<StudentProgressEntry>, AppError> {
        info!("Computing progress for multiple students");
        let mut entries = Vec::with_capacity(student_ids.len());

        for &student_id in student_ids {
            let student = self.require_student(student_id).await?;
            let snapshot = self.load_snapshot(student_id).await?;

            entries.push(StudentProgressEntry {
                student,
                progress: StudentProgress::from(&aggregate(&snapshot)),
            });
        }

        Ok(entries)
    }

    /// In-scope active assignments joined with the student's own submission.
    #[instrument(skip(self))]
    pub async fn student_assignments(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentAssignment>, AppError> {
        self.require_student(student_id).await?;

        let assignments = self.assignments_in_scope(student_id).await?;
        let mut submissions: HashMap<i64, Submission> = self
            .store
            .submissions_for_student(student_id)
            .await?
            .into_iter()
            .map(|s| (s.assignment_id, s))
            .collect();

        Ok(assignments
            .iter()
            .map(|assignment| StudentAssignment {
                assignment: AssignmentView::from(assignment),
                submission: submissions.remove(&assignment.id),
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn assignment_roster(&self, assignment_id: i64) -> Result<Vec<i64>, AppError> {
        let assignment = self.require_assignment(assignment_id).await?;
        self.resolver().effective_roster(&assignment).await
    }

    /// Counts only submissions from students currently in the effective
    /// roster, so the numbers agree with `total_assigned`.
    #[instrument(skip(self))]
    pub async fn assignment_statistics(
        &self,
        assignment_id: i64,
    ) -> Result<AssignmentStatistics, AppError> {
        info!("Computing assignment statistics");
        let assignment = self.require_assignment(assignment_id).await?;
        let roster: HashSet<i64> = self
            .resolver()
            .effective_roster(&assignment)
            .await?
            .into_iter()
            .collect();
        let total_assigned = roster.len() as i64;

        let submissions = self.store.submissions_for_assignment(assignment_id).await?;

        let mut submitted = 0i64;
        let mut graded = 0i64;
        let mut percent_sum = 0.0;
        let mut scored = 0i64;

        for submission in submissions.iter().filter(|s| roster.contains(&s.student_id)) {
            if submission.status.counts_as_submitted() {
                submitted += 1;
            }
            if submission.status == SubmissionStatus::Graded {
                graded += 1;
                if let Some(score) = submission.score {
                    if assignment.max_points > 0.0 && (0.0..=assignment.max_points).contains(&score)
                    {
                        percent_sum += score / assignment.max_points * 100.0;
                        scored += 1;
                    }
                }
            }
        }

        let submission_rate = if total_assigned > 0 {
            (submitted as f64 / total_assigned as f64 * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let average_score = if scored > 0 {
            percent_sum / scored as f64
        } else {
            0.0
        };

        Ok(AssignmentStatistics {
            assignment_id,
            total_assigned,
            submitted,
            graded,
            submission_rate: format_percent(submission_rate),
            average_score: format_percent(average_score),
        })
    }
}

/// Most recent lesson and submission updates, newest first. Entries whose
/// lesson or assignment is gone (or soft-deleted) are left out.
pub fn recent_activity(snapshot: &ActivitySnapshot, limit: usize) -> Vec<RecentActivity> {
    let active_parents: HashMap<i64, &Assignment> = snapshot
        .submission_parents
        .iter()
        .filter(|a| a.is_active)
        .map(|a| (a.id, a))
        .collect();

    let lessons = snapshot.progress.iter().filter_map(|p| {
        p.lesson_title.as_ref().map(|title| RecentActivity {
            kind: ActivityKind::Lesson,
            item_id: p.lesson_id,
            record_id: p.id,
            title: title.clone(),
            status: p.status.to_string(),
            score: p.score,
            updated_at: p.updated_at,
        })
    });

    let submissions = snapshot.submissions.iter().filter_map(|s| {
        active_parents.get(&s.assignment_id).map(|parent| RecentActivity {
            kind: ActivityKind::Submission,
            item_id: s.assignment_id,
            record_id: s.id,
            title: parent.title.clone(),
            status: s.status.to_string(),
            score: s.score,
            updated_at: s.updated_at,
        })
    });

    let mut entries: Vec<RecentActivity> = lessons.chain(submissions).collect();
    entries.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.record_id.cmp(&a.record_id))
    });
    entries.truncate(limit);
    entries
}
