//! The one place that decides who an assignment applies to.
//!
//! Listings, permission checks, teacher statistics and the activity
//! aggregator all resolve scope through these functions so their answers
//! cannot drift apart.

use std::collections::BTreeSet;

use tracing::instrument;

use crate::error::AppError;
use crate::models::{Assignment, Audience};

use super::RosterIndex;

/// Batch form of `AudienceResolver::is_in_scope`, given the teachers the
/// student is enrolled with. The two must match arm for arm.
fn admits(assignment: &Assignment, student_id: i64, enrolled_teachers: &BTreeSet<i64>) -> bool {
    match &assignment.audience {
        Audience::Specific(ids) if !ids.is_empty() => ids.contains(&student_id),
        _ => enrolled_teachers.contains(&assignment.teacher_id),
    }
}

pub struct AudienceResolver<'a, R: RosterIndex + ?Sized> {
    roster: &'a R,
}

impl<'a, R: RosterIndex + ?Sized> AudienceResolver<'a, R> {
    pub fn new(roster: &'a R) -> Self {
        Self { roster }
    }

    /// An explicit list is authoritative and is not re-checked against
    /// enrollments; the `All` audience follows the live roster. An empty
    /// explicit list reads as `All`, matching `to_assigned_to`.
    #[instrument(skip(self, assignment), fields(assignment_id = assignment.id))]
    pub async fn is_in_scope(
        &self,
        assignment: &Assignment,
        student_id: i64,
    ) -> Result<bool, AppError> {
        match &assignment.audience {
            Audience::Specific(ids) if !ids.is_empty() => Ok(ids.contains(&student_id)),
            _ => {
                self.roster
                    .is_enrolled(assignment.teacher_id, student_id)
                    .await
            }
        }
    }

    /// Explicit ids are returned verbatim, in order, without checking that
    /// the students still exist.
    #[instrument(skip(self, assignment), fields(assignment_id = assignment.id))]
    pub async fn effective_roster(&self, assignment: &Assignment) -> Result<Vec<i64>, AppError> {
        match &assignment.audience {
            Audience::Specific(ids) if !ids.is_empty() => Ok(ids.clone()),
            _ => Ok(self
                .roster
                .enrolled_students(assignment.teacher_id)
                .await?
                .into_iter()
                .collect()),
        }
    }

    pub async fn total_assigned(&self, assignment: &Assignment) -> Result<usize, AppError> {
        Ok(self.effective_roster(assignment).await?.len())
    }

    /// Filters `assignments` down to those in scope for the student, fetching
    /// the student's enrollments once.
    #[instrument(skip(self, assignments), fields(candidates = assignments.len()))]
    pub async fn scoped_assignments(
        &self,
        student_id: i64,
        assignments: Vec<Assignment>,
    ) -> Result<Vec<Assignment>, AppError> {
        let enrolled_teachers = self.roster.enrolled_teachers(student_id).await?;

        Ok(assignments
            .into_iter()
            .filter(|a| admits(a, student_id, &enrolled_teachers))
            .collect())
    }
}
