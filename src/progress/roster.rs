use std::collections::{BTreeSet, HashMap};

use crate::error::AppError;

/// Read-only view of teacher/student enrollments.
///
/// Unknown teachers or students are not errors: they simply have no
/// enrollments, so lookups return an empty set or `false`.
#[rocket::async_trait]
pub trait RosterIndex: Send + Sync {
    async fn enrolled_students(&self, teacher_id: i64) -> Result<BTreeSet<i64>, AppError>;

    async fn enrolled_teachers(&self, student_id: i64) -> Result<BTreeSet<i64>, AppError>;

    async fn is_enrolled(&self, teacher_id: i64, student_id: i64) -> Result<bool, AppError> {
        Ok(self.enrolled_students(teacher_id).await?.contains(&student_id))
    }
}

/// Fixed in-memory roster, used where enrollments are already loaded.
#[derive(Debug, Clone, Default)]
pub struct RosterSnapshot {
    by_teacher: HashMap<i64, BTreeSet<i64>>,
    by_student: HashMap<i64, BTreeSet<i64>>,
}

impl RosterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let mut roster = Self::new();
        for (teacher_id, student_id) in pairs {
            roster.enroll(teacher_id, student_id);
        }
        roster
    }

    pub fn enroll(&mut self, teacher_id: i64, student_id: i64) {
        self.by_teacher
            .entry(teacher_id)
            .or_default()
            .insert(student_id);
        self.by_student
            .entry(student_id)
            .or_default()
            .insert(teacher_id);
    }

    pub fn unenroll(&mut self, teacher_id: i64, student_id: i64) -> bool {
        let removed = self
            .by_teacher
            .get_mut(&teacher_id)
            .is_some_and(|students| students.remove(&student_id));
        if let Some(teachers) = self.by_student.get_mut(&student_id) {
            teachers.remove(&teacher_id);
        }
        removed
    }
}

#[rocket::async_trait]
impl RosterIndex for RosterSnapshot {
    async fn enrolled_students(&self, teacher_id: i64) -> Result<BTreeSet<i64>, AppError> {
        Ok(self.by_teacher.get(&teacher_id).cloned().unwrap_or_default())
    }

    async fn enrolled_teachers(&self, student_id: i64) -> Result<BTreeSet<i64>, AppError> {
        Ok(self.by_student.get(&student_id).cloned().unwrap_or_default())
    }

    async fn is_enrolled(&self, teacher_id: i64, student_id: i64) -> Result<bool, AppError> {
        Ok(self
            .by_teacher
            .get(&teacher_id)
            .is_some_and(|students| students.contains(&student_id)))
    }
}
