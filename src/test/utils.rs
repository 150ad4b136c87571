use std::collections::HashMap;
use std::sync::Once;

use rocket::http::Cookie;
use rocket::local::asynchronous::{Client, LocalRequest};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::auth::Role;
use crate::db::{
    self, GradeFrom, SqliteStore, create_assignment, create_lesson, create_user, enroll_student,
    link_guardian, set_assignment_active, set_lesson_active,
};
use crate::error::AppError;
use crate::models::{Audience, NewAssignment, ProgressStatus, SubmissionStatus};
use crate::progress::ProgressService;

static INIT: Once = Once::new();

#[derive(Default)]
pub struct TestDbBuilder {
    users: Vec<(String, Role)>,
    enrollments: Vec<(String, String)>,
    guardians: Vec<(String, String)>,
    lessons: Vec<TestLesson>,
    assignments: Vec<TestAssignment>,
    progress: Vec<TestProgress>,
    submissions: Vec<TestSubmission>,
}

pub struct TestLesson {
    pub title: String,
    pub teacher: String,
    pub active: bool,
}

pub struct TestAssignment {
    pub title: String,
    pub teacher: String,
    pub assigned_to: Vec<String>,
    pub max_points: f64,
    pub active: bool,
}

pub struct TestProgress {
    pub student: String,
    pub lesson: String,
    pub status: ProgressStatus,
    pub score: Option<f64>,
    pub minutes: i64,
}

pub struct TestSubmission {
    pub student: String,
    pub assignment: String,
    pub status: SubmissionStatus,
    pub score: Option<f64>,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn user(mut self, username: &str, role: Role) -> Self {
        self.users.push((username.to_string(), role));
        self
    }

    pub fn student(self, username: &str) -> Self {
        self.user(username, Role::Student)
    }

    pub fn teacher(self, username: &str) -> Self {
        self.user(username, Role::Teacher)
    }

    pub fn parent(self, username: &str) -> Self {
        self.user(username, Role::Parent)
    }

    pub fn admin(self, username: &str) -> Self {
        self.user(username, Role::Admin)
    }

    pub fn enroll(mut self, teacher: &str, student: &str) -> Self {
        self.enrollments
            .push((teacher.to_string(), student.to_string()));
        self
    }

    pub fn guardian(mut self, parent: &str, student: &str) -> Self {
        self.guardians.push((parent.to_string(), student.to_string()));
        self
    }

    pub fn lesson(mut self, title: &str, teacher: &str) -> Self {
        self.lessons.push(TestLesson {
            title: title.to_string(),
            teacher: teacher.to_string(),
            active: true,
        });
        self
    }

    pub fn inactive_lesson(mut self, title: &str, teacher: &str) -> Self {
        self.lessons.push(TestLesson {
            title: title.to_string(),
            teacher: teacher.to_string(),
            active: false,
        });
        self
    }

    /// An empty `assigned_to` gives the assignment to every enrolled student.
    pub fn assignment(
        mut self,
        title: &str,
        teacher: &str,
        assigned_to: &[&str],
        max_points: f64,
    ) -> Self {
        self.assignments.push(TestAssignment {
            title: title.to_string(),
            teacher: teacher.to_string(),
            assigned_to: assigned_to.iter().map(|s| s.to_string()).collect(),
            max_points,
            active: true,
        });
        self
    }

    pub fn inactive_assignment(mut self, title: &str, teacher: &str, max_points: f64) -> Self {
        self.assignments.push(TestAssignment {
            title: title.to_string(),
            teacher: teacher.to_string(),
            assigned_to: Vec::new(),
            max_points,
            active: false,
        });
        self
    }

    pub fn progress(
        mut self,
        student: &str,
        lesson: &str,
        status: ProgressStatus,
        score: Option<f64>,
        minutes: i64,
    ) -> Self {
        self.progress.push(TestProgress {
            student: student.to_string(),
            lesson: lesson.to_string(),
            status,
            score,
            minutes,
        });
        self
    }

    pub fn submission(
        mut self,
        student: &str,
        assignment: &str,
        status: SubmissionStatus,
        score: Option<f64>,
    ) -> Self {
        self.submissions.push(TestSubmission {
            student: student.to_string(),
            assignment: assignment.to_string(),
            status,
            score,
        });
        self
    }

    pub async fn build(self) -> Result<TestDb, AppError> {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init();
        });

        // one connection keeps the in-memory database alive and shared
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let mut user_id_map: HashMap<String, i64> = HashMap::new();
        let mut user_role_map: HashMap<String, Role> = HashMap::new();
        let mut lesson_id_map: HashMap<String, i64> = HashMap::new();
        let mut assignment_id_map: HashMap<String, i64> = HashMap::new();
        let mut assignment_teacher: HashMap<i64, i64> = HashMap::new();

        let lookup = |map: &HashMap<String, i64>, name: &str| {
            map.get(name)
                .copied()
                .ok_or_else(|| AppError::NotFound(format!("test fixture {} not declared", name)))
        };

        for (username, role) in &self.users {
            let id = create_user(&pool, username, None, *role).await?;
            user_id_map.insert(username.clone(), id);
            user_role_map.insert(username.clone(), *role);
        }

        for (teacher, student) in &self.enrollments {
            enroll_student(
                &pool,
                lookup(&user_id_map, teacher)?,
                lookup(&user_id_map, student)?,
            )
            .await?;
        }

        for (parent, student) in &self.guardians {
            link_guardian(
                &pool,
                lookup(&user_id_map, parent)?,
                lookup(&user_id_map, student)?,
            )
            .await?;
        }

        for lesson in &self.lessons {
            let id = create_lesson(&pool, lookup(&user_id_map, &lesson.teacher)?, &lesson.title)
                .await?;
            if !lesson.active {
                set_lesson_active(&pool, id, false).await?;
            }
            lesson_id_map.insert(lesson.title.clone(), id);
        }

        for assignment in &self.assignments {
            let teacher_id = lookup(&user_id_map, &assignment.teacher)?;
            let mut ids = Vec::with_capacity(assignment.assigned_to.len());
            for name in &assignment.assigned_to {
                ids.push(lookup(&user_id_map, name)?);
            }

            let id = create_assignment(
                &pool,
                &NewAssignment {
                    teacher_id,
                    lesson_id: None,
                    title: assignment.title.clone(),
                    description: String::new(),
                    audience: Audience::from_assigned_to(&ids),
                    max_points: assignment.max_points,
                    due_date: None,
                },
            )
            .await?;

            if !assignment.active {
                set_assignment_active(&pool, id, false).await?;
            }
            assignment_id_map.insert(assignment.title.clone(), id);
            assignment_teacher.insert(id, teacher_id);
        }

        for p in &self.progress {
            sqlx::query(
                "INSERT INTO progress (student_id, lesson_id, status, score, time_spent, completed_at)
                 VALUES (?, ?, ?, ?, ?, CASE WHEN ? = 'completed' THEN CURRENT_TIMESTAMP END)",
            )
            .bind(lookup(&user_id_map, &p.student)?)
            .bind(lookup(&lesson_id_map, &p.lesson)?)
            .bind(p.status.as_str())
            .bind(p.score)
            .bind(p.minutes)
            .bind(p.status.as_str())
            .execute(&pool)
            .await?;
        }

        for s in &self.submissions {
            let student_id = lookup(&user_id_map, &s.student)?;
            let assignment_id = lookup(&assignment_id_map, &s.assignment)?;

            let initial = match s.status {
                SubmissionStatus::Draft => SubmissionStatus::Draft,
                _ => SubmissionStatus::Submitted,
            };
            let id =
                db::insert_submission(&pool, assignment_id, student_id, "seeded work", initial)
                    .await?;

            if matches!(s.status, SubmissionStatus::Graded | SubmissionStatus::Returned) {
                let grader = assignment_teacher[&assignment_id];
                db::grade_submission_row(
                    &pool,
                    id,
                    s.score.unwrap_or(0.0),
                    None,
                    grader,
                    GradeFrom::Submitted,
                )
                .await?;
            }

            if s.status == SubmissionStatus::Returned {
                db::return_submission_row(&pool, id).await?;
            }
        }

        Ok(TestDb {
            pool,
            user_id_map,
            user_role_map,
            lesson_id_map,
            assignment_id_map,
        })
    }
}

pub struct TestDb {
    pub pool: Pool<Sqlite>,
    pub user_id_map: HashMap<String, i64>,
    pub user_role_map: HashMap<String, Role>,
    pub lesson_id_map: HashMap<String, i64>,
    pub assignment_id_map: HashMap<String, i64>,
}

impl TestDb {
    pub fn user_id(&self, username: &str) -> i64 {
        self.user_id_map[username]
    }

    pub fn role(&self, username: &str) -> Role {
        self.user_role_map[username]
    }

    pub fn lesson_id(&self, title: &str) -> i64 {
        self.lesson_id_map[title]
    }

    pub fn assignment_id(&self, title: &str) -> i64 {
        self.assignment_id_map[title]
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(self.pool.clone())
    }

    pub fn service(&self) -> ProgressService<SqliteStore> {
        ProgressService::new(self.store())
    }

    pub async fn submission_id(&self, student: &str, assignment: &str) -> i64 {
        let (id,): (i64,) =
            sqlx::query_as("SELECT id FROM submissions WHERE student_id = ? AND assignment_id = ?")
                .bind(self.user_id(student))
                .bind(self.assignment_id(assignment))
                .fetch_one(&self.pool)
                .await
                .expect("submission should exist");
        id
    }
}

/// Teacher `teacher` with `alice`, `bob` and `carol` enrolled, a parent linked
/// to `alice`, an outsider student, and one open assignment for everyone.
pub async fn create_standard_test_db() -> TestDb {
    TestDbBuilder::new()
        .teacher("teacher")
        .teacher("other_teacher")
        .student("alice")
        .student("bob")
        .student("carol")
        .student("outsider")
        .parent("parent")
        .admin("admin")
        .enroll("teacher", "alice")
        .enroll("teacher", "bob")
        .enroll("teacher", "carol")
        .enroll("other_teacher", "outsider")
        .guardian("parent", "alice")
        .lesson("Fractions", "teacher")
        .lesson("Decimals", "teacher")
        .assignment("Homework 1", "teacher", &[], 50.0)
        .assignment("Alice only", "teacher", &["alice"], 10.0)
        .build()
        .await
        .expect("Failed to build standard test database")
}

pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
    let rocket = crate::init_rocket(test_db.pool.clone()).await;
    let client = Client::tracked(rocket)
        .await
        .expect("valid rocket instance");
    (client, test_db)
}

/// Stands in for the upstream login flow by setting the principal cookies.
pub fn as_user<'c>(request: LocalRequest<'c>, test_db: &TestDb, username: &str) -> LocalRequest<'c> {
    request
        .private_cookie(Cookie::new("user_id", test_db.user_id(username).to_string()))
        .private_cookie(Cookie::new("user_role", test_db.role(username).as_str()))
}
