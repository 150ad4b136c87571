#[cfg(test)]
mod tests {
    use crate::db;
    use crate::error::AppError;
    use crate::models::{ProgressStatus, SubmissionStatus};
    use crate::progress::report::ActivityKind;
    use crate::test::utils::{TestDbBuilder, create_standard_test_db};

    #[rocket::async_test]
    async fn test_student_progress_from_database() {
        let mut builder = TestDbBuilder::new()
            .teacher("teacher")
            .student("alice")
            .enroll("teacher", "alice")
            .assignment("Essay", "teacher", &[], 50.0)
            .assignment("Quiz", "teacher", &["alice"], 20.0);

        for i in 0..10 {
            builder = builder.lesson(&format!("Lesson {}", i), "teacher");
        }

        let test_db = builder
            .progress("alice", "Lesson 0", ProgressStatus::Completed, Some(80.0), 25)
            .progress("alice", "Lesson 1", ProgressStatus::Completed, Some(100.0), 35)
            .progress("alice", "Lesson 2", ProgressStatus::InProgress, None, 5)
            .submission("alice", "Essay", SubmissionStatus::Graded, Some(45.0))
            .build()
            .await
            .expect("Failed to build test db");

        let progress = test_db
            .service()
            .get_student_progress(test_db.user_id("alice"))
            .await
            .unwrap();

        assert_eq!(progress.lessons.viewed, 3);
        assert_eq!(progress.lessons.completed, 2);
        assert_eq!(progress.lessons.total, 10);
        assert_eq!(progress.lessons.completion_rate, "20.00");
        assert_eq!(progress.lessons.average_score, "90.00");
        assert_eq!(progress.assignments.total, 2);
        assert_eq!(progress.assignments.submission_rate, "50.00");
        assert_eq!(progress.assignments.average_score, "90.00");
        assert_eq!(progress.overall.progress, "32.00");
        assert_eq!(progress.overall.total_time_spent, 65);
    }

    #[rocket::async_test]
    async fn test_unknown_student_is_not_found() {
        let test_db = create_standard_test_db().await;
        let service = test_db.service();

        let result = service.get_student_progress(9999).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        // teachers are not students
        let result = service.get_student_progress(test_db.user_id("teacher")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn test_multiple_students_preserves_order_and_fails_on_unknown() {
        let test_db = create_standard_test_db().await;
        let service = test_db.service();

        let ids = vec![
            test_db.user_id("carol"),
            test_db.user_id("alice"),
            test_db.user_id("bob"),
        ];
        let entries = service.get_multiple_students_progress(&ids).await.unwrap();
        let usernames: Vec<&str> = entries.iter().map(|e| e.student.username.as_str()).collect();
        assert_eq!(usernames, vec!["carol", "alice", "bob"]);

        // only alice has the explicit assignment in scope
        assert_eq!(entries[1].progress.assignments.total, 2);
        assert_eq!(entries[0].progress.assignments.total, 1);

        let with_unknown = vec![test_db.user_id("alice"), 9999];
        let result = service.get_multiple_students_progress(&with_unknown).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn test_detailed_progress_lists_recent_activity() {
        let test_db = TestDbBuilder::new()
            .teacher("teacher")
            .student("alice")
            .enroll("teacher", "alice")
            .lesson("Fractions", "teacher")
            .assignment("Essay", "teacher", &[], 10.0)
            .inactive_assignment("Retired", "teacher", 10.0)
            .progress("alice", "Fractions", ProgressStatus::InProgress, None, 12)
            .submission("alice", "Essay", SubmissionStatus::Submitted, None)
            .build()
            .await
            .expect("Failed to build test db");

        // a submission left behind on a retired assignment
        db::insert_submission(
            &test_db.pool,
            test_db.assignment_id("Retired"),
            test_db.user_id("alice"),
            "old work",
            SubmissionStatus::Submitted,
        )
        .await
        .unwrap();

        let detailed = test_db
            .service()
            .get_detailed_progress(test_db.user_id("alice"))
            .await
            .unwrap();

        assert_eq!(detailed.recent_activity.len(), 2);
        assert!(
            detailed
                .recent_activity
                .iter()
                .any(|a| a.kind == ActivityKind::Lesson && a.title == "Fractions")
        );
        assert!(
            detailed
                .recent_activity
                .iter()
                .all(|a| a.title != "Retired")
        );
        assert_eq!(detailed.progress.assignments.submitted, 1);
        assert_eq!(detailed.progress.assignments.total, 1);
    }

    #[rocket::async_test]
    async fn test_statistics_count_only_roster_members() {
        let test_db = TestDbBuilder::new()
            .teacher("teacher")
            .student("a")
            .student("b")
            .student("c")
            .enroll("teacher", "a")
            .enroll("teacher", "b")
            .enroll("teacher", "c")
            .assignment("X", "teacher", &[], 20.0)
            .submission("a", "X", SubmissionStatus::Graded, Some(20.0))
            .submission("b", "X", SubmissionStatus::Submitted, None)
            .submission("c", "X", SubmissionStatus::Graded, Some(10.0))
            .build()
            .await
            .expect("Failed to build test db");

        let service = test_db.service();
        let x = test_db.assignment_id("X");

        let stats = service.assignment_statistics(x).await.unwrap();
        assert_eq!(stats.total_assigned, 3);
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.graded, 2);
        assert_eq!(stats.submission_rate, "100.00");
        assert_eq!(stats.average_score, "75.00");

        db::unenroll_student(&test_db.pool, test_db.user_id("teacher"), test_db.user_id("c"))
            .await
            .unwrap();

        let stats = service.assignment_statistics(x).await.unwrap();
        assert_eq!(stats.total_assigned, 2);
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.graded, 1);
        assert_eq!(stats.average_score, "100.00");
        assert_eq!(
            service.assignment_roster(x).await.unwrap().len() as i64,
            stats.total_assigned
        );

        let missing = service.assignment_statistics(9999).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn test_student_assignments_join_own_submission() {
        let test_db = TestDbBuilder::new()
            .teacher("teacher")
            .student("alice")
            .student("bob")
            .enroll("teacher", "alice")
            .enroll("teacher", "bob")
            .assignment("Essay", "teacher", &[], 10.0)
            .assignment("Bob only", "teacher", &["bob"], 10.0)
            .submission("alice", "Essay", SubmissionStatus::Draft, None)
            .submission("bob", "Essay", SubmissionStatus::Submitted, None)
            .build()
            .await
            .expect("Failed to build test db");

        let listing = test_db
            .service()
            .student_assignments(test_db.user_id("alice"))
            .await
            .unwrap();

        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].assignment.title, "Essay");
        assert!(listing[0].assignment.assigned_to.is_empty());
        let own = listing[0].submission.as_ref().expect("alice has a draft");
        assert_eq!(own.student_id, test_db.user_id("alice"));
        assert_eq!(own.status, SubmissionStatus::Draft);
    }
}
