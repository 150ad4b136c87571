#[macro_use]
extern crate rocket;

pub mod access;
pub mod api;
pub mod auth;
pub mod db;
pub mod env;
pub mod error;
pub mod models;
pub mod progress;
pub mod telemetry;
pub mod validation;

#[cfg(test)]
mod test;

use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use tracing::info;

use api::{
    api_create_assignment, api_create_submission, api_get_assignment_roster,
    api_get_assignment_stats, api_get_assignments, api_get_children_progress,
    api_get_detailed_progress, api_get_student_progress, api_get_students_progress,
    api_get_teacher_students_progress, api_grade_submission, api_record_lesson_activity,
    api_regrade_submission, api_return_submission, api_start_lesson, api_update_audience,
    api_update_submission, health,
};
use auth::unauthorized_api;
use db::SqliteStore;
use progress::ProgressService;
use telemetry::{TelemetryFairing, shutdown_telemetry};

pub async fn init_rocket(pool: SqlitePool) -> Rocket<Build> {
    info!("Starting classroom progress service");

    rocket::build()
        .manage(ProgressService::new(SqliteStore::new(pool)))
        .mount(
            "/api",
            routes![
                api_get_student_progress,
                api_get_detailed_progress,
                api_get_students_progress,
                api_get_teacher_students_progress,
                api_get_children_progress,
                api_get_assignments,
                api_create_assignment,
                api_update_audience,
                api_get_assignment_roster,
                api_get_assignment_stats,
                api_create_submission,
                api_update_submission,
                api_grade_submission,
                api_regrade_submission,
                api_return_submission,
                api_start_lesson,
                api_record_lesson_activity,
            ],
        )
        .register("/api", catchers![unauthorized_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
        .attach(AdHoc::on_shutdown("Telemetry shutdown", |_| {
            Box::pin(async { shutdown_telemetry() })
        }))
}
