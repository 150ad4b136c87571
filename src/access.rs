use tracing::{instrument, warn};

use crate::auth::{Permission, Principal, Role};
use crate::db::{self, SqliteStore};
use crate::error::AppError;
use crate::models::Assignment;

fn denied(principal: &Principal, what: &str) -> AppError {
    warn!(principal_id = principal.id, role = %principal.role, what, "Access denied");
    AppError::Authorization(format!(
        "{} {} may not access {}",
        principal.role, principal.id, what
    ))
}

/// Role permission plus the data-dependent relationship: students see
/// themselves, parents their linked children, teachers their enrolled
/// students, admins everyone.
#[instrument(skip(store))]
pub async fn ensure_can_view_student(
    store: &SqliteStore,
    principal: &Principal,
    student_id: i64,
) -> Result<(), AppError> {
    if principal.has_permission(Permission::ViewAllStudents) {
        return Ok(());
    }

    let allowed = match principal.role {
        Role::Student => {
            principal.has_permission(Permission::ViewOwnProgress) && principal.id == student_id
        }
        Role::Parent => {
            principal.has_permission(Permission::ViewChildProgress)
                && db::is_guardian_of(store.pool(), principal.id, student_id).await?
        }
        Role::Teacher => {
            principal.has_permission(Permission::ViewEnrolledStudents)
                && db::is_enrolled(store.pool(), principal.id, student_id).await?
        }
        Role::Admin => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(denied(principal, &format!("student {}", student_id)))
    }
}

/// Assignment management is limited to the owning teacher and admins.
pub fn ensure_owns_assignment(
    principal: &Principal,
    assignment: &Assignment,
) -> Result<(), AppError> {
    principal.require_permission(Permission::ManageAssignments)?;

    if principal.role == Role::Admin || assignment.teacher_id == principal.id {
        Ok(())
    } else {
        Err(denied(principal, &format!("assignment {}", assignment.id)))
    }
}
