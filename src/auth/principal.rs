use rocket::Request;
use rocket::http::{CookieJar, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::AppError;

use super::{Permission, Role};

/// The authenticated caller. Credentials are verified upstream; the login
/// flow leaves `user_id` and `user_role` in private cookies.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl Principal {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    /// Reads the private `user_id` and `user_role` cookies. Either one
    /// missing or unparseable yields `None`.
    pub fn from_cookies(cookies: &CookieJar<'_>) -> Option<Self> {
        let id = cookies
            .get_private("user_id")
            .and_then(|c| c.value().parse::<i64>().ok())?;
        let role = cookies
            .get_private("user_role")
            .and_then(|c| Role::from_str(c.value()).ok())?;

        Some(Self { id, role })
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), AppError> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                principal_id = self.id,
                role = %self.role.as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(AppError::Authorization(format!(
                "Role {} lacks {:?}",
                self.role, permission
            )))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Principal {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("principal_guard");
        let _guard = auth_span.enter();

        match Principal::from_cookies(request.cookies()) {
            Some(principal) => {
                tracing::debug!(
                    principal_id = principal.id,
                    role = %principal.role,
                    "Principal resolved"
                );
                Outcome::Success(principal)
            }
            None => {
                tracing::warn!("Missing or malformed principal cookies");
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<Value>> {
    Custom(
        Status::Unauthorized,
        Json(json!({
            "error": "Unauthorized",
            "message": "Authentication required"
        })),
    )
}
